//! `ra-cli`: command-line front end for the relay agent client.

pub mod cli;
