//! `ra-domain`: shared types for the relay agent crates.
//!
//! Configuration, the error type, the per-hop [`call::CallContext`], the
//! wire-level [`stream::StreamEvent`] and the structured trace events live
//! here so that both the core client and the binary agree on them.

pub mod call;
pub mod config;
pub mod error;
pub mod stream;
pub mod trace;
