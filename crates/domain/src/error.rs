/// Shared error type used across the relay agent crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
