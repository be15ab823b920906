//! Call results and the top-level client error.

use crate::payload::BuildError;
use crate::transport::TransportError;

/// How a call ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The stream closed (explicitly or at end of body); final answer text.
    Completed(String),
    /// The caller's cancellation token fired first.
    Cancelled,
}

impl CallOutcome {
    /// Final answer, if the call completed.
    pub fn answer(&self) -> Option<&str> {
        match self {
            CallOutcome::Completed(answer) => Some(answer),
            CallOutcome::Cancelled => None,
        }
    }
}

/// Failure of a remote call.
#[derive(thiserror::Error, Debug, Clone)]
pub enum RemoteError {
    /// The request could not be built; nothing was sent.
    #[error("building request: {0}")]
    Build(#[from] BuildError),
    /// Every connection attempt failed.
    #[error("stream failed after {retries} retries: {last_error}")]
    RetriesExhausted {
        retries: u32,
        attempts: u32,
        last_error: TransportError,
    },
    #[error("discovery: {0}")]
    Discovery(String),
}
