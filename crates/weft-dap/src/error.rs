//! Adapter error type.

use thiserror::Error;
use weft_engine::EngineError;

/// Errors surfaced to the client as failed responses. The session
/// stays open after any of these.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("unrecognized request: {0}")]
    UnrecognizedRequest(String),

    #[error("no engine prepared; launch must precede configurationDone")]
    NotLaunched,

    #[error("execution is not paused")]
    NotPaused,

    #[error("unknown frame id {0}")]
    UnknownFrame(u64),

    #[error("session state unavailable")]
    StateUnavailable,

    #[error(transparent)]
    Engine(#[from] EngineError),
}
