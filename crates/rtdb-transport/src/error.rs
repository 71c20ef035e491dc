use thiserror::Error;

/// Failures below the protocol layer. None of these are retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("no scripted response left for {method} {path}")]
    Exhausted { method: String, path: String },

    #[error("internal transport error: {0}")]
    Internal(String),
}

pub type TransportResult<T> = Result<T, TransportError>;
