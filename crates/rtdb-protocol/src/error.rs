use std::fmt;

use thiserror::Error;

/// What the remote service said about a failed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorDetail {
    /// The body was a well-formed `{"error": "<reason>"}` object.
    Reason(String),
    /// The body could not be parsed; carried verbatim.
    RawBody(String),
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reason(reason) => write!(f, "reason: {reason}"),
            Self::RawBody(body) => write!(f, "message: {body}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("http error status: {status}; reason: {reason}")]
    PermissionDenied { status: u16, reason: String },

    #[error("http error status: {status}; {detail}")]
    Http { status: u16, detail: ErrorDetail },

    #[error("failed to encode request body: {0}")]
    Encode(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("response is missing the {0} header")]
    MissingHeader(&'static str),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
