use rtdb_protocol::{ErrorDetail, ProtocolError};
use rtdb_transport::TransportError;
use rtdb_types::PathError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("http error status: {status}; reason: {reason}")]
    PermissionDenied { status: u16, reason: String },

    #[error("http error status: {status}; {detail}")]
    Http { status: u16, detail: ErrorDetail },

    #[error("transaction aborted after {attempts} attempts")]
    TransactionAborted { attempts: u32 },

    #[error("transaction cancelled: {reason}")]
    TransactionCancelled { reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to encode value: {0}")]
    Encode(String),

    #[error("failed to decode value: {0}")]
    Decode(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DbError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// HTTP status of a server-reported failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::PermissionDenied { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ProtocolError> for DbError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::PermissionDenied { status, reason } => {
                Self::PermissionDenied { status, reason }
            }
            ProtocolError::Http { status, detail } => Self::Http { status, detail },
            ProtocolError::Encode(msg) => Self::Encode(msg),
            ProtocolError::Decode(msg) => Self::Decode(msg),
            missing @ ProtocolError::MissingHeader(_) => Self::Decode(missing.to_string()),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
