//! Error types for path construction.

use thiserror::Error;

/// Errors produced while building or extending a [`Path`](crate::Path).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A segment between two slashes was empty.
    #[error("invalid path {path:?}: path segments must not be empty")]
    EmptySegment { path: String },

    /// A segment contained a character the remote key space forbids.
    #[error("invalid path {path:?}: segment {segment:?} contains forbidden character {ch:?}")]
    ForbiddenCharacter {
        path: String,
        segment: String,
        ch: char,
    },
}

/// Convenience type alias for path operations.
pub type PathResult<T> = std::result::Result<T, PathError>;
