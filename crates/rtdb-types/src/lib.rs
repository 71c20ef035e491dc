//! Foundation types for rtdb.
//!
//! This crate provides the leaf types shared by every other rtdb crate: the
//! canonical [`Path`] into the remote JSON tree, the opaque [`ETag`] version
//! token, and the canonical ordering the remote service applies to keys and
//! values.
//!
//! # Key Types
//!
//! - [`Path`] -- Immutable, validated sequence of segments rooted at `/`
//! - [`ETag`] -- Opaque server-issued version token
//! - [`OrderBy`] -- Query ordering selector (key, value, or child path)
//! - [`Value`] -- Decoded JSON value (re-exported from `serde_json`)

pub mod error;
pub mod etag;
pub mod order;
pub mod path;

pub use error::{PathError, PathResult};
pub use etag::ETag;
pub use order::{compare_keys, compare_values, OrderBy};
pub use path::Path;

/// A decoded JSON value: `Null | Bool | Number | String | Array | Object`.
pub use serde_json::Value;
