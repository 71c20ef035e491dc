//! Wire protocol for rtdb.
//!
//! Every logical path `/a/b/c` maps to the HTTP resource `/a/b/c.json`.
//! This crate builds the requests for each tree operation (method, resource
//! path, query parameters, conditional headers, JSON body) and classifies
//! the responses into values, version tokens, conditional outcomes, or
//! structured errors. It performs no I/O; see `rtdb-transport` for that.

pub mod auth;
pub mod codec;
pub mod error;
pub mod message;
pub mod names;

pub use auth::Credentials;
pub use codec::{ReadOutcome, WireCodec, WriteOutcome};
pub use error::{ErrorDetail, ProtocolError, ProtocolResult};
pub use message::{Method, WireRequest, WireResponse};
pub use names::{headers, params, resource_path};
