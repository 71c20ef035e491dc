//! Transports for rtdb.
//!
//! A [`Transport`] carries one [`WireRequest`](rtdb_protocol::WireRequest)
//! to the remote service and returns its
//! [`WireResponse`](rtdb_protocol::WireResponse). The client core never
//! talks HTTP directly; it only sees this trait.
//!
//! # Modules
//!
//! - [`error`] -- Error types for transport failures
//! - [`transport`] -- The [`Transport`] trait
//! - [`http`] -- [`HttpTransport`], backed by `reqwest`
//! - [`memory`] -- [`MemoryTransport`], an in-process emulation of the remote
//!   tree for tests and demos
//! - [`scripted`] -- [`ScriptedTransport`], replays canned responses and
//!   records requests
//! - [`push_id`] -- Chronologically ordered key generation

pub mod error;
pub mod http;
pub mod memory;
pub mod push_id;
pub mod scripted;
pub mod transport;

pub use error::{TransportError, TransportResult};
pub use http::{HttpTransport, HttpTransportConfig};
pub use memory::{etag_of, MemoryTransport};
pub use push_id::PushIdGenerator;
pub use scripted::ScriptedTransport;
pub use transport::Transport;

pub use reqwest::Url;
