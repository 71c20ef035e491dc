//! Typed client for a hierarchical JSON tree store.
//!
//! A [`Client`] talks to one remote database through a
//! [`Transport`]. A [`Ref`] names a location in the tree and offers reads,
//! writes, conditional writes guarded by version tokens, optimistic
//! [`transactions`](Ref::transaction), and [queries](QueryBuilder).
//!
//! ```no_run
//! use rtdb_client::{Client, ClientConfig, TxnOutcome};
//! use serde_json::json;
//!
//! # async fn demo() -> rtdb_client::DbResult<()> {
//! let client = Client::new(ClientConfig::new("https://my-db.example.com"))?;
//! let counter = client.new_ref("stats/visits")?;
//! counter.set(&json!(0)).await?;
//! counter
//!     .transaction(|v| TxnOutcome::Commit(json!(v.as_i64().unwrap_or(0) + 1)))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod reference;
pub mod transaction;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_MAX_TRANSACTION_ATTEMPTS, DEFAULT_TIMEOUT_MS};
pub use error::{DbError, DbResult};
pub use query::{Query, QueryBuilder, QueryNode};
pub use reference::{IfChanged, Ref};
pub use transaction::{TransactionPolicy, TxnOutcome};

// Re-export the types callers need alongside the client.
pub use rtdb_protocol::{Credentials, ErrorDetail};
pub use rtdb_transport::{MemoryTransport, ScriptedTransport, Transport};
pub use rtdb_types::{ETag, OrderBy, Path, Value};
