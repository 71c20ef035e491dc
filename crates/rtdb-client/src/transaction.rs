//! Optimistic read-modify-write.
//!
//! Each attempt is one Fetch (read with version token) followed by at most
//! one Commit (write guarded by `If-Match`). Losing the race to another
//! writer starts a fresh attempt against the live value; every other
//! failure ends the transaction immediately.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_MAX_TRANSACTION_ATTEMPTS;
use crate::error::{DbError, DbResult};
use crate::reference::Ref;

/// What the update function wants done with the value it was shown.
#[derive(Clone, Debug, PartialEq)]
pub enum TxnOutcome {
    /// Try to replace the current value with this one.
    Commit(Value),
    /// Stop without writing. Not retried.
    Abort(String),
}

/// Retry bound for a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionPolicy {
    /// Maximum number of commit attempts, at least 1.
    pub max_attempts: u32,
}

impl TransactionPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl Default for TransactionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRANSACTION_ATTEMPTS)
    }
}

pub(crate) async fn run<F>(
    target: &Ref,
    policy: TransactionPolicy,
    mut update: F,
) -> DbResult<Value>
where
    F: FnMut(Value) -> TxnOutcome,
{
    if policy.max_attempts == 0 {
        return Err(DbError::InvalidArgument(
            "transaction needs at least one attempt".into(),
        ));
    }

    for attempt in 1..=policy.max_attempts {
        let (current, etag) = target.get_with_etag::<Value>().await?;

        let next = match update(current) {
            TxnOutcome::Commit(next) => next,
            TxnOutcome::Abort(reason) => {
                debug!(
                    path = %target.path(),
                    attempt,
                    %reason,
                    "transaction cancelled by update function"
                );
                return Err(DbError::TransactionCancelled { reason });
            }
        };

        if target.set_if_unchanged(&etag, &next).await? {
            info!(path = %target.path(), attempts = attempt, "transaction committed");
            return Ok(next);
        }
        warn!(
            path = %target.path(),
            attempt,
            max_attempts = policy.max_attempts,
            "transaction lost optimistic race, retrying"
        );
    }

    Err(DbError::TransactionAborted {
        attempts: policy.max_attempts,
    })
}
