use async_trait::async_trait;
use rtdb_protocol::{WireRequest, WireResponse};

use crate::error::TransportResult;

/// Carries a single request/response exchange.
///
/// Implementations attach their own credentials and connection settings.
/// Any status code, including errors, is a successful exchange at this
/// layer; only failures to obtain a response are `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> TransportResult<WireResponse>;
}
