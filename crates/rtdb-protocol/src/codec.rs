use bytes::Bytes;
use rtdb_types::{ETag, Path};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ErrorDetail, ProtocolError, ProtocolResult};
use crate::message::{Method, WireRequest, WireResponse};
use crate::names::{headers, params};

const STATUS_NOT_MODIFIED: u16 = 304;
const STATUS_UNAUTHORIZED: u16 = 401;
const STATUS_FORBIDDEN: u16 = 403;
const STATUS_PRECONDITION_FAILED: u16 = 412;

/// Result of a read exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Fresh data, with the version token if the server sent one.
    Value { body: Bytes, etag: Option<ETag> },
    /// The conditional read matched the current version.
    NotModified,
}

/// Result of a write exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied { body: Bytes, etag: Option<ETag> },
    /// The `If-Match` token no longer names the current version.
    PreconditionFailed { etag: Option<ETag> },
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct PushBody {
    name: String,
}

/// Encodes tree operations into [`WireRequest`]s and classifies the
/// corresponding [`WireResponse`]s.
pub struct WireCodec;

impl WireCodec {
    /// Unconditional read.
    pub fn get(path: &Path) -> WireRequest {
        WireRequest::new(Method::Get, path)
    }

    /// Read that asks the server to return the current version token.
    pub fn get_with_etag(path: &Path) -> WireRequest {
        Self::get(path).with_header(headers::REQUEST_ETAG, "true")
    }

    /// Read that returns `304 Not Modified` while `etag` is current.
    pub fn get_if_changed(path: &Path, etag: &ETag) -> WireRequest {
        Self::get(path).with_header(headers::IF_NONE_MATCH, etag.as_str())
    }

    /// Read truncated to one level below `path`.
    pub fn get_shallow(path: &Path) -> WireRequest {
        Self::get(path).with_query(params::SHALLOW, "true")
    }

    /// Unconditional overwrite; the echoed value is suppressed.
    pub fn set<T: Serialize + ?Sized>(path: &Path, value: &T) -> ProtocolResult<WireRequest> {
        WireRequest::new(Method::Put, path)
            .with_query(params::PRINT, params::SILENT)
            .with_json_body(value)
    }

    /// Overwrite applied only while `etag` names the current version.
    pub fn set_if_unchanged<T: Serialize + ?Sized>(
        path: &Path,
        etag: &ETag,
        value: &T,
    ) -> ProtocolResult<WireRequest> {
        WireRequest::new(Method::Put, path)
            .with_header(headers::IF_MATCH, etag.as_str())
            .with_json_body(value)
    }

    /// Partial write of the given relative children.
    pub fn update(path: &Path, patch: &Map<String, Value>) -> ProtocolResult<WireRequest> {
        WireRequest::new(Method::Patch, path)
            .with_query(params::PRINT, params::SILENT)
            .with_json_body(patch)
    }

    /// Append a child under a server-generated key.
    ///
    /// The service rejects a `null` POST body, so an absent value is sent as
    /// the empty string.
    pub fn push<T: Serialize + ?Sized>(path: &Path, value: &T) -> ProtocolResult<WireRequest> {
        let value = serde_json::to_value(value).map_err(|e| ProtocolError::Encode(e.to_string()))?;
        let value = match value {
            Value::Null => Value::String(String::new()),
            other => other,
        };
        WireRequest::new(Method::Post, path).with_json_body(&value)
    }

    pub fn delete(path: &Path) -> WireRequest {
        WireRequest::new(Method::Delete, path)
    }

    /// Classify the response to a read.
    pub fn read_outcome(response: WireResponse) -> ProtocolResult<ReadOutcome> {
        if response.status == STATUS_NOT_MODIFIED {
            return Ok(ReadOutcome::NotModified);
        }
        if !response.is_success() {
            return Err(Self::error_for(&response));
        }
        let etag = response.etag();
        Ok(ReadOutcome::Value {
            body: response.body,
            etag,
        })
    }

    /// Classify the response to a conditional write.
    pub fn write_outcome(response: WireResponse) -> ProtocolResult<WriteOutcome> {
        if response.status == STATUS_PRECONDITION_FAILED {
            return Ok(WriteOutcome::PreconditionFailed {
                etag: response.etag(),
            });
        }
        if !response.is_success() {
            return Err(Self::error_for(&response));
        }
        let etag = response.etag();
        Ok(WriteOutcome::Applied {
            body: response.body,
            etag,
        })
    }

    /// Accept any 2xx response, discarding the body.
    pub fn expect_success(response: &WireResponse) -> ProtocolResult<()> {
        if response.is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response))
        }
    }

    /// Decode a JSON body. An empty body decodes as `null`.
    pub fn decode<T: DeserializeOwned>(body: &[u8]) -> ProtocolResult<T> {
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            body
        };
        serde_json::from_slice(body).map_err(|e| ProtocolError::Decode(e.to_string()))
    }

    /// Extract the generated key from a push response.
    pub fn push_name(body: &[u8]) -> ProtocolResult<String> {
        let parsed: PushBody = serde_json::from_slice(body)
            .map_err(|e| ProtocolError::Decode(format!("push response: {e}")))?;
        if parsed.name.is_empty() {
            return Err(ProtocolError::Decode("push response: empty name".into()));
        }
        Ok(parsed.name)
    }

    /// Build the structured error for a failed response.
    pub fn error_for(response: &WireResponse) -> ProtocolError {
        let detail = match serde_json::from_slice::<ErrorBody>(&response.body) {
            Ok(parsed) => ErrorDetail::Reason(parsed.error),
            Err(_) => {
                ErrorDetail::RawBody(String::from_utf8_lossy(&response.body).trim().to_string())
            }
        };
        let error = match response.status {
            STATUS_UNAUTHORIZED | STATUS_FORBIDDEN => ProtocolError::PermissionDenied {
                status: response.status,
                reason: match detail {
                    ErrorDetail::Reason(reason) => reason,
                    ErrorDetail::RawBody(body) if body.is_empty() => "Permission denied".into(),
                    ErrorDetail::RawBody(body) => body,
                },
            },
            status => ProtocolError::Http { status, detail },
        };
        debug!(status = response.status, %error, "request failed");
        error
    }
}
