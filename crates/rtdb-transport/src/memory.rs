//! In-memory emulation of the remote tree for testing and demos.
//!
//! [`MemoryTransport`] keeps the whole tree in a single `serde_json::Value`
//! behind a `Mutex` and answers requests the way the remote service does:
//!
//! - Version tokens are BLAKE3 digests of the canonical JSON at a path
//! - `If-None-Match` yields `304`, a stale `If-Match` yields `412` with the
//!   current value and token
//! - `print=silent` yields `204` with no body
//! - `POST` allocates a chronologically ordered push key
//! - `PATCH` writes each relative child path independently
//! - `orderBy` / `startAt` / `endAt` / `equalTo` / `limitToFirst` /
//!   `limitToLast` filter the children of the target
//! - `shallow=true` truncates the result to one level
//!
//! Writing `null` or an empty object removes a value, and parents left empty
//! disappear with it. Reads and writes can be denied beneath a path prefix,
//! and writes from a simulated concurrent client can be slipped in ahead of
//! the next conditional write.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rtdb_protocol::{headers, params, Method, WireRequest, WireResponse};
use rtdb_types::{compare_keys, compare_values, ETag, OrderBy, Path};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::TransportResult;
use crate::push_id::PushIdGenerator;
use crate::transport::Transport;

#[derive(Debug, Default)]
struct Tree {
    root: Value,
    push_ids: PushIdGenerator,
    denied_reads: Vec<Path>,
    denied_writes: Vec<Path>,
    interleaved: VecDeque<(Path, Value)>,
    requests: Vec<WireRequest>,
}

/// An in-memory implementation of [`Transport`].
///
/// All data lives in one JSON value behind a `Mutex`. Data is lost when the
/// transport is dropped.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    tree: Mutex<Tree>,
}

impl MemoryTransport {
    /// Create a transport over an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose tree starts as `data`.
    pub fn with_data(data: Value) -> Self {
        let transport = Self::new();
        transport.lock().root = normalize(data);
        transport
    }

    /// Answer reads at or beneath `prefix` with `401 Permission denied`.
    pub fn deny_reads(&self, prefix: Path) {
        self.lock().denied_reads.push(prefix);
    }

    /// Answer writes at or beneath `prefix` with `401 Permission denied`.
    pub fn deny_writes(&self, prefix: Path) {
        self.lock().denied_writes.push(prefix);
    }

    /// Queue a write by another client, applied just before the next
    /// conditional (`If-Match`) write is evaluated.
    pub fn interleave_write(&self, path: Path, value: Value) {
        self.lock().interleaved.push_back((path, value));
    }

    /// Overwrite the value at `path` directly, bypassing the protocol.
    pub fn put(&self, path: &Path, value: Value) {
        set_at(&mut self.lock().root, path.segments(), normalize(value));
    }

    /// The value currently stored at `path` (`null` when absent).
    pub fn value_at(&self, path: &Path) -> Value {
        get_at(&self.lock().root, path.segments())
    }

    /// The version token the service would issue for `path` right now.
    pub fn etag_at(&self, path: &Path) -> ETag {
        etag_of(&self.value_at(path))
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<WireRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, request: WireRequest) -> TransportResult<WireResponse> {
        let mut tree = self.lock();
        let response = handle(&mut tree, &request);
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            "memory transport handled request"
        );
        tree.requests.push(request);
        Ok(response)
    }
}

/// Version token for a value: hex BLAKE3 digest of its canonical JSON.
pub fn etag_of(value: &Value) -> ETag {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    ETag::new(hex::encode(blake3::hash(&bytes).as_bytes()))
}

fn error_response(status: u16, reason: &str) -> WireResponse {
    WireResponse::json(status, &json!({ "error": reason }))
}

fn handle(tree: &mut Tree, request: &WireRequest) -> WireResponse {
    let path = match request
        .path
        .strip_suffix(".json")
        .map(Path::parse)
    {
        Some(Ok(path)) => path,
        _ => return error_response(400, "Invalid path"),
    };

    let denied = match request.method {
        Method::Get => &tree.denied_reads,
        _ => &tree.denied_writes,
    };
    if denied.iter().any(|prefix| prefix.is_prefix_of(&path)) {
        return error_response(401, "Permission denied");
    }

    let result = match request.method {
        Method::Get => handle_get(tree, &path, request),
        Method::Put => handle_put(tree, &path, request),
        Method::Patch => handle_patch(tree, &path, request),
        Method::Post => handle_post(tree, &path, request),
        Method::Delete => {
            set_at(&mut tree.root, path.segments(), Value::Null);
            Ok(WireResponse::json(200, &Value::Null))
        }
    };
    result.unwrap_or_else(|reason| error_response(400, &reason))
}

fn handle_get(tree: &Tree, path: &Path, request: &WireRequest) -> Result<WireResponse, String> {
    let current = get_at(&tree.root, path.segments());
    let etag = etag_of(&current);

    if request.header(headers::IF_NONE_MATCH) == Some(etag.as_str()) {
        return Ok(WireResponse::new(304).with_header(headers::ETAG, etag.as_str()));
    }

    let shallow = request.query_param(params::SHALLOW) == Some("true");
    let body = match request.query_param(params::ORDER_BY) {
        Some(_) if shallow => {
            return Err("shallow cannot be mixed with any other parameters".into())
        }
        Some(_) => apply_query(current, request)?,
        None if shallow => truncate(current),
        None => current,
    };
    Ok(WireResponse::json(200, &body).with_header(headers::ETAG, etag.as_str()))
}

fn handle_put(tree: &mut Tree, path: &Path, request: &WireRequest) -> Result<WireResponse, String> {
    let value = parse_body(request)?;

    if let Some(expected) = request.header(headers::IF_MATCH) {
        if let Some((other_path, other_value)) = tree.interleaved.pop_front() {
            set_at(&mut tree.root, other_path.segments(), normalize(other_value));
        }
        let current = get_at(&tree.root, path.segments());
        let etag = etag_of(&current);
        if etag.as_str() != expected {
            return Ok(WireResponse::json(412, &current).with_header(headers::ETAG, etag.as_str()));
        }
    }

    set_at(&mut tree.root, path.segments(), normalize(value));
    let stored = get_at(&tree.root, path.segments());
    if is_silent(request) {
        return Ok(WireResponse::new(204));
    }
    Ok(WireResponse::json(200, &stored).with_header(headers::ETAG, etag_of(&stored).as_str()))
}

fn handle_patch(
    tree: &mut Tree,
    path: &Path,
    request: &WireRequest,
) -> Result<WireResponse, String> {
    let patch = match parse_body(request)? {
        Value::Object(map) => map,
        _ => return Err("Invalid data; couldn't parse JSON object".into()),
    };
    // Validate every key before touching the tree so a bad patch writes
    // nothing.
    let mut writes = Vec::with_capacity(patch.len());
    for (key, value) in &patch {
        let relative = Path::relative(key).map_err(|e| e.to_string())?;
        writes.push((path.join(&relative), value.clone()));
    }
    for (target, value) in writes {
        set_at(&mut tree.root, target.segments(), normalize(value));
    }
    if is_silent(request) {
        return Ok(WireResponse::new(204));
    }
    Ok(WireResponse::json(200, &Value::Object(patch)))
}

fn handle_post(
    tree: &mut Tree,
    path: &Path,
    request: &WireRequest,
) -> Result<WireResponse, String> {
    let value = parse_body(request)?;
    let key = tree.push_ids.next_id();
    let target = path.child(&key).map_err(|e| e.to_string())?;
    set_at(&mut tree.root, target.segments(), normalize(value));
    Ok(WireResponse::json(200, &json!({ "name": key })))
}

fn parse_body(request: &WireRequest) -> Result<Value, String> {
    request
        .body_json()
        .map_err(|_| "Invalid data; couldn't parse JSON object, array, or value.".to_string())
}

fn is_silent(request: &WireRequest) -> bool {
    request.query_param(params::PRINT) == Some(params::SILENT)
}

fn apply_query(value: Value, request: &WireRequest) -> Result<Value, String> {
    let selector: String = query_json(request, params::ORDER_BY)?
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or("orderBy must be a valid JSON encoded path")?;
    let order =
        OrderBy::from_selector(&selector).ok_or("orderBy must be a valid JSON encoded path")?;

    let first = query_limit(request, params::LIMIT_TO_FIRST)?;
    let last = query_limit(request, params::LIMIT_TO_LAST)?;
    if first.is_some() && last.is_some() {
        return Err("Only one of limitToFirst and limitToLast may be specified".into());
    }
    let (lower, upper) = match query_json(request, params::EQUAL_TO)? {
        Some(eq) => (Some(eq.clone()), Some(eq)),
        None => (
            query_json(request, params::START_AT)?,
            query_json(request, params::END_AT)?,
        ),
    };

    let mut entries: Vec<(String, Value)> = match value {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        scalar => return Ok(scalar),
    };
    order.sort(&mut entries);
    entries.retain(|(key, value)| {
        let cmp = |bound: &Value| match &order {
            OrderBy::Key => compare_keys(key, &bound_key(bound)),
            _ => compare_values(&order.sort_value(key, value), bound),
        };
        lower.as_ref().map_or(true, |b| cmp(b).is_ge())
            && upper.as_ref().map_or(true, |b| cmp(b).is_le())
    });
    if let Some(n) = first {
        entries.truncate(n);
    }
    if let Some(n) = last {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    Ok(Value::Object(entries.into_iter().collect()))
}

fn bound_key(bound: &Value) -> String {
    match bound {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn query_json(request: &WireRequest, name: &str) -> Result<Option<Value>, String> {
    request
        .query_param(name)
        .map(|raw| {
            serde_json::from_str(raw).map_err(|_| format!("{name} must be a valid JSON value"))
        })
        .transpose()
}

fn query_limit(request: &WireRequest, name: &str) -> Result<Option<usize>, String> {
    request
        .query_param(name)
        .map(|raw| raw.parse().map_err(|_| format!("{name} must be a positive integer")))
        .transpose()
}

/// One level of the tree: objects keep their keys, nested values collapse
/// to `true`.
fn truncate(value: Value) -> Value {
    let collapse = |v: Value| if v.is_object() || v.is_array() { Value::Bool(true) } else { v };
    match value {
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, collapse(v))).collect())
        }
        Value::Array(items) => Value::Object(
            items
                .into_iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), collapse(v)))
                .collect(),
        ),
        scalar => scalar,
    }
}

/// Drop `null` children and collapse empty objects to `null`.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

fn get_at(root: &Value, segments: &[String]) -> Value {
    segments
        .iter()
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .cloned()
        .unwrap_or(Value::Null)
}

fn set_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if value.is_null() && !node.is_object() && !node.is_array() {
        return;
    }
    if let Value::Array(items) = node {
        let converted: Map<String, Value> = items
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect();
        *node = Value::Object(converted);
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set_at(child, rest, value);
        if child.is_null() {
            map.remove(head);
        }
        if map.is_empty() {
            *node = Value::Null;
        }
    }
}
