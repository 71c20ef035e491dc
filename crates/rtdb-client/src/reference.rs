//! References to locations in the remote tree.
//!
//! A [`Ref`] pairs a [`Client`] with a canonical [`Path`]. Every operation
//! is one request/response exchange (transactions: a bounded sequence) and
//! consults the server fresh; nothing is cached between calls.

use bytes::Bytes;
use rtdb_protocol::{headers, ErrorDetail, ProtocolError, ReadOutcome, WireCodec, WriteOutcome};
use rtdb_types::{ETag, Path};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::Client;
use crate::error::{DbError, DbResult};
use crate::query::QueryBuilder;
use crate::transaction::{self, TransactionPolicy, TxnOutcome};

/// Result of [`Ref::get_if_changed`].
#[derive(Clone, Debug, PartialEq)]
pub enum IfChanged<T> {
    /// The supplied token is still current; nothing was decoded.
    Unchanged(ETag),
    Changed { value: T, etag: ETag },
}

impl<T> IfChanged<T> {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    /// The token now naming the server's version.
    pub fn etag(&self) -> &ETag {
        match self {
            Self::Unchanged(etag) | Self::Changed { etag, .. } => etag,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Unchanged(_) => None,
            Self::Changed { value, .. } => Some(value),
        }
    }
}

/// A handle to one location in the remote tree.
#[derive(Clone, Debug)]
pub struct Ref {
    client: Client,
    path: Path,
}

impl Ref {
    pub(crate) fn new(client: Client, path: Path) -> Self {
        Self { client, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path segment; empty for the root.
    pub fn key(&self) -> &str {
        self.path.key()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Reference to a descendant. `path` may span several levels
    /// (`"a/b/c"`) but must not contain empty segments.
    pub fn child(&self, path: &str) -> DbResult<Ref> {
        Ok(Self::new(self.client.clone(), self.path.child(path)?))
    }

    /// Reference to the parent location. The parent of the root is the
    /// root.
    pub fn parent(&self) -> Ref {
        Self::new(self.client.clone(), self.path.parent())
    }

    /// Read the value. A missing value decodes from `null`.
    pub async fn get<T: DeserializeOwned>(&self) -> DbResult<T> {
        let response = self.client.send(WireCodec::get(&self.path)).await?;
        let (body, _) = read_value(WireCodec::read_outcome(response)?)?;
        Ok(WireCodec::decode(&body)?)
    }

    /// Read the value together with its current version token.
    pub async fn get_with_etag<T: DeserializeOwned>(&self) -> DbResult<(T, ETag)> {
        let response = self.client.send(WireCodec::get_with_etag(&self.path)).await?;
        let (body, etag) = read_value(WireCodec::read_outcome(response)?)?;
        let etag = etag.ok_or(ProtocolError::MissingHeader(headers::ETAG))?;
        Ok((WireCodec::decode(&body)?, etag))
    }

    /// Read the value only if its version differs from `etag`.
    pub async fn get_if_changed<T: DeserializeOwned>(&self, etag: &ETag) -> DbResult<IfChanged<T>> {
        let response = self
            .client
            .send(WireCodec::get_if_changed(&self.path, etag))
            .await?;
        match WireCodec::read_outcome(response)? {
            ReadOutcome::NotModified => Ok(IfChanged::Unchanged(etag.clone())),
            ReadOutcome::Value { body, etag } => Ok(IfChanged::Changed {
                value: WireCodec::decode(&body)?,
                etag: etag.ok_or(ProtocolError::MissingHeader(headers::ETAG))?,
            }),
        }
    }

    /// Read one level of the tree: each child of an object comes back as
    /// `true` or, for scalars, the scalar itself.
    pub async fn get_shallow(&self) -> DbResult<Value> {
        let response = self.client.send(WireCodec::get_shallow(&self.path)).await?;
        let (body, _) = read_value(WireCodec::read_outcome(response)?)?;
        Ok(WireCodec::decode(&body)?)
    }

    /// Overwrite the value.
    pub async fn set<T: Serialize + ?Sized>(&self, value: &T) -> DbResult<()> {
        let response = self.client.send(WireCodec::set(&self.path, value)?).await?;
        Ok(WireCodec::expect_success(&response)?)
    }

    /// Overwrite the value only while `etag` names the current version.
    ///
    /// Returns `false`, not an error, when another writer got there first.
    pub async fn set_if_unchanged<T: Serialize + ?Sized>(
        &self,
        etag: &ETag,
        value: &T,
    ) -> DbResult<bool> {
        let request = WireCodec::set_if_unchanged(&self.path, etag, value)?;
        let response = self.client.send(request).await?;
        match WireCodec::write_outcome(response)? {
            WriteOutcome::Applied { .. } => Ok(true),
            WriteOutcome::PreconditionFailed { .. } => Ok(false),
        }
    }

    /// Write only the given children. Keys are relative paths and may span
    /// several levels (`"a/b"`).
    pub async fn update(&self, patch: &Map<String, Value>) -> DbResult<()> {
        if patch.is_empty() {
            return Err(DbError::InvalidArgument("update requires at least one child".into()));
        }
        for key in patch.keys() {
            Path::relative(key)?;
        }
        let response = self.client.send(WireCodec::update(&self.path, patch)?).await?;
        Ok(WireCodec::expect_success(&response)?)
    }

    /// Append `value` under a new, chronologically ordered key and return a
    /// reference to it.
    pub async fn push<T: Serialize + ?Sized>(&self, value: &T) -> DbResult<Ref> {
        let response = self.client.send(WireCodec::push(&self.path, value)?).await?;
        WireCodec::expect_success(&response)?;
        let name = WireCodec::push_name(&response.body)?;
        self.child(&name)
    }

    /// Remove the value and everything beneath it.
    pub async fn delete(&self) -> DbResult<()> {
        let response = self.client.send(WireCodec::delete(&self.path)).await?;
        Ok(WireCodec::expect_success(&response)?)
    }

    /// Atomically replace the value with `update(current)`, retrying on
    /// contention up to the client's attempt bound.
    pub async fn transaction<F>(&self, update: F) -> DbResult<Value>
    where
        F: FnMut(Value) -> TxnOutcome,
    {
        let policy = TransactionPolicy::new(self.client.transaction_attempts());
        transaction::run(self, policy, update).await
    }

    /// Like [`Ref::transaction`] with an explicit retry policy.
    pub async fn transaction_with_policy<F>(
        &self,
        policy: TransactionPolicy,
        update: F,
    ) -> DbResult<Value>
    where
        F: FnMut(Value) -> TxnOutcome,
    {
        transaction::run(self, policy, update).await
    }

    /// Start an unordered query.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.clone())
    }

    pub fn order_by_key(&self) -> QueryBuilder {
        self.query().order_by_key()
    }

    pub fn order_by_value(&self) -> QueryBuilder {
        self.query().order_by_value()
    }

    pub fn order_by_child(&self, child: &str) -> QueryBuilder {
        self.query().order_by_child(child)
    }
}

/// Unwrap a read that was not conditional. A `304` here means the server
/// ignored the request, so it is reported as an HTTP error.
pub(crate) fn read_value(outcome: ReadOutcome) -> DbResult<(Bytes, Option<ETag>)> {
    match outcome {
        ReadOutcome::Value { body, etag } => Ok((body, etag)),
        ReadOutcome::NotModified => Err(DbError::Http {
            status: 304,
            detail: ErrorDetail::RawBody(String::new()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtdb_transport::ScriptedTransport;
    use std::sync::Arc;

    fn root() -> Ref {
        Client::with_transport(Arc::new(ScriptedTransport::new())).root()
    }

    #[test]
    fn child_and_parent() {
        let r = root().child("a").unwrap();
        assert_eq!(r.key(), "a");
        assert!(r.parent().path().is_root());
        assert!(root().parent().path().is_root());

        let deep = root().child("a/b/c").unwrap();
        assert_eq!(deep.path().to_string(), "/a/b/c");
        assert_eq!(deep.parent().path().to_string(), "/a/b");
    }

    #[test]
    fn child_is_strict() {
        for bad in ["", "a//b", "/a", "a/", "a.b", "$x", "a#", "a[0]"] {
            assert!(
                matches!(root().child(bad), Err(DbError::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn empty_update_is_rejected_before_sending() {
        let transport = Arc::new(ScriptedTransport::new());
        let r = Client::with_transport(transport.clone()).root();
        let err = r.update(&Map::new()).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn update_with_bad_key_is_rejected_before_sending() {
        let transport = Arc::new(ScriptedTransport::new());
        let r = Client::with_transport(transport.clone()).root();
        let mut patch = Map::new();
        patch.insert("a//b".into(), Value::Bool(true));
        assert!(matches!(r.update(&patch).await, Err(DbError::InvalidPath(_))));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn if_changed_accessors() {
        let unchanged: IfChanged<i32> = IfChanged::Unchanged(ETag::new("e1"));
        assert!(!unchanged.is_changed());
        assert_eq!(unchanged.etag().as_str(), "e1");
        assert_eq!(unchanged.into_value(), None);

        let changed = IfChanged::Changed { value: 7, etag: ETag::new("e2") };
        assert!(changed.is_changed());
        assert_eq!(changed.etag().as_str(), "e2");
        assert_eq!(changed.into_value(), Some(7));
    }
}
