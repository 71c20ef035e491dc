use std::fmt;
use std::sync::Arc;

use rtdb_protocol::{params, WireRequest, WireResponse};
use rtdb_transport::{HttpTransport, HttpTransportConfig, Transport};
use rtdb_types::Path;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{ClientConfig, DEFAULT_MAX_TRANSACTION_ATTEMPTS};
use crate::error::DbResult;
use crate::reference::Ref;

/// Handle to one remote database.
///
/// Cloning is cheap and every clone shares the same transport. A client
/// never mutates after construction, so it can be used from many tasks at
/// once.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    auth_override: Option<Arc<str>>,
    max_transaction_attempts: u32,
}

impl Client {
    /// Connect over HTTP(S) using `config`.
    pub fn new(config: ClientConfig) -> DbResult<Self> {
        let base_url = config.validate()?;
        let transport = HttpTransport::new(HttpTransportConfig {
            base_url,
            credentials: config.credentials.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })?;
        let client = Self::with_transport(Arc::new(transport))
            .max_transaction_attempts(config.max_transaction_attempts);
        Ok(match config.auth_override {
            Some(auth) => client.auth_override(auth),
            None => client,
        })
    }

    /// Use an arbitrary transport, e.g. an in-memory one in tests.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            auth_override: None,
            max_transaction_attempts: DEFAULT_MAX_TRANSACTION_ATTEMPTS,
        }
    }

    /// Act with the authority of the given simulated user.
    pub fn auth_override(mut self, auth: Map<String, Value>) -> Self {
        self.auth_override = Some(Value::Object(auth).to_string().into());
        self
    }

    /// Default commit bound for [`Ref::transaction`].
    pub fn max_transaction_attempts(mut self, attempts: u32) -> Self {
        self.max_transaction_attempts = attempts;
        self
    }

    pub fn transaction_attempts(&self) -> u32 {
        self.max_transaction_attempts
    }

    /// A reference to `path`, parsed leniently (stray slashes are ignored).
    pub fn new_ref(&self, path: &str) -> DbResult<Ref> {
        Ok(Ref::new(self.clone(), Path::parse(path)?))
    }

    /// A reference to the root of the tree.
    pub fn root(&self) -> Ref {
        Ref::new(self.clone(), Path::root())
    }

    pub(crate) async fn send(&self, mut request: WireRequest) -> DbResult<WireResponse> {
        if let Some(auth) = &self.auth_override {
            request.set_query(params::AUTH_OVERRIDE, auth.as_ref());
        }
        debug!(method = %request.method, path = %request.path, "dispatching request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "response received");
        Ok(response)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("auth_override", &self.auth_override)
            .field("max_transaction_attempts", &self.max_transaction_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use rtdb_protocol::{Method, WireResponse};
    use rtdb_transport::ScriptedTransport;
    use serde_json::json;

    #[test]
    fn new_ref_normalizes() {
        let client = Client::with_transport(Arc::new(ScriptedTransport::new()));
        assert_eq!(client.new_ref("/a//b/").unwrap().path().to_string(), "/a/b");
        assert!(client.root().path().is_root());
        assert!(matches!(client.new_ref("a/b.c"), Err(DbError::InvalidPath(_))));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = Client::new(ClientConfig::new("ftp://db.example.com")).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[tokio::test]
    async fn auth_override_is_sent_on_every_request() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_fallback(WireResponse::json(200, &json!(null)));
        let auth = json!({"uid": "user1"}).as_object().cloned().unwrap();
        let client = Client::with_transport(transport.clone()).auth_override(auth);

        client
            .send(WireRequest::new(Method::Get, &Path::root()))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(
            requests[0].query_param("auth_variable_override"),
            Some(r#"{"uid":"user1"}"#)
        );
    }

    #[test]
    fn debug_hides_transport() {
        let client =
            Client::with_transport(Arc::new(ScriptedTransport::new())).max_transaction_attempts(5);
        let rendered = format!("{client:?}");
        assert!(rendered.contains("max_transaction_attempts: 5"));
    }
}
