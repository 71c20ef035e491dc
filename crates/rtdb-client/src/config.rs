use std::path::Path as FsPath;
use std::time::Duration;

use rtdb_protocol::Credentials;
use rtdb_transport::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DbError, DbResult};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_TRANSACTION_ATTEMPTS: u32 = 20;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_user_agent() -> String {
    concat!("rtdb/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_transaction_attempts() -> u32 {
    DEFAULT_MAX_TRANSACTION_ATTEMPTS
}

/// Settings for a [`Client`](crate::Client) talking to a remote database.
///
/// Loadable from TOML:
///
/// ```toml
/// database_url = "https://my-db.example.com"
/// credentials = { access_token = "..." }
/// max_transaction_attempts = 10
///
/// [auth_override]
/// uid = "user1"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub database_url: String,
    #[serde(default)]
    pub credentials: Credentials,
    /// Limits a privileged credential to the authority of this simulated
    /// user, sent as `auth_variable_override` on every request.
    #[serde(default)]
    pub auth_override: Option<Map<String, Value>>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_transaction_attempts")]
    pub max_transaction_attempts: u32,
}

impl ClientConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            credentials: Credentials::Anonymous,
            auth_override: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: default_user_agent(),
            max_transaction_attempts: DEFAULT_MAX_TRANSACTION_ATTEMPTS,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_auth_override(mut self, auth_override: Map<String, Value>) -> Self {
        self.auth_override = Some(auth_override);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_transaction_attempts(mut self, attempts: u32) -> Self {
        self.max_transaction_attempts = attempts;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> DbResult<Self> {
        toml::from_str(s).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<FsPath>) -> DbResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Check the settings and return the normalized database URL.
    pub fn validate(&self) -> DbResult<Url> {
        let trimmed = self.database_url.trim().trim_end_matches('/');
        let url = Url::parse(trimmed).map_err(|e| {
            DbError::Config(format!("invalid database url {:?}: {e}", self.database_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DbError::Config(format!(
                "database url must use http or https, got {:?}",
                url.scheme()
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(DbError::Config("database url has no host".into()));
        }
        if self.max_transaction_attempts == 0 {
            return Err(DbError::Config("max_transaction_attempts must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(DbError::Config("timeout_ms must be positive".into()));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let c = ClientConfig::new("https://db.example.com");
        assert_eq!(c.timeout(), Duration::from_secs(30));
        assert_eq!(c.max_transaction_attempts, 20);
        assert_eq!(c.credentials, Credentials::Anonymous);
        assert!(c.auth_override.is_none());
        assert!(c.user_agent.starts_with("rtdb/"));
    }

    #[test]
    fn validate_normalizes_url() {
        let url = ClientConfig::new("https://db.example.com/").validate().unwrap();
        assert_eq!(url.host_str(), Some("db.example.com"));
        assert!(ClientConfig::new("http://localhost:9000").validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_settings() {
        for url in ["", "not a url", "ftp://db.example.com"] {
            let err = ClientConfig::new(url).validate().unwrap_err();
            assert!(matches!(err, DbError::Config(_)), "{url}: {err}");
        }
        let err = ClientConfig::new("https://db.example.com")
            .with_max_transaction_attempts(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn parse_toml() {
        let c = ClientConfig::from_toml_str(
            r#"
            database_url = "https://db.example.com"
            credentials = { access_token = "tok" }
            timeout_ms = 5000
            max_transaction_attempts = 3

            [auth_override]
            uid = "user1"
            "#,
        )
        .unwrap();
        assert_eq!(c.credentials, Credentials::AccessToken("tok".into()));
        assert_eq!(c.timeout(), Duration::from_secs(5));
        assert_eq!(c.max_transaction_attempts, 3);
        assert_eq!(
            c.auth_override.map(Value::Object),
            Some(json!({"uid": "user1"}))
        );
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let c = ClientConfig::from_toml_str(r#"database_url = "https://db.example.com""#).unwrap();
        assert_eq!(c, ClientConfig::new("https://db.example.com"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rtdb.toml");
        std::fs::write(&path, "database_url = \"https://db.example.com\"\n").unwrap();
        assert_eq!(
            ClientConfig::load(&path).unwrap().database_url,
            "https://db.example.com"
        );
        assert!(matches!(
            ClientConfig::load(dir.path().join("missing.toml")),
            Err(DbError::Config(_))
        ));
    }
}
