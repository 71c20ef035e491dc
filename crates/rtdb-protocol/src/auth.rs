use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::WireRequest;
use crate::names::{headers, params};

/// Credentials attached to every outgoing request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credentials {
    /// OAuth2 access token, sent as `Authorization: Bearer <token>`.
    AccessToken(String),
    /// Legacy database secret, sent as the `auth` query parameter.
    DatabaseSecret(String),
    #[default]
    Anonymous,
}

impl Credentials {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AccessToken(_) => "access-token",
            Self::DatabaseSecret(_) => "database-secret",
            Self::Anonymous => "anonymous",
        }
    }

    /// Attach these credentials to a request.
    pub fn apply(&self, request: &mut WireRequest) {
        match self {
            Self::AccessToken(token) => {
                request.set_header(headers::AUTHORIZATION, format!("Bearer {token}"));
            }
            Self::DatabaseSecret(secret) => {
                request.set_query(params::AUTH, secret.clone());
            }
            Self::Anonymous => {}
        }
    }
}

// Secrets never reach logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Self::DatabaseSecret(_) => f.write_str("DatabaseSecret(<redacted>)"),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}
