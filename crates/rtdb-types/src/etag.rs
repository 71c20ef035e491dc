use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque version token for the value stored at a path.
///
/// Issued by the remote service on reads and handed back on conditional
/// requests. Equality is the only meaningful operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ETag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ETag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_token() {
        assert_eq!(ETag::new("abc"), ETag::from("abc"));
        assert_ne!(ETag::new("abc"), ETag::new("abd"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&ETag::new("v1")).unwrap();
        assert_eq!(json, "\"v1\"");
    }
}
