use rtdb_types::Path;

/// Header names used by the protocol.
pub mod headers {
    pub const ETAG: &str = "ETag";
    pub const REQUEST_ETAG: &str = "X-Firebase-ETag";
    pub const IF_MATCH: &str = "If-Match";
    pub const IF_NONE_MATCH: &str = "If-None-Match";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const USER_AGENT: &str = "User-Agent";
    pub const CONTENT_TYPE: &str = "Content-Type";
}

/// Query parameter names used by the protocol.
pub mod params {
    pub const PRINT: &str = "print";
    pub const SILENT: &str = "silent";
    pub const SHALLOW: &str = "shallow";
    pub const AUTH: &str = "auth";
    pub const AUTH_OVERRIDE: &str = "auth_variable_override";
    pub const ORDER_BY: &str = "orderBy";
    pub const LIMIT_TO_FIRST: &str = "limitToFirst";
    pub const LIMIT_TO_LAST: &str = "limitToLast";
    pub const START_AT: &str = "startAt";
    pub const END_AT: &str = "endAt";
    pub const EQUAL_TO: &str = "equalTo";
}

/// The HTTP resource for a logical path: the canonical form plus `.json`.
pub fn resource_path(path: &Path) -> String {
    if path.is_root() {
        "/.json".to_string()
    } else {
        format!("{path}.json")
    }
}
