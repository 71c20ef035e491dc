use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use rtdb_protocol::{headers, Credentials, Method, WireRequest, WireResponse};
use tracing::debug;

use crate::error::{TransportError, TransportResult};
use crate::transport::Transport;

/// Connection settings for [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Database root, e.g. `https://my-db.example.com`.
    pub base_url: Url,
    pub credentials: Credentials,
    pub timeout: Duration,
    pub user_agent: String,
}

impl HttpTransportConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            credentials: Credentials::Anonymous,
            timeout: Duration::from_secs(30),
            user_agent: concat!("rtdb/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// [`Transport`] that speaks HTTP(S) through a pooled `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Internal(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// The absolute URL a request is sent to. Each path segment is
    /// percent-encoded, so keys such as `what?` or `50%off` stay in the path.
    pub fn url_for(&self, request: &WireRequest) -> TransportResult<Url> {
        let mut url = self.config.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::InvalidUrl(format!("{} cannot be a base", self.config.base_url))
            })?
            .pop_if_empty()
            .extend(request.path.split('/').filter(|s| !s.is_empty()));
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &request.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidUrl(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, mut request: WireRequest) -> TransportResult<WireResponse> {
        self.config.credentials.apply(&mut request);
        let url = self.url_for(&request)?;
        debug!(method = %request.method, path = %request.path, "sending request");

        let mut builder = self.client.request(to_reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body.take() {
            builder = builder
                .header(headers::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?;
        debug!(status, len = body.len(), "received response");

        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtdb_types::Path;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(HttpTransportConfig::new(Url::parse(base).unwrap())).unwrap()
    }

    #[test]
    fn url_joins_base_and_resource() {
        let t = transport("https://db.example.com/");
        let req = WireRequest::new(Method::Get, &Path::parse("users/alice").unwrap());
        assert_eq!(
            t.url_for(&req).unwrap().as_str(),
            "https://db.example.com/users/alice.json"
        );
    }

    #[test]
    fn url_encodes_reserved_characters_in_keys() {
        let t = transport("https://db.example.com");
        let req = WireRequest::new(Method::Get, &Path::root().child("what?").unwrap())
            .with_query("print", "silent");
        let url = t.url_for(&req).unwrap();
        assert_eq!(url.path(), "/what%3F.json");
        assert_eq!(url.query(), Some("print=silent"));

        let req = WireRequest::new(Method::Put, &Path::parse("deals/50%off").unwrap());
        assert_eq!(t.url_for(&req).unwrap().path(), "/deals/50%25off.json");
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let t = transport("https://db.example.com/tenant/");
        let req = WireRequest::new(Method::Get, &Path::parse("users/alice").unwrap());
        assert_eq!(
            t.url_for(&req).unwrap().as_str(),
            "https://db.example.com/tenant/users/alice.json"
        );

        let root = WireRequest::new(Method::Get, &Path::root());
        assert_eq!(t.url_for(&root).unwrap().path(), "/tenant/.json");
    }

    #[test]
    fn root_url() {
        let t = transport("https://db.example.com");
        let req = WireRequest::new(Method::Get, &Path::root());
        assert_eq!(t.url_for(&req).unwrap().as_str(), "https://db.example.com/.json");
    }

    #[test]
    fn url_encodes_query() {
        let t = transport("https://db.example.com");
        let req = WireRequest::new(Method::Get, &Path::root())
            .with_query("orderBy", "\"$key\"")
            .with_query("limitToFirst", "2");
        let url = t.url_for(&req).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("orderBy".to_string(), "\"$key\"".to_string()),
                ("limitToFirst".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn default_config() {
        let c = HttpTransportConfig::new(Url::parse("https://db.example.com").unwrap());
        assert_eq!(c.timeout, Duration::from_secs(30));
        assert!(c.user_agent.starts_with("rtdb/"));
        assert_eq!(c.credentials, Credentials::Anonymous);
    }
}
