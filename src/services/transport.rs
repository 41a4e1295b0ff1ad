// Transport seam: the resolved request descriptor and the HTTP client behind it

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::domain::template::scalar_text;
use crate::error::TransportError;
use crate::services::cache::CacheStore;

/// A fully resolved request, ready for a transport
#[derive(Clone, Default)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: String,
    pub params: Option<Map<String, Value>>,
    pub data: Option<Value>,
    pub headers: Option<Map<String, Value>>,
    /// Store the transport may serve GET responses from
    pub cache: Option<Arc<dyn CacheStore>>,
}

impl RequestDescriptor {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            ..Self::default()
        }
    }

    /// `METHOD:url`, the key used to collapse identical in-flight requests
    pub fn signature(&self) -> String {
        format!("{}:{}", self.method, self.url)
    }

    /// Flattened query string pairs; lists repeat their key, nulls are dropped
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in self.params.iter().flatten() {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items.iter().filter(|item| !item.is_null()) {
                        pairs.push((key.clone(), scalar_text(item)));
                    }
                }
                other => pairs.push((key.clone(), scalar_text(other))),
            }
        }
        pairs
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("cache", &self.cache.as_ref().map(|c| c.id().to_string()))
            .finish()
    }
}

/// What a transport hands back; only `data` is read by the request builder
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub data: Value,
}

impl TransportResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            data,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport with JSON bodies
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
        }
    }

    /// Relative resource URLs are resolved against `base_url`
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, TransportError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| TransportError::new(format!("Invalid base URL '{}': {}", base_url, e)))?;
        self.base_url = Some(parsed);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, TransportError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Absolute URL including the query string
    pub fn resolve_url(&self, request: &RequestDescriptor) -> Result<Url, TransportError> {
        let mut url = match &self.base_url {
            Some(base) => base.join(&request.url),
            None => Url::parse(&request.url),
        }
        .map_err(|e| TransportError::new(format!("Invalid request URL '{}': {}", request.url, e)))?;

        let pairs = request.query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError> {
        let url = self.resolve_url(&request)?;
        let is_get = request.method.eq_ignore_ascii_case("GET");

        if is_get {
            if let Some(hit) = request.cache.as_ref().and_then(|c| c.get(url.as_str())) {
                tracing::debug!(url = %url, "Serving response from cache");
                return Ok(TransportResponse::ok(hit));
            }
        }

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::new(format!("Invalid HTTP method: {}", request.method)))?;

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in request.headers.iter().flatten() {
            builder = builder.header(name.as_str(), scalar_text(value));
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::new(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
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
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::new(format!("Failed to read response body: {}", e)))?;
        let data = parse_body(&text);

        if !status.is_success() {
            return Err(TransportError::new(format!("{} returned {}", url, status))
                .with_status(status.as_u16())
                .with_body(data));
        }

        if is_get {
            if let Some(cache) = &request.cache {
                cache.put(url.as_str(), data.clone());
            }
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            headers,
            data,
        })
    }
}

/// JSON when possible, otherwise the raw text; an empty body is `null`
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signature() {
        let request = RequestDescriptor::new("GET", "api/zoo/1");
        assert_eq!(request.signature(), "GET:api/zoo/1");
    }

    #[test]
    fn test_query_pairs_flatten_lists() {
        let mut request = RequestDescriptor::new("GET", "api/zoo");
        request.params = json!({"type": "panda", "tag": ["a", "b"], "skip": null, "page": 2})
            .as_object()
            .cloned();
        assert_eq!(
            request.query_pairs(),
            vec![
                ("type".to_string(), "panda".to_string()),
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_resolve_url_against_base() {
        let transport = HttpTransport::new()
            .with_base_url("https://example.com/")
            .unwrap();
        let mut request = RequestDescriptor::new("GET", "api/zoo");
        request.params = json!({"type": "giant panda"}).as_object().cloned();

        let url = transport.resolve_url(&request).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/zoo?type=giant+panda");
    }

    #[test]
    fn test_resolve_relative_url_without_base_fails() {
        let transport = HttpTransport::new();
        let request = RequestDescriptor::new("GET", "api/zoo");
        assert!(transport.resolve_url(&request).is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpTransport::new().with_base_url("not a url").is_err());
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"id\": 1}"), json!({"id": 1}));
        assert_eq!(parse_body("plain"), json!("plain"));
    }
}
