//! HTTP request/response types and the client seam adapters send through.
//!
//! Adapters build every request themselves (headers, CSRF tokens, correlation
//! ids). The client only carries the browser's cookies along, which is the
//! equivalent of `fetch(..., { credentials: "include" })` in a page context.

use crate::error::TransportError;
use async_trait::async_trait;
use passbook_core::{HttpConfig, SessionStore};
use reqwest::cookie::Jar;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Sends requests on behalf of an adapter.
///
/// Implementations must be thread-safe (Send + Sync) so one client can serve
/// adapters for different banks concurrently.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a request and buffer the full response.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    ///
    /// # Errors
    /// Returns error if the request cannot be sent or no response arrives.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Request body variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body
    Empty,
    /// JSON body, sent with `content-type: application/json`
    Json(Value),
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Base URL, without the query pairs below
    pub url: String,
    /// Query pairs appended to `url`
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: RequestBody,
}

impl HttpRequest {
    /// Create a request.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a header when `value` is present.
    #[must_use]
    pub fn header_opt(self, name: impl Into<String>, value: Option<String>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    /// Append a query pair.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Set a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// The full target URL including query pairs.
    ///
    /// # Errors
    /// Returns error if `url` is not absolute.
    pub fn target(&self) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.url).map_err(|e| TransportError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }

    /// Value of the first header named `name` (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Reason phrase; empty when the status has no known phrase
    pub reason: String,
    /// Headers, names lowercased
    pub headers: HashMap<String, String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response with no headers and the standard reason phrase.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: canonical_reason(status).to_string(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// A JSON response.
    #[must_use]
    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string()).with_header("content-type", "application/json")
    }

    /// An HTML response.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(200, body.into()).with_header("content-type", "text/html; charset=utf-8")
    }

    /// A PDF response.
    pub fn pdf(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(200, bytes).with_header("content-type", "application/pdf")
    }

    /// Replace the reason phrase, e.g. with one a bank sent verbatim.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value of a header (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `content-type` header, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    ///
    /// # Errors
    /// Returns error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// `HTTP <status> <reason>`, as used in error messages.
    #[must_use]
    pub fn status_line(&self) -> String {
        let reason = self.reason.trim();
        if reason.is_empty() {
            format!("HTTP {} Unknown Status", self.status)
        } else {
            format!("HTTP {} {}", self.status, reason)
        }
    }
}

fn canonical_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
}

/// [`HttpClient`] backed by `reqwest`, carrying the browser's cookies.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Build a client whose cookie jar is seeded from `session`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(session: &dyn SessionStore, config: &HttpConfig) -> Result<Self, TransportError> {
        let jar = Arc::new(Jar::default());
        let mut seeded = 0usize;
        for cookie in session.cookies() {
            let domain = cookie.domain.trim_start_matches('.');
            if domain.is_empty() {
                tracing::warn!("Skipping cookie {} without a domain", cookie.name);
                continue;
            }
            let Ok(origin) = Url::parse(&format!("https://{domain}{}", cookie.path)) else {
                tracing::warn!("Skipping cookie {} with unusable domain {}", cookie.name, domain);
                continue;
            };
            jar.add_cookie_str(
                &format!(
                    "{}={}; Domain={}; Path={}",
                    cookie.name, cookie.value, cookie.domain, cookie.path
                ),
                &origin,
            );
            seeded += 1;
        }
        tracing::debug!(cookies = seeded, "Seeded cookie jar from browser state");

        let client = Client::builder()
            .cookie_provider(jar)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.target()?;
        let mut builder = self.client.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        // reqwest only exposes the registered phrase for a status code
        let reason = canonical_reason(status).to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            reason,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_core::BrowserState;
    use serde_json::json;

    #[test]
    fn test_request_target_with_query() {
        let request = HttpRequest::get("https://example.com/statements")
            .query("year", 2025)
            .query("month", "03");
        assert_eq!(
            request.target().expect("valid url").as_str(),
            "https://example.com/statements?year=2025&month=03"
        );
    }

    #[test]
    fn test_request_target_rejects_relative() {
        let request = HttpRequest::get("/statements");
        assert!(matches!(
            request.target(),
            Err(TransportError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_header_opt_and_lookup() {
        let request = HttpRequest::post("https://example.com")
            .header("X-XSRF-TOKEN", "t1")
            .header_opt("X-Missing", None);
        assert_eq!(request.header_value("x-xsrf-token"), Some("t1"));
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::json_body(200, &json!({"firstName": "Jane"}));
        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("application/json"));
        let value: Value = response.json().expect("parse json");
        assert_eq!(value["firstName"], "Jane");

        let missing = HttpResponse::new(404, Vec::new());
        assert!(!missing.is_success());
        assert_eq!(missing.reason, "Not Found");
        assert_eq!(missing.status_line(), "HTTP 404 Not Found");
    }

    #[test]
    fn test_status_line_keeps_supplied_reason() {
        let response = HttpResponse::new(403, "").with_reason("Session Expired");
        assert_eq!(response.status_line(), "HTTP 403 Session Expired");

        let unknown = HttpResponse::new(599, "");
        assert_eq!(unknown.reason, "");
        assert_eq!(unknown.status_line(), "HTTP 599 Unknown Status");
    }

    #[test]
    fn test_reqwest_client_builds_with_cookies() {
        let state = BrowserState::new()
            .with_cookie("bcsid", "abc123", ".citi.com")
            .with_cookie("orphan", "x", "");
        let client = ReqwestClient::new(&state, &HttpConfig::default());
        assert!(client.is_ok());
    }
}
