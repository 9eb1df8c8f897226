//! Replays recorded responses instead of talking to the network.
//!
//! Routes are matched by method and URL prefix (query string included), the
//! longest matching prefix winning. Responses registered for the same route
//! are served in order, and the last one keeps being served once the queue
//! is drained, so a route answers any number of repeated calls.

use crate::error::TransportError;
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use async_trait::async_trait;
use reqwest::Method;
use std::collections::VecDeque;
use std::sync::Mutex;

struct Route {
    method: Method,
    url_prefix: String,
    responses: VecDeque<HttpResponse>,
}

/// An [`HttpClient`] serving canned responses and logging every request it sees.
#[derive(Default)]
pub struct ReplayClient {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl ReplayClient {
    /// Create a client with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response for `method` requests whose URL starts with `url_prefix`.
    #[must_use]
    pub fn on(self, method: Method, url_prefix: impl Into<String>, response: HttpResponse) -> Self {
        self.push(method, url_prefix.into(), response);
        self
    }

    /// Register a response for GET requests.
    #[must_use]
    pub fn on_get(self, url_prefix: impl Into<String>, response: HttpResponse) -> Self {
        self.on(Method::GET, url_prefix, response)
    }

    /// Register a response for POST requests.
    #[must_use]
    pub fn on_post(self, url_prefix: impl Into<String>, response: HttpResponse) -> Self {
        self.on(Method::POST, url_prefix, response)
    }

    fn push(&self, method: Method, url_prefix: String, response: HttpResponse) {
        let mut routes = self.routes.lock().expect("acquire replay routes lock");
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && r.url_prefix == url_prefix)
        {
            route.responses.push_back(response);
        } else {
            routes.push(Route {
                method,
                url_prefix,
                responses: VecDeque::from([response]),
            });
        }
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().expect("acquire replay log lock").clone()
    }

    /// Number of requests whose full URL starts with `url_prefix`.
    #[must_use]
    pub fn request_count(&self, url_prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter_map(|r| r.target().ok())
            .filter(|url| url.as_str().starts_with(url_prefix))
            .count()
    }
}

#[async_trait]
impl HttpClient for ReplayClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.target()?.to_string();
        let method = request.method.clone();
        self.log
            .lock()
            .expect("acquire replay log lock")
            .push(request);

        let mut routes = self.routes.lock().expect("acquire replay routes lock");
        let route = routes
            .iter_mut()
            .filter(|r| r.method == method && url.starts_with(&r.url_prefix))
            .max_by_key(|r| r.url_prefix.len())
            .ok_or_else(|| TransportError::NoRecordedResponse {
                method: method.to_string(),
                url: url.clone(),
            })?;

        let response = if route.responses.len() > 1 {
            route.responses.pop_front()
        } else {
            route.responses.front().cloned()
        };
        tracing::trace!("Replaying {} {}", method, url);
        response.ok_or(TransportError::NoRecordedResponse {
            method: method.to_string(),
            url,
        })
    }
}
