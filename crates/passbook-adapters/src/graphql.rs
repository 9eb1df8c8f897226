//! GraphQL request construction and `{data, errors}` envelope handling.

use crate::http::{HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// A GraphQL operation ready to be posted.
#[derive(Debug, Clone)]
pub struct GraphqlRequest {
    operation_name: String,
    query: String,
    variables: Value,
}

impl GraphqlRequest {
    /// Create an operation with no variables.
    pub fn new(operation_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            query: query.into(),
            variables: json!({}),
        }
    }

    /// Set the operation variables.
    #[must_use]
    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    /// Operation name.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Build the POST request for `endpoint`.
    #[must_use]
    pub fn into_http(self, endpoint: &str) -> HttpRequest {
        HttpRequest::post(endpoint)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(json!({
                "operationName": self.operation_name,
                "query": self.query,
                "variables": self.variables,
            }))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Unwrap the `data` member of a GraphQL response.
///
/// Returns a message describing the failure when the transport status is not
/// 2xx, the envelope carries errors, `data` is absent, or `data` does not
/// match `T`. Callers wrap the message in the error variant of their operation.
pub fn unwrap_envelope<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, String> {
    if !response.is_success() {
        return Err(response.status_line());
    }
    let envelope: Envelope<T> = response
        .json()
        .map_err(|e| format!("unexpected GraphQL response shape: {e}"))?;
    if let Some(first) = envelope.errors.first() {
        return Err(format!("GraphQL error: {}", first.message));
    }
    envelope
        .data
        .ok_or_else(|| "GraphQL response has no data".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestBody;

    #[derive(Debug, Deserialize)]
    struct Data {
        customer: Customer,
    }

    #[derive(Debug, Deserialize)]
    struct Customer {
        id: String,
    }

    #[test]
    fn test_into_http_body() {
        let request = GraphqlRequest::new("Profile", "query Profile { customer { id } }")
            .variables(json!({"locale": "en-US"}))
            .into_http("https://bank.test/graphql");

        let RequestBody::Json(body) = &request.body else {
            panic!("expected JSON body");
        };
        assert_eq!(body["operationName"], "Profile");
        assert_eq!(body["variables"]["locale"], "en-US");
        assert_eq!(request.header_value("content-type"), Some("application/json"));
    }

    #[test]
    fn test_unwrap_envelope_data() {
        let response = HttpResponse::json_body(200, &json!({"data": {"customer": {"id": "c1"}}}));
        let data: Data = unwrap_envelope(&response).expect("data present");
        assert_eq!(data.customer.id, "c1");
    }

    #[test]
    fn test_unwrap_envelope_errors() {
        let response = HttpResponse::json_body(
            200,
            &json!({"data": null, "errors": [{"message": "UNAUTHENTICATED"}]}),
        );
        let err = unwrap_envelope::<Data>(&response).expect_err("errors present");
        assert_eq!(err, "GraphQL error: UNAUTHENTICATED");
    }

    #[test]
    fn test_unwrap_envelope_http_failure() {
        let response = HttpResponse::new(503, "down");
        let err = unwrap_envelope::<Data>(&response).expect_err("http failure");
        assert_eq!(err, "HTTP 503 Service Unavailable");
    }
}
