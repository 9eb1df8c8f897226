//! Transport-level errors.
//!
//! These never reach callers directly: adapters fold them into the
//! [`passbook_core::AdapterError`] variant of the operation in flight.

use thiserror::Error;

/// Errors raised by an [`HttpClient`](crate::http::HttpClient) before a response exists.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request URL could not be parsed
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// A replay client has nothing recorded for this request
    #[error("no recorded response for {method} {url}")]
    NoRecordedResponse {
        /// HTTP method
        method: String,
        /// Full request URL
        url: String,
    },

    /// The HTTP client could not be constructed
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}
