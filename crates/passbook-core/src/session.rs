//! Browser-managed session state.
//!
//! Adapters never log in. They rely on the cookies and web storage the user's
//! browser already holds for the bank's site. [`SessionStore`] is the read-only
//! view of that state, and [`BrowserState`] is a concrete snapshot that can be
//! exported from a browser profile as JSON.

use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Synchronous, read-only access to the browser's cookie jar and web storage.
pub trait SessionStore: Send + Sync {
    /// Value of the first cookie named `name` set for one of `domains`.
    ///
    /// A cookie belongs to a domain when its `Domain` attribute equals the
    /// domain or one of its subdomains. Cookies of other sites are ignored, so
    /// a state exported for several banks never leaks one bank's token into
    /// another bank's requests.
    fn cookie(&self, name: &str, domains: &[&str]) -> Option<String>;

    /// Value of a `sessionStorage` key, if set.
    fn session_storage(&self, key: &str) -> Option<String>;

    /// Value of a `localStorage` key, if set.
    fn local_storage(&self, key: &str) -> Option<String>;

    /// Every cookie in the store, for seeding an HTTP cookie jar.
    fn cookies(&self) -> Vec<CookieRecord>;
}

/// One browser cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain attribute, with or without the leading dot
    #[serde(default)]
    pub domain: String,
    /// Path attribute
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

impl CookieRecord {
    /// Create a cookie scoped to `domain` with path `/`.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
        }
    }

    /// Whether the cookie is set for one of `domains` or a subdomain of one.
    #[must_use]
    pub fn belongs_to(&self, domains: &[&str]) -> bool {
        let host = self.domain.trim_start_matches('.').to_ascii_lowercase();
        if host.is_empty() {
            return false;
        }
        domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Snapshot of a browser profile's state for one or more bank sites.
///
/// The JSON shape is:
///
/// ```json
/// {
///   "cookies": [{"name": "bcsid", "value": "abc123", "domain": ".citi.com"}],
///   "sessionStorage": {"sessionKey": "..."},
///   "localStorage": {}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserState {
    /// Cookies visible to the bank's pages
    pub cookies: Vec<CookieRecord>,
    /// `sessionStorage` entries
    pub session_storage: HashMap<String, String>,
    /// `localStorage` entries
    pub local_storage: HashMap<String, String>,
}

impl BrowserState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON browser state export.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid JSON.
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let state = serde_json::from_str(&contents)?;
        tracing::debug!("Loaded browser state from {}", path.display());
        Ok(state)
    }

    /// Add a cookie.
    #[must_use]
    pub fn with_cookie(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        self.cookies.push(CookieRecord::new(name, value, domain));
        self
    }

    /// Add a `sessionStorage` entry.
    #[must_use]
    pub fn with_session_storage(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.session_storage.insert(key.into(), value.into());
        self
    }

    /// Add a `localStorage` entry.
    #[must_use]
    pub fn with_local_storage(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.local_storage.insert(key.into(), value.into());
        self
    }
}

impl SessionStore for BrowserState {
    fn cookie(&self, name: &str, domains: &[&str]) -> Option<String> {
        self.cookies
            .iter()
            .find(|c| c.name == name && !c.value.is_empty() && c.belongs_to(domains))
            .map(|c| c.value.clone())
    }

    fn session_storage(&self, key: &str) -> Option<String> {
        self.session_storage
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn local_storage(&self, key: &str) -> Option<String> {
        self.local_storage.get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn cookies(&self) -> Vec<CookieRecord> {
        self.cookies.clone()
    }
}
