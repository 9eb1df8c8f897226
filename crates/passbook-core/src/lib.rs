//! Passbook Core - Foundation crate for the Passbook statement fetcher.
//!
//! This crate provides the data model every bank adapter produces, the shared
//! error taxonomy, configuration management, and the read-only view of the
//! browser session adapters authenticate with.
//!
//! # Modules
//!
//! - [`error`] - Adapter and configuration error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - `Profile`, `Account`, `Statement` and `AccountType`
//! - [`session`] - Cookie and web storage access (`SessionStore`, `BrowserState`)
//!
//! # Example
//!
//! ```rust
//! use passbook_core::{AppConfig, BrowserState, SessionStore};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.adapter_settings().lookback_months, 12);
//!
//! let state = BrowserState::new().with_cookie("bcsid", "abc123", ".citi.com");
//! assert_eq!(state.cookie("bcsid", &["citi.com"]).as_deref(), Some("abc123"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::{
    AdapterSettings, AppConfig, HttpConfig, OutputConfig, PollingConfig, StatementsConfig,
};
pub use error::{AdapterError, ConfigError, ConfigResult, ErrorKind, Operation, Result};
pub use session::{BrowserState, CookieRecord, SessionStore};
pub use types::{
    dedup_accounts, mask_from, sort_newest_first, Account, AccountType, Profile, Statement,
    StatementPdf,
};
