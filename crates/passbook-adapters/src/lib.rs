//! Passbook Adapters - per-bank statement retrieval over an existing browser session.
//!
//! Each adapter replays one bank's private web API with the cookies and web
//! storage of a logged-in browser, and reshapes the responses into the shared
//! `Profile` / `Account` / `Statement` model from `passbook-core`.
//!
//! # Features
//!
//! - **Adapter Trait**: One [`BankAdapter`] contract for every bank
//! - **Pluggable Transport**: Adapters talk to an [`HttpClient`]; production uses
//!   reqwest with a seeded cookie jar, tests use the canned [`ReplayClient`]
//! - **Registry**: Look adapters up by id or by site domain
//! - **Host Driver**: [`fetch_all`] walks session, profile, accounts, statements
//!   and downloads for one bank
//!
//! # Example
//!
//! ```rust,no_run
//! use passbook_adapters::{fetch_all, AdapterRegistry, BankContext, FetchOptions, ReqwestClient};
//! use passbook_core::{AppConfig, BrowserState};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load_with_env()?;
//! let state = BrowserState::from_json_file(Path::new("citi-state.json"))?;
//! let http = ReqwestClient::new(&state, &config.http)?;
//! let ctx = BankContext::new(Arc::new(http), Arc::new(state))
//!     .with_settings(config.adapter_settings());
//!
//! let registry = AdapterRegistry::with_default_adapters();
//! let adapter = registry.get("citi")?;
//! let report = fetch_all(adapter.as_ref(), &ctx, FetchOptions::default()).await?;
//! println!("{} statements", report.statement_count());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
pub mod banks;
pub mod error;
pub mod graphql;
pub mod http;
pub mod pdf;
pub mod period;
pub mod poll;
pub mod registry;
pub mod replay;
pub mod scrape;
pub mod session_flow;
pub mod type_map;

// Re-export commonly used types
pub use adapter::{BankAdapter, BankContext};
pub use banks::{AllyAdapter, AmexAdapter, CitiAdapter, FidelityAdapter, WellsFargoAdapter};
pub use error::TransportError;
pub use http::{HttpClient, HttpRequest, HttpResponse, RequestBody, ReqwestClient};
pub use registry::AdapterRegistry;
pub use replay::ReplayClient;
pub use session_flow::{fetch_all, AccountReport, DownloadOutcome, FetchOptions, FetchReport};
pub use type_map::AccountTypeMap;
