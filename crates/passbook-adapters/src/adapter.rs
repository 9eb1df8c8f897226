//! The bank adapter contract and the per-call context adapters receive.

use crate::error::TransportError;
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use async_trait::async_trait;
use chrono::NaiveDate;
use passbook_core::{
    Account, AdapterError, AdapterSettings, Operation, Profile, Result, SessionStore, Statement,
    StatementPdf,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Trait every bank adapter implements.
///
/// The five operations form a chain: a session id leads to a profile, the
/// profile to its accounts, each account to its statements, and each
/// statement to a document. Every call receives all the state it needs as
/// arguments; implementations hold no mutable state, so one adapter instance
/// can serve concurrent calls.
#[async_trait]
pub trait BankAdapter: Send + Sync {
    /// Stable identifier, e.g. `"citi"`.
    fn bank_id(&self) -> &'static str;

    /// Display name, e.g. `"Citi"`.
    fn bank_name(&self) -> &'static str;

    /// Site domains this adapter handles, used to pick an adapter for a page.
    fn domains(&self) -> &'static [&'static str];

    /// Find evidence of a logged-in session in cookies or web storage.
    ///
    /// Never performs network I/O. The value may be a stand-in correlated with
    /// the real (often `HttpOnly`) session cookie; authentication itself rides
    /// on the cookie jar.
    ///
    /// # Errors
    /// Returns [`AdapterError::Authentication`] when no session evidence exists.
    fn get_session_id(&self, session: &dyn SessionStore) -> Result<String>;

    /// Fetch the logged-in user's profile.
    ///
    /// # Errors
    /// Returns [`AdapterError::Profile`] naming the field or API that failed.
    async fn get_profile(&self, ctx: &BankContext, session_id: &str) -> Result<Profile>;

    /// List the profile's accounts. Never returns an empty list.
    ///
    /// # Errors
    /// Returns [`AdapterError::Accounts`] on zero accounts or an unexpected shape.
    async fn get_accounts(&self, ctx: &BankContext, profile: &Arc<Profile>) -> Result<Vec<Account>>;

    /// List an account's statements, newest first.
    ///
    /// Periods with no statement are skipped, as are individual period probes
    /// that fail.
    ///
    /// # Errors
    /// Returns [`AdapterError::Statements`] on an unexpected shape or when no
    /// probe succeeded.
    async fn get_statements(
        &self,
        ctx: &BankContext,
        account: &Arc<Account>,
    ) -> Result<Vec<Statement>>;

    /// Download a statement document.
    ///
    /// # Errors
    /// Returns [`AdapterError::Download`] for empty or non-PDF payloads and
    /// [`AdapterError::GenerationTimeout`] when server-side generation never
    /// finishes.
    async fn download_statement(
        &self,
        ctx: &BankContext,
        statement: &Statement,
    ) -> Result<StatementPdf>;
}

/// Everything an adapter call may touch.
///
/// Cheap to clone; all members are shared handles or small values.
#[derive(Clone)]
pub struct BankContext {
    http: Arc<dyn HttpClient>,
    session: Arc<dyn SessionStore>,
    settings: AdapterSettings,
    today: NaiveDate,
}

impl BankContext {
    /// Create a context with default settings, dated today.
    pub fn new(http: Arc<dyn HttpClient>, session: Arc<dyn SessionStore>) -> Self {
        Self {
            http,
            session,
            settings: AdapterSettings::default(),
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Replace the adapter settings.
    #[must_use]
    pub fn with_settings(mut self, settings: AdapterSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Fix the reference date for lookback windows.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Browser session state.
    #[must_use]
    pub fn session(&self) -> &dyn SessionStore {
        self.session.as_ref()
    }

    /// Adapter settings.
    #[must_use]
    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// Reference date for lookback windows.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Send a request without interpreting the status.
    pub async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        tracing::debug!("{} {}", request.method, request.url);
        self.http.send(request).await
    }

    /// Send a request for `operation`, requiring a 2xx status.
    ///
    /// `endpoint` names the API in error messages.
    pub async fn fetch(
        &self,
        bank: &str,
        operation: Operation,
        endpoint: &str,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        let response = self
            .send(request)
            .await
            .map_err(|e| operation.fail(bank, format!("{endpoint}: {e}")))?;
        if !response.is_success() {
            tracing::debug!(bank, endpoint, status = response.status, "Request failed");
            return Err(operation.fail(bank, format!("{endpoint}: {}", response.status_line())));
        }
        Ok(response)
    }

    /// [`fetch`](Self::fetch) and parse the JSON body as `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        bank: &str,
        operation: Operation,
        endpoint: &str,
        request: HttpRequest,
    ) -> Result<T> {
        let response = self.fetch(bank, operation, endpoint, request).await?;
        response
            .json()
            .map_err(|e| operation.fail(bank, format!("{endpoint}: unexpected response shape: {e}")))
    }

    /// Send a request that belongs to downloading `statement_id`.
    ///
    /// Only transport failures are mapped here; the caller inspects the status.
    pub async fn send_for_download(
        &self,
        bank: &str,
        statement_id: &str,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        self.send(request)
            .await
            .map_err(|e| AdapterError::download(bank, statement_id, e.to_string()))
    }

    /// [`send_for_download`](Self::send_for_download), requiring a 2xx JSON body.
    pub async fn download_json<T: DeserializeOwned>(
        &self,
        bank: &str,
        statement_id: &str,
        endpoint: &str,
        request: HttpRequest,
    ) -> Result<T> {
        let response = self.send_for_download(bank, statement_id, request).await?;
        if !response.is_success() {
            return Err(AdapterError::download(
                bank,
                statement_id,
                format!("{endpoint}: {}", response.status_line()),
            ));
        }
        response.json().map_err(|e| {
            AdapterError::download(
                bank,
                statement_id,
                format!("{endpoint}: unexpected response shape: {e}"),
            )
        })
    }
}
