//! Walking one bank's adapter chain end to end.
//!
//! The order is fixed: session, profile, accounts, then statements per
//! account and optionally each statement's document. Failures before the
//! account list abort the walk; failures for one account or one document are
//! recorded and the walk moves on.

use crate::adapter::{BankAdapter, BankContext};
use passbook_core::{Account, AdapterError, Profile, Result, Statement, StatementPdf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What [`fetch_all`] should do beyond listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Download every listed statement
    pub download: bool,
    /// Keep only the newest N statements per account
    pub max_statements_per_account: Option<usize>,
}

/// Outcome of downloading one statement.
#[derive(Debug)]
pub struct DownloadOutcome {
    /// The statement requested
    pub statement: Statement,
    /// The document, or why it could not be fetched
    pub result: Result<StatementPdf>,
}

/// Everything gathered for one account.
#[derive(Debug)]
pub struct AccountReport {
    /// The account
    pub account: Arc<Account>,
    /// Listed statements, newest first; empty when listing failed
    pub statements: Vec<Statement>,
    /// Why listing failed, if it did
    pub error: Option<AdapterError>,
    /// Download outcomes, in statement order
    pub downloads: Vec<DownloadOutcome>,
}

/// Everything gathered for one bank.
#[derive(Debug)]
pub struct FetchReport {
    /// Bank identifier
    pub bank_id: &'static str,
    /// The logged-in profile
    pub profile: Arc<Profile>,
    /// Per-account results, in the order the bank listed the accounts
    pub accounts: Vec<AccountReport>,
}

impl FetchReport {
    /// Total statements listed across accounts.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.accounts.iter().map(|a| a.statements.len()).sum()
    }

    /// Number of documents downloaded successfully.
    #[must_use]
    pub fn downloaded_count(&self) -> usize {
        self.accounts
            .iter()
            .flat_map(|a| &a.downloads)
            .filter(|d| d.result.is_ok())
            .count()
    }

    /// Every recorded failure: account listings and downloads.
    #[must_use]
    pub fn failures(&self) -> Vec<&AdapterError> {
        self.accounts
            .iter()
            .flat_map(|a| {
                a.error
                    .iter()
                    .chain(a.downloads.iter().filter_map(|d| d.result.as_ref().err()))
            })
            .collect()
    }
}

/// Run the full chain for one bank.
///
/// # Errors
/// Returns the session, profile or accounts error that stopped the walk.
/// Per-account and per-document errors are recorded in the report instead.
pub async fn fetch_all(
    adapter: &dyn BankAdapter,
    ctx: &BankContext,
    options: FetchOptions,
) -> Result<FetchReport> {
    let bank = adapter.bank_id();

    let session_id = adapter.get_session_id(ctx.session())?;
    debug!(bank, "Found session");

    let profile = Arc::new(adapter.get_profile(ctx, &session_id).await?);
    info!(bank, profile_id = %profile.profile_id, "Loaded profile");

    let accounts = adapter.get_accounts(ctx, &profile).await?;

    let mut reports = Vec::with_capacity(accounts.len());
    for account in accounts {
        let account = Arc::new(account);
        let mut report = AccountReport {
            account: Arc::clone(&account),
            statements: Vec::new(),
            error: None,
            downloads: Vec::new(),
        };

        match adapter.get_statements(ctx, &account).await {
            Ok(mut statements) => {
                if let Some(limit) = options.max_statements_per_account {
                    statements.truncate(limit);
                }
                report.statements = statements;
            }
            Err(e) => {
                warn!(bank, account = %account.account_mask, "Listing statements failed: {}", e);
                report.error = Some(e);
            }
        }

        if options.download {
            for statement in &report.statements {
                let result = adapter.download_statement(ctx, statement).await;
                if let Err(e) = &result {
                    warn!(bank, statement_date = %statement.statement_date, "Download failed: {}", e);
                }
                report.downloads.push(DownloadOutcome {
                    statement: statement.clone(),
                    result,
                });
            }
        }

        reports.push(report);
    }

    let report = FetchReport {
        bank_id: bank,
        profile,
        accounts: reports,
    };
    info!(
        bank,
        accounts = report.accounts.len(),
        statements = report.statement_count(),
        downloaded = report.downloaded_count(),
        "Fetch complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banks::CitiAdapter;
    use crate::http::HttpResponse;
    use crate::replay::ReplayClient;
    use passbook_core::{BrowserState, ErrorKind};
    use serde_json::json;

    const BASE: &str = "https://online.citi.com/gcgapi/prod/public/v1";

    fn replay() -> ReplayClient {
        ReplayClient::new()
            .on_get(
                format!("{BASE}/digital/customers/profileBasicInfo"),
                HttpResponse::json_body(200, &json!({"firstName": "Jane", "customerId": "C-1"})),
            )
            .on_get(
                format!("{BASE}/digital/accounts/summary"),
                HttpResponse::json_body(200, &json!({"accounts": [
                    {"accountId": "a1", "displayAccountNumber": "xxxx1234", "productType": "CHECKING"},
                    {"accountId": "a2", "displayAccountNumber": "xxxx5678", "productType": "CREDIT_CARD"}
                ]})),
            )
            .on_post(
                format!("{BASE}/digital/deposits/statements/retrieve"),
                HttpResponse::json_body(200, &json!({"documents": [
                    {"documentDate": "2025-05-31", "documentKey": "k-may", "documentType": "STATEMENT"},
                    {"documentDate": "2025-04-30", "documentKey": "k-apr", "documentType": "STATEMENT"}
                ]})),
            )
            .on_get(
                format!("{BASE}/digital/card/accounts/a2/statements"),
                HttpResponse::new(500, ""),
            )
            .on_get(
                format!("{BASE}/digital/deposits/documents/k-may"),
                HttpResponse::pdf(vec![1u8; 100]),
            )
            .on_get(
                format!("{BASE}/digital/deposits/documents/k-apr"),
                HttpResponse::pdf(Vec::new()),
            )
    }

    fn context(state: BrowserState) -> BankContext {
        BankContext::new(Arc::new(replay()), Arc::new(state))
            .with_today("2025-06-15".parse().expect("date"))
    }

    #[tokio::test]
    async fn test_account_failure_does_not_abort() {
        let ctx = context(BrowserState::new().with_cookie("bcsid", "abc123", ".citi.com"));
        let report = fetch_all(&CitiAdapter::new(), &ctx, FetchOptions::default())
            .await
            .expect("report");

        assert_eq!(report.profile.profile_name, "Jane");
        assert_eq!(report.accounts.len(), 2);
        assert_eq!(report.accounts[0].statements.len(), 2);
        let error = report.accounts[1].error.as_ref().expect("card listing failed");
        assert_eq!(error.kind(), ErrorKind::Statements);
        assert_eq!(report.statement_count(), 2);
        assert!(report.accounts[0].downloads.is_empty());
    }

    #[tokio::test]
    async fn test_downloads_recorded_per_statement() {
        let ctx = context(BrowserState::new().with_cookie("bcsid", "abc123", ".citi.com"));
        let options = FetchOptions {
            download: true,
            ..FetchOptions::default()
        };
        let report = fetch_all(&CitiAdapter::new(), &ctx, options)
            .await
            .expect("report");

        assert_eq!(report.downloaded_count(), 1);
        let downloads = &report.accounts[0].downloads;
        assert_eq!(downloads.len(), 2);
        assert!(downloads[0].result.is_ok());
        assert!(downloads[1].result.is_err());
        assert_eq!(report.failures().len(), 2);
    }

    #[tokio::test]
    async fn test_statement_limit() {
        let ctx = context(BrowserState::new().with_cookie("bcsid", "abc123", ".citi.com"));
        let options = FetchOptions {
            download: false,
            max_statements_per_account: Some(1),
        };
        let report = fetch_all(&CitiAdapter::new(), &ctx, options)
            .await
            .expect("report");
        assert_eq!(report.accounts[0].statements.len(), 1);
        assert_eq!(report.accounts[0].statements[0].statement_id, "a1|k-may");
    }

    #[tokio::test]
    async fn test_missing_session_aborts() {
        let ctx = context(BrowserState::new());
        let err = fetch_all(&CitiAdapter::new(), &ctx, FetchOptions::default())
            .await
            .expect_err("no session");
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
