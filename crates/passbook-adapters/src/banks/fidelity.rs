//! Fidelity adapter.
//!
//! Fidelity is investment-first: unknown account codes default to
//! [`AccountType::Investment`]. Statements are listed per calendar year, and
//! documents are generated server-side on request, so downloads poll a status
//! endpoint until the file is ready.

use super::common::{finish_accounts, finish_statements, parse_date, str_at};
use crate::adapter::{BankAdapter, BankContext};
use crate::http::HttpRequest;
use crate::pdf;
use crate::period::recent_years;
use crate::poll::poll_until;
use crate::scrape::script_json;
use crate::type_map::AccountTypeMap;
use async_trait::async_trait;
use passbook_core::{
    mask_from, Account, AccountType, AdapterError, Operation, Profile, Result, SessionStore,
    Statement, StatementPdf,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const BANK_ID: &str = "fidelity";
const DOMAINS: &[&str] = &["fidelity.com"];
const LOCAL_STORAGE_KEY: &str = "fid_session";
const SESSION_COOKIE: &str = "MC";
const CSRF_COOKIE: &str = "FC";
const DEFAULT_BASE_URL: &str = "https://digital.fidelity.com";
const NEXT_DATA: &str = "script#__NEXT_DATA__";
const ID_DELIMITER: &str = "::";

const ACCOUNT_TYPES: &[(&str, AccountType)] = &[
    ("BROKERAGE", AccountType::Investment),
    ("IRA", AccountType::Investment),
    ("ROTH_IRA", AccountType::Investment),
    ("401K", AccountType::Investment),
    ("HSA", AccountType::Investment),
    ("CMA", AccountType::Checking),
    ("CASH_MANAGEMENT", AccountType::Checking),
    ("CREDIT_CARD", AccountType::CreditCard),
];

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<FidelityAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FidelityAccount {
    acct_num: String,
    #[serde(default)]
    acct_name: String,
    #[serde(default)]
    acct_type: String,
}

#[derive(Debug, Deserialize)]
struct StatementsResponse {
    statements: Vec<FidelityStatement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FidelityStatement {
    id: String,
    period_end: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

fn encode_statement_id(account_number: &str, document_id: &str) -> String {
    format!("{account_number}{ID_DELIMITER}{document_id}")
}

fn decode_statement_id(statement_id: &str) -> Option<(&str, &str)> {
    statement_id
        .split_once(ID_DELIMITER)
        .filter(|(account, doc)| !account.is_empty() && !doc.is_empty())
}

/// Adapter for Fidelity Investments.
#[derive(Debug, Clone)]
pub struct FidelityAdapter {
    base_url: String,
}

impl FidelityAdapter {
    /// Create an adapter against the production site.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create an adapter against another site root.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn documents_url(&self, path: &str) -> String {
        format!("{}/ftgw/digital/documents/api/{path}", self.base_url)
    }

    fn api(ctx: &BankContext, request: HttpRequest) -> HttpRequest {
        request
            .header("accept", "application/json")
            .header_opt("X-CSRF-TOKEN", ctx.session().cookie(CSRF_COOKIE, DOMAINS))
    }
}

impl Default for FidelityAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BankAdapter for FidelityAdapter {
    fn bank_id(&self) -> &'static str {
        BANK_ID
    }

    fn bank_name(&self) -> &'static str {
        "Fidelity"
    }

    fn domains(&self) -> &'static [&'static str] {
        DOMAINS
    }

    fn get_session_id(&self, session: &dyn SessionStore) -> Result<String> {
        session
            .local_storage(LOCAL_STORAGE_KEY)
            .or_else(|| session.cookie(SESSION_COOKIE, DOMAINS))
            .ok_or_else(|| {
                AdapterError::authentication(BANK_ID, "missing fid_session storage entry and MC cookie")
            })
    }

    async fn get_profile(&self, ctx: &BankContext, session_id: &str) -> Result<Profile> {
        let request = HttpRequest::get(format!("{}/ftgw/digital/portfolio/summary", self.base_url))
            .header("accept", "text/html");
        let page = ctx
            .fetch(BANK_ID, Operation::Profile, "portfolio summary", request)
            .await?;
        let data = script_json(&page.text(), NEXT_DATA).ok_or_else(|| {
            Operation::Profile.fail(BANK_ID, "portfolio summary: no __NEXT_DATA__ script")
        })?;

        let name = str_at(&data, "/props/pageProps/user/displayName").ok_or_else(|| {
            Operation::Profile.fail(BANK_ID, "__NEXT_DATA__: missing user.displayName")
        })?;
        Ok(Profile {
            session_id: session_id.to_string(),
            profile_id: str_at(&data, "/props/pageProps/user/userId")
                .unwrap_or_else(|| session_id.to_string()),
            profile_name: name,
        })
    }

    async fn get_accounts(&self, ctx: &BankContext, profile: &Arc<Profile>) -> Result<Vec<Account>> {
        let request = HttpRequest::get(format!("{}/ftgw/digital/portfolio/api/accounts", self.base_url));
        let response: AccountsResponse = ctx
            .fetch_json(BANK_ID, Operation::Accounts, "portfolio accounts", Self::api(ctx, request))
            .await?;

        let types = AccountTypeMap::new(ACCOUNT_TYPES, AccountType::Investment)
            .with_overrides(ctx.settings().type_overrides(BANK_ID));
        let accounts = response
            .accounts
            .into_iter()
            .map(|a| Account {
                profile: Arc::clone(profile),
                account_mask: mask_from(&a.acct_num),
                account_type: types.resolve(&a.acct_type),
                account_name: a.acct_name,
                account_id: a.acct_num,
            })
            .collect();
        finish_accounts(BANK_ID, accounts)
    }

    async fn get_statements(
        &self,
        ctx: &BankContext,
        account: &Arc<Account>,
    ) -> Result<Vec<Statement>> {
        let years = recent_years(ctx.today(), ctx.settings().recent_years);
        let mut statements = Vec::new();
        let mut failures = Vec::new();

        for &year in &years {
            let request = HttpRequest::post(self.documents_url("statements")).json(json!({
                "accountNumber": account.account_id,
                "year": year,
            }));
            let response = match ctx.send(Self::api(ctx, request)).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(bank = BANK_ID, year, "Skipping statement year: {}", e);
                    failures.push(format!("{year}: {e}"));
                    continue;
                }
            };
            if response.status == 404 {
                tracing::debug!(bank = BANK_ID, year, "No statements for year");
                continue;
            }
            if !response.is_success() {
                tracing::warn!(bank = BANK_ID, year, status = response.status, "Skipping statement year");
                failures.push(format!("{year}: {}", response.status_line()));
                continue;
            }

            let listing: StatementsResponse = response.json().map_err(|e| {
                Operation::Statements.fail(
                    BANK_ID,
                    format!("statements {year}: unexpected response shape: {e}"),
                )
            })?;
            for entry in listing.statements {
                let date = parse_date(&entry.period_end).ok_or_else(|| {
                    Operation::Statements.fail(
                        BANK_ID,
                        format!("statements {year}: unparseable periodEnd {:?}", entry.period_end),
                    )
                })?;
                statements.push(Statement {
                    account: Arc::clone(account),
                    statement_id: encode_statement_id(&account.account_id, &entry.id),
                    statement_date: date,
                });
            }
        }

        if !years.is_empty() && failures.len() == years.len() {
            return Err(Operation::Statements.fail(
                BANK_ID,
                format!("every yearly listing failed, first: {}", failures[0]),
            ));
        }
        Ok(finish_statements(BANK_ID, account, statements))
    }

    async fn download_statement(
        &self,
        ctx: &BankContext,
        statement: &Statement,
    ) -> Result<StatementPdf> {
        let statement_id = statement.statement_id.as_str();
        let (account_number, document_id) = decode_statement_id(statement_id)
            .ok_or_else(|| AdapterError::download(BANK_ID, statement_id, "malformed statement id"))?;

        let generate = HttpRequest::post(self.documents_url("pdf/generate")).json(json!({
            "accountNumber": account_number,
            "documentId": document_id,
        }));
        let generated: GenerateResponse = ctx
            .download_json(BANK_ID, statement_id, "pdf/generate", Self::api(ctx, generate))
            .await?;
        let request_id = generated.request_id;
        tracing::debug!(bank = BANK_ID, request_id = %request_id, "Requested document generation");

        let status_url = self.documents_url(&format!("pdf/status/{request_id}"));
        poll_until(ctx.settings(), BANK_ID, statement_id, |_| {
            let request = Self::api(ctx, HttpRequest::get(status_url.clone()));
            async move {
                ctx.download_json(BANK_ID, statement_id, "pdf/status", request)
                    .await
                    .and_then(|status: StatusResponse| match status.status.as_str() {
                        "READY" => Ok(Some(())),
                        "FAILED" => Err(AdapterError::download(
                            BANK_ID,
                            statement_id,
                            "document generation failed",
                        )),
                        _ => Ok(None),
                    })
            }
        })
        .await?;

        let fetch = HttpRequest::get(self.documents_url(&format!("pdf/{request_id}")))
            .header("accept", "application/pdf")
            .header_opt("X-CSRF-TOKEN", ctx.session().cookie(CSRF_COOKIE, DOMAINS));
        let response = ctx.send_for_download(BANK_ID, statement_id, fetch).await?;
        let document = pdf::from_response(BANK_ID, statement_id, response)?;
        tracing::info!(bank = BANK_ID, bytes = document.len(), "Downloaded statement");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::replay::ReplayClient;
    use passbook_core::{AdapterSettings, BrowserState, ErrorKind};
    use std::time::Duration;

    const SUMMARY_PAGE: &str = r#"<html><body>
        <script id="__NEXT_DATA__" type="application/json">
          {"props":{"pageProps":{"user":{"userId":"U-55","displayName":"Jane Doe"}}}}
        </script></body></html>"#;

    fn context(client: ReplayClient, max_attempts: u32) -> (Arc<ReplayClient>, BankContext) {
        let client = Arc::new(client);
        let state = BrowserState::new().with_local_storage("fid_session", "fid-1");
        let settings = AdapterSettings {
            recent_years: 2,
            poll_interval: Duration::from_millis(500),
            poll_max_attempts: max_attempts,
            ..AdapterSettings::default()
        };
        let ctx = BankContext::new(client.clone(), Arc::new(state))
            .with_settings(settings)
            .with_today("2025-06-15".parse().expect("date"));
        (client, ctx)
    }

    fn brokerage() -> Arc<Account> {
        Arc::new(Account {
            profile: Arc::new(Profile {
                session_id: "fid-1".to_string(),
                profile_id: "U-55".to_string(),
                profile_name: "Jane Doe".to_string(),
            }),
            account_id: "Z12345678".to_string(),
            account_name: "Individual".to_string(),
            account_mask: "5678".to_string(),
            account_type: AccountType::Investment,
        })
    }

    fn statement() -> Statement {
        Statement {
            account: brokerage(),
            statement_id: "Z12345678::D-2025-05".to_string(),
            statement_date: "2025-05-31".parse().expect("date"),
        }
    }

    fn docs(path: &str) -> String {
        format!("{DEFAULT_BASE_URL}/ftgw/digital/documents/api/{path}")
    }

    #[test]
    fn test_session_sources() {
        let adapter = FidelityAdapter::new();
        let state = BrowserState::new().with_cookie("MC", "mc-cookie", ".fidelity.com");
        assert_eq!(adapter.get_session_id(&state).expect("session"), "mc-cookie");
        let state = state.with_local_storage("fid_session", "fid-1");
        assert_eq!(adapter.get_session_id(&state).expect("session"), "fid-1");
    }

    #[test]
    fn test_statement_id_round_trip() {
        let id = encode_statement_id("Z12345678", "D:1");
        assert_eq!(decode_statement_id(&id), Some(("Z12345678", "D:1")));
        assert_eq!(decode_statement_id("Z12345678"), None);
    }

    #[tokio::test]
    async fn test_profile_from_next_data() {
        let (_, ctx) = context(
            ReplayClient::new().on_get(
                format!("{DEFAULT_BASE_URL}/ftgw/digital/portfolio/summary"),
                HttpResponse::html(SUMMARY_PAGE),
            ),
            3,
        );
        let profile = FidelityAdapter::new()
            .get_profile(&ctx, "fid-1")
            .await
            .expect("profile");
        assert_eq!(profile.profile_name, "Jane Doe");
        assert_eq!(profile.profile_id, "U-55");
    }

    #[tokio::test]
    async fn test_unmapped_accounts_default_to_investment() {
        let (_, ctx) = context(
            ReplayClient::new().on_get(
                format!("{DEFAULT_BASE_URL}/ftgw/digital/portfolio/api/accounts"),
                HttpResponse::json_body(200, &json!({"accounts": [
                    {"acctNum": "Z12345678", "acctName": "Individual", "acctType": "TOD_INDIVIDUAL"},
                    {"acctNum": "X99990001", "acctName": "Cash Management", "acctType": "CMA"}
                ]})),
            ),
            3,
        );
        let accounts = FidelityAdapter::new()
            .get_accounts(&ctx, &brokerage().profile)
            .await
            .expect("accounts");
        assert_eq!(accounts[0].account_type, AccountType::Investment);
        assert_eq!(accounts[1].account_type, AccountType::Checking);
        assert_eq!(accounts[1].account_mask, "0001");
    }

    #[tokio::test]
    async fn test_statements_per_year_skip_missing_year() {
        let (client, ctx) = context(
            ReplayClient::new()
                .on_post(
                    docs("statements"),
                    HttpResponse::json_body(200, &json!({"statements": [
                        {"id": "D-2025-04", "periodEnd": "2025-04-30"},
                        {"id": "D-2025-05", "periodEnd": "2025-05-31"}
                    ]})),
                )
                .on_post(docs("statements"), HttpResponse::new(404, "")),
            3,
        );
        let statements = FidelityAdapter::new()
            .get_statements(&ctx, &brokerage())
            .await
            .expect("statements");
        let ids: Vec<&str> = statements.iter().map(|s| s.statement_id.as_str()).collect();
        assert_eq!(ids, vec!["Z12345678::D-2025-05", "Z12345678::D-2025-04"]);
        assert_eq!(client.request_count(&docs("statements")), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_polls_until_ready() {
        let (client, ctx) = context(
            ReplayClient::new()
                .on_post(
                    docs("pdf/generate"),
                    HttpResponse::json_body(200, &json!({"requestId": "R1"})),
                )
                .on_get(docs("pdf/status/R1"), HttpResponse::json_body(200, &json!({"status": "PENDING"})))
                .on_get(docs("pdf/status/R1"), HttpResponse::json_body(200, &json!({"status": "READY"})))
                .on_get(docs("pdf/R1"), HttpResponse::pdf(vec![4u8; 15_000])),
            5,
        );
        let document = FidelityAdapter::new()
            .download_statement(&ctx, &statement())
            .await
            .expect("download");
        assert_eq!(document.len(), 15_000);
        assert_eq!(client.request_count(&docs("pdf/status/R1")), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_times_out() {
        let (client, ctx) = context(
            ReplayClient::new()
                .on_post(
                    docs("pdf/generate"),
                    HttpResponse::json_body(200, &json!({"requestId": "R1"})),
                )
                .on_get(docs("pdf/status/R1"), HttpResponse::json_body(200, &json!({"status": "PENDING"}))),
            3,
        );
        let err = FidelityAdapter::new()
            .download_statement(&ctx, &statement())
            .await
            .expect_err("timeout");
        assert!(matches!(err, AdapterError::GenerationTimeout { attempts: 3, .. }));
        assert_eq!(err.kind(), ErrorKind::Download);
        assert_eq!(client.request_count(&docs("pdf/status/R1")), 3);
        assert_eq!(client.request_count(&docs("pdf/R1")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_failure_stops_polling() {
        let (client, ctx) = context(
            ReplayClient::new()
                .on_post(
                    docs("pdf/generate"),
                    HttpResponse::json_body(200, &json!({"requestId": "R1"})),
                )
                .on_get(docs("pdf/status/R1"), HttpResponse::json_body(200, &json!({"status": "FAILED"}))),
            10,
        );
        let err = FidelityAdapter::new()
            .download_statement(&ctx, &statement())
            .await
            .expect_err("failed");
        assert!(err.to_string().contains("generation failed"));
        assert_eq!(client.request_count(&docs("pdf/status/R1")), 1);
    }
}
