//! Wells Fargo adapter.
//!
//! The account overview page embeds the customer and account list as a
//! `window.__WF_STATE__` assignment, so profile and accounts are scraped from
//! HTML. Statements have no list endpoint; each month of the lookback window is
//! probed on its own, concurrently.

use super::common::{display_name, finish_accounts, finish_statements, parse_date};
use crate::adapter::{BankAdapter, BankContext};
use crate::http::HttpRequest;
use crate::pdf;
use crate::period::{recent_months, YearMonth};
use crate::scrape::assigned_json;
use crate::type_map::{classify_by_name, AccountTypeMap};
use async_trait::async_trait;
use futures::future::join_all;
use passbook_core::{
    mask_from, Account, AccountType, AdapterError, Operation, Profile, Result, SessionStore,
    Statement, StatementPdf,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const BANK_ID: &str = "wellsfargo";
const DOMAINS: &[&str] = &["wellsfargo.com"];
const SESSION_STORAGE_KEY: &str = "sessionKey";
const SESSION_COOKIE: &str = "wfacookie";
const XSRF_COOKIE: &str = "XSRF-TOKEN";
const STATE_VARIABLE: &str = "__WF_STATE__";
const DEFAULT_BASE_URL: &str = "https://connect.secure.wellsfargo.com";

const ACCOUNT_TYPES: &[(&str, AccountType)] = &[
    ("DDA", AccountType::Checking),
    ("SAV", AccountType::Savings),
    ("MMA", AccountType::Savings),
    ("CD", AccountType::Savings),
    ("CCD", AccountType::CreditCard),
    ("CC", AccountType::CreditCard),
    ("LOC", AccountType::Loan),
    ("MTG", AccountType::Loan),
    ("AUTO", AccountType::Loan),
    ("BRK", AccountType::Investment),
    ("IRA", AccountType::Investment),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageCustomer {
    ecn: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountSummary {
    accounts: Vec<WfAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WfAccount {
    account_key: String,
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    masked_number: String,
    #[serde(default)]
    product_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonthStatus {
    status: String,
    statement_date: Option<String>,
}

/// Outcome of probing one month.
enum Probe {
    Found(Statement),
    Missing,
    Failed(String),
}

fn encode_statement_id(account_key: &str, month: YearMonth) -> String {
    format!("{account_key}~{month}")
}

fn decode_statement_id(statement_id: &str) -> Option<(&str, YearMonth)> {
    let (key, month) = statement_id.rsplit_once('~')?;
    if key.is_empty() {
        return None;
    }
    Some((key, YearMonth::parse(month)?))
}

/// Adapter for Wells Fargo online banking.
#[derive(Debug, Clone)]
pub struct WellsFargoAdapter {
    base_url: String,
}

impl WellsFargoAdapter {
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

    /// Fetch the overview page and extract its state blob.
    async fn page_state(&self, ctx: &BankContext, operation: Operation) -> Result<Value> {
        let request = HttpRequest::get(format!("{}/accounts/start", self.base_url))
            .header("accept", "text/html");
        let response = ctx.fetch(BANK_ID, operation, "accounts page", request).await?;
        assigned_json(&response.text(), STATE_VARIABLE).ok_or_else(|| {
            operation.fail(BANK_ID, "accounts page: no __WF_STATE__ blob found")
        })
    }

    fn statements_url(&self, account_key: &str) -> String {
        format!("{}/edocs/api/v1/accounts/{account_key}/statements", self.base_url)
    }

    async fn probe(&self, ctx: &BankContext, account: &Arc<Account>, month: YearMonth) -> Result<Probe> {
        let request = HttpRequest::get(self.statements_url(&account.account_id))
            .query("year", month.year)
            .query("month", format!("{:02}", month.month))
            .header("accept", "application/json")
            .header_opt("X-XSRF-TOKEN", ctx.session().cookie(XSRF_COOKIE, DOMAINS));

        let response = match ctx.send(request).await {
            Ok(response) => response,
            Err(e) => return Ok(Probe::Failed(format!("{month}: {e}"))),
        };
        if response.status == 404 {
            return Ok(Probe::Missing);
        }
        if !response.is_success() {
            return Ok(Probe::Failed(format!("{month}: {}", response.status_line())));
        }

        let status: MonthStatus = response.json().map_err(|e| {
            Operation::Statements.fail(
                BANK_ID,
                format!("statement probe {month}: unexpected response shape: {e}"),
            )
        })?;
        match status.status.as_str() {
            "NO_STATEMENT" => Ok(Probe::Missing),
            "AVAILABLE" => {
                let date = status
                    .statement_date
                    .as_deref()
                    .and_then(parse_date)
                    .ok_or_else(|| {
                        Operation::Statements.fail(
                            BANK_ID,
                            format!("statement probe {month}: missing or invalid statementDate"),
                        )
                    })?;
                Ok(Probe::Found(Statement {
                    account: Arc::clone(account),
                    statement_id: encode_statement_id(&account.account_id, month),
                    statement_date: date,
                }))
            }
            other => Ok(Probe::Failed(format!("{month}: status {other}"))),
        }
    }
}

impl Default for WellsFargoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BankAdapter for WellsFargoAdapter {
    fn bank_id(&self) -> &'static str {
        BANK_ID
    }

    fn bank_name(&self) -> &'static str {
        "Wells Fargo"
    }

    fn domains(&self) -> &'static [&'static str] {
        DOMAINS
    }

    fn get_session_id(&self, session: &dyn SessionStore) -> Result<String> {
        session
            .session_storage(SESSION_STORAGE_KEY)
            .or_else(|| session.cookie(SESSION_COOKIE, DOMAINS))
            .ok_or_else(|| {
                AdapterError::authentication(BANK_ID, "missing sessionKey storage entry and wfacookie cookie")
            })
    }

    async fn get_profile(&self, ctx: &BankContext, session_id: &str) -> Result<Profile> {
        let state = self.page_state(ctx, Operation::Profile).await?;
        let customer: PageCustomer = state
            .get("customer")
            .cloned()
            .ok_or_else(|| Operation::Profile.fail(BANK_ID, "__WF_STATE__: missing customer"))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| {
                    Operation::Profile.fail(BANK_ID, format!("__WF_STATE__.customer: {e}"))
                })
            })?;

        let first = customer
            .first_name
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| Operation::Profile.fail(BANK_ID, "__WF_STATE__: missing customer.firstName"))?;

        Ok(Profile {
            session_id: session_id.to_string(),
            profile_id: customer
                .ecn
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| session_id.to_string()),
            profile_name: display_name(&first, customer.last_name.as_deref()),
        })
    }

    async fn get_accounts(&self, ctx: &BankContext, profile: &Arc<Profile>) -> Result<Vec<Account>> {
        let state = self.page_state(ctx, Operation::Accounts).await?;
        let summary: AccountSummary = state
            .get("accountSummary")
            .cloned()
            .ok_or_else(|| Operation::Accounts.fail(BANK_ID, "__WF_STATE__: missing accountSummary"))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| {
                    Operation::Accounts.fail(BANK_ID, format!("__WF_STATE__.accountSummary: {e}"))
                })
            })?;

        let types = AccountTypeMap::new(ACCOUNT_TYPES, AccountType::Checking)
            .with_overrides(ctx.settings().type_overrides(BANK_ID));
        let accounts = summary
            .accounts
            .into_iter()
            .map(|a| {
                let account_type = types
                    .lookup(&a.product_code)
                    .or_else(|| classify_by_name(&a.nickname))
                    .unwrap_or_else(|| types.resolve(&a.product_code));
                Account {
                    profile: Arc::clone(profile),
                    account_mask: mask_from(&a.masked_number),
                    account_type,
                    account_name: a.nickname,
                    account_id: a.account_key,
                }
            })
            .collect();
        finish_accounts(BANK_ID, accounts)
    }

    async fn get_statements(
        &self,
        ctx: &BankContext,
        account: &Arc<Account>,
    ) -> Result<Vec<Statement>> {
        let months = recent_months(ctx.today(), ctx.settings().lookback_months);
        let probes = join_all(months.iter().map(|month| self.probe(ctx, account, *month))).await;

        let mut statements = Vec::new();
        let mut failures = Vec::new();
        for probe in probes {
            match probe? {
                Probe::Found(statement) => statements.push(statement),
                Probe::Missing => {}
                Probe::Failed(message) => {
                    tracing::warn!(bank = BANK_ID, "Skipping statement probe: {}", message);
                    failures.push(message);
                }
            }
        }

        if !months.is_empty() && failures.len() == months.len() {
            return Err(Operation::Statements.fail(
                BANK_ID,
                format!("every monthly probe failed, first: {}", failures[0]),
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
        let (account_key, month) = decode_statement_id(statement_id)
            .ok_or_else(|| AdapterError::download(BANK_ID, statement_id, "malformed statement id"))?;

        let request = HttpRequest::get(format!("{}/pdf", self.statements_url(account_key)))
            .query("year", month.year)
            .query("month", format!("{:02}", month.month))
            .header("accept", "application/pdf")
            .header_opt("X-XSRF-TOKEN", ctx.session().cookie(XSRF_COOKIE, DOMAINS));

        let response = ctx.send_for_download(BANK_ID, statement_id, request).await?;
        let document = pdf::from_response(BANK_ID, statement_id, response)?;
        tracing::info!(bank = BANK_ID, bytes = document.len(), "Downloaded statement");
        Ok(document)
    }
}
