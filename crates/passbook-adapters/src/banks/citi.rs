//! Citi adapter.
//!
//! Citi's online banking is a REST JSON API under `/gcgapi`. Credit cards and
//! deposit accounts keep their statements behind different endpoints with
//! different shapes, so listing and download both route on the account type.

use super::common::{correlation_id, display_name, finish_accounts, finish_statements, parse_date};
use crate::adapter::{BankAdapter, BankContext};
use crate::http::HttpRequest;
use crate::pdf;
use crate::period::window_start;
use crate::type_map::AccountTypeMap;
use async_trait::async_trait;
use passbook_core::{
    mask_from, Account, AccountType, AdapterError, Operation, Profile, Result, SessionStore,
    Statement, StatementPdf,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const BANK_ID: &str = "citi";
const DOMAINS: &[&str] = &["citi.com", "citibank.com"];
const SESSION_COOKIE: &str = "bcsid";
const XSRF_COOKIE: &str = "XSRF-TOKEN";
const DEFAULT_BASE_URL: &str = "https://online.citi.com/gcgapi/prod/public/v1";
const JSON: &str = "application/json";

const ACCOUNT_TYPES: &[(&str, AccountType)] = &[
    ("CHECKING", AccountType::Checking),
    ("SAVINGS", AccountType::Savings),
    ("MONEY_MARKET", AccountType::Savings),
    ("CD", AccountType::Savings),
    ("CREDIT_CARD", AccountType::CreditCard),
    ("CARD", AccountType::CreditCard),
    ("LOAN", AccountType::Loan),
    ("MORTGAGE", AccountType::Loan),
    ("PERSONAL_LOAN", AccountType::Loan),
    ("BROKERAGE", AccountType::Investment),
    ("INVESTMENT", AccountType::Investment),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    first_name: Option<String>,
    last_name: Option<String>,
    customer_name: Option<String>,
    customer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Option<Vec<CitiAccount>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitiAccount {
    account_id: String,
    #[serde(default)]
    display_account_number: String,
    account_nickname: Option<String>,
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    product_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardStatementsResponse {
    statement_summaries: Vec<CardStatement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardStatement {
    closing_date: String,
    statement_id: String,
}

#[derive(Debug, Deserialize)]
struct DepositStatementsResponse {
    documents: Vec<DepositDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositDocument {
    document_date: String,
    document_key: String,
    #[serde(default)]
    document_type: String,
}

/// Join an account id and document key into a statement id.
fn encode_statement_id(account_id: &str, document_key: &str) -> String {
    format!("{account_id}|{document_key}")
}

/// Split a statement id back into account id and document key.
///
/// Document keys may themselves contain `|`; account ids never do.
fn decode_statement_id(statement_id: &str) -> Option<(&str, &str)> {
    statement_id
        .split_once('|')
        .filter(|(account, key)| !account.is_empty() && !key.is_empty())
}

/// Adapter for Citi online banking.
#[derive(Debug, Clone)]
pub struct CitiAdapter {
    base_url: String,
}

impl CitiAdapter {
    /// Create an adapter against Citi's production API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create an adapter against another API root, e.g. a staging host.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(ctx: &BankContext, request: HttpRequest, accept: &str) -> HttpRequest {
        request
            .header("accept", accept)
            .header("channelId", "CBOL")
            .header("businessCode", "GCB")
            .header("countryCode", "US")
            .header("x-correlation-id", correlation_id())
            .header_opt("x-xsrf-token", ctx.session().cookie(XSRF_COOKIE, DOMAINS))
    }

    fn type_map(ctx: &BankContext) -> AccountTypeMap {
        AccountTypeMap::new(ACCOUNT_TYPES, AccountType::Checking)
            .with_overrides(ctx.settings().type_overrides(BANK_ID))
    }

    async fn card_statements(&self, ctx: &BankContext, account: &Arc<Account>) -> Result<Vec<Statement>> {
        let url = format!(
            "{}/digital/card/accounts/{}/statements",
            self.base_url, account.account_id
        );
        let response: CardStatementsResponse = ctx
            .fetch_json(
                BANK_ID,
                Operation::Statements,
                "card statements",
                Self::request(ctx, HttpRequest::get(url), JSON),
            )
            .await?;

        let since = window_start(ctx.today(), ctx.settings().lookback_months);
        let mut statements = Vec::new();
        for summary in response.statement_summaries {
            let date = parse_date(&summary.closing_date).ok_or_else(|| {
                Operation::Statements.fail(
                    BANK_ID,
                    format!("card statements: unparseable closingDate {:?}", summary.closing_date),
                )
            })?;
            if date < since {
                continue;
            }
            statements.push(Statement {
                account: Arc::clone(account),
                statement_id: encode_statement_id(&account.account_id, &summary.statement_id),
                statement_date: date,
            });
        }
        Ok(statements)
    }

    async fn deposit_statements(&self, ctx: &BankContext, account: &Arc<Account>) -> Result<Vec<Statement>> {
        let url = format!("{}/digital/deposits/statements/retrieve", self.base_url);
        let since = window_start(ctx.today(), ctx.settings().lookback_months);
        let body = json!({
            "accountId": account.account_id,
            "startDate": since.to_string(),
            "endDate": ctx.today().to_string(),
        });
        let response: DepositStatementsResponse = ctx
            .fetch_json(
                BANK_ID,
                Operation::Statements,
                "deposit statements",
                Self::request(ctx, HttpRequest::post(url).json(body), JSON),
            )
            .await?;

        let mut statements = Vec::new();
        for document in response.documents {
            if !document.document_type.eq_ignore_ascii_case("STATEMENT") {
                tracing::trace!(document_type = %document.document_type, "Skipping non-statement document");
                continue;
            }
            let date = parse_date(&document.document_date).ok_or_else(|| {
                Operation::Statements.fail(
                    BANK_ID,
                    format!(
                        "deposit statements: unparseable documentDate {:?}",
                        document.document_date
                    ),
                )
            })?;
            statements.push(Statement {
                account: Arc::clone(account),
                statement_id: encode_statement_id(&account.account_id, &document.document_key),
                statement_date: date,
            });
        }
        Ok(statements)
    }
}

impl Default for CitiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BankAdapter for CitiAdapter {
    fn bank_id(&self) -> &'static str {
        BANK_ID
    }

    fn bank_name(&self) -> &'static str {
        "Citi"
    }

    fn domains(&self) -> &'static [&'static str] {
        DOMAINS
    }

    fn get_session_id(&self, session: &dyn SessionStore) -> Result<String> {
        session
            .cookie(SESSION_COOKIE, DOMAINS)
            .ok_or_else(|| AdapterError::authentication(BANK_ID, "missing bcsid cookie"))
    }

    async fn get_profile(&self, ctx: &BankContext, session_id: &str) -> Result<Profile> {
        let url = format!("{}/digital/customers/profileBasicInfo", self.base_url);
        let response: ProfileResponse = ctx
            .fetch_json(
                BANK_ID,
                Operation::Profile,
                "profileBasicInfo",
                Self::request(ctx, HttpRequest::get(url), JSON),
            )
            .await?;

        let profile_name = match (response.first_name.as_deref(), response.customer_name) {
            (Some(first), _) if !first.trim().is_empty() => {
                display_name(first, response.last_name.as_deref())
            }
            (_, Some(full)) if !full.trim().is_empty() => full.trim().to_string(),
            _ => {
                return Err(Operation::Profile.fail(
                    BANK_ID,
                    "profileBasicInfo: missing firstName and customerName",
                ))
            }
        };

        Ok(Profile {
            session_id: session_id.to_string(),
            profile_id: response
                .customer_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| session_id.to_string()),
            profile_name,
        })
    }

    async fn get_accounts(&self, ctx: &BankContext, profile: &Arc<Profile>) -> Result<Vec<Account>> {
        let url = format!("{}/digital/accounts/summary", self.base_url);
        let response: AccountsResponse = ctx
            .fetch_json(
                BANK_ID,
                Operation::Accounts,
                "accounts summary",
                Self::request(ctx, HttpRequest::get(url), JSON),
            )
            .await?;
        let raw = response.accounts.ok_or_else(|| {
            Operation::Accounts.fail(BANK_ID, "accounts summary: missing accounts field")
        })?;

        let types = Self::type_map(ctx);
        let accounts = raw
            .into_iter()
            .map(|a| {
                let account_name = a
                    .account_nickname
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(a.product_name);
                Account {
                    profile: Arc::clone(profile),
                    account_mask: mask_from(&a.display_account_number),
                    account_type: types.resolve(&a.product_type),
                    account_id: a.account_id,
                    account_name,
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
        let statements = if account.account_type == AccountType::CreditCard {
            self.card_statements(ctx, account).await?
        } else {
            self.deposit_statements(ctx, account).await?
        };
        Ok(finish_statements(BANK_ID, account, statements))
    }

    async fn download_statement(
        &self,
        ctx: &BankContext,
        statement: &Statement,
    ) -> Result<StatementPdf> {
        let statement_id = statement.statement_id.as_str();
        let (account_id, key) = decode_statement_id(statement_id).ok_or_else(|| {
            AdapterError::download(BANK_ID, statement_id, "malformed statement id")
        })?;

        let request = if statement.account.account_type == AccountType::CreditCard {
            HttpRequest::get(format!(
                "{}/digital/card/accounts/{account_id}/statements/{key}/pdf",
                self.base_url
            ))
        } else {
            HttpRequest::get(format!("{}/digital/deposits/documents/{key}", self.base_url))
                .query("accountId", account_id)
        };
        let request = Self::request(ctx, request, "application/pdf");

        let response = ctx.send_for_download(BANK_ID, statement_id, request).await?;
        let document = pdf::from_response(BANK_ID, statement_id, response)?;
        tracing::info!(bank = BANK_ID, bytes = document.len(), "Downloaded statement");
        Ok(document)
    }
}
