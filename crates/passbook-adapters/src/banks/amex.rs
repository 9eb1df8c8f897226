//! American Express adapter.
//!
//! Everything goes through one GraphQL endpoint, including the statement
//! document, which comes back base64-encoded inside the payload.

use super::common::{display_name, finish_accounts, finish_statements, parse_date};
use crate::adapter::{BankAdapter, BankContext};
use crate::graphql::{unwrap_envelope, GraphqlRequest};
use crate::pdf;
use crate::period::window_start;
use crate::type_map::AccountTypeMap;
use async_trait::async_trait;
use chrono::NaiveDate;
use passbook_core::{
    mask_from, Account, AccountType, AdapterError, Operation, Profile, Result, SessionStore,
    Statement, StatementPdf,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const BANK_ID: &str = "amex";
const DOMAINS: &[&str] = &["americanexpress.com", "aexp.com"];
const SESSION_COOKIE: &str = "amexsessioncookie";
const STAND_IN_COOKIE: &str = "aat";
const DEFAULT_ENDPOINT: &str = "https://global.americanexpress.com/api/servicing/graphql";

const PROFILE_QUERY: &str = "query CustomerProfile { customer { id name { first last } } }";
const ACCOUNTS_QUERY: &str =
    "query AccountList { accounts { accountToken displayName lastDigits productType } }";
const STATEMENTS_QUERY: &str = "query StatementList($accountToken: String!, $from: String!) { \
     statements(accountToken: $accountToken, from: $from) { closingDate available } }";
const PDF_QUERY: &str = "query StatementPdf($accountToken: String!, $closingDate: String!) { \
     statementPdf(accountToken: $accountToken, closingDate: $closingDate) { contentType base64Content } }";

const ACCOUNT_TYPES: &[(&str, AccountType)] = &[
    ("CHARGE", AccountType::CreditCard),
    ("CREDIT", AccountType::CreditCard),
    ("CARD", AccountType::CreditCard),
    ("BUSINESS_CARD", AccountType::CreditCard),
    ("SAVINGS", AccountType::Savings),
    ("HYSA", AccountType::Savings),
    ("CD", AccountType::Savings),
    ("CHECKING", AccountType::Checking),
    ("REWARDS_CHECKING", AccountType::Checking),
    ("PERSONAL_LOAN", AccountType::Loan),
    ("LOAN", AccountType::Loan),
];

#[derive(Debug, Deserialize)]
struct ProfileData {
    customer: Option<Customer>,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: Option<String>,
    name: Option<CustomerName>,
}

#[derive(Debug, Default, Deserialize)]
struct CustomerName {
    first: Option<String>,
    last: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountsData {
    accounts: Vec<AmexAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmexAccount {
    account_token: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    last_digits: String,
    #[serde(default)]
    product_type: String,
}

#[derive(Debug, Deserialize)]
struct StatementsData {
    statements: Vec<AmexStatement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmexStatement {
    closing_date: String,
    #[serde(default = "available_default")]
    available: bool,
}

fn available_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PdfData {
    statement_pdf: Option<PdfPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PdfPayload {
    content_type: Option<String>,
    base64_content: Option<String>,
}

fn encode_statement_id(account_token: &str, closing_date: NaiveDate) -> String {
    format!("{account_token}:{closing_date}")
}

/// Account tokens may contain `:`, the trailing date never does.
fn decode_statement_id(statement_id: &str) -> Option<(&str, NaiveDate)> {
    let (token, date) = statement_id.rsplit_once(':')?;
    if token.is_empty() {
        return None;
    }
    Some((token, date.parse().ok()?))
}

/// Adapter for American Express.
#[derive(Debug, Clone)]
pub struct AmexAdapter {
    endpoint: String,
}

impl AmexAdapter {
    /// Create an adapter against the production GraphQL endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Create an adapter against another GraphQL endpoint.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Run a query and unwrap its `data`, describing any failure as a message.
    async fn execute<T: DeserializeOwned>(
        &self,
        ctx: &BankContext,
        request: GraphqlRequest,
    ) -> std::result::Result<T, String> {
        let operation = request.operation_name().to_string();
        let http = request.into_http(&self.endpoint);
        let response = ctx
            .send(http)
            .await
            .map_err(|e| format!("{operation}: {e}"))?;
        unwrap_envelope(&response).map_err(|message| format!("{operation}: {message}"))
    }
}

impl Default for AmexAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BankAdapter for AmexAdapter {
    fn bank_id(&self) -> &'static str {
        BANK_ID
    }

    fn bank_name(&self) -> &'static str {
        "American Express"
    }

    fn domains(&self) -> &'static [&'static str] {
        DOMAINS
    }

    fn get_session_id(&self, session: &dyn SessionStore) -> Result<String> {
        session
            .cookie(SESSION_COOKIE, DOMAINS)
            .or_else(|| session.cookie(STAND_IN_COOKIE, DOMAINS))
            .ok_or_else(|| {
                AdapterError::authentication(BANK_ID, "missing amexsessioncookie and aat cookies")
            })
    }

    async fn get_profile(&self, ctx: &BankContext, session_id: &str) -> Result<Profile> {
        let data: ProfileData = self
            .execute(ctx, GraphqlRequest::new("CustomerProfile", PROFILE_QUERY))
            .await
            .map_err(|e| Operation::Profile.fail(BANK_ID, e))?;

        let customer = data
            .customer
            .ok_or_else(|| Operation::Profile.fail(BANK_ID, "CustomerProfile: missing customer"))?;
        let name = customer.name.unwrap_or_default();
        let first = name
            .first
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| Operation::Profile.fail(BANK_ID, "CustomerProfile: missing name.first"))?;

        Ok(Profile {
            session_id: session_id.to_string(),
            profile_id: customer
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| session_id.to_string()),
            profile_name: display_name(&first, name.last.as_deref()),
        })
    }

    async fn get_accounts(&self, ctx: &BankContext, profile: &Arc<Profile>) -> Result<Vec<Account>> {
        let data: AccountsData = self
            .execute(ctx, GraphqlRequest::new("AccountList", ACCOUNTS_QUERY))
            .await
            .map_err(|e| Operation::Accounts.fail(BANK_ID, e))?;

        let types = AccountTypeMap::new(ACCOUNT_TYPES, AccountType::CreditCard)
            .with_overrides(ctx.settings().type_overrides(BANK_ID));
        let accounts = data
            .accounts
            .into_iter()
            .map(|a| Account {
                profile: Arc::clone(profile),
                account_mask: mask_from(&a.last_digits),
                account_type: types.resolve(&a.product_type),
                account_name: a.display_name,
                account_id: a.account_token,
            })
            .collect();
        finish_accounts(BANK_ID, accounts)
    }

    async fn get_statements(
        &self,
        ctx: &BankContext,
        account: &Arc<Account>,
    ) -> Result<Vec<Statement>> {
        let from = window_start(ctx.today(), ctx.settings().lookback_months);
        let request = GraphqlRequest::new("StatementList", STATEMENTS_QUERY).variables(json!({
            "accountToken": account.account_id,
            "from": from.to_string(),
        }));
        let data: StatementsData = self
            .execute(ctx, request)
            .await
            .map_err(|e| Operation::Statements.fail(BANK_ID, e))?;

        let mut statements = Vec::new();
        for entry in data.statements {
            if !entry.available {
                tracing::debug!(closing_date = %entry.closing_date, "Statement not yet available");
                continue;
            }
            let date = parse_date(&entry.closing_date).ok_or_else(|| {
                Operation::Statements.fail(
                    BANK_ID,
                    format!("StatementList: unparseable closingDate {:?}", entry.closing_date),
                )
            })?;
            statements.push(Statement {
                account: Arc::clone(account),
                statement_id: encode_statement_id(&account.account_id, date),
                statement_date: date,
            });
        }
        Ok(finish_statements(BANK_ID, account, statements))
    }

    async fn download_statement(
        &self,
        ctx: &BankContext,
        statement: &Statement,
    ) -> Result<StatementPdf> {
        let statement_id = statement.statement_id.as_str();
        let (token, closing_date) = decode_statement_id(statement_id)
            .ok_or_else(|| AdapterError::download(BANK_ID, statement_id, "malformed statement id"))?;

        let request = GraphqlRequest::new("StatementPdf", PDF_QUERY).variables(json!({
            "accountToken": token,
            "closingDate": closing_date.to_string(),
        }));
        let data: PdfData = self
            .execute(ctx, request)
            .await
            .map_err(|e| AdapterError::download(BANK_ID, statement_id, e))?;

        let payload = data.statement_pdf.unwrap_or_default();
        let encoded = payload.base64_content.ok_or_else(|| {
            AdapterError::download(BANK_ID, statement_id, "StatementPdf: no document returned")
        })?;
        let document = pdf::decode_base64_pdf(
            BANK_ID,
            statement_id,
            &encoded,
            payload.content_type.as_deref(),
        )?;
        tracing::info!(bank = BANK_ID, bytes = document.len(), "Downloaded statement");
        Ok(document)
    }
}
