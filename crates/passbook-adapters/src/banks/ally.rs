//! Ally Bank adapter.
//!
//! Accounts are listed per product bucket and the buckets overlap, so both
//! are fetched concurrently and merged. Statement PDFs live in object storage;
//! the statement id carries the storage locator, which is exchanged for a
//! presigned URL at download time.

use super::common::{display_name, finish_accounts, finish_statements, parse_date};
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
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const BANK_ID: &str = "ally";
const DOMAINS: &[&str] = &["ally.com"];
const SESSION_COOKIE: &str = "ally_session";
const CSRF_COOKIE: &str = "CSRFChallengeToken";
const DEFAULT_BASE_URL: &str = "https://secure.ally.com/acs/v1";

/// Product buckets probed for accounts.
const ACCOUNT_BUCKETS: [&str; 2] = ["DEPOSIT", "CREDIT"];

const ACCOUNT_TYPES: &[(&str, AccountType)] = &[
    ("DDA", AccountType::Checking),
    ("INTEREST_CHECKING", AccountType::Checking),
    ("SPENDING", AccountType::Checking),
    ("SAVINGS", AccountType::Savings),
    ("ONLINE_SAVINGS", AccountType::Savings),
    ("MMA", AccountType::Savings),
    ("CD", AccountType::Savings),
    ("CREDIT_CARD", AccountType::CreditCard),
    ("AUTO", AccountType::Loan),
    ("HOME_LOAN", AccountType::Loan),
    ("PERSONAL_LOAN", AccountType::Loan),
    ("INVESTMENT", AccountType::Investment),
];

#[derive(Debug, Deserialize)]
struct SelfResponse {
    customer: Option<AllyCustomer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllyCustomer {
    cif: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<AllyAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllyAccount {
    id: String,
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    masked_account_number: String,
    #[serde(default)]
    account_type: String,
}

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    documents: Vec<AllyDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllyDocument {
    document_date: String,
    location: DocumentLocator,
}

/// Where a statement document lives in object storage.
///
/// Serialized as JSON to form the statement id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLocator {
    /// Storage bucket
    pub bucket: String,
    /// Object key
    pub key: String,
}

impl DocumentLocator {
    /// Encode as a statement id.
    pub fn encode(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a statement id produced by [`encode`](Self::encode).
    pub fn decode(statement_id: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(statement_id)
    }
}

#[derive(Debug, Deserialize)]
struct PresignResponse {
    url: String,
}

/// Adapter for Ally Bank.
#[derive(Debug, Clone)]
pub struct AllyAdapter {
    base_url: String,
}

impl AllyAdapter {
    /// Create an adapter against the production API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create an adapter against another API root.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn api(ctx: &BankContext, request: HttpRequest) -> HttpRequest {
        request
            .header("accept", "application/json")
            .header("ApplicationName", "AOB")
            .header_opt("CSRFChallengeToken", ctx.session().cookie(CSRF_COOKIE, DOMAINS))
    }

    async fn bucket(&self, ctx: &BankContext, cif: &str, bucket: &str) -> Result<Vec<AllyAccount>> {
        let request = HttpRequest::get(format!("{}/customers/{cif}/accounts", self.base_url))
            .query("type", bucket);
        let response: AccountsResponse = ctx
            .fetch_json(
                BANK_ID,
                Operation::Accounts,
                &format!("{bucket} accounts"),
                Self::api(ctx, request),
            )
            .await?;
        tracing::debug!(bank = BANK_ID, bucket, count = response.accounts.len(), "Probed account bucket");
        Ok(response.accounts)
    }
}

impl Default for AllyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BankAdapter for AllyAdapter {
    fn bank_id(&self) -> &'static str {
        BANK_ID
    }

    fn bank_name(&self) -> &'static str {
        "Ally Bank"
    }

    fn domains(&self) -> &'static [&'static str] {
        DOMAINS
    }

    fn get_session_id(&self, session: &dyn SessionStore) -> Result<String> {
        session
            .cookie(SESSION_COOKIE, DOMAINS)
            .ok_or_else(|| AdapterError::authentication(BANK_ID, "missing ally_session cookie"))
    }

    async fn get_profile(&self, ctx: &BankContext, session_id: &str) -> Result<Profile> {
        let request = HttpRequest::get(format!("{}/customers/self", self.base_url));
        let response: SelfResponse = ctx
            .fetch_json(BANK_ID, Operation::Profile, "customers/self", Self::api(ctx, request))
            .await?;
        let customer = response
            .customer
            .ok_or_else(|| Operation::Profile.fail(BANK_ID, "customers/self: missing customer"))?;
        let cif = customer
            .cif
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Operation::Profile.fail(BANK_ID, "customers/self: missing customer.cif"))?;
        let first = customer
            .first_name
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| Operation::Profile.fail(BANK_ID, "customers/self: missing customer.firstName"))?;

        Ok(Profile {
            session_id: session_id.to_string(),
            profile_id: cif,
            profile_name: display_name(&first, customer.last_name.as_deref()),
        })
    }

    async fn get_accounts(&self, ctx: &BankContext, profile: &Arc<Profile>) -> Result<Vec<Account>> {
        let [deposit, credit] = ACCOUNT_BUCKETS;
        let (deposits, credits) = futures::join!(
            self.bucket(ctx, &profile.profile_id, deposit),
            self.bucket(ctx, &profile.profile_id, credit)
        );

        let types = AccountTypeMap::new(ACCOUNT_TYPES, AccountType::Checking)
            .with_overrides(ctx.settings().type_overrides(BANK_ID));
        let accounts = deposits?
            .into_iter()
            .chain(credits?)
            .map(|a| Account {
                profile: Arc::clone(profile),
                account_mask: mask_from(&a.masked_account_number),
                account_type: types.resolve(&a.account_type),
                account_name: a.nickname,
                account_id: a.id,
            })
            .collect();
        finish_accounts(BANK_ID, accounts)
    }

    async fn get_statements(
        &self,
        ctx: &BankContext,
        account: &Arc<Account>,
    ) -> Result<Vec<Statement>> {
        let request = HttpRequest::get(format!("{}/documents", self.base_url))
            .query("accountId", &account.account_id)
            .query("documentType", "STATEMENT");
        let response: DocumentsResponse = ctx
            .fetch_json(BANK_ID, Operation::Statements, "documents", Self::api(ctx, request))
            .await?;

        let since = window_start(ctx.today(), ctx.settings().lookback_months);
        let mut statements = Vec::new();
        for document in response.documents {
            let date = parse_date(&document.document_date).ok_or_else(|| {
                Operation::Statements.fail(
                    BANK_ID,
                    format!("documents: unparseable documentDate {:?}", document.document_date),
                )
            })?;
            if date < since {
                continue;
            }
            let statement_id = document
                .location
                .encode()
                .map_err(|e| Operation::Statements.fail(BANK_ID, format!("encode locator: {e}")))?;
            statements.push(Statement {
                account: Arc::clone(account),
                statement_id,
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
        let locator = DocumentLocator::decode(statement_id).map_err(|e| {
            AdapterError::download(BANK_ID, statement_id, format!("malformed statement id: {e}"))
        })?;
        let body = serde_json::to_value(&locator)
            .map_err(|e| AdapterError::download(BANK_ID, statement_id, e.to_string()))?;

        let presign = Self::api(
            ctx,
            HttpRequest::post(format!("{}/documents/presign", self.base_url)).json(body),
        );
        let presigned: PresignResponse = ctx
            .download_json(BANK_ID, statement_id, "documents/presign", presign)
            .await?;
        tracing::debug!(bank = BANK_ID, bucket = %locator.bucket, "Fetching presigned document");

        let response = ctx
            .send_for_download(BANK_ID, statement_id, HttpRequest::get(presigned.url))
            .await?;
        let document = pdf::from_response(BANK_ID, statement_id, response)?;
        tracing::info!(bank = BANK_ID, bytes = document.len(), "Downloaded statement");
        Ok(document)
    }
}
