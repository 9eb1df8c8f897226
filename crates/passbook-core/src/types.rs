//! The three entities every adapter produces: profiles, accounts and statements.
//!
//! Entities are immutable values shaped as a tree. A [`Statement`] points at
//! exactly one [`Account`], which points at exactly one [`Profile`]. The
//! back-references are shared `Arc`s so a statement list never copies its
//! account or profile.

use crate::error::{AdapterError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// The logged-in user, as reported by the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Opaque session identifier returned by `get_session_id`
    pub session_id: String,
    /// Stable per-user identifier passed to later calls
    pub profile_id: String,
    /// Display name
    pub profile_name: String,
}

/// The five account categories every bank taxonomy is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Demand deposit account
    Checking,
    /// Savings or money market account
    Savings,
    /// Credit card
    CreditCard,
    /// Mortgage, auto or personal loan
    Loan,
    /// Brokerage or retirement account
    Investment,
}

impl AccountType {
    /// All variants, in declaration order.
    pub const ALL: [AccountType; 5] = [
        AccountType::Checking,
        AccountType::Savings,
        AccountType::CreditCard,
        AccountType::Loan,
        AccountType::Investment,
    ];

    /// Canonical variant name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "Checking",
            Self::Savings => "Savings",
            Self::CreditCard => "CreditCard",
            Self::Loan => "Loan",
            Self::Investment => "Investment",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One account belonging to a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Owning profile
    pub profile: Arc<Profile>,
    /// Bank-specific opaque identifier
    pub account_id: String,
    /// Display label
    pub account_name: String,
    /// Last digits or currency code, for display only
    pub account_mask: String,
    /// Normalized account category
    pub account_type: AccountType,
}

/// One statement document available for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    /// Owning account
    pub account: Arc<Account>,
    /// Opaque handle, meaningful only to the adapter that produced it
    pub statement_id: String,
    /// Statement closing date
    pub statement_date: NaiveDate,
}

/// A downloaded statement document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementPdf {
    /// Statement the document belongs to
    pub statement_id: String,
    /// Content type reported by the bank, if any
    pub content_type: Option<String>,
    /// Document bytes
    pub bytes: Vec<u8>,
}

impl StatementPdf {
    /// Size of the document in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the document is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reject empty documents and content types that do not indicate a PDF.
    ///
    /// A missing content type and `application/octet-stream` say nothing about
    /// the payload and are accepted.
    pub fn validate(self, bank: &str) -> Result<Self> {
        if self.bytes.is_empty() {
            return Err(AdapterError::download(
                bank,
                &self.statement_id,
                "response body is empty",
            ));
        }
        if let Some(content_type) = &self.content_type {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if !essence.is_empty()
                && !essence.contains("pdf")
                && essence != "application/octet-stream"
            {
                return Err(AdapterError::download(
                    bank,
                    &self.statement_id,
                    format!("expected a PDF but received {essence}"),
                ));
            }
        }
        Ok(self)
    }
}

/// Order statements newest first.
///
/// Statements sharing a date are ordered by id so the output is deterministic.
pub fn sort_newest_first(statements: &mut [Statement]) {
    statements.sort_by(|a, b| {
        b.statement_date
            .cmp(&a.statement_date)
            .then_with(|| a.statement_id.cmp(&b.statement_id))
    });
}

/// Drop accounts whose id was already seen, keeping the first occurrence.
#[must_use]
pub fn dedup_accounts(accounts: Vec<Account>) -> Vec<Account> {
    let mut seen = HashSet::new();
    accounts
        .into_iter()
        .filter(|account| seen.insert(account.account_id.clone()))
        .collect()
}

/// Last four characters of an account number, for display.
///
/// Non-alphanumeric separators are ignored, so `"4111-1111-1111-1234"` gives `"1234"`.
#[must_use]
pub fn mask_from(number: &str) -> String {
    let cleaned: Vec<char> = number.chars().filter(char::is_ascii_alphanumeric).collect();
    let start = cleaned.len().saturating_sub(4);
    cleaned[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Arc<Profile> {
        Arc::new(Profile {
            session_id: "s".to_string(),
            profile_id: "p".to_string(),
            profile_name: "Jane".to_string(),
        })
    }

    fn account(id: &str) -> Account {
        Account {
            profile: profile(),
            account_id: id.to_string(),
            account_name: format!("Account {id}"),
            account_mask: "1234".to_string(),
            account_type: AccountType::Checking,
        }
    }

    fn statement(id: &str, date: &str) -> Statement {
        Statement {
            account: Arc::new(account("a1")),
            statement_id: id.to_string(),
            statement_date: date.parse().expect("valid date"),
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let mut statements = vec![
            statement("jan", "2025-01-15"),
            statement("mar", "2025-03-10"),
            statement("feb", "2025-02-01"),
        ];
        sort_newest_first(&mut statements);

        let dates: Vec<String> = statements
            .iter()
            .map(|s| s.statement_date.to_string())
            .collect();
        assert_eq!(dates, vec!["2025-03-10", "2025-02-01", "2025-01-15"]);
    }

    #[test]
    fn test_dedup_accounts_keeps_first() {
        let mut second = account("a1");
        second.account_type = AccountType::Savings;
        let accounts = vec![account("a1"), account("a2"), second];

        let deduped = dedup_accounts(accounts);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].account_type, AccountType::Checking);
    }

    fn pdf(bytes: Vec<u8>, content_type: Option<&str>) -> StatementPdf {
        StatementPdf {
            statement_id: "s1".to_string(),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }

    #[test]
    fn test_pdf_validate() {
        let ok = pdf(vec![0x25; 15_000], Some("application/pdf")).validate("citi");
        assert_eq!(ok.expect("valid pdf").len(), 15_000);

        assert!(pdf(vec![1], Some("application/octet-stream"))
            .validate("citi")
            .is_ok());
        assert!(pdf(vec![1], None).validate("citi").is_ok());
        assert!(pdf(vec![1], Some("application/x-pdf; charset=binary"))
            .validate("citi")
            .is_ok());
    }

    #[test]
    fn test_pdf_validate_rejects() {
        let err = pdf(Vec::new(), Some("application/pdf"))
            .validate("citi")
            .expect_err("empty body");
        assert!(err.to_string().contains("statement s1"));
        assert!(err.to_string().contains("empty"));

        let err = pdf(b"<html>".to_vec(), Some("text/html; charset=utf-8"))
            .validate("citi")
            .expect_err("html body");
        assert!(err.to_string().contains("text/html"));
    }

    #[test]
    fn test_mask_from() {
        assert_eq!(mask_from("4111-1111-1111-1234"), "1234");
        assert_eq!(mask_from("12"), "12");
        assert_eq!(mask_from(""), "");
    }

    #[test]
    fn test_account_type_names() {
        for account_type in AccountType::ALL {
            assert_eq!(account_type.to_string(), account_type.as_str());
        }
        let parsed: AccountType = serde_json::from_str("\"CreditCard\"").expect("parse name");
        assert_eq!(parsed, AccountType::CreditCard);
        assert!(serde_json::from_str::<AccountType>("\"Brokerage\"").is_err());
    }

    #[test]
    fn test_statement_serialization() {
        let json = serde_json::to_value(statement("s1", "2025-01-15")).expect("serialize");
        assert_eq!(json["statementDate"], "2025-01-15");
        assert_eq!(json["account"]["accountType"], "Checking");
        assert_eq!(json["account"]["profile"]["profileName"], "Jane");
    }
}
