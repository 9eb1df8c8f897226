//! Small helpers shared across bank adapters.
//!
//! Only value-shaping lives here. Request construction stays inside each
//! bank's module because no two banks agree on headers or payloads.

use chrono::NaiveDate;
use passbook_core::{dedup_accounts, sort_newest_first, Account, AdapterError, Result, Statement};
use serde_json::Value;

/// Fresh id for per-request correlation headers.
pub fn correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Non-empty string at a JSON pointer.
pub fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Join first and last name, skipping missing parts.
pub fn display_name(first: &str, last: Option<&str>) -> String {
    match last.map(str::trim).filter(|l| !l.is_empty()) {
        Some(last) => format!("{} {}", first.trim(), last),
        None => first.trim().to_string(),
    }
}

/// Parse the date formats banks emit: `YYYY-MM-DD`, ISO date-times and `MM/DD/YYYY`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%m/%d/%Y"))
        .ok()
}

/// Deduplicate and require at least one account.
pub fn finish_accounts(bank: &str, accounts: Vec<Account>) -> Result<Vec<Account>> {
    let before = accounts.len();
    let accounts = dedup_accounts(accounts);
    if accounts.len() < before {
        tracing::debug!(bank, dropped = before - accounts.len(), "Dropped duplicate accounts");
    }
    if accounts.is_empty() {
        return Err(AdapterError::Accounts {
            bank: bank.to_string(),
            message: "no accounts found for this profile".to_string(),
        });
    }
    tracing::info!(bank, count = accounts.len(), "Listed accounts");
    Ok(accounts)
}

/// Sort statements newest first and log the count.
pub fn finish_statements(bank: &str, account: &Account, mut statements: Vec<Statement>) -> Vec<Statement> {
    sort_newest_first(&mut statements);
    tracing::info!(
        bank,
        account = %account.account_mask,
        count = statements.len(),
        "Listed statements"
    );
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_core::{AccountType, ErrorKind, Profile};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_str_at() {
        let value = json!({"a": {"b": " x ", "empty": "", "n": 1}});
        assert_eq!(str_at(&value, "/a/b"), Some("x".to_string()));
        assert_eq!(str_at(&value, "/a/empty"), None);
        assert_eq!(str_at(&value, "/a/n"), None);
        assert_eq!(str_at(&value, "/missing"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 10);
        assert_eq!(parse_date("2025-03-10"), expected);
        assert_eq!(parse_date("2025-03-10T00:00:00Z"), expected);
        assert_eq!(parse_date("03/10/2025"), expected);
        assert_eq!(parse_date("March 10"), None);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("Jane", Some("Doe")), "Jane Doe");
        assert_eq!(display_name("Jane ", None), "Jane");
        assert_eq!(display_name("Jane", Some(" ")), "Jane");
    }

    #[test]
    fn test_finish_accounts_requires_one() {
        let err = finish_accounts("citi", Vec::new()).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::Accounts);

        let profile = Arc::new(Profile {
            session_id: "s".to_string(),
            profile_id: "p".to_string(),
            profile_name: "Jane".to_string(),
        });
        let account = Account {
            profile,
            account_id: "a1".to_string(),
            account_name: "Checking".to_string(),
            account_mask: "1234".to_string(),
            account_type: AccountType::Checking,
        };
        let accounts = finish_accounts("citi", vec![account.clone(), account]).expect("accounts");
        assert_eq!(accounts.len(), 1);
    }
}
