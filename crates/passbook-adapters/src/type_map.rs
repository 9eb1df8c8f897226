//! Normalization of bank account type codes into [`AccountType`].

use passbook_core::AccountType;
use std::collections::HashMap;

/// Case-insensitive mapping from a bank's raw type codes to [`AccountType`].
///
/// Each adapter declares a static table and a default for codes it has never
/// seen. Users can extend or override the table per bank through the
/// `[account_types.<bank_id>]` config section.
#[derive(Debug, Clone)]
pub struct AccountTypeMap {
    entries: HashMap<String, AccountType>,
    default: AccountType,
}

impl AccountTypeMap {
    /// Build a map from a static table.
    #[must_use]
    pub fn new(table: &[(&str, AccountType)], default: AccountType) -> Self {
        Self {
            entries: table
                .iter()
                .map(|(code, account_type)| (normalize(code), *account_type))
                .collect(),
            default,
        }
    }

    /// Merge configured overrides over the static table.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Option<&HashMap<String, AccountType>>) -> Self {
        if let Some(overrides) = overrides {
            for (code, account_type) in overrides {
                self.entries.insert(normalize(code), *account_type);
            }
        }
        self
    }

    /// Mapped type for `code`, if the table knows it.
    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<AccountType> {
        self.entries.get(&normalize(code)).copied()
    }

    /// Mapped type for `code`, or the default.
    #[must_use]
    pub fn resolve(&self, code: &str) -> AccountType {
        self.lookup(code).unwrap_or_else(|| {
            tracing::warn!(
                "Unmapped account type code {:?}, defaulting to {}",
                code,
                self.default
            );
            self.default
        })
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Guess an account type from its display name.
///
/// Only a fallback for banks that report no usable type code. Matches whole
/// words, so "Miramar Checking" is not mistaken for an IRA.
#[must_use]
pub fn classify_by_name(name: &str) -> Option<AccountType> {
    let lower = name.to_ascii_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |candidates: &[&str]| words.iter().any(|w| candidates.contains(w));

    if has(&["card", "visa", "mastercard", "amex", "credit"]) {
        Some(AccountType::CreditCard)
    } else if has(&["savings", "saving", "money", "cd"]) {
        Some(AccountType::Savings)
    } else if has(&["checking", "spending", "debit"]) {
        Some(AccountType::Checking)
    } else if has(&["loan", "mortgage", "auto", "heloc"]) {
        Some(AccountType::Loan)
    } else if has(&["brokerage", "ira", "roth", "401k", "investment", "hsa"]) {
        Some(AccountType::Investment)
    } else {
        None
    }
}
