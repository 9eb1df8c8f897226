//! On-disk layout for downloaded statements.
//!
//! Documents land at `<root>/<bank_id>/<mask>-<account key>/<date>-<statement key>.pdf`.
//! The keys are short digests of the bank's account and statement ids, so two
//! accounts sharing a mask, or two documents sharing a date, never collide.
//! The mask and date are only there for humans. Re-running a fetch overwrites
//! the same paths.

use passbook_core::{Statement, StatementPdf};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Hex digits of the id digest kept in a path component.
const KEY_LEN: usize = 10;

/// Where `statement` is stored under `root`.
#[must_use]
pub fn statement_path(root: &Path, bank_id: &str, statement: &Statement) -> PathBuf {
    let account = &statement.account;
    root.join(path_component(bank_id))
        .join(format!(
            "{}-{}",
            path_component(&account.account_mask),
            short_key(&account.account_id)
        ))
        .join(format!(
            "{}-{}.pdf",
            statement.statement_date,
            short_key(&statement.statement_id)
        ))
}

/// Write a downloaded document, creating directories as needed.
pub fn write_statement(
    root: &Path,
    bank_id: &str,
    statement: &Statement,
    document: &StatementPdf,
) -> io::Result<PathBuf> {
    let path = statement_path(root, bank_id, statement);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &document.bytes)?;
    tracing::debug!(bytes = document.len(), "Wrote {}", path.display());
    Ok(path)
}

/// Leading hex digits of the SHA-256 of an opaque bank id.
fn short_key(id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    let mut key = hex::encode(hasher.finalize());
    key.truncate(KEY_LEN);
    key
}

/// Reduce a bank-supplied value to a safe single path component.
fn path_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
