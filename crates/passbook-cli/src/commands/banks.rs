//! `passbook banks`: list the registered adapters.

use passbook_adapters::AdapterRegistry;
use serde::Serialize;

/// Summary information about one adapter.
#[derive(Debug, Clone, Serialize)]
pub struct BankSummary {
    pub id: String,
    pub name: String,
    pub domains: Vec<String>,
}

/// Every registered adapter, sorted by id.
#[must_use]
pub fn list_banks(registry: &AdapterRegistry) -> Vec<BankSummary> {
    registry
        .ids()
        .into_iter()
        .filter_map(|id| registry.get(id).ok())
        .map(|adapter| BankSummary {
            id: adapter.bank_id().to_string(),
            name: adapter.bank_name().to_string(),
            domains: adapter.domains().iter().map(ToString::to_string).collect(),
        })
        .collect()
}

/// One line per adapter: id, name and domains.
#[must_use]
pub fn render(banks: &[BankSummary]) -> String {
    let width = banks.iter().map(|b| b.id.len()).max().unwrap_or(0);
    banks
        .iter()
        .map(|b| format!("{:width$}  {} ({})", b.id, b.name, b.domains.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}
