//! `passbook fetch`: run one bank's chain and save its statements.

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use passbook_adapters::{
    fetch_all, AdapterRegistry, BankAdapter, BankContext, FetchOptions, ReqwestClient,
};
use passbook_core::{AppConfig, BrowserState, Statement};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Arguments for `passbook fetch`.
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Bank identifier, e.g. `citi` (see `passbook banks`)
    #[arg(long)]
    pub bank: String,

    /// Browser state export: cookies, sessionStorage and localStorage as JSON
    #[arg(long, value_name = "FILE")]
    pub state: PathBuf,

    /// Output directory (defaults to `output.download_dir`)
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Statement lookback window in months
    #[arg(long)]
    pub months: Option<u32>,

    /// Keep only the newest N statements per account
    #[arg(long)]
    pub limit: Option<usize>,

    /// List statements without downloading them
    #[arg(long)]
    pub list_only: bool,
}

/// What a fetch produced.
#[derive(Debug, Default)]
pub struct FetchSummary {
    /// Every listed statement
    pub statements: Vec<Statement>,
    /// Files written
    pub written: Vec<PathBuf>,
    /// Human-readable description of every recorded failure
    pub failures: Vec<String>,
}

/// Run `passbook fetch` against the live bank.
pub async fn run(args: &FetchArgs, mut config: AppConfig) -> Result<FetchSummary> {
    if let Some(months) = args.months {
        config.statements.lookback_months = months;
        config.validate().context("invalid --months")?;
    }

    let registry = AdapterRegistry::with_default_adapters();
    let adapter = registry.get(&args.bank)?;

    let state = BrowserState::from_json_file(&args.state)
        .with_context(|| format!("failed to read browser state {}", args.state.display()))?;
    let http = ReqwestClient::new(&state, &config.http).context("failed to build HTTP client")?;
    let ctx = BankContext::new(Arc::new(http), Arc::new(state))
        .with_settings(config.adapter_settings());

    let out_dir = match &args.out {
        Some(dir) => dir.clone(),
        None => config.download_dir()?,
    };
    let options = FetchOptions {
        download: !args.list_only,
        max_statements_per_account: args.limit,
    };
    execute(adapter.as_ref(), &ctx, options, &out_dir).await
}

/// Walk the chain and write every downloaded document under `out_dir`.
///
/// Profile and account failures abort; per-account and per-document failures
/// are collected in the summary.
pub async fn execute(
    adapter: &dyn BankAdapter,
    ctx: &BankContext,
    options: FetchOptions,
    out_dir: &Path,
) -> Result<FetchSummary> {
    let report = fetch_all(adapter, ctx, options).await?;
    let mut summary = FetchSummary::default();

    for account in report.accounts {
        if let Some(error) = &account.error {
            summary.failures.push(error.to_string());
        }
        for download in &account.downloads {
            match &download.result {
                Ok(document) => {
                    let path = output::write_statement(
                        out_dir,
                        report.bank_id,
                        &download.statement,
                        document,
                    )
                    .with_context(|| format!("failed to write into {}", out_dir.display()))?;
                    summary.written.push(path);
                }
                Err(e) => summary.failures.push(e.to_string()),
            }
        }
        summary.statements.extend(account.statements);
    }

    info!(
        bank = report.bank_id,
        statements = summary.statements.len(),
        written = summary.written.len(),
        failures = summary.failures.len(),
        "Fetch finished"
    );
    Ok(summary)
}

/// One line per statement: date, account, type and id.
#[must_use]
pub fn render_statements(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(|s| {
            format!(
                "{}  {} ({})  {}  {}",
                s.statement_date,
                s.account.account_name,
                s.account.account_mask,
                s.account.account_type,
                s.statement_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
