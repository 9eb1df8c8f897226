use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use passbook_adapters::AdapterRegistry;
use passbook_cli::commands::{banks, fetch};
use passbook_core::AppConfig;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "passbook",
    version,
    about = "Fetch bank statements through an existing browser session",
    long_about = "Passbook replays each bank's private web API with the cookies and \
                  storage of a logged-in browser, lists accounts and statements, and \
                  saves statement PDFs to disk."
)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "PASSBOOK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported banks and their domains
    Banks {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List statements for one bank and download them
    Fetch(fetch::FetchArgs),
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => AppConfig::load_with_env().context("failed to load config")?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    passbook_cli::init_tracing(cli.verbose);

    match cli.command {
        Commands::Banks { json } => {
            let banks = banks::list_banks(&AdapterRegistry::with_default_adapters());
            if json {
                println!("{}", serde_json::to_string_pretty(&banks)?);
            } else {
                println!("{}", banks::render(&banks));
            }
        }
        Commands::Fetch(args) => {
            let config = load_config(cli.config.as_ref())?;
            info!("Starting Passbook v{}", env!("CARGO_PKG_VERSION"));

            let summary = fetch::run(&args, config).await?;
            if !summary.statements.is_empty() {
                println!("{}", fetch::render_statements(&summary.statements));
            }
            for path in &summary.written {
                println!("saved {}", path.display());
            }
            for failure in &summary.failures {
                eprintln!("error: {failure}");
            }
            if !summary.failures.is_empty() {
                anyhow::bail!("{} step(s) failed", summary.failures.len());
            }
        }
    }

    Ok(())
}
