//! Passbook command-line application.
//!
//! This is the thin shell around the adapters: it loads configuration and a
//! browser state export, runs one bank's chain, and writes the documents.
//! Bank logic lives in `passbook-adapters`.

pub mod commands;
pub mod output;

/// Initialize tracing subscriber for logging
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "debug,passbook=trace"
    } else {
        "info,passbook=debug"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
