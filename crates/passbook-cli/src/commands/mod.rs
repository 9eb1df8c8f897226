//! Subcommand handlers.

pub mod banks;
pub mod fetch;
