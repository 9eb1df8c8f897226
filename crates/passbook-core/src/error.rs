//! Error types shared by every bank adapter.
//!
//! The taxonomy mirrors the adapter call chain: each step of the chain has its
//! own variant, and every variant names the bank that produced it so a message
//! surfaced to the user is self-describing.

use thiserror::Error;

/// Errors raised while walking a bank's session/profile/accounts/statements chain.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// No cookie or storage key proves the user is logged in
    #[error("{bank}: no active session found ({reason}), please log in to the bank website and retry")]
    Authentication {
        /// Bank identifier
        bank: String,
        /// What was looked for
        reason: String,
    },

    /// The profile endpoint failed or lacked an expected field
    #[error("{bank} getProfile failed: {message}")]
    Profile {
        /// Bank identifier
        bank: String,
        /// Names the failing field or API
        message: String,
    },

    /// The accounts endpoint failed, was malformed, or returned nothing
    #[error("{bank} getAccounts failed: {message}")]
    Accounts {
        /// Bank identifier
        bank: String,
        /// Error message
        message: String,
    },

    /// The statements endpoint was malformed or no endpoint worked
    #[error("{bank} getStatements failed: {message}")]
    Statements {
        /// Bank identifier
        bank: String,
        /// Error message
        message: String,
    },

    /// The statement document could not be fetched or was not a PDF
    #[error("{bank} downloadStatement failed for statement {statement_id}: {message}")]
    Download {
        /// Bank identifier
        bank: String,
        /// Opaque statement identifier
        statement_id: String,
        /// Error message
        message: String,
    },

    /// Server-side document generation never reported ready
    #[error("{bank} downloadStatement timed out for statement {statement_id} after {attempts} status checks")]
    GenerationTimeout {
        /// Bank identifier
        bank: String,
        /// Opaque statement identifier
        statement_id: String,
        /// Number of status checks issued
        attempts: u32,
    },

    /// No adapter is registered under this identifier
    #[error("no adapter registered for bank: {bank_id}")]
    UnknownBank {
        /// The bank ID that was requested
        bank_id: String,
    },
}

/// Coarse error classification, one per step of the adapter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No session evidence
    Authentication,
    /// Profile lookup failure
    Profile,
    /// Account enumeration failure
    Accounts,
    /// Statement enumeration failure
    Statements,
    /// Document download failure, including generation timeouts
    Download,
    /// Registry lookup failure
    Registry,
}

impl AdapterError {
    /// Classify the error by the adapter step that raised it.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Profile { .. } => ErrorKind::Profile,
            Self::Accounts { .. } => ErrorKind::Accounts,
            Self::Statements { .. } => ErrorKind::Statements,
            Self::Download { .. } | Self::GenerationTimeout { .. } => ErrorKind::Download,
            Self::UnknownBank { .. } => ErrorKind::Registry,
        }
    }

    /// Build an authentication error for `bank`.
    pub fn authentication(bank: &str, reason: impl Into<String>) -> Self {
        Self::Authentication {
            bank: bank.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a download error for `bank` and `statement_id`.
    pub fn download(bank: &str, statement_id: &str, message: impl Into<String>) -> Self {
        Self::Download {
            bank: bank.to_string(),
            statement_id: statement_id.to_string(),
            message: message.into(),
        }
    }
}

/// The step of the adapter chain a request belongs to.
///
/// Used to fold transport and parsing failures into the matching
/// [`AdapterError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `getProfile`
    Profile,
    /// `getAccounts`
    Accounts,
    /// `getStatements`
    Statements,
}

impl Operation {
    /// Contract name of the operation, as used in log lines.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Profile => "getProfile",
            Self::Accounts => "getAccounts",
            Self::Statements => "getStatements",
        }
    }

    /// Build the error variant for this operation.
    ///
    /// Downloads always know their statement id and use
    /// [`AdapterError::download`] instead.
    pub fn fail(self, bank: &str, message: impl Into<String>) -> AdapterError {
        let bank = bank.to_string();
        let message = message.into();
        match self {
            Self::Profile => AdapterError::Profile { bank, message },
            Self::Accounts => AdapterError::Accounts { bank, message },
            Self::Statements => AdapterError::Statements { bank, message },
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse a browser state export
    #[error("failed to parse browser state: {0}")]
    StateParse(#[from] serde_json::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `AdapterError`.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
