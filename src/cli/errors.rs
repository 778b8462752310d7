//! CLI-specific error types
//!
//! All CLI errors are fatal: printed to stderr, non-zero exit.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::errors::CatalogError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration missing or invalid
    ConfigError,
    /// I/O error (stdout, stderr)
    IoError,
    /// Malformed command line input
    UsageError,
    /// Search came back empty
    NotFound,
    /// Failure reported by the catalog, with its own code
    Catalog(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DEVICEDB_CLI_CONFIG_ERROR",
            Self::IoError => "DEVICEDB_CLI_IO_ERROR",
            Self::UsageError => "DEVICEDB_CLI_USAGE_ERROR",
            Self::NotFound => "DEVICEDB_CLI_NOT_FOUND",
            Self::Catalog(code) => code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn usage_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::UsageError, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::NotFound, msg)
    }

    /// No configuration file and no `--path`
    pub fn no_database() -> Self {
        Self::config_error(
            "No database configured. Pass --path, set DEVICEDB_CFG, or create ./devicedb.json",
        )
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        Self::new(CliErrorCode::Catalog(e.code()), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_code_is_kept() {
        let err = CliError::from(CatalogError::Duplicate("Device m1 already exists".into()));
        assert_eq!(err.code_str(), "CATALOG_DUPLICATE");
        assert!(err.to_string().starts_with("CATALOG_DUPLICATE: "));
    }

    #[test]
    fn test_usage_error_display() {
        let err = CliError::usage_error("bad term");
        assert_eq!(err.to_string(), "DEVICEDB_CLI_USAGE_ERROR: bad term");
    }
}
