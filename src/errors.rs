//! Catalog error taxonomy
//!
//! Error codes:
//! - CATALOG_DATABASE_ERROR
//! - CATALOG_ENTRY_ERROR
//! - CATALOG_DUPLICATE
//! - CATALOG_CONTAINER_ERROR
//! - CATALOG_SEARCH_ERROR
//! - CATALOG_TRANSFER_ERROR
//! - CATALOG_PERMISSION_DENIED
//! - CATALOG_LOCKED
//! - CATALOG_IO_ERROR

use std::io;

use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Database failed to initialize or is structurally broken
    #[error("Database error: {0}")]
    Database(String),

    /// Document is invalid for its declared container
    #[error("Invalid entry: {0}")]
    Entry(String),

    /// Insert targets an identifier that is already present
    #[error("{0}")]
    Duplicate(String),

    /// Container definition is misconfigured
    #[error("Container error: {0}")]
    Container(String),

    /// Operation targets an identifier that is absent
    #[error("{0}")]
    Search(String),

    /// Item could not be moved into another container
    #[error("{message}")]
    Transfer { message: String, key: String },

    /// Refused to touch the file (e.g. initialize over live data)
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Advisory lock is held by somebody else
    #[error("{0}")]
    Locked(String),

    /// Underlying file I/O failed
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    /// Wrap an I/O error with a description of what was being attempted
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        CatalogError::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transfer error for the offending field
    pub fn transfer(message: impl Into<String>, key: impl Into<String>) -> Self {
        CatalogError::Transfer {
            message: message.into(),
            key: key.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Database(_) => "CATALOG_DATABASE_ERROR",
            CatalogError::Entry(_) => "CATALOG_ENTRY_ERROR",
            CatalogError::Duplicate(_) => "CATALOG_DUPLICATE",
            CatalogError::Container(_) => "CATALOG_CONTAINER_ERROR",
            CatalogError::Search(_) => "CATALOG_SEARCH_ERROR",
            CatalogError::Transfer { .. } => "CATALOG_TRANSFER_ERROR",
            CatalogError::Permission(_) => "CATALOG_PERMISSION_DENIED",
            CatalogError::Locked(_) => "CATALOG_LOCKED",
            CatalogError::Io { .. } => "CATALOG_IO_ERROR",
        }
    }

    /// Whether this belongs to the permission / lock contention / I/O class
    pub fn is_io_category(&self) -> bool {
        matches!(
            self,
            CatalogError::Permission(_) | CatalogError::Locked(_) | CatalogError::Io { .. }
        )
    }

    /// Field key carried by a transfer error
    pub fn key(&self) -> Option<&str> {
        match self {
            CatalogError::Transfer { key, .. } => Some(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            CatalogError::Database("x".into()),
            CatalogError::Entry("x".into()),
            CatalogError::Duplicate("x".into()),
            CatalogError::Container("x".into()),
            CatalogError::Search("x".into()),
            CatalogError::transfer("x", "k"),
            CatalogError::Permission("x".into()),
            CatalogError::Locked("x".into()),
            CatalogError::io("x", io::Error::new(io::ErrorKind::Other, "boom")),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_transfer_carries_key() {
        let err = CatalogError::transfer("bad value", "z");
        assert_eq!(err.key(), Some("z"));
        assert_eq!(err.to_string(), "bad value");
    }

    #[test]
    fn test_io_category() {
        assert!(CatalogError::Locked("held".into()).is_io_category());
        assert!(CatalogError::Permission("exists".into()).is_io_category());
        assert!(!CatalogError::Duplicate("dup".into()).is_io_category());
    }
}
