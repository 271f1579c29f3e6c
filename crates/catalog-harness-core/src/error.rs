//! Error types for catalog operations.

use std::fmt;

use thiserror::Error;

/// The kind of record a [`CatalogError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Product,
    Summary,
    Tool,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Product => f.write_str("product"),
            RecordKind::Summary => f.write_str("product summary"),
            RecordKind::Tool => f.write_str("tool"),
        }
    }
}

/// Errors surfaced by the search and summary components.
///
/// Plain lookups report a missing record as `Ok(None)`; `NotFound` is only
/// returned when an operation requires the record to exist.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// Malformed caller input detected before reaching the store.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Connectivity or engine failure in the record store.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn product_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: RecordKind::Product,
            id: id.into(),
        }
    }

    pub fn summary_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: RecordKind::Summary,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_identifier() {
        let err = CatalogError::product_not_found("p42");
        assert_eq!(err.to_string(), "product not found: p42");
        assert!(err.is_not_found());

        let err = CatalogError::summary_not_found("p7");
        assert_eq!(err.to_string(), "product summary not found: p7");
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: CatalogError = anyhow::anyhow!("connection refused").into();
        assert_eq!(err.to_string(), "connection refused");
        assert!(!err.is_not_found());
    }
}
