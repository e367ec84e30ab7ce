//! Error types for the asset inventory

use thiserror::Error;

/// Asset inventory errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// A referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind (node, asset, admin user, domain)
        kind: &'static str,
        /// Identifier as supplied by the caller
        id: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Task dispatch failed
    #[error("Task dispatch failed: {0}")]
    Dispatch(String),
}

impl AssetError {
    /// Create a not found error for the given record kind
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        AssetError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result type for asset operations
pub type Result<T> = std::result::Result<T, AssetError>;
