//! Error types for the RBAC subsystem

use thiserror::Error;

/// RBAC errors
///
/// Rule evaluation itself never fails; these surface from store writes
/// and record validation.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced record does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Record name already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    pub fn not_found(kind: &'static str, name: impl ToString) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

/// Result type for RBAC operations
pub type Result<T> = std::result::Result<T, AuthzError>;
