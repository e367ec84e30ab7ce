//! # Bastion Core
//!
//! Shared identifiers, organization scoping, and error handling for the
//! Bastion asset inventory and authorization crates.

pub mod types;
pub mod error;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{AdminUserId, AssetId, DomainId, GatewayId, NodeId, OrgId};
