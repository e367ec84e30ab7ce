//! Shared types for the Bastion platform

pub mod org;

pub use org::OrgId;

/// Node identifier
pub type NodeId = u64;

/// Asset identifier
pub type AssetId = u64;

/// Admin user identifier
pub type AdminUserId = u64;

/// Domain identifier
pub type DomainId = u64;

/// Gateway identifier
pub type GatewayId = u64;
