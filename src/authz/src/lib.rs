//! # Bastion Authorization
//!
//! Role-based access control for the Bastion API.
//!
//! ## Features
//!
//! - **Rules** granting verbs on app resources, optionally narrowed to ids
//! - **URL pattern expansion** of rules with `*` and `**` wildcards
//! - **Roles and cluster roles** bound to users and groups
//! - **LRU caching** of decisions, cleared on every write
//!
//! ## Example
//!
//! ```rust
//! use bastion_authz::{
//!     AccessRequest, InMemoryRbacStore, Principal, RbacEngine, Role, RoleBinding, Rule, Subject,
//! };
//! use bastion_core::OrgId;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = RbacEngine::new(Arc::new(InMemoryRbacStore::new()));
//!
//!     engine.put_rule(Rule::new(1)
//!         .with_verbs(["list".parse()?])
//!         .with_api_groups(["assets"])
//!         .with_resources(["assets"])).await?;
//!     engine.put_role(Role::new("viewer").with_rules([1])).await?;
//!     engine.put_role_binding(
//!         RoleBinding::new("viewers", "viewer").with_subject(Subject::user("alice")),
//!     ).await?;
//!
//!     let request = AccessRequest::from_http(
//!         Principal::new("alice"),
//!         OrgId::default(),
//!         "GET",
//!         "/api/assets/v1/assets/",
//!     );
//!     assert!(engine.authorize(&request).await?.allowed);
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod pattern;
pub mod role;
pub mod rule;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use engine::{
    AccessDecision, AccessRequest, AccessTarget, BoundRole, CacheStats, EngineConfig, RbacEngine,
};
pub use error::{AuthzError, Result};
pub use pattern::{PatternError, UrlPattern};
pub use role::{validate_slug, ClusterRole, ClusterRoleBinding, Role, RoleBinding};
pub use rule::{authorize, authorize_url, Rule};
pub use store::{InMemoryRbacStore, RbacStore};
pub use types::{Principal, RuleId, Subject, Verb};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
