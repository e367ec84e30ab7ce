//! # Bastion Assets
//!
//! Asset inventory primitives for the Bastion platform.
//!
//! ## Features
//!
//! - **Node hierarchy filtering** over materialized-path node keys
//! - **Composable asset queries** (node, admin user, search, labels, ordering)
//! - **Gateway selection** with an injectable random source
//! - **Fire-and-forget task dispatch** for hardware refresh and connectivity tests
//! - **In-memory asset store** behind an async trait
//!
//! ## Example
//!
//! ```rust
//! use bastion_assets::{Asset, Node, NodeKey, filter_by_node};
//!
//! let root = Node::new(1, NodeKey::new("1").unwrap(), "Default");
//! let web = Node::new(2, NodeKey::new("1:2").unwrap(), "Web");
//! let nodes = vec![root, web.clone()];
//!
//! let a = Asset::new(10, "web-01", "10.0.0.1").with_nodes([2]);
//! let b = Asset::new(11, "db-01", "10.0.0.2");
//!
//! let visible = filter_by_node(vec![a, b], &web, &nodes, false);
//! assert_eq!(visible.len(), 1);
//! assert_eq!(visible[0].hostname, "web-01");
//! ```

pub mod error;
pub mod types;
pub mod node;
pub mod query;
pub mod store;
pub mod gateway;
pub mod tasks;

// Re-export commonly used types
pub use error::{AssetError, Result};
pub use types::{
    AdminUser, Asset, Domain, Gateway, GatewayWithAuth, HardwareInfo, Label, Protocol,
};
pub use node::{filter_by_node, filter_by_node_id, Node, NodeFilter, NodeKey, NodeKeyError};
pub use query::{AssetFilter, AssetListParams, AssetQuery, OrderField, Ordering};
pub use store::{AssetStore, InMemoryAssetStore};
pub use gateway::{select_gateway, NO_GATEWAY_MSG};
pub use tasks::{AssetJob, ChannelDispatcher, QueuedTask, TaskDispatcher, TaskHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
