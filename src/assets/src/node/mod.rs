//! Node hierarchy
//!
//! Nodes group assets into a tree addressed by materialized-path keys.
//! [`NodeFilter`] narrows an asset collection to what is visible from a
//! given node.

mod key;
mod filter;

pub use key::{NodeKey, NodeKeyError};
pub use filter::{filter_by_node, filter_by_node_id, NodeFilter};

use bastion_core::{NodeId, OrgId};
use serde::{Deserialize, Serialize};

/// Position in the asset grouping tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// Materialized path, e.g. `1:2:3`
    pub key: NodeKey,

    /// Display name
    pub value: String,

    #[serde(default)]
    pub org_id: OrgId,
}

impl Node {
    pub fn new(id: NodeId, key: NodeKey, value: impl Into<String>) -> Self {
        Self {
            id,
            key,
            value: value.into(),
            org_id: OrgId::default(),
        }
    }

    pub fn with_org(mut self, org_id: impl Into<OrgId>) -> Self {
        self.org_id = org_id.into();
        self
    }

    /// A node whose key has no parent segment
    pub fn is_root(&self) -> bool {
        self.key.is_root()
    }
}
