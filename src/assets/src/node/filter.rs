//! Node-scoped asset visibility

use bastion_core::NodeId;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use super::Node;
use crate::error::{AssetError, Result};
use crate::types::Asset;

/// Visibility rule derived from a target node
///
/// | node     | show current | visible assets                               |
/// |----------|--------------|----------------------------------------------|
/// | root     | yes          | direct members plus assets with no node      |
/// | root     | no           | everything (the input passes through)        |
/// | non-root | yes          | direct members only                          |
/// | non-root | no           | members of the node or any of its descendants |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeFilter {
    /// Root view without "show current": no restriction
    PassThrough,
    /// Root view with "show current"
    DirectOrUnassigned(NodeId),
    /// Non-root view with "show current"
    Direct(NodeId),
    /// Non-root view: ids of the node and every descendant
    Subtree(BTreeSet<NodeId>),
}

impl NodeFilter {
    /// Builds the filter for `node`, looking descendants up in `nodes`
    pub fn resolve<'a, I>(node: &Node, nodes: I, show_current_asset: bool) -> Self
    where
        I: IntoIterator<Item = &'a Node>,
    {
        let filter = match (node.is_root(), show_current_asset) {
            (true, true) => NodeFilter::DirectOrUnassigned(node.id),
            (true, false) => NodeFilter::PassThrough,
            (false, true) => NodeFilter::Direct(node.id),
            (false, false) => {
                let mut ids: BTreeSet<NodeId> = nodes
                    .into_iter()
                    .filter(|n| node.key.contains(&n.key))
                    .map(|n| n.id)
                    .collect();
                ids.insert(node.id);
                NodeFilter::Subtree(ids)
            }
        };

        debug!(node = node.id, key = %node.key, show_current_asset, ?filter, "Resolved node filter");
        filter
    }

    /// Whether `asset` is visible under this filter
    pub fn matches(&self, asset: &Asset) -> bool {
        match self {
            NodeFilter::PassThrough => true,
            NodeFilter::DirectOrUnassigned(id) => asset.nodes.contains(id) || asset.is_unassigned(),
            NodeFilter::Direct(id) => asset.nodes.contains(id),
            NodeFilter::Subtree(ids) => asset.nodes.iter().any(|n| ids.contains(n)),
        }
    }

    /// True when the filter restricts nothing
    pub fn is_pass_through(&self) -> bool {
        matches!(self, NodeFilter::PassThrough)
    }
}

/// Narrows `assets` to those visible from `node`
///
/// Each asset appears at most once in the result, in input order.
pub fn filter_by_node<I>(assets: I, node: &Node, nodes: &[Node], show_current_asset: bool) -> Vec<Asset>
where
    I: IntoIterator<Item = Asset>,
{
    let filter = NodeFilter::resolve(node, nodes, show_current_asset);
    let mut seen = HashSet::new();

    assets
        .into_iter()
        .filter(|asset| filter.matches(asset))
        .filter(|asset| seen.insert(asset.id))
        .collect()
}

/// Like [`filter_by_node`], looking the node up by id first
///
/// Fails with [`AssetError::NotFound`] when no node has `node_id`.
pub fn filter_by_node_id<I>(
    assets: I,
    node_id: NodeId,
    nodes: &[Node],
    show_current_asset: bool,
) -> Result<Vec<Asset>>
where
    I: IntoIterator<Item = Asset>,
{
    let node = nodes
        .iter()
        .find(|n| n.id == node_id)
        .ok_or_else(|| AssetError::not_found("node", node_id))?;

    Ok(filter_by_node(assets, node, nodes, show_current_asset))
}
