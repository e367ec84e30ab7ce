//! Asset inventory storage

use async_trait::async_trait;
use bastion_core::{AdminUserId, AssetId, DomainId, NodeId, OrgId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AssetError, Result};
use crate::node::Node;
use crate::types::{AdminUser, Asset, Domain};

/// Asset store trait
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Get an asset by ID
    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>>;

    /// List assets of an organization, ordered by id
    async fn list_assets(&self, org: &OrgId) -> Result<Vec<Asset>>;

    /// Store a new asset, assigning a fresh id
    async fn create_asset(&self, asset: Asset) -> Result<Asset>;

    /// Replace an existing asset
    async fn update_asset(&self, asset: Asset) -> Result<Asset>;

    /// Store several new assets; nothing is stored unless all of them are
    async fn create_assets(&self, assets: Vec<Asset>) -> Result<Vec<Asset>>;

    /// Replace several assets; nothing changes unless all of them do
    async fn update_assets(&self, assets: Vec<Asset>) -> Result<Vec<Asset>>;

    /// Delete an asset, returning whether it existed
    async fn delete_asset(&self, id: AssetId) -> Result<bool>;

    /// Get a node by ID
    async fn get_node(&self, id: NodeId) -> Result<Option<Node>>;

    /// List nodes of an organization
    async fn list_nodes(&self, org: &OrgId) -> Result<Vec<Node>>;

    /// Store a node
    async fn put_node(&self, node: Node) -> Result<()>;

    /// Get an admin user by ID
    async fn get_admin_user(&self, id: AdminUserId) -> Result<Option<AdminUser>>;

    /// Store an admin user
    async fn put_admin_user(&self, admin_user: AdminUser) -> Result<()>;

    /// Get a domain by ID
    async fn get_domain(&self, id: DomainId) -> Result<Option<Domain>>;

    /// Store a domain
    async fn put_domain(&self, domain: Domain) -> Result<()>;
}

#[derive(Default)]
struct Inventory {
    assets: HashMap<AssetId, Asset>,
    nodes: HashMap<NodeId, Node>,
    admin_users: HashMap<AdminUserId, AdminUser>,
    domains: HashMap<DomainId, Domain>,
    next_asset_id: AssetId,
}

impl Inventory {
    /// Hostnames are unique per organization
    fn check_hostname(&self, asset: &Asset) -> Result<()> {
        let taken = self.assets.values().any(|other| {
            other.id != asset.id && other.org_id == asset.org_id && other.hostname == asset.hostname
        });
        if taken {
            return Err(AssetError::Conflict(format!(
                "hostname '{}' already exists in organization {}",
                asset.hostname, asset.org_id
            )));
        }
        Ok(())
    }

    /// Referenced nodes, admin user and domain must exist in the asset's
    /// organization
    fn check_references(&self, asset: &Asset) -> Result<()> {
        let org = &asset.org_id;
        let missing_node = asset
            .nodes
            .iter()
            .find(|id| !self.nodes.get(*id).is_some_and(|n| &n.org_id == org));
        if let Some(node_id) = missing_node {
            return Err(AssetError::InvalidInput(format!("node {} does not exist", node_id)));
        }
        if let Some(admin_user) = asset.admin_user {
            if !self.admin_users.get(&admin_user).is_some_and(|u| &u.org_id == org) {
                return Err(AssetError::InvalidInput(format!(
                    "admin user {} does not exist",
                    admin_user
                )));
            }
        }
        if let Some(domain) = asset.domain {
            if !self.domains.get(&domain).is_some_and(|d| &d.org_id == org) {
                return Err(AssetError::InvalidInput(format!("domain {} does not exist", domain)));
            }
        }
        Ok(())
    }

    fn insert_new(&mut self, mut asset: Asset) -> Result<Asset> {
        self.check_references(&asset)?;

        // Seeded assets keep their id; everything else gets the next free one
        if asset.id == 0 || self.assets.contains_key(&asset.id) {
            asset.id = self.next_asset_id;
        }
        self.check_hostname(&asset)?;
        self.next_asset_id = self.next_asset_id.max(asset.id + 1);

        debug!(id = asset.id, hostname = %asset.hostname, "Created asset");
        self.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    /// Returns the stored asset and the version it replaced
    fn replace(&mut self, asset: Asset) -> Result<(Asset, Asset)> {
        let Some(previous) = self.assets.get(&asset.id).cloned() else {
            return Err(AssetError::not_found("asset", asset.id));
        };
        self.check_references(&asset)?;
        self.check_hostname(&asset)?;

        debug!(id = asset.id, "Updated asset");
        self.assets.insert(asset.id, asset.clone());
        Ok((asset, previous))
    }
}

/// In-memory asset store implementation
pub struct InMemoryAssetStore {
    inner: Arc<RwLock<Inventory>>,
}

impl InMemoryAssetStore {
    /// Create a new in-memory asset store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inventory {
                next_asset_id: 1,
                ..Default::default()
            })),
        }
    }
}

impl Default for InMemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>> {
        let inner = self.inner.read().await;
        Ok(inner.assets.get(&id).cloned())
    }

    async fn list_assets(&self, org: &OrgId) -> Result<Vec<Asset>> {
        let inner = self.inner.read().await;
        let mut assets: Vec<Asset> = inner
            .assets
            .values()
            .filter(|a| &a.org_id == org)
            .cloned()
            .collect();
        assets.sort_by_key(|a| a.id);
        Ok(assets)
    }

    async fn create_asset(&self, asset: Asset) -> Result<Asset> {
        let mut inner = self.inner.write().await;
        inner.insert_new(asset)
    }

    async fn update_asset(&self, asset: Asset) -> Result<Asset> {
        let mut inner = self.inner.write().await;
        inner.replace(asset).map(|(stored, _)| stored)
    }

    async fn create_assets(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        let mut inner = self.inner.write().await;
        let next_asset_id = inner.next_asset_id;

        let mut created: Vec<Asset> = Vec::with_capacity(assets.len());
        for asset in assets {
            match inner.insert_new(asset) {
                Ok(asset) => created.push(asset),
                Err(e) => {
                    for asset in &created {
                        inner.assets.remove(&asset.id);
                    }
                    inner.next_asset_id = next_asset_id;
                    debug!(rolled_back = created.len(), "Batch create failed");
                    return Err(e);
                }
            }
        }
        Ok(created)
    }

    async fn update_assets(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        let mut inner = self.inner.write().await;

        let mut updated = Vec::with_capacity(assets.len());
        let mut previous: Vec<Asset> = Vec::with_capacity(assets.len());
        for asset in assets {
            match inner.replace(asset) {
                Ok((stored, old)) => {
                    updated.push(stored);
                    previous.push(old);
                }
                Err(e) => {
                    for old in previous.into_iter().rev() {
                        inner.assets.insert(old.id, old);
                    }
                    debug!(rolled_back = updated.len(), "Batch update failed");
                    return Err(e);
                }
            }
        }
        Ok(updated)
    }

    async fn delete_asset(&self, id: AssetId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.assets.remove(&id).is_some())
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<Node>> {
        let inner = self.inner.read().await;
        Ok(inner.nodes.get(&id).cloned())
    }

    async fn list_nodes(&self, org: &OrgId) -> Result<Vec<Node>> {
        let inner = self.inner.read().await;
        let mut nodes: Vec<Node> = inner
            .nodes
            .values()
            .filter(|n| &n.org_id == org)
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(nodes)
    }

    async fn put_node(&self, node: Node) -> Result<()> {
        let mut inner = self.inner.write().await;
        let duplicate = inner
            .nodes
            .values()
            .any(|n| n.id != node.id && n.org_id == node.org_id && n.key == node.key);
        if duplicate {
            return Err(AssetError::Conflict(format!("node key '{}' already exists", node.key)));
        }
        inner.nodes.insert(node.id, node);
        Ok(())
    }

    async fn get_admin_user(&self, id: AdminUserId) -> Result<Option<AdminUser>> {
        let inner = self.inner.read().await;
        Ok(inner.admin_users.get(&id).cloned())
    }

    async fn put_admin_user(&self, admin_user: AdminUser) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.admin_users.insert(admin_user.id, admin_user);
        Ok(())
    }

    async fn get_domain(&self, id: DomainId) -> Result<Option<Domain>> {
        let inner = self.inner.read().await;
        Ok(inner.domains.get(&id).cloned())
    }

    async fn put_domain(&self, domain: Domain) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.domains.insert(domain.id, domain);
        Ok(())
    }
}
