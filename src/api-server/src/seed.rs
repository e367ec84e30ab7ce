//! Fixture loading
//!
//! A seed is a JSON document holding inventory and RBAC records, applied to
//! empty stores at startup. Records are written in dependency order so that
//! references (asset to node, binding to role) resolve.

use bastion_assets::{AdminUser, Asset, AssetStore, Domain, Node};
use bastion_authz::{ClusterRole, ClusterRoleBinding, RbacEngine, Role, RoleBinding, Rule};
use bastion_core::{CoreError, Result as CoreResult};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::Result;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub nodes: Vec<Node>,
    pub admin_users: Vec<AdminUser>,
    pub domains: Vec<Domain>,
    pub assets: Vec<Asset>,
    pub rules: Vec<Rule>,
    pub roles: Vec<Role>,
    pub cluster_roles: Vec<ClusterRole>,
    pub role_bindings: Vec<RoleBinding>,
    pub cluster_role_bindings: Vec<ClusterRoleBinding>,
}

impl Seed {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::serialization(e.to_string()))
    }

    /// Reads a seed file
    pub async fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json).map_err(|e| CoreError::configuration(format!("{}: {}", path.display(), e)))
    }

    /// Writes every record through the stores
    pub async fn apply(self, assets: &dyn AssetStore, rbac: &RbacEngine) -> Result<()> {
        let asset_count = self.assets.len();
        let rule_count = self.rules.len();

        for node in self.nodes {
            assets.put_node(node).await?;
        }
        for admin_user in self.admin_users {
            assets.put_admin_user(admin_user).await?;
        }
        for domain in self.domains {
            assets.put_domain(domain).await?;
        }
        for asset in self.assets {
            assets.create_asset(asset).await?;
        }

        for rule in self.rules {
            rbac.put_rule(rule).await?;
        }
        for role in self.roles {
            rbac.put_role(role).await?;
        }
        for role in self.cluster_roles {
            rbac.put_cluster_role(role).await?;
        }
        for binding in self.role_bindings {
            rbac.put_role_binding(binding).await?;
        }
        for binding in self.cluster_role_bindings {
            rbac.put_cluster_role_binding(binding).await?;
        }

        info!(assets = asset_count, rules = rule_count, "Seed applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use bastion_assets::InMemoryAssetStore;
    use bastion_authz::{InMemoryRbacStore, Principal, AccessRequest, Verb};
    use bastion_core::OrgId;
    use std::io::Write;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    const SEED: &str = r#"{
        "nodes": [
            {"id": 1, "key": "1", "value": "Default"},
            {"id": 2, "key": "1:1", "value": "Web"}
        ],
        "admin_users": [{"id": 1, "name": "root", "username": "root"}],
        "domains": [{
            "id": 1,
            "name": "dmz",
            "gateways": [{"id": 1, "name": "gw", "ip": "10.1.0.1", "port": 22, "username": "jump"}]
        }],
        "assets": [
            {"id": 1, "hostname": "web-01", "ip": "10.0.0.1", "port": 22, "nodes": [2], "admin_user": 1, "domain": 1}
        ],
        "rules": [
            {"id": 1, "verbs": ["list", "retrieve"], "api_groups": ["assets"], "resources": ["assets"]}
        ],
        "roles": [{"name": "viewer", "rules": [1]}],
        "role_bindings": [{"name": "ops-view", "role": "viewer", "subjects": [{"kind": "group", "name": "ops"}]}]
    }"#;

    fn engine() -> RbacEngine {
        RbacEngine::new(Arc::new(InMemoryRbacStore::new()))
    }

    #[tokio::test]
    async fn test_load_and_apply() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let seed = assert_ok!(Seed::load(file.path()).await);
        assert_eq!(seed.nodes.len(), 2);

        let store = InMemoryAssetStore::new();
        let rbac = engine();
        assert_ok!(seed.apply(&store, &rbac).await);

        let asset = store.get_asset(1).await.unwrap().unwrap();
        assert_eq!(asset.hostname, "web-01");
        assert!(store.get_domain(1).await.unwrap().is_some());

        let request = AccessRequest::resource(
            Principal::new("alice").with_group("ops"),
            OrgId::default(),
            "assets",
            "assets",
            None,
            Verb::List,
        );
        assert!(rbac.authorize(&request).await.unwrap().allowed);
    }

    #[test]
    fn test_empty_seed() {
        let seed = assert_ok!(Seed::from_json("{}"));
        assert!(seed.assets.is_empty());
        assert!(seed.cluster_role_bindings.is_empty());
    }

    #[test]
    fn test_invalid_node_key_rejected() {
        let err = Seed::from_json(r#"{"nodes": [{"id": 1, "key": "1:x", "value": "bad"}]}"#).unwrap_err();
        assert!(matches!(err, CoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Seed::load(dir.path().join("absent.json")).await.unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }

    #[tokio::test]
    async fn test_dangling_binding_fails() {
        let seed = Seed::from_json(r#"{"role_bindings": [{"name": "b", "role": "ghost"}]}"#).unwrap();
        let err = seed.apply(&InMemoryAssetStore::new(), &engine()).await.unwrap_err();
        assert!(matches!(err, ApiError::Authz(_)));
    }
}
