//! RBAC record storage

use async_trait::async_trait;
use bastion_core::OrgId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AuthzError, Result};
use crate::role::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use crate::rule::Rule;
use crate::types::RuleId;

/// Storage for rules, roles and bindings
///
/// `put_*` inserts or replaces by key. Writes validate names and
/// references; reads never fail on dangling references.
#[async_trait]
pub trait RbacStore: Send + Sync {
    async fn get_rule(&self, id: RuleId) -> Result<Option<Rule>>;
    async fn list_rules(&self) -> Result<Vec<Rule>>;
    async fn put_rule(&self, rule: Rule) -> Result<()>;
    /// Fails with a conflict while a role still references the rule
    async fn delete_rule(&self, id: RuleId) -> Result<bool>;

    async fn get_role(&self, name: &str) -> Result<Option<Role>>;
    async fn list_roles(&self, org: &OrgId) -> Result<Vec<Role>>;
    async fn put_role(&self, role: Role) -> Result<()>;
    async fn delete_role(&self, name: &str) -> Result<bool>;

    async fn get_cluster_role(&self, name: &str) -> Result<Option<ClusterRole>>;
    async fn list_cluster_roles(&self) -> Result<Vec<ClusterRole>>;
    async fn put_cluster_role(&self, role: ClusterRole) -> Result<()>;
    async fn delete_cluster_role(&self, name: &str) -> Result<bool>;

    async fn list_role_bindings(&self, org: &OrgId) -> Result<Vec<RoleBinding>>;
    async fn put_role_binding(&self, binding: RoleBinding) -> Result<()>;
    async fn delete_role_binding(&self, name: &str) -> Result<bool>;

    async fn list_cluster_role_bindings(&self) -> Result<Vec<ClusterRoleBinding>>;
    async fn put_cluster_role_binding(&self, binding: ClusterRoleBinding) -> Result<()>;
    async fn delete_cluster_role_binding(&self, name: &str) -> Result<bool>;
}

#[derive(Default)]
struct Records {
    rules: HashMap<RuleId, Rule>,
    roles: HashMap<String, Role>,
    cluster_roles: HashMap<String, ClusterRole>,
    role_bindings: HashMap<String, RoleBinding>,
    cluster_role_bindings: HashMap<String, ClusterRoleBinding>,
}

impl Records {
    fn check_rules(&self, rules: &[RuleId]) -> Result<()> {
        match rules.iter().find(|id| !self.rules.contains_key(*id)) {
            Some(id) => Err(AuthzError::InvalidInput(format!("rule {} does not exist", id))),
            None => Ok(()),
        }
    }

    fn rule_in_use(&self, id: RuleId) -> Option<&str> {
        self.roles
            .values()
            .filter(|r| r.rules.contains(&id))
            .map(|r| r.name.as_str())
            .chain(
                self.cluster_roles
                    .values()
                    .filter(|r| r.rules.contains(&id))
                    .map(|r| r.name.as_str()),
            )
            .next()
    }
}

/// In-memory RBAC store
pub struct InMemoryRbacStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryRbacStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Records::default())),
        }
    }
}

impl Default for InMemoryRbacStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RbacStore for InMemoryRbacStore {
    async fn get_rule(&self, id: RuleId) -> Result<Option<Rule>> {
        let records = self.records.read().await;
        Ok(records.rules.get(&id).cloned())
    }

    async fn list_rules(&self) -> Result<Vec<Rule>> {
        let records = self.records.read().await;
        let mut rules: Vec<Rule> = records.rules.values().cloned().collect();
        rules.sort_by_key(|r| r.id);
        Ok(rules)
    }

    async fn put_rule(&self, rule: Rule) -> Result<()> {
        let mut records = self.records.write().await;
        debug!(id = rule.id, "Stored rule");
        records.rules.insert(rule.id, rule);
        Ok(())
    }

    async fn delete_rule(&self, id: RuleId) -> Result<bool> {
        let mut records = self.records.write().await;
        if let Some(role) = records.rule_in_use(id) {
            return Err(AuthzError::Conflict(format!(
                "rule {} is still used by role '{}'",
                id, role
            )));
        }
        Ok(records.rules.remove(&id).is_some())
    }

    async fn get_role(&self, name: &str) -> Result<Option<Role>> {
        let records = self.records.read().await;
        Ok(records.roles.get(name).cloned())
    }

    async fn list_roles(&self, org: &OrgId) -> Result<Vec<Role>> {
        let records = self.records.read().await;
        let mut roles: Vec<Role> = records
            .roles
            .values()
            .filter(|r| &r.org_id == org)
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn put_role(&self, role: Role) -> Result<()> {
        role.validate()?;
        let mut records = self.records.write().await;

        // Names are global; a role cannot move between organizations
        if let Some(existing) = records.roles.get(&role.name) {
            if existing.org_id != role.org_id {
                return Err(AuthzError::Conflict(format!(
                    "role '{}' already exists in organization {}",
                    role.name, existing.org_id
                )));
            }
        }
        records.check_rules(&role.rules)?;

        debug!(name = %role.name, org = %role.org_id, "Stored role");
        records.roles.insert(role.name.clone(), role);
        Ok(())
    }

    async fn delete_role(&self, name: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records.roles.remove(name).is_some())
    }

    async fn get_cluster_role(&self, name: &str) -> Result<Option<ClusterRole>> {
        let records = self.records.read().await;
        Ok(records.cluster_roles.get(name).cloned())
    }

    async fn list_cluster_roles(&self) -> Result<Vec<ClusterRole>> {
        let records = self.records.read().await;
        let mut roles: Vec<ClusterRole> = records.cluster_roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn put_cluster_role(&self, role: ClusterRole) -> Result<()> {
        role.validate()?;
        let mut records = self.records.write().await;
        records.check_rules(&role.rules)?;

        debug!(name = %role.name, "Stored cluster role");
        records.cluster_roles.insert(role.name.clone(), role);
        Ok(())
    }

    async fn delete_cluster_role(&self, name: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records.cluster_roles.remove(name).is_some())
    }

    async fn list_role_bindings(&self, org: &OrgId) -> Result<Vec<RoleBinding>> {
        let records = self.records.read().await;
        let mut bindings: Vec<RoleBinding> = records
            .role_bindings
            .values()
            .filter(|b| &b.org_id == org)
            .cloned()
            .collect();
        bindings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(bindings)
    }

    async fn put_role_binding(&self, binding: RoleBinding) -> Result<()> {
        crate::role::validate_slug(&binding.name)?;
        let mut records = self.records.write().await;

        let role = records
            .roles
            .get(&binding.role)
            .ok_or_else(|| AuthzError::not_found("role", &binding.role))?;
        if role.org_id != binding.org_id {
            return Err(AuthzError::InvalidInput(format!(
                "role '{}' belongs to organization {}, not {}",
                binding.role, role.org_id, binding.org_id
            )));
        }
        if let Some(existing) = records.role_bindings.get(&binding.name) {
            if existing.org_id != binding.org_id {
                return Err(AuthzError::Conflict(format!(
                    "role binding '{}' already exists",
                    binding.name
                )));
            }
        }

        debug!(name = %binding.name, role = %binding.role, "Stored role binding");
        records.role_bindings.insert(binding.name.clone(), binding);
        Ok(())
    }

    async fn delete_role_binding(&self, name: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records.role_bindings.remove(name).is_some())
    }

    async fn list_cluster_role_bindings(&self) -> Result<Vec<ClusterRoleBinding>> {
        let records = self.records.read().await;
        let mut bindings: Vec<ClusterRoleBinding> =
            records.cluster_role_bindings.values().cloned().collect();
        bindings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(bindings)
    }

    async fn put_cluster_role_binding(&self, binding: ClusterRoleBinding) -> Result<()> {
        crate::role::validate_slug(&binding.name)?;
        let mut records = self.records.write().await;
        if !records.cluster_roles.contains_key(&binding.cluster_role) {
            return Err(AuthzError::not_found("cluster role", &binding.cluster_role));
        }

        debug!(name = %binding.name, cluster_role = %binding.cluster_role, "Stored cluster role binding");
        records.cluster_role_bindings.insert(binding.name.clone(), binding);
        Ok(())
    }

    async fn delete_cluster_role_binding(&self, name: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records.cluster_role_bindings.remove(name).is_some())
    }
}
