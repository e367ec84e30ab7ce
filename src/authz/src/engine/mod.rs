//! RBAC engine
//!
//! Resolves the roles bound to a principal, collects their rules and
//! applies the rule resolver, with an LRU cache in front.

pub mod cache;
pub mod decision;

pub use cache::{CacheStats, DecisionCache};
pub use decision::{AccessDecision, AccessRequest, AccessTarget};

use bastion_core::OrgId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pattern::UrlPattern;
use crate::role::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use crate::rule::{self, Rule};
use crate::store::RbacStore;
use crate::types::{Principal, RuleId};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cache decisions until the next write
    pub enable_cache: bool,

    /// Maximum number of cached decisions
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_capacity: cache::DEFAULT_CAPACITY,
        }
    }
}

/// A role reachable from a principal, with its rules loaded
#[derive(Debug, Clone)]
pub struct BoundRole {
    pub name: String,
    pub rules: Vec<Rule>,
    /// Extra URL grants of cluster roles
    pub urls: Vec<UrlPattern>,
}

impl BoundRole {
    fn grants(&self, request: &AccessRequest) -> bool {
        match &request.target {
            AccessTarget::Resource {
                app,
                resource,
                resource_id,
                verb,
            } => rule::authorize(&self.rules, app, resource, resource_id.as_deref(), *verb),
            AccessTarget::NonResource { path } => {
                rule::authorize_url(&self.rules, path) || self.urls.iter().any(|p| p.matches(path))
            }
        }
    }
}

/// RBAC engine over a shared store
///
/// Writes made through the engine clear the decision cache. Writes made
/// directly on the store are only seen once [`RbacEngine::invalidate_cache`]
/// runs.
pub struct RbacEngine {
    store: Arc<dyn RbacStore>,
    cache: Option<DecisionCache>,
}

impl RbacEngine {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn RbacStore>, config: EngineConfig) -> Self {
        let cache = config
            .enable_cache
            .then(|| DecisionCache::new(config.cache_capacity));

        info!(
            cache = config.enable_cache,
            capacity = config.cache_capacity,
            "RBAC engine initialized"
        );

        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<dyn RbacStore> {
        &self.store
    }

    /// Decides a request; principals without a granting role are denied
    pub async fn authorize(&self, request: &AccessRequest) -> Result<AccessDecision> {
        let generation = self.cache.as_ref().map(DecisionCache::generation);
        if let Some(cache) = &self.cache {
            if let Some(decision) = cache.get(request).await {
                debug!(user = %request.principal.user, "Cache hit for access request");
                return Ok(decision);
            }
        }

        let roles = self.bound_roles(&request.principal, &request.org_id).await?;
        let decision = match roles.iter().find(|role| role.grants(request)) {
            Some(role) => AccessDecision::allow(
                role.name.clone(),
                format!("Role '{}' grants this request", role.name),
            ),
            None if roles.is_empty() => AccessDecision::deny("No roles bound to principal"),
            None => AccessDecision::deny(format!("None of {} bound roles grant this request", roles.len())),
        };

        if decision.allowed {
            debug!(
                user = %request.principal.user,
                role = ?decision.matched_role,
                "Access granted"
            );
        } else {
            warn!(
                user = %request.principal.user,
                org = %request.org_id,
                target = ?request.target,
                "Access denied"
            );
        }

        if let (Some(cache), Some(generation)) = (&self.cache, generation) {
            if !cache.put(request.clone(), decision.clone(), generation).await {
                debug!(user = %request.principal.user, "Policy changed during evaluation, decision not cached");
            }
        }

        Ok(decision)
    }

    /// Roles bound to the principal, cluster roles first
    ///
    /// Bindings that point at missing roles are skipped.
    pub async fn bound_roles(&self, principal: &Principal, org: &OrgId) -> Result<Vec<BoundRole>> {
        let mut bound = Vec::new();

        for binding in self.store.list_cluster_role_bindings().await? {
            if !binding.applies_to(principal) {
                continue;
            }
            let Some(role) = self.store.get_cluster_role(&binding.cluster_role).await? else {
                debug!(binding = %binding.name, "Cluster role binding points at a missing role");
                continue;
            };
            let urls = role
                .non_resource_urls
                .iter()
                .filter_map(|u| UrlPattern::new(u).ok())
                .collect();
            bound.push(BoundRole {
                rules: self.load_rules(&role.rules).await?,
                name: role.name,
                urls,
            });
        }

        for binding in self.store.list_role_bindings(org).await? {
            if !binding.applies_to(principal) {
                continue;
            }
            let role = match self.store.get_role(&binding.role).await? {
                Some(role) if &role.org_id == org => role,
                _ => {
                    debug!(binding = %binding.name, "Role binding points at a missing role");
                    continue;
                }
            };
            bound.push(BoundRole {
                rules: self.load_rules(&role.rules).await?,
                name: role.name,
                urls: Vec::new(),
            });
        }

        Ok(bound)
    }

    /// Every rule reachable from the principal in the organization
    pub async fn rules_for(&self, principal: &Principal, org: &OrgId) -> Result<Vec<Rule>> {
        let mut rules: Vec<Rule> = Vec::new();
        for role in self.bound_roles(principal, org).await? {
            for rule in role.rules {
                if !rules.iter().any(|r| r.id == rule.id) {
                    rules.push(rule);
                }
            }
        }
        Ok(rules)
    }

    async fn load_rules(&self, ids: &[RuleId]) -> Result<Vec<Rule>> {
        let mut rules = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(rule) = self.store.get_rule(*id).await? {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    /// Drops all cached decisions
    pub async fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
            debug!("Decision cache invalidated");
        }
    }

    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    pub async fn put_rule(&self, rule: Rule) -> Result<()> {
        self.store.put_rule(rule).await?;
        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn delete_rule(&self, id: RuleId) -> Result<bool> {
        let deleted = self.store.delete_rule(id).await?;
        self.invalidate_cache().await;
        Ok(deleted)
    }

    pub async fn put_role(&self, role: Role) -> Result<()> {
        self.store.put_role(role).await?;
        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn delete_role(&self, name: &str) -> Result<bool> {
        let deleted = self.store.delete_role(name).await?;
        self.invalidate_cache().await;
        Ok(deleted)
    }

    pub async fn put_cluster_role(&self, role: ClusterRole) -> Result<()> {
        self.store.put_cluster_role(role).await?;
        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn delete_cluster_role(&self, name: &str) -> Result<bool> {
        let deleted = self.store.delete_cluster_role(name).await?;
        self.invalidate_cache().await;
        Ok(deleted)
    }

    pub async fn put_role_binding(&self, binding: RoleBinding) -> Result<()> {
        self.store.put_role_binding(binding).await?;
        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn delete_role_binding(&self, name: &str) -> Result<bool> {
        let deleted = self.store.delete_role_binding(name).await?;
        self.invalidate_cache().await;
        Ok(deleted)
    }

    pub async fn put_cluster_role_binding(&self, binding: ClusterRoleBinding) -> Result<()> {
        self.store.put_cluster_role_binding(binding).await?;
        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn delete_cluster_role_binding(&self, name: &str) -> Result<bool> {
        let deleted = self.store.delete_cluster_role_binding(name).await?;
        self.invalidate_cache().await;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRbacStore;
    use crate::types::{Subject, Verb};

    async fn engine() -> RbacEngine {
        let engine = RbacEngine::new(Arc::new(InMemoryRbacStore::new()));
        engine
            .put_rule(
                Rule::new(1)
                    .with_verbs([Verb::List, Verb::Retrieve])
                    .with_api_groups(["assets"])
                    .with_resources(["asset"]),
            )
            .await
            .unwrap();
        engine.put_role(Role::new("viewer").with_rules([1])).await.unwrap();
        engine
            .put_role_binding(RoleBinding::new("viewers", "viewer").with_subject(Subject::user("alice")))
            .await
            .unwrap();
        engine
    }

    fn list(user: &str) -> AccessRequest {
        AccessRequest::resource(Principal::new(user), OrgId::default(), "assets", "asset", None, Verb::List)
    }

    #[tokio::test]
    async fn test_bound_user_allowed() {
        let engine = engine().await;
        let decision = engine.authorize(&list("alice")).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.matched_role.as_deref(), Some("viewer"));
    }

    #[tokio::test]
    async fn test_unbound_user_denied() {
        let engine = engine().await;
        let decision = engine.authorize(&list("mallory")).await.unwrap();
        assert!(!decision.allowed);
        assert!(decision.matched_role.is_none());
    }

    #[tokio::test]
    async fn test_writes_invalidate_cache() {
        let engine = engine().await;
        assert!(!engine.authorize(&list("bob")).await.unwrap().allowed);

        engine
            .put_role_binding(RoleBinding::new("bob-viewer", "viewer").with_subject(Subject::user("bob")))
            .await
            .unwrap();
        assert!(engine.authorize(&list("bob")).await.unwrap().allowed);

        assert!(engine.delete_role_binding("bob-viewer").await.unwrap());
        assert!(!engine.authorize(&list("bob")).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_revocation_during_evaluation_is_not_cached() {
        let engine = engine().await;
        let cache = engine.cache.as_ref().unwrap();

        // Evaluation starts, then the binding is revoked before its
        // decision reaches the cache
        let generation = cache.generation();
        let roles = engine.bound_roles(&Principal::new("alice"), &OrgId::default()).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert!(engine.delete_role_binding("viewers").await.unwrap());

        let stale = AccessDecision::allow("viewer", "granted before revocation");
        assert!(!cache.put(list("alice"), stale, generation).await);
        assert!(!engine.authorize(&list("alice")).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_cache_hits() {
        let engine = engine().await;
        engine.authorize(&list("alice")).await.unwrap();
        engine.authorize(&list("alice")).await.unwrap();

        let stats = engine.cache_stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let engine = RbacEngine::with_config(
            Arc::new(InMemoryRbacStore::new()),
            EngineConfig {
                enable_cache: false,
                ..Default::default()
            },
        );
        assert!(!engine.authorize(&list("alice")).await.unwrap().allowed);
        assert!(engine.cache_stats().await.is_none());
    }
}
