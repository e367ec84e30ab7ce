//! Integration tests for the RBAC engine
//!
//! Tests organization scoping, group subjects, cluster roles with
//! non-resource URLs, and HTTP request derivation end to end.

use bastion_authz::{
    AccessRequest, AuthzError, ClusterRole, ClusterRoleBinding, InMemoryRbacStore, Principal,
    RbacEngine, RbacStore, Role, RoleBinding, Rule, Subject, Verb,
};
use bastion_core::OrgId;
use std::sync::Arc;

/// Two organizations with their own viewer roles plus a cluster-wide
/// auditor role
async fn setup() -> RbacEngine {
    let engine = RbacEngine::new(Arc::new(InMemoryRbacStore::new()));

    engine
        .put_rule(
            Rule::new(1)
                .with_verbs([Verb::List, Verb::Retrieve])
                .with_api_groups(["assets"])
                .with_resources(["assets"]),
        )
        .await
        .unwrap();
    engine
        .put_rule(
            Rule::new(2)
                .with_verbs([Verb::All])
                .with_api_groups(["assets"])
                .with_resources(["assets"])
                .with_resource_ids(["7"]),
        )
        .await
        .unwrap();
    engine
        .put_rule(Rule::new(3).with_non_resource_urls(["/api/assets/v1/assets/sync/"]))
        .await
        .unwrap();

    engine
        .put_role(Role::new("acme-viewer").with_org("acme").with_rules([1]))
        .await
        .unwrap();
    engine
        .put_role(Role::new("globex-owner").with_org("globex").with_rules([2]))
        .await
        .unwrap();
    engine
        .put_cluster_role(
            ClusterRole::new("auditor")
                .with_rules([3])
                .with_non_resource_urls(["/api-docs/**"]),
        )
        .await
        .unwrap();

    engine
        .put_role_binding(
            RoleBinding::new("acme-ops", "acme-viewer")
                .with_org("acme")
                .with_subject(Subject::group("ops")),
        )
        .await
        .unwrap();
    engine
        .put_role_binding(
            RoleBinding::new("globex-alice", "globex-owner")
                .with_org("globex")
                .with_subject(Subject::user("alice")),
        )
        .await
        .unwrap();
    engine
        .put_cluster_role_binding(
            ClusterRoleBinding::new("auditors", "auditor").with_subject(Subject::user("carol")),
        )
        .await
        .unwrap();

    engine
}

async fn allowed(engine: &RbacEngine, principal: Principal, org: &str, method: &str, path: &str) -> bool {
    let request = AccessRequest::from_http(principal, OrgId::from(org), method, path);
    engine.authorize(&request).await.unwrap().allowed
}

#[tokio::test]
async fn test_group_binding_scoped_to_organization() {
    let engine = setup().await;
    let bob = || Principal::new("bob").with_group("ops");

    assert!(allowed(&engine, bob(), "acme", "GET", "/api/assets/v1/assets/").await);
    assert!(allowed(&engine, bob(), "acme", "GET", "/api/assets/v1/assets/3/").await);
    assert!(!allowed(&engine, bob(), "acme", "DELETE", "/api/assets/v1/assets/3/").await);
    assert!(!allowed(&engine, bob(), "globex", "GET", "/api/assets/v1/assets/").await);
    assert!(!allowed(&engine, Principal::new("bob"), "acme", "GET", "/api/assets/v1/assets/").await);
}

#[tokio::test]
async fn test_resource_id_narrowing() {
    let engine = setup().await;
    let alice = || Principal::new("alice");

    assert!(allowed(&engine, alice(), "globex", "DELETE", "/api/assets/v1/assets/7/").await);
    assert!(allowed(&engine, alice(), "globex", "GET", "/api/assets/v1/assets/7/alive/").await);
    assert!(!allowed(&engine, alice(), "globex", "GET", "/api/assets/v1/assets/8/").await);
    assert!(!allowed(&engine, alice(), "globex", "GET", "/api/assets/v1/assets/").await);
}

#[tokio::test]
async fn test_cluster_role_non_resource_urls() {
    let engine = setup().await;
    let carol = || Principal::new("carol");

    for org in ["acme", "globex", ""] {
        assert!(allowed(&engine, carol(), org, "GET", "/api-docs/openapi.json").await);
    }
    assert!(!allowed(&engine, carol(), "acme", "GET", "/api/assets/v1/assets/").await);
}

#[tokio::test]
async fn test_sync_path_is_collection_request() {
    let engine = setup().await;

    // Rule 3 only carries a URL, so the resource request is not granted by it
    let request = AccessRequest::from_http(
        Principal::new("carol"),
        OrgId::default(),
        "GET",
        "/api/assets/v1/assets/sync/",
    );
    assert!(!engine.authorize(&request).await.unwrap().allowed);

    let request = AccessRequest::non_resource(
        Principal::new("carol"),
        OrgId::default(),
        "/api/assets/v1/assets/sync/",
    );
    assert!(engine.authorize(&request).await.unwrap().allowed);
}

#[tokio::test]
async fn test_rules_for_principal() {
    let engine = setup().await;
    let rules = engine
        .rules_for(&Principal::new("alice").with_group("ops"), &OrgId::from("acme"))
        .await
        .unwrap();
    let ids: Vec<u64> = rules.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1]);
}

#[tokio::test]
async fn test_deleted_role_stops_granting() {
    let engine = setup().await;
    let bob = || Principal::new("bob").with_group("ops");
    assert!(allowed(&engine, bob(), "acme", "GET", "/api/assets/v1/assets/").await);

    assert!(tokio_test::assert_ok!(engine.delete_role("acme-viewer").await));
    assert!(!allowed(&engine, bob(), "acme", "GET", "/api/assets/v1/assets/").await);
}

#[tokio::test]
async fn test_direct_store_writes_need_invalidation() {
    let engine = setup().await;
    let dave = || Principal::new("dave");
    assert!(!allowed(&engine, dave(), "", "GET", "/api-docs/").await);

    engine
        .store()
        .put_cluster_role_binding(ClusterRoleBinding::new("dave", "auditor").with_subject(Subject::user("dave")))
        .await
        .unwrap();
    assert!(!allowed(&engine, dave(), "", "GET", "/api-docs/").await);

    engine.invalidate_cache().await;
    assert!(allowed(&engine, dave(), "", "GET", "/api-docs/").await);
}

#[tokio::test]
async fn test_binding_to_foreign_role_rejected() {
    let engine = setup().await;
    let err = engine
        .put_role_binding(RoleBinding::new("sneaky", "globex-owner").with_org("acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::InvalidInput(_)));
}
