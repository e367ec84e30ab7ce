//! Roles and bindings
//!
//! A `Role` lives in one organization and can only be bound there. A
//! `ClusterRole` is organization independent and may additionally grant
//! plain URL patterns.

use bastion_core::OrgId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, Result};
use crate::types::{Principal, RuleId, Subject};

/// Longest accepted role or binding name
pub const MAX_NAME_LEN: usize = 128;

/// Validates a slug: unicode letters, digits, `_` and `-`
pub fn validate_slug(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AuthzError::InvalidInput("name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AuthzError::InvalidInput(format!(
            "name longer than {} characters",
            MAX_NAME_LEN
        )));
    }
    if let Some(c) = name.chars().find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '-')) {
        return Err(AuthzError::InvalidInput(format!(
            "name '{}' contains invalid character '{}'",
            name, c
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleId>,
    #[serde(default = "Utc::now")]
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub org_id: OrgId,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            date_created: Utc::now(),
            created_by: String::new(),
            org_id: OrgId::default(),
        }
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = RuleId>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }

    pub fn with_org(mut self, org_id: impl Into<OrgId>) -> Self {
        self.org_id = org_id.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_slug(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRole {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleId>,
    /// URL patterns granted in addition to the rules
    #[serde(default)]
    pub non_resource_urls: Vec<String>,
    #[serde(default = "Utc::now")]
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
}

impl ClusterRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            non_resource_urls: Vec::new(),
            date_created: Utc::now(),
            created_by: String::new(),
        }
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = RuleId>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }

    pub fn with_non_resource_urls<S: Into<String>>(mut self, urls: impl IntoIterator<Item = S>) -> Self {
        self.non_resource_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_slug(&self.name)
    }
}

/// Grants an organization role to subjects of that organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub name: String,
    /// Name of the bound [`Role`]
    pub role: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub org_id: OrgId,
}

impl RoleBinding {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            subjects: Vec::new(),
            org_id: OrgId::default(),
        }
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn with_org(mut self, org_id: impl Into<OrgId>) -> Self {
        self.org_id = org_id.into();
        self
    }

    pub fn applies_to(&self, principal: &Principal) -> bool {
        self.subjects.iter().any(|s| principal.is(s))
    }
}

/// Grants a cluster role in every organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRoleBinding {
    pub name: String,
    /// Name of the bound [`ClusterRole`]
    pub cluster_role: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl ClusterRoleBinding {
    pub fn new(name: impl Into<String>, cluster_role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster_role: cluster_role.into(),
            subjects: Vec::new(),
        }
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn applies_to(&self, principal: &Principal) -> bool {
        self.subjects.iter().any(|s| principal.is(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_validation() {
        assert!(validate_slug("asset-admin").is_ok());
        assert!(validate_slug("运维_01").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("has space").is_err());
        assert!(validate_slug("a/b").is_err());
        assert!(validate_slug(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_slug(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_binding_subjects() {
        let binding = RoleBinding::new("ops-binding", "ops")
            .with_subject(Subject::user("alice"))
            .with_subject(Subject::group("sre"));

        assert!(binding.applies_to(&Principal::new("alice")));
        assert!(binding.applies_to(&Principal::new("bob").with_group("sre")));
        assert!(!binding.applies_to(&Principal::new("bob")));
    }

    #[test]
    fn test_cluster_role_deserialize() {
        let role: ClusterRole = serde_json::from_str(
            r#"{"name": "viewer", "rules": [1, 2], "non_resource_urls": ["/health"]}"#,
        )
        .unwrap();
        assert_eq!(role.rules, vec![1, 2]);
        assert_eq!(role.non_resource_urls, vec!["/health".to_string()]);
        assert!(role.created_by.is_empty());
    }
}
