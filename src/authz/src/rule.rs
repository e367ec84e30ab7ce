//! Authorization rules and the rule resolver
//!
//! A rule grants a set of verbs on resources of some apps, optionally
//! narrowed to specific resource ids. Rules only ever add permissions:
//! a request is granted when any rule grants it and denied otherwise.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pattern::UrlPattern;
use crate::types::{RuleId, Verb};

/// Wildcard accepted in `api_groups` and `resources`
pub const ANY: &str = "*";

/// A single grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,

    #[serde(default)]
    pub verbs: Vec<Verb>,

    /// Apps the rule covers
    #[serde(default)]
    pub api_groups: Vec<String>,

    #[serde(default)]
    pub resources: Vec<String>,

    /// Resource ids the rule is narrowed to; empty covers every id
    #[serde(default)]
    pub resource_ids: Vec<String>,

    /// URL patterns granted regardless of verbs and resources
    #[serde(default)]
    pub non_resource_urls: Vec<String>,
}

fn listed(values: &[String], wanted: &str) -> bool {
    values.iter().any(|v| v == ANY || v == wanted)
}

impl Rule {
    pub fn new(id: RuleId) -> Self {
        Self {
            id,
            verbs: Vec::new(),
            api_groups: Vec::new(),
            resources: Vec::new(),
            resource_ids: Vec::new(),
            non_resource_urls: Vec::new(),
        }
    }

    pub fn with_verbs(mut self, verbs: impl IntoIterator<Item = Verb>) -> Self {
        self.verbs = verbs.into_iter().collect();
        self
    }

    pub fn with_api_groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        self.api_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resources<S: Into<String>>(mut self, resources: impl IntoIterator<Item = S>) -> Self {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resource_ids<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.resource_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_non_resource_urls<S: Into<String>>(mut self, urls: impl IntoIterator<Item = S>) -> Self {
        self.non_resource_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this rule alone grants `verb` on the given resource
    ///
    /// A request without a resource id (list, create) is only granted by
    /// rules that are not narrowed to specific ids.
    pub fn grants(&self, app: &str, resource: &str, resource_id: Option<&str>, verb: Verb) -> bool {
        let verb_ok = self.verbs.iter().any(|v| v.covers(verb));
        let id_ok = self.resource_ids.is_empty()
            || resource_id.map_or(false, |id| self.resource_ids.iter().any(|r| r == id));

        verb_ok && listed(&self.api_groups, app) && listed(&self.resources, resource) && id_ok
    }

    /// Expands the rule into the URL patterns it grants
    ///
    /// Every app/resource pair yields `/api/{app}/*/{resource}/**`, or one
    /// `/api/{app}/*/{resource}/{id}/**` per id when the rule is narrowed.
    /// The API version is always a single-segment wildcard. Non-resource
    /// URLs are appended as written. Entries that do not form a valid
    /// pattern are skipped.
    pub fn to_patterns(&self) -> Vec<UrlPattern> {
        let mut raw = Vec::new();

        for app in &self.api_groups {
            for resource in &self.resources {
                if self.resource_ids.is_empty() {
                    raw.push(format!("/api/{}/*/{}/**", app, resource));
                } else {
                    for id in &self.resource_ids {
                        raw.push(format!("/api/{}/*/{}/{}/**", app, resource, id));
                    }
                }
            }
        }
        raw.extend(self.non_resource_urls.iter().cloned());

        raw.into_iter()
            .filter_map(|p| match UrlPattern::new(&p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(rule = self.id, pattern = %p, error = %e, "Skipping invalid rule pattern");
                    None
                }
            })
            .collect()
    }
}

/// Whether any rule grants `verb` on the resource; an empty set denies
///
/// # Examples
///
/// ```
/// use bastion_authz::{authorize, Rule, Verb};
///
/// let rules = vec![Rule::new(1)
///     .with_verbs([Verb::List])
///     .with_api_groups(["assets"])
///     .with_resources(["asset"])];
///
/// assert!(authorize(&rules, "assets", "asset", Some("42"), Verb::List));
/// assert!(!authorize(&rules, "assets", "asset", Some("42"), Verb::Delete));
/// ```
pub fn authorize(
    rules: &[Rule],
    app: &str,
    resource: &str,
    resource_id: Option<&str>,
    verb: Verb,
) -> bool {
    let granted = rules.iter().find(|r| r.grants(app, resource, resource_id, verb));
    debug!(
        app,
        resource,
        resource_id,
        verb = %verb,
        rule = granted.map(|r| r.id),
        "Resolved resource access"
    );
    granted.is_some()
}

/// Whether any rule's URL patterns match `path`
pub fn authorize_url(rules: &[Rule], path: &str) -> bool {
    rules
        .iter()
        .any(|rule| rule.to_patterns().iter().any(|p| p.matches(path)))
}
