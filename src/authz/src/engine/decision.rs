//! Access requests and decisions

use bastion_core::OrgId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

use crate::types::{Principal, Verb};

/// What a request touches
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessTarget {
    /// A REST resource, addressed by app, resource name and optional id
    Resource {
        app: String,
        resource: String,
        resource_id: Option<String>,
        verb: Verb,
    },
    /// Any other URL
    NonResource { path: String },
}

/// Authorization request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessRequest {
    pub principal: Principal,

    /// Organization the request acts in
    #[serde(default)]
    pub org_id: OrgId,

    pub target: AccessTarget,
}

/// Collection-level actions such as `sync` are plain lowercase words.
/// Any other segment after the resource, including malformed ones, is
/// treated as a resource id.
fn is_collection_action(segment: &str) -> bool {
    !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_lowercase() || b == b'_' || b == b'-')
        && Uuid::parse_str(segment).is_err()
}

/// Decodes a path segment the way the router's extractors do; segments
/// that do not decode to UTF-8 are kept as sent.
fn decode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

impl AccessRequest {
    pub fn resource(
        principal: Principal,
        org_id: OrgId,
        app: impl Into<String>,
        resource: impl Into<String>,
        resource_id: Option<String>,
        verb: Verb,
    ) -> Self {
        Self {
            principal,
            org_id,
            target: AccessTarget::Resource {
                app: app.into(),
                resource: resource.into(),
                resource_id,
                verb,
            },
        }
    }

    pub fn non_resource(principal: Principal, org_id: OrgId, path: impl Into<String>) -> Self {
        Self {
            principal,
            org_id,
            target: AccessTarget::NonResource { path: path.into() },
        }
    }

    /// Derives the request from an HTTP method and path
    ///
    /// Paths of the form `/api/{app}/{version}/{resource}/[{id}/][{action}/]`
    /// become resource requests; the verb follows the method and whether
    /// an id is present. Everything else, including methods that map to
    /// no verb, is a non-resource request on the path.
    pub fn from_http(principal: Principal, org_id: OrgId, method: &str, path: &str) -> Self {
        let clean = path.split_once('?').map_or(path, |(p, _)| p);
        let segments: Vec<Cow<'_, str>> = clean
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_segment)
            .collect();
        let segments: Vec<&str> = segments.iter().map(|s| s.as_ref()).collect();

        if let ["api", app, _version, resource, rest @ ..] = segments.as_slice() {
            let resource_id = rest
                .first()
                .filter(|s| !is_collection_action(s))
                .map(|s| s.to_string());
            if let Some(verb) = Verb::from_method(method, resource_id.is_some()) {
                return Self::resource(principal, org_id, *app, *resource, resource_id, verb);
            }
        }

        Self::non_resource(principal, org_id, clean)
    }
}

/// Authorization decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,

    /// Role whose rules granted access
    pub matched_role: Option<String>,

    pub reason: String,

    pub evaluated_at: DateTime<Utc>,
}

impl AccessDecision {
    pub fn allow(role: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            matched_role: Some(role.into()),
            reason: reason.into(),
            evaluated_at: Utc::now(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            matched_role: None,
            reason: reason.into(),
            evaluated_at: Utc::now(),
        }
    }
}
