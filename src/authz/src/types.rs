//! Core RBAC types: verbs, subjects and principals

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;

/// Rule identifier
pub type RuleId = u64;

/// Operation a rule may grant
///
/// `*` in a rule's verb list grants every verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    List,
    Retrieve,
    Create,
    Update,
    Patch,
    Delete,
    #[serde(rename = "*")]
    All,
}

impl Verb {
    /// Whether a rule carrying `self` grants `requested`
    pub fn covers(&self, requested: Verb) -> bool {
        *self == Verb::All || *self == requested
    }

    /// Maps an HTTP method onto the verb it performs
    ///
    /// `GET` and `HEAD` mean `retrieve` on a single object and `list` on a
    /// collection. Methods that do not touch resources map to `None`.
    pub fn from_method(method: &str, has_id: bool) -> Option<Verb> {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" if has_id => Some(Verb::Retrieve),
            "GET" | "HEAD" => Some(Verb::List),
            "POST" => Some(Verb::Create),
            "PUT" => Some(Verb::Update),
            "PATCH" => Some(Verb::Patch),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::List => "list",
            Verb::Retrieve => "retrieve",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
            Verb::All => "*",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Verb::List),
            "retrieve" => Ok(Verb::Retrieve),
            "create" => Ok(Verb::Create),
            "update" => Ok(Verb::Update),
            "patch" => Ok(Verb::Patch),
            "delete" => Ok(Verb::Delete),
            "*" => Ok(Verb::All),
            other => Err(AuthzError::InvalidInput(format!("unknown verb '{}'", other))),
        }
    }
}

/// Who a binding applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Subject {
    User(String),
    Group(String),
}

impl Subject {
    pub fn user(name: impl Into<String>) -> Self {
        Subject::User(name.into())
    }

    pub fn group(name: impl Into<String>) -> Self {
        Subject::Group(name.into())
    }
}

/// Authenticated caller: a user name plus the groups it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub user: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Principal {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// True when the subject names this user or one of its groups
    pub fn is(&self, subject: &Subject) -> bool {
        match subject {
            Subject::User(name) => *name == self.user,
            Subject::Group(name) => self.groups.iter().any(|g| g == name),
        }
    }
}
