//! Organization scope shared by the asset inventory and RBAC crates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Organization identifier
///
/// The empty string is the default organization, which is where records
/// land when no organization is supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(String);

impl OrgId {
    /// Maximum length of an organization id
    pub const MAX_LEN: usize = 36;

    /// Create a new organization id
    pub fn new<S: Into<String>>(id: S) -> Self {
        OrgId(id.into())
    }

    /// The default organization
    pub fn default_org() -> Self {
        OrgId(String::new())
    }

    /// Whether this is the default organization
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the organization id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            write!(f, "DEFAULT")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<String> for OrgId {
    fn from(s: String) -> Self {
        OrgId(s)
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        OrgId(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_org() {
        let org = OrgId::default();
        assert!(org.is_default());
        assert_eq!(org, OrgId::default_org());
        assert_eq!(org.to_string(), "DEFAULT");
    }

    #[test]
    fn test_org_serializes_as_plain_string() {
        let org = OrgId::from("acme");
        assert_eq!(serde_json::to_string(&org).unwrap(), "\"acme\"");

        let parsed: OrgId = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(parsed, org);
        assert!(!parsed.is_default());
    }
}
