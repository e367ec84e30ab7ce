//! Materialized-path node keys
//!
//! A node key is a colon-separated chain of numeric segments, one per
//! ancestor: `1` is a root, `1:4` its child, `1:4:9` a grandchild.
//! Ancestor and descendant tests are plain segment-prefix comparisons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur while parsing a node key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKeyError {
    /// Empty key string provided
    EmptyKey,
    /// Key segment is empty (e.g. `1::2`)
    EmptySegment,
    /// Key segment is not made of ASCII digits
    InvalidSegment(String),
}

impl fmt::Display for NodeKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "Node key cannot be empty"),
            Self::EmptySegment => write!(f, "Node key segment cannot be empty"),
            Self::InvalidSegment(seg) => write!(f, "Node key segment must be numeric: '{}'", seg),
        }
    }
}

impl std::error::Error for NodeKeyError {}

/// Materialized path of a node
///
/// # Examples
///
/// ```
/// use bastion_assets::NodeKey;
///
/// let key = NodeKey::new("1:2:3").unwrap();
/// assert_eq!(key.depth(), 3);
/// assert!(NodeKey::new("1").unwrap().is_ancestor_of(&key));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeKey {
    /// Original key string
    raw: String,
    /// Parsed segments
    segments: Vec<String>,
}

impl NodeKey {
    /// Parses a key from its string form
    pub fn new(s: &str) -> Result<Self, NodeKeyError> {
        if s.is_empty() {
            return Err(NodeKeyError::EmptyKey);
        }

        let segments: Vec<String> = s.split(':').map(|s| s.to_string()).collect();

        for segment in &segments {
            if segment.is_empty() {
                return Err(NodeKeyError::EmptySegment);
            }
            if !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(NodeKeyError::InvalidSegment(segment.clone()));
            }
        }

        Ok(Self {
            raw: s.to_string(),
            segments,
        })
    }

    /// Returns the segments of this key
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the raw key string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of segments; roots have depth 1
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// A key without a parent segment is a root
    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// Returns the parent key if it exists
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }

        let segments = self.segments[..self.segments.len() - 1].to_vec();
        Some(Self {
            raw: segments.join(":"),
            segments,
        })
    }

    /// Key of the `n`-th child of this node
    pub fn child(&self, n: u64) -> Self {
        let mut segments = self.segments.clone();
        segments.push(n.to_string());
        Self {
            raw: format!("{}:{}", self.raw, n),
            segments,
        }
    }

    /// Checks if this key is a strict ancestor of another key
    pub fn is_ancestor_of(&self, other: &NodeKey) -> bool {
        self.segments.len() < other.segments.len() && self.is_prefix_of(other)
    }

    /// Checks if this key is a strict descendant of another key
    pub fn is_descendant_of(&self, other: &NodeKey) -> bool {
        other.is_ancestor_of(self)
    }

    /// True when `other` is this key or lies anywhere beneath it
    pub fn contains(&self, other: &NodeKey) -> bool {
        self.segments.len() <= other.segments.len() && self.is_prefix_of(other)
    }

    fn is_prefix_of(&self, other: &NodeKey) -> bool {
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| a == b)
    }
}

impl FromStr for NodeKey {
    type Err = NodeKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for NodeKey {
    type Error = NodeKeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<NodeKey> for String {
    fn from(key: NodeKey) -> Self {
        key.raw
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_creation() {
        let key = NodeKey::new("1:2:3").unwrap();
        assert_eq!(key.segments().len(), 3);
        assert_eq!(key.as_str(), "1:2:3");
        assert!(!key.is_root());
        assert!(NodeKey::new("5").unwrap().is_root());
    }

    #[test]
    fn test_invalid_keys() {
        assert_eq!(NodeKey::new(""), Err(NodeKeyError::EmptyKey));
        assert_eq!(NodeKey::new("1::2"), Err(NodeKeyError::EmptySegment));
        assert_eq!(NodeKey::new("1:2:"), Err(NodeKeyError::EmptySegment));
        assert!(matches!(NodeKey::new("1:a"), Err(NodeKeyError::InvalidSegment(_))));
        assert!(matches!(NodeKey::new("1:2.*"), Err(NodeKeyError::InvalidSegment(_))));
    }

    #[test]
    fn test_parent_and_child() {
        let key = NodeKey::new("1:2:3").unwrap();
        let parent = key.parent().unwrap();
        assert_eq!(parent.as_str(), "1:2");
        assert_eq!(parent.child(3), key);
        assert!(parent.parent().unwrap().parent().is_none());
    }

    #[test]
    fn test_ancestry() {
        let root = NodeKey::new("1").unwrap();
        let child = NodeKey::new("1:2").unwrap();
        let sibling_prefix = NodeKey::new("12").unwrap();

        assert!(root.is_ancestor_of(&child));
        assert!(child.is_descendant_of(&root));
        assert!(!root.is_ancestor_of(&root));
        assert!(root.contains(&root));
        // Prefix comparison is per segment, not per character
        assert!(!root.contains(&sibling_prefix));
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let key: NodeKey = serde_json::from_str("\"1:4\"").unwrap();
        assert_eq!(key.depth(), 2);
        assert!(serde_json::from_str::<NodeKey>("\"1:x\"").is_err());
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"1:4\"");
    }
}
