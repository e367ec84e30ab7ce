//! URL path patterns
//!
//! Patterns are `/`-separated segments where `*` matches exactly one
//! segment and a trailing `**` matches zero or more segments:
//! - `/api/assets/v1/asset/` matches only itself
//! - `/api/assets/*/asset/**` matches every asset URL of any version
//! - `/**` matches everything
//!
//! Empty segments are ignored on both sides, so trailing slashes and
//! doubled separators do not affect matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur while parsing a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Pattern string is empty
    EmptyPattern,
    /// Wildcard mixed with other characters, e.g. `ass*`
    InvalidWildcard(String),
    /// `**` somewhere other than the last segment
    MisplacedRecursiveWildcard,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPattern => write!(f, "URL pattern cannot be empty"),
            Self::InvalidWildcard(seg) => write!(f, "Wildcards must be standalone: '{}'", seg),
            Self::MisplacedRecursiveWildcard => {
                write!(f, "Double wildcard '**' can only appear at the end")
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// A compiled URL path pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlPattern {
    raw: String,
    segments: Vec<String>,
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    // Query strings never take part in matching
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    path.split('/').filter(|s| !s.is_empty())
}

impl UrlPattern {
    pub fn new(s: &str) -> Result<Self, PatternError> {
        if s.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        let segments: Vec<String> = split_path(s).map(str::to_string).collect();

        for (idx, segment) in segments.iter().enumerate() {
            if segment.contains('*') && segment != "*" && segment != "**" {
                return Err(PatternError::InvalidWildcard(segment.clone()));
            }
            if segment == "**" && idx + 1 < segments.len() {
                return Err(PatternError::MisplacedRecursiveWildcard);
            }
        }

        Ok(Self {
            raw: s.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Checks whether a request path matches this pattern
    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split_path(path).collect();

        let (fixed, recursive) = match self.segments.split_last() {
            Some((last, rest)) if last == "**" => (rest, true),
            _ => (&self.segments[..], false),
        };

        if recursive {
            if path.len() < fixed.len() {
                return false;
            }
        } else if path.len() != fixed.len() {
            return false;
        }

        fixed
            .iter()
            .zip(path.iter())
            .all(|(pattern, segment)| pattern == "*" || pattern == segment)
    }
}

impl FromStr for UrlPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UrlPattern {
    type Error = PatternError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<UrlPattern> for String {
    fn from(pattern: UrlPattern) -> Self {
        pattern.raw
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
