//! Name types for timelines and reactors.
//!
//! Both names are plain strings under the hood. They are distinct types so
//! that a routing table keyed by timeline cannot accidentally be probed
//! with a reactor name. Names come from configuration and are stable for
//! the lifetime of an agent.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Name of a timeline.
///
/// A timeline is owned by exactly one reactor (its internal timeline) and
/// observed by any number of others (their external timelines). Equality
/// and hashing follow the underlying string.
///
/// # Example
///
/// ```
/// use reflex_types::TimelineName;
///
/// let tl = TimelineName::new("navigator");
/// assert_eq!(tl.as_str(), "navigator");
/// assert_eq!(tl.to_string(), "navigator");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimelineName(String);

impl TimelineName {
    /// Creates a timeline name from anything string-like.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimelineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TimelineName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TimelineName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for TimelineName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Name of a reactor, unique within one agent.
///
/// # Example
///
/// ```
/// use reflex_types::ReactorName;
///
/// let name = ReactorName::new("executive");
/// assert_eq!(name.as_str(), "executive");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactorName(String);

impl ReactorName {
    /// Creates a reactor name from anything string-like.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReactorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReactorName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ReactorName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for ReactorName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
