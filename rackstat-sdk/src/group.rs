use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static GROUP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]{2}[0-9]{2})").expect("group pattern must compile"));

/// Rack code such as `RC10`, derived from a node or host name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    /// Wraps a configured group name as-is.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Extracts the two-letter, two-digit prefix of a node name, upper-cased.
    ///
    /// Empty and non-matching names yield `None`; they are never coerced into a group.
    pub fn from_node(node: &str) -> Option<Self> {
        GROUP_PATTERN
            .captures(node)
            .and_then(|captures| captures.get(1))
            .map(|m| Self(m.as_str().to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form used as the placeholder key prefix.
    pub fn placeholder_prefix(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-group accumulator shared by the listing passes. Iterates in ascending key order.
#[derive(Debug, Clone)]
pub struct GroupTotals<T> {
    groups: BTreeMap<GroupKey, T>,
}

impl<T> Default for GroupTotals<T> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<T: Default> GroupTotals<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, key: GroupKey) -> &mut T {
        self.groups.entry(key).or_default()
    }
}

impl<T> GroupTotals<T> {
    pub fn get(&self, key: &GroupKey) -> Option<&T> {
        self.groups.get(key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, GroupKey, T> {
        self.groups.iter()
    }
}

impl<T> IntoIterator for GroupTotals<T> {
    type Item = (GroupKey, T);
    type IntoIter = btree_map::IntoIter<GroupKey, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}
