//! Server identifiers and the run-scoped id map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to a resource by the remote service.
///
/// Opaque to the engine: it is only stored, compared, and substituted into
/// later resources' properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic stand-in used by dry runs for resources that do not exist yet.
    pub fn placeholder(resource_type: &str, id_reference: &str) -> Self {
        Self(format!("{PLACEHOLDER_PREFIX}{resource_type}:{id_reference}"))
    }

    /// Whether this id was synthesized by a dry run.
    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

const PLACEHOLDER_PREFIX: &str = "dry-run:";

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ServerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ServerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Mapping from `id_reference` to the server id produced for it.
///
/// One map is built per provisioning run and handed back to the caller in
/// the outcome; the engine never keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    entries: IndexMap<String, ServerId>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the server id recorded for an `id_reference`.
    pub fn get(&self, id_reference: &str) -> Option<&ServerId> {
        self.entries.get(id_reference)
    }

    pub fn contains(&self, id_reference: &str) -> bool {
        self.entries.contains_key(id_reference)
    }

    /// Record the server id for an `id_reference`, returning the previous one.
    pub fn insert(&mut self, id_reference: impl Into<String>, id: ServerId) -> Option<ServerId> {
        self.entries.insert(id_reference.into(), id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServerId)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ServerId)> for IdMap {
    fn from_iter<I: IntoIterator<Item = (K, ServerId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_deterministic() {
        let a = ServerId::placeholder("system", "sys1");
        let b = ServerId::placeholder("system", "sys1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "dry-run:system:sys1");
        assert!(a.is_placeholder());
        assert!(!ServerId::new("srv-1").is_placeholder());
    }

    #[test]
    fn id_map_keeps_insertion_order() {
        let mut ids = IdMap::new();
        ids.insert("b", ServerId::new("2"));
        ids.insert("a", ServerId::new("1"));
        let keys: Vec<&str> = ids.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(ids.get("a"), Some(&ServerId::new("1")));
        assert!(!ids.contains("c"));
    }

    #[test]
    fn server_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ServerId::new("srv-loc-1")).unwrap();
        assert_eq!(json, "\"srv-loc-1\"");
    }
}
