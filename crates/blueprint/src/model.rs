//! Validated configuration model.
//!
//! These types are only produced by the [`loader`](crate::loader) after a
//! document has passed schema validation, and are immutable afterwards.

use crate::template::Properties;
use std::collections::BTreeSet;

/// Format versions this engine understands.
pub const SUPPORTED_FORMAT_VERSIONS: &[u32] = &[1];

/// Prefix of the tag every created resource carries, followed by the config name.
pub const EXAMPLE_TAG_PREFIX: &str = "example:";

/// A loaded example configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub format_version: u32,
    /// Unique configuration name
    pub name: String,
    /// Human-readable title (defaults to the name)
    pub title: String,
    pub description: Option<String>,
    /// Resources in declaration order; order is the dependency order
    pub resources: Vec<ResourceDefinition>,
    pub cleanup: CleanupSpec,
}

impl Configuration {
    /// Derived tag applied server-side to everything this configuration creates.
    pub fn example_tag(&self) -> String {
        format!("{EXAMPLE_TAG_PREFIX}{}", self.name)
    }

    /// Find a resource by its `id_reference`.
    pub fn resource(&self, id_reference: &str) -> Option<&ResourceDefinition> {
        self.resources
            .iter()
            .find(|r| r.id_reference == id_reference)
    }

    /// Resources of one type, in declaration order.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ResourceDefinition> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// Distinct resource types, in order of first appearance.
    pub fn resource_types(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for resource in &self.resources {
            if !seen.contains(&resource.resource_type.as_str()) {
                seen.push(resource.resource_type.as_str());
            }
        }
        seen
    }
}

/// One declared unit of desired external state.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    /// Driver registry key
    pub resource_type: String,
    /// Natural key on the remote side
    pub name: String,
    pub properties: Properties,
    /// Local symbolic name other resources reference as `${id_reference}`
    pub id_reference: String,
    pub tags: BTreeSet<String>,
}

impl ResourceDefinition {
    /// Every reference token in this resource's properties, first occurrence only.
    pub fn references(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for value in self.properties.values() {
            for token in value.references() {
                if !out.contains(&token) {
                    out.push(token);
                }
            }
        }
        out
    }

    /// Whether any of this resource's tags is in `filter`.
    pub fn has_any_tag(&self, filter: &BTreeSet<String>) -> bool {
        !self.tags.is_disjoint(filter)
    }

    /// Declared tags plus the derived example tag.
    pub fn scoped_tags(&self, config_name: &str) -> BTreeSet<String> {
        let mut tags = self.tags.clone();
        tags.insert(format!("{EXAMPLE_TAG_PREFIX}{config_name}"));
        tags
    }
}

/// Deletion pass settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupSpec {
    /// Resource types in the order they are deleted
    pub order: Vec<String>,
    /// Only resources carrying one of these tags are deleted
    pub filter_tags: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parse_string;

    fn resource(resource_type: &str, id_ref: &str, tags: &[&str]) -> ResourceDefinition {
        ResourceDefinition {
            resource_type: resource_type.into(),
            name: id_ref.to_uppercase(),
            properties: Properties::new(),
            id_reference: id_ref.into(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    #[test]
    fn references_are_deduplicated_in_order() {
        let mut r = resource("system", "sys1", &[]);
        r.properties
            .insert("a".into(), parse_string("${loc1}-${net1}").unwrap());
        r.properties
            .insert("b".into(), parse_string("${loc1}").unwrap());
        assert_eq!(r.references(), vec!["loc1", "net1"]);
    }

    #[test]
    fn tag_intersection() {
        let r = resource("system", "sys1", &["demoA", "lab"]);
        let filter: BTreeSet<String> = ["demoA".to_string()].into();
        assert!(r.has_any_tag(&filter));
        let other: BTreeSet<String> = ["demoB".to_string()].into();
        assert!(!r.has_any_tag(&other));
        assert!(!r.has_any_tag(&BTreeSet::new()));
    }

    #[test]
    fn scoped_tags_add_example_tag() {
        let r = resource("system", "sys1", &["demoA"]);
        let tags = r.scoped_tags("net-lab");
        assert!(tags.contains("demoA"));
        assert!(tags.contains("example:net-lab"));
    }

    #[test]
    fn resource_types_in_first_appearance_order() {
        let config = Configuration {
            format_version: 1,
            name: "demo".into(),
            title: "Demo".into(),
            description: None,
            resources: vec![
                resource("location", "l1", &[]),
                resource("system", "s1", &[]),
                resource("location", "l2", &[]),
            ],
            cleanup: CleanupSpec::default(),
        };
        assert_eq!(config.resource_types(), vec!["location", "system"]);
        assert_eq!(config.resources_of_type("location").count(), 2);
        assert_eq!(config.example_tag(), "example:demo");
        assert!(config.resource("s1").is_some());
    }
}
