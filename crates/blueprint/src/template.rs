//! Reference tokens in resource properties.
//!
//! Property values are parsed once, when the configuration is loaded, into a
//! [`PropertyValue`] tree. A string that is exactly one `${name}` token becomes
//! a [`PropertyValue::WholeReference`] and resolves to the referenced server id
//! itself; a token embedded in surrounding text becomes a
//! [`PropertyValue::Template`] and always resolves to a concatenated string.
//!
//! `$${` escapes a literal `${`.

use crate::error::{Error, Result};
use crate::ids::IdMap;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static REFERENCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("reference name pattern is valid"));

/// A parsed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Value without any reference token
    Literal(Value),
    /// String that is exactly one `${name}` token
    WholeReference(String),
    /// String mixing literal text with one or more tokens
    Template(Vec<TemplatePart>),
    /// Sequence of values
    List(Vec<PropertyValue>),
    /// Ordered map of values
    Map(IndexMap<String, PropertyValue>),
}

/// A piece of a [`PropertyValue::Template`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Text(String),
    Reference(String),
}

/// Ordered, parsed properties of a resource.
pub type Properties = IndexMap<String, PropertyValue>;

impl PropertyValue {
    /// Parse a raw document value.
    ///
    /// Returns a description of the first malformed token on failure.
    pub fn parse(value: &Value) -> std::result::Result<Self, String> {
        match value {
            Value::String(s) => parse_string(s),
            Value::Array(items) => items
                .iter()
                .map(Self::parse)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Self::parse(v).map(|parsed| (k.clone(), parsed)))
                .collect::<std::result::Result<IndexMap<_, _>, _>>()
                .map(Self::Map),
            other => Ok(Self::Literal(other.clone())),
        }
    }

    /// Every reference token in this value, depth-first, duplicates included.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::WholeReference(name) => out.push(name),
            Self::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Reference(name) = part {
                        out.push(name);
                    }
                }
            }
            Self::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Map(map) => {
                for value in map.values() {
                    value.collect_references(out);
                }
            }
        }
    }

    /// Substitute every token using `ids`.
    pub fn resolve(&self, ids: &IdMap) -> Result<Value> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::WholeReference(name) => Ok(Value::String(lookup(ids, name)?.to_string())),
            Self::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Reference(name) => out.push_str(lookup(ids, name)?),
                    }
                }
                Ok(Value::String(out))
            }
            Self::List(items) => items
                .iter()
                .map(|item| item.resolve(ids))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Self::Map(map) => resolve_properties(map, ids).map(Value::Object),
        }
    }
}

fn lookup<'a>(ids: &'a IdMap, name: &str) -> Result<&'a str> {
    ids.get(name)
        .map(|id| id.as_str())
        .ok_or_else(|| Error::UnresolvedReference {
            token: name.to_string(),
        })
}

/// Resolve a whole property map, keeping key order.
pub fn resolve_properties(
    properties: &Properties,
    ids: &IdMap,
) -> Result<serde_json::Map<String, Value>> {
    let mut out = serde_json::Map::with_capacity(properties.len());
    for (key, value) in properties {
        out.insert(key.clone(), value.resolve(ids)?);
    }
    Ok(out)
}

/// Whether `name` may appear inside a `${...}` token.
pub fn is_valid_reference_name(name: &str) -> bool {
    REFERENCE_NAME.is_match(name)
}

/// Parse a single string into its reference shape.
pub fn parse_string(input: &str) -> std::result::Result<PropertyValue, String> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        text.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("$${") {
            text.push_str("${");
            rest = after;
        } else if let Some(inner) = tail.strip_prefix("${") {
            let Some(end) = inner.find('}') else {
                return Err(format!("unterminated reference in '{input}'"));
            };
            let name = &inner[..end];
            if !is_valid_reference_name(name) {
                return Err(format!("invalid reference name '{name}' in '{input}'"));
            }
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(&mut text)));
            }
            parts.push(TemplatePart::Reference(name.to_string()));
            rest = &inner[end + 1..];
        } else {
            text.push('$');
            rest = &tail[1..];
        }
    }
    text.push_str(rest);

    let has_reference = parts
        .iter()
        .any(|p| matches!(p, TemplatePart::Reference(_)));
    if !has_reference {
        return Ok(PropertyValue::Literal(Value::String(text)));
    }
    if !text.is_empty() {
        parts.push(TemplatePart::Text(text));
    }

    match parts.as_slice() {
        [TemplatePart::Reference(name)] => Ok(PropertyValue::WholeReference(name.clone())),
        _ => Ok(PropertyValue::Template(parts)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ServerId;
    use serde_json::json;

    fn ids() -> IdMap {
        [
            ("loc1", ServerId::new("srv-loc-1")),
            ("net1", ServerId::new("42")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn whole_reference_shape() {
        assert_eq!(
            parse_string("${loc1}").unwrap(),
            PropertyValue::WholeReference("loc1".into())
        );
    }

    #[test]
    fn embedded_reference_shape() {
        assert_eq!(
            parse_string("prefix-${loc1}-suffix").unwrap(),
            PropertyValue::Template(vec![
                TemplatePart::Text("prefix-".into()),
                TemplatePart::Reference("loc1".into()),
                TemplatePart::Text("-suffix".into()),
            ])
        );
    }

    #[test]
    fn two_adjacent_tokens_are_a_template() {
        let parsed = parse_string("${loc1}${net1}").unwrap();
        assert!(matches!(parsed, PropertyValue::Template(_)));
        assert_eq!(parsed.resolve(&ids()).unwrap(), json!("srv-loc-142"));
    }

    #[test]
    fn plain_strings_stay_literal() {
        assert_eq!(
            parse_string("cost is $5").unwrap(),
            PropertyValue::Literal(json!("cost is $5"))
        );
        assert_eq!(parse_string("").unwrap(), PropertyValue::Literal(json!("")));
    }

    #[test]
    fn escaped_token_is_literal_text() {
        assert_eq!(
            parse_string("$${loc1}").unwrap(),
            PropertyValue::Literal(json!("${loc1}"))
        );
        let parsed = parse_string("$${raw}-${loc1}").unwrap();
        assert_eq!(parsed.resolve(&ids()).unwrap(), json!("${raw}-srv-loc-1"));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(parse_string("x-${loc1").unwrap_err().contains("unterminated"));
        assert!(parse_string("${}").unwrap_err().contains("invalid reference name"));
        assert!(parse_string("${a b}").is_err());
    }

    #[test]
    fn whole_reference_resolves_to_id_verbatim() {
        let value = PropertyValue::WholeReference("net1".into());
        assert_eq!(value.resolve(&ids()).unwrap(), json!("42"));
    }

    #[test]
    fn resolves_nested_structures() {
        let raw = json!({
            "site": "${loc1}",
            "labels": ["a", "net-${net1}"],
            "nested": {"count": 3, "enabled": true, "ref": "${net1}"}
        });
        let parsed = PropertyValue::parse(&raw).unwrap();
        assert_eq!(parsed.references(), vec!["loc1", "net1", "net1"]);
        assert_eq!(
            parsed.resolve(&ids()).unwrap(),
            json!({
                "site": "srv-loc-1",
                "labels": ["a", "net-42"],
                "nested": {"count": 3, "enabled": true, "ref": "42"}
            })
        );
    }

    #[test]
    fn missing_id_is_a_resolution_error() {
        let value = parse_string("${ghost}").unwrap();
        let err = value.resolve(&IdMap::new()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { ref token } if token == "ghost"));
    }

    #[test]
    fn resolve_properties_keeps_order() {
        let mut props = Properties::new();
        props.insert("z".into(), PropertyValue::Literal(json!(1)));
        props.insert("a".into(), PropertyValue::WholeReference("loc1".into()));
        let resolved = resolve_properties(&props, &ids()).unwrap();
        let keys: Vec<&String> = resolved.keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
