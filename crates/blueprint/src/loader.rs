//! Configuration loading and validation
//!
//! Documents live in a single directory and are looked up by name, trying
//! `<name>.yaml`, `<name>.yml`, `<name>.json` and `<name>.toml` in that order.
//! Every format is first read into a generic value tree, then walked by hand
//! so that *all* structural problems are reported at once instead of stopping
//! at the first serde error.
//!
//! Validation happens in two passes:
//! 1. [`validate_document`] - required fields, format version, registered
//!    types, well-formed reference tokens, unique `id_reference`s.
//! 2. [`check_references`] - every token names an `id_reference` declared
//!    strictly earlier in the resource list.

use crate::driver::DriverRegistry;
use crate::error::{Error, Result};
use crate::model::{CleanupSpec, Configuration, ResourceDefinition, SUPPORTED_FORMAT_VERSIONS};
use crate::template::{Properties, PropertyValue, is_valid_reference_name};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Document formats
// ============================================================================

/// Supported document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
    Toml,
}

/// File extensions in lookup priority order.
const EXTENSIONS: [(&str, DocumentFormat); 4] = [
    ("yaml", DocumentFormat::Yaml),
    ("yml", DocumentFormat::Yaml),
    ("json", DocumentFormat::Json),
    ("toml", DocumentFormat::Toml),
];

impl DocumentFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        EXTENSIONS
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, format)| *format)
    }

    /// Parse text into a generic value tree.
    pub fn parse(self, text: &str) -> std::result::Result<Value, String> {
        match self {
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str::<toml::Table>(text)
                .map_err(|e| e.to_string())
                .and_then(|table| toml_to_json(toml::Value::Table(table))),
        }
    }
}

/// Convert a TOML tree, rendering datetimes as their RFC 3339 text.
fn toml_to_json(value: toml::Value) -> std::result::Result<Value, String> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| format!("unsupported float value {f}"))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<std::result::Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| toml_to_json(v).map(|v| (k, v)))
                .collect::<std::result::Result<_, _>>()?,
        ),
    })
}

// ============================================================================
// Loader
// ============================================================================

/// A configuration available in the configs directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSummary {
    /// Lookup name (file stem)
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub resource_count: usize,
    pub path: PathBuf,
}

/// Loads configurations by name from a directory.
#[derive(Debug, Clone)]
pub struct Loader {
    dir: PathBuf,
    known_types: BTreeSet<String>,
}

impl Loader {
    /// Create a loader accepting the given resource type keys.
    pub fn new<S: Into<String>>(
        dir: impl Into<PathBuf>,
        known_types: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            dir: dir.into(),
            known_types: known_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a loader accepting exactly the types registered in `registry`.
    pub fn for_registry(dir: impl Into<PathBuf>, registry: &DriverRegistry) -> Self {
        Self::new(dir, registry.types())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Find the document for `name`, if any.
    pub fn locate(&self, name: &str) -> Option<(PathBuf, DocumentFormat)> {
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return None;
        }
        EXTENSIONS.iter().find_map(|(ext, format)| {
            let path = self.dir.join(format!("{name}.{ext}"));
            path.is_file().then_some((path, *format))
        })
    }

    /// Load and schema-validate a configuration.
    ///
    /// Reference consistency is *not* checked; use [`load_validated`](Self::load_validated)
    /// before provisioning.
    pub fn load(&self, name: &str) -> Result<Configuration> {
        let (path, format) = self.locate(name).ok_or_else(|| Error::ConfigNotFound {
            name: name.to_string(),
        })?;
        log::debug!("Loading configuration '{name}' from {}", path.display());

        let text = fs::read_to_string(&path)?;
        let config = self.parse_document(&text, format, &path, name)?;

        if config.name != name {
            log::warn!(
                "Configuration file {} declares name '{}'",
                path.display(),
                config.name
            );
        }
        Ok(config)
    }

    /// Load a configuration and require its references to be consistent.
    pub fn load_validated(&self, name: &str) -> Result<Configuration> {
        let config = self.load(name)?;
        let violations = check_references(&config);
        if !violations.is_empty() {
            return Err(Error::UndefinedReference {
                config: config.name,
                violations,
            });
        }
        Ok(config)
    }

    /// Parse and schema-validate a document held in memory.
    pub fn parse_str(&self, text: &str, format: DocumentFormat) -> Result<Configuration> {
        self.parse_document(text, format, Path::new("<inline>"), "<inline>")
    }

    fn parse_document(
        &self,
        text: &str,
        format: DocumentFormat,
        path: &Path,
        fallback_name: &str,
    ) -> Result<Configuration> {
        let doc = format.parse(text).map_err(|message| Error::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        validate_document(&doc, &self.known_types).map_err(|violations| {
            let config = doc
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(fallback_name)
                .to_string();
            Error::SchemaValidation { config, violations }
        })
    }

    /// List every configuration in the directory.
    ///
    /// Documents that fail to parse are skipped with a warning.
    pub fn list(&self) -> Result<Vec<ConfigSummary>> {
        if !self.dir.is_dir() {
            log::debug!("Configs directory {} does not exist", self.dir.display());
            return Ok(Vec::new());
        }

        let mut names = BTreeSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if DocumentFormat::from_path(&path).is_none() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.insert(stem.to_string());
            }
        }

        let mut summaries = Vec::with_capacity(names.len());
        for name in names {
            let Some((path, format)) = self.locate(&name) else {
                continue;
            };
            match summarize(&path, format, &name) {
                Ok(summary) => summaries.push(summary),
                Err(e) => log::warn!("Skipping {}: {e}", path.display()),
            }
        }
        Ok(summaries)
    }
}

fn summarize(path: &Path, format: DocumentFormat, name: &str) -> Result<ConfigSummary> {
    let text = fs::read_to_string(path)?;
    let doc = format.parse(&text).map_err(|message| Error::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    let title = doc
        .get("title")
        .and_then(Value::as_str)
        .or_else(|| doc.get("name").and_then(Value::as_str))
        .unwrap_or(name)
        .to_string();

    Ok(ConfigSummary {
        name: name.to_string(),
        title,
        description: doc
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        resource_count: doc
            .get("resources")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        path: path.to_path_buf(),
    })
}

// ============================================================================
// Schema validation
// ============================================================================

/// Validate a parsed document, collecting every violation.
pub fn validate_document(
    doc: &Value,
    known_types: &BTreeSet<String>,
) -> std::result::Result<Configuration, Vec<String>> {
    let Some(root) = doc.as_object() else {
        return Err(vec!["document root must be a mapping".to_string()]);
    };

    let mut violations = Vec::new();
    let ctx = "configuration";

    let format_version = match root.get("format_version") {
        None | Some(Value::Null) => {
            violations.push(format!("{ctx}: missing required field 'format_version'"));
            None
        }
        Some(value) => {
            let version = parse_version(value).filter(|v| SUPPORTED_FORMAT_VERSIONS.contains(v));
            if version.is_none() {
                violations.push(format!(
                    "{ctx}: unsupported format_version {value} (supported: {})",
                    SUPPORTED_FORMAT_VERSIONS
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            version
        }
    };

    let name = required_string(root, "name", ctx, &mut violations);
    let title = optional_string(root, "title", ctx, &mut violations);
    let description = optional_string(root, "description", ctx, &mut violations);

    let resources: Vec<ResourceDefinition> = match root.get("resources") {
        None | Some(Value::Null) => {
            violations.push(format!("{ctx}: missing required field 'resources'"));
            Vec::new()
        }
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                validate_resource(index, item, known_types, &mut violations)
            })
            .collect(),
        Some(_) => {
            violations.push(format!("{ctx}: field 'resources' must be a sequence"));
            Vec::new()
        }
    };

    let mut seen: HashMap<&str, &str> = HashMap::new();
    for resource in &resources {
        if let Some(first) = seen.insert(&resource.id_reference, &resource.name) {
            violations.push(format!(
                "duplicate id_reference '{}' (resources '{}' and '{}')",
                resource.id_reference, first, resource.name
            ));
        }
    }

    let cleanup = validate_cleanup(root.get("cleanup"), known_types, &mut violations);

    match (format_version, name, cleanup) {
        (Some(format_version), Some(name), Some(cleanup)) if violations.is_empty() => {
            let uncleaned: BTreeSet<&str> = resources
                .iter()
                .map(|r| r.resource_type.as_str())
                .filter(|t| !cleanup.order.iter().any(|o| o == t))
                .collect();
            for resource_type in uncleaned {
                log::warn!(
                    "Configuration '{name}': type '{resource_type}' is not in cleanup.order and will never be deleted"
                );
            }
            Ok(Configuration {
                format_version,
                title: title.unwrap_or_else(|| name.clone()),
                name,
                description,
                resources,
                cleanup,
            })
        }
        _ => Err(violations),
    }
}

fn parse_version(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn validate_resource(
    index: usize,
    item: &Value,
    known_types: &BTreeSet<String>,
    violations: &mut Vec<String>,
) -> Option<ResourceDefinition> {
    let Some(obj) = item.as_object() else {
        violations.push(format!("resources[{index}]: must be a mapping"));
        return None;
    };

    let label = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .map_or_else(|| format!("resources[{index}]"), |n| format!("resource '{n}'"));

    let resource_type = required_string(obj, "type", &label, violations);
    if let Some(t) = &resource_type
        && !known_types.contains(t)
    {
        violations.push(format!(
            "{label}: type '{t}' is not a registered resource type"
        ));
    }

    let name = required_string(obj, "name", &label, violations);

    let id_reference = required_string(obj, "id_reference", &label, violations);
    if let Some(id) = &id_reference
        && !is_valid_reference_name(id)
    {
        violations.push(format!(
            "{label}: id_reference '{id}' may only contain letters, digits, '_', '.' and '-'"
        ));
    }

    let properties = match obj.get("properties") {
        None | Some(Value::Null) => Properties::new(),
        Some(Value::Object(map)) => parse_properties(map, &label, violations),
        Some(_) => {
            violations.push(format!("{label}: field 'properties' must be a mapping"));
            Properties::new()
        }
    };

    let tags = string_set(obj.get("tags"), "tags", &label, violations);

    Some(ResourceDefinition {
        resource_type: resource_type?,
        name: name?,
        properties,
        id_reference: id_reference?,
        tags,
    })
}

fn parse_properties(
    map: &Map<String, Value>,
    label: &str,
    violations: &mut Vec<String>,
) -> Properties {
    let mut properties = Properties::with_capacity(map.len());
    for (key, raw) in map {
        match PropertyValue::parse(raw) {
            Ok(value) => {
                properties.insert(key.clone(), value);
            }
            Err(message) => violations.push(format!("{label}: property '{key}': {message}")),
        }
    }
    properties
}

fn validate_cleanup(
    value: Option<&Value>,
    known_types: &BTreeSet<String>,
    violations: &mut Vec<String>,
) -> Option<CleanupSpec> {
    let obj = match value {
        None | Some(Value::Null) => {
            violations.push("configuration: missing required field 'cleanup'".to_string());
            return None;
        }
        Some(Value::Object(obj)) => obj,
        Some(_) => {
            violations.push("configuration: field 'cleanup' must be a mapping".to_string());
            return None;
        }
    };

    let ctx = "cleanup";
    let order = match obj.get("order") {
        None | Some(Value::Null) => {
            violations.push(format!("{ctx}: missing required field 'order'"));
            None
        }
        Some(Value::Array(items)) => {
            let mut order: Vec<String> = Vec::with_capacity(items.len());
            for item in items {
                let Some(t) = item.as_str() else {
                    violations.push(format!("{ctx}: field 'order' must contain only strings"));
                    continue;
                };
                if !known_types.contains(t) {
                    violations.push(format!(
                        "{ctx}: order entry '{t}' is not a registered resource type"
                    ));
                } else if order.iter().any(|existing| existing == t) {
                    violations.push(format!("{ctx}: order lists '{t}' more than once"));
                } else {
                    order.push(t.to_string());
                }
            }
            Some(order)
        }
        Some(_) => {
            violations.push(format!("{ctx}: field 'order' must be a sequence"));
            None
        }
    };

    let filter_tags = string_set(obj.get("filter_tags"), "filter_tags", ctx, violations);

    Some(CleanupSpec {
        order: order?,
        filter_tags,
    })
}

fn required_string(
    obj: &Map<String, Value>,
    field: &str,
    label: &str,
    violations: &mut Vec<String>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => {
            violations.push(format!("{label}: missing required field '{field}'"));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            violations.push(format!("{label}: field '{field}' must not be empty"));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            violations.push(format!("{label}: field '{field}' must be a string"));
            None
        }
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &str,
    label: &str,
    violations: &mut Vec<String>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            violations.push(format!("{label}: field '{field}' must be a string"));
            None
        }
    }
}

fn string_set(
    value: Option<&Value>,
    field: &str,
    label: &str,
    violations: &mut Vec<String>,
) -> BTreeSet<String> {
    match value {
        None | Some(Value::Null) => BTreeSet::new(),
        Some(Value::Array(items)) => {
            let mut set = BTreeSet::new();
            for item in items {
                match item.as_str() {
                    Some(s) => {
                        set.insert(s.to_string());
                    }
                    None => {
                        violations.push(format!("{label}: field '{field}' must contain only strings"));
                    }
                }
            }
            set
        }
        Some(_) => {
            violations.push(format!("{label}: field '{field}' must be a sequence of strings"));
            BTreeSet::new()
        }
    }
}

// ============================================================================
// Reference consistency
// ============================================================================

/// Check that every reference token names an `id_reference` declared earlier.
///
/// Returns one message per offending (resource, token) pair; an empty list
/// means the configuration is safe to provision.
pub fn check_references(config: &Configuration) -> Vec<String> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (index, resource) in config.resources.iter().enumerate() {
        positions.entry(&resource.id_reference).or_insert(index);
    }

    let mut violations = Vec::new();
    for (index, resource) in config.resources.iter().enumerate() {
        for token in resource.references() {
            match positions.get(token) {
                None => violations.push(format!(
                    "resource '{}' references undefined id_reference '{token}'",
                    resource.name
                )),
                Some(&defined) if defined == index => violations.push(format!(
                    "resource '{}' references itself via id_reference '{token}'",
                    resource.name
                )),
                Some(&defined) if defined > index => violations.push(format!(
                    "resource '{}' references id_reference '{token}' before it is defined",
                    resource.name
                )),
                Some(_) => {}
            }
        }
    }
    violations
}
