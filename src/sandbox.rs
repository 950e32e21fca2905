//! Local file-backed driver backend
//!
//! Stands in for a remote service: every registered resource type is served
//! by a [`SandboxDriver`] that keeps its records in one JSON file, so installs
//! and deletes persist across invocations.

use anyhow::{Context, Result, anyhow};
use blueprint::{CreateRequest, DriverRegistry, DriverResult, ResourceDriver, ServerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A resource held by the sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxRecord {
    pub id: String,
    pub resource_type: String,
    pub name: String,
    pub workspace: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl SandboxRecord {
    fn in_scope(&self, resource_type: &str, workspace: &str, tags: &BTreeSet<String>) -> bool {
        self.resource_type == resource_type
            && self.workspace == workspace
            && tags.is_subset(&self.tags)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    /// Last id handed out per type
    #[serde(default)]
    counters: BTreeMap<String, u64>,
    #[serde(default)]
    records: Vec<SandboxRecord>,
}

// ============================================================================
// Store
// ============================================================================

/// JSON file holding every sandbox record
#[derive(Debug, Clone)]
pub struct SandboxStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl SandboxStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// All records, in creation order
    #[cfg(test)]
    pub fn records(&self) -> Result<Vec<SandboxRecord>> {
        self.with_file(|file| Ok((file.records.clone(), false)))
    }

    /// Find a record by name
    pub fn find(
        &self,
        resource_type: &str,
        name: &str,
        workspace: &str,
        tags: &BTreeSet<String>,
    ) -> Result<Option<SandboxRecord>> {
        self.with_file(|file| {
            let found = file
                .records
                .iter()
                .find(|r| r.name == name && r.in_scope(resource_type, workspace, tags))
                .cloned();
            Ok((found, false))
        })
    }

    /// Store a new record with a fresh `<type>-<n>` id
    pub fn insert(&self, request: &CreateRequest) -> Result<SandboxRecord> {
        self.with_file(|file| {
            let counter = file.counters.entry(request.resource_type.clone()).or_default();
            *counter += 1;
            let record = SandboxRecord {
                id: format!("{}-{counter}", request.resource_type),
                resource_type: request.resource_type.clone(),
                name: request.name.clone(),
                workspace: request.workspace.clone(),
                tags: request.tags.clone(),
                properties: request.properties.clone(),
                created_at: Utc::now(),
            };
            file.records.push(record.clone());
            Ok((record, true))
        })
    }

    /// Remove a record by id, or failing that by name
    pub fn remove(
        &self,
        resource_type: &str,
        key: &str,
        workspace: &str,
        tags: &BTreeSet<String>,
    ) -> Result<Option<SandboxRecord>> {
        self.with_file(|file| {
            let in_scope = |r: &SandboxRecord| r.in_scope(resource_type, workspace, tags);
            // Ids are unique, so they win over a same-named record
            let position = file
                .records
                .iter()
                .position(|r| r.id == key && in_scope(r))
                .or_else(|| file.records.iter().position(|r| r.name == key && in_scope(r)));
            Ok(match position {
                Some(index) => (Some(file.records.remove(index)), true),
                None => (None, false),
            })
        })
    }

    /// Run `f` against the loaded file, saving it when `f` reports a change
    fn with_file<T>(&self, f: impl FnOnce(&mut StoreFile) -> Result<(T, bool)>) -> Result<T> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("Sandbox store lock poisoned"))?;

        let mut file = self.load()?;
        let (value, changed) = f(&mut file)?;
        if changed {
            self.save(&file)?;
        }
        Ok(value)
    }

    fn load(&self) -> Result<StoreFile> {
        if !self.path.exists() {
            return Ok(StoreFile::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read sandbox store: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse sandbox store: {}", self.path.display()))
    }

    fn save(&self, file: &StoreFile) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let content = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write sandbox store: {}", self.path.display()))?;
        log::debug!("Saved sandbox store to {}", self.path.display());
        Ok(())
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Driver for one resource type backed by a [`SandboxStore`]
pub struct SandboxDriver {
    resource_type: String,
    store: SandboxStore,
}

impl SandboxDriver {
    pub fn new(resource_type: impl Into<String>, store: SandboxStore) -> Self {
        Self {
            resource_type: resource_type.into(),
            store,
        }
    }
}

impl ResourceDriver for SandboxDriver {
    fn find_by_name(
        &self,
        name: &str,
        workspace: &str,
        tags: &BTreeSet<String>,
    ) -> DriverResult<Option<ServerId>> {
        let found = self.store.find(&self.resource_type, name, workspace, tags)?;
        Ok(found.map(|r| ServerId::new(r.id)))
    }

    fn create(&self, request: &CreateRequest) -> DriverResult<ServerId> {
        let record = self.store.insert(request)?;
        Ok(ServerId::new(record.id))
    }

    fn delete(
        &self,
        name_or_id: &str,
        workspace: &str,
        tags: &BTreeSet<String>,
    ) -> DriverResult<Option<ServerId>> {
        let removed = self
            .store
            .remove(&self.resource_type, name_or_id, workspace, tags)?;
        Ok(removed.map(|r| ServerId::new(r.id)))
    }
}

/// Registry with a sandbox driver for each type key
pub fn registry<S: AsRef<str>>(store: &SandboxStore, types: &[S]) -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    for resource_type in types {
        let resource_type = resource_type.as_ref();
        registry.register(resource_type, SandboxDriver::new(resource_type, store.clone()));
    }
    registry
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|t| (*t).to_string()).collect()
    }

    fn request(resource_type: &str, name: &str, workspace: &str) -> CreateRequest {
        let mut properties = Map::new();
        properties.insert("cidr".into(), json!("10.0.0.0/24"));
        CreateRequest {
            resource_type: resource_type.into(),
            name: name.into(),
            workspace: workspace.into(),
            properties,
            tags: tags(&["demoA", "example:lab"]),
        }
    }

    #[test]
    fn test_create_find_delete() {
        let tmp = TempDir::new().unwrap();
        let store = SandboxStore::new(tmp.path().join("sandbox.json"));
        let driver = SandboxDriver::new("network", store.clone());

        let id = driver.create(&request("network", "N1", "ws")).unwrap();
        assert_eq!(id.as_str(), "network-1");

        let scope = tags(&["example:lab"]);
        assert_eq!(driver.find_by_name("N1", "ws", &scope).unwrap(), Some(id.clone()));
        assert_eq!(driver.find_by_name("N1", "other-ws", &scope).unwrap(), None);
        assert_eq!(
            driver.find_by_name("N1", "ws", &tags(&["example:other"])).unwrap(),
            None
        );

        assert_eq!(driver.delete(id.as_str(), "ws", &scope).unwrap(), Some(id));
        assert_eq!(driver.delete("N1", "ws", &scope).unwrap(), None);
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn test_find_ignores_server_ids() {
        let tmp = TempDir::new().unwrap();
        let store = SandboxStore::new(tmp.path().join("sandbox.json"));
        let driver = SandboxDriver::new("location", store);
        let scope = tags(&["example:lab"]);

        let hq = driver.create(&request("location", "HQ", "ws")).unwrap();
        assert_eq!(hq.as_str(), "location-1");
        assert_eq!(driver.find_by_name("location-1", "ws", &scope).unwrap(), None);

        // A resource actually named after that id is a different record
        let named = driver.create(&request("location", "location-1", "ws")).unwrap();
        assert_eq!(
            driver.find_by_name("location-1", "ws", &scope).unwrap(),
            Some(named.clone())
        );
        assert_eq!(driver.find_by_name("HQ", "ws", &scope).unwrap(), Some(hq.clone()));

        assert_eq!(driver.delete(hq.as_str(), "ws", &scope).unwrap(), Some(hq));
        assert_eq!(driver.find_by_name("location-1", "ws", &scope).unwrap(), Some(named));
    }

    #[test]
    fn test_records_persist_across_instances() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state").join("sandbox.json");

        SandboxStore::new(&path)
            .insert(&request("system", "S1", "ws"))
            .unwrap();
        let reopened = SandboxStore::new(&path);
        let records = reopened.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].properties["cidr"], json!("10.0.0.0/24"));

        let second = reopened.insert(&request("system", "S2", "ws")).unwrap();
        assert_eq!(second.id, "system-2");
    }

    #[test]
    fn test_types_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let store = SandboxStore::new(tmp.path().join("sandbox.json"));
        let registry = registry(&store, &["location", "system"]);

        registry
            .get("location")
            .unwrap()
            .create(&request("location", "X", "ws"))
            .unwrap();
        let system = registry.get("system").unwrap();
        assert_eq!(system.find_by_name("X", "ws", &BTreeSet::new()).unwrap(), None);
        assert_eq!(registry.types().collect::<Vec<_>>(), vec!["location", "system"]);
    }

    #[test]
    fn test_corrupt_store_is_driver_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sandbox.json");
        fs::write(&path, "not json").unwrap();
        let driver = SandboxDriver::new("site", SandboxStore::new(&path));

        let err = driver.find_by_name("S", "ws", &BTreeSet::new()).unwrap_err();
        assert!(err.message().contains("Failed to parse sandbox store"));
    }
}
