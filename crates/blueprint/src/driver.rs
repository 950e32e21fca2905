//! Resource driver contract and registry.
//!
//! The engine never talks to the remote service directly. Each resource type
//! is backed by a [`ResourceDriver`] supplied by the surrounding application,
//! looked up by its type key in a [`DriverRegistry`].

use crate::error::DriverResult;
use crate::ids::ServerId;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Everything a driver needs to create one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub resource_type: String,
    pub name: String,
    pub workspace: String,
    /// Properties with every reference already resolved
    pub properties: Map<String, Value>,
    /// Declared tags plus the derived `example:<config>` tag
    pub tags: BTreeSet<String>,
}

/// Find/create/delete capability for one resource type.
///
/// Calls are blocking. Retry, timeout, and natural-key uniqueness are the
/// implementation's responsibility.
pub trait ResourceDriver: Send + Sync {
    /// Look up an existing resource by its natural key.
    fn find_by_name(
        &self,
        name: &str,
        workspace: &str,
        tags: &BTreeSet<String>,
    ) -> DriverResult<Option<ServerId>>;

    /// Create a resource, returning the id the service assigned.
    fn create(&self, request: &CreateRequest) -> DriverResult<ServerId>;

    /// Delete a resource by name or server id.
    ///
    /// Returns `None` when nothing matched; deleting twice is not an error.
    fn delete(
        &self,
        name_or_id: &str,
        workspace: &str,
        tags: &BTreeSet<String>,
    ) -> DriverResult<Option<ServerId>>;
}

/// Closed table of drivers keyed by resource type.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Box<dyn ResourceDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver, replacing any previous one for the same type.
    pub fn register(
        &mut self,
        resource_type: impl Into<String>,
        driver: impl ResourceDriver + 'static,
    ) -> &mut Self {
        let resource_type = resource_type.into();
        if self
            .drivers
            .insert(resource_type.clone(), Box::new(driver))
            .is_some()
        {
            log::debug!("Replaced driver for resource type '{resource_type}'");
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(
        mut self,
        resource_type: impl Into<String>,
        driver: impl ResourceDriver + 'static,
    ) -> Self {
        self.register(resource_type, driver);
        self
    }

    pub fn get(&self, resource_type: &str) -> Option<&dyn ResourceDriver> {
        self.drivers.get(resource_type).map(|driver| driver.as_ref())
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.drivers.contains_key(resource_type)
    }

    /// Registered type keys, sorted.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("types", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}
