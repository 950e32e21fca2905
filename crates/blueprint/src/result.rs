//! Per-resource outcomes and run summaries

use crate::error::Error;
use crate::ids::{IdMap, ServerId};
use crate::model::ResourceDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Created,
    Skipped,
    Failed,
    Deleted,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Created => write!(f, "CREATED"),
            Action::Skipped => write!(f, "SKIPPED"),
            Action::Failed => write!(f, "FAILED"),
            Action::Deleted => write!(f, "DELETED"),
        }
    }
}

/// Which engine pass produced a set of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Install,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install => write!(f, "install"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Outcome for a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningResult {
    pub id_reference: String,
    pub resource_type: String,
    pub resource_name: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<ServerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Dry-run marker: the action would have been taken but was not
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub planned: bool,
}

impl ProvisioningResult {
    fn new(resource: &ResourceDefinition, action: Action) -> Self {
        Self {
            id_reference: resource.id_reference.clone(),
            resource_type: resource.resource_type.clone(),
            resource_name: resource.name.clone(),
            action,
            server_id: None,
            error: None,
            planned: false,
        }
    }

    pub fn created(resource: &ResourceDefinition, id: ServerId) -> Self {
        Self {
            server_id: Some(id),
            ..Self::new(resource, Action::Created)
        }
    }

    /// Resource already existed (or, on cleanup, nothing matched).
    pub fn skipped(resource: &ResourceDefinition, id: Option<ServerId>) -> Self {
        Self {
            server_id: id,
            ..Self::new(resource, Action::Skipped)
        }
    }

    /// Dry-run outcome for a resource that would have been created or deleted.
    pub fn planned(resource: &ResourceDefinition, id: ServerId) -> Self {
        Self {
            server_id: Some(id),
            planned: true,
            ..Self::new(resource, Action::Skipped)
        }
    }

    pub fn deleted(resource: &ResourceDefinition, id: ServerId) -> Self {
        Self {
            server_id: Some(id),
            ..Self::new(resource, Action::Deleted)
        }
    }

    pub fn failed(resource: &ResourceDefinition, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(resource, Action::Failed)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.action == Action::Failed
    }
}

/// Counts per action across a result list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub created: usize,
    pub skipped: usize,
    pub planned: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_results(results: &[ProvisioningResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.add_result(result);
        }
        summary
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ProvisioningResult) {
        match result.action {
            Action::Created => self.created += 1,
            Action::Skipped if result.planned => self.planned += 1,
            Action::Skipped => self.skipped += 1,
            Action::Deleted => self.deleted += 1,
            Action::Failed => self.failed += 1,
        }
    }

    /// Total number of resources visited
    pub fn total(&self) -> usize {
        self.created + self.skipped + self.planned + self.deleted + self.failed
    }

    /// Check if no resource failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} deleted, {} skipped, {} planned, {} failed",
            self.created, self.deleted, self.skipped, self.planned, self.failed
        )
    }
}

/// Result of a provisioning pass.
#[derive(Debug)]
pub struct ProvisionOutcome {
    /// One entry per visited resource, in declaration order
    pub results: Vec<ProvisioningResult>,
    /// Ids known at the end of the run (placeholders included on dry runs)
    pub id_map: IdMap,
    /// Error that halted the pass, if any
    pub error: Option<Error>,
}

impl ProvisionOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_results(&self.results)
    }

    /// Resources this run actually created, in creation order.
    pub fn created(&self) -> impl DoubleEndedIterator<Item = &ProvisioningResult> {
        self.results.iter().filter(|r| r.action == Action::Created)
    }
}

/// Result of a cleanup or rollback pass.
#[derive(Debug, Default)]
pub struct CleanupOutcome {
    pub results: Vec<ProvisioningResult>,
}

impl CleanupOutcome {
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_results(&self.results)
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(ProvisioningResult::is_failure)
    }
}
