//! Run options and progress reporting
//!
//! These let the engine report per-resource progress without depending on
//! any particular terminal or UI implementation.

use crate::model::ResourceDefinition;
use crate::result::{Operation, ProvisioningResult};

/// Options shared by provisioning and cleanup passes
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Workspace (tenant) the resources live in
    pub workspace: String,
    /// Walk the same control flow without any mutating driver call
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Progress callback for engine passes
///
/// Implement this trait to receive progress updates during a run.
pub trait ProgressCallback {
    /// Called before any driver call is made for a resource
    fn on_resource_start(&mut self, operation: Operation, resource: &ResourceDefinition);

    /// Called once the resource's outcome is known
    fn on_resource_complete(&mut self, operation: Operation, result: &ProvisioningResult);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_resource_start(&mut self, _operation: Operation, _resource: &ResourceDefinition) {}
    fn on_resource_complete(&mut self, _operation: Operation, _result: &ProvisioningResult) {}
}
