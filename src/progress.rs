//! Live per-resource output for engine runs

use crate::ui;
use blueprint::{Operation, ProgressCallback, ProvisioningResult, ResourceDefinition};

/// Prints one line per resource as soon as its outcome is known
pub struct ConsoleProgress {
    quiet: bool,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_resource_start(&mut self, operation: Operation, resource: &ResourceDefinition) {
        log::info!(
            "{} {} '{}'",
            operation,
            resource.resource_type,
            resource.name
        );
    }

    fn on_resource_complete(&mut self, _operation: Operation, result: &ProvisioningResult) {
        // Failures are always shown
        if self.quiet && !result.is_failure() {
            return;
        }
        println!("  {}", ui::result_line(result));
    }
}
