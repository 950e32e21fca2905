//! Deletion passes: tag-scoped cleanup and rollback of a single run
//!
//! Both passes keep going after a failure. Every visited resource gets a
//! result, so the caller sees exactly what is left behind.

use crate::context::{NoProgress, ProgressCallback, RunOptions};
use crate::driver::{DriverRegistry, ResourceDriver};
use crate::error::{Error, Result};
use crate::ids::ServerId;
use crate::model::{Configuration, ResourceDefinition};
use crate::result::{CleanupOutcome, Operation, ProvisionOutcome, ProvisioningResult};
use std::collections::BTreeSet;

/// Delete a configuration's resources.
///
/// Types are processed in `cleanup.order`, resources within a type in
/// declaration order. Only resources carrying one of `cleanup.filter_tags`
/// are candidates. Identity is rediscovered by name for each candidate, so
/// no state from a previous provisioning run is needed.
pub fn cleanup<P: ProgressCallback>(
    registry: &DriverRegistry,
    config: &Configuration,
    opts: &RunOptions,
    progress: &mut P,
) -> CleanupOutcome {
    let mut outcome = CleanupOutcome::default();

    if config.cleanup.filter_tags.is_empty() {
        log::warn!(
            "Configuration '{}' has no cleanup.filter_tags; nothing is eligible for deletion",
            config.name
        );
        return outcome;
    }

    log::info!(
        "Cleaning up '{}' in workspace '{}'{}",
        config.name,
        opts.workspace,
        if opts.dry_run { " (dry run)" } else { "" }
    );

    for resource_type in &config.cleanup.order {
        let candidates = config
            .resources_of_type(resource_type)
            .filter(|r| r.has_any_tag(&config.cleanup.filter_tags));

        for resource in candidates {
            progress.on_resource_start(Operation::Delete, resource);
            let result = match cleanup_resource(registry, config, resource, opts) {
                Ok(result) => result,
                Err(error) => {
                    log::warn!("{error}");
                    ProvisioningResult::failed(resource, error.to_string())
                }
            };
            progress.on_resource_complete(Operation::Delete, &result);
            outcome.results.push(result);
        }
    }

    log::info!("Cleanup of '{}' finished: {}", config.name, outcome.summary());
    outcome
}

/// Cleanup without progress reporting.
pub fn cleanup_simple(
    registry: &DriverRegistry,
    config: &Configuration,
    opts: &RunOptions,
) -> CleanupOutcome {
    cleanup(registry, config, opts, &mut NoProgress)
}

fn cleanup_resource(
    registry: &DriverRegistry,
    config: &Configuration,
    resource: &ResourceDefinition,
    opts: &RunOptions,
) -> Result<ProvisioningResult> {
    let driver = driver_for(registry, resource)?;
    let tags = resource.scoped_tags(&config.name);

    let found = driver
        .find_by_name(&resource.name, &opts.workspace, &tags)
        .map_err(|source| Error::ResourceLookup {
            resource_type: resource.resource_type.clone(),
            name: resource.name.clone(),
            source,
        })?;

    let Some(id) = found else {
        log::debug!(
            "{} '{}' not found, nothing to delete",
            resource.resource_type,
            resource.name
        );
        return Ok(ProvisioningResult::skipped(resource, None));
    };

    delete_by_id(driver, resource, id, &tags, opts)
}

/// Undo what one provisioning run created.
///
/// Only CREATED results are touched, newest first, and they are deleted by
/// the id recorded in the outcome. Resources the run merely found are left
/// alone.
pub fn rollback<P: ProgressCallback>(
    registry: &DriverRegistry,
    config: &Configuration,
    provisioned: &ProvisionOutcome,
    opts: &RunOptions,
    progress: &mut P,
) -> CleanupOutcome {
    let mut outcome = CleanupOutcome::default();
    log::info!("Rolling back '{}' in workspace '{}'", config.name, opts.workspace);

    for created in provisioned.created().rev() {
        let Some(resource) = config.resource(&created.id_reference) else {
            log::warn!(
                "Skipping rollback of '{}': not declared in '{}'",
                created.id_reference,
                config.name
            );
            continue;
        };
        let Some(id) = created.server_id.clone() else {
            continue;
        };

        progress.on_resource_start(Operation::Delete, resource);
        let tags = resource.scoped_tags(&config.name);
        let result = driver_for(registry, resource)
            .and_then(|driver| delete_by_id(driver, resource, id, &tags, opts))
            .unwrap_or_else(|error| {
                log::warn!("{error}");
                ProvisioningResult::failed(resource, error.to_string())
            });
        progress.on_resource_complete(Operation::Delete, &result);
        outcome.results.push(result);
    }

    log::info!("Rollback of '{}' finished: {}", config.name, outcome.summary());
    outcome
}

fn driver_for<'a>(
    registry: &'a DriverRegistry,
    resource: &ResourceDefinition,
) -> Result<&'a dyn ResourceDriver> {
    registry
        .get(&resource.resource_type)
        .ok_or_else(|| Error::UnknownDriver(resource.resource_type.clone()))
}

fn delete_by_id(
    driver: &dyn ResourceDriver,
    resource: &ResourceDefinition,
    id: ServerId,
    tags: &BTreeSet<String>,
    opts: &RunOptions,
) -> Result<ProvisioningResult> {
    if opts.dry_run {
        log::debug!(
            "Would delete {} '{}' ({id})",
            resource.resource_type,
            resource.name
        );
        return Ok(ProvisioningResult::planned(resource, id));
    }

    let deleted = driver
        .delete(id.as_str(), &opts.workspace, tags)
        .map_err(|source| Error::ResourceDeletion {
            resource_type: resource.resource_type.clone(),
            name: resource.name.clone(),
            source,
        })?;

    match deleted {
        Some(id) => {
            log::debug!("Deleted {} '{}' ({id})", resource.resource_type, resource.name);
            Ok(ProvisioningResult::deleted(resource, id))
        }
        None => {
            log::debug!(
                "{} '{}' vanished before it could be deleted",
                resource.resource_type,
                resource.name
            );
            Ok(ProvisioningResult::skipped(resource, None))
        }
    }
}
