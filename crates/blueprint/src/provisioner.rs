//! Provisioning pass - create-or-skip every resource in declared order

use crate::context::{NoProgress, ProgressCallback, RunOptions};
use crate::driver::{CreateRequest, DriverRegistry};
use crate::error::{Error, Result};
use crate::ids::{IdMap, ServerId};
use crate::loader::check_references;
use crate::model::{Configuration, ResourceDefinition};
use crate::result::{Operation, ProvisionOutcome, ProvisioningResult};
use crate::template::resolve_properties;

/// Provision a configuration.
///
/// Resources are visited strictly in declaration order. Each one is resolved
/// against the ids gathered so far, looked up by name, and created only when
/// absent. The first failure is recorded as a FAILED result and ends the run;
/// nothing created before it is undone.
///
/// References are checked with [`check_references`] before anything else.
/// A configuration that fails the check is rejected with
/// [`Error::UndefinedReference`] and no driver is called.
pub fn provision<P: ProgressCallback>(
    registry: &DriverRegistry,
    config: &Configuration,
    opts: &RunOptions,
    progress: &mut P,
) -> ProvisionOutcome {
    log::info!(
        "Provisioning '{}' into workspace '{}'{}",
        config.name,
        opts.workspace,
        if opts.dry_run { " (dry run)" } else { "" }
    );

    let mut outcome = ProvisionOutcome {
        results: Vec::with_capacity(config.resources.len()),
        id_map: IdMap::new(),
        error: None,
    };

    let violations = check_references(config);
    if !violations.is_empty() {
        log::warn!(
            "Refusing to provision '{}': {} invalid reference(s)",
            config.name,
            violations.len()
        );
        outcome.error = Some(Error::UndefinedReference {
            config: config.name.clone(),
            violations,
        });
        return outcome;
    }

    for resource in &config.resources {
        progress.on_resource_start(Operation::Install, resource);

        let result = match provision_resource(registry, config, resource, opts, &outcome.id_map) {
            Ok(result) => result,
            Err(error) => {
                log::debug!("Halting at {} '{}': {error}", resource.resource_type, resource.name);
                let result = ProvisioningResult::failed(resource, error.to_string());
                progress.on_resource_complete(Operation::Install, &result);
                outcome.results.push(result);
                outcome.error = Some(error);
                break;
            }
        };

        if let Some(id) = &result.server_id {
            outcome
                .id_map
                .insert(resource.id_reference.clone(), id.clone());
        }
        progress.on_resource_complete(Operation::Install, &result);
        outcome.results.push(result);
    }

    log::info!("Provisioning '{}' finished: {}", config.name, outcome.summary());
    outcome
}

/// Provision without progress reporting.
pub fn provision_simple(
    registry: &DriverRegistry,
    config: &Configuration,
    opts: &RunOptions,
) -> ProvisionOutcome {
    provision(registry, config, opts, &mut NoProgress)
}

fn provision_resource(
    registry: &DriverRegistry,
    config: &Configuration,
    resource: &ResourceDefinition,
    opts: &RunOptions,
    ids: &IdMap,
) -> Result<ProvisioningResult> {
    let driver = registry
        .get(&resource.resource_type)
        .ok_or_else(|| Error::UnknownDriver(resource.resource_type.clone()))?;

    let properties = resolve_properties(&resource.properties, ids)?;
    let tags = resource.scoped_tags(&config.name);

    let existing = driver
        .find_by_name(&resource.name, &opts.workspace, &tags)
        .map_err(|source| Error::ResourceLookup {
            resource_type: resource.resource_type.clone(),
            name: resource.name.clone(),
            source,
        })?;

    if let Some(id) = existing {
        log::debug!(
            "{} '{}' already exists as {id}, skipping",
            resource.resource_type,
            resource.name
        );
        return Ok(ProvisioningResult::skipped(resource, Some(id)));
    }

    if opts.dry_run {
        let id = ServerId::placeholder(&resource.resource_type, &resource.id_reference);
        log::debug!(
            "Would create {} '{}' ({id})",
            resource.resource_type,
            resource.name
        );
        return Ok(ProvisioningResult::planned(resource, id));
    }

    let request = CreateRequest {
        resource_type: resource.resource_type.clone(),
        name: resource.name.clone(),
        workspace: opts.workspace.clone(),
        properties,
        tags,
    };

    let id = driver
        .create(&request)
        .map_err(|source| Error::ResourceCreation {
            resource_type: resource.resource_type.clone(),
            name: resource.name.clone(),
            source,
        })?;

    log::debug!("Created {} '{}' as {id}", resource.resource_type, resource.name);
    Ok(ProvisioningResult::created(resource, id))
}
