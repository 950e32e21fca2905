//! # Blueprint
//!
//! A provisioning engine for example configurations.
//!
//! A configuration declares an ordered list of resources. Each resource names
//! a type, a natural key, properties, and a local `id_reference` that later
//! resources can embed as `${id_reference}` to pick up the server id the
//! earlier resource was given.
//!
//! ## Core Concepts
//!
//! - **Loader**: reads and validates configurations before anything touches
//!   the remote side
//! - **ResourceDriver**: find/create/delete for one resource type, supplied by
//!   the caller through a [`DriverRegistry`]
//! - **provision**: create-or-skip in declared order, halting on first failure
//! - **cleanup**: tag-scoped, type-ordered deletion that keeps going past
//!   failures
//! - **AuditLog**: append-only record of every run
//!
//! ## Example
//!
//! ```ignore
//! use blueprint::{AuditEntry, AuditLog, DriverRegistry, Loader, RunOptions, provision_simple};
//!
//! let registry = DriverRegistry::new()
//!     .with("location", my_location_driver)
//!     .with("system", my_system_driver);
//!
//! let loader = Loader::for_registry("configs", &registry);
//! let config = loader.load_validated("net-lab")?;
//!
//! let opts = RunOptions::new("workspace-1");
//! let outcome = provision_simple(&registry, &config, &opts);
//! AuditLog::new("audit.jsonl").record(&AuditEntry::for_install(&config, &opts, &outcome));
//!
//! println!("{}", outcome.summary());
//! ```

pub mod audit;
pub mod cleanup;
pub mod context;
pub mod driver;
pub mod error;
pub mod ids;
pub mod loader;
pub mod model;
pub mod provisioner;
pub mod result;
pub mod template;

pub use audit::{AuditEntry, AuditLog};
pub use cleanup::{cleanup, cleanup_simple, rollback};
pub use context::{NoProgress, ProgressCallback, RunOptions};
pub use driver::{CreateRequest, DriverRegistry, ResourceDriver};
pub use error::{DriverError, DriverResult, Error, Result};
pub use ids::{IdMap, ServerId};
pub use loader::{ConfigSummary, DocumentFormat, Loader, check_references};
pub use model::{CleanupSpec, Configuration, ResourceDefinition};
pub use provisioner::{provision, provision_simple};
pub use result::{Action, CleanupOutcome, Operation, ProvisionOutcome, ProvisioningResult, RunSummary};
pub use template::{Properties, PropertyValue};
