//! Error types for the provisioning engine.
//!
//! Load-time errors (`ConfigNotFound`, `SchemaValidation`, `UndefinedReference`)
//! are raised before any driver is called. Run-time errors carry the resource
//! type and name they occurred on so callers can report them without the
//! surrounding result list.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the provisioning engine.
#[derive(Debug, Error)]
pub enum Error {
    /// No configuration document with the given name exists
    #[error("configuration not found: {name}")]
    ConfigNotFound {
        /// Name that was looked up
        name: String,
    },

    /// The document is structurally invalid
    #[error("configuration '{config}' is invalid:\n{}", bullet_list(.violations))]
    SchemaValidation {
        /// Configuration name (or file stem when the name is missing)
        config: String,
        /// Every violation found, in document order
        violations: Vec<String>,
    },

    /// One or more reference tokens do not name an earlier `id_reference`
    #[error("configuration '{config}' has unresolvable references:\n{}", bullet_list(.violations))]
    UndefinedReference {
        /// Configuration name
        config: String,
        /// Every reference violation found
        violations: Vec<String>,
    },

    /// A reference token was not present in the id map at resolution time
    #[error("undefined id_reference '{token}' at resolution time")]
    UnresolvedReference {
        /// The token that could not be resolved
        token: String,
    },

    /// No driver is registered for a resource type
    #[error("no driver registered for resource type '{0}'")]
    UnknownDriver(String),

    /// The driver failed while looking up an existing resource
    #[error("failed to look up {resource_type} '{name}': {source}")]
    ResourceLookup {
        /// Resource type key
        resource_type: String,
        /// Resource name
        name: String,
        /// Underlying driver failure
        #[source]
        source: DriverError,
    },

    /// The driver failed to create a resource
    #[error("failed to create {resource_type} '{name}': {source}")]
    ResourceCreation {
        /// Resource type key
        resource_type: String,
        /// Resource name
        name: String,
        /// Underlying driver failure
        #[source]
        source: DriverError,
    },

    /// The driver failed to delete a resource
    #[error("failed to delete {resource_type} '{name}': {source}")]
    ResourceDeletion {
        /// Resource type key
        resource_type: String,
        /// Resource name
        name: String,
        /// Underlying driver failure
        #[source]
        source: DriverError,
    },

    /// A configuration document could not be parsed
    #[error("failed to parse {}: {message}", .path.display())]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Violations carried by load-time validation errors.
    pub fn violations(&self) -> &[String] {
        match self {
            Self::SchemaValidation { violations, .. }
            | Self::UndefinedReference { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Whether this error was raised before any external call was made.
    pub fn is_load_time(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::SchemaValidation { .. }
                | Self::UndefinedReference { .. }
                | Self::Parse { .. }
        )
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failure reported by a resource driver.
///
/// Drivers own their retry and timeout policy; by the time a `DriverError`
/// reaches the engine it is terminal for that resource.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DriverError {
    /// Create an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The driver's message, without the source chain.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for DriverError {
    fn from(err: anyhow::Error) -> Self {
        Self::with_source(err.to_string(), err)
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(err.to_string(), err)
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;
