use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for nxinstrument operations.
#[derive(Debug, Error)]
pub enum NexusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse NeXus JSON from {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write NeXus JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse writer config from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document does not have the shape of an instrument at all.
    #[error("Provided document not recognised as a valid instrument: {0}")]
    Structural(String),

    #[error("depends_on chain contains a cycle: {}", chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    #[error("depends_on reference to '{transformation}' in component '{component}' does not resolve")]
    UnresolvedDependency {
        component: String,
        transformation: String,
    },

    #[error("A component named '{0}' already exists in the instrument")]
    DuplicateComponent(String),

    #[error("No component named '{0}' in the instrument")]
    UnknownComponent(String),

    #[error("Component '{name}' is still referenced by: {}", dependents.join(", "))]
    ComponentInUse {
        name: String,
        dependents: Vec<String>,
    },

    #[error("Pixel offset and detector number arrays disagree in shape: {0}")]
    PixelGridShape(String),

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}
