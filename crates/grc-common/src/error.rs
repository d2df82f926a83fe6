//! Error types for OpenGRC

use crate::domain::RepositoryError;
use thiserror::Error;

/// OpenGRC error type
#[derive(Error, Debug)]
pub enum GrcError {
    /// Catalog feed failed validation
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Framework not found
    #[error("framework not found: {0}")]
    FrameworkNotFound(String),

    /// Requirement is not a leaf of the framework
    #[error("requirement {requirement} is not an assessable requirement of {framework}")]
    RequirementNotFound {
        framework: String,
        requirement: String,
    },

    /// Control not found for tenant
    #[error("control not found: {0}")]
    ControlNotFound(String),

    /// Catalog controls cannot be removed
    #[error("control {0} is not a custom control")]
    NotCustomControl(String),

    /// Addressable decision submitted for a required requirement
    #[error("requirement {0} is required; addressable decisions apply only to addressable requirements")]
    AddressableDecisionNotAllowed(String),

    /// Navigation action needs a current requirement
    #[error("no requirement is currently selected")]
    NoCurrentRequirement,

    /// Caller input rejected
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persistence failure
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("config error: {0}")]
    ConfigError(String),
}

/// Result type for OpenGRC
pub type GrcResult<T> = Result<T, GrcError>;
