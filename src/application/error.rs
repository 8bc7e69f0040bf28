//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, OptionId, PathId, SolutionId, StepId, TreeId};
use crate::infrastructure::error::StoreError;

/// Application errors wrap domain errors and add lookup and access context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("tree not found: {0}")]
    TreeNotFound(TreeId),

    #[error("path not found: {0}")]
    PathNotFound(PathId),

    #[error("step not found: {0}")]
    StepNotFound(StepId),

    #[error("option not found: {0}")]
    OptionNotFound(OptionId),

    #[error("solution not found: {0}")]
    SolutionNotFound(SolutionId),

    #[error("tree '{name}' already exists for this creator")]
    DuplicateTreeName { name: String },

    #[error("permission denied: '{actor}' is not allowed to modify trees")]
    PermissionDenied { actor: String },

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("selection failed: {0}")]
    Selection(String),
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
