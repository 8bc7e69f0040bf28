//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::{InfraError, StoreError};

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Infra(InfraError::Store(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

fn store_exit_code(e: &StoreError) -> i32 {
    match e {
        StoreError::Integrity(_) | StoreError::Poisoned => exitcode::SOFTWARE,
        StoreError::Corrupt { .. } => exitcode::DATAERR,
        StoreError::Sqlite(_) => exitcode::UNAVAILABLE,
        StoreError::Migration(_) => exitcode::CANTCREAT,
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(_) => exitcode::DATAERR,
        ApplicationError::TreeNotFound(_)
        | ApplicationError::PathNotFound(_)
        | ApplicationError::StepNotFound(_)
        | ApplicationError::OptionNotFound(_)
        | ApplicationError::SolutionNotFound(_) => exitcode::NOINPUT,
        ApplicationError::DuplicateTreeName { .. } => exitcode::DATAERR,
        ApplicationError::PermissionDenied { .. } => exitcode::NOPERM,
        ApplicationError::Store(e) => store_exit_code(e),
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::Selection(_) => exitcode::SOFTWARE,
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Store(e) => store_exit_code(e),
                InfraError::Application(e) => application_exit_code(e),
            },
        }
    }
}
