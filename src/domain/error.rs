//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent structural rule violations of the decision graph.
/// These are independent of storage and presentation concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid step '{name}': {reason}")]
    InvalidStepState { name: String, reason: String },

    #[error("invalid option '{name}': {reason}")]
    InvalidOptionState { name: String, reason: String },

    #[error("invalid {kind} name: {reason}")]
    InvalidName { kind: &'static str, reason: String },

    #[error("invalid slug '{0}': only lowercase letters, digits and single dashes are allowed")]
    InvalidSlug(String),

    #[error("solution '{name}' is still referenced by {steps} final step(s)")]
    SolutionInUse { name: String, steps: usize },
}

/// Result type for domain rules.
pub type DomainResult<T> = Result<T, DomainError>;
