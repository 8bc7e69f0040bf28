//! Domain layer: entities and structural rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod cleanup;
pub mod entities;
pub mod error;
pub mod graph;
pub mod validation;

pub use cleanup::{orphaned_steps, CleanupPlan};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use graph::{FirstStepCandidate, StepNode, TreeGraph};
pub use validation::{
    validate_name, validate_option, validate_slug, validate_step, validate_terminal, OptionDraft,
    StepDraft,
};
