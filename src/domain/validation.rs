//! Structural rules checked before any mutation is committed.
//!
//! Each rule is a plain function over a candidate state. Services call
//! them explicitly at every create/update site; the SQLite schema carries
//! the same rules as CHECK constraints.

use std::sync::OnceLock;

use regex::Regex;
use tracing::error;

use crate::domain::entities::{Principal, SolutionId, StepId, StepRole, NAME_MAX_LENGTH};
use crate::domain::error::{DomainError, DomainResult};

pub const FIRST_AND_FINAL: &str = "A step cannot be both first and final.";
pub const SOLUTION_ONLY_ON_FINAL: &str =
    "A solution can only be (and has to be) set on the final step.";
pub const STEPS_EQUAL: &str = "A step cannot be the same as the next step.";
pub const FINAL_WITH_OPTIONS: &str = "A final step cannot offer options.";

/// Step state as received from callers: independent role flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDraft {
    pub name: String,
    pub is_first: bool,
    pub is_final: bool,
    pub solution: Option<SolutionId>,
}

impl StepDraft {
    /// Flag view of an existing role, used when only the name changes.
    pub fn from_role(name: impl Into<String>, role: StepRole) -> Self {
        Self {
            name: name.into(),
            is_first: role.is_first(),
            is_final: role.is_final(),
            solution: role.solution(),
        }
    }
}

/// Option state as received from callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDraft {
    pub name: String,
    pub step: StepId,
    pub next_step: Option<StepId>,
}

/// Validate step flags and turn them into a [`StepRole`].
///
/// Fails when the step is both first and final, or when the presence of
/// a solution does not match `is_final`.
pub fn validate_step(draft: &StepDraft, actor: &Principal) -> DomainResult<StepRole> {
    validate_name("step", &draft.name)?;

    if draft.is_first && draft.is_final {
        error!(name = %draft.name, creator = %actor.name, "Step is both first and final.");
        return Err(DomainError::InvalidStepState {
            name: draft.name.clone(),
            reason: FIRST_AND_FINAL.to_string(),
        });
    }

    match (draft.is_final, draft.solution) {
        (true, Some(solution)) => Ok(StepRole::Final(solution)),
        (false, None) if draft.is_first => Ok(StepRole::Initial),
        (false, None) => Ok(StepRole::Internal),
        _ => {
            error!(name = %draft.name, creator = %actor.name, "Solution is not on the final step.");
            Err(DomainError::InvalidStepState {
                name: draft.name.clone(),
                reason: SOLUTION_ONLY_ON_FINAL.to_string(),
            })
        }
    }
}

/// Validate an option: it can never lead back to the step offering it.
pub fn validate_option(draft: &OptionDraft, actor: &Principal) -> DomainResult<()> {
    validate_name("option", &draft.name)?;

    if draft.next_step == Some(draft.step) {
        error!(name = %draft.name, creator = %actor.name, "Steps are equal.");
        return Err(DomainError::InvalidOptionState {
            name: draft.name.clone(),
            reason: STEPS_EQUAL.to_string(),
        });
    }
    Ok(())
}

/// Final steps terminate traversal and therefore offer no options.
///
/// `outgoing` is the number of options the step offers once the pending
/// mutation is applied.
pub fn validate_terminal(
    name: &str,
    role: StepRole,
    outgoing: usize,
    actor: &Principal,
) -> DomainResult<()> {
    if role.is_final() && outgoing > 0 {
        error!(name = %name, creator = %actor.name, outgoing, "Final step offers options.");
        return Err(DomainError::InvalidStepState {
            name: name.to_string(),
            reason: FINAL_WITH_OPTIONS.to_string(),
        });
    }
    Ok(())
}

pub fn validate_name(kind: &'static str, name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidName {
            kind,
            reason: "name must not be blank".to_string(),
        });
    }
    let len = name.chars().count();
    if len > NAME_MAX_LENGTH {
        return Err(DomainError::InvalidName {
            kind,
            reason: format!("{len} characters exceed the limit of {NAME_MAX_LENGTH}"),
        });
    }
    Ok(())
}

fn slug_regex() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("static slug pattern"))
}

pub fn validate_slug(slug: &str) -> DomainResult<()> {
    if slug_regex().is_match(slug) {
        Ok(())
    } else {
        Err(DomainError::InvalidSlug(slug.to_string()))
    }
}
