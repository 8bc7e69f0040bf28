//! Shared-ownership cleanup when a path is removed.
//!
//! A step is owned by every path listing it. Removing a path removes the
//! steps for which it was the last owner and leaves shared steps alone.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::entities::{PathId, StepId};

/// Outcome of removing one path from the ownership sets of its steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    /// Steps with no remaining owner; deleted together with the path
    pub removed: Vec<StepId>,
    /// Steps still owned by at least one other path
    pub kept: Vec<StepId>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.kept.is_empty()
    }
}

/// Decide which steps become orphans when `path` goes away.
///
/// `memberships` maps every step of the path to its full owning-path set
/// as read inside the deleting transaction. Entries whose set does not
/// contain `path` are not affected.
pub fn orphaned_steps(
    path: PathId,
    memberships: &BTreeMap<StepId, BTreeSet<PathId>>,
) -> CleanupPlan {
    let mut plan = CleanupPlan::default();
    for (step, owners) in memberships {
        if !owners.contains(&path) {
            continue;
        }
        if owners.iter().any(|owner| *owner != path) {
            plan.kept.push(*step);
        } else {
            plan.removed.push(*step);
        }
    }
    plan
}
