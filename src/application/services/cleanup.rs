//! Path deletion with orphan-step cleanup.

use tracing::{debug, info};

use crate::application::views::CleanupReport;
use crate::application::ApplicationResult;
use crate::domain::{orphaned_steps, PathId};
use crate::infrastructure::traits::GraphTx;

use super::load_path;

/// Removes a path and the steps it was the last owner of.
///
/// Runs inside the caller's write transaction. The ownership sets are read
/// after the writer lock is taken, so two deletions of paths sharing a
/// step cannot both see the other path as a remaining owner.
pub struct CleanupCoordinator;

impl CleanupCoordinator {
    pub fn delete_path(tx: &dyn GraphTx, path: PathId) -> ApplicationResult<CleanupReport> {
        let path = load_path(tx, path)?;
        let memberships = tx.step_memberships(path.id)?;
        debug!(
            "delete_path: path={} steps={}",
            path.id,
            memberships.len()
        );
        let plan = orphaned_steps(path.id, &memberships);

        tx.delete_path(path.id)?;
        for step in &plan.removed {
            tx.delete_step(*step)?;
        }

        info!(
            path = %path.id,
            name = %path.name,
            removed = plan.removed.len(),
            kept = plan.kept.len(),
            "path deleted"
        );
        Ok(CleanupReport {
            path: path.id,
            removed_steps: plan.removed,
            kept_steps: plan.kept,
        })
    }
}
