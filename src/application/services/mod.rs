//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the [`GraphStore`] boundary trait but are themselves
//! concrete structs, not traits. Every mutation runs inside one write
//! transaction: lookups, validation and writes either all commit or none
//! of them are visible.

mod cleanup;
mod option;
mod path;
mod solution;
mod step;
mod traversal;
mod tree;

pub use cleanup::CleanupCoordinator;
pub use option::{OptionService, OptionUpdate};
pub use path::PathService;
pub use solution::{SolutionService, SolutionUpdate};
pub use step::StepService;
pub use traversal::{TraversalService, Walk, WalkOutcome};
pub use tree::{TreeService, TreeUpdate};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    OptionId, Path, PathId, Principal, Solution, SolutionId, Step, StepId, StepOption, Tree,
    TreeId,
};
use crate::infrastructure::traits::{GraphStore, GraphTx};

/// Writes are reserved to superusers; reads are open.
fn authorize_write(actor: &Principal) -> ApplicationResult<()> {
    if actor.superuser {
        Ok(())
    } else {
        Err(ApplicationError::PermissionDenied {
            actor: actor.name.clone(),
        })
    }
}

fn load_tree(tx: &dyn GraphTx, id: TreeId) -> ApplicationResult<Tree> {
    tx.get_tree(id)?.ok_or(ApplicationError::TreeNotFound(id))
}

fn load_path(tx: &dyn GraphTx, id: PathId) -> ApplicationResult<Path> {
    tx.get_path(id)?.ok_or(ApplicationError::PathNotFound(id))
}

fn load_step(tx: &dyn GraphTx, id: StepId) -> ApplicationResult<Step> {
    tx.get_step(id)?.ok_or(ApplicationError::StepNotFound(id))
}

fn load_option(tx: &dyn GraphTx, id: OptionId) -> ApplicationResult<StepOption> {
    tx.get_option(id)?.ok_or(ApplicationError::OptionNotFound(id))
}

fn load_solution(tx: &dyn GraphTx, id: SolutionId) -> ApplicationResult<Solution> {
    tx.get_solution(id)?
        .ok_or(ApplicationError::SolutionNotFound(id))
}

/// Shared handle type of every service.
type Store = std::sync::Arc<dyn GraphStore>;
