//! Materialised view objects returned to callers.
//!
//! These are the JSON shapes of the outer interface: options and
//! solutions keyed by `pk`, step views either listing options or carrying
//! the terminal solution.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    OptionId, Path, PathId, Solution, SolutionId, Step, StepId, StepOption, Tree, TreeId,
};
use crate::infrastructure::traits::GraphTx;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub pk: OptionId,
    pub name: String,
    pub step_id: StepId,
    pub next_step_id: Option<StepId>,
    pub creator: String,
}

impl From<&StepOption> for OptionView {
    fn from(option: &StepOption) -> Self {
        Self {
            pk: option.id,
            name: option.name.clone(),
            step_id: option.step,
            next_step_id: option.next_step,
            creator: option.creator.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionView {
    pub pk: SolutionId,
    pub name: String,
    pub description: String,
    pub slug: String,
    pub creator: String,
}

impl From<&Solution> for SolutionView {
    fn from(solution: &Solution) -> Self {
        Self {
            pk: solution.id,
            name: solution.name.clone(),
            description: solution.description.clone(),
            slug: solution.slug.clone(),
            creator: solution.creator.clone(),
        }
    }
}

/// What a walker sees at one step: the choices, or the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepView {
    Options {
        name: String,
        options: Vec<OptionView>,
    },
    Solution {
        name: String,
        solution: SolutionView,
    },
}

impl StepView {
    pub fn name(&self) -> &str {
        match self {
            StepView::Options { name, .. } | StepView::Solution { name, .. } => name,
        }
    }
}

/// Full record of one step with its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDetailView {
    pub pk: StepId,
    pub name: String,
    pub role: String,
    pub is_first: bool,
    pub is_final: bool,
    pub solution: Option<SolutionId>,
    pub paths: Vec<PathId>,
    pub options: Vec<OptionView>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl StepDetailView {
    pub(crate) fn load(tx: &dyn GraphTx, step: Step) -> ApplicationResult<Self> {
        let options = tx.options_of_step(step.id)?;
        Ok(Self {
            pk: step.id,
            role: step.role.to_string(),
            is_first: step.role.is_first(),
            is_final: step.role.is_final(),
            solution: step.role.solution(),
            paths: step.paths.into_iter().collect(),
            options: options.iter().map(OptionView::from).collect(),
            name: step.name,
            creator: step.creator,
            created_at: step.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathView {
    pub pk: PathId,
    pub name: String,
    /// Solution of the path's final step
    pub solution: Option<SolutionView>,
    pub steps: Vec<StepDetailView>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl PathView {
    pub(crate) fn load(tx: &dyn GraphTx, path: Path) -> ApplicationResult<Self> {
        let steps = tx.steps_of_path(path.id)?;
        let solution = path_solution(tx, &steps)?;
        let steps = steps
            .into_iter()
            .map(|step| StepDetailView::load(tx, step))
            .collect::<ApplicationResult<Vec<_>>>()?;
        Ok(Self {
            pk: path.id,
            name: path.name,
            solution,
            steps,
            creator: path.creator,
            created_at: path.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeView {
    pub pk: TreeId,
    pub name: String,
    pub description: String,
    pub paths: Vec<PathView>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl TreeView {
    pub(crate) fn load(tx: &dyn GraphTx, tree: Tree) -> ApplicationResult<Self> {
        let mut paths = Vec::with_capacity(tree.paths.len());
        for id in &tree.paths {
            let path = tx.get_path(*id)?.ok_or(ApplicationError::PathNotFound(*id))?;
            paths.push(PathView::load(tx, path)?);
        }
        Ok(Self {
            pk: tree.id,
            name: tree.name,
            description: tree.description,
            paths,
            creator: tree.creator,
            created_at: tree.created_at,
        })
    }
}

/// Outcome of deleting a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub path: PathId,
    /// Steps deleted because the path was their last owner
    pub removed_steps: Vec<StepId>,
    /// Steps left in place, still owned by other paths
    pub kept_steps: Vec<StepId>,
}

/// Solution of the first final step among `steps`, if any.
pub(crate) fn path_solution(
    tx: &dyn GraphTx,
    steps: &[Step],
) -> ApplicationResult<Option<SolutionView>> {
    let Some(id) = steps.iter().find_map(|step| step.role.solution()) else {
        return Ok(None);
    };
    let solution = tx
        .get_solution(id)?
        .ok_or(ApplicationError::SolutionNotFound(id))?;
    Ok(Some(SolutionView::from(&solution)))
}
