//! I/O boundary traits for testability
//!
//! These traits abstract storage and interactive input, allowing services
//! to be tested with in-memory databases and mock selectors.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{
    OptionId, Path, PathId, Solution, SolutionId, Step, StepId, StepOption, Tree, TreeId,
};
use crate::infrastructure::error::StoreResult;

/// Transactional access to the persisted decision graph.
pub trait GraphStore: Send + Sync {
    /// Begin a write transaction.
    ///
    /// Writers are serialised before their first read, so reference counts
    /// and validation inputs read inside the transaction cannot go stale.
    fn write(&self) -> StoreResult<Box<dyn GraphTx + '_>>;

    /// Begin a read transaction giving a consistent snapshot.
    fn read(&self) -> StoreResult<Box<dyn GraphTx + '_>>;
}

/// One open transaction. Dropping it without [`GraphTx::commit`] rolls
/// every write back.
pub trait GraphTx {
    // trees
    fn insert_tree(&self, tree: &Tree) -> StoreResult<()>;
    /// Update name and description.
    fn update_tree(&self, tree: &Tree) -> StoreResult<()>;
    /// Replace the tree's path set.
    fn set_tree_paths(&self, tree: TreeId, paths: &[PathId]) -> StoreResult<()>;
    fn get_tree(&self, id: TreeId) -> StoreResult<Option<Tree>>;
    fn find_tree(&self, creator: &str, name: &str) -> StoreResult<Option<Tree>>;
    fn list_trees(&self) -> StoreResult<Vec<Tree>>;
    fn delete_tree(&self, id: TreeId) -> StoreResult<bool>;

    // paths
    fn insert_path(&self, path: &Path) -> StoreResult<()>;
    fn update_path(&self, path: &Path) -> StoreResult<()>;
    fn get_path(&self, id: PathId) -> StoreResult<Option<Path>>;
    fn list_paths(&self) -> StoreResult<Vec<Path>>;
    fn add_path_to_tree(&self, tree: TreeId, path: PathId) -> StoreResult<()>;
    fn attach_step(&self, path: PathId, step: StepId) -> StoreResult<()>;
    /// Owning-path set of every step listed by `path`.
    fn step_memberships(&self, path: PathId) -> StoreResult<BTreeMap<StepId, BTreeSet<PathId>>>;
    fn delete_path(&self, id: PathId) -> StoreResult<bool>;

    // steps
    /// Insert the step row and its owning-path memberships.
    fn insert_step(&self, step: &Step) -> StoreResult<()>;
    /// Update name and role.
    fn update_step(&self, step: &Step) -> StoreResult<()>;
    fn get_step(&self, id: StepId) -> StoreResult<Option<Step>>;
    fn steps_of_path(&self, path: PathId) -> StoreResult<Vec<Step>>;
    /// Distinct steps reachable through any path of the tree.
    fn steps_of_tree(&self, tree: TreeId) -> StoreResult<Vec<Step>>;
    fn delete_step(&self, id: StepId) -> StoreResult<bool>;

    // options
    fn insert_option(&self, option: &StepOption) -> StoreResult<()>;
    fn update_option(&self, option: &StepOption) -> StoreResult<()>;
    fn get_option(&self, id: OptionId) -> StoreResult<Option<StepOption>>;
    fn options_of_step(&self, step: StepId) -> StoreResult<Vec<StepOption>>;
    /// Options offered by any step of the tree.
    fn options_of_tree(&self, tree: TreeId) -> StoreResult<Vec<StepOption>>;
    fn count_options(&self, step: StepId) -> StoreResult<usize>;
    fn delete_option(&self, id: OptionId) -> StoreResult<bool>;

    // solutions
    fn insert_solution(&self, solution: &Solution) -> StoreResult<()>;
    fn update_solution(&self, solution: &Solution) -> StoreResult<()>;
    fn get_solution(&self, id: SolutionId) -> StoreResult<Option<Solution>>;
    fn list_solutions(&self) -> StoreResult<Vec<Solution>>;
    /// Number of final steps carrying the solution.
    fn final_steps_using(&self, id: SolutionId) -> StoreResult<usize>;
    fn delete_solution(&self, id: SolutionId) -> StoreResult<bool>;

    /// Make every write of this transaction visible.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Item for FZF-style selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionItem {
    /// Display text shown in selector
    pub display: String,
    /// Actual value (e.g., option id)
    pub value: String,
}

/// Interactive FZF-style selector abstraction.
pub trait Selector: Send + Sync {
    /// Present items to user and return selected one.
    /// Returns None if user cancels (Esc/Ctrl-C).
    fn select_one(
        &self,
        items: &[SelectionItem],
        prompt: &str,
    ) -> Result<Option<SelectionItem>, String>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real selector implementation using skim (FZF-like).
#[derive(Debug, Default)]
pub struct SkimSelector;

impl Selector for SkimSelector {
    fn select_one(
        &self,
        items: &[SelectionItem],
        prompt: &str,
    ) -> Result<Option<SelectionItem>, String> {
        use skim::prelude::*;
        use std::io::Cursor;

        if items.is_empty() {
            return Ok(None);
        }

        // Build input as newline-separated display strings
        let input = items
            .iter()
            .map(|i| i.display.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let options = SkimOptionsBuilder::default()
            .prompt(Some(prompt))
            .height(Some("50%"))
            .multi(false)
            .build()
            .map_err(|e| format!("failed to build skim options: {e}"))?;

        let item_reader = SkimItemReader::default();
        let items_arc = item_reader.of_bufread(Cursor::new(input));

        match Skim::run_with(&options, Some(items_arc)) {
            Some(out) if out.is_abort => Ok(None),
            Some(out) => Ok(out.selected_items.first().and_then(|selected| {
                let display = selected.output().to_string();
                items.iter().find(|i| i.display == display).cloned()
            })),
            None => Ok(None),
        }
    }
}
