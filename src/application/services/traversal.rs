//! Tree traversal service
//!
//! Stateless reads over one tree: which step comes first, what a step
//! offers, and where choosing an option leads. A walk session lives on
//! the client side; every call here is an independent request with its
//! own read snapshot.
//!
//! ```text
//! Start ──first_step──▶ AtStep(name) ──follow(option)──▶ AtStep(next)
//!                            │                                │
//!                            └────────────────────────────────┴──▶ AtSolution
//! ```

use tracing::{debug, instrument};

use crate::application::views::{OptionView, SolutionView, StepView};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{OptionId, Step, StepId, TreeGraph, TreeId};
use crate::infrastructure::traits::{GraphTx, SelectionItem, Selector};

use super::{load_option, load_solution, load_step, load_tree, Store};

/// How a walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Reached a final step
    Solution(SolutionView),
    /// The current step offered nothing to choose, or the chosen option
    /// leads nowhere
    DeadEnd,
    /// The tree has no first step
    NoEntryPoint,
    /// The walker aborted the selection
    Cancelled,
}

/// Record of one interactive walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    /// Names of the steps presented, in order
    pub visited: Vec<String>,
    pub outcome: WalkOutcome,
}

/// Traversal resolver over the persisted graph.
pub struct TraversalService {
    store: Store,
}

impl TraversalService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn graph(tx: &dyn GraphTx, tree: TreeId) -> ApplicationResult<TreeGraph> {
        load_tree(tx, tree)?;
        let steps = tx.steps_of_tree(tree)?;
        let options = tx.options_of_tree(tree)?;
        Ok(TreeGraph::build(tree, steps, options))
    }

    fn step_view(tx: &dyn GraphTx, graph: &TreeGraph, step: Step) -> ApplicationResult<StepView> {
        match step.role.solution() {
            Some(solution) => Ok(StepView::Solution {
                solution: SolutionView::from(&load_solution(tx, solution)?),
                name: step.name,
            }),
            None => Ok(StepView::Options {
                options: pooled(graph, &step.name),
                name: step.name,
            }),
        }
    }

    /// Entry point of the tree with its pooled options, or `None` when no
    /// path of the tree carries a first step.
    #[instrument(level = "debug", skip(self))]
    pub fn first_step(&self, tree: TreeId) -> ApplicationResult<Option<StepView>> {
        let tx = self.store.read()?;
        let graph = Self::graph(&*tx, tree)?;
        let Some(name) = graph.first_step_name() else {
            debug!("first_step: tree={} has no entry point", tree);
            return Ok(None);
        };
        Ok(Some(StepView::Options {
            options: pooled(&graph, &name),
            name,
        }))
    }

    /// Options of every step named `name` within the tree.
    pub fn options_for(&self, tree: TreeId, name: &str) -> ApplicationResult<Vec<OptionView>> {
        debug!("options_for: tree={} name={}", tree, name);
        let tx = self.store.read()?;
        let graph = Self::graph(&*tx, tree)?;
        Ok(pooled(&graph, name))
    }

    /// View of the step the walker navigated to.
    ///
    /// Final steps show their solution; any other step shows the options
    /// pooled across its same-named siblings in the tree.
    #[instrument(level = "debug", skip(self))]
    pub fn advance(&self, tree: TreeId, step: StepId) -> ApplicationResult<StepView> {
        let tx = self.store.read()?;
        let graph = Self::graph(&*tx, tree)?;
        let step = load_step(&*tx, step)?;
        Self::step_view(&*tx, &graph, step)
    }

    /// Choose `option`: advance to its next step.
    ///
    /// Returns `None` when the option does not lead anywhere.
    #[instrument(level = "debug", skip(self))]
    pub fn follow(&self, tree: TreeId, option: OptionId) -> ApplicationResult<Option<StepView>> {
        let tx = self.store.read()?;
        let graph = Self::graph(&*tx, tree)?;
        let option = load_option(&*tx, option)?;
        let Some(next) = option.next_step else {
            debug!("follow: option={} has no next step", option.id);
            return Ok(None);
        };
        let step = load_step(&*tx, next)?;
        Self::step_view(&*tx, &graph, step).map(Some)
    }

    /// Walk the tree from its first step until a solution, a dead end or
    /// a cancelled selection.
    pub fn walk(&self, tree: TreeId, selector: &dyn Selector) -> ApplicationResult<Walk> {
        let mut visited = Vec::new();
        let Some(mut current) = self.first_step(tree)? else {
            return Ok(Walk {
                visited,
                outcome: WalkOutcome::NoEntryPoint,
            });
        };

        loop {
            visited.push(current.name().to_string());
            let options = match current {
                StepView::Solution { solution, .. } => {
                    return Ok(Walk {
                        visited,
                        outcome: WalkOutcome::Solution(solution),
                    })
                }
                StepView::Options { options, .. } if options.is_empty() => {
                    return Ok(Walk {
                        visited,
                        outcome: WalkOutcome::DeadEnd,
                    })
                }
                StepView::Options { options, .. } => options,
            };

            let items: Vec<SelectionItem> = options
                .iter()
                .map(|option| SelectionItem {
                    display: selection_label(option),
                    value: option.pk.to_string(),
                })
                .collect();
            let prompt = format!("{} > ", visited.last().map(String::as_str).unwrap_or(""));

            let Some(selected) = selector
                .select_one(&items, &prompt)
                .map_err(ApplicationError::Selection)?
            else {
                return Ok(Walk {
                    visited,
                    outcome: WalkOutcome::Cancelled,
                });
            };
            let option: OptionId = selected
                .value
                .parse()
                .map_err(|e| ApplicationError::Selection(format!("{}: {e}", selected.value)))?;
            debug!("walk: selected option={}", option);

            match self.follow(tree, option)? {
                Some(next) => current = next,
                None => {
                    return Ok(Walk {
                        visited,
                        outcome: WalkOutcome::DeadEnd,
                    })
                }
            }
        }
    }
}

fn pooled(graph: &TreeGraph, name: &str) -> Vec<OptionView> {
    graph
        .options_for(name)
        .into_iter()
        .map(OptionView::from)
        .collect()
}

/// Pooled options may repeat a name; the id suffix keeps labels distinct.
fn selection_label(option: &OptionView) -> String {
    let pk = option.pk.to_string();
    format!("{} [{}]", option.name, &pk[..8])
}
