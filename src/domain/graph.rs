//! Arena-backed step graph of a single tree.
//!
//! Steps may be shared by several paths and several steps may carry the
//! same name. The graph keeps one node per step record and indexes them
//! by identifier and by name; traversal treats same-named steps as one
//! logical node and pools their options.

use std::collections::{BTreeMap, HashMap};

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::entities::{Step, StepId, StepOption, TreeId};

/// A step together with the options it offers.
#[derive(Debug, Clone)]
pub struct StepNode {
    pub step: Step,
    pub options: Vec<StepOption>,
}

/// Aggregate over all first steps sharing one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstStepCandidate {
    pub name: String,
    /// Number of distinct step records carrying the name
    pub steps: usize,
    /// Options summed across those records
    pub options: usize,
}

/// Step graph of one tree, built from a consistent storage snapshot.
#[derive(Debug)]
pub struct TreeGraph {
    tree: TreeId,
    arena: Arena<StepNode>,
    by_id: HashMap<StepId, Index>,
    /// Names in lexicographic order, nodes in insertion order
    by_name: BTreeMap<String, Vec<Index>>,
}

impl TreeGraph {
    pub fn new(tree: TreeId) -> Self {
        Self {
            tree,
            arena: Arena::new(),
            by_id: HashMap::new(),
            by_name: BTreeMap::new(),
        }
    }

    /// Build the graph from the steps reachable through the tree's paths
    /// and the options those steps offer.
    ///
    /// Steps and options are ordered by creation time (then id) so that
    /// every read of an unchanged tree yields the same result. Options of
    /// steps outside the tree are ignored.
    #[instrument(level = "debug", skip(steps, options), fields(steps = steps.len(), options = options.len()))]
    pub fn build(tree: TreeId, mut steps: Vec<Step>, mut options: Vec<StepOption>) -> Self {
        steps.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        options.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut graph = Self::new(tree);
        for step in steps {
            graph.insert_step(step);
        }
        let mut dropped = 0usize;
        for option in options {
            if !graph.attach_option(option) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "options of steps outside the tree ignored");
        }
        graph
    }

    /// Insert a step; a step already present keeps its node.
    #[instrument(level = "trace", skip(self, step), fields(step = %step.id))]
    pub fn insert_step(&mut self, step: Step) -> Index {
        if let Some(&idx) = self.by_id.get(&step.id) {
            return idx;
        }
        let id = step.id;
        let name = step.name.clone();
        let idx = self.arena.insert(StepNode {
            step,
            options: Vec::new(),
        });
        self.by_id.insert(id, idx);
        self.by_name.entry(name).or_default().push(idx);
        idx
    }

    /// Attach an option to its owning step. Returns false when the owner
    /// is not part of the graph.
    #[instrument(level = "trace", skip(self, option), fields(option = %option.id))]
    pub fn attach_option(&mut self, option: StepOption) -> bool {
        let Some(&idx) = self.by_id.get(&option.step) else {
            return false;
        };
        match self.arena.get_mut(idx) {
            Some(node) => {
                node.options.push(option);
                true
            }
            None => false,
        }
    }

    pub fn tree(&self) -> TreeId {
        self.tree
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get(&self, id: StepId) -> Option<&StepNode> {
        self.by_id.get(&id).and_then(|&idx| self.arena.get(idx))
    }

    pub fn contains(&self, id: StepId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// All step records carrying `name`, in creation order.
    pub fn steps_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a StepNode> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|&idx| self.arena.get(idx))
    }

    /// Every node, grouped by step name in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &StepNode> {
        self.by_name
            .values()
            .flatten()
            .filter_map(|&idx| self.arena.get(idx))
    }

    /// First steps grouped by name, in lexicographic name order.
    #[instrument(level = "debug", skip(self), fields(tree = %self.tree))]
    pub fn first_step_candidates(&self) -> Vec<FirstStepCandidate> {
        self.by_name
            .iter()
            .filter_map(|(name, indices)| {
                let firsts: Vec<&StepNode> = indices
                    .iter()
                    .filter_map(|&idx| self.arena.get(idx))
                    .filter(|node| node.step.role.is_first())
                    .collect();
                if firsts.is_empty() {
                    return None;
                }
                Some(FirstStepCandidate {
                    name: name.clone(),
                    steps: firsts.len(),
                    options: firsts.iter().map(|node| node.options.len()).sum(),
                })
            })
            .collect()
    }

    /// Name of the step to present first.
    ///
    /// With several distinct first-step names the one with the highest
    /// aggregate option count wins; equal counts fall back to the
    /// lexicographically smallest name.
    #[instrument(level = "debug", skip(self), fields(tree = %self.tree))]
    pub fn first_step_name(&self) -> Option<String> {
        let candidates = self.first_step_candidates();
        if candidates.len() > 1 {
            debug!(?candidates, "ambiguous first step");
        }
        candidates
            .into_iter()
            .min_by(|a, b| b.options.cmp(&a.options).then_with(|| a.name.cmp(&b.name)))
            .map(|candidate| candidate.name)
    }

    /// Options of every step named `name`, pooled and not de-duplicated.
    #[instrument(level = "trace", skip(self))]
    pub fn options_for(&self, name: &str) -> Vec<&StepOption> {
        self.steps_named(name)
            .flat_map(|node| node.options.iter())
            .collect()
    }
}
