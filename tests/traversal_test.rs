//! Tests for TraversalService
//!
//! - first step resolution by aggregate option count per name
//! - option pooling across same-named steps of one tree
//! - advance/follow views and the interactive walk

use std::sync::Mutex;

use rstest::rstest;

use dectree::application::services::WalkOutcome;
use dectree::application::views::StepView;
use dectree::application::ApplicationError;
use dectree::domain::{OptionDraft, OptionId, PathId, SolutionId, StepDraft, StepId, TreeId};
use dectree::infrastructure::di::ServiceContainer;
use dectree::infrastructure::traits::{SelectionItem, Selector};
use dectree::util::testing::{init_test_setup, test_container};

/// Builds trees through the services, as an administrator would.
struct Author {
    c: ServiceContainer,
    tree: TreeId,
}

impl Author {
    fn new() -> Self {
        init_test_setup();
        let c = test_container().unwrap();
        let tree = c.trees.create(&c.principal, "Patterns", "").unwrap().id;
        Self { c, tree }
    }

    fn path(&self, name: &str) -> PathId {
        self.c
            .paths
            .create(&self.c.principal, name, Some(self.tree))
            .unwrap()
            .id
    }

    fn step(&self, path: PathId, name: &str, first: bool) -> StepId {
        let draft = StepDraft {
            name: name.into(),
            is_first: first,
            is_final: false,
            solution: None,
        };
        self.c
            .steps
            .create(&self.c.principal, path, &draft, &[])
            .unwrap()
            .id
    }

    fn final_step(&self, path: PathId, name: &str, solution: SolutionId) -> StepId {
        let draft = StepDraft {
            name: name.into(),
            is_first: false,
            is_final: true,
            solution: Some(solution),
        };
        self.c
            .steps
            .create(&self.c.principal, path, &draft, &[])
            .unwrap()
            .id
    }

    fn solution(&self, name: &str) -> SolutionId {
        self.c
            .solutions
            .create(&self.c.principal, name, "", None)
            .unwrap()
            .id
    }

    fn option(&self, step: StepId, name: &str, next: Option<StepId>) -> OptionId {
        let draft = OptionDraft {
            name: name.into(),
            step,
            next_step: next,
        };
        self.c
            .options
            .create(&self.c.principal, &draft)
            .unwrap()
            .id
    }

    fn options(&self, step: StepId, count: usize) {
        for i in 0..count {
            self.option(step, &format!("{i}"), None);
        }
    }
}

fn option_names(view: &StepView) -> Vec<String> {
    match view {
        StepView::Options { options, .. } => {
            let mut names: Vec<String> = options.iter().map(|o| o.name.clone()).collect();
            names.sort();
            names
        }
        StepView::Solution { .. } => panic!("expected options, got {view:?}"),
    }
}

// ============================================================
// first_step
// ============================================================

#[test]
fn given_tree_without_paths_when_first_step_then_returns_none() {
    let author = Author::new();
    assert_eq!(author.c.traversal.first_step(author.tree).unwrap(), None);
}

#[test]
fn given_paths_without_first_step_when_first_step_then_returns_none() {
    let author = Author::new();
    let p = author.path("P1");
    let s = author.step(p, "Middle", false);
    author.options(s, 2);

    assert_eq!(author.c.traversal.first_step(author.tree).unwrap(), None);
}

#[test]
fn given_unknown_tree_when_first_step_then_tree_not_found() {
    let author = Author::new();
    let result = author.c.traversal.first_step(TreeId::new());
    assert!(matches!(result, Err(ApplicationError::TreeNotFound(_))));
}

#[test]
fn given_same_named_first_steps_when_first_step_then_pools_all_options() {
    // P1: "First Step" with 3 options, P2: "First Step" with 1 option
    let author = Author::new();
    let p1 = author.path("P1");
    let p2 = author.path("P2");
    let s1 = author.step(p1, "First Step", true);
    let s2 = author.step(p2, "First Step", true);
    author.options(s1, 3);
    author.option(s2, "x", None);

    let view = author.c.traversal.first_step(author.tree).unwrap().unwrap();

    assert_eq!(view.name(), "First Step");
    assert_eq!(option_names(&view), vec!["0", "1", "2", "x"]);
}

#[test]
fn given_three_single_option_steps_against_one_two_option_step_when_first_step_then_higher_aggregate_wins(
) {
    let author = Author::new();
    for i in 0..3 {
        let p = author.path(&format!("P{i}"));
        let s = author.step(p, "First Step", true);
        author.options(s, 1);
    }
    let p = author.path("P3");
    let other = author.step(p, "Another First Step", true);
    author.options(other, 2);

    let view = author.c.traversal.first_step(author.tree).unwrap().unwrap();

    // aggregate 3 beats aggregate 2
    assert_eq!(view.name(), "First Step");
    assert_eq!(option_names(&view).len(), 3);
}

#[test]
fn given_single_rich_step_when_first_step_then_beats_many_poor_ones() {
    let author = Author::new();
    for i in 0..2 {
        let p = author.path(&format!("P{i}"));
        let s = author.step(p, "First Step", true);
        author.options(s, 1);
    }
    let p = author.path("P2");
    let other = author.step(p, "Another First Step", true);
    author.options(other, 3);

    let view = author.c.traversal.first_step(author.tree).unwrap().unwrap();
    assert_eq!(view.name(), "Another First Step");
}

#[rstest]
#[case("Beta", "Alpha", "Alpha")]
#[case("Alpha", "Beta", "Alpha")]
fn given_equal_aggregates_when_first_step_then_smallest_name_wins(
    #[case] created_first: &str,
    #[case] created_second: &str,
    #[case] expected: &str,
) {
    let author = Author::new();
    let p1 = author.path("P1");
    let p2 = author.path("P2");
    let a = author.step(p1, created_first, true);
    let b = author.step(p2, created_second, true);
    author.options(a, 2);
    author.options(b, 2);

    let view = author.c.traversal.first_step(author.tree).unwrap().unwrap();
    assert_eq!(view.name(), expected);
}

#[test]
fn given_unchanged_tree_when_first_step_twice_then_results_are_identical() {
    let author = Author::new();
    let p1 = author.path("P1");
    let p2 = author.path("P2");
    let s1 = author.step(p1, "Start", true);
    let s2 = author.step(p2, "Begin", true);
    author.options(s1, 2);
    author.options(s2, 2);

    let first = author.c.traversal.first_step(author.tree).unwrap();
    let second = author.c.traversal.first_step(author.tree).unwrap();
    assert_eq!(first, second);
}

#[test]
fn given_first_step_in_other_tree_when_first_step_then_ignores_it() {
    let author = Author::new();
    let other_tree = author
        .c
        .trees
        .create(&author.c.principal, "Other", "")
        .unwrap()
        .id;
    let foreign = author
        .c
        .paths
        .create(&author.c.principal, "Foreign", Some(other_tree))
        .unwrap()
        .id;
    let s = author.step(foreign, "Elsewhere", true);
    author.options(s, 5);

    let p = author.path("P1");
    let mine = author.step(p, "Mine", true);
    author.options(mine, 1);

    let view = author.c.traversal.first_step(author.tree).unwrap().unwrap();
    assert_eq!(view.name(), "Mine");
}

// ============================================================
// options_for
// ============================================================

#[test]
fn given_same_named_steps_on_different_paths_when_options_for_then_returns_union() {
    let author = Author::new();
    let p1 = author.path("P1");
    let p2 = author.path("P2");
    let a = author.step(p1, "Second Step", false);
    let b = author.step(p2, "Second Step", false);
    author.option(a, "left", None);
    author.option(b, "right", None);
    author.option(b, "left", None);

    let options = author
        .c
        .traversal
        .options_for(author.tree, "Second Step")
        .unwrap();

    let mut names: Vec<&str> = options.iter().map(|o| o.name.as_str()).collect();
    names.sort();
    // duplicate names are kept
    assert_eq!(names, vec!["left", "left", "right"]);
    assert!(options.iter().any(|o| o.step_id == a));
    assert!(options.iter().any(|o| o.step_id == b));
}

#[test]
fn given_unknown_name_when_options_for_then_returns_empty() {
    let author = Author::new();
    let p = author.path("P1");
    let s = author.step(p, "Known", false);
    author.options(s, 1);

    let options = author.c.traversal.options_for(author.tree, "Unknown").unwrap();
    assert!(options.is_empty());
}

// ============================================================
// advance / follow
// ============================================================

#[test]
fn given_final_step_when_advance_then_returns_solution() {
    let author = Author::new();
    let p = author.path("P1");
    let solution = author.solution("Strategy Pattern");
    let end = author.final_step(p, "Done", solution);

    let view = author.c.traversal.advance(author.tree, end).unwrap();

    match view {
        StepView::Solution { name, solution: s } => {
            assert_eq!(name, "Done");
            assert_eq!(s.pk, solution);
            assert_eq!(s.slug, "strategy-pattern");
        }
        other => panic!("expected solution, got {other:?}"),
    }
}

#[test]
fn given_internal_step_when_advance_then_returns_pooled_options() {
    let author = Author::new();
    let p1 = author.path("P1");
    let p2 = author.path("P2");
    let a = author.step(p1, "Second Step", false);
    let b = author.step(p2, "Second Step", false);
    author.option(a, "one", None);
    author.option(b, "two", None);

    let view = author.c.traversal.advance(author.tree, a).unwrap();

    assert_eq!(view.name(), "Second Step");
    assert_eq!(option_names(&view), vec!["one", "two"]);
}

#[test]
fn given_unknown_step_when_advance_then_step_not_found() {
    let author = Author::new();
    let result = author.c.traversal.advance(author.tree, StepId::new());
    assert!(matches!(result, Err(ApplicationError::StepNotFound(_))));
}

#[test]
fn given_option_with_next_step_when_follow_then_advances() {
    let author = Author::new();
    let p = author.path("P1");
    let solution = author.solution("Observer");
    let start = author.step(p, "Start", true);
    let end = author.final_step(p, "End", solution);
    let go = author.option(start, "go", Some(end));
    let stop = author.option(start, "stop", None);

    let view = author.c.traversal.follow(author.tree, go).unwrap().unwrap();
    assert!(matches!(view, StepView::Solution { .. }));
    assert_eq!(view.name(), "End");

    assert_eq!(author.c.traversal.follow(author.tree, stop).unwrap(), None);
}

// ============================================================
// walk
// ============================================================

/// Selector replaying a scripted sequence of choices by option name.
struct ScriptedSelector {
    choices: Mutex<Vec<Option<&'static str>>>,
}

impl ScriptedSelector {
    fn new(choices: &[Option<&'static str>]) -> Self {
        let mut choices = choices.to_vec();
        choices.reverse();
        Self {
            choices: Mutex::new(choices),
        }
    }
}

impl Selector for ScriptedSelector {
    fn select_one(
        &self,
        items: &[SelectionItem],
        _prompt: &str,
    ) -> Result<Option<SelectionItem>, String> {
        let next = self
            .choices
            .lock()
            .map_err(|e| e.to_string())?
            .pop()
            .ok_or("script exhausted")?;
        match next {
            None => Ok(None),
            Some(name) => items
                .iter()
                .find(|item| item.display.starts_with(&format!("{name} [")))
                .cloned()
                .map(Some)
                .ok_or_else(|| format!("no item named {name}")),
        }
    }
}

fn walkable() -> (Author, SolutionId) {
    let author = Author::new();
    let p = author.path("P1");
    let solution = author.solution("Builder");
    let start = author.step(p, "Start", true);
    let middle = author.step(p, "Middle", false);
    let end = author.final_step(p, "End", solution);
    author.option(start, "next", Some(middle));
    author.option(start, "nowhere", None);
    author.option(middle, "finish", Some(end));
    (author, solution)
}

#[test]
fn given_scripted_choices_when_walking_then_reaches_solution() {
    let (author, solution) = walkable();
    let selector = ScriptedSelector::new(&[Some("next"), Some("finish")]);

    let walk = author.c.traversal.walk(author.tree, &selector).unwrap();

    assert_eq!(walk.visited, vec!["Start", "Middle", "End"]);
    match walk.outcome {
        WalkOutcome::Solution(view) => assert_eq!(view.pk, solution),
        other => panic!("expected solution, got {other:?}"),
    }
}

#[test]
fn given_cancelled_selection_when_walking_then_stops() {
    let (author, _) = walkable();
    let selector = ScriptedSelector::new(&[Some("next"), None]);

    let walk = author.c.traversal.walk(author.tree, &selector).unwrap();

    assert_eq!(walk.visited, vec!["Start", "Middle"]);
    assert_eq!(walk.outcome, WalkOutcome::Cancelled);
}

#[test]
fn given_option_without_next_step_when_walking_then_dead_end() {
    let (author, _) = walkable();
    let selector = ScriptedSelector::new(&[Some("nowhere")]);

    let walk = author.c.traversal.walk(author.tree, &selector).unwrap();

    assert_eq!(walk.visited, vec!["Start"]);
    assert_eq!(walk.outcome, WalkOutcome::DeadEnd);
}

#[test]
fn given_tree_without_entry_point_when_walking_then_no_entry_point() {
    let author = Author::new();
    let selector = ScriptedSelector::new(&[]);

    let walk = author.c.traversal.walk(author.tree, &selector).unwrap();

    assert!(walk.visited.is_empty());
    assert_eq!(walk.outcome, WalkOutcome::NoEntryPoint);
}

#[test]
fn given_failing_selector_when_walking_then_selection_error() {
    let (author, _) = walkable();
    let selector = ScriptedSelector::new(&[Some("does-not-exist")]);

    let result = author.c.traversal.walk(author.tree, &selector);
    assert!(matches!(result, Err(ApplicationError::Selection(_))));
}
