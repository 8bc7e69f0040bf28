//! Tests for the write services: validation, permissions and uniqueness
//!
//! Every rejected write must leave the stored graph unchanged.

use std::sync::Arc;

use rstest::rstest;

use dectree::application::services::{OptionUpdate, SolutionUpdate, TreeUpdate};
use dectree::application::ApplicationError;
use dectree::domain::validation::{
    FINAL_WITH_OPTIONS, FIRST_AND_FINAL, SOLUTION_ONLY_ON_FINAL, STEPS_EQUAL,
};
use dectree::domain::{
    DomainError, OptionDraft, PathId, SolutionId, StepDraft, StepId, NAME_MAX_LENGTH,
};
use dectree::infrastructure::di::ServiceContainer;
use dectree::util::testing::{init_test_setup, test_container, test_settings};

fn setup() -> (ServiceContainer, PathId) {
    init_test_setup();
    let c = test_container().unwrap();
    let tree = c.trees.create(&c.principal, "Patterns", "").unwrap().id;
    let path = c.paths.create(&c.principal, "P1", Some(tree)).unwrap().id;
    (c, path)
}

fn draft(name: &str, is_first: bool, is_final: bool, solution: Option<SolutionId>) -> StepDraft {
    StepDraft {
        name: name.into(),
        is_first,
        is_final,
        solution,
    }
}

fn step(c: &ServiceContainer, path: PathId, name: &str) -> StepId {
    c.steps
        .create(&c.principal, path, &draft(name, false, false, None), &[])
        .unwrap()
        .id
}

fn reader(c: &ServiceContainer) -> ServiceContainer {
    ServiceContainer::with_store(test_settings("bob", false), Arc::clone(&c.store))
}

fn step_reason(result: Result<impl std::fmt::Debug, ApplicationError>) -> String {
    match result {
        Err(ApplicationError::Domain(DomainError::InvalidStepState { reason, .. })) => reason,
        other => panic!("expected invalid step state, got {other:?}"),
    }
}

fn option_reason(result: Result<impl std::fmt::Debug, ApplicationError>) -> String {
    match result {
        Err(ApplicationError::Domain(DomainError::InvalidOptionState { reason, .. })) => reason,
        other => panic!("expected invalid option state, got {other:?}"),
    }
}

// ============================================================
// Steps
// ============================================================

#[test]
fn given_first_and_final_step_when_creating_then_rejected_and_nothing_stored() {
    let (c, path) = setup();
    let solution = c.solutions.create(&c.principal, "Facade", "", None).unwrap().id;

    let result = c.steps.create(
        &c.principal,
        path,
        &draft("Both", true, true, Some(solution)),
        &[],
    );

    assert_eq!(step_reason(result), FIRST_AND_FINAL);
    assert!(c.paths.get(path).unwrap().steps.is_empty());
}

#[rstest]
#[case::final_without_solution(true, false)]
#[case::solution_without_final(false, true)]
fn given_solution_mismatch_when_creating_step_then_rejected(
    #[case] is_final: bool,
    #[case] with_solution: bool,
) {
    let (c, path) = setup();
    let solution = c.solutions.create(&c.principal, "Facade", "", None).unwrap().id;
    let solution = with_solution.then_some(solution);

    let result = c
        .steps
        .create(&c.principal, path, &draft("S", false, is_final, solution), &[]);

    assert_eq!(step_reason(result), SOLUTION_ONLY_ON_FINAL);
}

#[test]
fn given_unknown_solution_when_creating_final_step_then_solution_not_found() {
    let (c, path) = setup();

    let result = c.steps.create(
        &c.principal,
        path,
        &draft("End", false, true, Some(SolutionId::new())),
        &[],
    );

    assert!(matches!(result, Err(ApplicationError::SolutionNotFound(_))));
}

#[test]
fn given_step_with_options_when_made_final_then_rejected() {
    let (c, path) = setup();
    let solution = c.solutions.create(&c.principal, "Facade", "", None).unwrap().id;
    let s = step(&c, path, "Busy");
    c.options
        .create(
            &c.principal,
            &OptionDraft {
                name: "go".into(),
                step: s,
                next_step: None,
            },
        )
        .unwrap();

    let result = c
        .steps
        .update(&c.principal, s, &draft("Busy", false, true, Some(solution)));

    assert_eq!(step_reason(result), FINAL_WITH_OPTIONS);
    assert!(!c.steps.get(s).unwrap().is_final);
}

#[test]
fn given_overlong_name_when_creating_step_then_invalid_name() {
    let (c, path) = setup();
    let name = "x".repeat(NAME_MAX_LENGTH + 1);

    let result = c
        .steps
        .create(&c.principal, path, &draft(&name, false, false, None), &[]);

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidName { kind: "step", .. }))
    ));
}

#[test]
fn given_previous_options_when_creating_step_then_they_lead_to_it() {
    let (c, path) = setup();
    let start = step(&c, path, "Start");
    let option = c
        .options
        .create(
            &c.principal,
            &OptionDraft {
                name: "go".into(),
                step: start,
                next_step: None,
            },
        )
        .unwrap()
        .id;

    let next = c
        .steps
        .create(
            &c.principal,
            path,
            &draft("Next", false, false, None),
            &[option],
        )
        .unwrap()
        .id;

    assert_eq!(c.options.get(option).unwrap().next_step_id, Some(next));
}

#[test]
fn given_final_step_on_path_when_asking_path_solution_then_returns_it() {
    let (c, path) = setup();
    let solution = c.solutions.create(&c.principal, "Facade", "", None).unwrap().id;
    step(&c, path, "Start");
    assert_eq!(c.paths.solution(path).unwrap(), None);

    c.steps
        .create(
            &c.principal,
            path,
            &draft("End", false, true, Some(solution)),
            &[],
        )
        .unwrap();

    assert_eq!(c.paths.solution(path).unwrap().map(|s| s.pk), Some(solution));
}

// ============================================================
// Options
// ============================================================

#[test]
fn given_option_pointing_to_own_step_when_creating_then_rejected() {
    let (c, path) = setup();
    let s = step(&c, path, "Loop");

    let result = c.options.create(
        &c.principal,
        &OptionDraft {
            name: "again".into(),
            step: s,
            next_step: Some(s),
        },
    );

    assert_eq!(option_reason(result), STEPS_EQUAL);
    assert!(c.steps.get(s).unwrap().options.is_empty());
}

#[test]
fn given_option_when_updated_to_point_at_own_step_then_rejected() {
    let (c, path) = setup();
    let s = step(&c, path, "Start");
    let other = step(&c, path, "Other");
    let option = c
        .options
        .create(
            &c.principal,
            &OptionDraft {
                name: "go".into(),
                step: s,
                next_step: Some(other),
            },
        )
        .unwrap()
        .id;

    let result = c.options.update(
        &c.principal,
        option,
        OptionUpdate {
            name: None,
            step: None,
            next_step: Some(Some(s)),
        },
    );

    assert_eq!(option_reason(result), STEPS_EQUAL);
    assert_eq!(c.options.get(option).unwrap().next_step_id, Some(other));
}

#[test]
fn given_final_step_when_adding_option_then_rejected() {
    let (c, path) = setup();
    let solution = c.solutions.create(&c.principal, "Facade", "", None).unwrap().id;
    let end = c
        .steps
        .create(
            &c.principal,
            path,
            &draft("End", false, true, Some(solution)),
            &[],
        )
        .unwrap()
        .id;

    let result = c.options.create(
        &c.principal,
        &OptionDraft {
            name: "more".into(),
            step: end,
            next_step: None,
        },
    );

    assert_eq!(step_reason(result), FINAL_WITH_OPTIONS);
}

#[test]
fn given_unknown_next_step_when_creating_option_then_step_not_found() {
    let (c, path) = setup();
    let s = step(&c, path, "Start");

    let result = c.options.create(
        &c.principal,
        &OptionDraft {
            name: "go".into(),
            step: s,
            next_step: Some(StepId::new()),
        },
    );

    assert!(matches!(result, Err(ApplicationError::StepNotFound(_))));
}

// ============================================================
// Trees
// ============================================================

#[test]
fn given_same_creator_when_creating_duplicate_tree_name_then_rejected() {
    let (c, _) = setup();

    let result = c.trees.create(&c.principal, "Patterns", "again");

    assert!(matches!(
        result,
        Err(ApplicationError::DuplicateTreeName { .. })
    ));
}

#[test]
fn given_other_creator_when_creating_same_tree_name_then_allowed() {
    let (c, _) = setup();
    let carol = ServiceContainer::with_store(test_settings("carol", true), Arc::clone(&c.store));

    let tree = carol.trees.create(&carol.principal, "Patterns", "").unwrap();

    assert_eq!(tree.creator, "carol");
    assert_eq!(c.trees.list().unwrap().len(), 2);
}

#[test]
fn given_unknown_path_when_replacing_tree_paths_then_whole_update_rolls_back() {
    let (c, path) = setup();
    let tree = c.trees.list().unwrap()[0].id;

    let result = c.trees.update(
        &c.principal,
        tree,
        TreeUpdate {
            name: Some("Renamed".into()),
            description: None,
            paths: Some(vec![PathId::new()]),
        },
    );

    assert!(matches!(result, Err(ApplicationError::PathNotFound(_))));
    let tree = c.trees.get(tree).unwrap();
    assert_eq!(tree.name, "Patterns");
    assert_eq!(tree.paths, vec![path]);
}

#[test]
fn given_tree_when_deleted_then_its_paths_remain() {
    let (c, path) = setup();
    let tree = c.trees.list().unwrap()[0].id;

    c.trees.delete(&c.principal, tree).unwrap();

    assert!(matches!(
        c.trees.get(tree),
        Err(ApplicationError::TreeNotFound(_))
    ));
    assert_eq!(c.paths.get(path).unwrap().pk, path);
}

// ============================================================
// Solutions
// ============================================================

#[rstest]
#[case("Abstract Factory", "abstract-factory")]
#[case("  Chain of  Responsibility ", "chain-of-responsibility")]
fn given_no_slug_when_creating_solution_then_slug_derived_from_name(
    #[case] name: &str,
    #[case] expected: &str,
) {
    let (c, _) = setup();
    let solution = c.solutions.create(&c.principal, name, "", None).unwrap();
    assert_eq!(solution.slug, expected);
}

#[rstest]
#[case("Not A Slug")]
#[case("double--dash")]
#[case("-leading")]
fn given_invalid_slug_when_creating_solution_then_rejected(#[case] slug: &str) {
    let (c, _) = setup();

    let result = c.solutions.create(&c.principal, "Facade", "", Some(slug));

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidSlug(_)))
    ));
    assert!(c.solutions.list().unwrap().is_empty());
}

#[test]
fn given_solution_used_by_final_step_when_deleting_then_rejected_until_unused() {
    let (c, path) = setup();
    let solution = c.solutions.create(&c.principal, "Facade", "", None).unwrap().id;
    let end = c
        .steps
        .create(
            &c.principal,
            path,
            &draft("End", false, true, Some(solution)),
            &[],
        )
        .unwrap()
        .id;

    let result = c.solutions.delete(&c.principal, solution);
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::SolutionInUse { steps: 1, .. }))
    ));

    c.steps.delete(&c.principal, end).unwrap();
    c.solutions.delete(&c.principal, solution).unwrap();
    assert!(matches!(
        c.solutions.get(solution),
        Err(ApplicationError::SolutionNotFound(_))
    ));
}

#[test]
fn given_solution_when_updating_description_then_keeps_slug() {
    let (c, _) = setup();
    let solution = c.solutions.create(&c.principal, "Facade", "", None).unwrap().id;

    let updated = c
        .solutions
        .update(
            &c.principal,
            solution,
            SolutionUpdate {
                name: None,
                description: Some("Simplified interface".into()),
                slug: None,
            },
        )
        .unwrap();

    assert_eq!(updated.description, "Simplified interface");
    assert_eq!(updated.slug, "facade");
}

// ============================================================
// Permissions
// ============================================================

#[test]
fn given_reader_when_writing_then_permission_denied() {
    let (c, path) = setup();
    let bob = reader(&c);

    let tree = bob.trees.create(&bob.principal, "Mine", "");
    let step = bob
        .steps
        .create(&bob.principal, path, &draft("S", false, false, None), &[]);
    let solution = bob.solutions.create(&bob.principal, "Facade", "", None);

    assert!(matches!(tree, Err(ApplicationError::PermissionDenied { .. })));
    assert!(matches!(step, Err(ApplicationError::PermissionDenied { .. })));
    assert!(matches!(
        solution,
        Err(ApplicationError::PermissionDenied { .. })
    ));
}

#[test]
fn given_reader_when_reading_then_allowed() {
    let (c, path) = setup();
    step(&c, path, "Start");
    let bob = reader(&c);

    let trees = bob.trees.list().unwrap();
    let view = bob.paths.get(path).unwrap();

    assert_eq!(trees.len(), 1);
    assert_eq!(view.steps.len(), 1);
}
