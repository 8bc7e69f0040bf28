//! Tests for the command dispatch against an on-disk database

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tempfile::TempDir;

use dectree::cli::args::Cli;
use dectree::cli::commands::execute_command;
use dectree::domain::{SolutionId, StepDraft, StepId, TreeId};
use dectree::exitcode;
use dectree::infrastructure::di::ServiceContainer;
use dectree::util::testing::{init_test_setup, test_settings};

struct Workspace {
    dir: TempDir,
    db: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        init_test_setup();
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".dectree.toml"),
            "actor = \"admin\"\nsuperusers = [\"admin\"]\n",
        )
        .unwrap();
        let db = dir.path().join("dectree.db");
        Self { dir, db }
    }

    fn container(&self) -> ServiceContainer {
        let mut settings = test_settings("admin", true);
        settings.database = self.db.clone();
        ServiceContainer::new(settings).unwrap()
    }

    fn run(&self, args: &[&str]) -> Result<(), i32> {
        let dir = self.dir.path().to_string_lossy().to_string();
        let db = self.db.to_string_lossy().to_string();
        let mut argv = vec!["dectree", "-C", dir.as_str(), "--database", db.as_str()];
        argv.extend_from_slice(args);
        let cli = Cli::parse_from(argv);
        execute_command(&cli).map_err(|e| e.exit_code())
    }
}

/// Tree with a first step "Start" and a final step "End".
fn seeded(ws: &Workspace) -> (TreeId, StepId, StepId, SolutionId) {
    let c = ws.container();
    let tree = c.trees.create(&c.principal, "Patterns", "").unwrap().id;
    let path = c.paths.create(&c.principal, "P1", Some(tree)).unwrap().id;
    let solution = c
        .solutions
        .create(&c.principal, "Facade", "", None)
        .unwrap()
        .id;
    let start = c
        .steps
        .create(
            &c.principal,
            path,
            &StepDraft {
                name: "Start".into(),
                is_first: true,
                is_final: false,
                solution: None,
            },
            &[],
        )
        .unwrap()
        .id;
    let end = c
        .steps
        .create(
            &c.principal,
            path,
            &StepDraft {
                name: "End".into(),
                is_first: false,
                is_final: true,
                solution: Some(solution),
            },
            &[],
        )
        .unwrap()
        .id;
    (tree, start, end, solution)
}

#[test]
fn given_final_step_when_renamed_then_keeps_role_and_solution() {
    let ws = Workspace::new();
    let (_, _, end, solution) = seeded(&ws);

    ws.run(&["step", "update", &end.to_string(), "--name", "Renamed"])
        .unwrap();

    let step = ws.container().steps.get(end).unwrap();
    assert_eq!(step.name, "Renamed");
    assert_eq!(step.role, "final");
    assert_eq!(step.solution, Some(solution));
}

#[test]
fn given_first_step_when_renamed_then_tree_keeps_entry_point() {
    let ws = Workspace::new();
    let (tree, start, _, _) = seeded(&ws);

    ws.run(&["step", "update", &start.to_string(), "--name", "Begin"])
        .unwrap();

    let c = ws.container();
    assert_eq!(c.steps.get(start).unwrap().role, "first");
    let view = c.traversal.first_step(tree).unwrap().expect("entry point");
    assert_eq!(view.name(), "Begin");
}

#[test]
fn given_role_flag_when_updating_then_changes_role() {
    let ws = Workspace::new();
    let (tree, start, _, _) = seeded(&ws);

    ws.run(&["step", "update", &start.to_string(), "--role", "internal"])
        .unwrap();

    let c = ws.container();
    assert_eq!(c.steps.get(start).unwrap().role, "internal");
    assert_eq!(c.traversal.first_step(tree).unwrap(), None);
}

#[test]
fn given_final_role_without_solution_when_updating_then_data_error() {
    let ws = Workspace::new();
    let (_, start, _, _) = seeded(&ws);

    let result = ws.run(&["step", "update", &start.to_string(), "--role", "final"]);

    assert_eq!(result, Err(exitcode::DATAERR));
    assert_eq!(ws.container().steps.get(start).unwrap().role, "first");
}
