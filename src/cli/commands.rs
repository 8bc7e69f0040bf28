//! Command dispatch

use std::io;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{OptionUpdate, SolutionUpdate, TreeUpdate, WalkOutcome};
use crate::application::views::{OptionView, SolutionView, StepDetailView};
use crate::cli::args::{
    Cli, Commands, ConfigCommands, OptionCommands, PathCommands, RoleArg, SolutionCommands,
    StepCommands, TreeCommands,
};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_dir, global_config_path, local_config_path, Settings};
use crate::domain::{OptionDraft, SolutionId, StepDraft};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::SkimSelector;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Tree { command }) => cmd_tree(cli, &container(cli)?, command),
        Some(Commands::Path { command }) => cmd_path(cli, &container(cli)?, command),
        Some(Commands::Step { command }) => cmd_step(cli, &container(cli)?, command),
        Some(Commands::Choice { command }) => cmd_option(cli, &container(cli)?, command),
        Some(Commands::Solution { command }) => cmd_solution(cli, &container(cli)?, command),
        None => Err(CliError::Usage(
            "no command given, see `dectree --help`".to_string(),
        )),
    }
}

fn local_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| CliError::Infra(InfraError::io("current directory", e))),
    }
}

fn settings(cli: &Cli) -> CliResult<Settings> {
    let dir = local_dir(cli)?;
    let mut settings = Settings::load(Some(&dir))?;
    if let Some(database) = &cli.database {
        settings.database = database.clone();
    }
    Ok(settings)
}

fn container(cli: &Cli) -> CliResult<ServiceContainer> {
    let settings = settings(cli)?;
    debug!(actor = %settings.actor, database = %settings.database.display(), "settings loaded");
    Ok(ServiceContainer::new(settings)?)
}

fn print_solution(cli: &Cli, solution: &SolutionView) -> CliResult<()> {
    if cli.json {
        return output::json(solution);
    }
    output::action("Solution", &format!("{} ({})", solution.name, solution.pk));
    output::detail(&format!("slug: {}", solution.slug));
    if !solution.description.is_empty() {
        output::detail(&solution.description);
    }
    Ok(())
}

fn print_option(cli: &Cli, option: &OptionView) -> CliResult<()> {
    if cli.json {
        return output::json(option);
    }
    output::action("Option", &format!("{} ({})", option.name, option.pk));
    output::detail(&format!("step: {}", option.step_id));
    match option.next_step_id {
        Some(next) => output::detail(&format!("next: {next}")),
        None => output::detail("next: -"),
    }
    Ok(())
}

// ============================================================
// Tree commands
// ============================================================

#[instrument(skip(cli, c))]
fn cmd_tree(cli: &Cli, c: &ServiceContainer, command: &TreeCommands) -> CliResult<()> {
    match command {
        TreeCommands::Create { name, description } => {
            let tree = c.trees.create(&c.principal, name, description)?;
            output::success(&format!("Created tree {} ({})", tree.name, tree.id));
        }
        TreeCommands::List => {
            let trees = c.trees.list()?;
            for tree in &trees {
                output::info(&format!(
                    "{}  {}  [{} paths, {}]",
                    tree.id, tree.name, tree.paths.len(), tree.creator
                ));
            }
        }
        TreeCommands::Show { tree, as_tree } => {
            let view = c.trees.show(*tree)?;
            if cli.json {
                output::json(&view)?;
            } else if *as_tree {
                output::info(&output::render_tree(&view));
            } else {
                output::tree_sections(&view);
            }
        }
        TreeCommands::Update {
            tree,
            name,
            description,
            paths,
        } => {
            let update = TreeUpdate {
                name: name.clone(),
                description: description.clone(),
                paths: paths.clone(),
            };
            let tree = c.trees.update(&c.principal, *tree, update)?;
            output::success(&format!("Updated tree {} ({})", tree.name, tree.id));
        }
        TreeCommands::AddPath { tree, path } => {
            c.trees.add_path(&c.principal, *tree, *path)?;
            output::success(&format!("Added path {path} to tree {tree}"));
        }
        TreeCommands::Delete { tree } => {
            c.trees.delete(&c.principal, *tree)?;
            output::success(&format!("Deleted tree {tree}"));
        }
        TreeCommands::First { tree } => match c.traversal.first_step(*tree)? {
            Some(view) if cli.json => output::json(&view)?,
            Some(view) => output::step_view(&view),
            None if cli.json => output::info("{}"),
            None => output::warning("tree has no first step"),
        },
        TreeCommands::Options { tree, name } => {
            let options = c.traversal.options_for(*tree, name)?;
            if cli.json {
                output::json(&options)?;
            } else {
                for option in &options {
                    print_option(cli, option)?;
                }
            }
        }
        TreeCommands::Advance { tree, step } => {
            let view = c.traversal.advance(*tree, *step)?;
            if cli.json {
                output::json(&view)?;
            } else {
                output::step_view(&view);
            }
        }
        TreeCommands::Follow { tree, option } => match c.traversal.follow(*tree, *option)? {
            Some(view) if cli.json => output::json(&view)?,
            Some(view) => output::step_view(&view),
            None if cli.json => output::info("{}"),
            None => output::warning("option leads nowhere"),
        },
        TreeCommands::Walk { tree } => {
            let walk = c.traversal.walk(*tree, &SkimSelector)?;
            output::header(&walk.visited.join(" → "));
            match walk.outcome {
                WalkOutcome::Solution(solution) => print_solution(cli, &solution)?,
                WalkOutcome::DeadEnd => output::warning("dead end: no further options"),
                WalkOutcome::NoEntryPoint => output::warning("tree has no first step"),
                WalkOutcome::Cancelled => output::detail("cancelled"),
            }
        }
    }
    Ok(())
}

// ============================================================
// Path commands
// ============================================================

#[instrument(skip(cli, c))]
fn cmd_path(cli: &Cli, c: &ServiceContainer, command: &PathCommands) -> CliResult<()> {
    match command {
        PathCommands::Create { name, tree } => {
            let path = c.paths.create(&c.principal, name, *tree)?;
            output::success(&format!("Created path {} ({})", path.name, path.id));
        }
        PathCommands::List => {
            for path in c.paths.list()? {
                output::info(&format!(
                    "{}  {}  [{} steps]",
                    path.id,
                    path.name,
                    path.steps.len()
                ));
            }
        }
        PathCommands::Show { path } => {
            let view = c.paths.get(*path)?;
            if cli.json {
                output::json(&view)?;
            } else {
                output::path_section(&view);
            }
        }
        PathCommands::Rename { path, name } => {
            let path = c.paths.rename(&c.principal, *path, name)?;
            output::success(&format!("Renamed path {} to {}", path.id, path.name));
        }
        PathCommands::Attach { path, step } => {
            c.paths.attach_step(&c.principal, *path, *step)?;
            output::success(&format!("Attached step {step} to path {path}"));
        }
        PathCommands::Solution { path } => match c.paths.solution(*path)? {
            Some(solution) => print_solution(cli, &solution)?,
            None if cli.json => output::info("null"),
            None => output::warning("path has no final step"),
        },
        PathCommands::Delete { path } => {
            let report = c.paths.delete(&c.principal, *path)?;
            if cli.json {
                return output::json(&report);
            }
            output::success(&format!("Deleted path {path}"));
            for step in &report.removed_steps {
                output::removed(&format!("step {step}"));
            }
            for step in &report.kept_steps {
                output::success_detail(&format!("kept shared step {step}"));
            }
        }
    }
    Ok(())
}

// ============================================================
// Step commands
// ============================================================

#[instrument(skip(cli, c))]
fn cmd_step(cli: &Cli, c: &ServiceContainer, command: &StepCommands) -> CliResult<()> {
    match command {
        StepCommands::Create {
            path,
            name,
            first,
            r#final,
            solution,
            previous,
        } => {
            let draft = StepDraft {
                name: name.clone(),
                is_first: *first,
                is_final: *r#final,
                solution: *solution,
            };
            let step = c.steps.create(&c.principal, *path, &draft, previous)?;
            output::success(&format!(
                "Created {} step {} ({})",
                step.role, step.name, step.id
            ));
        }
        StepCommands::Show { step } => {
            let view = c.steps.get(*step)?;
            if cli.json {
                output::json(&view)?;
            } else {
                output::header(&format!("{} [{}] ({})", view.name, view.role, view.pk));
                for option in &view.options {
                    print_option(cli, option)?;
                }
            }
        }
        StepCommands::Update {
            step,
            name,
            role,
            solution,
        } => {
            let current = c.steps.get(*step)?;
            let draft = update_draft(&current, name.as_deref(), *role, *solution);
            let step = c.steps.update(&c.principal, *step, &draft)?;
            output::success(&format!(
                "Updated {} step {} ({})",
                step.role, step.name, step.id
            ));
        }
        StepCommands::Delete { step } => {
            c.steps.delete(&c.principal, *step)?;
            output::success(&format!("Deleted step {step}"));
        }
    }
    Ok(())
}

/// New state of a step: the current one with the given values applied.
fn update_draft(
    current: &StepDetailView,
    name: Option<&str>,
    role: Option<RoleArg>,
    solution: Option<SolutionId>,
) -> StepDraft {
    let (is_first, is_final) = match role {
        Some(RoleArg::First) => (true, false),
        Some(RoleArg::Internal) => (false, false),
        Some(RoleArg::Final) => (false, true),
        None => (current.is_first, current.is_final),
    };
    // a final step keeps its solution unless a new one is given
    let solution = match solution {
        Some(solution) => Some(solution),
        None if is_final => current.solution,
        None => None,
    };
    StepDraft {
        name: name.map_or_else(|| current.name.clone(), str::to_string),
        is_first,
        is_final,
        solution,
    }
}

// ============================================================
// Option commands
// ============================================================

#[instrument(skip(cli, c))]
fn cmd_option(cli: &Cli, c: &ServiceContainer, command: &OptionCommands) -> CliResult<()> {
    match command {
        OptionCommands::Create { step, name, next } => {
            let draft = OptionDraft {
                name: name.clone(),
                step: *step,
                next_step: *next,
            };
            let option = c.options.create(&c.principal, &draft)?;
            output::success(&format!("Created option {} ({})", option.name, option.id));
        }
        OptionCommands::Show { option } => print_option(cli, &c.options.get(*option)?)?,
        OptionCommands::Update {
            option,
            name,
            step,
            next,
            clear_next,
        } => {
            let next_step = if *clear_next { Some(None) } else { next.map(Some) };
            let update = OptionUpdate {
                name: name.clone(),
                step: *step,
                next_step,
            };
            let option = c.options.update(&c.principal, *option, update)?;
            output::success(&format!("Updated option {} ({})", option.name, option.id));
        }
        OptionCommands::Delete { option } => {
            c.options.delete(&c.principal, *option)?;
            output::success(&format!("Deleted option {option}"));
        }
    }
    Ok(())
}

// ============================================================
// Solution commands
// ============================================================

#[instrument(skip(cli, c))]
fn cmd_solution(cli: &Cli, c: &ServiceContainer, command: &SolutionCommands) -> CliResult<()> {
    match command {
        SolutionCommands::Create {
            name,
            description,
            slug,
        } => {
            let solution =
                c.solutions
                    .create(&c.principal, name, description, slug.as_deref())?;
            output::success(&format!(
                "Created solution {} [{}] ({})",
                solution.name, solution.slug, solution.id
            ));
        }
        SolutionCommands::List => {
            let solutions = c.solutions.list()?;
            if cli.json {
                return output::json(&solutions);
            }
            for solution in &solutions {
                output::info(&format!(
                    "{}  {}  [{}]",
                    solution.pk, solution.name, solution.slug
                ));
            }
        }
        SolutionCommands::Show { solution } => print_solution(cli, &c.solutions.get(*solution)?)?,
        SolutionCommands::Update {
            solution,
            name,
            description,
            slug,
        } => {
            let update = SolutionUpdate {
                name: name.clone(),
                description: description.clone(),
                slug: slug.clone(),
            };
            let solution = c.solutions.update(&c.principal, *solution, update)?;
            output::success(&format!("Updated solution {} ({})", solution.name, solution.id));
        }
        SolutionCommands::Delete { solution } => {
            c.solutions.delete(&c.principal, *solution)?;
            output::success(&format!("Deleted solution {solution}"));
        }
    }
    Ok(())
}

// ============================================================
// Config commands
// ============================================================

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Init { global } => {
            let target = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine the global config directory".to_string())
                })?
            } else {
                local_config_path(&local_dir(cli)?)
            };
            if target.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    target.display()
                )));
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CliError::Infra(InfraError::io(format!("create {}", parent.display()), e))
                })?;
            }
            std::fs::write(&target, Settings::template()).map_err(|e| {
                CliError::Infra(InfraError::io(format!("write {}", target.display()), e))
            })?;
            output::success(&format!("Created {}", target.display()));
        }
        ConfigCommands::Path => {
            match global_config_dir() {
                Some(dir) => output::action("Global", &dir.join("dectree.toml").display()),
                None => output::warning("cannot determine the global config directory"),
            }
            let local = local_config_path(&local_dir(cli)?);
            output::action("Local", &local.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PathId, StepId};
    use chrono::Utc;
    use rstest::rstest;

    fn final_step(solution: SolutionId) -> StepDetailView {
        StepDetailView {
            pk: StepId::new(),
            name: "End".into(),
            role: "final".into(),
            is_first: false,
            is_final: true,
            solution: Some(solution),
            paths: vec![PathId::new()],
            options: Vec::new(),
            creator: "admin".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn given_rename_only_when_building_draft_then_keeps_role_and_solution() {
        let solution = SolutionId::new();
        let current = final_step(solution);

        let draft = update_draft(&current, Some("Renamed"), None, None);

        assert_eq!(draft.name, "Renamed");
        assert!(draft.is_final);
        assert!(!draft.is_first);
        assert_eq!(draft.solution, Some(solution));
    }

    #[rstest]
    #[case(RoleArg::First, true, false)]
    #[case(RoleArg::Internal, false, false)]
    fn given_non_final_role_when_building_draft_then_drops_solution(
        #[case] role: RoleArg,
        #[case] is_first: bool,
        #[case] is_final: bool,
    ) {
        let current = final_step(SolutionId::new());

        let draft = update_draft(&current, None, Some(role), None);

        assert_eq!(draft.name, "End");
        assert_eq!((draft.is_first, draft.is_final), (is_first, is_final));
        assert_eq!(draft.solution, None);
    }
}
