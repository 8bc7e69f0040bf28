//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;
use termtree::Tree as TermTree;

use crate::application::views::{OptionView, PathView, StepDetailView, StepView, TreeView};
use crate::cli::error::{CliError, CliResult};
use crate::infrastructure::InfraError;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print success status indented (green checkmark with leading spaces)
pub fn success_detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print removal (red -, indented)
pub fn removed(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "-".red(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print a value as pretty JSON.
pub fn json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        CliError::Infra(InfraError::io(
            "serialize output",
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        ))
    })?;
    println!("{text}");
    Ok(())
}

fn option_line(option: &OptionView) -> String {
    let next = option
        .next_step_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".into());
    format!("{}  {} → {}", option.pk.to_string().dimmed(), option.name, next)
}

/// Print what a walker sees at one step.
pub fn step_view(view: &StepView) {
    match view {
        StepView::Options { name, options } => {
            header(name);
            if options.is_empty() {
                detail(&"(no options)".dimmed());
            }
            for option in options {
                detail(&option_line(option));
            }
        }
        StepView::Solution { name, solution } => {
            header(name);
            action("Solution", &format!("{} ({})", solution.name, solution.slug));
            if !solution.description.is_empty() {
                detail(&solution.description);
            }
        }
    }
}

fn step_label(step: &StepDetailView) -> String {
    let role = match step.role.as_str() {
        "first" => step.role.green().to_string(),
        "final" => step.role.magenta().to_string(),
        _ => step.role.dimmed().to_string(),
    };
    format!("{} [{}] {}", step.name.bold(), role, step.pk.to_string().dimmed())
}

fn path_node(path: &PathView) -> TermTree<String> {
    let mut label = format!("{} {}", path.name.cyan(), path.pk.to_string().dimmed());
    if let Some(solution) = &path.solution {
        label.push_str(&format!(" ⇒ {}", solution.name));
    }
    let mut node = TermTree::new(label);
    for step in &path.steps {
        let mut step_node = TermTree::new(step_label(step));
        for option in &step.options {
            step_node.push(TermTree::new(option_line(option)));
        }
        node.push(step_node);
    }
    node
}

/// Render a tree view as an indented tree.
pub fn render_tree(view: &TreeView) -> String {
    let mut root = TermTree::new(format!(
        "{} {}",
        view.name.bold(),
        view.pk.to_string().dimmed()
    ));
    for path in &view.paths {
        root.push(path_node(path));
    }
    root.to_string()
}

/// Print a tree view as flat sections, one per path.
pub fn tree_sections(view: &TreeView) {
    header(&format!("{} ({})", view.name, view.pk));
    if !view.description.is_empty() {
        detail(&view.description);
    }
    for path in &view.paths {
        println!();
        path_section(path);
    }
}

/// Print a path with its steps.
pub fn path_section(path: &PathView) {
    action("Path", &format!("{} ({})", path.name, path.pk));
    if let Some(solution) = &path.solution {
        detail(&format!("solution: {}", solution.name));
    }
    for step in &path.steps {
        detail(&step_label(step));
        let options = step.options.iter().map(|o| o.name.as_str()).join(", ");
        if !options.is_empty() {
            detail(&format!("  options: {options}"));
        }
    }
}
