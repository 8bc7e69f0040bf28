//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::{OptionId, PathId, SolutionId, StepId, TreeId};

/// Decision trees: author paths of steps and options, walk them to a solution
#[derive(Parser, Debug)]
#[command(name = "dectree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Directory holding a local .dectree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    /// Database file (overrides configuration)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub database: Option<PathBuf>,

    /// Print views as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage and walk trees
    Tree {
        #[command(subcommand)]
        command: TreeCommands,
    },

    /// Manage paths
    Path {
        #[command(subcommand)]
        command: PathCommands,
    },

    /// Manage steps
    Step {
        #[command(subcommand)]
        command: StepCommands,
    },

    /// Manage options
    #[command(name = "option")]
    Choice {
        #[command(subcommand)]
        command: OptionCommands,
    },

    /// Manage solutions
    Solution {
        #[command(subcommand)]
        command: SolutionCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum TreeCommands {
    /// Create a tree
    Create {
        name: String,
        #[arg(short = 'm', long, default_value = "")]
        description: String,
    },

    /// List trees
    List,

    /// Show a tree with its paths, steps and options
    Show {
        tree: TreeId,
        /// Render as an indented tree instead of a table
        #[arg(long)]
        as_tree: bool,
    },

    /// Update name, description or path set
    Update {
        tree: TreeId,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'm', long)]
        description: Option<String>,
        /// Replace the path set (repeatable)
        #[arg(long = "path")]
        paths: Option<Vec<PathId>>,
    },

    /// Add an existing path to the tree
    AddPath { tree: TreeId, path: PathId },

    /// Delete a tree (paths are kept)
    Delete { tree: TreeId },

    /// Show the first step and its options
    First { tree: TreeId },

    /// Show the options pooled under a step name
    Options { tree: TreeId, name: String },

    /// Show the view at a step
    Advance { tree: TreeId, step: StepId },

    /// Choose an option and show where it leads
    Follow { tree: TreeId, option: OptionId },

    /// Walk the tree interactively (fzf)
    Walk { tree: TreeId },
}

#[derive(Subcommand, Debug)]
pub enum PathCommands {
    /// Create a path
    Create {
        name: String,
        /// Add the new path to this tree
        #[arg(short, long)]
        tree: Option<TreeId>,
    },

    /// List paths
    List,

    /// Show a path with its steps
    Show { path: PathId },

    /// Rename a path
    Rename { path: PathId, name: String },

    /// Share an existing step with the path
    Attach { path: PathId, step: StepId },

    /// Show the solution of the path's final step
    Solution { path: PathId },

    /// Delete a path and the steps only it owns
    Delete { path: PathId },
}

#[derive(Subcommand, Debug)]
pub enum StepCommands {
    /// Create a step on a path
    Create {
        path: PathId,
        name: String,
        /// Entry point of the tree
        #[arg(long)]
        first: bool,
        /// Terminal step (requires --solution)
        #[arg(long)]
        r#final: bool,
        #[arg(long)]
        solution: Option<SolutionId>,
        /// Re-point these options at the new step (repeatable)
        #[arg(long = "after")]
        previous: Vec<OptionId>,
    },

    /// Show a step with its options
    Show { step: StepId },

    /// Rename a step or change its role; omitted values are kept
    Update {
        step: StepId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
        /// Solution of a final step
        #[arg(long)]
        solution: Option<SolutionId>,
    },

    /// Delete a step
    Delete { step: StepId },
}

/// Role of a step as given on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleArg {
    First,
    Internal,
    Final,
}

#[derive(Subcommand, Debug)]
pub enum OptionCommands {
    /// Create an option on a step
    Create {
        step: StepId,
        name: String,
        /// Step reached by choosing the option
        #[arg(long)]
        next: Option<StepId>,
    },

    /// Show an option
    Show { option: OptionId },

    /// Update name, owning step or next step
    Update {
        option: OptionId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        step: Option<StepId>,
        #[arg(long, conflicts_with = "clear_next")]
        next: Option<StepId>,
        /// Make the option lead nowhere
        #[arg(long)]
        clear_next: bool,
    },

    /// Delete an option
    Delete { option: OptionId },
}

#[derive(Subcommand, Debug)]
pub enum SolutionCommands {
    /// Create a solution
    Create {
        name: String,
        /// Markdown body
        #[arg(short = 'm', long, default_value = "")]
        description: String,
        /// URL-safe identifier (default: derived from the name)
        #[arg(long)]
        slug: Option<String>,
    },

    /// List solutions
    List,

    /// Show a solution
    Show { solution: SolutionId },

    /// Update a solution
    Update {
        solution: SolutionId,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'm', long)]
        description: Option<String>,
        #[arg(long)]
        slug: Option<String>,
    },

    /// Delete a solution no final step uses
    Delete { solution: SolutionId },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
