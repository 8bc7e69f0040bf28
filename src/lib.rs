//! Decision-tree authoring and traversal.
//!
//! Trees group paths; paths own steps (shared steps are allowed); steps
//! offer options leading to further steps until a final step yields a
//! solution. The crate is layered:
//!
//! - [`domain`]: entities, validation rules, the traversal graph and the
//!   orphan-cleanup rule, free of I/O
//! - [`application`]: services and the view objects they return
//! - [`infrastructure`]: the storage boundary, its SQLite implementation
//!   and the service container
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
