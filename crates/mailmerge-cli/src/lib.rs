//! # mailmerge-cli
//!
//! Command-line front end for mailmerge.
//!
//! This crate provides a small framework for defining and registering CLI
//! commands, plus the built-in `render` and `check` commands.
//!
//! File I/O is async. Rendering itself is synchronous and CPU-bound, so
//! commands run it on a blocking task.
//!
//! ## Quick Start
//!
//! ```rust
//! use mailmerge_cli::command::CommandRegistry;
//! use mailmerge_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! assert!(registry.get("render").is_some());
//! assert!(registry.get("check").is_some());
//! ```

// These clippy lints are intentionally allowed:
// - result_large_err: MergeError carries io::Error
// - doc_markdown: backtick requirements for documentation items are too strict
// - unused_async: command handlers keep a consistent async signature
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::unused_async)]

pub mod command;
pub mod commands;

pub use command::{CommandRegistry, ManagementCommand};
pub use commands::{register_builtin_commands, CheckCommand, RenderCommand};
