//! Command framework for the mailmerge CLI.
//!
//! This module provides the [`ManagementCommand`] trait for defining CLI
//! commands and [`CommandRegistry`] for registering and dispatching them.
//!
//! ## Defining a Custom Command
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use mailmerge_cli::command::ManagementCommand;
//! use mailmerge_core::{MergeError, Settings};
//!
//! struct VersionCommand;
//!
//! #[async_trait]
//! impl ManagementCommand for VersionCommand {
//!     fn name(&self) -> &'static str { "version" }
//!     fn help(&self) -> &'static str { "Print the version" }
//!
//!     async fn handle(
//!         &self,
//!         _matches: &clap::ArgMatches,
//!         _settings: &Settings,
//!     ) -> Result<(), MergeError> {
//!         println!("{}", env!("CARGO_PKG_VERSION"));
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use mailmerge_core::{MergeError, Settings};

/// Name of the global option that points at a settings file.
pub const SETTINGS_ARG: &str = "settings";

/// A command that can be registered and invoked through the CLI.
///
/// Implementations define a name, help text, optional arguments, and an
/// async handler. All commands must be `Send + Sync`.
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// Returns the name of this command (used to invoke it from the CLI).
    fn name(&self) -> &'static str;

    /// Returns a short help description for this command.
    fn help(&self) -> &'static str;

    /// Adds custom arguments to the clap command.
    ///
    /// The default implementation returns the command unchanged.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Executes the command with the given argument matches and settings.
    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), MergeError>;
}

/// The commands a CLI can dispatch to, keyed by name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn ManagementCommand>>,
}

impl CommandRegistry {
    /// Creates a new empty command registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, replacing any command with the same name.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.insert(command.name(), command);
    }

    /// Returns the command with the given name, if registered.
    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Builds the top-level clap `Command`: one subcommand per registered
    /// command, in name order, plus the global `--settings` option.
    pub fn build_cli(&self) -> clap::Command {
        let app = clap::Command::new("mailmerge")
            .about("Render HTML templates against JSON datasets")
            .version(env!("CARGO_PKG_VERSION"))
            .subcommand_required(true)
            .arg(
                clap::Arg::new(SETTINGS_ARG)
                    .long("settings")
                    .short('s')
                    .value_name("FILE")
                    .global(true)
                    .help("TOML settings file (environment variables still apply)"),
            );

        self.commands.iter().fold(app, |app, (name, cmd)| {
            app.subcommand(cmd.add_arguments(clap::Command::new(*name).about(cmd.help())))
        })
    }

    /// Executes the subcommand selected in `matches`.
    pub async fn execute(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), MergeError> {
        let (name, sub_matches) = matches.subcommand().ok_or_else(|| {
            MergeError::ConfigurationError("No subcommand specified".to_string())
        })?;

        let cmd = self.get(name).ok_or_else(|| {
            MergeError::ConfigurationError(format!("Unknown command: {name}"))
        })?;

        tracing::debug!(command = name, "executing command");
        cmd.handle(sub_matches, settings).await
    }
}

/// Returns a required string argument.
pub fn required_arg<'a>(matches: &'a clap::ArgMatches, name: &str) -> Result<&'a str, MergeError> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| MergeError::ConfigurationError(format!("Missing required argument --{name}")))
}

/// Reads an input file, naming the file in any error.
pub async fn read_input(path: &str, what: &str) -> Result<String, MergeError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        MergeError::IoError(std::io::Error::new(
            e.kind(),
            format!("failed to read {what} '{path}': {e}"),
        ))
    })
}
