use std::process::ExitCode;

use mailmerge_cli::command::{CommandRegistry, SETTINGS_ARG};
use mailmerge_cli::commands::register_builtin_commands;
use mailmerge_core::logging::setup_logging;
use mailmerge_core::{settings_loader, MergeError, Settings};

fn load_settings(matches: &clap::ArgMatches) -> Result<Settings, MergeError> {
    match matches.get_one::<String>(SETTINGS_ARG) {
        Some(path) => settings_loader::from_toml_file_with_env(path),
        None => Ok(settings_loader::from_env()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    let matches = registry.build_cli().get_matches();

    let result = match load_settings(&matches) {
        Ok(settings) => {
            setup_logging(&settings);
            registry.execute(&matches, &settings).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
