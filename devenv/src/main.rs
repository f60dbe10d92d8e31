// External crates
use clap::Parser;
use tracing::debug;

// Internal imports
use devenv_core::{devenv_error, DevEnvPaths};
use devenv_logging::{init_subscriber, LoggingConfig};

// Local modules
mod cli;
mod commands;

use cli::Args;
use commands::execute_command;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let paths = match DevEnvPaths::discover() {
        Ok(paths) => paths,
        Err(e) => {
            devenv_error!("{e}");
            std::process::exit(1);
        }
    };

    // Held until exit so buffered file logs are flushed.
    let _log_guard = init_subscriber(&LoggingConfig::from_env(&paths.log_path()));
    debug!("Running {:?}", args.command);

    if let Err(e) = execute_command(args, paths).await {
        devenv_error!("{e:#}");
        std::process::exit(1);
    }
}
