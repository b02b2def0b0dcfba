// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Licensor - license and serial-number issuance service.
//!
//! Binary entry point: parses the CLI, loads configuration, and dispatches
//! to the subcommand.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use licensor_config::{ConfigError, LicensorConfig};

/// Licensor - license and serial-number issuance service.
#[derive(Parser, Debug)]
#[command(name = "licensor", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the activation and admin listeners.
    Serve,
    /// Reset the admin password. A random one is generated when omitted.
    ResetPassword {
        #[arg(long)]
        password: Option<String>,
    },
    /// Load and validate configuration, then print the effective settings.
    CheckConfig,
}

fn load(path: Option<&PathBuf>) -> Result<LicensorConfig, Vec<ConfigError>> {
    match path {
        Some(path) => licensor_config::load_and_validate_path(path),
        None => licensor_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            licensor_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::ResetPassword { password }) => {
            admin::reset_password(&config, password).await
        }
        Some(Commands::CheckConfig) => {
            admin::print_config(&config);
            Ok(())
        }
        None => {
            println!("licensor: use --help for available commands");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
