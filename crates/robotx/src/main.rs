//! Command-line client for the robotx deployment service.
//!
//! Packages a project directory, uploads it, drives the remote (or local)
//! build to completion, and optionally publishes the result, reporting the
//! outcome as prose or as a single JSON envelope on stdout.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::{env, process};

use clap::{error::ErrorKind, Parser};

use crate::{
    commands::{Cli, Command},
    config::Config,
    output::{CliError, ErrorCode, Reporter},
};

/// Source tree bundling.
mod archiver;

/// HTTP gateway to the deployment service.
mod client;

/// Command-line interface definition.
mod commands;

/// Configuration file, environment, and flag handling.
mod config;

/// Local install/build step execution.
mod local_build;

/// Stream routing, envelopes, and the error taxonomy.
mod output;

/// The deploy state machine.
mod pipeline;

/// URL fallback resolution.
mod urls;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                // Flags never parsed, so machine mode is detected from the
                // raw arguments to keep stdout clean for automated callers.
                let mode = output::mode_from_args(env::args().skip(1));
                let error = CliError::new(ErrorCode::InvalidArgument, err.to_string());
                process::exit(output::handle_error(mode, &error));
            }
        },
    };

    let mode = cli.output_mode();
    let reporter = Reporter::new(mode);
    if let Err(error) = run(cli, &reporter) {
        reporter.finish();
        process::exit(output::handle_error(mode, &error));
    }
}

/// Load the configuration and dispatch the selected subcommand.
fn run(cli: Cli, reporter: &Reporter) -> Result<(), CliError> {
    let config = Config::load(cli.base_url.clone(), cli.api_key.clone()).map_err(|err| {
        CliError::with_cause(
            ErrorCode::InvalidArgument,
            "failed to load configuration",
            err,
        )
    })?;
    match cli.command {
        Command::Deploy(args) => commands::deploy::exec(args, &config, reporter),
        Command::Publish(args) => commands::publish::exec(args, &config, reporter),
        Command::Status(args) => commands::status::exec(args, &config, reporter),
    }
}
