use std::{path::PathBuf, time::Duration};

use crate::{
    client::{BuildVersionInput, HttpClient},
    commands::DeployArgs,
    config::Config,
    output::{api_error, CliError, OutputMode, Reporter},
    pipeline::{run_deploy, DeployOptions, DeployOutcome},
};

/// Delay between build status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Execute the `deploy` subcommand.
pub(crate) fn exec(args: DeployArgs, config: &Config, reporter: &Reporter) -> Result<(), CliError> {
    let base_url = config.base_url()?;
    let api_key = config.api_key()?;
    let gateway =
        HttpClient::new(&base_url, &api_key).map_err(api_error("failed to create HTTP client"))?;

    let options = DeployOptions {
        path: PathBuf::from(args.path),
        name: args.name,
        visibility: args.visibility,
        publish: args.publish,
        wait: args.wait,
        timeout: Duration::from_secs(args.timeout),
        poll_interval: POLL_INTERVAL,
        local_build: args.local_build,
        install_command: args.install_command,
        build_command: args.build_command,
        output_dir: args.output_dir,
        version: BuildVersionInput::from_parts(
            args.version_label.as_deref(),
            args.source_ref.as_deref(),
        ),
        base_url,
    };

    let outcome = run_deploy(&gateway, &options, reporter)?;
    reporter.finish();
    if reporter.mode() == OutputMode::Text {
        render_summary(&outcome);
    }
    reporter.emit_success("deploy", &outcome)
}

/// Print the human-readable deploy summary.
fn render_summary(outcome: &DeployOutcome) {
    println!(
        "Deployed {} ({})",
        outcome.project_name, outcome.project_id
    );
    if !outcome.build_id.is_empty() {
        println!("Build: {} [{}]", outcome.build_id, outcome.build_status);
    }
    if !outcome.version_label.is_empty() {
        println!("Version: {}", outcome.version_label);
    }
    if !outcome.preview_url.is_empty() {
        println!("Preview: {}", outcome.preview_url);
    }
    if !outcome.production_url.is_empty() {
        println!("Production: {}", outcome.production_url);
    }
}
