use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    client::{Build, Gateway, HttpClient, Project},
    commands::StatusArgs,
    config::Config,
    output::{api_error, CliError, ErrorCode, OutputMode, Reporter},
    urls,
};

/// The envelope describing a project's current state.
#[derive(Debug, Serialize)]
struct StatusReport {
    /// The inspected project.
    project: Project,

    /// The inspected build, when one was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<Build>,

    /// Build logs, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<String>,

    /// Resolved preview URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    preview_url: String,

    /// Resolved production URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    production_url: String,
}

/// Execute the `status` subcommand.
pub(crate) fn exec(args: StatusArgs, config: &Config, reporter: &Reporter) -> Result<(), CliError> {
    let project_id = args.project_id.trim().to_owned();
    if project_id.is_empty() {
        return Err(CliError::new(
            ErrorCode::InvalidArgument,
            "project id is required",
        ));
    }
    let build_id = args
        .build_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned);
    if args.logs && build_id.is_none() {
        return Err(CliError::new(
            ErrorCode::InvalidArgument,
            "logs require a build id (use --build-id)",
        ));
    }

    let base_url = config.base_url()?;
    let api_key = config.api_key()?;
    let gateway =
        HttpClient::new(&base_url, &api_key).map_err(api_error("failed to create HTTP client"))?;

    reporter.status("Fetching project status...");
    let project = gateway
        .get_project(&project_id)
        .map_err(api_error("failed to fetch project"))?;

    let build = match &build_id {
        Some(build_id) => Some(
            gateway
                .get_build(&project_id, build_id)
                .map_err(api_error("failed to fetch build"))?,
        ),
        None => None,
    };
    let logs = match (args.logs, &build_id) {
        (true, Some(build_id)) => Some(
            gateway
                .get_build_logs(&project_id, build_id)
                .map_err(api_error("failed to fetch build logs"))?,
        ),
        _ => None,
    };

    let report = StatusReport {
        preview_url: urls::preview_url(&base_url, &project, build.as_ref()).unwrap_or_default(),
        production_url: urls::production_url(&base_url, &project).unwrap_or_default(),
        project,
        build,
        logs,
    };

    reporter.finish();
    if reporter.mode() == OutputMode::Text {
        render_report(&report);
    }
    reporter.emit_success("status", &report)
}

/// Print the human-readable status report.
fn render_report(report: &StatusReport) {
    println!("Project: {} ({})", report.project.name, report.project.project_id);
    if !report.project.visibility.is_empty() {
        println!("Visibility: {}", report.project.visibility);
    }
    if let Some(created_at) = report.project.created_at {
        println!("Created: {}", format_time(created_at));
    }
    if let Some(build) = &report.build {
        println!("Build: {} [{}]", build.build_id, build.status);
        if let Some(label) = build.version_label.as_deref().filter(|l| !l.is_empty()) {
            println!("Version: {label}");
        }
        if let Some(finished_at) = build.finished_at {
            println!("Finished: {}", format_time(finished_at));
        }
    }
    if !report.preview_url.is_empty() {
        println!("Preview: {}", report.preview_url);
    }
    if !report.production_url.is_empty() {
        println!("Production: {}", report.production_url);
    }
    if let Some(logs) = report.logs.as_deref().filter(|logs| !logs.is_empty()) {
        println!("Logs:\n{logs}");
    }
}

/// Render a timestamp for human output.
fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}
