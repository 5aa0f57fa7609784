use serde::Serialize;

use crate::{
    client::{Gateway, HttpClient},
    commands::PublishArgs,
    config::Config,
    output::{api_error, CliError, ErrorCode, OutputMode, Reporter},
    urls,
};

/// The envelope describing one explicit publish.
#[derive(Debug, Serialize)]
struct PublishOutcome {
    /// Project owning the build.
    project_id: String,

    /// Build promoted to production.
    build_id: String,

    /// Resolved production URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    production_url: String,

    /// Always `true` for a successful publish.
    published: bool,
}

/// Execute the `publish` subcommand.
pub(crate) fn exec(
    args: PublishArgs,
    config: &Config,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let project_id = args.project_id.trim().to_owned();
    let build_id = args.build_id.trim().to_owned();
    if project_id.is_empty() || build_id.is_empty() {
        return Err(CliError::new(
            ErrorCode::InvalidArgument,
            "project id and build id are required",
        ));
    }

    let base_url = config.base_url()?;
    let api_key = config.api_key()?;
    let gateway =
        HttpClient::new(&base_url, &api_key).map_err(api_error("failed to create HTTP client"))?;

    reporter.status("Publishing to production...");
    let public_path = gateway
        .publish_build(&project_id, &build_id)
        .map_err(|err| CliError::with_cause(ErrorCode::PublishFailed, "failed to publish", err))?;
    reporter.note("Published successfully");

    let mut production_url = public_path.trim().to_owned();
    if production_url.is_empty() {
        production_url = match gateway.get_project(&project_id) {
            Ok(project) => urls::production_url(&base_url, &project).unwrap_or_default(),
            Err(_) => urls::production_url_for_id(&base_url, &project_id).unwrap_or_default(),
        };
    }

    let outcome = PublishOutcome {
        project_id,
        build_id,
        production_url,
        published: true,
    };

    reporter.finish();
    if reporter.mode() == OutputMode::Text {
        println!("Published build {} of {}", outcome.build_id, outcome.project_id);
        if !outcome.production_url.is_empty() {
            println!("Production: {}", outcome.production_url);
        }
    }
    reporter.emit_success("publish", &outcome)
}
