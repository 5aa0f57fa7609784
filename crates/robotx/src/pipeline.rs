use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::{
    archiver,
    client::{Build, BuildStatus, BuildVersionInput, Gateway},
    local_build,
    output::{api_error, CliError, ErrorCode, Reporter},
    urls,
};

/// Immutable per-invocation deploy configuration.
///
/// Constructed once from the parsed command line and passed by
/// reference through the pipeline; nothing in here changes mid-run.
pub(crate) struct DeployOptions {
    /// Project directory to deploy.
    pub path: PathBuf,

    /// Explicit project name; the directory basename is used otherwise.
    pub name: Option<String>,

    /// Requested project visibility.
    pub visibility: String,

    /// Publish to production after a successful build.
    pub publish: bool,

    /// Wait for the build to reach a terminal status.
    pub wait: bool,

    /// Upper bound on the total polling time.
    pub timeout: Duration,

    /// Fixed delay between status polls.
    pub poll_interval: Duration,

    /// Build locally and upload artifacts instead of building remotely.
    pub local_build: bool,

    /// Install command override for local builds.
    pub install_command: Option<String>,

    /// Build command override for local builds.
    pub build_command: Option<String>,

    /// Output directory override for local builds.
    pub output_dir: Option<String>,

    /// Optional caller-supplied version identifiers.
    pub version: Option<BuildVersionInput>,

    /// Server base URL, used for conventional URL fallbacks.
    pub base_url: String,
}

/// The envelope describing one finished deploy.
#[derive(Debug, Serialize)]
pub(crate) struct DeployOutcome {
    /// Resolved project identifier.
    pub project_id: String,

    /// Resolved project name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project_name: String,

    /// Uploaded commit identifier.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub commit_id: String,

    /// Build identifier, when one was created.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub build_id: String,

    /// Server-assigned version sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_seq: Option<i64>,

    /// Version label stamped on the build.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version_label: String,

    /// Source reference recorded for the build.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_ref: String,

    /// Last observed build status.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub build_status: String,

    /// Resolved preview URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub preview_url: String,

    /// Resolved production URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub production_url: String,

    /// Whether the deploy was published to production.
    pub published: bool,

    /// Whether the invocation waited for build completion.
    pub waited: bool,

    /// Whether the build ran locally.
    pub local_build: bool,
}

/// Execute one deploy end to end.
///
/// Steps run strictly in order; every fatal condition aborts the
/// remaining steps with a classified error. Temporary bundles are
/// removed on every exit path once no longer needed.
pub(crate) fn run_deploy(
    gateway: &impl Gateway,
    options: &DeployOptions,
    reporter: &Reporter,
) -> Result<DeployOutcome, CliError> {
    let project_dir = resolve_project_path(&options.path)?;
    let name = derive_project_name(&project_dir, options.name.as_deref())?;

    if let Some(version) = &options.version {
        reporter.note(&format!(
            "Build version label: {}",
            value_or_dash(version.version_label.as_deref())
        ));
        reporter.note(&format!(
            "Source ref: {}",
            value_or_dash(version.source_ref.as_deref())
        ));
    }

    reporter.status(format!("Resolving project by name: {name}"));
    let project = gateway
        .resolve_project(&name, &options.visibility)
        .map_err(api_error("failed to resolve project"))?;
    let name = if project.name.is_empty() {
        name
    } else {
        project.name.clone()
    };
    reporter.note(&format!("Project ready: {}", project.project_id));

    reporter.status("Archiving...");
    let source_bundle = package_source(&project_dir)?;
    if let Ok(metadata) = source_bundle.as_file().metadata() {
        reporter.note(&format!(
            "Source archive size: {:.2} MB",
            metadata.len() as f64 / (1024.0 * 1024.0)
        ));
    }

    reporter.status("Uploading source code...");
    let upload = gateway
        .upload_source(
            &project.project_id,
            source_bundle.path(),
            options.version.as_ref(),
        )
        .map_err(api_error("failed to upload source"))?;
    drop(source_bundle);

    let commit = upload.commit;
    let mut build = upload.build;
    if let Some(commit) = &commit {
        reporter.note(&format!("Source uploaded: {}", commit.commit_id));
    }
    if let Some(build) = build.as_ref().filter(|build| !build.build_id.is_empty()) {
        reporter.note(&format!("Build created: {}", build.build_id));
    }

    if options.local_build {
        let existing = build
            .take()
            .filter(|build| !build.build_id.is_empty())
            .ok_or_else(|| {
                CliError::new(
                    ErrorCode::LocalBuildUnsupported,
                    "server did not return a build id; local build upload is not supported by this server",
                )
            })?;

        let plan = commit
            .as_ref()
            .and_then(|commit| commit.scanner_result.as_ref())
            .and_then(|scan| scan.build_plan.as_ref());
        let steps = local_build::resolve_steps(
            &project_dir,
            options.install_command.as_deref(),
            options.build_command.as_deref(),
            plan,
        );
        local_build::run(&project_dir, &steps, reporter)
            .map_err(|err| CliError::with_cause(ErrorCode::BuildFailed, "local build failed", err))?;

        let artifact_dir =
            local_build::resolve_output_dir(&project_dir, options.output_dir.as_deref(), plan);
        if !artifact_dir.is_dir() {
            return Err(CliError::new(
                ErrorCode::BuildFailed,
                format!("output directory missing: {}", artifact_dir.display()),
            ));
        }

        reporter.status("Packaging build output...");
        let artifact_bundle = package_directory(&artifact_dir)?;
        reporter.status("Uploading build artifacts...");
        let updated = gateway
            .upload_build_artifacts(&existing.build_id, artifact_bundle.path())
            .map_err(api_error("failed to upload build artifacts"))?;
        reporter.note("Build artifacts uploaded");
        build = Some(updated);
    } else {
        match build.as_ref().filter(|build| !build.build_id.is_empty()) {
            Some(existing) => {
                reporter.status("Starting build...");
                gateway
                    .start_build(&project.project_id, &existing.build_id)
                    .map_err(api_error("failed to start build"))?;
                reporter.note(&format!("Build started: {}", existing.build_id));
            }
            None => {
                let commit_id = commit
                    .as_ref()
                    .map(|commit| commit.commit_id.as_str())
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        CliError::new(
                            ErrorCode::BuildFailed,
                            "no commit id available to trigger build",
                        )
                    })?;
                reporter.status("Triggering build...");
                let triggered = gateway
                    .trigger_build(&project.project_id, commit_id, options.version.as_ref())
                    .map_err(api_error("failed to trigger build"))?;
                reporter.note(&format!("Build started: {}", triggered.build_id));
                build = Some(triggered);
            }
        }
    }

    let mut preview_url = String::new();
    if options.wait {
        let build_id = build
            .as_ref()
            .map(|build| build.build_id.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CliError::new(
                    ErrorCode::BuildFailed,
                    "no build id available to wait for completion",
                )
            })?;

        reporter.status(format!(
            "Waiting for build to complete (timeout: {}s)...",
            options.timeout.as_secs()
        ));
        let finished = wait_for_build(
            gateway,
            &project.project_id,
            &build_id,
            options.timeout,
            options.poll_interval,
            reporter,
        )?;

        if finished.status == BuildStatus::Success {
            reporter.note(if options.local_build {
                "Local build completed successfully"
            } else {
                "Build completed successfully"
            });
            preview_url =
                urls::preview_url(&options.base_url, &project, Some(&finished)).unwrap_or_default();
            if !preview_url.is_empty() {
                reporter.note(&format!("Preview URL: {preview_url}"));
            }
        } else {
            reporter.note(&format!("Build failed with status: {}", finished.status));
            if let Ok(logs) = gateway.get_build_logs(&project.project_id, &finished.build_id) {
                if !logs.is_empty() {
                    reporter.note(&format!("Build logs:\n{logs}"));
                }
            }
            return Err(CliError::new(
                ErrorCode::BuildFailed,
                format!("build failed with status: {}", finished.status),
            ));
        }
        build = Some(finished);
    } else if let Some(current) = build
        .as_ref()
        .filter(|build| build.status == BuildStatus::Success)
    {
        // A local artifact upload can report success synchronously.
        reporter.note(if options.local_build {
            "Local build completed successfully"
        } else {
            "Build completed successfully"
        });
        preview_url =
            urls::preview_url(&options.base_url, &project, Some(current)).unwrap_or_default();
        if !preview_url.is_empty() {
            reporter.note(&format!("Preview URL: {preview_url}"));
        }
    }

    let succeeded = build
        .as_ref()
        .map_or(false, |build| build.status == BuildStatus::Success);

    let mut production_url = String::new();
    if options.publish && succeeded {
        let build_id = build
            .as_ref()
            .map(|build| build.build_id.clone())
            .unwrap_or_default();
        reporter.status("Publishing to production...");
        let public_path = gateway
            .publish_build(&project.project_id, &build_id)
            .map_err(|err| {
                CliError::with_cause(ErrorCode::PublishFailed, "failed to publish", err)
            })?;
        reporter.note("Published successfully");
        production_url = public_path.trim().to_owned();
        if production_url.is_empty() {
            production_url =
                urls::production_url(&options.base_url, &project).unwrap_or_default();
        }
        if !production_url.is_empty() {
            reporter.note(&format!("Production URL: {production_url}"));
        }
    }

    if preview_url.is_empty() && succeeded {
        preview_url =
            urls::preview_url(&options.base_url, &project, build.as_ref()).unwrap_or_default();
    }

    let version_label = build
        .as_ref()
        .and_then(|build| build.version_label.as_deref())
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();
    let source_ref = build
        .as_ref()
        .and_then(|build| build.source_ref.as_deref())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| {
            options
                .version
                .as_ref()
                .and_then(|version| version.source_ref.as_deref())
        })
        .unwrap_or_default()
        .to_owned();

    Ok(DeployOutcome {
        project_id: project.project_id,
        project_name: name,
        commit_id: commit.map(|commit| commit.commit_id).unwrap_or_default(),
        build_id: build
            .as_ref()
            .map(|build| build.build_id.clone())
            .unwrap_or_default(),
        version_seq: build
            .as_ref()
            .and_then(|build| build.version_seq)
            .filter(|seq| *seq > 0),
        version_label,
        source_ref,
        build_status: build
            .as_ref()
            .map(|build| build.status.to_string())
            .unwrap_or_default(),
        preview_url,
        production_url: production_url.clone(),
        published: options.publish && !production_url.is_empty(),
        waited: options.wait,
        local_build: options.local_build,
    })
}

/// Canonicalize the project directory and require that it exists.
fn resolve_project_path(path: &Path) -> Result<PathBuf, CliError> {
    let resolved = path.canonicalize().map_err(|err| {
        CliError::with_cause(
            ErrorCode::InvalidProjectPath,
            format!("project path does not exist: {}", path.display()),
            err,
        )
    })?;
    if !resolved.is_dir() {
        return Err(CliError::new(
            ErrorCode::InvalidProjectPath,
            format!("project path is not a directory: {}", resolved.display()),
        ));
    }
    Ok(resolved)
}

/// Derive and validate the project name.
///
/// Explicit flag value first, then the directory basename; either way
/// the result is trimmed and lower-cased before validation.
fn derive_project_name(project_dir: &Path, explicit: Option<&str>) -> Result<String, CliError> {
    let raw = match explicit.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.to_owned(),
        None => project_dir
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_owned(),
    };
    let name = raw.trim().to_lowercase();
    validate_project_name(&name)?;
    Ok(name)
}

/// Validate a project name: 4-63 characters, lowercase letters, digits,
/// or hyphens, with alphanumeric first and last characters.
pub(crate) fn validate_project_name(name: &str) -> Result<(), CliError> {
    if name.is_empty() {
        return Err(CliError::new(
            ErrorCode::InvalidProjectName,
            "project name is required",
        ));
    }
    let charset_ok = name
        .bytes()
        .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-');
    let ends_ok = !name.starts_with('-') && !name.ends_with('-');
    if name.len() < 4 || name.len() > 63 || !charset_ok || !ends_ok {
        return Err(CliError::new(
            ErrorCode::InvalidProjectName,
            "project name must be 4-63 chars of lowercase letters, digits, or hyphens",
        ));
    }
    Ok(())
}

/// Poll the build until it reaches a terminal status.
///
/// A fixed interval separates polls; the total elapsed time is bounded
/// by `timeout`. Once a terminal status is observed no further polls are
/// made. A timeout and an unrecognized status value both fail with
/// messages distinct from a backend-reported failure.
fn wait_for_build(
    gateway: &impl Gateway,
    project_id: &str,
    build_id: &str,
    timeout: Duration,
    interval: Duration,
    reporter: &Reporter,
) -> Result<Build, CliError> {
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout {
            return Err(CliError::new(
                ErrorCode::BuildFailed,
                format!("build timeout after {} seconds", timeout.as_secs()),
            ));
        }

        let build = gateway
            .get_build(project_id, build_id)
            .map_err(api_error("failed to poll build status"))?;

        match &build.status {
            BuildStatus::Success | BuildStatus::Failed => return Ok(build),
            BuildStatus::Queued | BuildStatus::Running => {
                reporter.status(format!(
                    "Build status: {} (elapsed: {}s)",
                    build.status,
                    start.elapsed().as_secs()
                ));
                thread::sleep(interval);
            }
            BuildStatus::Unknown(value) => {
                return Err(CliError::new(
                    ErrorCode::BuildFailed,
                    format!("unknown build status: {value}"),
                ));
            }
        }
    }
}

/// Package the source tree into an owned temporary bundle.
fn package_source(project_dir: &Path) -> Result<NamedTempFile, CliError> {
    let bundle = NamedTempFile::new().map_err(|err| {
        CliError::with_cause(ErrorCode::PackageFailed, "failed to package source", err)
    })?;
    archiver::bundle_source(project_dir, bundle.as_file()).map_err(|err| {
        CliError::with_cause(ErrorCode::PackageFailed, "failed to package source", err)
    })?;
    Ok(bundle)
}

/// Package a build output directory into an owned temporary bundle.
fn package_directory(dir: &Path) -> Result<NamedTempFile, CliError> {
    let bundle = NamedTempFile::new().map_err(|err| {
        CliError::with_cause(
            ErrorCode::BuildFailed,
            "failed to package build output",
            err,
        )
    })?;
    archiver::bundle_directory(dir, bundle.as_file()).map_err(|err| {
        CliError::with_cause(
            ErrorCode::BuildFailed,
            "failed to package build output",
            err,
        )
    })?;
    Ok(bundle)
}

/// Replace a blank optional value with a dash for narration.
fn value_or_dash(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => "-",
    }
}
