use std::{
    io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};

use derive_more::{Display, Error, From};

use crate::{
    client::BuildPlan,
    output::{OutputMode, Reporter},
};

/// Output directory used when neither an override nor the build plan
/// names one.
const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Local build execution errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum LocalBuildError {
    /// IO-related error while spawning or draining a step.
    Io(io::Error),

    /// The install step exited with a non-zero status.
    #[display(fmt = "install step failed: {}", _0)]
    #[from(ignore)]
    InstallFailed(#[error(not(source))] ExitStatus),

    /// The build step exited with a non-zero status.
    #[display(fmt = "build step failed: {}", _0)]
    #[from(ignore)]
    BuildFailed(#[error(not(source))] ExitStatus),
}

/// Install and build commands selected for one local build.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct StepCommands {
    /// Dependency-install command, when one applies.
    pub install: Option<String>,

    /// Build command, when one applies.
    pub build: Option<String>,
}

/// Select the install/build commands for a project.
///
/// Resolution order per step: explicit override, then the server's build
/// plan, then the `package.json` convention (`npm install` /
/// `npm run build`). When the plan explicitly reports that no build is
/// needed and no override was given, both steps are skipped entirely.
pub(crate) fn resolve_steps(
    project_dir: &Path,
    install_override: Option<&str>,
    build_override: Option<&str>,
    plan: Option<&BuildPlan>,
) -> StepCommands {
    let install_override = trimmed(install_override);
    let build_override = trimmed(build_override);

    if install_override.is_none()
        && build_override.is_none()
        && plan.map_or(false, |plan| !plan.needs_build)
    {
        return StepCommands::default();
    }

    let has_manifest = project_dir.join("package.json").exists();
    let install = install_override
        .or_else(|| trimmed(plan.and_then(|plan| plan.install_command.as_deref())))
        .or_else(|| has_manifest.then(|| "npm install".to_owned()));
    let build = build_override
        .or_else(|| trimmed(plan.and_then(|plan| plan.build_command.as_deref())))
        .or_else(|| has_manifest.then(|| "npm run build".to_owned()));

    StepCommands { install, build }
}

/// The directory where a local build leaves its output.
///
/// Explicit override, then the build plan's `output_dir`, then `dist`.
pub(crate) fn resolve_output_dir(
    project_dir: &Path,
    override_dir: Option<&str>,
    plan: Option<&BuildPlan>,
) -> PathBuf {
    let dir = trimmed(override_dir)
        .or_else(|| trimmed(plan.and_then(|plan| plan.output_dir.as_deref())))
        .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_owned());
    project_dir.join(dir)
}

/// Run the selected install and build steps in the project directory.
///
/// Each non-empty step is one shell invocation. A non-zero exit aborts
/// with a step-specific error so the orchestrator can attribute the
/// failure to the build stage.
pub(crate) fn run(
    project_dir: &Path,
    steps: &StepCommands,
    reporter: &Reporter,
) -> Result<(), LocalBuildError> {
    if let Some(install) = &steps.install {
        reporter.note(&format!("Running {install}"));
        let status = run_shell(project_dir, install, reporter.mode())?;
        if !status.success() {
            return Err(LocalBuildError::InstallFailed(status));
        }
    }
    if let Some(build) = &steps.build {
        reporter.note(&format!("Running {build}"));
        let status = run_shell(project_dir, build, reporter.mode())?;
        if !status.success() {
            return Err(LocalBuildError::BuildFailed(status));
        }
    }
    Ok(())
}

/// Execute one shell command rooted at `dir`.
///
/// Stderr is always surfaced to the operator. In machine-readable mode
/// the child's stdout is drained onto stderr so that subprocess chatter
/// can never corrupt the JSON envelope on stdout.
fn run_shell(dir: &Path, command: &str, mode: OutputMode) -> Result<ExitStatus, io::Error> {
    let mut shell = Command::new("sh");
    shell
        .args(["-lc", command])
        .current_dir(dir)
        .stderr(Stdio::inherit());

    match mode {
        OutputMode::Text => {
            shell.stdout(Stdio::inherit());
            shell.status()
        }
        OutputMode::Json => {
            shell.stdout(Stdio::piped());
            let mut child = shell.spawn()?;
            if let Some(mut stdout) = child.stdout.take() {
                io::copy(&mut stdout, &mut io::stderr())?;
            }
            child.wait()
        }
    }
}

/// Trim an optional string, mapping blanks to [`None`].
fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
