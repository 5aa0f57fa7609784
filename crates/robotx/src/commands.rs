use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::output::OutputMode;

/// `deploy` subcommand.
pub(crate) mod deploy;

/// `publish` subcommand.
pub(crate) mod publish;

/// `status` subcommand.
pub(crate) mod status;

/// Requested rendering of the final result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-oriented prose.
    #[default]
    Text,

    /// One JSON envelope on stdout.
    Json,
}

/// Deploy static sites and applications from the command line.
#[derive(Debug, Parser)]
#[command(name = "robotx", version, about)]
pub(crate) struct Cli {
    /// Server base URL; overrides the configuration file and environment.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// API key; overrides the configuration file and environment.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Output format of the final result.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Shorthand for `--output json`.
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Stream routing selected by the output flags.
    pub(crate) fn output_mode(&self) -> OutputMode {
        if self.json || self.output == OutputFormat::Json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Package a project, upload it, build it, and optionally publish it.
    Deploy(DeployArgs),

    /// Promote an already-built build to production.
    Publish(PublishArgs),

    /// Show a project's current state, optionally with build logs.
    Status(StatusArgs),
}

/// Arguments of the `deploy` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct DeployArgs {
    /// Project directory to deploy.
    #[arg(default_value = ".")]
    pub path: String,

    /// Project name; defaults to the directory name.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Project visibility.
    #[arg(long, default_value = "private")]
    pub visibility: String,

    /// Publish to production after a successful build.
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub publish: bool,

    /// Wait for the build to reach a terminal status.
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub wait: bool,

    /// Maximum time to wait for build completion, in seconds.
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,

    /// Build locally and upload the output instead of building remotely.
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub local_build: bool,

    /// Install command for local builds.
    #[arg(long)]
    pub install_command: Option<String>,

    /// Build command for local builds.
    #[arg(long)]
    pub build_command: Option<String>,

    /// Output directory for local builds.
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Version label to stamp on the created build.
    #[arg(long)]
    pub version_label: Option<String>,

    /// Source reference (tag, branch, or commit) to record on the build.
    #[arg(long)]
    pub source_ref: Option<String>,
}

/// Arguments of the `publish` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct PublishArgs {
    /// Project owning the build.
    #[arg(short, long)]
    pub project_id: String,

    /// Build to promote to production.
    #[arg(short, long)]
    pub build_id: String,
}

/// Arguments of the `status` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct StatusArgs {
    /// Project to inspect.
    #[arg(short, long)]
    pub project_id: String,

    /// Specific build to inspect; defaults to project-level status only.
    #[arg(short, long)]
    pub build_id: Option<String>,

    /// Include build logs in the report.
    #[arg(short, long)]
    pub logs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_defaults() {
        let cli = Cli::parse_from(["robotx", "deploy"]);
        assert_eq!(cli.output_mode(), crate::output::OutputMode::Text);
        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.path, ".");
        assert_eq!(args.visibility, "private");
        assert!(args.publish);
        assert!(args.wait);
        assert!(args.local_build);
        assert_eq!(args.timeout, 600);
    }

    #[test]
    fn boolean_flags_accept_explicit_values() {
        let cli = Cli::parse_from([
            "robotx",
            "deploy",
            "./site",
            "--publish=false",
            "--wait",
            "false",
            "--local-build=false",
        ]);
        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.path, "./site");
        assert!(!args.publish);
        assert!(!args.wait);
        assert!(!args.local_build);
    }

    #[test]
    fn json_flags_select_machine_mode() {
        let cli = Cli::parse_from(["robotx", "deploy", "--json"]);
        assert_eq!(cli.output_mode(), crate::output::OutputMode::Json);
        let cli = Cli::parse_from(["robotx", "--output", "json", "deploy"]);
        assert_eq!(cli.output_mode(), crate::output::OutputMode::Json);
    }

    #[test]
    fn publish_requires_both_ids() {
        assert!(Cli::try_parse_from(["robotx", "publish", "-p", "proj_1"]).is_err());
        let cli = Cli::parse_from(["robotx", "publish", "-p", "proj_1", "-b", "b1"]);
        let Command::Publish(args) = cli.command else {
            panic!("expected publish");
        };
        assert_eq!(args.project_id, "proj_1");
        assert_eq!(args.build_id, "b1");
    }
}
