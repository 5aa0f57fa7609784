use std::{borrow::Cow, fmt, time::Duration};

use indicatif::{ProgressBar, ProgressDrawTarget};
use serde::Serialize;

/// Stream routing for one invocation.
///
/// In [`OutputMode::Json`] the primary stream (stdout) carries exactly one
/// structured envelope per invocation; everything else, including progress
/// narration and error envelopes, goes to stderr so that automated callers
/// can parse stdout unconditionally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputMode {
    /// Human-oriented prose; narration and summaries go to stdout.
    Text,

    /// Machine-readable output; stdout carries one JSON envelope.
    Json,
}

/// Closed vocabulary of failure codes.
///
/// Every fatal condition is tagged with one of these at the point of
/// failure; the code is never inferred from message text afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ErrorCode {
    /// The given project directory does not exist or is not a directory.
    InvalidProjectPath,

    /// The derived or explicit project name fails validation.
    InvalidProjectName,

    /// Unusable command-line arguments or configuration.
    InvalidArgument,

    /// No base URL in flags, environment, or the configuration file.
    MissingBaseUrl,

    /// No API key in flags, environment, or the configuration file.
    MissingApiKey,

    /// A backend call failed (network, auth, 4xx/5xx).
    ApiError,

    /// Local archiving of the source tree failed.
    PackageFailed,

    /// Local-build mode was requested but the upload returned no build id.
    LocalBuildUnsupported,

    /// Terminal build failure, polling timeout, or an unknown status value.
    BuildFailed,

    /// The publish call failed after a successful build.
    PublishFailed,

    /// The outcome envelope could not be serialized.
    OutputError,
}

impl ErrorCode {
    /// Stable wire representation of the code.
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidProjectPath => "invalid_project_path",
            Self::InvalidProjectName => "invalid_project_name",
            Self::InvalidArgument => "invalid_argument",
            Self::MissingBaseUrl => "missing_base_url",
            Self::MissingApiKey => "missing_api_key",
            Self::ApiError => "api_error",
            Self::PackageFailed => "package_failed",
            Self::LocalBuildUnsupported => "local_build_unsupported",
            Self::BuildFailed => "build_failed",
            Self::PublishFailed => "publish_failed",
            Self::OutputError => "output_error",
        }
    }

    /// Process exit code associated with the failure class.
    pub(crate) fn exit_code(self) -> i32 {
        match self {
            Self::InvalidProjectPath
            | Self::InvalidProjectName
            | Self::InvalidArgument
            | Self::MissingBaseUrl
            | Self::MissingApiKey
            | Self::PackageFailed
            | Self::OutputError => 1,
            Self::ApiError | Self::LocalBuildUnsupported => 2,
            Self::BuildFailed => 3,
            Self::PublishFailed => 4,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified fatal error carrying its taxonomy code and exit code.
#[derive(Debug)]
pub(crate) struct CliError {
    /// Failure class from the closed taxonomy.
    pub code: ErrorCode,

    /// Human-readable summary, stable enough for automated matching.
    pub message: String,

    /// Optional structured payload for machine consumers.
    pub details: Option<serde_json::Value>,

    /// Underlying error, when one exists.
    pub cause: Option<anyhow::Error>,
}

impl CliError {
    /// Create an error with no underlying cause.
    pub(crate) fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            cause: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub(crate) fn with_cause(
        code: ErrorCode,
        message: impl Into<String>,
        cause: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            cause: Some(cause.into()),
        }
    }

    /// Process exit code for this error.
    pub(crate) fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for CliError {}

/// Wrap a backend call failure with the `api_error` code.
pub(crate) fn api_error<E: Into<anyhow::Error>>(
    message: &'static str,
) -> impl FnOnce(E) -> CliError {
    move |err| CliError::with_cause(ErrorCode::ApiError, message, err)
}

/// Success envelope emitted on stdout in machine-readable mode.
#[derive(Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    /// Always `true`.
    success: bool,

    /// Subcommand name that produced the payload.
    command: &'a str,

    /// Command-specific payload.
    data: &'a T,
}

/// Inner error object of the failure envelope.
#[derive(Serialize)]
struct ErrorBody<'a> {
    /// Taxonomy code.
    code: ErrorCode,

    /// Full failure message, including the underlying cause.
    message: String,

    /// Optional structured payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a serde_json::Value>,
}

/// Failure envelope emitted on stderr in machine-readable mode.
#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    /// Always `false`.
    success: bool,

    /// Classified failure.
    error: ErrorBody<'a>,
}

/// Render the success envelope for a payload.
fn render_success<T: Serialize>(command: &str, data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&SuccessEnvelope {
        success: true,
        command,
        data,
    })
}

/// Render the failure envelope for a classified error.
fn render_error(error: &CliError) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ErrorEnvelope {
        success: false,
        error: ErrorBody {
            code: error.code,
            message: error.to_string(),
            details: error.details.as_ref(),
        },
    })
}

/// Emit a classified error to the diagnostic stream and return the exit code.
pub(crate) fn handle_error(mode: OutputMode, error: &CliError) -> i32 {
    match mode {
        OutputMode::Json => match render_error(error) {
            Ok(envelope) => eprintln!("{envelope}"),
            Err(_) => eprintln!("Error: {error}"),
        },
        OutputMode::Text => eprintln!("Error: {error}"),
    }
    error.exit_code()
}

/// Detect machine-readable mode from raw process arguments.
///
/// Used only when argument parsing itself fails and the parsed options are
/// unavailable; mirrors the parsed `--json` / `--output json` semantics.
pub(crate) fn mode_from_args<I: IntoIterator<Item = String>>(args: I) -> OutputMode {
    let args: Vec<String> = args.into_iter().collect();
    for (position, arg) in args.iter().enumerate() {
        if arg == "--json" {
            return OutputMode::Json;
        }
        if let Some(value) = arg.strip_prefix("--output=") {
            if value.trim().eq_ignore_ascii_case("json") {
                return OutputMode::Json;
            }
        }
        if arg == "--output" {
            if let Some(value) = args.get(position + 1) {
                if value.trim().eq_ignore_ascii_case("json") {
                    return OutputMode::Json;
                }
            }
        }
    }
    OutputMode::Text
}

/// Progress narration and envelope emission for one invocation.
///
/// Owns the spinner in human mode; in machine-readable mode all narration
/// is redirected to stderr and the spinner is hidden.
pub(crate) struct Reporter {
    /// Active stream routing.
    mode: OutputMode,

    /// Spinner used for transient status messages in human mode.
    progress: ProgressBar,
}

impl Reporter {
    /// Create a reporter for the given output mode.
    pub(crate) fn new(mode: OutputMode) -> Self {
        let progress = match mode {
            OutputMode::Text => {
                let progress = ProgressBar::new_spinner();
                progress.set_draw_target(ProgressDrawTarget::stdout());
                progress.enable_steady_tick(Duration::from_millis(150));
                progress
            }
            OutputMode::Json => ProgressBar::hidden(),
        };
        Self { mode, progress }
    }

    /// Active output mode.
    pub(crate) fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Update the transient progress message.
    pub(crate) fn status(&self, message: impl Into<Cow<'static, str>>) {
        let message = message.into();
        match self.mode {
            OutputMode::Text => self.progress.set_message(message),
            OutputMode::Json => eprintln!("{message}"),
        }
    }

    /// Print a persistent narration line on the appropriate stream.
    pub(crate) fn note(&self, line: &str) {
        match self.mode {
            OutputMode::Text => self.progress.println(line),
            OutputMode::Json => eprintln!("{line}"),
        }
    }

    /// Clear the spinner before final output is produced.
    pub(crate) fn finish(&self) {
        self.progress.finish_and_clear();
    }

    /// Emit the success envelope on stdout in machine-readable mode.
    ///
    /// Human mode emits nothing here; commands render their own summaries.
    pub(crate) fn emit_success<T: Serialize>(
        &self,
        command: &str,
        data: &T,
    ) -> Result<(), CliError> {
        if self.mode == OutputMode::Json {
            let envelope = render_success(command, data).map_err(|err| {
                CliError::with_cause(ErrorCode::OutputError, "failed to render JSON output", err)
            })?;
            println!("{envelope}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_taxonomy() {
        assert_eq!(ErrorCode::InvalidProjectPath.exit_code(), 1);
        assert_eq!(ErrorCode::InvalidProjectName.exit_code(), 1);
        assert_eq!(ErrorCode::InvalidArgument.exit_code(), 1);
        assert_eq!(ErrorCode::MissingBaseUrl.exit_code(), 1);
        assert_eq!(ErrorCode::MissingApiKey.exit_code(), 1);
        assert_eq!(ErrorCode::PackageFailed.exit_code(), 1);
        assert_eq!(ErrorCode::OutputError.exit_code(), 1);
        assert_eq!(ErrorCode::ApiError.exit_code(), 2);
        assert_eq!(ErrorCode::LocalBuildUnsupported.exit_code(), 2);
        assert_eq!(ErrorCode::BuildFailed.exit_code(), 3);
        assert_eq!(ErrorCode::PublishFailed.exit_code(), 4);
    }

    #[test]
    fn success_envelope_shape() {
        let data = serde_json::json!({"project_id": "proj_1"});
        let envelope = render_success("deploy", &data).unwrap();
        let value: serde_json::Value = serde_json::from_str(&envelope).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["command"], "deploy");
        assert_eq!(value["data"]["project_id"], "proj_1");
    }

    #[test]
    fn error_envelope_carries_code_and_message() {
        let error = CliError::new(ErrorCode::BuildFailed, "build timeout after 600 seconds");
        let envelope = render_error(&error).unwrap();
        let value: serde_json::Value = serde_json::from_str(&envelope).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "build_failed");
        assert_eq!(value["error"]["message"], "build timeout after 600 seconds");
        assert!(value["error"].get("details").is_none());
    }

    #[test]
    fn error_display_includes_the_cause() {
        let error = CliError::with_cause(
            ErrorCode::ApiError,
            "failed to upload source",
            std::io::Error::new(std::io::ErrorKind::Other, "connection reset"),
        );
        assert_eq!(
            error.to_string(),
            "failed to upload source: connection reset"
        );
    }

    #[test]
    fn json_mode_detected_from_raw_args() {
        let to_args = |args: &[&str]| args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>();
        assert_eq!(
            mode_from_args(to_args(&["deploy", "--json"])),
            OutputMode::Json
        );
        assert_eq!(
            mode_from_args(to_args(&["--output", "json", "deploy"])),
            OutputMode::Json
        );
        assert_eq!(
            mode_from_args(to_args(&["deploy", "--output=JSON"])),
            OutputMode::Json
        );
        assert_eq!(
            mode_from_args(to_args(&["deploy", "--output", "text"])),
            OutputMode::Text
        );
        assert_eq!(mode_from_args(to_args(&["deploy"])), OutputMode::Text);
    }
}
