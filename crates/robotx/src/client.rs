use std::{fmt, io, path::Path, time::Duration};

use chrono::{DateTime, Utc};
use derive_more::{Display, Error, From};
use reqwest::{
    blocking::{
        multipart::{Form, Part},
        RequestBuilder,
    },
    StatusCode,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Request timeout for plain JSON calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Request timeout for bundle uploads, which can carry large archives.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// A project registered with the deployment service.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct Project {
    /// Server-assigned project identifier.
    pub project_id: String,

    /// Validated project name, unique per owner.
    #[serde(default)]
    pub name: String,

    /// `public` or `private`.
    #[serde(default)]
    pub visibility: String,

    /// Preview URL reference, when the server exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,

    /// Production URL reference, when the server exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_url: Option<String>,

    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Last-update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Build instructions inferred by the server from an uploaded bundle.
///
/// Advisory only; the local build runner consumes it as a fallback when
/// no explicit command overrides are given.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct BuildPlan {
    /// Whether the project needs a build step at all.
    #[serde(default)]
    pub needs_build: bool,

    /// Detected build strategy name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Suggested dependency-install command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,

    /// Suggested build command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    /// Directory the build writes its output to, relative to the project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Runtime image the server would use for this project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_image: Option<String>,

    /// Node.js version detected from the project manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
}

/// Server-side scan results attached to an uploaded commit.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct ScannerResult {
    /// Inferred build plan, when scanning succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_plan: Option<BuildPlan>,
}

/// An uploaded source bundle. Immutable once created.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct SourceCommit {
    /// Server-assigned commit identifier.
    pub commit_id: String,

    /// Owning project.
    #[serde(default)]
    pub project_id: String,

    /// Scan results, when the server analyzed the bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner_result: Option<ScannerResult>,
}

/// Lifecycle state of a build.
///
/// States move forward only: `queued -> running -> {success|failed}`.
/// Values this client does not recognize are carried verbatim and treated
/// as fatal by the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum BuildStatus {
    /// Accepted by the server, not yet started.
    Queued,

    /// Build in progress.
    Running,

    /// Terminal: artifacts are ready.
    Success,

    /// Terminal: the build failed.
    Failed,

    /// Any other server-reported value, preserved for error messages.
    Unknown(String),
}

impl BuildStatus {
    /// Whether no further transition can occur from this status.
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Wire representation of the status.
    pub(crate) fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Unknown(value) => value,
        }
    }
}

impl Default for BuildStatus {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for BuildStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "success" => Self::Success,
            "failed" => Self::Failed,
            _ => Self::Unknown(value),
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BuildStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from(String::deserialize(deserializer)?))
    }
}

impl Serialize for BuildStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A build record. Mutated only by the server; polled read-only here.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct Build {
    /// Server-assigned build identifier.
    pub build_id: String,

    /// Owning project.
    #[serde(default)]
    pub project_id: String,

    /// Source commit the build was created from.
    #[serde(default)]
    pub commit_id: String,

    /// Current lifecycle status.
    #[serde(default)]
    pub status: BuildStatus,

    /// Monotonic version sequence, assigned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_seq: Option<i64>,

    /// Caller-supplied version label, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,

    /// Free-text source provenance (tag, branch and commit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,

    /// Preview URL for the finished build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_path: Option<String>,

    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Completion timestamp, present once the build is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Optional version identifiers threaded through upload and trigger calls
/// so that CI systems can stamp deterministic versions.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct BuildVersionInput {
    /// Caller-supplied version label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,

    /// Caller-supplied source reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
}

impl BuildVersionInput {
    /// Build the input from raw flag values, trimming and dropping blanks.
    ///
    /// Returns [`None`] when neither field carries a value.
    pub(crate) fn from_parts(label: Option<&str>, source_ref: Option<&str>) -> Option<Self> {
        let version_label = label
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);
        let source_ref = source_ref
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);
        if version_label.is_none() && source_ref.is_none() {
            return None;
        }
        Some(Self {
            version_label,
            source_ref,
        })
    }
}

/// Result of a source upload: the created commit and, when the server
/// eagerly creates one, the associated build.
#[derive(Debug)]
pub(crate) struct UploadResponse {
    /// The created source commit, when one was recoverable.
    pub commit: Option<SourceCommit>,

    /// A build created alongside the commit, when the server returned one.
    pub build: Option<Build>,
}

/// A backend-reported failure with a decoded message.
#[derive(Debug)]
pub(crate) struct ApiError {
    /// HTTP status of the failed response.
    pub status: u16,

    /// Best message recovered from the response body.
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "API error: status {}", self.status)
        } else {
            write!(f, "API error (status {}): {}", self.status, self.message)
        }
    }
}

impl std::error::Error for ApiError {}

/// Gateway call errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ClientError {
    /// IO-related error.
    Io(io::Error),

    /// HTTP transport error.
    Http(reqwest::Error),

    /// Response body could not be decoded.
    Json(serde_json::Error),

    /// The backend reported a failure.
    Api(ApiError),

    /// The upload was accepted but no commit or build id was returned.
    #[display(fmt = "upload accepted but no commit id returned")]
    MissingCommitId,
}

/// Operations the orchestrator needs from the deployment backend.
///
/// The concrete wire format belongs to the server; this trait pins down
/// the call contract the pipeline's control flow depends on.
pub(crate) trait Gateway {
    /// Idempotent create-or-update of a project by name for the
    /// authenticated owner.
    fn resolve_project(&self, name: &str, visibility: &str) -> Result<Project, ClientError>;

    /// Fetch a project by id.
    fn get_project(&self, project_id: &str) -> Result<Project, ClientError>;

    /// Upload a source bundle, creating a commit and possibly a build.
    fn upload_source(
        &self,
        project_id: &str,
        bundle: &Path,
        version: Option<&BuildVersionInput>,
    ) -> Result<UploadResponse, ClientError>;

    /// Create and start a build from an uploaded commit.
    fn trigger_build(
        &self,
        project_id: &str,
        commit_id: &str,
        version: Option<&BuildVersionInput>,
    ) -> Result<Build, ClientError>;

    /// Start a build the upload already created.
    fn start_build(&self, project_id: &str, build_id: &str) -> Result<(), ClientError>;

    /// Fetch the current build record.
    fn get_build(&self, project_id: &str, build_id: &str) -> Result<Build, ClientError>;

    /// Fetch the accumulated build logs as plain text.
    fn get_build_logs(&self, project_id: &str, build_id: &str) -> Result<String, ClientError>;

    /// Upload a bundle of locally built artifacts for a build.
    fn upload_build_artifacts(&self, build_id: &str, bundle: &Path)
        -> Result<Build, ClientError>;

    /// Promote a successful build to production. Returns the production
    /// path, which may be empty when the server does not report one.
    fn publish_build(&self, project_id: &str, build_id: &str) -> Result<String, ClientError>;
}

/// Blocking HTTP implementation of the [`Gateway`] contract.
pub(crate) struct HttpClient {
    /// Server base URL without a trailing slash.
    base_url: String,

    /// Bearer token for every request.
    api_key: String,

    /// Shared blocking HTTP client.
    http: reqwest::blocking::Client,
}

impl HttpClient {
    /// Create a client for the given server and credential.
    pub(crate) fn new(base_url: &str, api_key: &str) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            http,
        })
    }

    /// Absolute URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticated GET request builder.
    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(&self.api_key)
    }

    /// Authenticated POST request builder.
    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(&self.api_key)
    }

    /// Send a request and return the status plus raw body.
    fn send(&self, request: RequestBuilder) -> Result<(StatusCode, Vec<u8>), ClientError> {
        let response = request.send()?;
        let status = response.status();
        let body = response.bytes()?.to_vec();
        Ok((status, body))
    }

    /// Send a request, fail on non-2xx, and decode the JSON body.
    fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let (status, body) = self.send(request)?;
        if !status.is_success() {
            return Err(parse_error(status, &body).into());
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

impl Gateway for HttpClient {
    fn resolve_project(&self, name: &str, visibility: &str) -> Result<Project, ClientError> {
        /// Request body for project resolution.
        #[derive(Serialize)]
        struct CreateProjectRequest<'a> {
            /// Requested project name.
            name: &'a str,

            /// Requested visibility.
            visibility: &'a str,
        }

        self.send_json(
            self.post("/api/projects")
                .json(&CreateProjectRequest { name, visibility }),
        )
    }

    fn get_project(&self, project_id: &str) -> Result<Project, ClientError> {
        self.send_json(self.get(&format!("/api/projects/{project_id}")))
    }

    fn upload_source(
        &self,
        project_id: &str,
        bundle: &Path,
        version: Option<&BuildVersionInput>,
    ) -> Result<UploadResponse, ClientError> {
        let mut form = Form::new().part("file", Part::file(bundle)?.mime_str("application/zip")?);
        if let Some(version) = version {
            if let Some(label) = &version.version_label {
                form = form.text("version_label", label.clone());
            }
            if let Some(source_ref) = &version.source_ref {
                form = form.text("source_ref", source_ref.clone());
            }
        }

        let (status, body) = self.send(
            self.post(&format!("/api/projects/{project_id}/commits"))
                .timeout(UPLOAD_TIMEOUT)
                .multipart(form),
        )?;
        if !status.is_success() {
            return Err(parse_error(status, &body).into());
        }
        parse_upload_response(project_id, &body)
    }

    fn trigger_build(
        &self,
        project_id: &str,
        commit_id: &str,
        version: Option<&BuildVersionInput>,
    ) -> Result<Build, ClientError> {
        /// Request body for triggering a build from a commit.
        #[derive(Serialize)]
        struct TriggerBuildRequest<'a> {
            /// Commit to build from.
            commit_id: &'a str,

            /// Optional caller-supplied version label.
            #[serde(skip_serializing_if = "Option::is_none")]
            version_label: Option<&'a str>,

            /// Optional caller-supplied source reference.
            #[serde(skip_serializing_if = "Option::is_none")]
            source_ref: Option<&'a str>,
        }

        self.send_json(
            self.post(&format!("/api/projects/{project_id}/builds"))
                .json(&TriggerBuildRequest {
                    commit_id,
                    version_label: version.and_then(|v| v.version_label.as_deref()),
                    source_ref: version.and_then(|v| v.source_ref.as_deref()),
                }),
        )
    }

    fn start_build(&self, project_id: &str, build_id: &str) -> Result<(), ClientError> {
        /// Request body for starting an existing build.
        #[derive(Serialize)]
        struct StartBuildRequest<'a> {
            /// Owning project.
            project_id: &'a str,
        }

        let (status, body) = self.send(
            self.post(&format!("/api/builds/{build_id}/start"))
                .json(&StartBuildRequest { project_id }),
        )?;
        if !status.is_success() {
            return Err(parse_error(status, &body).into());
        }
        Ok(())
    }

    fn get_build(&self, project_id: &str, build_id: &str) -> Result<Build, ClientError> {
        let (status, body) = self.send(self.get(&format!("/api/builds/{build_id}")))?;
        // Older servers only expose the project-scoped route.
        let (status, body) = if status == StatusCode::NOT_FOUND && !project_id.is_empty() {
            self.send(self.get(&format!("/api/projects/{project_id}/builds/{build_id}")))?
        } else {
            (status, body)
        };
        if !status.is_success() {
            return Err(parse_error(status, &body).into());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    fn get_build_logs(&self, project_id: &str, build_id: &str) -> Result<String, ClientError> {
        let (status, body) = self.send(self.get(&format!("/api/builds/{build_id}/logs/stream")))?;
        let (status, body) = if status == StatusCode::NOT_FOUND && !project_id.is_empty() {
            self.send(self.get(&format!(
                "/api/projects/{project_id}/builds/{build_id}/logs"
            )))?
        } else {
            (status, body)
        };
        if !status.is_success() {
            return Err(parse_error(status, &body).into());
        }
        Ok(decode_sse(&String::from_utf8_lossy(&body)))
    }

    fn upload_build_artifacts(
        &self,
        build_id: &str,
        bundle: &Path,
    ) -> Result<Build, ClientError> {
        let form = Form::new().part("file", Part::file(bundle)?.mime_str("application/zip")?);
        let (status, body) = self.send(
            self.post(&format!("/api/builds/{build_id}/artifacts"))
                .timeout(UPLOAD_TIMEOUT)
                .multipart(form),
        )?;
        if !status.is_success() {
            return Err(parse_error(status, &body).into());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    fn publish_build(&self, project_id: &str, build_id: &str) -> Result<String, ClientError> {
        /// Request body for publishing a build.
        #[derive(Serialize)]
        struct PublishRequest<'a> {
            /// Build to promote.
            build_id: &'a str,
        }

        /// Response body of a publish call.
        #[derive(Deserialize)]
        struct PublishResponse {
            /// Production path, when the server reports one.
            #[serde(default)]
            public_path: String,
        }

        let (status, body) = self.send(
            self.post(&format!("/api/projects/{project_id}/publish"))
                .json(&PublishRequest { build_id }),
        )?;
        if !status.is_success() {
            return Err(parse_error(status, &body).into());
        }
        let decoded: PublishResponse = match serde_json::from_slice(&body) {
            Ok(decoded) => decoded,
            Err(_) => PublishResponse {
                public_path: String::new(),
            },
        };
        Ok(decoded.public_path)
    }
}

/// One level of the upload response body.
///
/// A single schema covers every shape the server is known to produce:
/// the direct `{commit, build}` object, the wrapped `{"data": {...}}`
/// variant, and bare top-level `commit_id`/`build_id` fields.
#[derive(Default, Deserialize)]
struct UploadBody {
    /// Full commit object, when present.
    #[serde(default)]
    commit: Option<SourceCommit>,

    /// Full build object, when present.
    #[serde(default)]
    build: Option<Build>,

    /// Bare commit id, used by servers that skip the commit object.
    #[serde(default)]
    commit_id: Option<String>,

    /// Bare build id, used by servers that skip the build object.
    #[serde(default)]
    build_id: Option<String>,

    /// Wrapped payload variant.
    #[serde(default)]
    data: Option<Box<UploadBody>>,
}

/// Decode an upload response body into a commit and optional build.
///
/// This is the single tolerance point for the upload endpoint's shape
/// variants; the fallback order is fixed: direct fields, then the wrapped
/// `data` object, then bare ids. An accepted response from which neither a
/// commit nor a build id can be recovered is an error.
fn parse_upload_response(project_id: &str, body: &[u8]) -> Result<UploadResponse, ClientError> {
    let top: UploadBody = if body.is_empty() {
        UploadBody::default()
    } else {
        serde_json::from_slice(body)?
    };
    let inner = top.data.map(|boxed| *boxed).unwrap_or_default();

    let commit_id = top
        .commit_id
        .or(inner.commit_id)
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty());
    let build_id = top
        .build_id
        .or(inner.build_id)
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty());

    let commit = top.commit.or(inner.commit).or_else(|| {
        commit_id.map(|commit_id| SourceCommit {
            commit_id,
            project_id: project_id.to_owned(),
            ..SourceCommit::default()
        })
    });
    let build = top.build.or(inner.build).or_else(|| {
        build_id.map(|build_id| Build {
            build_id,
            project_id: project_id.to_owned(),
            ..Build::default()
        })
    });

    if commit.is_none() && build.is_none() {
        return Err(ClientError::MissingCommitId);
    }
    Ok(UploadResponse { commit, build })
}

/// Decode an error response body into an [`ApiError`].
///
/// Prefers `message`, then `detail`, then a string or object-shaped
/// `error` field; falls back to the raw body text.
fn parse_error(status: StatusCode, body: &[u8]) -> ApiError {
    let mut message = String::new();
    let mut code = String::new();

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(found) = value["code"].as_str() {
            code = found.trim().to_owned();
        }
        message = value["message"]
            .as_str()
            .or_else(|| value["detail"].as_str())
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .or_else(|| match &value["error"] {
                serde_json::Value::String(text) => Some(text.trim().to_owned()),
                serde_json::Value::Object(fields) => ["message", "detail", "error", "msg"]
                    .iter()
                    .find_map(|key| fields.get(*key))
                    .and_then(|raw| raw.as_str())
                    .map(|text| text.trim().to_owned()),
                _ => None,
            })
            .filter(|text| !text.is_empty())
            .unwrap_or_default();
    }

    if message.is_empty() {
        message = String::from_utf8_lossy(body).trim().to_owned();
    }
    if !code.is_empty() && !message.is_empty() {
        message = format!("code {code}: {message}");
    }
    ApiError {
        status: status.as_u16(),
        message,
    }
}

/// Extract the payload lines of a server-sent-events log stream.
fn decode_sse(body: &str) -> String {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_status_round_trips_known_values() {
        for (raw, status) in [
            ("queued", BuildStatus::Queued),
            ("running", BuildStatus::Running),
            ("success", BuildStatus::Success),
            ("failed", BuildStatus::Failed),
        ] {
            assert_eq!(BuildStatus::from(raw.to_string()), status);
            assert_eq!(status.as_str(), raw);
        }
        assert!(BuildStatus::Success.is_terminal());
        assert!(BuildStatus::Failed.is_terminal());
        assert!(!BuildStatus::Running.is_terminal());
    }

    #[test]
    fn build_status_preserves_unknown_values() {
        let status = BuildStatus::from("weird".to_string());
        assert_eq!(status, BuildStatus::Unknown("weird".to_string()));
        assert!(!status.is_terminal());
        assert_eq!(status.to_string(), "weird");
    }

    #[test]
    fn upload_response_decodes_direct_shape() {
        let body = serde_json::json!({
            "commit": {"commit_id": "c1", "project_id": "proj_1"},
            "build": {"build_id": "b1", "status": "queued"},
        });
        let decoded =
            parse_upload_response("proj_1", body.to_string().as_bytes()).expect("direct shape");
        assert_eq!(decoded.commit.unwrap().commit_id, "c1");
        let build = decoded.build.unwrap();
        assert_eq!(build.build_id, "b1");
        assert_eq!(build.status, BuildStatus::Queued);
    }

    #[test]
    fn upload_response_decodes_wrapped_shape() {
        let body = serde_json::json!({
            "data": {
                "commit": {"commit_id": "c1"},
                "build_id": "b1",
            }
        });
        let decoded =
            parse_upload_response("proj_1", body.to_string().as_bytes()).expect("wrapped shape");
        assert_eq!(decoded.commit.unwrap().commit_id, "c1");
        let build = decoded.build.unwrap();
        assert_eq!(build.build_id, "b1");
        assert_eq!(build.project_id, "proj_1");
    }

    #[test]
    fn upload_response_recovers_bare_commit_id() {
        let body = serde_json::json!({"commit_id": "c1"});
        let decoded =
            parse_upload_response("proj_1", body.to_string().as_bytes()).expect("bare id");
        let commit = decoded.commit.unwrap();
        assert_eq!(commit.commit_id, "c1");
        assert_eq!(commit.project_id, "proj_1");
        assert!(decoded.build.is_none());
    }

    #[test]
    fn upload_response_rejects_empty_body() {
        let err = parse_upload_response("proj_1", b"").unwrap_err();
        assert!(matches!(err, ClientError::MissingCommitId));
    }

    #[test]
    fn error_body_message_extraction() {
        let api = parse_error(
            StatusCode::BAD_REQUEST,
            br#"{"message": "name already taken"}"#,
        );
        assert_eq!(api.to_string(), "API error (status 400): name already taken");

        let api = parse_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            br#"{"error": {"detail": "invalid visibility"}, "code": "bad_input"}"#,
        );
        assert_eq!(
            api.to_string(),
            "API error (status 422): code bad_input: invalid visibility"
        );

        let api = parse_error(StatusCode::BAD_GATEWAY, b"upstream exploded");
        assert_eq!(api.to_string(), "API error (status 502): upstream exploded");

        let api = parse_error(StatusCode::INTERNAL_SERVER_ERROR, b"");
        assert_eq!(api.to_string(), "API error: status 500");
    }

    #[test]
    fn sse_payload_lines_are_joined() {
        let body = "data: line one\n\ndata: line two\nid: 3\n";
        assert_eq!(decode_sse(body), "line one\nline two");
    }

    #[test]
    fn version_input_drops_blank_parts() {
        assert!(BuildVersionInput::from_parts(None, None).is_none());
        assert!(BuildVersionInput::from_parts(Some("  "), Some("")).is_none());
        let version = BuildVersionInput::from_parts(Some(" v1.2.3 "), None).unwrap();
        assert_eq!(version.version_label.as_deref(), Some("v1.2.3"));
        assert!(version.source_ref.is_none());
    }
}
