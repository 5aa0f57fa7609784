use crate::client::{Build, Project};

/// Best preview URL for a project, preferring server-reported values.
///
/// Order: the build's `preview_path`, the project's preview reference,
/// then the conventional `{base}/preview/{project_id}` fallback.
pub(crate) fn preview_url(base_url: &str, project: &Project, build: Option<&Build>) -> Option<String> {
    if let Some(path) = non_blank(build.and_then(|build| build.preview_path.as_deref())) {
        return Some(path);
    }
    if let Some(url) = non_blank(project.preview_url.as_deref()) {
        return Some(url);
    }
    conventional_url(base_url, &project.project_id, Some("preview"))
}

/// Best production URL for a project, preferring server-reported values.
pub(crate) fn production_url(base_url: &str, project: &Project) -> Option<String> {
    if let Some(url) = non_blank(project.publish_url.as_deref()) {
        return Some(url);
    }
    conventional_url(base_url, &project.project_id, None)
}

/// Conventional production URL when only the project id is known.
pub(crate) fn production_url_for_id(base_url: &str, project_id: &str) -> Option<String> {
    conventional_url(base_url, project_id, None)
}

/// Construct `{base}[/prefix]/{project_id}`.
///
/// Invariant: never fabricates a URL when the project id (or base URL)
/// is unknown.
fn conventional_url(base_url: &str, project_id: &str, prefix: Option<&str>) -> Option<String> {
    let base = base_url.trim().trim_end_matches('/');
    let project_id = project_id.trim();
    if base.is_empty() || project_id.is_empty() {
        return None;
    }
    Some(match prefix {
        Some(prefix) => format!("{base}/{prefix}/{project_id}"),
        None => format!("{base}/{project_id}"),
    })
}

/// Trim an optional string, mapping blanks to [`None`].
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A project with the given id and no URL references.
    fn project(project_id: &str) -> Project {
        Project {
            project_id: project_id.to_owned(),
            ..Project::default()
        }
    }

    #[test]
    fn build_preview_path_wins() {
        let build = Build {
            preview_path: Some("https://x/preview".to_owned()),
            ..Build::default()
        };
        let mut proj = project("proj_1");
        proj.preview_url = Some("https://x/project-preview".to_owned());
        assert_eq!(
            preview_url("https://x", &proj, Some(&build)).as_deref(),
            Some("https://x/preview")
        );
    }

    #[test]
    fn preview_falls_back_to_convention() {
        assert_eq!(
            preview_url("https://x/", &project("proj_1"), None).as_deref(),
            Some("https://x/preview/proj_1")
        );
    }

    #[test]
    fn production_prefers_the_project_reference() {
        let mut proj = project("proj_1");
        proj.publish_url = Some("https://prod.example".to_owned());
        assert_eq!(
            production_url("https://x", &proj).as_deref(),
            Some("https://prod.example")
        );
        assert_eq!(
            production_url("https://x", &project("proj_1")).as_deref(),
            Some("https://x/proj_1")
        );
    }

    #[test]
    fn no_project_id_means_no_url() {
        assert!(preview_url("https://x", &project(""), None).is_none());
        assert!(production_url("https://x", &project("  ")).is_none());
        assert!(production_url_for_id("", "proj_1").is_none());
    }
}
