use crate::DEFAULT_MIN_ICON_EDGE;
use crate::manifest::Manifest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// The manifest body could not be read as a JSON object.
    Unreadable,
    NoName,
    NoStartUrl,
    NoIcons,
    StartUrlDefaulted,
    StartUrlCrossOrigin,
    InvalidColor,
    InvalidIcon,
    NoLargeIcon,
}

impl IssueCode {
    pub fn severity(self) -> Severity {
        match self {
            IssueCode::Unreadable
            | IssueCode::NoName
            | IssueCode::NoStartUrl
            | IssueCode::NoIcons => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestIssue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
}

impl ManifestIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Manifest {
    /// Every issue found in the manifest, errors first.
    pub fn validate(&self) -> Vec<ManifestIssue> {
        let mut issues = self.parse_issues.clone();

        if self.display_name().is_none() {
            issues.push(ManifestIssue::new(
                IssueCode::NoName,
                "manifest declares neither name nor short_name",
            ));
        }

        if self.start_url_defaulted {
            issues.push(ManifestIssue::new(
                IssueCode::StartUrlDefaulted,
                "start_url missing; using the site root",
            ));
        }

        if let Some(start_url) = &self.start_url {
            if start_url.origin() != self.manifest_url.origin() {
                issues.push(ManifestIssue::new(
                    IssueCode::StartUrlCrossOrigin,
                    format!("start_url {start_url} is not same-origin with the manifest"),
                ));
            }
        }

        if self.icons.is_empty() {
            issues.push(ManifestIssue::new(
                IssueCode::NoIcons,
                "manifest declares no usable icons",
            ));
        } else if self
            .icons
            .iter()
            .all(|icon| icon.max_edge() < DEFAULT_MIN_ICON_EDGE)
        {
            issues.push(ManifestIssue::new(
                IssueCode::NoLargeIcon,
                format!("no icon is at least {DEFAULT_MIN_ICON_EDGE}px"),
            ));
        }

        issues.sort_by_key(|issue| issue.severity != Severity::Error);
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn parse(text: &str) -> Manifest {
        let url = Url::parse("https://pwa.example.org/manifest.webmanifest").unwrap();
        Manifest::parse(text, &url).unwrap()
    }

    fn codes(manifest: &Manifest) -> Vec<IssueCode> {
        manifest.validate().into_iter().map(|i| i.code).collect()
    }

    #[test]
    fn complete_manifest_has_no_issues() {
        let manifest = parse(
            r##"{
                "name": "Complete",
                "start_url": "/",
                "theme_color": "#000",
                "icons": [{ "src": "/i.png", "sizes": "512x512" }]
            }"##,
        );
        assert!(manifest.validate().is_empty());
    }

    #[test]
    fn empty_manifest_reports_errors_before_warnings() {
        let issues = parse("{}").validate();
        let errors: Vec<_> = issues.iter().take_while(|i| i.is_error()).map(|i| i.code).collect();
        assert_eq!(errors, vec![IssueCode::NoName, IssueCode::NoIcons]);
        assert!(issues.iter().any(|i| i.code == IssueCode::StartUrlDefaulted));
    }

    #[test]
    fn cross_origin_start_url_is_only_a_warning() {
        let manifest = parse(
            r#"{
                "short_name": "X",
                "start_url": "https://other.example.org/",
                "icons": [{ "src": "/i.svg", "sizes": "any" }]
            }"#,
        );
        let issues = manifest.validate();
        assert_eq!(codes(&manifest), vec![IssueCode::StartUrlCrossOrigin]);
        assert!(issues.iter().all(|i| !i.is_error()));
    }

    #[test]
    fn non_http_start_url_is_an_error() {
        let manifest = parse(
            r#"{ "name": "X", "start_url": "javascript:alert(1)", "icons": [{ "src": "/i.png", "sizes": "192x192" }] }"#,
        );
        assert_eq!(codes(&manifest), vec![IssueCode::NoStartUrl]);
    }

    #[test]
    fn small_icons_are_flagged() {
        let manifest = parse(
            r#"{ "name": "X", "start_url": "/", "icons": [{ "src": "/i.png", "sizes": "48x48" }] }"#,
        );
        assert_eq!(codes(&manifest), vec![IssueCode::NoLargeIcon]);
    }

    #[test]
    fn issue_serializes_with_screaming_code() {
        let issue = ManifestIssue::new(IssueCode::NoName, "m");
        let json = serde_json::to_string(&issue).unwrap();
        assert_eq!(json, r#"{"code":"NO_NAME","severity":"error","message":"m"}"#);
    }
}
