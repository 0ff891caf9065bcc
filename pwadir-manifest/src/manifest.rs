use crate::color;
use crate::icon::{Icon, IconSizes};
use crate::validate::{IssueCode, ManifestIssue};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error as ThisError;
use url::Url;

#[derive(Debug, ThisError)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("manifest must be a JSON object")]
    NotAnObject,
}

/// A Web App Manifest with every URL resolved against the manifest location.
///
/// Fields holding the wrong JSON type are treated as absent, the way browsers
/// ignore them.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub manifest_url: Url,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub start_url: Option<Url>,
    pub scope: Option<Url>,
    pub display: Option<String>,
    pub background_color: Option<String>,
    pub theme_color: Option<String>,
    pub icons: Vec<Icon>,

    /// Issues found while reading the document (dropped colors, bad icon srcs, ...).
    #[serde(skip)]
    pub(crate) parse_issues: Vec<ManifestIssue>,
    #[serde(skip)]
    pub(crate) start_url_defaulted: bool,
}

impl Manifest {
    pub fn parse(text: &str, manifest_url: &Url) -> Result<Self, ManifestError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(obj) = value else {
            return Err(ManifestError::NotAnObject);
        };

        let mut parse_issues = Vec::new();

        let (start_url, start_url_defaulted) = match string_field(&obj, "start_url") {
            Some(raw) => (resolve_http(manifest_url, &raw), false),
            None => (manifest_url.join("/").ok(), true),
        };
        if start_url.is_none() {
            parse_issues.push(ManifestIssue::new(
                IssueCode::NoStartUrl,
                "start_url cannot be resolved to an http(s) URL",
            ));
        }

        let scope = string_field(&obj, "scope").and_then(|raw| resolve_http(manifest_url, &raw));

        let mut read_color = |key: &str| {
            let raw = string_field(&obj, key)?;
            let normalized = color::normalize(&raw);
            if normalized.is_none() {
                parse_issues.push(ManifestIssue::new(
                    IssueCode::InvalidColor,
                    format!("{key} `{raw}` is not a CSS color"),
                ));
            }
            normalized
        };
        let background_color = read_color("background_color");
        let theme_color = read_color("theme_color");

        let icons = match obj.get("icons") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| {
                    let icon = read_icon(item, manifest_url);
                    if icon.is_none() {
                        parse_issues.push(ManifestIssue::new(
                            IssueCode::InvalidIcon,
                            "icon entry without a resolvable src was ignored",
                        ));
                    }
                    icon
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            manifest_url: manifest_url.clone(),
            name: string_field(&obj, "name"),
            short_name: string_field(&obj, "short_name"),
            description: string_field(&obj, "description"),
            start_url,
            scope,
            display: string_field(&obj, "display"),
            background_color,
            theme_color,
            icons,
            parse_issues,
            start_url_defaulted,
        })
    }

    /// `name`, else `short_name`.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.short_name.as_deref())
    }

    /// Best icon for a listing card: purpose `any` first, then the largest edge, then PNG.
    pub fn best_icon(&self) -> Option<&Icon> {
        self.icons.iter().max_by_key(|icon| icon.rank())
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn resolve_http(base: &Url, raw: &str) -> Option<Url> {
    base.join(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

fn read_icon(item: &Value, manifest_url: &Url) -> Option<Icon> {
    let obj = item.as_object()?;
    let src = resolve_http(manifest_url, &string_field(obj, "src")?)?;
    let sizes = string_field(obj, "sizes")
        .map(|raw| IconSizes::parse(&raw))
        .unwrap_or(IconSizes::Fixed(Vec::new()));
    let purpose = string_field(obj, "purpose")
        .map(|raw| raw.split_whitespace().map(str::to_ascii_lowercase).collect())
        .unwrap_or_default();

    Some(Icon {
        src,
        sizes,
        mime_type: string_field(obj, "type"),
        purpose,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://app.example.com/static/manifest.json").unwrap()
    }

    #[test]
    fn resolves_relative_urls_against_manifest_location() {
        let manifest = Manifest::parse(
            r#"{
                "name": "Weather",
                "start_url": "../index.html?utm_source=homescreen",
                "icons": [{ "src": "icons/192.png", "sizes": "192x192" }]
            }"#,
            &base(),
        )
        .unwrap();

        assert_eq!(
            manifest.start_url.unwrap().as_str(),
            "https://app.example.com/index.html?utm_source=homescreen"
        );
        assert_eq!(
            manifest.icons[0].src.as_str(),
            "https://app.example.com/static/icons/192.png"
        );
    }

    #[test]
    fn missing_start_url_defaults_to_origin_root() {
        let manifest = Manifest::parse(r#"{ "name": "X" }"#, &base()).unwrap();
        assert_eq!(manifest.start_url.unwrap().as_str(), "https://app.example.com/");
        assert!(manifest.start_url_defaulted);
    }

    #[test]
    fn wrong_types_are_ignored() {
        let manifest =
            Manifest::parse(r#"{ "name": 42, "short_name": "S", "icons": "nope" }"#, &base()).unwrap();
        assert_eq!(manifest.name, None);
        assert_eq!(manifest.display_name(), Some("S"));
        assert!(manifest.icons.is_empty());
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(matches!(
            Manifest::parse("[1, 2]", &base()),
            Err(ManifestError::NotAnObject)
        ));
        assert!(matches!(
            Manifest::parse("<html>", &base()),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn tolerates_byte_order_mark() {
        let manifest = Manifest::parse("\u{feff}{\"name\":\"Bom\"}", &base()).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("Bom"));
    }

    #[test]
    fn best_icon_prefers_purpose_any_over_larger_maskable() {
        let manifest = Manifest::parse(
            r#"{
                "name": "Icons",
                "icons": [
                    { "src": "a.png", "sizes": "512x512", "purpose": "maskable" },
                    { "src": "b.png", "sizes": "192x192", "type": "image/png" },
                    { "src": "c.webp", "sizes": "192x192", "type": "image/webp" },
                    { "src": "d.png", "sizes": "96x96" }
                ]
            }"#,
            &base(),
        )
        .unwrap();

        let best = manifest.best_icon().unwrap();
        assert!(best.src.as_str().ends_with("/b.png"));
    }

    #[test]
    fn invalid_colors_are_dropped_and_reported() {
        let manifest = Manifest::parse(
            r##"{ "name": "C", "theme_color": "#ABCDEF", "background_color": "blurple" }"##,
            &base(),
        )
        .unwrap();
        assert_eq!(manifest.theme_color.as_deref(), Some("#abcdef"));
        assert_eq!(manifest.background_color, None);
        assert!(
            manifest
                .parse_issues
                .iter()
                .any(|i| i.code == IssueCode::InvalidColor)
        );
    }
}
