use serde::{Deserialize, Serialize};
use url::Url;

/// Declared `sizes` of a manifest icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconSizes {
    /// `sizes: "any"`, typically a scalable SVG.
    Any,
    Fixed(Vec<(u32, u32)>),
}

impl IconSizes {
    /// Parses the space-separated `WxH` list. Malformed entries are skipped.
    pub fn parse(raw: &str) -> Self {
        if raw
            .split_whitespace()
            .any(|token| token.eq_ignore_ascii_case("any"))
        {
            return IconSizes::Any;
        }

        let sizes = raw
            .split_whitespace()
            .filter_map(|token| {
                let lower = token.to_ascii_lowercase();
                let (w, h) = lower.split_once('x')?;
                Some((w.parse().ok()?, h.parse().ok()?))
            })
            .collect();
        IconSizes::Fixed(sizes)
    }

    /// Largest declared edge; `Any` reports `u32::MAX`.
    pub fn max_edge(&self) -> u32 {
        match self {
            IconSizes::Any => u32::MAX,
            IconSizes::Fixed(sizes) => sizes.iter().map(|&(w, h)| w.min(h)).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub src: Url,
    pub sizes: IconSizes,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub purpose: Vec<String>,
}

impl Icon {
    /// An icon without `purpose` defaults to `any`.
    pub fn is_purpose_any(&self) -> bool {
        self.purpose.is_empty() || self.purpose.iter().any(|p| p == "any")
    }

    pub fn is_png(&self) -> bool {
        match self.mime_type.as_deref() {
            Some(mime) => mime.eq_ignore_ascii_case("image/png"),
            None => self.src.path().to_ascii_lowercase().ends_with(".png"),
        }
    }

    pub fn max_edge(&self) -> u32 {
        self.sizes.max_edge()
    }

    pub(crate) fn rank(&self) -> (bool, u32, bool) {
        (self.is_purpose_any(), self.max_edge(), self.is_png())
    }
}
