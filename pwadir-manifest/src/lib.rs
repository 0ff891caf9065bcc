pub mod color;
pub mod icon;
pub mod manifest;
pub mod validate;

pub use icon::{Icon, IconSizes};
pub use manifest::{Manifest, ManifestError};
pub use validate::{IssueCode, ManifestIssue, Severity};

/// Icons smaller than this edge (in px) are flagged as too small for listing cards.
pub const DEFAULT_MIN_ICON_EDGE: u32 = 144;
