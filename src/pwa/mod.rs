//! PWA lifecycle: submission, refresh, listing and exports.

pub mod export;
pub mod listing;
pub mod service;
pub mod view;

pub use listing::ListQuery;
pub use service::{PwaService, PwaServiceParts, RefreshOutcome, Submission};
