//! Peregrine Content Extraction
//!
//! Point-in-time reads from a tab's rendered page: HTML content, script
//! evaluation and screenshots. Nothing here is cached; every call crosses
//! into the engine and reports what the page looked like at that moment.

mod error;
mod extractor;
mod snapshot;

pub use error::ExtractError;
pub use extractor::ContentExtractor;
pub use snapshot::{ContentSnapshot, SnapshotPayload, SnapshotStatus};

pub type Result<T> = std::result::Result<T, ExtractError>;
