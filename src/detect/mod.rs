//! Verse detection over transcript text.
//!
//! Detection is a pluggable capability: text in, a list of reference strings
//! out, ordered by first mention, duplicates kept (repeated quotation is
//! meaningful). Detectors never fail; a detector that can't produce anything
//! returns an empty list.

mod scan;

pub use scan::BookScanDetector;

use async_trait::async_trait;

#[async_trait]
pub trait DetectVerses: Send + Sync {
    /// Reference strings believed to be mentioned in `transcript`, in order
    /// of first mention. Infallible by contract; internal failures come back
    /// as an empty list.
    async fn detect(&self, transcript: &str) -> Vec<String>;
}

/// Detector that always returns the same canned list. The deterministic stub
/// for tests and offline demos.
#[derive(Debug, Clone, Default)]
pub struct FixedDetector {
    references: Vec<String>,
}

impl FixedDetector {
    pub fn new(references: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            references: references.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl DetectVerses for FixedDetector {
    async fn detect(&self, _transcript: &str) -> Vec<String> {
        self.references.clone()
    }
}
