// Narrated report record

/// Tag of the one report considered current. Writing a new report with this
/// tag supersedes the previous one (INSERT OR REPLACE in the store).
pub const LATEST_REPORT_TAG: &str = "latest";

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub content: String,
    /// Epoch millis, UTC.
    pub generated_at: u64,
    pub tag: String,
}

impl Report {
    pub fn latest(content: String, generated_at: u64) -> Self {
        Self {
            content,
            generated_at,
            tag: LATEST_REPORT_TAG.to_string(),
        }
    }
}
