//! Terminal pipeline outcomes.

use serde::Serialize;

/// Why a delivery was acknowledged without storing a newsletter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownRecipient,
    SourceArchived,
    DailyLimitExceeded,
    /// Audit vocabulary for denied source creation; the HTTP response for
    /// that path is still an error, not a skip.
    SourceLimitReached,
    Duplicate,
    /// Audit-only: written best-effort when the pipeline fails after the
    /// recipient was resolved.
    ProcessingError,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::UnknownRecipient => "unknown_recipient",
            SkipReason::SourceArchived => "source_archived",
            SkipReason::DailyLimitExceeded => "daily_limit_exceeded",
            SkipReason::SourceLimitReached => "source_limit_reached",
            SkipReason::Duplicate => "duplicate",
            SkipReason::ProcessingError => "processing_error",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored newsletter as reported back to the relay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNewsletter {
    pub id: String,
    pub user_id: String,
    pub source_id: String,
    pub title: String,
    pub excerpt: String,
    pub received_at: String,
}

/// Terminal result of one pipeline invocation. Errors travel separately
/// as `IngestError`.
#[derive(Debug, Clone)]
pub enum IngestResult {
    Created(StoredNewsletter),
    Skipped {
        reason: SkipReason,
        message: Option<String>,
    },
}

impl IngestResult {
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            IngestResult::Skipped { reason, .. } => Some(*reason),
            IngestResult::Created(_) => None,
        }
    }
}
