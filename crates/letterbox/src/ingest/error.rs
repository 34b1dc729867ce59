use std::time::Duration;

use thiserror::Error;

/// Pipeline failures. Skips are not errors; they live in `IngestResult`.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to parse request body: {0}")]
    Parse(#[from] crate::email::ParseError),

    #[error("missing signature parameters")]
    MissingSignature,

    #[error("invalid signature")]
    InvalidSignature,

    /// Denied creation of a new source. Deliberately harder-failing than
    /// the daily newsletter quota: it blocks an explicit user action and
    /// needs operator or plan attention rather than silent dropping.
    #[error("source limit reached ({current}/{max})")]
    SourceLimit { current: i64, max: i64 },

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("ingestion timed out after {0:?}")]
    Timeout(Duration),
}
