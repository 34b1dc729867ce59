//! The ingestion pipeline: one webhook delivery in, exactly one terminal
//! outcome out (a stored newsletter, a classified skip, or an error).

pub mod error;
pub mod outcome;
pub mod pipeline;

pub use error::IngestError;
pub use outcome::{IngestResult, SkipReason, StoredNewsletter};
pub use pipeline::{Pipeline, RawRequest};
