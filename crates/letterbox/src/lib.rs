pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod ingest;
pub mod store;

pub use config::{ConfigError, Environment, IngestConfig};
pub use db::Database;
pub use error::{LetterboxError, Result};
pub use ingest::{IngestError, IngestResult, Pipeline, RawRequest, SkipReason};
pub use store::{SqliteStore, Store, StoreError};
