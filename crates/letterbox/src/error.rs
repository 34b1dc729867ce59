use thiserror::Error;

#[derive(Error, Debug)]
pub enum LetterboxError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] crate::ingest::IngestError),
}

pub type Result<T> = std::result::Result<T, LetterboxError>;
