//! Application state and configuration.

use std::path::PathBuf;
use std::sync::Arc;

use letterbox::{Database, IngestConfig, Pipeline, SqliteStore};

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080").
    pub bind_addr: String,

    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Settings handed to the ingestion pipeline.
    pub ingest: IngestConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `LETTERBOX_BIND_ADDR`: Server bind address (default: "0.0.0.0:8080")
    /// - `LETTERBOX_DB_PATH`: SQLite file path (default: "letterbox.db")
    ///
    /// Pipeline variables are documented on [`IngestConfig::from_env`].
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("LETTERBOX_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let database_path: PathBuf = std::env::var("LETTERBOX_DB_PATH")
            .unwrap_or_else(|_| "letterbox.db".to_string())
            .into();

        let ingest = IngestConfig::from_env()?;

        tracing::info!(
            bind_addr = %bind_addr,
            database = %database_path.display(),
            "server configuration loaded"
        );

        Ok(Self {
            bind_addr,
            database_path,
            ingest,
        })
    }
}

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The ingestion pipeline with its injected store.
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Create application state from configuration: opens the database,
    /// wires the store into the pipeline.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let db = Database::open(&config.database_path)?;
        let store = Arc::new(SqliteStore::new(db));
        let pipeline = Arc::new(Pipeline::new(Arc::new(config.ingest.clone()), store));

        Ok(Self { pipeline })
    }
}
