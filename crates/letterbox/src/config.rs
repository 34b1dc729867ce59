//! Ingestion configuration loaded from environment variables.

use std::time::Duration;

use thiserror::Error;

/// Errors from configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown environment '{0}' (expected production, development or test)")]
    UnknownEnvironment(String),

    #[error("LETTERBOX_SIGNING_KEY is required when LETTERBOX_ENV=production")]
    MissingSigningKey,

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Runtime environment. Signature enforcement is only active in production
/// so that local delivery keeps working without a relay-provider key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
    Test,
}

impl Environment {
    pub fn enforces_signatures(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Settings consumed by the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Runtime environment; gates signature enforcement.
    pub environment: Environment,

    /// Shared secret for webhook HMAC verification.
    pub signing_key: Option<String>,

    /// Domain appended to bare local-parts in the recipient field.
    pub ingest_domain: String,

    /// User id that receives mail addressed to unmatched aliases, if set.
    pub default_recipient: Option<String>,

    /// Hard ceiling for one pipeline invocation.
    pub timeout: Duration,
}

impl IngestConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `LETTERBOX_ENV`: production | development | test (default: development)
    /// - `LETTERBOX_SIGNING_KEY`: webhook signing secret (required in production)
    /// - `LETTERBOX_INGEST_DOMAIN`: ingestion mailbox domain (default: "in.letterbox.email")
    /// - `LETTERBOX_DEFAULT_RECIPIENT`: fallback user id for unmatched aliases
    /// - `LETTERBOX_INGEST_TIMEOUT_SECS`: pipeline timeout in seconds (default: 25)
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match std::env::var("LETTERBOX_ENV") {
            Ok(v) => v.parse()?,
            Err(_) => Environment::Development,
        };

        let signing_key = std::env::var("LETTERBOX_SIGNING_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        let ingest_domain = std::env::var("LETTERBOX_INGEST_DOMAIN")
            .ok()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "in.letterbox.email".to_string());

        let default_recipient = std::env::var("LETTERBOX_DEFAULT_RECIPIENT")
            .ok()
            .filter(|r| !r.is_empty());

        let timeout_secs = match std::env::var("LETTERBOX_INGEST_TIMEOUT_SECS") {
            Ok(v) => v.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "LETTERBOX_INGEST_TIMEOUT_SECS".to_string(),
                reason: e.to_string(),
            })?,
            Err(_) => 25,
        };

        let config = Self {
            environment,
            signing_key,
            ingest_domain,
            default_recipient,
            timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;

        tracing::info!(
            environment = ?config.environment,
            ingest_domain = %config.ingest_domain,
            has_signing_key = config.signing_key.is_some(),
            has_default_recipient = config.default_recipient.is_some(),
            timeout_secs = config.timeout.as_secs(),
            "ingest configuration loaded"
        );

        Ok(config)
    }

    /// Invariant: production deployments must be able to verify signatures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.enforces_signatures() && self.signing_key.is_none() {
            return Err(ConfigError::MissingSigningKey);
        }
        Ok(())
    }

    /// Configuration suitable for tests: no enforcement, short timeout.
    pub fn for_tests() -> Self {
        Self {
            environment: Environment::Test,
            signing_key: None,
            ingest_domain: "in.letterbox.email".to_string(),
            default_recipient: None,
            timeout: Duration::from_secs(5),
        }
    }
}
