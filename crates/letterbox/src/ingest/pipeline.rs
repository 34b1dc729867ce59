//! Pipeline orchestrator.
//!
//! Sequences normalization, signature verification, recipient and source
//! resolution, quota enforcement and the persistence transaction under one
//! hard timeout. Any step can short-circuit to a terminal skip or error.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::db::newsletter_repo::{InsertOutcome, NewsletterRow};
use crate::db::skip_repo::SkippedRow;
use crate::db::source_repo::SourceRow;
use crate::email::message::EmailMessage;
use crate::email::normalizer::{self, InboundPayload};
use crate::email::signature::{self, SignatureError, SignatureParams};
use crate::store::Store;

use super::error::IngestError;
use super::outcome::{IngestResult, SkipReason, StoredNewsletter};

/// One buffered webhook delivery: the content type header and the body
/// bytes. The body is read once by the HTTP layer; every parser strategy
/// gets the same buffer.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Recipient resolution result.
enum Recipient {
    Resolved(String),
    Unknown,
}

pub struct Pipeline {
    config: Arc<IngestConfig>,
    store: Arc<dyn Store>,
}

impl Pipeline {
    /// All dependencies are injected; the pipeline holds no globals.
    pub fn new(config: Arc<IngestConfig>, store: Arc<dyn Store>) -> Self {
        Self { config, store }
    }

    /// Runs the full pipeline for one delivery, bounded by the configured
    /// timeout.
    pub async fn ingest(&self, request: RawRequest) -> Result<IngestResult, IngestError> {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.run(request)).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::Timeout(timeout)),
        }
    }

    #[tracing::instrument(name = "ingest", skip_all)]
    async fn run(&self, request: RawRequest) -> Result<IngestResult, IngestError> {
        // Step 1: normalize the wire encoding into one payload.
        let payload =
            normalizer::normalize(request.content_type.as_deref(), &request.body).await?;

        // Step 2: authenticate the delivery (production only).
        self.step_verify(&payload)?;

        let message = payload.into_message();

        // Step 3: map the mailbox to a user.
        let user_id = match self.step_resolve_recipient(&message)? {
            Recipient::Resolved(id) => id,
            Recipient::Unknown => {
                info!(
                    to = %message.first_recipient(),
                    "unknown recipient, acknowledging without storing"
                );
                return Ok(IngestResult::Skipped {
                    reason: SkipReason::UnknownRecipient,
                    message: Some("no mailbox matches this recipient".to_string()),
                });
            }
        };

        // Steps 4-6 run with a resolved user; failures past this point
        // leave a best-effort audit record.
        match self.run_for_user(&user_id, &message) {
            Ok(result) => Ok(result),
            Err(err) => {
                self.audit_failure(&user_id, &message, &err);
                Err(err)
            }
        }
    }

    fn run_for_user(
        &self,
        user_id: &str,
        message: &EmailMessage,
    ) -> Result<IngestResult, IngestError> {
        // Step 4: find or create the sending identity.
        let source = self.step_resolve_source(user_id, message)?;
        if source.is_archived {
            debug!(source_id = %source.id, "source is archived, skipping");
            self.record_skip(
                user_id,
                Some(&source.id),
                message,
                SkipReason::SourceArchived,
                serde_json::json!({ "sourceId": source.id }),
            );
            return Ok(IngestResult::Skipped {
                reason: SkipReason::SourceArchived,
                message: Some("this source is archived".to_string()),
            });
        }

        // Step 5: daily quota.
        let quota = self
            .store
            .can_receive_newsletter(user_id, &today_utc())?;
        if !quota.can_receive {
            info!(
                current = quota.current_count,
                max = quota.max_allowed,
                "daily newsletter limit reached"
            );
            self.record_skip(
                user_id,
                Some(&source.id),
                message,
                SkipReason::DailyLimitExceeded,
                serde_json::json!({
                    "currentCount": quota.current_count,
                    "maxAllowed": quota.max_allowed,
                }),
            );
            return Ok(IngestResult::Skipped {
                reason: SkipReason::DailyLimitExceeded,
                message: Some(format!(
                    "daily limit of {} newsletters reached",
                    quota.max_allowed
                )),
            });
        }

        // Step 6: transactional persistence.
        self.step_persist(user_id, &source, message)
    }

    fn step_verify(&self, payload: &InboundPayload) -> Result<(), IngestError> {
        if !self.config.environment.enforces_signatures() {
            return Ok(());
        }

        // validate() guarantees a key exists whenever enforcement is on.
        let Some(key) = self.config.signing_key.as_deref() else {
            return Err(IngestError::MissingSignature);
        };

        let params = SignatureParams {
            token: payload.token.as_deref(),
            timestamp: payload.timestamp.as_deref(),
            signature: payload.signature.as_deref(),
        };
        match signature::verify(params, key) {
            Ok(()) => Ok(()),
            Err(SignatureError::MissingParams) => Err(IngestError::MissingSignature),
            Err(SignatureError::Invalid) => Err(IngestError::InvalidSignature),
        }
    }

    fn step_resolve_recipient(&self, message: &EmailMessage) -> Result<Recipient, IngestError> {
        let first = message.first_recipient();
        let full = if first.contains('@') {
            first.to_string()
        } else {
            format!("{}@{}", first, self.config.ingest_domain)
        };

        // Pre-addressed aliases carry the user id as the local part; no
        // lookup needed.
        let local = full.split('@').next().unwrap_or("");
        if let Ok(id) = Uuid::parse_str(local) {
            if id.get_version_num() == 4 {
                debug!(user_id = %id, "recipient local part is a user id");
                return Ok(Recipient::Resolved(id.to_string()));
            }
        }

        if let Some(user) = self.store.find_user_by_alias(&full)? {
            return Ok(Recipient::Resolved(user.id));
        }

        match &self.config.default_recipient {
            Some(fallback) => {
                debug!(user_id = %fallback, alias = %full, "using default recipient");
                Ok(Recipient::Resolved(fallback.clone()))
            }
            None => Ok(Recipient::Unknown),
        }
    }

    fn step_resolve_source(
        &self,
        user_id: &str,
        message: &EmailMessage,
    ) -> Result<SourceRow, IngestError> {
        let from_address = message.sender_address();
        let display_name = message.sender_display_name();

        let mut matches = self
            .store
            .find_sources_by_identity(&from_address, &display_name)?;

        if matches.is_empty() {
            let quota = self.store.can_add_source(user_id)?;
            if !quota.allowed {
                return Err(IngestError::SourceLimit {
                    current: quota.current,
                    max: quota.max,
                });
            }

            let source = SourceRow {
                id: Uuid::new_v4().to_string(),
                owner_user_id: Some(user_id.to_string()),
                from_address,
                display_name,
                is_archived: false,
                created_at: Utc::now().to_rfc3339(),
            };
            self.store.create_source(&source)?;
            info!(source_id = %source.id, from = %source.from_address, "source created");

            // Counter bookkeeping is eventually accurate, not
            // transactional with the creation.
            if let Err(e) = self.store.increment_source_count(user_id) {
                warn!(error = %e, user_id = %user_id, "failed to increment source count");
            }

            return Ok(source);
        }

        if matches.len() > 1 {
            warn!(
                count = matches.len(),
                from = %from_address,
                resolved = %matches[0].id,
                "multiple sources share an identity, using the oldest"
            );
        }
        Ok(matches.remove(0))
    }

    fn step_persist(
        &self,
        user_id: &str,
        source: &SourceRow,
        message: &EmailMessage,
    ) -> Result<IngestResult, IngestError> {
        let row = NewsletterRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            source_id: source.id.clone(),
            title: message.subject.clone(),
            content: message.content().to_string(),
            excerpt: message.excerpt(),
            dedup_key: message.dedup_key(),
            received_at: Utc::now().to_rfc3339(),
        };

        match self.store.persist_newsletter(&row, &today_utc())? {
            InsertOutcome::Created => {
                info!(newsletter_id = %row.id, source_id = %row.source_id, "newsletter stored");
                Ok(IngestResult::Created(StoredNewsletter {
                    id: row.id,
                    user_id: row.user_id,
                    source_id: row.source_id,
                    title: row.title,
                    excerpt: row.excerpt,
                    received_at: row.received_at,
                }))
            }
            InsertOutcome::Duplicate => {
                debug!(dedup_key = %row.dedup_key, "duplicate delivery detected");
                self.record_skip(
                    user_id,
                    Some(&source.id),
                    message,
                    SkipReason::Duplicate,
                    serde_json::json!({ "dedupKey": row.dedup_key }),
                );
                Ok(IngestResult::Skipped {
                    reason: SkipReason::Duplicate,
                    message: Some("this email was already stored".to_string()),
                })
            }
        }
    }

    /// Appends a skip audit record. Failures are logged and swallowed so
    /// auditing never masks or changes the delivery outcome.
    fn record_skip(
        &self,
        user_id: &str,
        source_id: Option<&str>,
        message: &EmailMessage,
        reason: SkipReason,
        details: serde_json::Value,
    ) {
        let row = SkippedRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            source_id: source_id.map(String::from),
            title: message.subject.clone(),
            content: message.content().to_string(),
            skip_reason: reason.as_str().to_string(),
            skip_details: details.to_string(),
            received_at: Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.store.record_skip(&row) {
            warn!(error = %e, reason = %reason, "failed to write skip audit record");
        }
    }

    fn audit_failure(&self, user_id: &str, message: &EmailMessage, err: &IngestError) {
        let reason = match err {
            IngestError::SourceLimit { .. } => SkipReason::SourceLimitReached,
            _ => SkipReason::ProcessingError,
        };
        self.record_skip(
            user_id,
            None,
            message,
            reason,
            serde_json::json!({ "error": err.to_string() }),
        );
    }
}

fn today_utc() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}
