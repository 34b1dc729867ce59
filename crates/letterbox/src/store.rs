//! Durable-store abstraction consumed by the ingestion pipeline.
//!
//! The pipeline never talks to the database directly; it is handed a
//! `Store` at construction. Concurrency correctness lives entirely behind
//! this seam: uniqueness constraints detect duplicates, counter checks and
//! increments are single statements, and no in-memory locking exists beyond
//! the connection handle.

use thiserror::Error;

use crate::db::newsletter_repo::{self, InsertOutcome, NewsletterRow};
use crate::db::quota_repo::{self, QuotaDecision};
use crate::db::skip_repo::{self, SkippedRow};
use crate::db::source_repo::{self, SourceQuota, SourceRow};
use crate::db::user_repo::{self, PlanLimits, UserRow};
use crate::db::{Database, DatabaseError};

/// Errors surfaced by a store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Escape hatch for non-SQLite backends.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Capabilities the pipeline needs from durable storage.
pub trait Store: Send + Sync {
    /// Looks up a user by mailbox alias (case-insensitive).
    fn find_user_by_alias(&self, alias: &str) -> Result<Option<UserRow>, StoreError>;

    /// Resolves plan limits for a user, free-tier fallback included.
    fn plan_limits(&self, user_id: &str) -> Result<PlanLimits, StoreError>;

    /// All sources matching the case-insensitive identity pair, in a
    /// stable oldest-first order.
    fn find_sources_by_identity(
        &self,
        from_address: &str,
        display_name: &str,
    ) -> Result<Vec<SourceRow>, StoreError>;

    /// Atomic check of the user's source count against their plan.
    fn can_add_source(&self, user_id: &str) -> Result<SourceQuota, StoreError>;

    /// Creates a new source row.
    fn create_source(&self, source: &SourceRow) -> Result<(), StoreError>;

    /// Bumps the user's source counter. Callers treat a failure here as
    /// log-only; creation is not rolled back.
    fn increment_source_count(&self, user_id: &str) -> Result<(), StoreError>;

    /// Atomic daily-quota check; creates the day's counter row at 0 when
    /// absent so the count is never NULL.
    fn can_receive_newsletter(
        &self,
        user_id: &str,
        utc_date: &str,
    ) -> Result<QuotaDecision, StoreError>;

    /// Transactionally creates the newsletter and increments the daily
    /// counter; duplicates report as an outcome, not an error.
    fn persist_newsletter(
        &self,
        row: &NewsletterRow,
        utc_date: &str,
    ) -> Result<InsertOutcome, StoreError>;

    /// Appends a skip audit record.
    fn record_skip(&self, row: &SkippedRow) -> Result<(), StoreError>;
}

/// `Store` backed by the SQLite repositories.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying handle, for maintenance tooling and tests.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl Store for SqliteStore {
    fn find_user_by_alias(&self, alias: &str) -> Result<Option<UserRow>, StoreError> {
        Ok(user_repo::find_by_alias(&self.db, alias)?)
    }

    fn plan_limits(&self, user_id: &str) -> Result<PlanLimits, StoreError> {
        Ok(user_repo::plan_limits(&self.db, user_id)?)
    }

    fn find_sources_by_identity(
        &self,
        from_address: &str,
        display_name: &str,
    ) -> Result<Vec<SourceRow>, StoreError> {
        Ok(source_repo::find_by_identity(
            &self.db,
            from_address,
            display_name,
        )?)
    }

    fn can_add_source(&self, user_id: &str) -> Result<SourceQuota, StoreError> {
        let limits = user_repo::plan_limits(&self.db, user_id)?;
        Ok(source_repo::can_add_source(
            &self.db,
            user_id,
            limits.max_sources,
        )?)
    }

    fn create_source(&self, source: &SourceRow) -> Result<(), StoreError> {
        Ok(source_repo::insert(&self.db, source)?)
    }

    fn increment_source_count(&self, user_id: &str) -> Result<(), StoreError> {
        Ok(source_repo::increment_source_count(&self.db, user_id)?)
    }

    fn can_receive_newsletter(
        &self,
        user_id: &str,
        utc_date: &str,
    ) -> Result<QuotaDecision, StoreError> {
        Ok(quota_repo::can_receive_newsletter(
            &self.db, user_id, utc_date,
        )?)
    }

    fn persist_newsletter(
        &self,
        row: &NewsletterRow,
        utc_date: &str,
    ) -> Result<InsertOutcome, StoreError> {
        Ok(newsletter_repo::insert_with_count(&self.db, row, utc_date)?)
    }

    fn record_skip(&self, row: &SkippedRow) -> Result<(), StoreError> {
        Ok(skip_repo::insert(&self.db, row)?)
    }
}
