//! Newsletter persistence: transactional insert plus counter increment.

use rusqlite::params;

use super::quota_repo;
use super::{Database, DatabaseError};

/// A newsletter row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewsletterRow {
    pub id: String,
    pub user_id: String,
    pub source_id: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub dedup_key: String,
    pub received_at: String,
}

/// Outcome of the persistence transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    /// The `(user_id, dedup_key)` uniqueness constraint fired: this
    /// physical email was already stored.
    Duplicate,
}

/// Creates the newsletter and increments the daily counter in one
/// transaction. A duplicate delivery rolls back and reports `Duplicate`
/// instead of erroring; any other failure propagates.
pub fn insert_with_count(
    db: &Database,
    row: &NewsletterRow,
    utc_date: &str,
) -> Result<InsertOutcome, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        let inserted = tx.execute(
            "INSERT INTO newsletters
             (id, user_id, source_id, title, content, excerpt, dedup_key, received_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.id,
                row.user_id,
                row.source_id,
                row.title,
                row.content,
                row.excerpt,
                row.dedup_key,
                row.received_at,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                // Dropping the transaction rolls it back.
                return Ok(InsertOutcome::Duplicate);
            }
            Err(e) => return Err(e.into()),
        }

        quota_repo::increment_count(&tx, &row.user_id, utc_date)?;
        tx.commit()?;

        Ok(InsertOutcome::Created)
    })
}

/// Counts stored newsletters for a user.
pub fn count_for_user(db: &Database, user_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM newsletters WHERE user_id = ?1",
            params![user_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
