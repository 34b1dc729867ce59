//! Daily newsletter quota: atomic check and counter increment.

use rusqlite::{params, Connection};

use super::user_repo;
use super::{Database, DatabaseError};

/// Result of the can-receive check.
#[derive(Debug, Clone)]
pub struct QuotaDecision {
    pub can_receive: bool,
    pub current_count: i64,
    pub max_allowed: i64,
    pub reason: Option<String>,
}

/// Checks whether a user may receive another newsletter today.
///
/// Runs as one locked section: ensures the `(user, day)` counter row exists
/// with a count of 0, reads the count, and compares it against the plan's
/// `max_newsletters_per_day` (never the source limit). The later increment
/// is a separate operation, so two concurrent deliveries can both pass this
/// check; the limit is a soft bound by design.
pub fn can_receive_newsletter(
    db: &Database,
    user_id: &str,
    utc_date: &str,
) -> Result<QuotaDecision, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO daily_counts (user_id, count_date, newsletter_count)
             VALUES (?1, ?2, 0)",
            params![user_id, utc_date],
        )?;

        let current_count: i64 = conn.query_row(
            "SELECT newsletter_count FROM daily_counts
             WHERE user_id = ?1 AND count_date = ?2",
            params![user_id, utc_date],
            |row| row.get(0),
        )?;

        let limits = user_repo::plan_limits_conn(conn, user_id)?;
        let can_receive = current_count < limits.max_newsletters_per_day;

        Ok(QuotaDecision {
            can_receive,
            current_count,
            max_allowed: limits.max_newsletters_per_day,
            reason: if can_receive {
                None
            } else {
                Some("daily_limit_exceeded".to_string())
            },
        })
    })
}

/// Increments the daily counter, creating the row when absent.
///
/// Connection-level so the persistence transaction can run it atomically
/// with the newsletter insert.
pub(crate) fn increment_count(
    conn: &Connection,
    user_id: &str,
    utc_date: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO daily_counts (user_id, count_date, newsletter_count)
         VALUES (?1, ?2, 1)
         ON CONFLICT(user_id, count_date) DO UPDATE SET
           newsletter_count = newsletter_count + 1",
        params![user_id, utc_date],
    )?;
    Ok(())
}
