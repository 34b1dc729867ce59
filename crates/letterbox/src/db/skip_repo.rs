//! Skipped-newsletter audit repository. Rows are append-only; nothing in
//! the ingestion path updates or deletes them.

use rusqlite::params;

use super::{Database, DatabaseError};

/// An audit record for a delivery that produced no newsletter.
#[derive(Debug, Clone)]
pub struct SkippedRow {
    pub id: String,
    pub user_id: String,
    pub source_id: Option<String>,
    pub title: String,
    pub content: String,
    pub skip_reason: String,
    /// JSON blob with reason-specific context.
    pub skip_details: String,
    pub received_at: String,
}

/// Appends an audit record.
pub fn insert(db: &Database, row: &SkippedRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO skipped_newsletters
             (id, user_id, source_id, title, content, skip_reason, skip_details, received_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.id,
                row.user_id,
                row.source_id,
                row.title,
                row.content,
                row.skip_reason,
                row.skip_details,
                row.received_at,
            ],
        )?;
        Ok(())
    })
}

/// Lists audit records for a user, newest first.
pub fn list_for_user(db: &Database, user_id: &str) -> Result<Vec<SkippedRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, source_id, title, content, skip_reason, skip_details, received_at
             FROM skipped_newsletters
             WHERE user_id = ?1
             ORDER BY received_at DESC, id DESC",
        )?;
        let rows: Vec<SkippedRow> = stmt
            .query_map(params![user_id], |row| {
                Ok(SkippedRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    source_id: row.get(2)?,
                    title: row.get(3)?,
                    content: row.get(4)?,
                    skip_reason: row.get(5)?,
                    skip_details: row.get(6)?,
                    received_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
