//! Newsletter source repository: find-or-create support for sending
//! identities and the per-user source counter.

use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

/// A sending identity. The identity key is the case-insensitive
/// `(from_address, display_name)` pair; `owner_user_id` is NULL for
/// system-seeded sources.
#[derive(Debug, Clone)]
pub struct SourceRow {
    pub id: String,
    pub owner_user_id: Option<String>,
    pub from_address: String,
    pub display_name: String,
    pub is_archived: bool,
    pub created_at: String,
}

/// Outcome of the atomic source-limit check.
#[derive(Debug, Clone, Copy)]
pub struct SourceQuota {
    pub allowed: bool,
    pub current: i64,
    pub max: i64,
}

/// Finds all sources matching the identity pair, oldest first.
///
/// The stable `created_at, id` order is what makes duplicate identities
/// (a data-quality anomaly) resolve deterministically across calls.
pub fn find_by_identity(
    db: &Database,
    from_address: &str,
    display_name: &str,
) -> Result<Vec<SourceRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, owner_user_id, from_address, display_name, is_archived, created_at
             FROM sources
             WHERE from_address = ?1 AND display_name = ?2
             ORDER BY created_at, id",
        )?;
        let rows: Vec<SourceRow> = stmt
            .query_map(params![from_address, display_name], |row| {
                Ok(SourceRow {
                    id: row.get(0)?,
                    owner_user_id: row.get(1)?,
                    from_address: row.get(2)?,
                    display_name: row.get(3)?,
                    is_archived: row.get::<_, i64>(4)? != 0,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Inserts a source row.
pub fn insert(db: &Database, row: &SourceRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO sources (id, owner_user_id, from_address, display_name, is_archived, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.owner_user_id,
                row.from_address,
                row.display_name,
                row.is_archived as i64,
                row.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Checks whether the user may follow another source.
///
/// Reads the denormalized `users.source_count`; a user row that does not
/// exist counts as zero so pre-addressed recipients are not rejected here.
pub fn can_add_source(
    db: &Database,
    user_id: &str,
    max_sources: i64,
) -> Result<SourceQuota, DatabaseError> {
    db.with_conn(|conn| {
        let current: i64 = conn
            .query_row(
                "SELECT source_count FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);

        Ok(SourceQuota {
            allowed: current < max_sources,
            current,
            max: max_sources,
        })
    })
}

/// Bumps the user's source counter after a successful creation.
pub fn increment_source_count(db: &Database, user_id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE users SET source_count = source_count + 1 WHERE id = ?1",
            params![user_id],
        )?;
        Ok(())
    })
}

/// Archives or un-archives a source. Archived sources suppress further
/// ingestion without deleting history.
pub fn set_archived(db: &Database, source_id: &str, archived: bool) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE sources SET is_archived = ?2 WHERE id = ?1",
            params![source_id, archived as i64],
        )?;
        Ok(())
    })
}
