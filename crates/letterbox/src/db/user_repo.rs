//! User and plan-limit lookups.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DatabaseError};

/// A user row. Users are resolved, never created, by the ingestion path;
/// `insert` exists for account provisioning and tests.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email_alias: String,
}

/// Per-plan resource ceilings.
///
/// `max_sources` bounds how many sending identities a user can follow;
/// `max_newsletters_per_day` bounds daily deliveries. They are independent
/// resources and must never stand in for each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_sources: i64,
    pub max_newsletters_per_day: i64,
}

/// Inserts a user row.
pub fn insert(db: &Database, row: &UserRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO users (id, email_alias, created_at) VALUES (?1, ?2, datetime('now'))",
            params![row.id, row.email_alias],
        )?;
        Ok(())
    })
}

/// Finds a user by mailbox alias (case-insensitive).
pub fn find_by_alias(db: &Database, alias: &str) -> Result<Option<UserRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT id, email_alias FROM users WHERE email_alias = ?1",
                params![alias],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email_alias: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    })
}

/// Records a subscription for a user.
pub fn add_subscription(
    db: &Database,
    user_id: &str,
    plan_id: &str,
    status: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO subscriptions (id, user_id, plan_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4, datetime('now'))",
            params![uuid::Uuid::new_v4().to_string(), user_id, plan_id, status],
        )?;
        Ok(())
    })
}

/// Resolves the plan limits for a user.
///
/// Uses the newest active subscription; users without one fall back to the
/// seeded `free` plan.
pub fn plan_limits(db: &Database, user_id: &str) -> Result<PlanLimits, DatabaseError> {
    db.with_conn(|conn| plan_limits_conn(conn, user_id))
}

/// Connection-level variant, usable inside a larger locked section.
pub(crate) fn plan_limits_conn(
    conn: &Connection,
    user_id: &str,
) -> Result<PlanLimits, DatabaseError> {
    let subscribed = conn
        .query_row(
            "SELECT p.max_sources, p.max_newsletters_per_day
             FROM subscriptions s
             JOIN plans p ON p.id = s.plan_id
             WHERE s.user_id = ?1 AND s.status = 'active'
             ORDER BY s.created_at DESC, s.id DESC
             LIMIT 1",
            params![user_id],
            |row| {
                Ok(PlanLimits {
                    max_sources: row.get(0)?,
                    max_newsletters_per_day: row.get(1)?,
                })
            },
        )
        .optional()?;

    if let Some(limits) = subscribed {
        return Ok(limits);
    }

    let free = conn.query_row(
        "SELECT max_sources, max_newsletters_per_day FROM plans WHERE id = 'free'",
        [],
        |row| {
            Ok(PlanLimits {
                max_sources: row.get(0)?,
                max_newsletters_per_day: row.get(1)?,
            })
        },
    )?;
    Ok(free)
}
