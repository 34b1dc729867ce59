//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order.

use rusqlite::Connection;

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_users_table",
        sql: include_str!("sql/001_create_users.sql"),
    },
    Migration {
        version: 2,
        description: "create_plans_table",
        sql: include_str!("sql/002_create_plans.sql"),
    },
    Migration {
        version: 3,
        description: "create_subscriptions_table",
        sql: include_str!("sql/003_create_subscriptions.sql"),
    },
    Migration {
        version: 4,
        description: "create_sources_table",
        sql: include_str!("sql/004_create_sources.sql"),
    },
    Migration {
        version: 5,
        description: "create_newsletters_table",
        sql: include_str!("sql/005_create_newsletters.sql"),
    },
    Migration {
        version: 6,
        description: "create_daily_counts_table",
        sql: include_str!("sql/006_create_daily_counts.sql"),
    },
    Migration {
        version: 7,
        description: "create_skipped_newsletters_table",
        sql: include_str!("sql/007_create_skipped_newsletters.sql"),
    },
];

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    // Create the migrations tracking table.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        conn.execute_batch(migration.sql)
            .map_err(|e| DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
    }

    Ok(())
}
