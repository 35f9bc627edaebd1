//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies pending
//! ones in order.

use rusqlite::Connection;

use crate::error::Result;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_practitioners_table",
        sql: "CREATE TABLE practitioners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL DEFAULT '',
            api_key TEXT NOT NULL DEFAULT '',
            system_prompt TEXT NOT NULL DEFAULT '',
            model TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    },
    Migration {
        version: 2,
        description: "create_patients_table",
        sql: "CREATE TABLE patients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            practitioner_id INTEGER NOT NULL REFERENCES practitioners(id) ON DELETE CASCADE,
            first_name TEXT NOT NULL,
            second_name TEXT,
            full_name TEXT NOT NULL,
            birth_date TEXT NOT NULL,
            objectives TEXT NOT NULL DEFAULT '',
            clinical_demand TEXT NOT NULL DEFAULT '',
            clinical_procedures TEXT NOT NULL DEFAULT '',
            clinical_analysis TEXT NOT NULL DEFAULT '',
            clinical_conclusion TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    },
    Migration {
        version: 3,
        description: "create_session_records_table",
        sql: "CREATE TABLE session_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            record_number INTEGER NOT NULL,
            date TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(patient_id, record_number)
        )",
    },
];

/// Applies all pending migrations in version order.
pub fn run_all(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    for migration in MIGRATIONS {
        let applied: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = ?1)",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied {
            continue;
        }

        conn.execute_batch(migration.sql)?;
        conn.execute(
            "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;

        tracing::debug!("Applied migration {} ({})", migration.version, migration.description);
    }

    Ok(())
}
