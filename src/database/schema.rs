/*!
 * Database schema definitions and migrations.
 *
 * This module contains the SQL schema for the province and city tables
 * and handles schema migrations for version upgrades.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
///
/// A fresh database gets every table. A database stamped with any version
/// other than the current one is rejected rather than opened.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    match get_schema_version(conn)? {
        0 => {
            info!("Initializing database schema v{}", SCHEMA_VERSION);
            create_all_tables(conn)?;
            set_schema_version(conn, SCHEMA_VERSION)?;
        }
        SCHEMA_VERSION => debug!("Database schema is up to date (v{})", SCHEMA_VERSION),
        other => {
            return Err(anyhow!(
                "Unsupported schema version: {} (this build uses v{})",
                other,
                SCHEMA_VERSION
            ));
        }
    }

    Ok(())
}

/// Per-connection settings. SQLite keeps `foreign_keys` per connection,
/// so every pooled connection has to run this, not just the first one.
pub fn configure_connection(conn: &Connection, busy_timeout_ms: u64) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .context("Failed to enable foreign keys")?;
    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))
        .context("Failed to set busy timeout")?;
    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL lets readers on other pooled connections proceed during a write
    // transaction. In-memory databases silently stay in "memory" mode.
    let _mode: String = conn.query_row("PRAGMA journal_mode=WAL;", [], |row| row.get(0))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS province (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );
        "#,
    )?;

    // No ON DELETE CASCADE: cities are removed explicitly before their
    // province, inside the same transaction.
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS city (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            province_id INTEGER NOT NULL REFERENCES province(id),
            created_at TEXT NOT NULL,
            UNIQUE(name, province_id)
        );

        CREATE INDEX IF NOT EXISTS idx_city_province ON city(province_id);
        "#,
    )?;

    info!("Database schema created successfully");
    Ok(())
}
