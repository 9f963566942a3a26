//! Database schema migrations for dancetimer.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: pricing rules, their tiers, and dance history.
///
/// History rows copy the rule name and id at stop time; they are not
/// foreign keys, so deleting a rule leaves past records untouched.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS pricing_rules (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            is_default  INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS price_tiers (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            rule_id          INTEGER NOT NULL REFERENCES pricing_rules(id) ON DELETE CASCADE,
            duration_minutes REAL NOT NULL,
            price            REAL NOT NULL,
            sort_order       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS dance_records (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            start_time        TEXT NOT NULL,
            end_time          TEXT NOT NULL,
            duration_seconds  INTEGER NOT NULL,
            cost              REAL NOT NULL,
            pricing_rule_name TEXT NOT NULL,
            pricing_rule_id   INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_price_tiers_rule_id ON price_tiers(rule_id);
        CREATE INDEX IF NOT EXISTS idx_dance_records_start_time ON dance_records(start_time);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: at most one default rule, enforced by the schema.
///
/// Any duplicate defaults left by older builds are collapsed onto the
/// oldest rule before the index is created.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "UPDATE pricing_rules SET is_default = 0
         WHERE is_default = 1
           AND id <> (SELECT MIN(id) FROM pricing_rules WHERE is_default = 1)",
        [],
    )?;
    tx.execute_batch(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_pricing_rules_single_default
            ON pricing_rules(is_default) WHERE is_default = 1;",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
