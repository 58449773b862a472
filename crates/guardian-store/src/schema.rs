// crates/guardian-store/src/schema.rs
// ============================================================================
// Module: SQLite Schema
// Description: Connection setup, pragmas, and table creation for the
// guardian store.
// Purpose: Centralize the one-time database initialization shared by every
// `SqliteStore` constructor.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! Every entity table stores its row as a single canonical JSON blob
//! (`data_json`) alongside the narrow set of columns the `Datastore`
//! queries actually filter or sort on. This keeps row shape changes to a
//! single serde-derived struct instead of a matching column migration.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;

use crate::error::SqliteStoreError;

/// Current schema version. Bump and add a migration arm in
/// [`initialize_schema`] when the table layout changes.
const SCHEMA_VERSION: i64 = 1;

/// Default busy timeout applied to every connection.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Opens a `SQLite` connection at `path` with durability pragmas applied
/// and the schema initialized.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the file cannot be opened or the
/// schema cannot be created.
pub fn open_and_initialize(path: &Path) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let mut connection = Connection::open_with_flags(path, flags)?;
    apply_pragmas(&connection)?;
    initialize_schema(&mut connection)?;
    Ok(connection)
}

/// Applies durability pragmas to a freshly opened connection.
fn apply_pragmas(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL;")?;
    connection.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Creates the store's tables if they do not already exist.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> =
        tx.query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0)).ok();
    if version.is_none() {
        tx.execute("INSERT INTO store_meta (version) VALUES (?1)", [SCHEMA_VERSION])?;
    }
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS cameras (
            id TEXT PRIMARY KEY,
            data_json BLOB NOT NULL
        );
        CREATE TABLE IF NOT EXISTS incidents (
            id TEXT PRIMARY KEY,
            camera_id TEXT NOT NULL,
            status TEXT NOT NULL,
            data_json BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_incidents_camera_status
            ON incidents (camera_id, status);
        CREATE TABLE IF NOT EXISTS incident_plans (
            id TEXT PRIMARY KEY,
            incident_id TEXT NOT NULL,
            version INTEGER NOT NULL,
            data_json BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_plans_incident_version
            ON incident_plans (incident_id, version);
        CREATE TABLE IF NOT EXISTS action_logs (
            id TEXT PRIMARY KEY,
            incident_id TEXT NOT NULL,
            data_json BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_action_logs_incident
            ON action_logs (incident_id);
        CREATE TABLE IF NOT EXISTS timeline_events (
            id TEXT PRIMARY KEY,
            incident_id TEXT NOT NULL,
            data_json BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_timeline_events_incident
            ON timeline_events (incident_id);
        CREATE TABLE IF NOT EXISTS agent_notes (
            id TEXT PRIMARY KEY,
            camera_id TEXT,
            expires_at TEXT NOT NULL,
            data_json BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_agent_notes_camera
            ON agent_notes (camera_id);
        CREATE TABLE IF NOT EXISTS config_updates (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            camera_id TEXT NOT NULL,
            data_json BLOB NOT NULL
        );",
    )?;
    tx.commit()?;
    Ok(())
}
