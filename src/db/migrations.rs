use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all pending migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version = Self::get_version(conn)?;

        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            log::debug!("Applied schema migration v{}", version);
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

type Migration = fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>;

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, Migration> {
    let mut migrations: HashMap<u32, Migration> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: Initial schema
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE TABLE projects (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;

    // One board per project
    tx.execute(
        "CREATE TABLE boards (
            id INTEGER PRIMARY KEY,
            project_id INTEGER NOT NULL UNIQUE REFERENCES projects(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NULL,
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE stages (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE board_stages (
            board_id INTEGER NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
            stage_id INTEGER NOT NULL REFERENCES stages(id),
            ordinal INTEGER NOT NULL,
            PRIMARY KEY(board_id, stage_id)
        )",
        [],
    )?;
    tx.execute(
        "CREATE UNIQUE INDEX idx_board_stages_ordinal ON board_stages(board_id, ordinal)",
        [],
    )?;

    tx.execute(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin','member')),
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE user_groups (
            id INTEGER PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NULL,
            manager_id INTEGER NOT NULL REFERENCES users(id),
            created_ts INTEGER NOT NULL,
            UNIQUE(project_id, name)
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE group_members (
            group_id INTEGER NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY(group_id, user_id)
        )",
        [],
    )?;

    // Groups authorized on a placement
    tx.execute(
        "CREATE TABLE board_stage_groups (
            board_id INTEGER NOT NULL,
            stage_id INTEGER NOT NULL,
            group_id INTEGER NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE,
            PRIMARY KEY(board_id, stage_id, group_id),
            FOREIGN KEY(board_id, stage_id) REFERENCES board_stages(board_id, stage_id) ON DELETE CASCADE
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE tickets (
            id INTEGER PRIMARY KEY,
            uuid TEXT NOT NULL UNIQUE,
            board_id INTEGER NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_by INTEGER NOT NULL REFERENCES users(id),
            created_ts INTEGER NOT NULL,
            assigned_to INTEGER NULL REFERENCES users(id),
            stage_id INTEGER NULL REFERENCES stages(id),
            is_complete INTEGER NOT NULL DEFAULT 0,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_tickets_board_stage ON tickets(board_id, stage_id)",
        [],
    )?;

    // Append-only audit trail
    tx.execute(
        "CREATE TABLE ticket_history (
            id INTEGER PRIMARY KEY,
            uuid TEXT NOT NULL UNIQUE,
            ticket_id INTEGER NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
            property_changed TEXT NOT NULL,
            old_value TEXT NOT NULL,
            new_value TEXT NOT NULL,
            changed_by INTEGER NOT NULL REFERENCES users(id),
            changed_ts INTEGER NOT NULL,
            description TEXT NOT NULL
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_ticket_history_ticket ON ticket_history(ticket_id, changed_ts)",
        [],
    )?;

    Ok(())
}

/// Migration v2: Optimistic version token on tickets
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "ALTER TABLE tickets ADD COLUMN version INTEGER NOT NULL DEFAULT 1",
        [],
    )?;
    Ok(())
}
