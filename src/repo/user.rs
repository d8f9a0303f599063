use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::{Role, User};
use anyhow::{Context, Result};

/// User repository
pub struct UserRepo;

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        role: Role::from_str(&role).unwrap_or(Role::Member),
    })
}

impl UserRepo {
    /// Create a user
    pub fn create(conn: &Connection, username: &str, full_name: &str, role: Role) -> Result<User> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO users (username, full_name, role, created_ts) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![username, full_name, role.as_str(), now],
        )
        .with_context(|| format!("Failed to create user: {}", username))?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            role,
        })
    }

    /// Get user by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
        let mut stmt = conn.prepare(
            "SELECT id, username, full_name, role FROM users WHERE id = ?1"
        )?;
        let user = stmt.query_row([id], row_to_user).optional()?;
        Ok(user)
    }

    /// Get user by username
    pub fn get_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
        let mut stmt = conn.prepare(
            "SELECT id, username, full_name, role FROM users WHERE username = ?1"
        )?;
        let user = stmt.query_row([username], row_to_user).optional()?;
        Ok(user)
    }

    /// List all users ordered by username
    pub fn list(conn: &Connection) -> Result<Vec<User>> {
        let mut stmt = conn.prepare(
            "SELECT id, username, full_name, role FROM users ORDER BY username"
        )?;
        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Members of a group, ordered by user id
    pub fn list_by_group(conn: &Connection, group_id: i64) -> Result<Vec<User>> {
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.full_name, u.role
             FROM group_members gm JOIN users u ON u.id = gm.user_id
             WHERE gm.group_id = ?1
             ORDER BY u.id"
        )?;
        let rows = stmt.query_map([group_id], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
