use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::Project;
use anyhow::{Context, Result};

/// Project repository for database operations
///
/// Creating a project also creates its board; the two are 1:1.
///
/// # Example
///
/// ```no_run
/// use stageboard::db::DbConnection;
/// use stageboard::repo::{BoardRepo, ProjectRepo};
///
/// let conn = DbConnection::connect().unwrap();
/// let project = ProjectRepo::create(&conn, "website", Some("Public site")).unwrap();
/// let board = BoardRepo::get_by_project(&conn, project.id).unwrap().unwrap();
/// ```
pub struct ProjectRepo;

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        created_ts: row.get(2)?,
        modified_ts: row.get(3)?,
    })
}

impl ProjectRepo {
    /// Create a new project together with its board
    pub fn create(conn: &Connection, name: &str, description: Option<&str>) -> Result<Project> {
        let now = chrono::Utc::now().timestamp();
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO projects (name, created_ts, modified_ts) VALUES (?1, ?2, ?3)",
            rusqlite::params![name, now, now],
        )
        .with_context(|| format!("Failed to create project: {}", name))?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO boards (project_id, name, description, created_ts) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, name, description, now],
        )
        .with_context(|| format!("Failed to create board for project: {}", name))?;

        tx.commit()?;

        Ok(Project {
            id,
            name: name.to_string(),
            created_ts: now,
            modified_ts: now,
        })
    }

    /// Get project by name
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Project>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, created_ts, modified_ts FROM projects WHERE name = ?1"
        )?;
        let project = stmt.query_row([name], row_to_project).optional()?;
        Ok(project)
    }

    /// List all projects ordered by name
    pub fn list(conn: &Connection) -> Result<Vec<Project>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, created_ts, modified_ts FROM projects ORDER BY name"
        )?;
        let rows = stmt.query_map([], row_to_project)?;

        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }
}
