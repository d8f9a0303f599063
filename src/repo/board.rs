use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::Board;
use anyhow::Result;

/// Board repository
pub struct BoardRepo;

fn row_to_board(row: &Row) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_ts: row.get(4)?,
    })
}

impl BoardRepo {
    /// Get the board owned by a project
    pub fn get_by_project(conn: &Connection, project_id: i64) -> Result<Option<Board>> {
        let mut stmt = conn.prepare(
            "SELECT id, project_id, name, description, created_ts FROM boards WHERE project_id = ?1"
        )?;
        let board = stmt.query_row([project_id], row_to_board).optional()?;
        Ok(board)
    }

    /// Get board by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Board>> {
        let mut stmt = conn.prepare(
            "SELECT id, project_id, name, description, created_ts FROM boards WHERE id = ?1"
        )?;
        let board = stmt.query_row([id], row_to_board).optional()?;
        Ok(board)
    }
}
