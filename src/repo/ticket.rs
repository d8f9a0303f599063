use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::Ticket;
use crate::repo::HistoryRepo;
use anyhow::{Context, Result};

/// Ticket repository for database operations
pub struct TicketRepo;

const TICKET_COLUMNS: &str = "id, uuid, board_id, title, description, created_by, created_ts,
        assigned_to, stage_id, is_complete, version, modified_ts";

fn row_to_ticket(row: &Row) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: Some(row.get(0)?),
        uuid: row.get(1)?,
        board_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        created_by: row.get(5)?,
        created_ts: row.get(6)?,
        assigned_to: row.get(7)?,
        stage_id: row.get(8)?,
        is_complete: row.get::<_, i64>(9)? != 0,
        version: row.get(10)?,
        modified_ts: row.get(11)?,
        history: Vec::new(),
    })
}

impl TicketRepo {
    /// Insert a new ticket, returning it with its assigned id
    pub fn insert(conn: &Connection, ticket: &Ticket) -> Result<Ticket> {
        conn.execute(
            "INSERT INTO tickets (uuid, board_id, title, description, created_by, created_ts,
                    assigned_to, stage_id, is_complete, version, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                ticket.uuid,
                ticket.board_id,
                ticket.title,
                ticket.description,
                ticket.created_by,
                ticket.created_ts,
                ticket.assigned_to,
                ticket.stage_id,
                ticket.is_complete as i64,
                ticket.version,
                ticket.modified_ts,
            ],
        )
        .with_context(|| format!("Failed to create ticket: {}", ticket.title))?;

        Ok(Ticket {
            id: Some(conn.last_insert_rowid()),
            ..ticket.clone()
        })
    }

    /// Get ticket by ID (history not loaded)
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE id = ?1", TICKET_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let ticket = stmt.query_row([id], row_to_ticket).optional()?;
        Ok(ticket)
    }

    /// Get ticket by ID with its history loaded (most recent first)
    pub fn get_with_history(conn: &Connection, id: i64) -> Result<Option<Ticket>> {
        match Self::get_by_id(conn, id)? {
            Some(mut ticket) => {
                ticket.history = HistoryRepo::list_for_ticket(conn, id)?;
                Ok(Some(ticket))
            }
            None => Ok(None),
        }
    }

    /// Tickets of a board ordered by id
    pub fn list_for_board(conn: &Connection, board_id: i64) -> Result<Vec<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE board_id = ?1 ORDER BY id", TICKET_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([board_id], row_to_ticket)?;

        let mut tickets = Vec::new();
        for row in rows {
            tickets.push(row?);
        }
        Ok(tickets)
    }

    /// Number of tickets of a board sitting on a stage
    pub fn count_on_stage(conn: &Connection, board_id: i64, stage_id: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tickets WHERE board_id = ?1 AND stage_id = ?2",
            rusqlite::params![board_id, stage_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Persist the mutable fields of a ticket.
    ///
    /// The row is only written when its stored version still equals
    /// `ticket.version`; the stored version is then incremented. Returns
    /// false when no row matched (missing ticket or stale version).
    pub fn update(conn: &Connection, ticket: &Ticket) -> Result<bool> {
        let id = ticket.id.context("Cannot update a ticket without an id")?;
        let now = chrono::Utc::now().timestamp();
        let updated = conn
            .execute(
                "UPDATE tickets SET title = ?1, description = ?2, assigned_to = ?3, stage_id = ?4,
                        is_complete = ?5, modified_ts = ?6, version = version + 1
                 WHERE id = ?7 AND version = ?8",
                rusqlite::params![
                    ticket.title,
                    ticket.description,
                    ticket.assigned_to,
                    ticket.stage_id,
                    ticket.is_complete as i64,
                    now,
                    id,
                    ticket.version,
                ],
            )
            .with_context(|| format!("Failed to update ticket {}", id))?;
        Ok(updated > 0)
    }

    /// Delete a ticket (history rows cascade). Returns false if it did not exist.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn
            .execute("DELETE FROM tickets WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete ticket {}", id))?;
        Ok(deleted > 0)
    }
}
