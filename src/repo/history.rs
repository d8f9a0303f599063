use rusqlite::Connection;
use crate::models::TicketHistory;
use anyhow::{Context, Result};

/// Ticket history repository (append-only)
pub struct HistoryRepo;

impl HistoryRepo {
    /// Append a history entry, returning it with its assigned id
    pub fn append(conn: &Connection, entry: &TicketHistory) -> Result<TicketHistory> {
        conn.execute(
            "INSERT INTO ticket_history (uuid, ticket_id, property_changed, old_value, new_value,
                    changed_by, changed_ts, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                entry.uuid,
                entry.ticket_id,
                entry.property_changed,
                entry.old_value,
                entry.new_value,
                entry.changed_by,
                entry.changed_ts,
                entry.description,
            ],
        )
        .with_context(|| format!("Failed to record history for ticket {}", entry.ticket_id))?;

        Ok(TicketHistory {
            id: Some(conn.last_insert_rowid()),
            ..entry.clone()
        })
    }

    /// History of a ticket, most recent first
    pub fn list_for_ticket(conn: &Connection, ticket_id: i64) -> Result<Vec<TicketHistory>> {
        let mut stmt = conn.prepare(
            "SELECT id, uuid, ticket_id, property_changed, old_value, new_value,
                    changed_by, changed_ts, description
             FROM ticket_history
             WHERE ticket_id = ?1
             ORDER BY changed_ts DESC, id DESC"
        )?;
        let rows = stmt.query_map([ticket_id], |row| {
            Ok(TicketHistory {
                id: Some(row.get(0)?),
                uuid: row.get(1)?,
                ticket_id: row.get(2)?,
                property_changed: row.get(3)?,
                old_value: row.get(4)?,
                new_value: row.get(5)?,
                changed_by: row.get(6)?,
                changed_ts: row.get(7)?,
                description: row.get(8)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
