use rusqlite::Connection;
use crate::engine::EngineResult;
use crate::models::{Actor, Ticket, TicketHistory, TrackedField};
use crate::repo::{HistoryRepo, StageRepo, UserRepo};

/// Audit trail recorder
///
/// Turns a field change on a ticket into a human-readable history entry.
/// Values are rendered for display before they are compared, so an id and
/// the name it resolves to never produce a spurious entry.
///
/// Entries are appended to storage and prepended to `Ticket::history`, which
/// is kept most-recent-first.
pub struct AuditTrail;

impl AuditTrail {
    /// Record a change of `field` from `old` to `new` on `ticket`.
    ///
    /// Returns `None` (and writes nothing) when the rendered values match
    /// after trimming.
    pub fn log_field_change(
        conn: &Connection,
        field: TrackedField,
        old: Option<&str>,
        new: Option<&str>,
        ticket: &mut Ticket,
        actor: &Actor,
    ) -> EngineResult<Option<TicketHistory>> {
        let old_rendered = Self::render_value(conn, field, ticket.board_id, old)?;
        let new_rendered = Self::render_value(conn, field, ticket.board_id, new)?;

        if old_rendered.trim() == new_rendered.trim() {
            return Ok(None);
        }

        let description = Self::describe(field, &actor.display_name, &old_rendered, &new_rendered);
        let entry = Self::append(conn, ticket, field, old_rendered, new_rendered, description, actor)?;
        Ok(Some(entry))
    }

    /// Record the synthetic entry written when a ticket is created
    pub fn log_creation(conn: &Connection, ticket: &mut Ticket, actor: &Actor) -> EngineResult<TicketHistory> {
        let creator = UserRepo::get_by_id(conn, ticket.created_by)?
            .map(|u| u.full_name)
            .unwrap_or_else(|| ticket.created_by.to_string());
        let assignee = Self::render_value(
            conn,
            TrackedField::AssignedTo,
            ticket.board_id,
            ticket.assigned_to.map(|id| id.to_string()).as_deref(),
        )?;
        let stage = match ticket.stage_id {
            Some(stage_id) => Self::render_value(
                conn,
                TrackedField::Stage,
                ticket.board_id,
                Some(&stage_id.to_string()),
            )?,
            None => "Unspecified".to_string(),
        };

        let summary = format!("creator: {}, assignee: {}, stage: {}", creator, assignee, stage);
        let description = format!("{} created ticket ({})", actor.display_name, summary);
        Self::append(conn, ticket, TrackedField::Created, String::new(), summary, description, actor)
    }

    /// Display form of a raw field value
    pub fn render_value(
        conn: &Connection,
        field: TrackedField,
        board_id: i64,
        raw: Option<&str>,
    ) -> EngineResult<String> {
        let raw = raw.map(str::trim).unwrap_or("");
        match field {
            TrackedField::Stage => {
                if raw.is_empty() {
                    return Ok("Unknown".to_string());
                }
                let name = match raw.parse::<i64>() {
                    Ok(stage_id) => StageRepo::list_for_board(conn, board_id)?
                        .into_iter()
                        .find(|s| s.stage_id == stage_id)
                        .map(|s| s.name),
                    Err(_) => None,
                };
                Ok(name.unwrap_or_else(|| raw.to_string()))
            }
            TrackedField::AssignedTo => {
                if raw.is_empty() {
                    return Ok("Unassigned".to_string());
                }
                let name = match raw.parse::<i64>() {
                    Ok(user_id) => UserRepo::get_by_id(conn, user_id)?.map(|u| u.full_name),
                    Err(_) => None,
                };
                Ok(name.unwrap_or_else(|| raw.to_string()))
            }
            _ => Ok(raw.to_string()),
        }
    }

    /// Human-readable description of a change
    pub fn describe(field: TrackedField, actor: &str, old: &str, new: &str) -> String {
        match field {
            TrackedField::Stage => format!("{} moved stage from {} to {}", actor, old, new),
            TrackedField::AssignedTo => {
                format!("{} changed assignee from \"{}\" to \"{}\"", actor, old, new)
            }
            _ => format!("{} updated {} from \"{}\" to \"{}\"", actor, field.as_str(), old, new),
        }
    }

    fn append(
        conn: &Connection,
        ticket: &mut Ticket,
        field: TrackedField,
        old_value: String,
        new_value: String,
        description: String,
        actor: &Actor,
    ) -> EngineResult<TicketHistory> {
        let ticket_id = ticket
            .id
            .ok_or_else(|| anyhow::anyhow!("Cannot record history for an unsaved ticket"))?;

        let entry = TicketHistory {
            id: None,
            uuid: uuid::Uuid::new_v4().to_string(),
            ticket_id,
            property_changed: field.as_str().to_string(),
            old_value,
            new_value,
            changed_by: actor.user_id,
            changed_ts: chrono::Utc::now().timestamp(),
            description,
        };
        let saved = HistoryRepo::append(conn, &entry)?;
        log::debug!("ticket {}: {}", ticket_id, saved.description);
        ticket.history.insert(0, saved.clone());
        Ok(saved)
    }
}
