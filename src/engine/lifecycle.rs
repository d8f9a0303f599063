use rusqlite::Connection;
use std::collections::BTreeSet;
use crate::engine::{AuditTrail, EngineError, EngineResult, GroupAssignment};
use crate::models::{Actor, NewTicket, Ticket, TicketEdit, TrackedField};
use crate::repo::{BoardRepo, GroupRepo, StageRepo, TicketRepo, UserRepo};

/// Ticket lifecycle engine
///
/// Creates, edits, moves, completes and deletes tickets. Every change to a
/// tracked field is reported to the [`AuditTrail`]. Updates carry the
/// ticket's version; a ticket changed by someone else since it was read
/// fails with [`EngineError::Conflict`] instead of being overwritten.
///
/// # Example
///
/// ```no_run
/// use stageboard::db::DbConnection;
/// use stageboard::engine::TicketLifecycle;
/// use stageboard::models::{Actor, NewTicket, Role};
///
/// let conn = DbConnection::connect().unwrap();
/// let actor = Actor::new(1, "Ada Lovelace", Role::Admin);
/// let fields = NewTicket { title: "Fix login".to_string(), description: String::new() };
/// let ticket = TicketLifecycle::create_ticket(&conn, &fields, &actor, 1, Some(1), None).unwrap();
/// TicketLifecycle::move_ticket(&conn, ticket.id.unwrap(), 2, &actor).unwrap();
/// ```
pub struct TicketLifecycle;

fn raw_id(id: Option<i64>) -> Option<String> {
    id.map(|id| id.to_string())
}

impl TicketLifecycle {
    /// Create a ticket on a board, created by the actor.
    ///
    /// `stage_id`, when given, must be placed on the board; `assignee_id`,
    /// when given, must name an existing user.
    pub fn create_ticket(
        conn: &Connection,
        fields: &NewTicket,
        actor: &Actor,
        board_id: i64,
        stage_id: Option<i64>,
        assignee_id: Option<i64>,
    ) -> EngineResult<Ticket> {
        let title = fields.title.trim();
        if title.is_empty() {
            return Err(EngineError::validation("Ticket title cannot be empty"));
        }
        if BoardRepo::get_by_id(conn, board_id)?.is_none() {
            return Err(EngineError::not_found("Board", board_id));
        }
        if let Some(stage_id) = stage_id {
            Self::ensure_placed(conn, board_id, stage_id)?;
        }
        if let Some(assignee_id) = assignee_id {
            Self::ensure_user(conn, assignee_id)?;
        }

        let mut ticket = Ticket::new(board_id, title.to_string(), actor.user_id);
        ticket.description = fields.description.clone();
        ticket.stage_id = stage_id;
        ticket.assigned_to = assignee_id;

        let tx = conn.unchecked_transaction()?;
        let mut ticket = TicketRepo::insert(&tx, &ticket)?;
        AuditTrail::log_creation(&tx, &mut ticket, actor)?;
        tx.commit()?;

        log::info!("Created ticket {:?} '{}' on board {}", ticket.id, ticket.title, board_id);
        Ok(ticket)
    }

    /// Apply proposed values for the four tracked fields.
    ///
    /// `existing` is the ticket as the caller last read it; its `version` must
    /// still match storage. Only fields whose values differ are logged. The
    /// assignee is not re-checked against the stage's groups here.
    pub fn edit_ticket(
        conn: &Connection,
        existing: &Ticket,
        proposed: &TicketEdit,
        actor: &Actor,
    ) -> EngineResult<Ticket> {
        let ticket_id = existing.id.ok_or_else(|| EngineError::not_found("Ticket", 0))?;

        let tx = conn.unchecked_transaction()?;
        let stored = TicketRepo::get_with_history(&tx, ticket_id)?
            .ok_or_else(|| EngineError::not_found("Ticket", ticket_id))?;

        if stored.version != existing.version {
            return Err(EngineError::Conflict {
                ticket_id,
                expected: existing.version,
                actual: stored.version,
            });
        }

        let title = proposed.title.trim();
        if title.is_empty() {
            return Err(EngineError::validation("Ticket title cannot be empty"));
        }
        if proposed.stage_id != stored.stage_id {
            if let Some(stage_id) = proposed.stage_id {
                Self::ensure_placed(&tx, stored.board_id, stage_id)?;
            }
        }
        if proposed.assigned_to != stored.assigned_to {
            if let Some(user_id) = proposed.assigned_to {
                Self::ensure_user(&tx, user_id)?;
            }
        }

        let new_title = title.to_string();
        let new_description = proposed.description.clone();

        let mut updated = stored.clone();
        updated.title = new_title.clone();
        updated.description = new_description.clone();
        updated.assigned_to = proposed.assigned_to;
        updated.stage_id = proposed.stage_id;
        Self::persist(&tx, &mut updated)?;

        AuditTrail::log_field_change(
            &tx, TrackedField::Title, Some(&stored.title), Some(&new_title), &mut updated, actor,
        )?;
        AuditTrail::log_field_change(
            &tx, TrackedField::Description, Some(&stored.description), Some(&new_description), &mut updated, actor,
        )?;
        AuditTrail::log_field_change(
            &tx,
            TrackedField::AssignedTo,
            raw_id(stored.assigned_to).as_deref(),
            raw_id(updated.assigned_to).as_deref(),
            &mut updated,
            actor,
        )?;
        AuditTrail::log_field_change(
            &tx,
            TrackedField::Stage,
            raw_id(stored.stage_id).as_deref(),
            raw_id(updated.stage_id).as_deref(),
            &mut updated,
            actor,
        )?;
        tx.commit()?;

        log::info!("Edited ticket {}", ticket_id);
        Ok(updated)
    }

    /// Move a ticket to another stage of its board.
    ///
    /// If the current assignee belongs to none of the project's groups
    /// assigned to the destination stage, the assignee is cleared. Stages
    /// without assigned groups keep the assignee as is.
    pub fn move_ticket(
        conn: &Connection,
        ticket_id: i64,
        destination_stage_id: i64,
        actor: &Actor,
    ) -> EngineResult<Ticket> {
        let tx = conn.unchecked_transaction()?;
        let mut ticket = TicketRepo::get_with_history(&tx, ticket_id)?
            .ok_or_else(|| EngineError::not_found("Ticket", ticket_id))?;
        Self::ensure_placed(&tx, ticket.board_id, destination_stage_id)?;

        let old_stage = ticket.stage_id;
        let old_assignee = ticket.assigned_to;
        ticket.stage_id = Some(destination_stage_id);

        if let Some(assignee_id) = old_assignee {
            if !Self::assignee_allowed(&tx, ticket.board_id, destination_stage_id, assignee_id)? {
                log::info!(
                    "Ticket {}: assignee {} is not in any group of stage {}; unassigning",
                    ticket_id,
                    assignee_id,
                    destination_stage_id
                );
                ticket.assigned_to = None;
            }
        }

        Self::persist(&tx, &mut ticket)?;

        AuditTrail::log_field_change(
            &tx,
            TrackedField::Stage,
            raw_id(old_stage).as_deref(),
            raw_id(ticket.stage_id).as_deref(),
            &mut ticket,
            actor,
        )?;
        AuditTrail::log_field_change(
            &tx,
            TrackedField::AssignedTo,
            raw_id(old_assignee).as_deref(),
            raw_id(ticket.assigned_to).as_deref(),
            &mut ticket,
            actor,
        )?;
        tx.commit()?;

        log::info!("Moved ticket {} to stage {}", ticket_id, destination_stage_id);
        Ok(ticket)
    }

    /// Mark a ticket complete or open again
    pub fn set_complete(
        conn: &Connection,
        ticket_id: i64,
        complete: bool,
        actor: &Actor,
    ) -> EngineResult<Ticket> {
        let tx = conn.unchecked_transaction()?;
        let mut ticket = TicketRepo::get_with_history(&tx, ticket_id)?
            .ok_or_else(|| EngineError::not_found("Ticket", ticket_id))?;

        if ticket.is_complete == complete {
            return Ok(ticket);
        }

        let was = ticket.is_complete;
        ticket.is_complete = complete;
        Self::persist(&tx, &mut ticket)?;
        AuditTrail::log_field_change(
            &tx,
            TrackedField::IsComplete,
            Some(&was.to_string()),
            Some(&complete.to_string()),
            &mut ticket,
            actor,
        )?;
        tx.commit()?;

        log::info!("Ticket {} marked {}", ticket_id, if complete { "complete" } else { "open" });
        Ok(ticket)
    }

    /// Delete a ticket; its history goes with it
    pub fn delete_ticket(conn: &Connection, ticket_id: i64) -> EngineResult<()> {
        if !TicketRepo::delete(conn, ticket_id)? {
            return Err(EngineError::not_found("Ticket", ticket_id));
        }
        log::info!("Deleted ticket {}", ticket_id);
        Ok(())
    }

    /// Load a ticket with its history
    pub fn get_ticket(conn: &Connection, ticket_id: i64) -> EngineResult<Ticket> {
        TicketRepo::get_with_history(conn, ticket_id)?
            .ok_or_else(|| EngineError::not_found("Ticket", ticket_id))
    }

    /// Whether `assignee_id` may keep a ticket that arrives on `stage_id`
    fn assignee_allowed(
        conn: &Connection,
        board_id: i64,
        stage_id: i64,
        assignee_id: i64,
    ) -> EngineResult<bool> {
        let groups_by_stage = GroupAssignment::groups_for_all_stages(conn, board_id)?;
        let Some(mapped) = groups_by_stage.get(&stage_id) else {
            return Ok(true);
        };
        let mapped_ids: BTreeSet<i64> = mapped.iter().map(|g| g.id).collect();

        let board = BoardRepo::get_by_id(conn, board_id)?
            .ok_or_else(|| EngineError::not_found("Board", board_id))?;
        let relevant: Vec<_> = GroupRepo::list_by_project(conn, board.project_id)?
            .into_iter()
            .filter(|g| mapped_ids.contains(&g.id))
            .collect();
        if relevant.is_empty() {
            return Ok(true);
        }

        for group in &relevant {
            let is_member = match &group.members {
                Some(members) => members.iter().any(|u| u.id == assignee_id),
                None => UserRepo::list_by_group(conn, group.id)?
                    .iter()
                    .any(|u| u.id == assignee_id),
            };
            if is_member {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Write the ticket, bumping its version, or report who won the race
    fn persist(conn: &Connection, ticket: &mut Ticket) -> EngineResult<()> {
        let ticket_id = ticket.id.ok_or_else(|| EngineError::not_found("Ticket", 0))?;
        if TicketRepo::update(conn, ticket)? {
            ticket.version += 1;
            return Ok(());
        }
        match TicketRepo::get_by_id(conn, ticket_id)? {
            Some(current) => Err(EngineError::Conflict {
                ticket_id,
                expected: ticket.version,
                actual: current.version,
            }),
            None => Err(EngineError::not_found("Ticket", ticket_id)),
        }
    }

    fn ensure_placed(conn: &Connection, board_id: i64, stage_id: i64) -> EngineResult<()> {
        if StageRepo::get_placement(conn, board_id, stage_id)?.is_none() {
            return Err(EngineError::validation(format!(
                "Stage {} is not on board {}",
                stage_id, board_id
            )));
        }
        Ok(())
    }

    fn ensure_user(conn: &Connection, user_id: i64) -> EngineResult<()> {
        if UserRepo::get_by_id(conn, user_id)?.is_none() {
            return Err(EngineError::not_found("User", user_id));
        }
        Ok(())
    }
}
