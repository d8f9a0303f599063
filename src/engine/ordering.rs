use rusqlite::Connection;
use crate::engine::{EngineError, EngineResult, GroupAssignment};
use crate::models::{BoardStage, Direction, PlacedStage};
use crate::repo::{BoardRepo, StageRepo, TicketRepo};

/// Result of a reorder request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// The stage exchanged ordinals with its neighbour
    Swapped { with_stage_id: i64 },
    /// Unknown direction, unknown stage, or no neighbour in that direction
    Unchanged,
}

/// Stage ordering engine
///
/// Maintains the ordered pipeline of stages on a board. Ordinals stay unique
/// per board: stages are appended after the current maximum and reordering
/// swaps exactly two placements.
///
/// # Example
///
/// ```no_run
/// use stageboard::db::DbConnection;
/// use stageboard::engine::StageOrdering;
///
/// let conn = DbConnection::connect().unwrap();
/// let board_id = 1;
/// let todo = StageOrdering::add_stage(&conn, board_id, "Todo", &[]).unwrap();
/// StageOrdering::add_stage(&conn, board_id, "Doing", &[]).unwrap();
/// StageOrdering::reorder(&conn, board_id, todo.stage_id, "right").unwrap();
/// ```
pub struct StageOrdering;

impl StageOrdering {
    /// Create a stage, append it to the board, and assign `group_ids` to it
    pub fn add_stage(
        conn: &Connection,
        board_id: i64,
        stage_name: &str,
        group_ids: &[i64],
    ) -> EngineResult<BoardStage> {
        let name = stage_name.trim();
        if name.is_empty() {
            return Err(EngineError::validation("Stage name cannot be empty"));
        }
        if BoardRepo::get_by_id(conn, board_id)?.is_none() {
            return Err(EngineError::not_found("Board", board_id));
        }

        let tx = conn.unchecked_transaction()?;
        let stage = StageRepo::create(&tx, name)?;
        let ordinal = StageRepo::next_ordinal(&tx, board_id)?;
        let placement = StageRepo::add_placement(&tx, board_id, stage.id, ordinal)?;
        GroupAssignment::reconcile(&tx, board_id, stage.id, group_ids)?;
        tx.commit()?;

        log::info!("Added stage '{}' ({}) to board {} at position {}", name, stage.id, board_id, ordinal);
        Ok(placement)
    }

    /// Remove a stage from a board.
    ///
    /// The catalog row goes too unless another board still places the stage.
    /// Returns false when the placement does not exist. Refuses while tickets
    /// of the board sit on the stage. Remaining ordinals are not renumbered.
    pub fn delete_stage(conn: &Connection, board_id: i64, stage_id: i64) -> EngineResult<bool> {
        let tx = conn.unchecked_transaction()?;

        if StageRepo::get_placement(&tx, board_id, stage_id)?.is_none() {
            log::debug!("Stage {} is not placed on board {}; nothing to delete", stage_id, board_id);
            return Ok(false);
        }

        let tickets = TicketRepo::count_on_stage(&tx, board_id, stage_id)?;
        if tickets > 0 {
            return Err(EngineError::validation(format!(
                "Cannot delete stage {}: {} ticket(s) are still on it",
                stage_id, tickets
            )));
        }

        StageRepo::delete_placement(&tx, board_id, stage_id)?;
        if StageRepo::placement_count(&tx, stage_id)? == 0 {
            StageRepo::delete(&tx, stage_id)?;
        }
        tx.commit()?;

        log::info!("Deleted stage {} from board {}", stage_id, board_id);
        Ok(true)
    }

    /// Rename a catalog stage. Returns false when the stage does not exist.
    pub fn rename_stage(conn: &Connection, stage_id: i64, new_name: &str) -> EngineResult<bool> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(EngineError::validation("Stage name cannot be empty"));
        }
        let renamed = StageRepo::rename(conn, stage_id, name)?;
        if renamed {
            log::info!("Renamed stage {} to '{}'", stage_id, name);
        } else {
            log::debug!("Stage {} not found; nothing to rename", stage_id);
        }
        Ok(renamed)
    }

    /// Swap a stage with its left or right neighbour.
    ///
    /// Directions other than "left"/"right", unknown stages, and stages with
    /// no neighbour exactly one position away leave the board unchanged and
    /// still return Ok.
    pub fn reorder(
        conn: &Connection,
        board_id: i64,
        stage_id: i64,
        direction: &str,
    ) -> EngineResult<ReorderOutcome> {
        let Some(direction) = Direction::from_str(direction) else {
            log::warn!("Ignoring reorder of stage {} with unknown direction '{}'", stage_id, direction);
            return Ok(ReorderOutcome::Unchanged);
        };

        let tx = conn.unchecked_transaction()?;
        let placements = StageRepo::get_placements(&tx, board_id)?;

        let Some(current) = placements.iter().find(|p| p.stage_id == stage_id) else {
            log::warn!("Ignoring reorder of stage {}: not placed on board {}", stage_id, board_id);
            return Ok(ReorderOutcome::Unchanged);
        };

        let target = current.ordinal + direction.offset();
        let Some(neighbour) = placements.iter().find(|p| p.ordinal == target) else {
            log::debug!(
                "Stage {} has no neighbour to the {}; order unchanged",
                stage_id,
                direction.as_str()
            );
            return Ok(ReorderOutcome::Unchanged);
        };

        StageRepo::swap_ordinals(&tx, current, neighbour)?;
        tx.commit()?;

        log::info!(
            "Moved stage {} {} on board {} (swapped with {})",
            stage_id,
            direction.as_str(),
            board_id,
            neighbour.stage_id
        );
        Ok(ReorderOutcome::Swapped { with_stage_id: neighbour.stage_id })
    }

    /// Renumber a board's placements to 0..n, keeping their relative order
    pub fn compact(conn: &Connection, board_id: i64) -> EngineResult<Vec<BoardStage>> {
        let tx = conn.unchecked_transaction()?;
        let mut placements = StageRepo::get_placements(&tx, board_id)?;

        let changed = placements
            .iter()
            .enumerate()
            .any(|(i, p)| p.ordinal != i as i64);
        if !changed {
            return Ok(placements);
        }

        for (i, placement) in placements.iter_mut().enumerate() {
            placement.ordinal = i as i64;
        }
        StageRepo::save_placements(&tx, &placements)?;
        tx.commit()?;

        log::info!("Compacted {} stage position(s) on board {}", placements.len(), board_id);
        Ok(placements)
    }

    /// Stages of a board in pipeline order
    pub fn list_stages(conn: &Connection, board_id: i64) -> EngineResult<Vec<PlacedStage>> {
        if BoardRepo::get_by_id(conn, board_id)?.is_none() {
            return Err(EngineError::not_found("Board", board_id));
        }
        Ok(StageRepo::list_for_board(conn, board_id)?)
    }
}
