use rusqlite::Connection;
use serde::Serialize;
use crate::engine::{EngineError, EngineResult, GroupAssignment};
use crate::models::{Board, Group, PlacedStage, Ticket};
use crate::repo::{BoardRepo, StageRepo, TicketRepo};

/// One stage of a board with who may act on it and what sits on it
#[derive(Debug, Clone, Serialize)]
pub struct StageColumn {
    pub stage: PlacedStage,
    pub groups: Vec<Group>,
    pub tickets: Vec<Ticket>,
}

/// Snapshot of a project's board
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub board: Board,
    pub columns: Vec<StageColumn>,
    /// Tickets not placed on any stage
    pub unstaged: Vec<Ticket>,
}

impl BoardView {
    /// Load the board of a project. Fails with NotFound if the project has no board.
    pub fn load(conn: &Connection, project_id: i64) -> EngineResult<BoardView> {
        let board = BoardRepo::get_by_project(conn, project_id)?
            .ok_or_else(|| EngineError::not_found("Board for project", project_id))?;

        let mut groups_by_stage = GroupAssignment::groups_for_all_stages(conn, board.id)?;
        let mut tickets = TicketRepo::list_for_board(conn, board.id)?;

        let mut columns = Vec::new();
        for stage in StageRepo::list_for_board(conn, board.id)? {
            let (on_stage, rest): (Vec<Ticket>, Vec<Ticket>) = tickets
                .into_iter()
                .partition(|t| t.stage_id == Some(stage.stage_id));
            tickets = rest;
            columns.push(StageColumn {
                groups: groups_by_stage.remove(&stage.stage_id).unwrap_or_default(),
                stage,
                tickets: on_stage,
            });
        }

        Ok(BoardView {
            board,
            columns,
            unstaged: tickets,
        })
    }
}
