use rusqlite::{Connection, OptionalExtension};
use crate::models::{BoardStage, PlacedStage, Stage};
use anyhow::{Context, Result};

/// Stage catalog and placement repository
///
/// Stages are catalog rows in `stages`; their positioned appearance on a board
/// lives in `board_stages` with an `ordinal` that is unique per board
/// (enforced by a unique index).
pub struct StageRepo;

impl StageRepo {
    /// Create a catalog stage
    pub fn create(conn: &Connection, name: &str) -> Result<Stage> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO stages (name, created_ts) VALUES (?1, ?2)",
            rusqlite::params![name, now],
        )
        .with_context(|| format!("Failed to create stage: {}", name))?;

        Ok(Stage {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    /// Get catalog stage by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Stage>> {
        let stage = conn
            .query_row(
                "SELECT id, name FROM stages WHERE id = ?1",
                [id],
                |row| Ok(Stage { id: row.get(0)?, name: row.get(1)? }),
            )
            .optional()?;
        Ok(stage)
    }

    /// Rename a catalog stage. Returns false if the stage does not exist.
    pub fn rename(conn: &Connection, id: i64, name: &str) -> Result<bool> {
        let updated = conn
            .execute(
                "UPDATE stages SET name = ?1 WHERE id = ?2",
                rusqlite::params![name, id],
            )
            .with_context(|| format!("Failed to rename stage id={}", id))?;
        Ok(updated > 0)
    }

    /// Delete a catalog stage. Returns false if the stage does not exist.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn
            .execute("DELETE FROM stages WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete stage id={}", id))?;
        Ok(deleted > 0)
    }

    /// Stages placed on a board, in board order
    pub fn list_for_board(conn: &Connection, board_id: i64) -> Result<Vec<PlacedStage>> {
        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, bs.ordinal
             FROM board_stages bs JOIN stages s ON s.id = bs.stage_id
             WHERE bs.board_id = ?1
             ORDER BY bs.ordinal"
        )?;
        let rows = stmt.query_map([board_id], |row| {
            Ok(PlacedStage {
                stage_id: row.get(0)?,
                name: row.get(1)?,
                ordinal: row.get(2)?,
            })
        })?;

        let mut stages = Vec::new();
        for row in rows {
            stages.push(row?);
        }
        Ok(stages)
    }

    /// Placements of a board ordered by ordinal
    pub fn get_placements(conn: &Connection, board_id: i64) -> Result<Vec<BoardStage>> {
        let mut stmt = conn.prepare(
            "SELECT board_id, stage_id, ordinal FROM board_stages
             WHERE board_id = ?1 ORDER BY ordinal"
        )?;
        let rows = stmt.query_map([board_id], |row| {
            Ok(BoardStage {
                board_id: row.get(0)?,
                stage_id: row.get(1)?,
                ordinal: row.get(2)?,
            })
        })?;

        let mut placements = Vec::new();
        for row in rows {
            placements.push(row?);
        }
        Ok(placements)
    }

    /// Get a single placement
    pub fn get_placement(conn: &Connection, board_id: i64, stage_id: i64) -> Result<Option<BoardStage>> {
        let placement = conn
            .query_row(
                "SELECT board_id, stage_id, ordinal FROM board_stages
                 WHERE board_id = ?1 AND stage_id = ?2",
                rusqlite::params![board_id, stage_id],
                |row| {
                    Ok(BoardStage {
                        board_id: row.get(0)?,
                        stage_id: row.get(1)?,
                        ordinal: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(placement)
    }

    /// Ordinal for a stage appended to the end of the board
    pub fn next_ordinal(conn: &Connection, board_id: i64) -> Result<i64> {
        let max_ordinal: i64 = conn.query_row(
            "SELECT COALESCE(MAX(ordinal), -1) FROM board_stages WHERE board_id = ?1",
            [board_id],
            |row| row.get(0),
        )?;
        Ok(max_ordinal + 1)
    }

    /// Place a stage on a board at the given ordinal
    pub fn add_placement(conn: &Connection, board_id: i64, stage_id: i64, ordinal: i64) -> Result<BoardStage> {
        conn.execute(
            "INSERT INTO board_stages (board_id, stage_id, ordinal) VALUES (?1, ?2, ?3)",
            rusqlite::params![board_id, stage_id, ordinal],
        )
        .with_context(|| format!("Failed to place stage {} on board {}", stage_id, board_id))?;

        Ok(BoardStage { board_id, stage_id, ordinal })
    }

    /// Remove a placement (and, by cascade, its group assignments).
    /// Returns false if the placement does not exist.
    pub fn delete_placement(conn: &Connection, board_id: i64, stage_id: i64) -> Result<bool> {
        let deleted = conn.execute(
            "DELETE FROM board_stages WHERE board_id = ?1 AND stage_id = ?2",
            rusqlite::params![board_id, stage_id],
        )?;
        Ok(deleted > 0)
    }

    /// Number of boards a stage is placed on
    pub fn placement_count(conn: &Connection, stage_id: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM board_stages WHERE stage_id = ?1",
            [stage_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Exchange the ordinals of two placements on the same board.
    /// Parks the first one on a negative ordinal so the unique index never sees a duplicate.
    pub fn swap_ordinals(conn: &Connection, a: &BoardStage, b: &BoardStage) -> Result<()> {
        let set = "UPDATE board_stages SET ordinal = ?1 WHERE board_id = ?2 AND stage_id = ?3";
        let steps = [
            (-1 - a.ordinal, a.stage_id),
            (a.ordinal, b.stage_id),
            (b.ordinal, a.stage_id),
        ];
        for (ordinal, stage_id) in steps {
            conn.execute(set, rusqlite::params![ordinal, a.board_id, stage_id])
                .with_context(|| format!("Failed to swap stages {} and {}", a.stage_id, b.stage_id))?;
        }
        Ok(())
    }

    /// Persist the ordinals of the given placements
    pub fn save_placements(conn: &Connection, placements: &[BoardStage]) -> Result<()> {
        let set = "UPDATE board_stages SET ordinal = ?1 WHERE board_id = ?2 AND stage_id = ?3";
        // Two passes: move everything out of the way, then write final values
        for (i, p) in placements.iter().enumerate() {
            conn.execute(set, rusqlite::params![-1 - i as i64, p.board_id, p.stage_id])?;
        }
        for p in placements {
            conn.execute(set, rusqlite::params![p.ordinal, p.board_id, p.stage_id])
                .with_context(|| format!("Failed to save ordinal for stage {}", p.stage_id))?;
        }
        Ok(())
    }
}
