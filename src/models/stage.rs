use serde::{Deserialize, Serialize};

/// Stage catalog entry
/// A stage can be placed on more than one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: i64,
    pub name: String,
}

/// Placement of a stage on a board
/// Represents a row in the board_stages table. `ordinal` is unique per board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStage {
    pub board_id: i64,
    pub stage_id: i64,
    pub ordinal: i64,
}

/// A placed stage joined with its catalog name, in board order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedStage {
    pub stage_id: i64,
    pub name: String,
    pub ordinal: i64,
}

/// Reorder direction for a placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Parse a direction; anything other than "left"/"right" is unrecognized
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Ordinal offset of the neighbour this direction swaps with
    pub fn offset(&self) -> i64 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}
