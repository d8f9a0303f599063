use serde::{Deserialize, Serialize};
use crate::models::TicketHistory;

/// Ticket model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Option<i64>,
    pub uuid: String,
    pub board_id: i64,
    pub title: String,
    pub description: String,
    pub created_by: i64,
    pub created_ts: i64,
    pub assigned_to: Option<i64>,
    pub stage_id: Option<i64>,
    pub is_complete: bool,
    /// Optimistic concurrency token, bumped by every persisted update
    pub version: i64,
    pub modified_ts: i64,
    /// Most recent first
    #[serde(default)]
    pub history: Vec<TicketHistory>,
}

impl Ticket {
    /// Create a new, not yet persisted ticket
    pub fn new(board_id: i64, title: String, created_by: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            uuid: uuid::Uuid::new_v4().to_string(),
            board_id,
            title,
            description: String::new(),
            created_by,
            created_ts: now,
            assigned_to: None,
            stage_id: None,
            is_complete: false,
            version: 1,
            modified_ts: now,
            history: Vec::new(),
        }
    }

    /// Proposed changes pre-filled with the current values
    pub fn to_edit(&self) -> TicketEdit {
        TicketEdit {
            title: self.title.clone(),
            description: self.description.clone(),
            assigned_to: self.assigned_to,
            stage_id: self.stage_id,
        }
    }
}

/// Fields supplied when creating a ticket
#[derive(Debug, Clone, Default)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
}

/// Proposed values for the four tracked, user-editable fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketEdit {
    pub title: String,
    pub description: String,
    pub assigned_to: Option<i64>,
    pub stage_id: Option<i64>,
}
