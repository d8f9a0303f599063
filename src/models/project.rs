use serde::{Deserialize, Serialize};

/// Project model
/// Every project owns exactly one board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub created_ts: i64,
    pub modified_ts: i64,
}
