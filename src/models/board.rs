use serde::{Deserialize, Serialize};

/// Board model (the ticket pipeline of one project)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_ts: i64,
}
