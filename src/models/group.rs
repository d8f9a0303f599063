use serde::{Deserialize, Serialize};
use crate::models::User;

/// Permission group
///
/// `members` is `None` when the membership list was not loaded with the group;
/// callers that need it fall back to `UserRepo::list_by_group`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: i64,
    pub members: Option<Vec<User>>,
}

impl Group {
    pub fn is_managed_by(&self, user_id: i64) -> bool {
        self.manager_id == user_id
    }

    /// Loaded members, or an empty slice when membership was not loaded
    pub fn loaded_members(&self) -> &[User] {
        self.members.as_deref().unwrap_or(&[])
    }

    pub fn has_member(&self, user_id: i64) -> bool {
        self.loaded_members().iter().any(|u| u.id == user_id)
    }
}
