use serde::{Deserialize, Serialize};

/// Ticket property tracked by the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackedField {
    Title,
    Description,
    AssignedTo,
    Stage,
    IsComplete,
    /// Synthetic entry written once when a ticket is created
    Created,
}

impl TrackedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Title => "Title",
            TrackedField::Description => "Description",
            TrackedField::AssignedTo => "AssignedTo",
            TrackedField::Stage => "Stage",
            TrackedField::IsComplete => "IsComplete",
            TrackedField::Created => "Created",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Title" => Some(TrackedField::Title),
            "Description" => Some(TrackedField::Description),
            "AssignedTo" => Some(TrackedField::AssignedTo),
            "Stage" => Some(TrackedField::Stage),
            "IsComplete" => Some(TrackedField::IsComplete),
            "Created" => Some(TrackedField::Created),
            _ => None,
        }
    }
}

/// Ticket history entry (immutable audit record of one field change)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketHistory {
    pub id: Option<i64>,
    pub uuid: String,
    pub ticket_id: i64,
    pub property_changed: String,
    pub old_value: String,
    pub new_value: String,
    pub changed_by: i64,
    pub changed_ts: i64,
    pub description: String,
}

impl TicketHistory {
    /// The tracked field this entry records, if it names a known one
    pub fn field(&self) -> Option<TrackedField> {
        TrackedField::from_str(&self.property_changed)
    }
}
