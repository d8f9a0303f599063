use thiserror::Error;

/// Errors surfaced by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// A ticket, board, or other entity id did not resolve
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Input rejected before any mutation
    #[error("{0}")]
    Validation(String),

    /// The ticket changed since the caller read it
    #[error("Ticket {ticket_id} was modified by someone else (expected version {expected}, found {actual})")]
    Conflict {
        ticket_id: i64,
        expected: i64,
        actual: i64,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        EngineError::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    /// True for failures the caller can fix (bad input, stale data, missing ids)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            EngineError::NotFound { .. } | EngineError::Validation(_) | EngineError::Conflict { .. }
        )
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
