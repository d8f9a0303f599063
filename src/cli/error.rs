// Error handling utilities for consistent error messages and exit codes

use std::process;
use crate::engine::EngineError;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, stale edits, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Exit code for an error returned from a command handler.
/// Engine user errors exit 1; storage failures and anything else exit 2.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<EngineError>() {
        Some(engine_err) if !engine_err.is_user_error() => 2,
        Some(_) => 1,
        None => 2,
    }
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate a project or group name (alphanumeric, dots, underscores, hyphens)
pub fn validate_name(name: &str, kind: &str) -> Result<(), String> {
    validate_non_empty(name, kind)?;

    if name.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(format!(
            "Invalid {} name: '{}'. Names can only contain letters, numbers, dots, underscores, and hyphens.",
            kind.to_lowercase(),
            name
        ))
    }
}

/// Validate a username (lowercase letters, numbers, dots, underscores, hyphens)
pub fn validate_username(username: &str) -> Result<(), String> {
    validate_non_empty(username, "Username")?;

    if username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(format!(
            "Invalid username: '{}'. Usernames can only contain lowercase letters, numbers, dots, underscores, and hyphens.",
            username
        ))
    }
}

/// Validate that a ticket ID is valid (positive integer)
pub fn validate_ticket_id(id_str: &str) -> Result<i64, String> {
    id_str.parse::<i64>()
        .map_err(|_| format!("Invalid ticket ID: '{}'. Ticket ID must be a number.", id_str))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid ticket ID: {}. Ticket ID must be positive.", id))
            }
        })
}
