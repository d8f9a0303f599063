// Output formatting utilities

use crate::engine::BoardView;
use crate::models::{Group, PlacedStage, Ticket, User};
use chrono::Local;
use std::collections::HashMap;
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_RESET: &str = "\x1b[0m";

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate, with fallback to the COLUMNS environment
/// variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

fn dim_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_DIM, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Shorten text to `width` characters, marking the cut with "..."
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 3 {
        return text.chars().take(width).collect();
    }
    let mut cut: String = text.chars().take(width - 3).collect();
    cut.push_str("...");
    cut
}

/// Format timestamp for display
pub fn format_timestamp(ts: i64) -> String {
    use chrono::TimeZone;
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

fn user_label(users: &HashMap<i64, User>, id: Option<i64>) -> String {
    match id {
        Some(id) => users
            .get(&id)
            .map(|u| u.full_name.clone())
            .unwrap_or_else(|| format!("user {}", id)),
        None => "Unassigned".to_string(),
    }
}

fn format_ticket_line(ticket: &Ticket, users: &HashMap<i64, User>, width: usize) -> String {
    let marker = if ticket.is_complete { "[x]" } else { "[ ]" };
    let id = ticket.id.map(|id| id.to_string()).unwrap_or_default();
    let assignee = user_label(users, ticket.assigned_to);
    let prefix = format!("  {} #{} ", marker, id);
    let suffix = format!("  ({})", assignee);
    let room = width.saturating_sub(prefix.len() + suffix.len()).max(10);
    format!("{}{}{}", prefix, truncate(&ticket.title, room), suffix)
}

fn format_group_names(groups: &[Group]) -> String {
    if groups.is_empty() {
        return "no groups".to_string();
    }
    groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>().join(", ")
}

/// Render a board as stage columns listed top to bottom
pub fn format_board(view: &BoardView, users: &HashMap<i64, User>, is_tty: bool) -> String {
    let width = get_terminal_width();
    let mut out = String::new();

    out.push_str(&bold_if_tty(&format!("Board: {}", view.board.name), is_tty));
    out.push('\n');
    if let Some(description) = &view.board.description {
        out.push_str(description);
        out.push('\n');
    }

    if view.columns.is_empty() {
        out.push_str("No stages.\n");
    }

    for column in &view.columns {
        out.push('\n');
        let header = format!(
            "{}. {} (id {})",
            column.stage.ordinal, column.stage.name, column.stage.stage_id
        );
        out.push_str(&bold_if_tty(&header, is_tty));
        out.push(' ');
        out.push_str(&dim_if_tty(&format!("[{}]", format_group_names(&column.groups)), is_tty));
        out.push('\n');
        if column.tickets.is_empty() {
            out.push_str(&dim_if_tty("  (empty)", is_tty));
            out.push('\n');
        }
        for ticket in &column.tickets {
            out.push_str(&format_ticket_line(ticket, users, width));
            out.push('\n');
        }
    }

    if !view.unstaged.is_empty() {
        out.push('\n');
        out.push_str(&bold_if_tty("No stage", is_tty));
        out.push('\n');
        for ticket in &view.unstaged {
            out.push_str(&format_ticket_line(ticket, users, width));
            out.push('\n');
        }
    }

    out
}

/// Render a ticket with its history (most recent first)
pub fn format_ticket_summary(
    ticket: &Ticket,
    stages: &[PlacedStage],
    users: &HashMap<i64, User>,
) -> String {
    let stage = match ticket.stage_id {
        Some(id) => stages
            .iter()
            .find(|s| s.stage_id == id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("stage {}", id)),
        None => "Unspecified".to_string(),
    };

    let mut out = String::new();
    out.push_str(&format!("Ticket #{}: {}\n", ticket.id.unwrap_or_default(), ticket.title));
    if !ticket.description.is_empty() {
        out.push_str(&format!("  Description: {}\n", ticket.description));
    }
    out.push_str(&format!("  Stage:       {}\n", stage));
    out.push_str(&format!("  Assignee:    {}\n", user_label(users, ticket.assigned_to)));
    out.push_str(&format!("  Created by:  {}\n", user_label(users, Some(ticket.created_by))));
    out.push_str(&format!("  Created:     {}\n", format_timestamp(ticket.created_ts)));
    out.push_str(&format!("  Complete:    {}\n", if ticket.is_complete { "yes" } else { "no" }));
    out.push_str(&format!("  Version:     {}\n", ticket.version));

    if !ticket.history.is_empty() {
        out.push_str("\nHistory:\n");
        for entry in &ticket.history {
            out.push_str(&format!("  {}  {}\n", format_timestamp(entry.changed_ts), entry.description));
        }
    }
    out
}

/// Render eligible assignees, one per line
pub fn format_user_list(users: &[User]) -> String {
    if users.is_empty() {
        return "No users.\n".to_string();
    }
    let width = users.iter().map(|u| u.username.len()).max().unwrap_or(0);
    let mut out = String::new();
    for user in users {
        out.push_str(&format!(
            "{:>4}  {:<width$}  {}  ({})\n",
            user.id,
            user.username,
            user.full_name,
            user.role,
            width = width
        ));
    }
    out
}
