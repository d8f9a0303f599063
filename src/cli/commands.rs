use clap::{Parser, Subcommand};
use rusqlite::Connection;
use crate::config::Config;
use crate::db::DbConnection;
use crate::engine::{
    BoardView, Eligibility, GroupAssignment, ReorderOutcome, StageOrdering, TicketLifecycle,
};
use crate::models::{Actor, Board, NewTicket, Project, Role, User};
use crate::repo::{BoardRepo, GroupRepo, ProjectRepo, StageRepo, UserRepo};
use crate::cli::error::{user_error, validate_name, validate_non_empty, validate_ticket_id, validate_username};
use crate::cli::output::{format_board, format_ticket_summary, format_user_list, is_tty};
use std::collections::HashMap;
use anyhow::{Context, Result};

#[derive(Parser)]
#[command(name = "stageboard")]
#[command(about = "Stageboard - board-based ticket workflow with group-scoped stages and change history")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Act as this user (overrides `actor` in ~/.stageboard/rc)
    #[arg(long = "as", global = true, value_name = "USERNAME")]
    pub as_user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project management commands
    Project {
        #[command(subcommand)]
        subcommand: ProjectCommands,
    },
    /// User management commands
    User {
        #[command(subcommand)]
        subcommand: UserCommands,
    },
    /// Permission group commands
    Group {
        #[command(subcommand)]
        subcommand: GroupCommands,
    },
    /// Board stage commands
    Stage {
        #[command(subcommand)]
        subcommand: StageCommands,
    },
    /// Ticket commands
    Ticket {
        #[command(subcommand)]
        subcommand: TicketCommands,
    },
    /// Show a project's board
    Board {
        /// Project name
        project: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project (and its board)
    Add {
        /// Project name
        name: String,
        /// Board description
        #[arg(long)]
        description: Option<String>,
    },
    /// List projects
    List,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user
    Add {
        /// Login name (lowercase)
        username: String,
        /// Display name
        full_name: String,
        #[arg(long, value_enum, default_value_t = Role::Member)]
        role: Role,
    },
    /// List users
    List,
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a group in a project
    Add {
        /// Project name
        project: String,
        /// Group name
        name: String,
        /// Username of the group manager
        #[arg(long)]
        manager: String,
        /// Username of a member (repeatable)
        #[arg(long = "member")]
        members: Vec<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add a user to a group
    Join {
        /// Project name
        project: String,
        /// Group name
        group: String,
        /// Username to add
        username: String,
    },
    /// List a project's groups with their members
    List {
        /// Project name
        project: String,
    },
}

#[derive(Subcommand)]
pub enum StageCommands {
    /// Append a stage to a project's board
    Add {
        /// Project name
        project: String,
        /// Stage name
        name: String,
        /// Group allowed on the stage (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,
    },
    /// Remove a stage from a project's board
    Delete {
        project: String,
        /// Stage name or id
        stage: String,
    },
    /// Rename a stage
    Rename {
        project: String,
        /// Stage name or id
        stage: String,
        /// New name
        name: String,
    },
    /// Move a stage one position left or right
    Move {
        project: String,
        /// Stage name or id
        stage: String,
        /// "left" or "right"
        direction: String,
    },
    /// Set the groups allowed on a stage (replaces the current set)
    Groups {
        project: String,
        /// Stage name or id
        stage: String,
        /// Group names; none clears the stage
        groups: Vec<String>,
    },
    /// Renumber stage positions to 0..n
    Compact {
        project: String,
    },
    /// List who the acting user may assign tickets to on a stage
    Eligible {
        project: String,
        /// Stage name or id
        stage: String,
    },
    /// List a board's stages in order
    List {
        project: String,
    },
}

#[derive(Subcommand)]
pub enum TicketCommands {
    /// Create a ticket
    Add {
        /// Project name
        project: String,
        /// Ticket title
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Initial stage (name or id)
        #[arg(long)]
        stage: Option<String>,
        /// Username of the initial assignee
        #[arg(long)]
        assign: Option<String>,
    },
    /// Edit a ticket's title, description, assignee or stage
    Edit {
        #[arg(value_parser = validate_ticket_id)]
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Username of the new assignee
        #[arg(long, conflicts_with = "unassign")]
        assign: Option<String>,
        /// Clear the assignee
        #[arg(long)]
        unassign: bool,
        /// Stage name or id
        #[arg(long)]
        stage: Option<String>,
    },
    /// Move a ticket to another stage, dropping an assignee the stage does not allow
    Move {
        #[arg(value_parser = validate_ticket_id)]
        id: i64,
        /// Destination stage (name or id)
        stage: String,
    },
    /// Mark a ticket complete
    Complete {
        #[arg(value_parser = validate_ticket_id)]
        id: i64,
    },
    /// Reopen a completed ticket
    Reopen {
        #[arg(value_parser = validate_ticket_id)]
        id: i64,
    },
    /// Delete a ticket and its history
    Delete {
        #[arg(value_parser = validate_ticket_id)]
        id: i64,
    },
    /// Show a ticket with its history
    Show {
        #[arg(value_parser = validate_ticket_id)]
        id: i64,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Project { subcommand } => handle_project(&conn, subcommand),
        Commands::User { subcommand } => handle_user(&conn, subcommand),
        Commands::Group { subcommand } => handle_group(&conn, subcommand),
        Commands::Stage { subcommand } => handle_stage(&conn, subcommand, cli.as_user.as_deref()),
        Commands::Ticket { subcommand } => handle_ticket(&conn, subcommand, cli.as_user.as_deref()),
        Commands::Board { project, json } => handle_board(&conn, &project, json),
    }
}

/// Resolve the acting user from `--as` or the rc file
fn resolve_actor(conn: &Connection, as_user: Option<&str>) -> Result<Actor> {
    let username = match as_user {
        Some(name) => name.to_string(),
        None => match Config::load()?.actor {
            Some(name) => name,
            None => user_error("No acting user. Pass --as <username> or set actor=<username> in ~/.stageboard/rc"),
        },
    };
    match UserRepo::get_by_username(conn, &username)? {
        Some(user) => Ok(Actor::from(&user)),
        None => user_error(&format!("User '{}' not found", username)),
    }
}

fn find_project(conn: &Connection, name: &str) -> Result<(Project, Board)> {
    let Some(project) = ProjectRepo::get_by_name(conn, name)? else {
        user_error(&format!("Project '{}' not found", name));
    };
    let Some(board) = BoardRepo::get_by_project(conn, project.id)? else {
        user_error(&format!("Project '{}' has no board", name));
    };
    Ok((project, board))
}

fn find_user(conn: &Connection, username: &str) -> Result<User> {
    match UserRepo::get_by_username(conn, username)? {
        Some(user) => Ok(user),
        None => user_error(&format!("User '{}' not found", username)),
    }
}

/// Resolve a stage by id or by name among the stages placed on a board
fn resolve_stage(conn: &Connection, board_id: i64, stage_ref: &str) -> Result<i64> {
    let stages = StageRepo::list_for_board(conn, board_id)?;
    if let Ok(id) = stage_ref.parse::<i64>() {
        if stages.iter().any(|s| s.stage_id == id) {
            return Ok(id);
        }
    }
    let matches: Vec<_> = stages.iter().filter(|s| s.name == stage_ref).collect();
    match matches.as_slice() {
        [stage] => Ok(stage.stage_id),
        [] => user_error(&format!("Stage '{}' is not on this board", stage_ref)),
        _ => user_error(&format!("Stage name '{}' is ambiguous; use the stage id", stage_ref)),
    }
}

fn resolve_groups(conn: &Connection, project_id: i64, names: &[String]) -> Result<Vec<i64>> {
    let groups = GroupRepo::list_by_project(conn, project_id)?;
    let mut ids = Vec::new();
    for name in names {
        match groups.iter().find(|g| &g.name == name) {
            Some(group) => ids.push(group.id),
            None => user_error(&format!("Group '{}' not found in project", name)),
        }
    }
    Ok(ids)
}

fn users_by_id(conn: &Connection) -> Result<HashMap<i64, User>> {
    Ok(UserRepo::list(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

fn handle_project(conn: &Connection, cmd: ProjectCommands) -> Result<()> {
    match cmd {
        ProjectCommands::Add { name, description } => {
            if let Err(e) = validate_name(&name, "Project") {
                user_error(&e);
            }
            if ProjectRepo::get_by_name(conn, &name)?.is_some() {
                user_error(&format!("Project '{}' already exists", name));
            }
            let project = ProjectRepo::create(conn, &name, description.as_deref())?;
            println!("Created project '{}' (id: {})", project.name, project.id);
            Ok(())
        }
        ProjectCommands::List => {
            let projects = ProjectRepo::list(conn)?;
            if projects.is_empty() {
                println!("No projects found.");
            }
            for project in projects {
                println!("{:>4}  {}", project.id, project.name);
            }
            Ok(())
        }
    }
}

fn handle_user(conn: &Connection, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Add { username, full_name, role } => {
            if let Err(e) = validate_username(&username) {
                user_error(&e);
            }
            if let Err(e) = validate_non_empty(&full_name, "Full name") {
                user_error(&e);
            }
            if UserRepo::get_by_username(conn, &username)?.is_some() {
                user_error(&format!("User '{}' already exists", username));
            }
            let user = UserRepo::create(conn, &username, full_name.trim(), role)?;
            println!("Created user '{}' (id: {}, role: {})", user.username, user.id, user.role);
            Ok(())
        }
        UserCommands::List => {
            print!("{}", format_user_list(&UserRepo::list(conn)?));
            Ok(())
        }
    }
}

fn handle_group(conn: &Connection, cmd: GroupCommands) -> Result<()> {
    match cmd {
        GroupCommands::Add { project, name, manager, members, description } => {
            let (project, _) = find_project(conn, &project)?;
            if let Err(e) = validate_name(&name, "Group") {
                user_error(&e);
            }
            if GroupRepo::list_by_project(conn, project.id)?.iter().any(|g| g.name == name) {
                user_error(&format!("Group '{}' already exists in project '{}'", name, project.name));
            }
            let manager = find_user(conn, &manager)?;
            let mut member_ids = Vec::new();
            for username in &members {
                member_ids.push(find_user(conn, username)?.id);
            }

            let tx = conn.unchecked_transaction()?;
            let group = GroupRepo::create(&tx, project.id, &name, description.as_deref(), manager.id)?;
            for user_id in member_ids {
                GroupRepo::add_member(&tx, group.id, user_id)?;
            }
            tx.commit()?;

            println!("Created group '{}' (id: {}) managed by {}", group.name, group.id, manager.full_name);
            Ok(())
        }
        GroupCommands::Join { project, group, username } => {
            let (project, _) = find_project(conn, &project)?;
            let group_id = resolve_groups(conn, project.id, &[group.clone()])?[0];
            let user = find_user(conn, &username)?;
            GroupRepo::add_member(conn, group_id, user.id)?;
            println!("Added {} to group '{}'", user.full_name, group);
            Ok(())
        }
        GroupCommands::List { project } => {
            let (project, _) = find_project(conn, &project)?;
            let groups = GroupRepo::list_by_project(conn, project.id)?;
            if groups.is_empty() {
                println!("No groups found.");
            }
            let users = users_by_id(conn)?;
            for group in groups {
                let manager = users
                    .get(&group.manager_id)
                    .map(|u| u.full_name.as_str())
                    .unwrap_or("?");
                let members: Vec<String> = UserRepo::list_by_group(conn, group.id)?
                    .into_iter()
                    .map(|u| u.username)
                    .collect();
                println!(
                    "{:>4}  {}  (manager: {})  members: {}",
                    group.id,
                    group.name,
                    manager,
                    if members.is_empty() { "-".to_string() } else { members.join(", ") }
                );
            }
            Ok(())
        }
    }
}

fn handle_stage(conn: &Connection, cmd: StageCommands, as_user: Option<&str>) -> Result<()> {
    match cmd {
        StageCommands::Add { project, name, groups } => {
            let (project, board) = find_project(conn, &project)?;
            let group_ids = resolve_groups(conn, project.id, &groups)?;
            let placement = StageOrdering::add_stage(conn, board.id, &name, &group_ids)?;
            println!(
                "Added stage '{}' (id: {}) at position {}",
                name.trim(),
                placement.stage_id,
                placement.ordinal
            );
            Ok(())
        }
        StageCommands::Delete { project, stage } => {
            let (_, board) = find_project(conn, &project)?;
            let stage_id = resolve_stage(conn, board.id, &stage)?;
            StageOrdering::delete_stage(conn, board.id, stage_id)?;
            println!("Deleted stage {}", stage_id);
            Ok(())
        }
        StageCommands::Rename { project, stage, name } => {
            let (_, board) = find_project(conn, &project)?;
            let stage_id = resolve_stage(conn, board.id, &stage)?;
            StageOrdering::rename_stage(conn, stage_id, &name)?;
            println!("Renamed stage {} to '{}'", stage_id, name.trim());
            Ok(())
        }
        StageCommands::Move { project, stage, direction } => {
            let (_, board) = find_project(conn, &project)?;
            let stage_id = resolve_stage(conn, board.id, &stage)?;
            match StageOrdering::reorder(conn, board.id, stage_id, &direction)? {
                ReorderOutcome::Swapped { with_stage_id } => {
                    println!("Moved stage {} {} (swapped with {})", stage_id, direction, with_stage_id);
                }
                ReorderOutcome::Unchanged => println!("Stage order unchanged"),
            }
            Ok(())
        }
        StageCommands::Groups { project, stage, groups } => {
            let (project, board) = find_project(conn, &project)?;
            let stage_id = resolve_stage(conn, board.id, &stage)?;
            let group_ids = resolve_groups(conn, project.id, &groups)?;
            let diff = GroupAssignment::assign_groups_to_stage(conn, board.id, stage_id, &group_ids)?;
            if diff.is_empty() {
                println!("Stage {} groups unchanged", stage_id);
            } else {
                println!(
                    "Stage {} groups updated ({} added, {} removed)",
                    stage_id,
                    diff.added.len(),
                    diff.removed.len()
                );
            }
            Ok(())
        }
        StageCommands::Compact { project } => {
            let (_, board) = find_project(conn, &project)?;
            let placements = StageOrdering::compact(conn, board.id)?;
            match placements.len() {
                0 => println!("Board has no stages"),
                n => println!("Board has {} stage(s) at positions 0 to {}", n, n - 1),
            }
            Ok(())
        }
        StageCommands::Eligible { project, stage } => {
            let (_, board) = find_project(conn, &project)?;
            let stage_id = resolve_stage(conn, board.id, &stage)?;
            let actor = resolve_actor(conn, as_user)?;
            let users = Eligibility::eligible_assignees(conn, board.id, stage_id, &actor)?;
            print!("{}", format_user_list(&users));
            Ok(())
        }
        StageCommands::List { project } => {
            let (_, board) = find_project(conn, &project)?;
            let stages = StageOrdering::list_stages(conn, board.id)?;
            if stages.is_empty() {
                println!("No stages.");
            }
            for stage in stages {
                println!("{:>3}  {}  (id {})", stage.ordinal, stage.name, stage.stage_id);
            }
            Ok(())
        }
    }
}

fn handle_ticket(conn: &Connection, cmd: TicketCommands, as_user: Option<&str>) -> Result<()> {
    match cmd {
        TicketCommands::Add { project, title, description, stage, assign } => {
            let (_, board) = find_project(conn, &project)?;
            let actor = resolve_actor(conn, as_user)?;
            let stage_id = match stage {
                Some(stage_ref) => Some(resolve_stage(conn, board.id, &stage_ref)?),
                None => None,
            };
            let assignee_id = match assign {
                Some(username) => Some(find_user(conn, &username)?.id),
                None => None,
            };
            let fields = NewTicket {
                title,
                description: description.unwrap_or_default(),
            };
            let ticket = TicketLifecycle::create_ticket(conn, &fields, &actor, board.id, stage_id, assignee_id)?;
            println!("Created ticket {}: {}", ticket.id.unwrap_or_default(), ticket.title);
            Ok(())
        }
        TicketCommands::Edit { id, title, description, assign, unassign, stage } => {
            let actor = resolve_actor(conn, as_user)?;
            let existing = TicketLifecycle::get_ticket(conn, id)?;
            let mut edit = existing.to_edit();
            if let Some(title) = title {
                edit.title = title;
            }
            if let Some(description) = description {
                edit.description = description;
            }
            if let Some(username) = assign {
                edit.assigned_to = Some(find_user(conn, &username)?.id);
            }
            if unassign {
                edit.assigned_to = None;
            }
            if let Some(stage_ref) = stage {
                edit.stage_id = Some(resolve_stage(conn, existing.board_id, &stage_ref)?);
            }

            let before = existing.history.len();
            let updated = TicketLifecycle::edit_ticket(conn, &existing, &edit, &actor)?;
            let changes = updated.history.len() - before;
            if changes == 0 {
                println!("No changes to ticket {}", id);
            } else {
                let fields: Vec<&str> = updated.history[..changes]
                    .iter()
                    .filter_map(|h| h.field())
                    .map(|f| f.as_str())
                    .collect();
                println!("Updated ticket {} ({} change(s): {})", id, changes, fields.join(", "));
            }
            Ok(())
        }
        TicketCommands::Move { id, stage } => {
            let actor = resolve_actor(conn, as_user)?;
            let existing = TicketLifecycle::get_ticket(conn, id)?;
            let stage_id = resolve_stage(conn, existing.board_id, &stage)?;
            let moved = TicketLifecycle::move_ticket(conn, id, stage_id, &actor)?;
            println!("Moved ticket {} to stage {}", id, stage_id);
            if existing.assigned_to.is_some() && moved.assigned_to.is_none() {
                println!("Assignee removed: not allowed on the destination stage");
            }
            Ok(())
        }
        TicketCommands::Complete { id } => {
            let actor = resolve_actor(conn, as_user)?;
            TicketLifecycle::set_complete(conn, id, true, &actor)?;
            println!("Completed ticket {}", id);
            Ok(())
        }
        TicketCommands::Reopen { id } => {
            let actor = resolve_actor(conn, as_user)?;
            TicketLifecycle::set_complete(conn, id, false, &actor)?;
            println!("Reopened ticket {}", id);
            Ok(())
        }
        TicketCommands::Delete { id } => {
            TicketLifecycle::delete_ticket(conn, id)?;
            println!("Deleted ticket {}", id);
            Ok(())
        }
        TicketCommands::Show { id, json } => {
            let ticket = TicketLifecycle::get_ticket(conn, id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ticket)?);
            } else {
                let stages = StageRepo::list_for_board(conn, ticket.board_id)?;
                print!("{}", format_ticket_summary(&ticket, &stages, &users_by_id(conn)?));
            }
            Ok(())
        }
    }
}

fn handle_board(conn: &Connection, project: &str, json: bool) -> Result<()> {
    let (project, _) = find_project(conn, project)?;
    let view = BoardView::load(conn, project.id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", format_board(&view, &users_by_id(conn)?, is_tty()));
    }
    Ok(())
}
