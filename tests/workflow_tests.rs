// End-to-end workflow checks against the library API on an in-memory database

use rusqlite::Connection;
use stageboard::db::DbConnection;
use stageboard::engine::{
    BoardView, Eligibility, EngineError, GroupAssignment, ReorderOutcome, StageOrdering,
    TicketLifecycle,
};
use stageboard::models::{Actor, Group, NewTicket, Role, TrackedField, User};
use stageboard::repo::{GroupRepo, ProjectRepo, StageRepo, UserRepo};
use std::collections::BTreeSet;

struct Board {
    conn: Connection,
    project_id: i64,
    board_id: i64,
}

fn setup() -> Board {
    let conn = DbConnection::connect_in_memory().unwrap();
    let project = ProjectRepo::create(&conn, "website", None).unwrap();
    let board = stageboard::repo::BoardRepo::get_by_project(&conn, project.id)
        .unwrap()
        .unwrap();
    Board {
        conn,
        project_id: project.id,
        board_id: board.id,
    }
}

impl Board {
    fn user(&self, username: &str, full_name: &str, role: Role) -> User {
        UserRepo::create(&self.conn, username, full_name, role).unwrap()
    }

    fn group(&self, name: &str, manager: &User, members: &[&User]) -> Group {
        let group = GroupRepo::create(&self.conn, self.project_id, name, None, manager.id).unwrap();
        for member in members {
            GroupRepo::add_member(&self.conn, group.id, member.id).unwrap();
        }
        group
    }

    fn stage(&self, name: &str, groups: &[&Group]) -> i64 {
        let ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
        StageOrdering::add_stage(&self.conn, self.board_id, name, &ids)
            .unwrap()
            .stage_id
    }

    fn ticket(&self, title: &str, actor: &Actor, stage: Option<i64>, assignee: Option<i64>) -> i64 {
        let fields = NewTicket {
            title: title.to_string(),
            description: String::new(),
        };
        TicketLifecycle::create_ticket(&self.conn, &fields, actor, self.board_id, stage, assignee)
            .unwrap()
            .id
            .unwrap()
    }

    fn ordinals(&self) -> Vec<(i64, i64)> {
        StageRepo::get_placements(&self.conn, self.board_id)
            .unwrap()
            .into_iter()
            .map(|p| (p.stage_id, p.ordinal))
            .collect()
    }
}

#[test]
fn test_reorder_left_swaps_with_neighbour() {
    let b = setup();
    let s1 = b.stage("s1", &[]);
    let s2 = b.stage("s2", &[]);

    let outcome = StageOrdering::reorder(&b.conn, b.board_id, s2, "left").unwrap();
    assert_eq!(outcome, ReorderOutcome::Swapped { with_stage_id: s1 });

    let ordinals = b.ordinals();
    assert!(ordinals.contains(&(s2, 0)));
    assert!(ordinals.contains(&(s1, 1)));
}

#[test]
fn test_orders_stay_unique_across_mixed_operations() {
    let b = setup();
    let a = b.stage("a", &[]);
    let c = b.stage("c", &[]);
    let d = b.stage("d", &[]);
    StageOrdering::reorder(&b.conn, b.board_id, d, "left").unwrap();
    StageOrdering::delete_stage(&b.conn, b.board_id, c).unwrap();
    let e = b.stage("e", &[]);
    StageOrdering::reorder(&b.conn, b.board_id, e, "left").unwrap();
    StageOrdering::reorder(&b.conn, b.board_id, a, "right").unwrap();
    StageOrdering::reorder(&b.conn, b.board_id, a, "sideways").unwrap();

    let ordinals = b.ordinals();
    let distinct: BTreeSet<i64> = ordinals.iter().map(|(_, o)| *o).collect();
    assert_eq!(distinct.len(), ordinals.len());
    assert_eq!(ordinals.len(), 3);
}

#[test]
fn test_reassigning_groups_replaces_the_set() {
    let b = setup();
    let lead = b.user("lead", "Lead", Role::Member);
    let ga = b.group("gA", &lead, &[]);
    let gb = b.group("gB", &lead, &[]);
    let stage = b.stage("Review", &[&ga]);

    GroupAssignment::assign_groups_to_stage(&b.conn, b.board_id, stage, &[gb.id]).unwrap();
    let diff = GroupAssignment::assign_groups_to_stage(&b.conn, b.board_id, stage, &[gb.id]).unwrap();
    assert!(diff.is_empty());

    let groups = GroupAssignment::groups_for_all_stages(&b.conn, b.board_id).unwrap();
    let names: Vec<&str> = groups[&stage].iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["gB"]);
}

#[test]
fn test_move_keeps_assignee_who_is_a_member() {
    let b = setup();
    let admin = b.user("root", "Root", Role::Admin);
    let u2 = b.user("u2", "User Two", Role::Member);
    let g2 = b.group("g2", &admin, &[&u2]);
    let start = b.stage("start", &[]);
    let new2 = b.stage("new2", &[&g2]);
    let actor = Actor::from(&admin);

    let id = b.ticket("t", &actor, Some(start), Some(u2.id));
    let moved = TicketLifecycle::move_ticket(&b.conn, id, new2, &actor).unwrap();

    assert_eq!(moved.assigned_to, Some(u2.id));
    assert!(!moved
        .history
        .iter()
        .any(|h| h.field() == Some(TrackedField::AssignedTo)));
}

#[test]
fn test_move_clears_assignee_outside_stage_groups() {
    let b = setup();
    let admin = b.user("root", "Root", Role::Admin);
    let uc = b.user("uc", "User C", Role::Member);
    let empty = b.group("empty", &admin, &[]);
    let start = b.stage("start", &[]);
    let new_c = b.stage("newC", &[&empty]);
    let actor = Actor::from(&admin);

    let id = b.ticket("t", &actor, Some(start), Some(uc.id));
    let moved = TicketLifecycle::move_ticket(&b.conn, id, new_c, &actor).unwrap();
    assert_eq!(moved.assigned_to, None);

    let reloaded = TicketLifecycle::get_ticket(&b.conn, id).unwrap();
    let entry = reloaded
        .history
        .iter()
        .find(|h| h.field() == Some(TrackedField::AssignedTo))
        .unwrap();
    assert_eq!(entry.old_value, "User C");
    assert_eq!(entry.new_value, "Unassigned");
}

#[test]
fn test_edit_logs_only_changed_fields() {
    let b = setup();
    let ann = b.user("ann", "Ann", Role::Member);
    let actor = Actor::from(&ann);
    let id = b.ticket("OldTitle", &actor, None, None);

    let ticket = TicketLifecycle::get_ticket(&b.conn, id).unwrap();
    let before = ticket.history.len();
    let mut edit = ticket.to_edit();
    edit.title = "NewTitle".to_string();
    let edited = TicketLifecycle::edit_ticket(&b.conn, &ticket, &edit, &actor).unwrap();
    assert_eq!(edited.history.len(), before + 1);
    let entry = &edited.history[0];
    assert_eq!(entry.field(), Some(TrackedField::Title));
    assert!(entry.description.contains("OldTitle"));
    assert!(entry.description.contains("NewTitle"));

    let mut edit = edited.to_edit();
    edit.description = "details".to_string();
    let edited2 = TicketLifecycle::edit_ticket(&b.conn, &edited, &edit, &actor).unwrap();
    assert_eq!(edited2.history.len(), edited.history.len() + 1);
    assert_eq!(edited2.history[0].field(), Some(TrackedField::Description));

    let unchanged = edited2.to_edit();
    let edited3 = TicketLifecycle::edit_ticket(&b.conn, &edited2, &unchanged, &actor).unwrap();
    assert_eq!(edited3.history.len(), edited2.history.len());
}

#[test]
fn test_stale_edit_is_a_conflict() {
    let b = setup();
    let ann = b.user("ann", "Ann", Role::Member);
    let actor = Actor::from(&ann);
    let id = b.ticket("t", &actor, None, None);

    let first_read = TicketLifecycle::get_ticket(&b.conn, id).unwrap();
    let second_read = first_read.clone();

    let mut edit = first_read.to_edit();
    edit.title = "from first".to_string();
    TicketLifecycle::edit_ticket(&b.conn, &first_read, &edit, &actor).unwrap();

    let mut edit = second_read.to_edit();
    edit.title = "from second".to_string();
    let err = TicketLifecycle::edit_ticket(&b.conn, &second_read, &edit, &actor).unwrap_err();
    assert!(matches!(err, EngineError::Conflict { .. }));
    assert_eq!(TicketLifecycle::get_ticket(&b.conn, id).unwrap().title, "from first");
}

#[test]
fn test_eligibility_by_role() {
    let b = setup();
    let manager = b.user("mgr", "Manager", Role::Member);
    let m1 = b.user("m1", "Member One", Role::Member);
    let m2 = b.user("m2", "Member Two", Role::Member);
    let other = b.user("other", "Other", Role::Member);
    let admin = b.user("root", "Root", Role::Admin);
    let dev = b.group("dev", &manager, &[&m1, &m2]);
    let ops = b.group("ops", &admin, &[&m2, &other]);
    let stage = b.stage("Build", &[&dev, &ops]);

    let ids = |actor: &User| -> Vec<i64> {
        Eligibility::eligible_assignees(&b.conn, b.board_id, stage, &Actor::from(actor))
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect()
    };

    assert_eq!(ids(&manager), vec![m1.id, m2.id]);
    assert_eq!(ids(&m1), vec![m1.id]);
    assert_eq!(ids(&admin), vec![m1.id, m2.id, other.id]);
    assert!(ids(&b.user("nobody", "Nobody", Role::Member)).is_empty());
}

#[test]
fn test_stage_without_groups_has_no_eligible_assignees() {
    let b = setup();
    let stage = b.stage("Build", &[]);
    let admin = b.user("root", "Root", Role::Admin);
    let eligible =
        Eligibility::eligible_assignees(&b.conn, b.board_id, stage, &Actor::from(&admin)).unwrap();
    assert!(eligible.is_empty());
}

#[test]
fn test_board_view_reflects_workflow() {
    let b = setup();
    let ann = b.user("ann", "Ann", Role::Member);
    let actor = Actor::from(&ann);
    let todo = b.stage("Todo", &[]);
    let done = b.stage("Done", &[]);
    let id = b.ticket("ship it", &actor, Some(todo), None);

    TicketLifecycle::move_ticket(&b.conn, id, done, &actor).unwrap();
    TicketLifecycle::set_complete(&b.conn, id, true, &actor).unwrap();

    let view = BoardView::load(&b.conn, b.project_id).unwrap();
    assert!(view.columns[0].tickets.is_empty());
    assert_eq!(view.columns[1].tickets.len(), 1);
    assert!(view.columns[1].tickets[0].is_complete);
}
