// Command-line tests: each test runs the binary against a temporary HOME

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use std::fs;

/// Helper to create a temporary database and set it as the data location
fn setup_test_env() -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = test_env::lock_test_env();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config_dir = temp_dir.path().join(".stageboard");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("rc"),
        format!("data.location={}\nactor=ann\n", db_path.display()),
    )
    .unwrap();
    (temp_dir, guard)
}

/// Helper to create a new command with test environment
fn new_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stageboard").unwrap();
    cmd.env("HOME", temp_dir.path());
    cmd
}

fn run_ok(temp_dir: &TempDir, args: &[&str]) {
    new_cmd(temp_dir).args(args).assert().success();
}

/// A project with users ann (member), bob (member) and root (admin),
/// group "dev" managed by root with ann as member, and stages Todo and Review
fn seed(temp_dir: &TempDir) {
    run_ok(temp_dir, &["user", "add", "ann", "Ann Smith"]);
    run_ok(temp_dir, &["user", "add", "bob", "Bob Jones"]);
    run_ok(temp_dir, &["user", "add", "root", "Root Admin", "--role", "admin"]);
    run_ok(temp_dir, &["project", "add", "web"]);
    run_ok(temp_dir, &["group", "add", "web", "dev", "--manager", "root", "--member", "ann"]);
    run_ok(temp_dir, &["stage", "add", "web", "Todo"]);
    run_ok(temp_dir, &["stage", "add", "web", "Review", "--group", "dev"]);
}

#[test]
fn test_project_list_empty() {
    let (temp_dir, _guard) = setup_test_env();

    new_cmd(&temp_dir)
        .args(&["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects found"));
}

#[test]
fn test_duplicate_project_is_user_error() {
    let (temp_dir, _guard) = setup_test_env();
    run_ok(&temp_dir, &["project", "add", "web"]);

    new_cmd(&temp_dir)
        .args(&["project", "add", "web"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_board_shows_stages_in_order() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);

    new_cmd(&temp_dir)
        .args(&["board", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Board: web"))
        .stdout(predicate::str::contains("0. Todo"))
        .stdout(predicate::str::contains("1. Review"))
        .stdout(predicate::str::contains("[dev]"));

    run_ok(&temp_dir, &["stage", "move", "web", "Review", "left"]);

    new_cmd(&temp_dir)
        .args(&["stage", "list", "web"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?s)0\s+Review.*1\s+Todo").unwrap());
}

#[test]
fn test_unknown_direction_leaves_order_unchanged() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);

    new_cmd(&temp_dir)
        .args(&["stage", "move", "web", "Todo", "up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stage order unchanged"));
}

#[test]
fn test_ticket_move_drops_ineligible_assignee() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);

    run_ok(&temp_dir, &["ticket", "add", "web", "Fix login", "--stage", "Todo", "--assign", "bob"]);

    new_cmd(&temp_dir)
        .args(&["ticket", "move", "1", "Review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assignee removed"));

    new_cmd(&temp_dir)
        .args(&["ticket", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assignee:    Unassigned"))
        .stdout(predicate::str::contains("moved stage from Todo to Review"))
        .stdout(predicate::str::contains("changed assignee from \"Bob Jones\" to \"Unassigned\""));
}

#[test]
fn test_ticket_move_keeps_group_member() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);

    run_ok(&temp_dir, &["ticket", "add", "web", "Fix login", "--stage", "Todo", "--assign", "ann"]);

    new_cmd(&temp_dir)
        .args(&["ticket", "move", "1", "Review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assignee removed").not());

    new_cmd(&temp_dir)
        .args(&["ticket", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assignee:    Ann Smith"));
}

#[test]
fn test_ticket_edit_records_history() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);
    run_ok(&temp_dir, &["ticket", "add", "web", "OldTitle"]);

    new_cmd(&temp_dir)
        .args(&["ticket", "edit", "1", "--title", "NewTitle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 change(s): Title"));

    new_cmd(&temp_dir)
        .args(&["ticket", "edit", "1", "--title", "NewTitle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes"));

    new_cmd(&temp_dir)
        .args(&["ticket", "show", "1", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"NewTitle\""))
        .stdout(predicate::str::contains("\"property_changed\": \"Title\""));
}

#[test]
fn test_eligible_depends_on_actor() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);

    // ann is a member of dev: only herself
    new_cmd(&temp_dir)
        .args(&["stage", "eligible", "web", "Review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ann"))
        .stdout(predicate::str::contains("bob").not());

    // bob is outside every group
    new_cmd(&temp_dir)
        .args(&["--as", "bob", "stage", "eligible", "web", "Review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No users."));
}

#[test]
fn test_unknown_actor_is_user_error() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);

    new_cmd(&temp_dir)
        .args(&["--as", "ghost", "ticket", "add", "web", "t"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("User 'ghost' not found"));
}

#[test]
fn test_missing_ticket_is_user_error() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);

    new_cmd(&temp_dir)
        .args(&["ticket", "complete", "42"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Ticket 42 not found"));
}

#[test]
fn test_delete_stage_with_tickets_is_rejected() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);
    run_ok(&temp_dir, &["ticket", "add", "web", "t", "--stage", "Todo"]);

    new_cmd(&temp_dir)
        .args(&["stage", "delete", "web", "Todo"])
        .assert()
        .code(1);

    run_ok(&temp_dir, &["ticket", "delete", "1"]);
    run_ok(&temp_dir, &["stage", "delete", "web", "Todo"]);

    new_cmd(&temp_dir)
        .args(&["stage", "list", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Todo").not())
        .stdout(predicate::str::contains("Review"));
}

#[test]
fn test_stage_groups_replace_assignment() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);
    run_ok(&temp_dir, &["group", "add", "web", "qa", "--manager", "root", "--member", "bob"]);

    new_cmd(&temp_dir)
        .args(&["stage", "groups", "web", "Review", "qa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 added, 1 removed"));

    new_cmd(&temp_dir)
        .args(&["board", "web", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"qa\""))
        .stdout(predicate::str::contains("\"name\": \"dev\"").not());
}

#[test]
fn test_compact_reports_last_position() {
    let (temp_dir, _guard) = setup_test_env();
    run_ok(&temp_dir, &["project", "add", "empty"]);

    new_cmd(&temp_dir)
        .args(&["stage", "compact", "empty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Board has no stages"));

    seed(&temp_dir);
    run_ok(&temp_dir, &["stage", "add", "web", "Done"]);

    new_cmd(&temp_dir)
        .args(&["stage", "compact", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 stage(s) at positions 0 to 2"));
}
