// Shared setup for engine unit tests

use rusqlite::Connection;
use crate::db::DbConnection;
use crate::engine::StageOrdering;
use crate::models::{Actor, Group, Role, User};
use crate::repo::{BoardRepo, GroupRepo, ProjectRepo, UserRepo};

pub(crate) struct Fixture {
    pub conn: Connection,
    pub project_id: i64,
    pub board_id: i64,
}

impl Fixture {
    pub fn new() -> Self {
        let conn = DbConnection::connect_in_memory().unwrap();
        let project = ProjectRepo::create(&conn, "proj", None).unwrap();
        let board = BoardRepo::get_by_project(&conn, project.id).unwrap().unwrap();
        Fixture {
            conn,
            project_id: project.id,
            board_id: board.id,
        }
    }

    pub fn user(&self, username: &str, full_name: &str, role: Role) -> User {
        UserRepo::create(&self.conn, username, full_name, role).unwrap()
    }

    pub fn group(&self, name: &str, manager: &User, members: &[&User]) -> Group {
        let group = GroupRepo::create(&self.conn, self.project_id, name, None, manager.id).unwrap();
        for member in members {
            GroupRepo::add_member(&self.conn, group.id, member.id).unwrap();
        }
        GroupRepo::get_with_members(&self.conn, group.id).unwrap().unwrap()
    }

    pub fn stage(&self, name: &str, groups: &[&Group]) -> i64 {
        let ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
        StageOrdering::add_stage(&self.conn, self.board_id, name, &ids)
            .unwrap()
            .stage_id
    }

    pub fn actor(user: &User) -> Actor {
        Actor::from(user)
    }
}
