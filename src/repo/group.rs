use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use crate::models::Group;
use crate::repo::{StageRepo, UserRepo};
use anyhow::{Context, Result};

/// Group repository
///
/// Covers groups, their membership, and the assignment of groups to
/// board stages (`board_stage_groups`).
pub struct GroupRepo;

fn row_to_group(row: &Row) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        manager_id: row.get(4)?,
        members: None,
    })
}

impl GroupRepo {
    /// Create a group within a project
    pub fn create(
        conn: &Connection,
        project_id: i64,
        name: &str,
        description: Option<&str>,
        manager_id: i64,
    ) -> Result<Group> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO user_groups (project_id, name, description, manager_id, created_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![project_id, name, description, manager_id, now],
        )
        .with_context(|| format!("Failed to create group: {}", name))?;

        Ok(Group {
            id: conn.last_insert_rowid(),
            project_id,
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            manager_id,
            members: Some(Vec::new()),
        })
    }

    /// Get group by ID (members not loaded)
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Group>> {
        let mut stmt = conn.prepare(
            "SELECT id, project_id, name, description, manager_id FROM user_groups WHERE id = ?1"
        )?;
        let group = stmt.query_row([id], row_to_group).optional()?;
        Ok(group)
    }

    /// Get group by ID with its member list loaded
    pub fn get_with_members(conn: &Connection, id: i64) -> Result<Option<Group>> {
        match Self::get_by_id(conn, id)? {
            Some(mut group) => {
                group.members = Some(UserRepo::list_by_group(conn, id)?);
                Ok(Some(group))
            }
            None => Ok(None),
        }
    }

    /// Groups of a project ordered by id (members not loaded)
    pub fn list_by_project(conn: &Connection, project_id: i64) -> Result<Vec<Group>> {
        let mut stmt = conn.prepare(
            "SELECT id, project_id, name, description, manager_id
             FROM user_groups WHERE project_id = ?1 ORDER BY id"
        )?;
        let rows = stmt.query_map([project_id], row_to_group)?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }
        Ok(groups)
    }

    /// Add a member to a group (no-op if already a member)
    pub fn add_member(conn: &Connection, group_id: i64, user_id: i64) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
            rusqlite::params![group_id, user_id],
        )
        .with_context(|| format!("Failed to add user {} to group {}", user_id, group_id))?;
        Ok(())
    }

    /// Group ids currently assigned to a placement
    pub fn get_stage_group_ids(conn: &Connection, board_id: i64, stage_id: i64) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT group_id FROM board_stage_groups
             WHERE board_id = ?1 AND stage_id = ?2 ORDER BY group_id"
        )?;
        let rows = stmt.query_map(rusqlite::params![board_id, stage_id], |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Assign a group to a placement
    pub fn add_stage_group(conn: &Connection, board_id: i64, stage_id: i64, group_id: i64) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO board_stage_groups (board_id, stage_id, group_id) VALUES (?1, ?2, ?3)",
            rusqlite::params![board_id, stage_id, group_id],
        )
        .with_context(|| format!("Failed to assign group {} to stage {}", group_id, stage_id))?;
        Ok(())
    }

    /// Remove a group assignment from a placement
    pub fn remove_stage_group(conn: &Connection, board_id: i64, stage_id: i64, group_id: i64) -> Result<()> {
        conn.execute(
            "DELETE FROM board_stage_groups WHERE board_id = ?1 AND stage_id = ?2 AND group_id = ?3",
            rusqlite::params![board_id, stage_id, group_id],
        )
        .with_context(|| format!("Failed to remove group {} from stage {}", group_id, stage_id))?;
        Ok(())
    }

    /// Map of stage id to assigned groups (members loaded) for every placed stage of a board.
    /// Placed stages without assignments map to an empty list.
    pub fn get_groups_by_stage(conn: &Connection, board_id: i64) -> Result<BTreeMap<i64, Vec<Group>>> {
        let mut map: BTreeMap<i64, Vec<Group>> = BTreeMap::new();
        for placement in StageRepo::get_placements(conn, board_id)? {
            map.insert(placement.stage_id, Vec::new());
        }

        let mut stmt = conn.prepare(
            "SELECT bsg.stage_id, g.id, g.project_id, g.name, g.description, g.manager_id
             FROM board_stage_groups bsg JOIN user_groups g ON g.id = bsg.group_id
             WHERE bsg.board_id = ?1
             ORDER BY bsg.stage_id, g.id"
        )?;
        let rows = stmt.query_map([board_id], |row| {
            let stage_id: i64 = row.get(0)?;
            Ok((
                stage_id,
                Group {
                    id: row.get(1)?,
                    project_id: row.get(2)?,
                    name: row.get(3)?,
                    description: row.get(4)?,
                    manager_id: row.get(5)?,
                    members: None,
                },
            ))
        })?;

        for row in rows {
            let (stage_id, mut group) = row?;
            group.members = Some(UserRepo::list_by_group(conn, group.id)?);
            map.entry(stage_id).or_default().push(group);
        }
        Ok(map)
    }
}
