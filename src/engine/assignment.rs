use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};
use crate::engine::{EngineError, EngineResult};
use crate::models::Group;
use crate::repo::{BoardRepo, GroupRepo, StageRepo};

/// Changes applied by a group reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentDiff {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
}

impl AssignmentDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Group assignment engine
///
/// Decides which permission groups may act on tickets in a (board, stage)
/// placement. Assignment is declarative: callers pass the desired set of
/// group ids and the stored set is reconciled to it.
pub struct GroupAssignment;

impl GroupAssignment {
    /// Make the groups assigned to a placement exactly `desired_group_ids`.
    ///
    /// A missing placement is a no-op. Ids that do not name a group of the
    /// board's project are skipped. Calling twice with the same set changes
    /// nothing the second time.
    pub fn assign_groups_to_stage(
        conn: &Connection,
        board_id: i64,
        stage_id: i64,
        desired_group_ids: &[i64],
    ) -> EngineResult<AssignmentDiff> {
        let tx = conn.unchecked_transaction()?;
        let diff = Self::reconcile(&tx, board_id, stage_id, desired_group_ids)?;
        tx.commit()?;

        if !diff.is_empty() {
            log::info!(
                "Stage {} on board {}: assigned groups {:?}, removed groups {:?}",
                stage_id,
                board_id,
                diff.added,
                diff.removed
            );
        }
        Ok(diff)
    }

    /// Reconcile without opening a transaction; the caller owns the unit of work
    pub(crate) fn reconcile(
        conn: &Connection,
        board_id: i64,
        stage_id: i64,
        desired_group_ids: &[i64],
    ) -> EngineResult<AssignmentDiff> {
        if StageRepo::get_placement(conn, board_id, stage_id)?.is_none() {
            log::debug!("Stage {} is not placed on board {}; skipping group assignment", stage_id, board_id);
            return Ok(AssignmentDiff::default());
        }
        let board = BoardRepo::get_by_id(conn, board_id)?
            .ok_or_else(|| EngineError::not_found("Board", board_id))?;

        let desired: BTreeSet<i64> = desired_group_ids.iter().copied().collect();
        let current: BTreeSet<i64> = GroupRepo::get_stage_group_ids(conn, board_id, stage_id)?
            .into_iter()
            .collect();

        let mut diff = AssignmentDiff::default();

        for &group_id in current.difference(&desired) {
            GroupRepo::remove_stage_group(conn, board_id, stage_id, group_id)?;
            diff.removed.push(group_id);
        }

        for &group_id in desired.difference(&current) {
            match GroupRepo::get_by_id(conn, group_id)? {
                Some(group) if group.project_id == board.project_id => {
                    GroupRepo::add_stage_group(conn, board_id, stage_id, group_id)?;
                    diff.added.push(group_id);
                }
                Some(_) => {
                    log::warn!("Group {} belongs to another project; not assigned to stage {}", group_id, stage_id);
                }
                None => {
                    log::warn!("Group {} not found; not assigned to stage {}", group_id, stage_id);
                }
            }
        }

        Ok(diff)
    }

    /// Stage id to assigned groups (with members) for every stage on the board
    pub fn groups_for_all_stages(conn: &Connection, board_id: i64) -> EngineResult<BTreeMap<i64, Vec<Group>>> {
        Ok(GroupRepo::get_groups_by_stage(conn, board_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::Fixture;
    use crate::models::Role;
    use crate::repo::ProjectRepo;

    fn assigned(fx: &Fixture, stage_id: i64) -> Vec<i64> {
        GroupRepo::get_stage_group_ids(&fx.conn, fx.board_id, stage_id).unwrap()
    }

    #[test]
    fn test_replace_assignment() {
        let fx = Fixture::new();
        let manager = fx.user("m", "Manager", Role::Member);
        let ga = fx.group("gA", &manager, &[]);
        let gb = fx.group("gB", &manager, &[]);
        let stage = fx.stage("s", &[&ga]);

        let diff = GroupAssignment::assign_groups_to_stage(&fx.conn, fx.board_id, stage, &[gb.id]).unwrap();
        assert_eq!(diff.added, vec![gb.id]);
        assert_eq!(diff.removed, vec![ga.id]);
        assert_eq!(assigned(&fx, stage), vec![gb.id]);
    }

    #[test]
    fn test_assignment_is_idempotent() {
        let fx = Fixture::new();
        let manager = fx.user("m", "Manager", Role::Member);
        let ga = fx.group("gA", &manager, &[]);
        let gb = fx.group("gB", &manager, &[]);
        let stage = fx.stage("s", &[]);

        let wanted = [gb.id, ga.id, gb.id];
        GroupAssignment::assign_groups_to_stage(&fx.conn, fx.board_id, stage, &wanted).unwrap();
        let second = GroupAssignment::assign_groups_to_stage(&fx.conn, fx.board_id, stage, &wanted).unwrap();

        assert!(second.is_empty());
        assert_eq!(assigned(&fx, stage), vec![ga.id, gb.id]);
    }

    #[test]
    fn test_empty_set_clears() {
        let fx = Fixture::new();
        let manager = fx.user("m", "Manager", Role::Member);
        let ga = fx.group("gA", &manager, &[]);
        let stage = fx.stage("s", &[&ga]);

        let diff = GroupAssignment::assign_groups_to_stage(&fx.conn, fx.board_id, stage, &[]).unwrap();
        assert_eq!(diff.removed, vec![ga.id]);
        assert!(assigned(&fx, stage).is_empty());
    }

    #[test]
    fn test_missing_placement_and_unknown_groups_are_skipped() {
        let fx = Fixture::new();
        let manager = fx.user("m", "Manager", Role::Member);
        let ga = fx.group("gA", &manager, &[]);
        let stage = fx.stage("s", &[]);

        let diff = GroupAssignment::assign_groups_to_stage(&fx.conn, fx.board_id, 999, &[ga.id]).unwrap();
        assert!(diff.is_empty());

        let other = ProjectRepo::create(&fx.conn, "other", None).unwrap();
        let foreign = GroupRepo::create(&fx.conn, other.id, "gX", None, manager.id).unwrap();
        let diff = GroupAssignment::assign_groups_to_stage(
            &fx.conn, fx.board_id, stage, &[ga.id, foreign.id, 12345],
        ).unwrap();
        assert_eq!(diff.added, vec![ga.id]);
        assert_eq!(assigned(&fx, stage), vec![ga.id]);
    }

    #[test]
    fn test_groups_for_all_stages() {
        let fx = Fixture::new();
        let manager = fx.user("m", "Manager", Role::Member);
        let member = fx.user("u", "User", Role::Member);
        let ga = fx.group("gA", &manager, &[&member]);
        let s1 = fx.stage("s1", &[&ga]);
        let s2 = fx.stage("s2", &[]);

        let map = GroupAssignment::groups_for_all_stages(&fx.conn, fx.board_id).unwrap();
        assert_eq!(map[&s1].len(), 1);
        assert!(map[&s1][0].has_member(member.id));
        assert!(map[&s2].is_empty());
    }
}
