use rusqlite::Connection;
use std::collections::BTreeMap;
use crate::engine::{EngineError, EngineResult, GroupAssignment};
use crate::models::{Actor, Group, Role, User};
use crate::repo::BoardRepo;

/// Eligibility resolver
///
/// Computes who the acting user may assign a ticket to at a stage, given the
/// groups assigned to that stage. Each group is evaluated on its own, first
/// matching rule wins for that group:
///
/// 1. the actor manages the group: every member of the group
/// 2. the actor is a member of the group: only the actor
/// 3. otherwise the actor's role decides (administrators get every member)
///
/// Users reached through several groups appear once.
pub struct Eligibility;

impl Eligibility {
    /// Eligible users ordered by user id. No groups means nobody is eligible.
    pub fn resolve(groups: &[Group], actor: &Actor) -> Vec<User> {
        let mut eligible: BTreeMap<i64, User> = BTreeMap::new();

        for group in groups {
            let members = group.loaded_members();

            if group.is_managed_by(actor.user_id) {
                for user in members {
                    eligible.insert(user.id, user.clone());
                }
            } else if let Some(me) = members.iter().find(|u| u.id == actor.user_id) {
                eligible.insert(me.id, me.clone());
            } else {
                for user in Self::outsider_view(actor.role, members) {
                    eligible.insert(user.id, user.clone());
                }
            }
        }

        eligible.into_values().collect()
    }

    /// Members an actor with no manager or member standing in a group may assign
    fn outsider_view(role: Role, members: &[User]) -> &[User] {
        match role {
            Role::Admin => members,
            Role::Member => &[],
        }
    }

    /// Eligible assignees for a placed stage of a board
    pub fn eligible_assignees(
        conn: &Connection,
        board_id: i64,
        stage_id: i64,
        actor: &Actor,
    ) -> EngineResult<Vec<User>> {
        if BoardRepo::get_by_id(conn, board_id)?.is_none() {
            return Err(EngineError::not_found("Board", board_id));
        }
        let groups_by_stage = GroupAssignment::groups_for_all_stages(conn, board_id)?;
        let groups = groups_by_stage.get(&stage_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Self::resolve(groups, actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::Fixture;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            username: format!("u{}", id),
            full_name: format!("User {}", id),
            role,
        }
    }

    fn group(id: i64, manager_id: i64, members: Vec<User>) -> Group {
        Group {
            id,
            project_id: 1,
            name: format!("g{}", id),
            description: None,
            manager_id,
            members: Some(members),
        }
    }

    fn ids(users: &[User]) -> Vec<i64> {
        users.iter().map(|u| u.id).collect()
    }

    #[test]
    fn test_manager_gets_all_members() {
        let groups = vec![group(1, 10, vec![user(2, Role::Member), user(3, Role::Member)])];
        let actor = Actor::new(10, "Boss", Role::Member);
        assert_eq!(ids(&Eligibility::resolve(&groups, &actor)), vec![2, 3]);
    }

    #[test]
    fn test_manager_who_is_also_member_gets_all_members() {
        let groups = vec![group(1, 2, vec![user(2, Role::Member), user(3, Role::Member)])];
        let actor = Actor::new(2, "Boss", Role::Member);
        assert_eq!(ids(&Eligibility::resolve(&groups, &actor)), vec![2, 3]);
    }

    #[test]
    fn test_member_gets_only_self() {
        let groups = vec![group(1, 10, vec![user(2, Role::Member), user(3, Role::Member)])];
        let actor = Actor::new(3, "Member", Role::Member);
        assert_eq!(ids(&Eligibility::resolve(&groups, &actor)), vec![3]);
    }

    #[test]
    fn test_admin_gets_union_of_all_groups() {
        let groups = vec![
            group(1, 10, vec![user(2, Role::Member), user(3, Role::Member)]),
            group(2, 11, vec![user(3, Role::Member), user(4, Role::Member)]),
        ];
        let actor = Actor::new(99, "Admin", Role::Admin);
        assert_eq!(ids(&Eligibility::resolve(&groups, &actor)), vec![2, 3, 4]);
    }

    #[test]
    fn test_outsider_gets_nobody() {
        let groups = vec![group(1, 10, vec![user(2, Role::Member)])];
        let actor = Actor::new(99, "Outsider", Role::Member);
        assert!(Eligibility::resolve(&groups, &actor).is_empty());
    }

    #[test]
    fn test_rules_apply_per_group() {
        // Manager of g1, plain member of g2
        let groups = vec![
            group(1, 5, vec![user(2, Role::Member), user(3, Role::Member)]),
            group(2, 10, vec![user(5, Role::Member), user(6, Role::Member)]),
        ];
        let actor = Actor::new(5, "Lead", Role::Member);
        assert_eq!(ids(&Eligibility::resolve(&groups, &actor)), vec![2, 3, 5]);
    }

    #[test]
    fn test_no_groups_means_nobody() {
        let actor = Actor::new(1, "Admin", Role::Admin);
        assert!(Eligibility::resolve(&[], &actor).is_empty());
    }

    #[test]
    fn test_eligible_assignees_for_stage() {
        let fx = Fixture::new();
        let manager = fx.user("m", "Manager", Role::Member);
        let alice = fx.user("alice", "Alice", Role::Member);
        let bob = fx.user("bob", "Bob", Role::Member);
        let dev = fx.group("Dev", &manager, &[&alice, &bob]);
        let todo = fx.stage("Todo", &[&dev]);
        let empty = fx.stage("Empty", &[]);

        let eligible = Eligibility::eligible_assignees(&fx.conn, fx.board_id, todo, &Fixture::actor(&manager)).unwrap();
        assert_eq!(ids(&eligible), vec![alice.id, bob.id]);

        let eligible = Eligibility::eligible_assignees(&fx.conn, fx.board_id, todo, &Fixture::actor(&bob)).unwrap();
        assert_eq!(ids(&eligible), vec![bob.id]);

        let eligible = Eligibility::eligible_assignees(&fx.conn, fx.board_id, empty, &Fixture::actor(&manager)).unwrap();
        assert!(eligible.is_empty());

        let eligible = Eligibility::eligible_assignees(&fx.conn, fx.board_id, 999, &Fixture::actor(&manager)).unwrap();
        assert!(eligible.is_empty());
    }
}
