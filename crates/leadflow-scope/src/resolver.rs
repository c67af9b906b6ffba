//! Prospect visibility by role

use leadflow_model::{GroupId, Prospect, Role, User};
use serde::{Deserialize, Serialize};

/// Which list endpoint backs a role's prospect view
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "group_id")]
pub enum ListScope {
    /// Records owned by the caller
    Mine,
    /// Records of every group the caller manages
    ManagedGroups,
    /// Every record
    All,
    /// One group's records, for aggregate views
    Group(GroupId),
}

impl ListScope {
    /// Cache tag suffix for this scope
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            ListScope::Mine => "mine".to_string(),
            ListScope::ManagedGroups => "managed".to_string(),
            ListScope::All => "all".to_string(),
            ListScope::Group(id) => format!("group:{id}"),
        }
    }
}

/// List scope used for `role`'s own prospect view
#[must_use]
pub fn list_scope_for(role: Role) -> ListScope {
    match role {
        Role::Admin | Role::MasterTrainer => ListScope::All,
        Role::Trainer => ListScope::ManagedGroups,
        Role::GroupLeader | Role::Agent => ListScope::Mine,
    }
}

/// Whether `user` may see `prospect` through the per-owner path
///
/// Trainers with no managed groups see nothing.
#[must_use]
pub fn is_visible(user: &User, prospect: &Prospect) -> bool {
    match user.role {
        Role::Admin | Role::MasterTrainer => true,
        Role::Trainer => prospect
            .group_id
            .as_ref()
            .is_some_and(|g| user.managed_group_ids.contains(g)),
        Role::GroupLeader | Role::Agent => prospect.uid == user.id,
    }
}

/// Filter `prospects` down to what `user` may see
#[must_use]
pub fn resolve(user: &User, prospects: &[Prospect]) -> Vec<Prospect> {
    if user.role == Role::Trainer && user.managed_group_ids.is_empty() {
        tracing::debug!(user_id = %user.id, "trainer manages no groups; scope is empty");
        return Vec::new();
    }
    let visible: Vec<Prospect> = prospects
        .iter()
        .filter(|p| is_visible(user, p))
        .cloned()
        .collect();
    tracing::debug!(
        user_id = %user.id,
        role = user.role.as_str(),
        total = prospects.len(),
        visible = visible.len(),
        "resolved prospect scope"
    );
    visible
}

/// Prospects attributed to `group_id`, independent of ownership
#[must_use]
pub fn resolve_by_group(group_id: &GroupId, prospects: &[Prospect]) -> Vec<Prospect> {
    prospects
        .iter()
        .filter(|p| p.group_id.as_ref() == Some(group_id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_model::{Contact, PhoneNumber};
    use pretty_assertions::assert_eq;

    fn prospect(id: &str, uid: &str, group: &str) -> Prospect {
        Prospect::new(
            id.into(),
            uid.into(),
            Contact::new("Someone", PhoneNumber::from_suffix("1").unwrap()),
        )
        .with_group(group.into())
    }

    fn pool() -> Vec<Prospect> {
        vec![
            prospect("p1", "a1", "g1"),
            prospect("p2", "a2", "g1"),
            prospect("p3", "a3", "g2"),
        ]
    }

    fn ids(prospects: &[Prospect]) -> Vec<&str> {
        prospects.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn admin_and_master_trainer_see_everything() {
        for role in [Role::Admin, Role::MasterTrainer] {
            let user = User::new("u", "U", role);
            assert_eq!(resolve(&user, &pool()).len(), 3);
        }
    }

    #[test]
    fn trainer_sees_managed_groups() {
        let trainer = User::new("t", "T", Role::Trainer).managing(vec!["g2".into()]);
        assert_eq!(ids(&resolve(&trainer, &pool())), vec!["p3"]);
    }

    #[test]
    fn trainer_without_groups_sees_nothing() {
        let trainer = User::new("t", "T", Role::Trainer);
        assert!(resolve(&trainer, &pool()).is_empty());
    }

    #[test]
    fn leader_sees_only_own_records() {
        let leader = User::new("a1", "Leader", Role::GroupLeader).in_group("g1");
        assert_eq!(ids(&resolve(&leader, &pool())), vec!["p1"]);
    }

    #[test]
    fn by_group_ignores_ownership() {
        assert_eq!(ids(&resolve_by_group(&"g1".into(), &pool())), vec!["p1", "p2"]);
    }

    #[test]
    fn list_scope_per_role() {
        assert_eq!(list_scope_for(Role::Agent), ListScope::Mine);
        assert_eq!(list_scope_for(Role::Trainer), ListScope::ManagedGroups);
        assert_eq!(list_scope_for(Role::MasterTrainer), ListScope::All);
        assert_eq!(ListScope::Group("g1".into()).tag(), "group:g1");
    }
}
