//! Users, roles and group membership

use crate::error::ModelError;
use crate::ids::{GroupId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, configuration
    Admin,
    /// Sees every prospect, coaches trainers
    MasterTrainer,
    /// Sees prospects of the groups they manage
    Trainer,
    /// Leads one group; sees own prospects plus group aggregates
    GroupLeader,
    /// Sees own prospects only
    Agent,
}

impl Role {
    /// Roles whose scope is the whole organization
    #[inline]
    #[must_use]
    pub fn sees_all(&self) -> bool {
        matches!(self, Role::Admin | Role::MasterTrainer)
    }

    /// Roles allowed to edit any prospect
    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Wire label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::MasterTrainer => "master_trainer",
            Role::Trainer => "trainer",
            Role::GroupLeader => "group_leader",
            Role::Agent => "agent",
        }
    }
}

/// An authenticated actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Role deciding what the user sees
    pub role: Role,
    /// Member/leader affiliation
    #[serde(default)]
    pub group_id: Option<GroupId>,
    /// Trainer affiliation
    #[serde(default)]
    pub managed_group_ids: Vec<GroupId>,
}

impl User {
    /// New user without any group affiliation
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            group_id: None,
            managed_group_ids: Vec::new(),
        }
    }

    /// With member group
    #[inline]
    #[must_use]
    pub fn in_group(mut self, group_id: impl Into<GroupId>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// With managed groups
    #[inline]
    #[must_use]
    pub fn managing(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.managed_group_ids = groups.into_iter().collect();
        self
    }

    /// Whether the user belongs to, leads or manages `group_id`
    #[must_use]
    pub fn is_affiliated_with(&self, group_id: &GroupId) -> bool {
        self.group_id.as_ref() == Some(group_id) || self.managed_group_ids.contains(group_id)
    }
}

/// A named collection of users with exactly one leader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Backend id
    pub id: GroupId,
    /// Display name
    pub name: String,
    /// The one group leader
    pub leader_id: UserId,
    /// Trainers managing the group
    #[serde(default)]
    pub trainer_ids: Vec<UserId>,
    /// Agent members
    #[serde(default)]
    pub member_ids: Vec<UserId>,
}

impl Group {
    /// New group led by `leader_id`
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>, leader_id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            leader_id: leader_id.into(),
            trainer_ids: Vec::new(),
            member_ids: Vec::new(),
        }
    }

    /// Whether `user_id` is a member agent
    #[inline]
    #[must_use]
    pub fn has_member(&self, user_id: &UserId) -> bool {
        self.member_ids.contains(user_id)
    }
}

/// Users and groups with membership kept consistent
///
/// A user is a member of at most one group; moving a member detaches it from
/// the old group. Trainers may manage any number of groups.
#[derive(Debug, Clone, Default)]
pub struct GroupRoster {
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
}

impl GroupRoster {
    /// Empty roster
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user
    pub fn upsert_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Insert a group and affiliate its leader with it
    ///
    /// # Errors
    /// - `ModelError::UnknownUser` if the leader is not in the roster
    /// - `ModelError::AlreadyLeading` if the leader leads another group
    pub fn add_group(&mut self, group: Group) -> Result<(), ModelError> {
        let leader = group.leader_id.clone();
        let id = group.id.clone();
        self.ensure_not_leading_elsewhere(&leader, &id)?;
        if !self.users.contains_key(&leader) {
            return Err(ModelError::UnknownUser(leader));
        }
        self.groups.insert(id.clone(), group);
        self.move_user(&leader, &id);
        Ok(())
    }

    /// Make `user_id` a member of `group_id`, leaving any previous group
    ///
    /// # Errors
    /// `UnknownUser` / `UnknownGroup` if either side is missing
    pub fn assign_member(&mut self, user_id: &UserId, group_id: &GroupId) -> Result<(), ModelError> {
        self.check_known(user_id, group_id)?;
        self.move_user(user_id, group_id);
        if let Some(group) = self.groups.get_mut(group_id) {
            if group.leader_id != *user_id && !group.has_member(user_id) {
                group.member_ids.push(user_id.clone());
            }
        }
        Ok(())
    }

    /// Replace the leader of `group_id`
    ///
    /// # Errors
    /// `UnknownUser` / `UnknownGroup`, or `AlreadyLeading` when the user leads
    /// a different group
    pub fn set_leader(&mut self, user_id: &UserId, group_id: &GroupId) -> Result<(), ModelError> {
        self.check_known(user_id, group_id)?;
        self.ensure_not_leading_elsewhere(user_id, group_id)?;
        self.move_user(user_id, group_id);
        if let Some(group) = self.groups.get_mut(group_id) {
            group.member_ids.retain(|m| m != user_id);
            group.leader_id = user_id.clone();
        }
        Ok(())
    }

    /// Add a trainer to `group_id`
    ///
    /// # Errors
    /// `UnknownUser` / `UnknownGroup`
    pub fn add_trainer(&mut self, user_id: &UserId, group_id: &GroupId) -> Result<(), ModelError> {
        self.check_known(user_id, group_id)?;
        if let Some(group) = self.groups.get_mut(group_id) {
            if !group.trainer_ids.contains(user_id) {
                group.trainer_ids.push(user_id.clone());
            }
        }
        if let Some(user) = self.users.get_mut(user_id) {
            if !user.managed_group_ids.contains(group_id) {
                user.managed_group_ids.push(group_id.clone());
            }
        }
        Ok(())
    }

    /// Look up a user
    #[inline]
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    /// Look up a group
    #[inline]
    #[must_use]
    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    /// All users, ordered by id
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// All groups, ordered by id
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    fn check_known(&self, user_id: &UserId, group_id: &GroupId) -> Result<(), ModelError> {
        if !self.users.contains_key(user_id) {
            return Err(ModelError::UnknownUser(user_id.clone()));
        }
        if !self.groups.contains_key(group_id) {
            return Err(ModelError::UnknownGroup(group_id.clone()));
        }
        Ok(())
    }

    fn ensure_not_leading_elsewhere(
        &self,
        user_id: &UserId,
        group_id: &GroupId,
    ) -> Result<(), ModelError> {
        match self
            .groups
            .values()
            .find(|g| g.leader_id == *user_id && g.id != *group_id)
        {
            Some(other) => Err(ModelError::AlreadyLeading {
                user: user_id.clone(),
                group: other.id.clone(),
            }),
            None => Ok(()),
        }
    }

    fn move_user(&mut self, user_id: &UserId, group_id: &GroupId) {
        for group in self.groups.values_mut() {
            if group.id != *group_id {
                group.member_ids.retain(|m| m != user_id);
            }
        }
        if let Some(user) = self.users.get_mut(user_id) {
            user.group_id = Some(group_id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> GroupRoster {
        let mut roster = GroupRoster::new();
        roster.upsert_user(User::new("lead-1", "Lead One", Role::GroupLeader));
        roster.upsert_user(User::new("lead-2", "Lead Two", Role::GroupLeader));
        roster.upsert_user(User::new("agent-a", "Agent A", Role::Agent));
        roster.upsert_user(User::new("trainer-t", "Trainer T", Role::Trainer));
        roster.add_group(Group::new("g1", "Alpha", "lead-1")).unwrap();
        roster.add_group(Group::new("g2", "Beta", "lead-2")).unwrap();
        roster
    }

    #[test]
    fn reassigning_member_leaves_old_group() {
        let mut roster = roster();
        let agent = UserId::from("agent-a");

        roster.assign_member(&agent, &GroupId::from("g1")).unwrap();
        roster.assign_member(&agent, &GroupId::from("g2")).unwrap();

        assert!(!roster.group(&GroupId::from("g1")).unwrap().has_member(&agent));
        assert!(roster.group(&GroupId::from("g2")).unwrap().has_member(&agent));
        assert_eq!(
            roster.user(&agent).unwrap().group_id,
            Some(GroupId::from("g2"))
        );
    }

    #[test]
    fn leader_cannot_lead_two_groups() {
        let mut roster = roster();
        let err = roster
            .set_leader(&UserId::from("lead-1"), &GroupId::from("g2"))
            .unwrap_err();
        assert!(matches!(err, ModelError::AlreadyLeading { .. }));
    }

    #[test]
    fn trainer_managed_groups_stay_in_sync() {
        let mut roster = roster();
        let trainer = UserId::from("trainer-t");
        roster.add_trainer(&trainer, &GroupId::from("g1")).unwrap();
        roster.add_trainer(&trainer, &GroupId::from("g2")).unwrap();
        roster.add_trainer(&trainer, &GroupId::from("g2")).unwrap();

        let user = roster.user(&trainer).unwrap();
        assert_eq!(user.managed_group_ids.len(), 2);
        assert!(user.is_affiliated_with(&GroupId::from("g1")));
    }

    #[test]
    fn unknown_group_rejected() {
        let mut roster = roster();
        let err = roster
            .assign_member(&UserId::from("agent-a"), &GroupId::from("nope"))
            .unwrap_err();
        assert_eq!(err, ModelError::UnknownGroup(GroupId::from("nope")));
    }

    #[test]
    fn role_scope_flags() {
        assert!(Role::Admin.sees_all());
        assert!(Role::MasterTrainer.sees_all());
        assert!(!Role::Trainer.sees_all());
        assert!(Role::Admin.is_admin());
        assert!(!Role::MasterTrainer.is_admin());
    }
}
