//! Events and announcements

use crate::ids::{EventId, GroupId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Announcement or meeting targeted at a set of groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Backend id
    pub id: EventId,
    /// Headline
    pub title: String,
    /// Body text
    #[serde(default)]
    pub description: String,
    /// Author
    pub created_by: UserId,
    /// Groups the event is shown to
    #[serde(default)]
    pub target_group_ids: Vec<GroupId>,
    /// Start time, when scheduled
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
}

impl Event {
    /// New event with no targets
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<EventId>, title: impl Into<String>, created_by: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            created_by: created_by.into(),
            target_group_ids: Vec::new(),
            starts_at: None,
        }
    }

    /// Targeting `groups`
    #[inline]
    #[must_use]
    pub fn targeting(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.target_group_ids = groups.into_iter().collect();
        self
    }

    /// Whether `group_id` is targeted
    #[inline]
    #[must_use]
    pub fn targets(&self, group_id: &GroupId) -> bool {
        self.target_group_ids.contains(group_id)
    }
}
