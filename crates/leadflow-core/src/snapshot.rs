//! Offline reports from a JSON export
//!
//! The export's prospect and event lists go through the same ingestion
//! boundary as live API responses.

use crate::error::PipelineError;
use crate::ingest;
use leadflow_metrics::{leaderboard_agents, leaderboard_groups, EntityRollup, PipelineSummary};
use leadflow_model::{Event, Group, Prospect, Role, User, UserId};
use leadflow_scope::{resolve, visible_events};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default)]
    prospects: Value,
    #[serde(default)]
    events: Value,
}

/// Users, groups, prospects and events loaded from an export
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Every user
    pub users: Vec<User>,
    /// Every group
    pub groups: Vec<Group>,
    /// Every prospect that ingested cleanly
    pub prospects: Vec<Prospect>,
    /// Every event
    pub events: Vec<Event>,
}

/// Scoped view of a snapshot for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedReport {
    /// Viewing user
    pub user_id: UserId,
    /// Viewer's role
    pub role: Role,
    /// Prospects in the viewer's list scope
    pub visible_prospects: usize,
    /// Metrics over the visible prospects
    pub summary: PipelineSummary,
    /// Agent leaderboard; empty for roles without one
    pub agents: Vec<EntityRollup>,
    /// Group leaderboard; empty for roles without one
    pub groups: Vec<EntityRollup>,
    /// Events shown to the viewer
    pub visible_events: usize,
}

impl Snapshot {
    /// Parse an export document
    ///
    /// # Errors
    /// `PipelineError::Ingest` when the document or a list envelope is malformed
    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        let file: SnapshotFile = serde_json::from_str(raw).map_err(ingest_err)?;
        Ok(Self {
            users: file.users,
            groups: file.groups,
            prospects: if file.prospects.is_null() {
                Vec::new()
            } else {
                ingest::prospects(file.prospects)?
            },
            events: if file.events.is_null() {
                Vec::new()
            } else {
                ingest::events(file.events)?
            },
        })
    }

    /// Look up a user
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.iter().find(|u| &u.id == id)
    }

    /// Report what `user_id` would see; `None` for an unknown user
    #[must_use]
    pub fn report_for(&self, user_id: &UserId) -> Option<ScopedReport> {
        let user = self.user(user_id)?;
        let visible = resolve(user, &self.prospects);
        let agents: Vec<User> = self
            .users
            .iter()
            .filter(|u| matches!(u.role, Role::Agent | Role::GroupLeader))
            .cloned()
            .collect();
        Some(ScopedReport {
            user_id: user.id.clone(),
            role: user.role,
            visible_prospects: visible.len(),
            summary: PipelineSummary::compute(&visible),
            agents: leaderboard_agents(&agents, &visible),
            groups: leaderboard_groups(&self.groups, &visible),
            visible_events: visible_events(user, &self.events).len(),
        })
    }
}

fn ingest_err(e: serde_json::Error) -> PipelineError {
    PipelineError::Ingest(e.into())
}
