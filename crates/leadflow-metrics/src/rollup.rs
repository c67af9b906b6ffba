//! Scope summaries and leaderboards

use crate::funnel::{closed_fyc, proposed_fyc, Funnel, OutcomeCounts};
use leadflow_model::{Group, Prospect, User};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Metrics for one prospect set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    /// Stage counts
    pub funnel: Funnel,
    /// Outcome counts
    pub outcomes: OutcomeCounts,
    /// Total of successful product lines
    pub closed_fyc: Decimal,
    /// Total of keep-in-view product lines
    pub proposed_fyc: Decimal,
    /// Percent, 0 when nothing is decided
    pub conversion_rate: f64,
}

impl PipelineSummary {
    /// Summarize `prospects`
    #[must_use]
    pub fn compute(prospects: &[Prospect]) -> Self {
        let outcomes = OutcomeCounts::compute(prospects);
        Self {
            funnel: Funnel::compute(prospects),
            conversion_rate: outcomes.conversion_rate(),
            outcomes,
            closed_fyc: closed_fyc(prospects),
            proposed_fyc: proposed_fyc(prospects),
        }
    }
}

/// What a leaderboard row is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A single agent
    Agent,
    /// A group of agents
    Group,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRollup {
    /// Agent or group
    pub kind: EntityKind,
    /// User or group id
    pub id: String,
    /// Display name
    pub name: String,
    /// Metrics over the entity's prospects
    pub summary: PipelineSummary,
}

/// Closed FYC descending, then name ascending
fn leaderboard_order(a: &EntityRollup, b: &EntityRollup) -> Ordering {
    b.summary
        .closed_fyc
        .cmp(&a.summary.closed_fyc)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Per-agent rollup over records each agent owns
#[must_use]
pub fn leaderboard_agents(agents: &[User], prospects: &[Prospect]) -> Vec<EntityRollup> {
    let mut rows: Vec<EntityRollup> = agents
        .iter()
        .map(|agent| {
            let owned: Vec<Prospect> = prospects
                .iter()
                .filter(|p| p.uid == agent.id)
                .cloned()
                .collect();
            EntityRollup {
                kind: EntityKind::Agent,
                id: agent.id.to_string(),
                name: agent.name.clone(),
                summary: PipelineSummary::compute(&owned),
            }
        })
        .collect();
    rows.sort_by(leaderboard_order);
    rows
}

/// Per-group rollup over records attributed to each group
#[must_use]
pub fn leaderboard_groups(groups: &[Group], prospects: &[Prospect]) -> Vec<EntityRollup> {
    let mut rows: Vec<EntityRollup> = groups
        .iter()
        .map(|group| {
            let attributed: Vec<Prospect> = prospects
                .iter()
                .filter(|p| p.group_id.as_ref() == Some(&group.id))
                .cloned()
                .collect();
            EntityRollup {
                kind: EntityKind::Group,
                id: group.id.to_string(),
                name: group.name.clone(),
                summary: PipelineSummary::compute(&attributed),
            }
        })
        .collect();
    rows.sort_by(leaderboard_order);
    rows
}
