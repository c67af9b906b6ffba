//! Leadflow Aggregation Engine
//!
//! Pure functions over an already-scoped prospect set.
//!
//! # Metrics
//!
//! - **Funnel**: prospects, appointments, sales meetings, sales
//! - **FYC**: closed (successful only) and proposed (all lines)
//! - **Conversion**: successful over decided, KIV excluded
//! - **Leaderboards**: per agent and per group, closed FYC descending
//! - **Badges**: tier reached and progress toward the next

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod badge;
pub mod funnel;
pub mod rollup;

pub use badge::BadgeProgress;
pub use funnel::{closed_fyc, conversion_rate, proposed_fyc, Funnel, OutcomeCounts};
pub use rollup::{leaderboard_agents, leaderboard_groups, EntityKind, EntityRollup, PipelineSummary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
