//! Points tier lookup

use leadflow_model::BadgeTier;
use serde::{Deserialize, Serialize};

/// Where a points total sits among the tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeProgress {
    /// Points being placed
    pub points: u64,
    /// Highest tier reached, `None` below the first threshold
    pub current: Option<BadgeTier>,
    /// Next tier to reach, `None` at max rank
    pub next: Option<BadgeTier>,
    /// Percent toward `next`, clamped to `[0, 100]`
    pub percent: f64,
}

impl BadgeProgress {
    /// Look up `points` in `tiers`
    ///
    /// `tiers` must be ascending by threshold. Below the first tier, progress
    /// is measured from zero.
    #[must_use]
    pub fn lookup(points: u64, tiers: &[BadgeTier]) -> Self {
        let reached = tiers.partition_point(|t| t.threshold <= points);
        let current = reached.checked_sub(1).map(|i| tiers[i].clone());
        let next = tiers.get(reached).cloned();

        let percent = match &next {
            None => 100.0,
            Some(next) => {
                let floor = current.as_ref().map_or(0, |c| c.threshold);
                let span = next.threshold.saturating_sub(floor);
                if span == 0 {
                    100.0
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let raw = points.saturating_sub(floor) as f64 / span as f64 * 100.0;
                    raw.clamp(0.0, 100.0)
                }
            }
        };

        Self {
            points,
            current,
            next,
            percent,
        }
    }

    /// No tier above the current one
    #[inline]
    #[must_use]
    pub fn is_max_rank(&self) -> bool {
        self.next.is_none()
    }
}
