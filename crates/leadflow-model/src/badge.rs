//! Badge tiers

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Reward level reached at `threshold` points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeTier {
    /// Display name
    pub name: String,
    /// Points needed to reach this tier
    pub threshold: u64,
    /// Presentation color, e.g. `#cd7f32`
    #[serde(default)]
    pub color: String,
}

impl BadgeTier {
    /// New tier without a color
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, threshold: u64) -> Self {
        Self {
            name: name.into(),
            threshold,
            color: String::new(),
        }
    }

    /// With color
    #[inline]
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Check that `tiers` is ascending by threshold
    ///
    /// # Errors
    /// `ModelError::UnorderedTiers` on the first out-of-order pair
    pub fn ensure_ascending(tiers: &[BadgeTier]) -> Result<(), ModelError> {
        if tiers.windows(2).all(|w| w[0].threshold <= w[1].threshold) {
            Ok(())
        } else {
            Err(ModelError::UnorderedTiers)
        }
    }
}
