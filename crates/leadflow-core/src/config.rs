//! Pipeline configuration

use crate::error::PipelineError;
use leadflow_model::{BadgeTier, PhoneNumber, DEFAULT_PRODUCT_CATALOG};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cached list lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Maximum cached lists
    pub cache_capacity: u64,
    /// Country prefix for phone numbers
    pub phone_prefix: String,
    /// Product names offered by the outcome step
    pub product_catalog: Vec<String>,
    /// Badge tiers, ascending by threshold
    pub badge_tiers: Vec<BadgeTier>,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cache TTL
    #[inline]
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    /// With cache capacity
    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// With phone prefix
    #[inline]
    #[must_use]
    pub fn with_phone_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.phone_prefix = prefix.into();
        self
    }

    /// With badge tiers
    #[inline]
    #[must_use]
    pub fn with_badge_tiers(mut self, tiers: Vec<BadgeTier>) -> Self {
        self.badge_tiers = tiers;
        self
    }

    /// Cache TTL as a duration
    #[inline]
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Parse a TOML document; missing keys keep their defaults
    ///
    /// # Errors
    /// `PipelineError::Config` on malformed TOML or unordered badge tiers
    pub fn from_toml_str(raw: &str) -> Result<Self, PipelineError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `PipelineError::Config` when the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// `PipelineError::Config` describing the first violation
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.phone_prefix.trim().is_empty() {
            return Err(PipelineError::Config("phone_prefix must not be empty".to_string()));
        }
        BadgeTier::ensure_ascending(&self.badge_tiers)
            .map_err(|e| PipelineError::Config(e.to_string()))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            cache_capacity: 1_000,
            phone_prefix: PhoneNumber::DEFAULT_PREFIX.to_string(),
            product_catalog: DEFAULT_PRODUCT_CATALOG
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            badge_tiers: vec![
                BadgeTier::new("Rookie", 0),
                BadgeTier::new("Rising Star", 1_000),
                BadgeTier::new("Bronze", 3_000),
                BadgeTier::new("Silver", 6_000),
                BadgeTier::new("Gold", 10_000),
            ],
        }
    }
}
