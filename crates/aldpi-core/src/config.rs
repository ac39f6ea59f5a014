//! Engine configuration
//!
//! Defaults reproduce the published watchlist bands and scoring weights.
//! A TOML file and `ALDPI_*` environment variables may override them; the
//! result is checked with [`EngineConfig::validate`] before use.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::model::RiskBands;
use crate::scoring::ScoringWeights;

/// Normalizer behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Read offset-less timestamps as UTC instead of rejecting them
    pub accept_naive_timestamps: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            accept_naive_timestamps: true,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bands: RiskBands,
    pub normalizer: NormalizerConfig,
    pub scoring: ScoringWeights,
}

impl EngineConfig {
    /// Create a new config builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by process environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `ALDPI_*` overrides from an arbitrary lookup
    ///
    /// Values that fail to parse leave the current setting untouched.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str, current: f64| -> f64 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(current)
        };

        self.bands.critical = number("ALDPI_BAND_CRITICAL", self.bands.critical);
        self.bands.high = number("ALDPI_BAND_HIGH", self.bands.high);
        self.bands.medium_high = number("ALDPI_BAND_MEDIUM_HIGH", self.bands.medium_high);
        self.bands.medium = number("ALDPI_BAND_MEDIUM", self.bands.medium);

        self.scoring.backlog = number("ALDPI_WEIGHT_BACKLOG", self.scoring.backlog);
        self.scoring.delay = number("ALDPI_WEIGHT_DELAY", self.scoring.delay);
        self.scoring.capacity = number("ALDPI_WEIGHT_CAPACITY", self.scoring.capacity);
        self.scoring.volatility = number("ALDPI_WEIGHT_VOLATILITY", self.scoring.volatility);

        if let Some(flag) = lookup("ALDPI_ACCEPT_NAIVE_TIMESTAMPS").and_then(|v| v.trim().parse().ok()) {
            self.normalizer.accept_naive_timestamps = flag;
        }
        self
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        self.bands.validate()?;
        self.scoring.validate()?;
        Ok(())
    }
}

/// Builder for EngineConfig
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Replace the risk band table
    pub fn bands(mut self, bands: RiskBands) -> Self {
        self.config.bands = bands;
        self
    }

    /// Replace the composite score weights
    pub fn scoring(mut self, weights: ScoringWeights) -> Self {
        self.config.scoring = weights;
        self
    }

    /// Accept or reject timestamps without an offset
    pub fn accept_naive_timestamps(mut self, accept: bool) -> Self {
        self.config.normalizer.accept_naive_timestamps = accept;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
