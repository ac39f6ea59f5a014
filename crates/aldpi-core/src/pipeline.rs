//! Configured entry point composing the normalizer and the ranking engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::aggregation::aggregate_districts;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::normalizer::{NormalizationResult, Normalizer};
use crate::ranking::{DistrictRanking, RankingEngine, SignalFilter, SignalSelection};
use crate::scorecard::{score_districts_with, ScoreReport};

/// Telemetry-to-watchlist outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchlistReport {
    pub normalization: NormalizationResult,
    pub ranking: DistrictRanking,
}

/// Normalizer and ranking engine sharing one configuration
#[derive(Debug, Clone, Default)]
pub struct DecisionPipeline {
    config: EngineConfig,
    normalizer: Normalizer,
    ranking: RankingEngine,
}

impl DecisionPipeline {
    /// Build a pipeline after validating the configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: Normalizer::new(config.normalizer.clone()),
            ranking: RankingEngine::new(config.bands),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn ranking(&self) -> &RankingEngine {
        &self.ranking
    }

    pub fn normalize_value(&self, batch: &serde_json::Value) -> Result<NormalizationResult> {
        self.normalizer.normalize_value(batch)
    }

    pub fn rank_value(&self, batch: &serde_json::Value) -> Result<DistrictRanking> {
        self.ranking.rank_value(batch)
    }

    pub fn select_value(&self, batch: &serde_json::Value, filter: &SignalFilter) -> Result<SignalSelection> {
        self.ranking.select_value(batch, filter)
    }

    /// Score raw district ratios with the configured weights and bands
    pub fn score_value(&self, batch: &serde_json::Value) -> Result<ScoreReport> {
        score_districts_with(batch, &self.config.scoring, &self.ranking)
    }

    /// Normalize raw telemetry, keep each district's latest reading, rank
    pub fn watchlist_value(
        &self,
        batch: &serde_json::Value,
        names: &HashMap<String, String>,
    ) -> Result<WatchlistReport> {
        let normalization = self.normalizer.normalize_value(batch)?;
        let entries = aggregate_districts(&normalization.accepted_points, names, &self.config.bands);
        let ranking = self.ranking.rank(entries);
        Ok(WatchlistReport {
            normalization,
            ranking,
        })
    }
}
