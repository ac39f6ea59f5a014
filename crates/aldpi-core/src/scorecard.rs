//! District scorecards from raw operational ratios
//!
//! Each record carries a district id, an optional display name and the four
//! [`LfiMetrics`] ratios. Valid records are scored with the composite
//! weights, ranked like the watchlist and given a policy tier; invalid ones
//! are rejected and counted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{RecordRejection, RejectionReason, Result};
use crate::model::{DistrictRiskEntry, RiskCategory};
use crate::normalizer::batch_elements;
use crate::ranking::RankingEngine;
use crate::scoring::{composite_score, LfiMetrics, PolicyTier, ScoringWeights};

/// Composite score of one district
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub id: String,
    pub name: String,
    pub score: f64,
    pub risk: RiskCategory,
    pub tier: PolicyTier,
    pub recommended_action: String,
}

/// Scored districts in watchlist order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub rows: Vec<ScoreRow>,
    pub rejected_count: usize,
    #[serde(default)]
    pub rejections: Vec<RecordRejection>,
    #[serde(default)]
    pub by_category: BTreeMap<RiskCategory, usize>,
}

#[derive(Debug, Deserialize)]
struct MetricsRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    metrics: LfiMetrics,
}

/// Score a raw JSON batch with the default weights and bands
pub fn score_districts(batch: &serde_json::Value) -> Result<ScoreReport> {
    score_districts_with(batch, &ScoringWeights::default(), &RankingEngine::default())
}

/// Score a raw JSON batch with explicit weights and band table
pub fn score_districts_with(
    batch: &serde_json::Value,
    weights: &ScoringWeights,
    ranking: &RankingEngine,
) -> Result<ScoreReport> {
    let records = batch_elements(batch, "district metrics")?;
    let mut rejections = Vec::new();
    let mut entries = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        match admit_record(record) {
            Ok(input) => {
                let score = composite_score(&input.metrics, weights);
                let name = input.name.unwrap_or_else(|| input.id.clone());
                entries.push(DistrictRiskEntry::with_bands(input.id, name, score, ranking.bands()));
            }
            Err(reason) => {
                let mut rejection = RecordRejection::new(index, reason);
                if let Some(id) = record.get("id").and_then(|v| v.as_str()) {
                    rejection = rejection.with_record_id(id);
                }
                debug!(index, reason = %rejection.reason, "district metrics rejected");
                rejections.push(rejection);
            }
        }
    }

    // composite scores are clamped and ids checked, so ranking rejects nothing
    let ranked = ranking.rank(entries);
    let rows: Vec<ScoreRow> = ranked.entries.iter().map(score_row).collect();

    info!(scored = rows.len(), rejected = rejections.len(), "district metrics scored");
    Ok(ScoreReport {
        rows,
        rejected_count: rejections.len(),
        rejections,
        by_category: ranked.by_category,
    })
}

fn admit_record(record: &serde_json::Value) -> std::result::Result<MetricsRecord, RejectionReason> {
    let input = MetricsRecord::deserialize(record).map_err(|e| RejectionReason::Unreadable {
        detail: e.to_string(),
    })?;
    if input.id.trim().is_empty() {
        return Err(RejectionReason::MissingField { field: "id".into() });
    }
    input.metrics.validate()?;
    Ok(input)
}

fn score_row(entry: &DistrictRiskEntry) -> ScoreRow {
    let tier = PolicyTier::for_lfi(entry.lfi);
    ScoreRow {
        id: entry.id.clone(),
        name: entry.name.clone(),
        score: entry.lfi,
        risk: entry.risk(),
        tier,
        recommended_action: tier.recommended_action().to_string(),
    }
}
