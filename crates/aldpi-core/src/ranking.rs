//! Signal & risk ranking engine
//!
//! Both operations produce a total order that depends only on record
//! content: districts by LFI descending then id ascending, signals by
//! severity, then metric value descending, then id ascending. Records that
//! break an invariant are dropped and counted, never passed through.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::error::{RecordRejection, RejectionReason, Result};
use crate::model::telemetry::check_lfi;
use crate::model::{DecisionSignal, DistrictRiskEntry, RiskBands, RiskCategory, Severity, SignalCandidate, SignalType};
use crate::normalizer::batch_elements;

/// Ranked district watchlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictRanking {
    /// Entries in watchlist order
    pub entries: Vec<DistrictRiskEntry>,
    pub rejected_count: usize,
    #[serde(default)]
    pub rejections: Vec<RecordRejection>,
    /// Number of ranked entries per risk category
    #[serde(default)]
    pub by_category: BTreeMap<RiskCategory, usize>,
}

/// Post-validation restrictions on the signal feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalFilter {
    /// Keep only signals at or above this severity
    pub min_severity: Option<Severity>,
    /// Keep only signals of this type
    pub signal_type: Option<SignalType>,
    /// Keep at most this many signals, after ordering
    pub limit: Option<usize>,
}

impl SignalFilter {
    fn admits(&self, signal: &DecisionSignal) -> bool {
        self.min_severity.map_or(true, |min| signal.severity >= min)
            && self.signal_type.map_or(true, |t| signal.signal_type == t)
    }
}

/// Ordered signal feed with validation accounting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSelection {
    /// Valid signals in feed order
    pub signals: Vec<DecisionSignal>,
    /// Candidates that failed validation
    pub dropped_count: usize,
    /// Valid signals removed by a [`SignalFilter`]
    #[serde(default)]
    pub filtered_count: usize,
    #[serde(default)]
    pub rejections: Vec<RecordRejection>,
    #[serde(default)]
    pub by_severity: BTreeMap<Severity, usize>,
    #[serde(default)]
    pub by_type: BTreeMap<SignalType, usize>,
}

impl SignalSelection {
    /// Count of surviving signals with the given severity
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Watchlist order: LFI descending, then id, then name ascending
pub fn district_order(a: &DistrictRiskEntry, b: &DistrictRiskEntry) -> Ordering {
    b.lfi
        .total_cmp(&a.lfi)
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.name.cmp(&b.name))
}

/// Feed order: severity descending, metric value descending, then id
pub fn signal_order(a: &DecisionSignal, b: &DecisionSignal) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.metric_value.total_cmp(&a.metric_value))
        .then_with(|| a.id.cmp(&b.id))
}

/// Ranking engine parameterized by a risk band table
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    bands: RiskBands,
}

impl RankingEngine {
    pub fn new(bands: RiskBands) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &RiskBands {
        &self.bands
    }

    /// Re-derive risk, drop invalid entries and sort the rest
    pub fn rank(&self, entries: Vec<DistrictRiskEntry>) -> DistrictRanking {
        let mut ranking = DistrictRanking::default();

        for (index, entry) in entries.into_iter().enumerate() {
            self.admit_district(&mut ranking, index, entry);
        }

        self.finish_ranking(ranking)
    }

    /// Rank a raw JSON batch of district entries
    pub fn rank_value(&self, batch: &serde_json::Value) -> Result<DistrictRanking> {
        let records = batch_elements(batch, "district")?;
        let mut ranking = DistrictRanking::default();

        for (index, record) in records.iter().enumerate() {
            match DistrictRiskEntry::deserialize(record) {
                Ok(entry) => self.admit_district(&mut ranking, index, entry),
                Err(e) => reject_district(
                    &mut ranking,
                    RecordRejection::new(index, RejectionReason::Unreadable { detail: e.to_string() }),
                ),
            }
        }

        Ok(self.finish_ranking(ranking))
    }

    fn admit_district(&self, ranking: &mut DistrictRanking, index: usize, mut entry: DistrictRiskEntry) {
        if entry.id.trim().is_empty() {
            reject_district(
                ranking,
                RecordRejection::new(index, RejectionReason::MissingField { field: "id".into() }),
            );
            return;
        }
        match check_lfi(entry.lfi) {
            Ok(lfi) => entry.lfi = lfi,
            Err(reason) => {
                reject_district(ranking, RecordRejection::new(index, reason).with_record_id(entry.id));
                return;
            }
        }
        entry.reclassify(&self.bands);
        ranking.entries.push(entry);
    }

    fn finish_ranking(&self, mut ranking: DistrictRanking) -> DistrictRanking {
        ranking.entries.sort_by(district_order);
        for entry in &ranking.entries {
            *ranking.by_category.entry(entry.risk()).or_insert(0) += 1;
        }
        info!(
            ranked = ranking.entries.len(),
            rejected = ranking.rejected_count,
            "district watchlist ranked"
        );
        ranking
    }

    /// Validate candidates and order the survivors
    pub fn select(&self, candidates: Vec<SignalCandidate>) -> SignalSelection {
        self.select_with(candidates, &SignalFilter::default())
    }

    /// Validate, order, then apply a filter
    pub fn select_with(&self, candidates: Vec<SignalCandidate>, filter: &SignalFilter) -> SignalSelection {
        let mut selection = SignalSelection::default();
        let mut admitted = Vec::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            admit_signal(&mut selection, &mut admitted, index, candidate);
        }

        resolve_duplicates(&mut selection, admitted);
        finish_selection(selection, filter)
    }

    /// Select signals from a raw JSON batch
    pub fn select_value(&self, batch: &serde_json::Value, filter: &SignalFilter) -> Result<SignalSelection> {
        let records = batch_elements(batch, "signal")?;
        let mut selection = SignalSelection::default();
        let mut admitted = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match SignalCandidate::deserialize(record) {
                Ok(candidate) => admit_signal(&mut selection, &mut admitted, index, candidate),
                Err(e) => drop_signal(
                    &mut selection,
                    RecordRejection::new(index, RejectionReason::Unreadable { detail: e.to_string() }),
                ),
            }
        }

        resolve_duplicates(&mut selection, admitted);
        Ok(finish_selection(selection, filter))
    }
}

fn reject_district(ranking: &mut DistrictRanking, rejection: RecordRejection) {
    debug!(index = rejection.index, reason = %rejection.reason, "district entry rejected");
    ranking.rejected_count += 1;
    ranking.rejections.push(rejection);
}

fn drop_signal(selection: &mut SignalSelection, rejection: RecordRejection) {
    debug!(index = rejection.index, reason = %rejection.reason, "signal candidate dropped");
    selection.dropped_count += 1;
    selection.rejections.push(rejection);
}

fn admit_signal(
    selection: &mut SignalSelection,
    admitted: &mut Vec<(usize, DecisionSignal)>,
    index: usize,
    candidate: SignalCandidate,
) {
    let raw_id = candidate.raw_id().unwrap_or_default().to_string();
    match candidate.validate() {
        Ok(signal) => admitted.push((index, signal)),
        Err(reason) => drop_signal(selection, RecordRejection::new(index, reason).with_record_id(raw_id)),
    }
}

/// Keep one signal per id: the one that sorts first, then by content
fn resolve_duplicates(selection: &mut SignalSelection, mut admitted: Vec<(usize, DecisionSignal)>) {
    admitted.sort_by(|(_, a), (_, b)| signal_order(a, b).then_with(|| content_order(a, b)));

    let mut seen = HashSet::new();
    for (index, signal) in admitted {
        if seen.insert(signal.id.clone()) {
            selection.signals.push(signal);
        } else {
            let id = signal.id;
            drop_signal(
                selection,
                RecordRejection::new(index, RejectionReason::DuplicateId { id: id.clone() })
                    .with_record_id(id),
            );
        }
    }
    selection.rejections.sort_by_key(|r| r.index);
}

fn content_order(a: &DecisionSignal, b: &DecisionSignal) -> Ordering {
    a.signal_type
        .cmp(&b.signal_type)
        .then_with(|| a.trend.as_str().cmp(b.trend.as_str()))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.district.cmp(&b.district))
        .then_with(|| a.data_summary.cmp(&b.data_summary))
        .then_with(|| a.why_it_matters.cmp(&b.why_it_matters))
        .then_with(|| a.recommended_action.cmp(&b.recommended_action))
}

fn finish_selection(mut selection: SignalSelection, filter: &SignalFilter) -> SignalSelection {
    selection.signals.sort_by(signal_order);

    let before = selection.signals.len();
    selection.signals.retain(|s| filter.admits(s));
    if let Some(limit) = filter.limit {
        selection.signals.truncate(limit);
    }
    selection.filtered_count = before - selection.signals.len();

    for signal in &selection.signals {
        *selection.by_severity.entry(signal.severity).or_insert(0) += 1;
        *selection.by_type.entry(signal.signal_type).or_insert(0) += 1;
    }

    info!(
        selected = selection.signals.len(),
        dropped = selection.dropped_count,
        filtered = selection.filtered_count,
        "decision signals selected"
    );
    selection
}

/// Rank districts with the standard bands
pub fn rank_districts(entries: Vec<DistrictRiskEntry>) -> Vec<DistrictRiskEntry> {
    RankingEngine::default().rank(entries).entries
}

/// Validate and order signal candidates
pub fn select_signals(candidates: Vec<SignalCandidate>) -> Vec<DecisionSignal> {
    RankingEngine::default().select(candidates).signals
}
