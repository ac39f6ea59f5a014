//! ALDPI decision core
//!
//! The data model and ranking contract behind the district watchlist and the
//! decision-signal feed.
//!
//! ## Components
//!
//! - **Telemetry Normalizer** (`normalizer`): validates per-district readings
//!   one by one and strips every field except the district key, the LFI and
//!   the timestamp.
//! - **Ranking Engine** (`ranking`): derives risk categories from LFI, orders
//!   the watchlist, and validates and orders decision signals.
//! - **Scoring** (`scoring`): composite risk score and what-if projections.
//! - **Scorecards** (`scorecard`): scores a batch of district ratios and
//!   ranks the result with a policy tier per district.
//!
//! Every operation is a pure function of its input. A record that breaks an
//! invariant is excluded and counted; only a batch that is not a sequence at
//! all produces an error.
//!
//! ## Example
//!
//! ```rust
//! use aldpi_core::{rank_districts, DistrictRiskEntry, RiskCategory};
//!
//! let ranked = rank_districts(vec![
//!     DistrictRiskEntry::new("d1", "Bellary", 0.85),
//!     DistrictRiskEntry::new("d3", "Pune", 0.72),
//!     DistrictRiskEntry::new("d11", "Gaya", 0.88),
//! ]);
//!
//! assert_eq!(ranked[0].id, "d11");
//! assert_eq!(ranked[2].risk(), RiskCategory::High);
//! ```

pub mod aggregation;
pub mod config;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod ranking;
pub mod scorecard;
pub mod scoring;

pub use aggregation::aggregate_districts;
pub use config::{EngineConfig, EngineConfigBuilder, NormalizerConfig};
pub use error::{CoreError, RecordRejection, RejectionReason, Result};
pub use model::{
    AnonymizedPoint, DecisionSignal, DistrictRiskEntry, RiskBands, RiskCategory, Severity,
    SignalCandidate, SignalType, TelemetryPoint, Trend,
};
pub use normalizer::{normalize, NormalizationResult, Normalizer};
pub use pipeline::{DecisionPipeline, WatchlistReport};
pub use ranking::{
    rank_districts, select_signals, DistrictRanking, RankingEngine, SignalFilter, SignalSelection,
};
pub use scorecard::{score_districts, score_districts_with, ScoreReport, ScoreRow};
pub use scoring::{
    calculate_lfi, composite_score, generate_forecast, project_inaction_risk,
    simulate_policy_scenario, simulate_recovery, ForecastPoint, InactionRisk, LfiMetrics,
    PolicyTier, RiskStatus, ScenarioOutcome, ScenarioParams, ScoringWeights,
};

/// Crate version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
