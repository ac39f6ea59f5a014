//! Composite risk scoring and what-if projections
//!
//! The composite risk score (CRS) is a transparent weighted sum of four
//! operational ratios. The watchlist's LFI is the same number.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, RejectionReason, Result};
use crate::model::Trend;

/// LFI reduction per additional resource unit in [`simulate_recovery`]
pub const FRICTION_REDUCTION_PER_UNIT: f64 = 0.04;

/// Capacity relief per additional resource unit in a policy scenario
pub const CAPACITY_RELIEF_PER_UNIT: f64 = 0.08;

/// Pendency growth per ten days of delay in a policy scenario
pub const PENDENCY_GROWTH_PER_TEN_DAYS: f64 = 0.12;

/// Operational ratios for one district, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LfiMetrics {
    /// Share of requests still pending
    pub pendency_ratio: f64,
    /// Share of requests that are updates (higher is healthier)
    pub update_ratio: f64,
    /// Share of enrolment capacity in use
    pub capacity_utilization: f64,
    /// Normalized week-on-week volume volatility
    pub volatility: f64,
}

impl LfiMetrics {
    /// Check every ratio is a finite number in `[0, 1]`
    pub fn validate(&self) -> std::result::Result<(), RejectionReason> {
        let fields = [
            ("pendency_ratio", self.pendency_ratio),
            ("update_ratio", self.update_ratio),
            ("capacity_utilization", self.capacity_utilization),
            ("volatility", self.volatility),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(RejectionReason::NonFiniteMetric {
                    field: field.to_string(),
                });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(RejectionReason::RatioOutOfRange {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Weights of the composite score; must sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub backlog: f64,
    pub delay: f64,
    pub capacity: f64,
    pub volatility: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            backlog: 0.35,
            delay: 0.25,
            capacity: 0.25,
            volatility: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        let weights = [self.backlog, self.delay, self.capacity, self.volatility];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(CoreError::config("scoring weights must be non-negative"));
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(CoreError::config(format!(
                "scoring weights must sum to 1, got {:.4}",
                total
            )));
        }
        Ok(())
    }
}

/// Weighted composite risk score, clamped to `[0, 1]`
pub fn composite_score(metrics: &LfiMetrics, weights: &ScoringWeights) -> f64 {
    let score = metrics.pendency_ratio * weights.backlog
        + (1.0 - metrics.update_ratio) * weights.delay
        + metrics.capacity_utilization * weights.capacity
        + metrics.volatility * weights.volatility;
    score.clamp(0.0, 1.0)
}

/// LFI of a district; identical to [`composite_score`]
pub fn calculate_lfi(metrics: &LfiMetrics, weights: &ScoringWeights) -> f64 {
    composite_score(metrics, weights)
}

/// Projected LFI after adding `resource_delta` units of capacity
pub fn simulate_recovery(current_lfi: f64, resource_delta: f64) -> f64 {
    (current_lfi - resource_delta * FRICTION_REDUCTION_PER_UNIT).clamp(0.0, 1.0)
}

/// Coarse health classification of a simulated score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskStatus {
    Healthy,
    Moderate,
    Critical,
}

impl RiskStatus {
    pub fn for_score(score: f64) -> Self {
        if score > 0.65 {
            RiskStatus::Critical
        } else if score > 0.4 {
            RiskStatus::Moderate
        } else {
            RiskStatus::Healthy
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskStatus::Healthy => write!(f, "HEALTHY"),
            RiskStatus::Moderate => write!(f, "MODERATE"),
            RiskStatus::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Levers of a policy what-if
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// Days the intervention is postponed
    pub delay_days: f64,
    /// Additional resource units deployed
    pub resource_delta: f64,
}

/// Outcome of [`simulate_policy_scenario`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub score: f64,
    pub lfi: f64,
    pub risk_status: RiskStatus,
    /// Simulated score minus the baseline score
    pub impact_delta: f64,
}

/// Re-score a district after delaying action and/or adding resources
pub fn simulate_policy_scenario(
    metrics: &LfiMetrics,
    baseline_score: f64,
    params: ScenarioParams,
    weights: &ScoringWeights,
) -> ScenarioOutcome {
    let delay_effect = params.delay_days / 10.0;
    let pendency = (metrics.pendency_ratio * (1.0 + PENDENCY_GROWTH_PER_TEN_DAYS * delay_effect)).min(1.0);
    let capacity = (metrics.capacity_utilization - params.resource_delta * CAPACITY_RELIEF_PER_UNIT)
        .clamp(0.0, 1.0);

    let simulated = LfiMetrics {
        pendency_ratio: pendency,
        capacity_utilization: capacity,
        ..*metrics
    };
    let score = composite_score(&simulated, weights);

    ScenarioOutcome {
        score,
        lfi: score,
        risk_status: RiskStatus::for_score(score),
        impact_delta: score - baseline_score,
    }
}

/// Cost-of-inaction projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactionRisk {
    pub projection_14d: f64,
    pub projection_30d: f64,
    pub impact_summary: String,
    pub sla_outlook: String,
}

/// Project a score forward assuming no corrective action
pub fn project_inaction_risk(current_score: f64, trend: Trend) -> InactionRisk {
    let multiplier = match trend {
        Trend::Up => 1.08,
        Trend::Down | Trend::Flat => 1.02,
    };
    let projection_14d = (current_score * multiplier).min(1.0);
    let projection_30d = (current_score * multiplier.powf(2.5)).min(1.0);

    let impact_summary = match trend {
        Trend::Up if current_score > 0.0 => format!(
            "If no corrective action is initiated, update backlog is projected to increase by {:.0}% within 30 days.",
            (projection_30d / current_score - 1.0) * 100.0
        ),
        Trend::Up => "No measurable backlog; projection unchanged.".to_string(),
        _ => "Stable trend, but baseline friction persists. Inaction results in wasted operational capacity."
            .to_string(),
    };

    let sla_outlook = if projection_30d > 0.7 {
        "High probability of breach in rural block SLAs."
    } else {
        "Low risk to current SLAs."
    };

    InactionRisk {
        projection_14d,
        projection_30d,
        impact_summary,
        sla_outlook: sla_outlook.to_string(),
    }
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Projected enrolment volume for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub month: String,
    pub projected_volume: u64,
    pub confidence_lower: u64,
    pub confidence_upper: u64,
}

/// Four-month volume forecast with seasonality and linear growth
///
/// `from_month` is the zero-based index of the current month; the forecast
/// starts with the month after it.
pub fn generate_forecast(base_volume: f64, from_month: u32) -> Vec<ForecastPoint> {
    (1..=4u32)
        .map(|i| {
            let idx = ((from_month % 12) + i) % 12;
            let seasonality = 1.0 + (idx as f64).sin() * 0.1;
            let growth = 1.0 + i as f64 * 0.02;
            let projected = (base_volume * seasonality * growth).max(0.0);

            ForecastPoint {
                month: MONTHS[idx as usize].to_string(),
                projected_volume: projected.round() as u64,
                confidence_lower: (projected * 0.92).round() as u64,
                confidence_upper: (projected * 1.08).round() as u64,
            }
        })
        .collect()
}

/// Escalation tier shown next to a district's LFI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyTier {
    RoutineMonitor,
    CapacityReview,
    ImmediateIntervention,
}

impl PolicyTier {
    pub fn for_lfi(lfi: f64) -> Self {
        if lfi > 0.6 {
            PolicyTier::ImmediateIntervention
        } else if lfi > 0.3 {
            PolicyTier::CapacityReview
        } else {
            PolicyTier::RoutineMonitor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PolicyTier::RoutineMonitor => "Routine Monitor",
            PolicyTier::CapacityReview => "Capacity Review",
            PolicyTier::ImmediateIntervention => "Immediate Intervention",
        }
    }

    pub fn recommended_action(&self) -> &'static str {
        match self {
            PolicyTier::RoutineMonitor => "Maintain baseline performance monitoring.",
            PolicyTier::CapacityReview => "Initiate Registrar capacity audit and training.",
            PolicyTier::ImmediateIntervention => "Dispatch mobile units & suspend failing operators.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> LfiMetrics {
        LfiMetrics {
            pendency_ratio: 0.6,
            update_ratio: 0.3,
            capacity_utilization: 0.8,
            volatility: 0.2,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_composite_score_weighted_sum() {
        // 0.6*0.35 + 0.7*0.25 + 0.8*0.25 + 0.2*0.15
        let score = composite_score(&metrics(), &ScoringWeights::default());
        assert!(approx(score, 0.21 + 0.175 + 0.2 + 0.03));
        assert_eq!(calculate_lfi(&metrics(), &ScoringWeights::default()), score);
    }

    #[test]
    fn test_composite_score_extremes() {
        let worst = LfiMetrics {
            pendency_ratio: 1.0,
            update_ratio: 0.0,
            capacity_utilization: 1.0,
            volatility: 1.0,
        };
        let best = LfiMetrics {
            pendency_ratio: 0.0,
            update_ratio: 1.0,
            capacity_utilization: 0.0,
            volatility: 0.0,
        };
        let weights = ScoringWeights::default();
        assert!(approx(composite_score(&worst, &weights), 1.0));
        assert!(approx(composite_score(&best, &weights), 0.0));
    }

    #[test]
    fn test_metrics_validation() {
        assert!(metrics().validate().is_ok());
        let bad = LfiMetrics {
            volatility: 1.2,
            ..metrics()
        };
        let reason = bad.validate().unwrap_err();
        assert_eq!(
            reason,
            RejectionReason::RatioOutOfRange {
                field: "volatility".into(),
                value: 1.2
            }
        );
        assert_eq!(reason.code(), "ratio_out_of_range");

        let nan = LfiMetrics {
            pendency_ratio: f64::NAN,
            ..metrics()
        };
        assert_eq!(nan.validate().unwrap_err().code(), "non_finite_metric");
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        assert!(ScoringWeights::default().validate().is_ok());
        let skewed = ScoringWeights {
            backlog: 0.5,
            ..ScoringWeights::default()
        };
        assert!(skewed.validate().is_err());
    }

    #[test]
    fn test_simulate_recovery_clamps() {
        assert!(approx(simulate_recovery(0.8, 5.0), 0.6));
        assert_eq!(simulate_recovery(0.1, 10.0), 0.0);
        assert_eq!(simulate_recovery(0.9, -10.0), 1.0);
    }

    #[test]
    fn test_policy_scenario_delay_raises_score() {
        let weights = ScoringWeights::default();
        let baseline = composite_score(&metrics(), &weights);

        let delayed = simulate_policy_scenario(
            &metrics(),
            baseline,
            ScenarioParams {
                delay_days: 30.0,
                resource_delta: 0.0,
            },
            &weights,
        );
        assert!(delayed.impact_delta > 0.0);
        assert_eq!(delayed.score, delayed.lfi);

        let resourced = simulate_policy_scenario(
            &metrics(),
            baseline,
            ScenarioParams {
                delay_days: 0.0,
                resource_delta: 5.0,
            },
            &weights,
        );
        assert!(resourced.impact_delta < 0.0);
        // capacity 0.8 - 0.4 = 0.4
        assert!(approx(resourced.score, 0.21 + 0.175 + 0.1 + 0.03));
    }

    #[test]
    fn test_risk_status_thresholds() {
        assert_eq!(RiskStatus::for_score(0.66), RiskStatus::Critical);
        assert_eq!(RiskStatus::for_score(0.65), RiskStatus::Moderate);
        assert_eq!(RiskStatus::for_score(0.41), RiskStatus::Moderate);
        assert_eq!(RiskStatus::for_score(0.4), RiskStatus::Healthy);
    }

    #[test]
    fn test_inaction_projection_rising_trend() {
        let risk = project_inaction_risk(0.5, Trend::Up);
        assert!(approx(risk.projection_14d, 0.54));
        assert!(risk.projection_30d > risk.projection_14d);
        assert!(risk.impact_summary.contains("21%"));
        assert_eq!(risk.sla_outlook, "Low risk to current SLAs.");
    }

    #[test]
    fn test_inaction_projection_caps_at_one() {
        let risk = project_inaction_risk(0.98, Trend::Up);
        assert_eq!(risk.projection_30d, 1.0);
        assert!(risk.sla_outlook.contains("breach"));
    }

    #[test]
    fn test_inaction_projection_zero_score() {
        let risk = project_inaction_risk(0.0, Trend::Up);
        assert_eq!(risk.projection_30d, 0.0);
        assert!(!risk.impact_summary.contains("NaN"));
    }

    #[test]
    fn test_forecast_wraps_months() {
        let forecast = generate_forecast(1000.0, 10);
        let months: Vec<_> = forecast.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["Dec", "Jan", "Feb", "Mar"]);
        for point in &forecast {
            assert!(point.confidence_lower <= point.projected_volume);
            assert!(point.projected_volume <= point.confidence_upper);
        }
    }

    #[test]
    fn test_policy_tiers() {
        assert_eq!(PolicyTier::for_lfi(0.61), PolicyTier::ImmediateIntervention);
        assert_eq!(PolicyTier::for_lfi(0.6), PolicyTier::CapacityReview);
        assert_eq!(PolicyTier::for_lfi(0.3), PolicyTier::RoutineMonitor);
        assert!(PolicyTier::CapacityReview.recommended_action().contains("audit"));
    }
}
