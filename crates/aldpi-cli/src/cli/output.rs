//! Output formatting for the ALDPI CLI
//!
//! Every command result renders as JSON, YAML, or a human-readable table
//! with risk- and severity-based coloring.

use aldpi_core::{
    DistrictRanking, DistrictRiskEntry, ForecastPoint, InactionRisk, NormalizationResult,
    PolicyTier, RecordRejection, RiskCategory, ScenarioOutcome, ScoreReport, Severity,
    SignalSelection, WatchlistReport,
};
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::error::Result;

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// Human-readable rendering of a command result
pub trait TableView {
    fn write_table(&self, out: &mut String);
}

/// Render a command result in the requested format
pub fn render<T>(value: &T, format: OutputFormat) -> Result<String>
where
    T: Serialize + TableView,
{
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        OutputFormat::Table => {
            let mut out = String::new();
            value.write_table(&mut out);
            Ok(out)
        }
    }
}

/// Recovery and policy what-if for one district
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub current_lfi: f64,
    pub resource_delta: f64,
    pub projected_lfi: f64,
    pub current_tier: PolicyTier,
    pub projected_tier: PolicyTier,
    pub inaction: InactionRisk,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioOutcome>,
}

/// Four-month enrolment volume forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub base_volume: f64,
    pub points: Vec<ForecastPoint>,
}

/// Colored label for a risk category
pub fn risk_label(risk: RiskCategory) -> String {
    let text = risk.as_str();
    match risk {
        RiskCategory::Critical => text.red().bold().to_string(),
        RiskCategory::High => text.red().to_string(),
        RiskCategory::MediumHigh => text.yellow().bold().to_string(),
        RiskCategory::Medium => text.yellow().to_string(),
        RiskCategory::Low => text.green().to_string(),
    }
}

/// Colored label for a signal severity
pub fn severity_label(severity: Severity) -> String {
    let text = severity.as_str();
    match severity {
        Severity::High => text.red().bold().to_string(),
        Severity::Medium => text.yellow().bold().to_string(),
        Severity::Low => text.blue().to_string(),
    }
}

fn tier_label(tier: PolicyTier) -> String {
    match tier {
        PolicyTier::ImmediateIntervention => tier.label().red().bold().to_string(),
        PolicyTier::CapacityReview => tier.label().yellow().to_string(),
        PolicyTier::RoutineMonitor => tier.label().green().to_string(),
    }
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title.cyan().bold());
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
}

fn write_rejections(out: &mut String, rejections: &[RecordRejection]) {
    if rejections.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Rejected:".cyan().bold());
    for rejection in rejections {
        let _ = writeln!(out, "  {} {}", "x".red(), rejection);
    }
}

fn write_entries(out: &mut String, entries: &[DistrictRiskEntry]) {
    let _ = writeln!(out, "{:>4}  {:<10} {:<24} {:>6}  {}", "#", "ID", "NAME", "LFI", "RISK");
    for (rank, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<10} {:<24} {:>6.2}  {}",
            rank + 1,
            entry.id,
            entry.name,
            entry.lfi,
            risk_label(entry.risk())
        );
    }
}

impl TableView for NormalizationResult {
    fn write_table(&self, out: &mut String) {
        heading(out, "Telemetry Normalization");
        let _ = writeln!(
            out,
            "{} accepted, {} rejected, {} fields stripped",
            self.accepted_count.to_string().green(),
            self.rejected_count.to_string().red(),
            self.fields_stripped
        );
        if !self.accepted_points.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{:<10} {:>6}  {}", "DISTRICT", "LFI", "RECORDED AT");
            for point in &self.accepted_points {
                let _ = writeln!(
                    out,
                    "{:<10} {:>6.2}  {}",
                    point.district_id,
                    point.lfi,
                    point.recorded_at.to_rfc3339()
                );
            }
        }
        write_rejections(out, &self.rejections);
    }
}

impl TableView for DistrictRanking {
    fn write_table(&self, out: &mut String) {
        heading(out, "District Watchlist");
        if self.entries.is_empty() {
            let _ = writeln!(out, "No districts to rank.");
        } else {
            write_entries(out, &self.entries);
        }
        if !self.by_category.is_empty() {
            let summary: Vec<String> = self
                .by_category
                .iter()
                .rev()
                .map(|(risk, count)| format!("{} {}", count, risk_label(*risk)))
                .collect();
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", summary.join(", "));
        }
        write_rejections(out, &self.rejections);
    }
}

impl TableView for WatchlistReport {
    fn write_table(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "{} telemetry points accepted, {} rejected",
            self.normalization.accepted_count, self.normalization.rejected_count
        );
        write_rejections(out, &self.normalization.rejections);
        let _ = writeln!(out);
        self.ranking.write_table(out);
    }
}

impl TableView for SignalSelection {
    fn write_table(&self, out: &mut String) {
        heading(out, "Decision Signals");
        if self.signals.is_empty() {
            let _ = writeln!(out, "No signals to show.");
        }
        for (index, signal) in self.signals.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. [{}] {} {} ({})",
                index + 1,
                severity_label(signal.severity),
                signal.signal_type,
                signal.title.bold(),
                signal.district
            );
            let _ = writeln!(out, "   Metric: {} trend {}", signal.metric_value, signal.trend);
            let _ = writeln!(out, "   Data: {}", signal.data_summary);
            let _ = writeln!(out, "   Why: {}", signal.why_it_matters);
            let _ = writeln!(out, "   {} {}", "Action:".green(), signal.recommended_action);
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} shown, {} dropped, {} filtered",
            self.signals.len(),
            self.dropped_count,
            self.filtered_count
        );
        write_rejections(out, &self.rejections);
    }
}

impl TableView for ScoreReport {
    fn write_table(&self, out: &mut String) {
        heading(out, "Composite Risk Scores");
        let _ = writeln!(
            out,
            "{:<10} {:<24} {:>6}  {:<12} {}",
            "ID", "NAME", "SCORE", "RISK", "POLICY"
        );
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:<10} {:<24} {:>6.3}  {:<12} {}",
                row.id,
                row.name,
                row.score,
                risk_label(row.risk),
                tier_label(row.tier)
            );
        }
        write_rejections(out, &self.rejections);
    }
}

impl TableView for SimulationReport {
    fn write_table(&self, out: &mut String) {
        heading(out, "Recovery Simulation");
        let _ = writeln!(
            out,
            "LFI {:.2} -> {:.2} with {} additional resource units",
            self.current_lfi, self.projected_lfi, self.resource_delta
        );
        let _ = writeln!(
            out,
            "Policy: {} -> {}",
            tier_label(self.current_tier),
            tier_label(self.projected_tier)
        );
        if let Some(scenario) = &self.scenario {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", "Policy scenario:".cyan().bold());
            let _ = writeln!(
                out,
                "  score {:.3} ({}), impact {:+.3}",
                scenario.score, scenario.risk_status, scenario.impact_delta
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Cost of inaction:".cyan().bold());
        let _ = writeln!(
            out,
            "  14 days: {:.2}, 30 days: {:.2}",
            self.inaction.projection_14d, self.inaction.projection_30d
        );
        let _ = writeln!(out, "  {}", self.inaction.impact_summary);
        let _ = writeln!(out, "  {}", self.inaction.sla_outlook);
    }
}

impl TableView for ForecastReport {
    fn write_table(&self, out: &mut String) {
        heading(out, "Enrolment Volume Forecast");
        let _ = writeln!(out, "{:<6} {:>10} {:>10} {:>10}", "MONTH", "VOLUME", "LOWER", "UPPER");
        for point in &self.points {
            let _ = writeln!(
                out,
                "{:<6} {:>10} {:>10} {:>10}",
                point.month, point.projected_volume, point.confidence_lower, point.confidence_upper
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aldpi_core::{rank_districts, RankingEngine, RiskBands};

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_render_ranking_as_json() {
        let ranking = RankingEngine::new(RiskBands::standard()).rank(vec![
            DistrictRiskEntry::new("d3", "Pune", 0.72),
            DistrictRiskEntry::new("d11", "Gaya", 0.88),
        ]);
        let json = render(&ranking, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entries"][0]["id"], "d11");
        assert_eq!(value["entries"][1]["risk"], "High");
    }

    #[test]
    fn test_render_ranking_as_table() {
        let ranking = DistrictRanking {
            entries: rank_districts(vec![DistrictRiskEntry::new("d1", "Bellary", 0.85)]),
            ..DistrictRanking::default()
        };
        let table = render(&ranking, OutputFormat::Table).unwrap();
        assert!(table.contains("Bellary"));
        assert!(table.contains("0.85"));
    }

    #[test]
    fn test_render_forecast_as_yaml() {
        let report = ForecastReport {
            base_volume: 1000.0,
            points: aldpi_core::generate_forecast(1000.0, 0),
        };
        let yaml = render(&report, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("month: Feb"));
    }
}
