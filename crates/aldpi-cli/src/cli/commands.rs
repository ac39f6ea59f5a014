//! CLI command definitions for the ALDPI agent
//!
//! Clap-based commands for normalizing telemetry, ranking the district
//! watchlist, selecting decision signals, and running score projections.

use aldpi_core::{
    composite_score, generate_forecast, project_inaction_risk, simulate_policy_scenario,
    simulate_recovery, LfiMetrics, PolicyTier, ScenarioParams, Severity, SignalFilter, SignalType,
    Trend,
};
use chrono::Datelike;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::output::{render, ForecastReport, OutputFormat, SimulationReport};
use super::{CommandContext, CommandOutput};
use crate::error::{CliError, Result};
use crate::ingest;
use crate::telemetry::{Operation, PipelineEvent};

/// ALDPI decision agent
///
/// Normalize district telemetry, rank the risk watchlist and select
/// decision signals for administrators.
#[derive(Parser, Debug)]
#[command(name = "aldpi")]
#[command(about = "ALDPI - district risk watchlist and decision signals", long_about = None)]
#[command(version)]
pub struct AldpiCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Engine configuration file (TOML)
    #[arg(long, global = true, env = "ALDPI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format for command results
    #[arg(long, value_enum, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Append a pipeline event per command to this JSON-lines file
    #[arg(long, global = true)]
    pub event_log: Option<PathBuf>,

    /// Write the Prometheus text exposition here after the command
    #[arg(long, global = true)]
    pub metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: AldpiCommands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum AldpiCommands {
    /// Validate and anonymize a batch of telemetry points
    Normalize {
        /// JSON or YAML array of telemetry points
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Rank district risk entries into the watchlist
    Rank {
        /// JSON or YAML array of district entries
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Validate and order decision signals
    Signals {
        /// JSON or YAML array of signal candidates
        #[arg(short, long)]
        input: PathBuf,

        /// Keep only signals at or above this severity
        #[arg(long, value_enum)]
        severity: Option<SeverityArg>,

        /// Keep only signals of this type
        #[arg(long = "type", value_enum)]
        signal_type: Option<SignalTypeArg>,

        /// Show at most this many signals
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Build the watchlist from raw telemetry
    ///
    /// Normalizes the points, keeps each district's latest reading and ranks
    /// the result.
    Watchlist {
        /// JSON or YAML array of telemetry points
        #[arg(short, long)]
        input: PathBuf,

        /// District display names, as an id-to-name object or id/name records
        #[arg(long)]
        names: Option<PathBuf>,
    },

    /// Compute composite risk scores from operational ratios
    Score {
        /// JSON or YAML array of district metrics
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Project recovery, a policy scenario and the cost of inaction
    Simulate {
        /// Current LFI of the district
        #[arg(long)]
        lfi: f64,

        /// Additional resource units deployed
        #[arg(long, default_value_t = 0.0)]
        resources: f64,

        /// Days the intervention is postponed
        #[arg(long, default_value_t = 0.0)]
        delay_days: f64,

        /// District metrics (single object) for the policy scenario
        #[arg(long)]
        metrics: Option<PathBuf>,

        /// Current trend of the district
        #[arg(long, value_enum, default_value = "flat")]
        trend: TrendArg,
    },

    /// Four-month enrolment volume forecast
    Forecast {
        /// Current monthly enrolment volume
        #[arg(long)]
        base_volume: f64,

        /// Current month (1-12); defaults to this month
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        from_month: Option<u32>,
    },

    /// Print the Prometheus metrics exposition
    Metrics,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum SeverityArg {
    High,
    Medium,
    Low,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::High => Severity::High,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::Low => Severity::Low,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum SignalTypeArg {
    Risk,
    Anomaly,
    Coverage,
    Demographic,
}

impl From<SignalTypeArg> for SignalType {
    fn from(arg: SignalTypeArg) -> Self {
        match arg {
            SignalTypeArg::Risk => SignalType::Risk,
            SignalTypeArg::Anomaly => SignalType::Anomaly,
            SignalTypeArg::Coverage => SignalType::Coverage,
            SignalTypeArg::Demographic => SignalType::Demographic,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum TrendArg {
    Up,
    Down,
    #[value(alias = "stable")]
    Flat,
}

impl From<TrendArg> for Trend {
    fn from(arg: TrendArg) -> Self {
        match arg {
            TrendArg::Up => Trend::Up,
            TrendArg::Down => Trend::Down,
            TrendArg::Flat => Trend::Flat,
        }
    }
}

/// Record the event for a finished pipeline run and render its result
fn finish<T>(
    ctx: &CommandContext,
    event: PipelineEvent,
    value: &T,
    rejected: usize,
) -> Result<CommandOutput>
where
    T: serde::Serialize + super::output::TableView,
{
    ctx.emit(event);
    Ok(CommandOutput::new(render(value, ctx.format)?, rejected))
}

pub fn execute_normalize(ctx: &CommandContext, input: &Path) -> Result<CommandOutput> {
    let batch = ingest::load_document(input)?;
    let timer = ctx.start_timer(Operation::Normalize);

    let result = ctx.pipeline.normalize_value(&batch)?;

    let elapsed = timer.finish();
    if let Some(metrics) = ctx.metrics() {
        metrics.record_normalization(&result);
    }
    let event = PipelineEvent::new(Operation::Normalize, &batch)
        .with_counts(result.accepted_count, result.rejected_count)
        .with_duration(elapsed);
    finish(ctx, event, &result, result.rejected_count)
}

pub fn execute_rank(ctx: &CommandContext, input: &Path) -> Result<CommandOutput> {
    let batch = ingest::load_document(input)?;
    let timer = ctx.start_timer(Operation::Rank);

    let ranking = ctx.pipeline.rank_value(&batch)?;

    let elapsed = timer.finish();
    if let Some(metrics) = ctx.metrics() {
        metrics.record_ranking(&ranking);
    }
    let event = PipelineEvent::new(Operation::Rank, &batch)
        .with_counts(ranking.entries.len(), ranking.rejected_count)
        .with_duration(elapsed);
    finish(ctx, event, &ranking, ranking.rejected_count)
}

pub fn execute_signals(
    ctx: &CommandContext,
    input: &Path,
    filter: &SignalFilter,
) -> Result<CommandOutput> {
    let batch = ingest::load_document(input)?;
    let timer = ctx.start_timer(Operation::Signals);

    let selection = ctx.pipeline.select_value(&batch, filter)?;

    let elapsed = timer.finish();
    if let Some(metrics) = ctx.metrics() {
        metrics.record_selection(&selection);
    }
    let event = PipelineEvent::new(Operation::Signals, &batch)
        .with_counts(selection.signals.len(), selection.dropped_count)
        .with_duration(elapsed);
    finish(ctx, event, &selection, selection.dropped_count)
}

pub fn execute_watchlist(
    ctx: &CommandContext,
    input: &Path,
    names: Option<&Path>,
) -> Result<CommandOutput> {
    let names = match names {
        Some(path) => ingest::load_names(path)?,
        None => HashMap::new(),
    };
    let batch = ingest::load_document(input)?;
    let timer = ctx.start_timer(Operation::Watchlist);

    let report = ctx.pipeline.watchlist_value(&batch, &names)?;

    let elapsed = timer.finish();
    if let Some(metrics) = ctx.metrics() {
        metrics.record_normalization(&report.normalization);
        metrics.record_ranking(&report.ranking);
    }
    let rejected = report.normalization.rejected_count + report.ranking.rejected_count;
    let event = PipelineEvent::new(Operation::Watchlist, &batch)
        .with_counts(report.normalization.accepted_count, rejected)
        .with_duration(elapsed);
    finish(ctx, event, &report, rejected)
}

pub fn execute_score(ctx: &CommandContext, input: &Path) -> Result<CommandOutput> {
    let batch = ingest::load_document(input)?;
    let timer = ctx.start_timer(Operation::Score);

    let report = ctx.pipeline.score_value(&batch)?;

    let elapsed = timer.finish();
    if let Some(metrics) = ctx.metrics() {
        metrics.record_scoring(&report);
    }
    let event = PipelineEvent::new(Operation::Score, &batch)
        .with_counts(report.rows.len(), report.rejected_count)
        .with_duration(elapsed);
    finish(ctx, event, &report, report.rejected_count)
}

/// Parameters of `aldpi simulate`
#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub lfi: f64,
    pub resources: f64,
    pub delay_days: f64,
    pub metrics: Option<PathBuf>,
    pub trend: Trend,
}

fn load_metrics(path: &Path) -> Result<LfiMetrics> {
    let document = ingest::load_document(path)?;
    let metrics = LfiMetrics::deserialize(&document)
        .map_err(|e| CliError::invalid_input(format!("Invalid district metrics: {}", e)))?;
    metrics
        .validate()
        .map_err(|reason| CliError::invalid_input(format!("Invalid district metrics: {}", reason)))?;
    Ok(metrics)
}

pub fn execute_simulate(ctx: &CommandContext, args: &SimulateArgs) -> Result<CommandOutput> {
    if !(0.0..=1.0).contains(&args.lfi) {
        return Err(CliError::invalid_input(format!(
            "--lfi must lie in [0, 1], got {}",
            args.lfi
        )));
    }
    if !args.resources.is_finite() {
        return Err(CliError::invalid_input("--resources must be a finite number"));
    }
    if !args.delay_days.is_finite() || args.delay_days < 0.0 {
        return Err(CliError::invalid_input("--delay-days must be zero or more"));
    }

    let metrics = args.metrics.as_deref().map(load_metrics).transpose()?;
    let timer = ctx.start_timer(Operation::Simulate);

    let weights = &ctx.pipeline.config().scoring;
    let projected_lfi = simulate_recovery(args.lfi, args.resources);
    let scenario = metrics.map(|m| {
        let baseline = composite_score(&m, weights);
        simulate_policy_scenario(
            &m,
            baseline,
            ScenarioParams {
                delay_days: args.delay_days,
                resource_delta: args.resources,
            },
            weights,
        )
    });

    let report = SimulationReport {
        current_lfi: args.lfi,
        resource_delta: args.resources,
        projected_lfi,
        current_tier: PolicyTier::for_lfi(args.lfi),
        projected_tier: PolicyTier::for_lfi(projected_lfi),
        inaction: project_inaction_risk(args.lfi, args.trend),
        scenario,
    };

    let elapsed = timer.finish();
    let inputs = json!({
        "lfi": args.lfi,
        "resources": args.resources,
        "delay_days": args.delay_days,
        "trend": args.trend,
        "metrics": metrics,
    });
    let event = PipelineEvent::new(Operation::Simulate, &inputs)
        .with_counts(1, 0)
        .with_duration(elapsed);
    finish(ctx, event, &report, 0)
}

pub fn execute_forecast(
    ctx: &CommandContext,
    base_volume: f64,
    from_month: Option<u32>,
) -> Result<CommandOutput> {
    if !base_volume.is_finite() || base_volume < 0.0 {
        return Err(CliError::invalid_input(
            "--base-volume must be a non-negative number",
        ));
    }
    // CLI months are 1-based, the forecast takes a zero-based index
    let month0 = match from_month {
        Some(month) => month.saturating_sub(1),
        None => chrono::Utc::now().month0(),
    };
    let timer = ctx.start_timer(Operation::Forecast);

    let report = ForecastReport {
        base_volume,
        points: generate_forecast(base_volume, month0),
    };

    let elapsed = timer.finish();
    let inputs = json!({ "base_volume": base_volume, "from_month": month0 + 1 });
    let event = PipelineEvent::new(Operation::Forecast, &inputs)
        .with_counts(report.points.len(), 0)
        .with_duration(elapsed);
    finish(ctx, event, &report, 0)
}

pub fn execute_metrics(ctx: &CommandContext) -> Result<CommandOutput> {
    match ctx.metrics_registry() {
        Some(registry) => Ok(CommandOutput::new(registry.encode_text()?, 0)),
        None => {
            warn!("metrics are disabled");
            Ok(CommandOutput::new(String::new(), 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        AldpiCli::command().debug_assert();
    }

    #[test]
    fn test_parse_signals_command() {
        let cli = AldpiCli::try_parse_from([
            "aldpi", "signals", "--input", "feed.json", "--severity", "medium", "--type", "risk",
            "--limit", "5", "--format", "json",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            AldpiCommands::Signals {
                severity,
                signal_type,
                limit,
                ..
            } => {
                assert_eq!(severity.map(Severity::from), Some(Severity::Medium));
                assert_eq!(signal_type.map(SignalType::from), Some(SignalType::Risk));
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = AldpiCli::try_parse_from(["aldpi", "rank", "-i", "w.json", "-vv", "--log-json"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_json);
    }

    #[test]
    fn test_trend_accepts_stable_alias() {
        let cli = AldpiCli::try_parse_from([
            "aldpi", "simulate", "--lfi", "0.5", "--trend", "stable",
        ])
        .unwrap();
        match cli.command {
            AldpiCommands::Simulate { trend, .. } => assert_eq!(Trend::from(trend), Trend::Flat),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_forecast_month_range() {
        assert!(AldpiCli::try_parse_from(["aldpi", "forecast", "--base-volume", "10", "--from-month", "13"]).is_err());
        assert!(AldpiCli::try_parse_from(["aldpi", "forecast", "--base-volume", "10", "--from-month", "12"]).is_ok());
    }

    #[test]
    fn test_load_metrics_reports_range_violation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("district.json");
        std::fs::write(
            &path,
            r#"{"pendency_ratio": 1.4, "update_ratio": 0.3, "capacity_utilization": 0.8, "volatility": 0.2}"#,
        )
        .unwrap();

        match load_metrics(&path) {
            Err(CliError::InvalidInput(msg)) => assert!(msg.contains("pendency_ratio 1.4 outside [0, 1]")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
