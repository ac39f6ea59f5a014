//! CLI module for the ALDPI agent
//!
//! Loads the engine configuration, wires telemetry, dispatches the
//! subcommand and maps its outcome to a process exit code.

pub mod commands;
pub mod output;

pub use commands::{AldpiCli, AldpiCommands, SimulateArgs};
pub use output::{OutputFormat, TableView};

use aldpi_core::{DecisionPipeline, EngineConfig, SignalFilter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::{CliError, Result};
use crate::telemetry::{
    EventLog, Operation, OperationTimer, PipelineEvent, PipelineMetrics, PipelineMetricsRegistry,
    TelemetryConfig,
};

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution, every record accepted
    Success = 0,
    /// The command completed but some records were rejected
    RecordsRejected = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Input is not a sequence of records
    MalformedBatch = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    pub fn from_rejections(rejected: usize) -> Self {
        if rejected > 0 {
            ExitCode::RecordsRejected
        } else {
            ExitCode::Success
        }
    }

    /// Exit code for a command that failed outright
    pub fn from_error(err: &CliError) -> Self {
        match err {
            CliError::InvalidInput(_) | CliError::ParseError(_) | CliError::ConfigError(_) => {
                ExitCode::InvalidInput
            }
            CliError::FileError(_) => ExitCode::FileError,
            CliError::MalformedBatch(_) => ExitCode::MalformedBatch,
            CliError::SerializationError(_) | CliError::InternalError(_) => ExitCode::InternalError,
        }
    }
}

/// Rendered result of a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub rendered: String,
    pub rejected: usize,
    pub exit_code: ExitCode,
}

impl CommandOutput {
    pub fn new(rendered: String, rejected: usize) -> Self {
        Self {
            rendered,
            rejected,
            exit_code: ExitCode::from_rejections(rejected),
        }
    }
}

/// Times one pipeline operation; feeds the duration histogram when metrics are on
pub struct StageTimer<'a> {
    start: Instant,
    _metrics: Option<OperationTimer<'a>>,
}

impl<'a> StageTimer<'a> {
    pub fn finish(self) -> Duration {
        self.start.elapsed()
    }
}

/// Everything a command needs besides its own arguments
pub struct CommandContext {
    pub pipeline: DecisionPipeline,
    pub format: OutputFormat,
    metrics: Option<PipelineMetricsRegistry>,
    event_log: Option<EventLog>,
    metrics_out: Option<PathBuf>,
}

impl CommandContext {
    pub fn new(config: EngineConfig, telemetry: &TelemetryConfig, format: OutputFormat) -> Result<Self> {
        let pipeline = DecisionPipeline::new(config)?;
        let metrics = if telemetry.enable_metrics {
            Some(PipelineMetricsRegistry::new()?)
        } else {
            None
        };
        Ok(Self {
            pipeline,
            format,
            metrics,
            event_log: telemetry.event_log.clone().map(EventLog::new),
            metrics_out: telemetry.metrics_out.clone(),
        })
    }

    pub fn metrics(&self) -> Option<&PipelineMetrics> {
        self.metrics.as_ref().map(|registry| registry.pipeline())
    }

    pub fn metrics_registry(&self) -> Option<&PipelineMetricsRegistry> {
        self.metrics.as_ref()
    }

    pub fn start_timer(&self, operation: Operation) -> StageTimer<'_> {
        StageTimer {
            start: Instant::now(),
            _metrics: self.metrics().map(|m| m.start_timer(operation.as_str())),
        }
    }

    /// Append an event to the log, if one is configured
    ///
    /// A failed write is logged and counted; it never fails the command.
    pub fn emit(&self, event: PipelineEvent) {
        let Some(log) = &self.event_log else {
            return;
        };
        match log.append(&event) {
            Ok(()) => {
                if let Some(metrics) = self.metrics() {
                    metrics.record_event_written();
                }
            }
            Err(e) => {
                warn!(path = %log.path().display(), error = %e, "failed to write pipeline event");
                if let Some(metrics) = self.metrics() {
                    metrics.record_event_failed();
                }
            }
        }
    }

    fn write_metrics(&self, path: &Path) -> Result<()> {
        if let Some(registry) = &self.metrics {
            std::fs::write(path, registry.encode_text()?).map_err(|e| {
                CliError::file_error(format!("Failed to write '{}': {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Resolve the engine configuration: file (if any), then `ALDPI_*` overrides
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_toml_file(path)?
            .with_env_overrides(|key| std::env::var(key).ok()),
        None => EngineConfig::from_env(),
    };
    config.validate()?;
    Ok(config)
}

/// Build the context for a parsed command line
pub fn context_for(cli: &AldpiCli) -> Result<CommandContext> {
    let config = load_engine_config(cli.config.as_deref())?;

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(path) = &cli.event_log {
        telemetry.event_log = Some(path.clone());
    }
    if let Some(path) = &cli.metrics_out {
        telemetry.metrics_out = Some(path.clone());
    }

    CommandContext::new(config, &telemetry, cli.format)
}

/// Run a parsed command and return its rendered output
pub fn execute(cli: &AldpiCli) -> Result<CommandOutput> {
    let ctx = context_for(cli)?;
    let output = dispatch(&ctx, &cli.command)?;

    if let Some(path) = &ctx.metrics_out {
        ctx.write_metrics(path)?;
    }

    info!(rejected = output.rejected, exit_code = i32::from(output.exit_code), "command finished");
    Ok(output)
}

pub fn dispatch(ctx: &CommandContext, command: &AldpiCommands) -> Result<CommandOutput> {
    match command {
        AldpiCommands::Normalize { input } => commands::execute_normalize(ctx, input),
        AldpiCommands::Rank { input } => commands::execute_rank(ctx, input),
        AldpiCommands::Signals {
            input,
            severity,
            signal_type,
            limit,
        } => {
            let filter = SignalFilter {
                min_severity: severity.map(Into::into),
                signal_type: signal_type.map(Into::into),
                limit: *limit,
            };
            commands::execute_signals(ctx, input, &filter)
        }
        AldpiCommands::Watchlist { input, names } => {
            commands::execute_watchlist(ctx, input, names.as_deref())
        }
        AldpiCommands::Score { input } => commands::execute_score(ctx, input),
        AldpiCommands::Simulate {
            lfi,
            resources,
            delay_days,
            metrics,
            trend,
        } => {
            let args = SimulateArgs {
                lfi: *lfi,
                resources: *resources,
                delay_days: *delay_days,
                metrics: metrics.clone(),
                trend: (*trend).into(),
            };
            commands::execute_simulate(ctx, &args)
        }
        AldpiCommands::Forecast {
            base_volume,
            from_month,
        } => commands::execute_forecast(ctx, *base_volume, *from_month),
        AldpiCommands::Metrics => commands::execute_metrics(ctx),
    }
}

/// Run the CLI, print the result and return the exit code
pub fn run(cli: AldpiCli) -> Result<ExitCode> {
    let output = execute(&cli)?;
    if !cli.quiet && !output.rendered.is_empty() {
        if output.rendered.ends_with('\n') {
            print!("{}", output.rendered);
        } else {
            println!("{}", output.rendered);
        }
    }
    Ok(output.exit_code)
}
