//! ALDPI command-line agent
//!
//! Runs the decision core over JSON or YAML files and renders the results
//! for administrators and downstream tooling.
//!
//! ## Architecture
//!
//! 1. **CLI** (`cli/`): clap command definitions, dispatch, exit codes and
//!    table/JSON/YAML rendering.
//! 2. **Ingest** (`ingest`): reads batch files into JSON values; the core
//!    does all record validation.
//! 3. **Telemetry** (`telemetry/`): Prometheus metrics, `PipelineEvent`
//!    JSON-lines log and tracing setup.
//!
//! ## CLI Usage
//!
//! ```bash
//! aldpi rank --input watchlist.json
//! aldpi signals --input feed.yaml --severity medium --limit 5 --format json
//! aldpi watchlist --input telemetry.json --names districts.json -v
//! aldpi simulate --lfi 0.72 --resources 3 --trend up
//! ```

pub mod cli;
pub mod error;
pub mod ingest;
pub mod telemetry;

pub use cli::{AldpiCli, AldpiCommands, CommandOutput, ExitCode, OutputFormat};
pub use error::{CliError, Result};
pub use telemetry::{PipelineEvent, PipelineMetricsRegistry, TelemetryConfig};

/// Agent identifier recorded on every pipeline event
pub const AGENT_ID: &str = "aldpi-cli";

/// Agent version (from Cargo.toml)
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the CLI with the given arguments
///
/// # Example
///
/// ```rust,no_run
/// use clap::Parser;
/// use aldpi_cli::{AldpiCli, run_cli};
///
/// fn main() {
///     let cli = AldpiCli::parse();
///     let exit_code = run_cli(cli);
///     std::process::exit(exit_code.into());
/// }
/// ```
pub fn run_cli(cli: AldpiCli) -> ExitCode {
    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            if !e.is_user_error() {
                tracing::error!(error = %e, "command failed");
            }
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
