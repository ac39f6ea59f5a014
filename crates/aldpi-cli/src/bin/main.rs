//! ALDPI CLI
//!
//! # Usage
//!
//! ```bash
//! # Rank a district watchlist
//! aldpi rank --input watchlist.json
//!
//! # High-severity signals only, as JSON
//! aldpi signals --input feed.json --severity high --format json
//!
//! # Watchlist straight from telemetry, with an event log
//! aldpi watchlist --input telemetry.yaml --event-log events.jsonl
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success, every record accepted
//! - 1: Completed, some records rejected
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 5: Input is not a sequence of records
//! - 10: Internal error

use aldpi_cli::{run_cli, telemetry, AldpiCli};
use clap::Parser;

fn main() {
    let cli = AldpiCli::parse();

    telemetry::init_logging(cli.verbose, cli.quiet, cli.log_json);

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
