//! End-to-end tests for the `aldpi` command line
//!
//! Each test writes its input batch to a temp directory, parses a real
//! argument vector and runs the command through `cli::execute`.

use aldpi_cli::cli::execute;
use aldpi_cli::telemetry::EventLog;
use aldpi_cli::{AldpiCli, CliError, ExitCode};
use clap::Parser;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    write(dir, name, &serde_json::to_string_pretty(value).unwrap())
}

fn run(args: &[&str]) -> Result<(ExitCode, String), CliError> {
    let mut argv = vec!["aldpi"];
    argv.extend_from_slice(args);
    let cli = AldpiCli::try_parse_from(argv).unwrap();
    execute(&cli).map(|out| (out.exit_code, out.rendered))
}

fn run_json(args: &[&str]) -> (ExitCode, Value) {
    let mut argv = args.to_vec();
    argv.extend_from_slice(&["--format", "json"]);
    let (code, rendered) = run(&argv).unwrap();
    (code, serde_json::from_str(&rendered).unwrap())
}

fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn test_rank_watchlist() {
    let dir = TempDir::new().unwrap();
    let input = write_json(
        &dir,
        "watchlist.json",
        &json!([
            {"id": "d1", "name": "Bellary", "lfi": 0.85, "risk": "High"},
            {"id": "d3", "name": "Pune", "lfi": 0.72, "risk": "Medium-High"},
            {"id": "d11", "name": "Gaya", "lfi": 0.88, "risk": "Critical"}
        ]),
    );

    let (code, value) = run_json(&["rank", "--input", path(&input)]);
    assert_eq!(code, ExitCode::Success);

    let ids: Vec<&str> = value["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["d11", "d1", "d3"]);
    assert_eq!(value["entries"][1]["risk"], "Critical");
    assert_eq!(value["entries"][2]["risk"], "High");
}

#[test]
fn test_rank_from_yaml_with_rejection() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "watchlist.yaml",
        "- id: d1\n  name: Bellary\n  lfi: 0.85\n- id: d9\n  name: Broken\n  lfi: 1.7\n",
    );

    let (code, value) = run_json(&["rank", "--input", path(&input)]);
    assert_eq!(code, ExitCode::RecordsRejected);
    assert_eq!(value["entries"].as_array().unwrap().len(), 1);
    assert_eq!(value["rejected_count"], 1);
    assert_eq!(value["rejections"][0]["record_id"], "d9");
}

#[test]
fn test_normalize_strips_and_rejects() {
    let dir = TempDir::new().unwrap();
    let input = write_json(
        &dir,
        "telemetry.json",
        &json!([
            {"district_id": "d1", "lfi": 0.4, "timestamp": "2024-01-01T00:00:00Z", "operator": "op-17"},
            {"district_id": "d1", "lfi": 1.5, "timestamp": "2024-01-01T00:00:00Z"}
        ]),
    );

    let (code, value) = run_json(&["normalize", "--input", path(&input)]);
    assert_eq!(code, ExitCode::RecordsRejected);
    assert_eq!(value["accepted_count"], 1);
    assert_eq!(value["rejected_count"], 1);
    assert!(value["accepted_points"][0].get("operator").is_none());
}

#[test]
fn test_signals_with_filters() {
    let dir = TempDir::new().unwrap();
    let signal = |id: &str, severity: &str, metric: f64| {
        json!({
            "id": id,
            "type": "RISK",
            "title": "t",
            "district": "d",
            "severity": severity,
            "data_summary": "a",
            "why_it_matters": "b",
            "recommended_action": "c",
            "metric_value": metric,
            "trend": "UP"
        })
    };
    let input = write_json(
        &dir,
        "feed.json",
        &json!([
            signal("s1", "LOW", 90.0),
            signal("s2", "HIGH", 10.0),
            signal("s3", "MEDIUM", 50.0),
            signal("s4", "HIGH", 30.0)
        ]),
    );

    let (code, value) = run_json(&[
        "signals", "--input", path(&input), "--severity", "medium", "--limit", "2",
    ]);
    assert_eq!(code, ExitCode::Success);

    let ids: Vec<&str> = value["signals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["s4", "s2"]);
    assert_eq!(value["dropped_count"], 0);
}

#[test]
fn test_watchlist_from_telemetry_with_names() {
    let dir = TempDir::new().unwrap();
    let input = write_json(
        &dir,
        "telemetry.json",
        &json!([
            {"district_id": "d1", "lfi": 0.50, "timestamp": "2024-01-01T00:00:00Z"},
            {"district_id": "d1", "lfi": 0.85, "timestamp": "2024-02-01T00:00:00Z"},
            {"district_id": "d11", "lfi": 0.88, "timestamp": "2024-01-15T00:00:00Z"}
        ]),
    );
    let names = write_json(&dir, "names.json", &json!({"d1": "Bellary", "d11": "Gaya"}));

    let (code, value) = run_json(&["watchlist", "--input", path(&input), "--names", path(&names)]);
    assert_eq!(code, ExitCode::Success);

    let entries = value["ranking"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "Gaya");
    assert_eq!(entries[1]["lfi"], 0.85);
}

#[test]
fn test_score_ranks_and_tiers() {
    let dir = TempDir::new().unwrap();
    let input = write_json(
        &dir,
        "metrics.json",
        &json!([
            {"id": "d1", "name": "Bellary", "pendency_ratio": 0.9, "update_ratio": 0.1, "capacity_utilization": 0.9, "volatility": 0.8},
            {"id": "d2", "pendency_ratio": 0.1, "update_ratio": 0.9, "capacity_utilization": 0.2, "volatility": 0.1},
            {"id": "d3", "pendency_ratio": 2.0, "update_ratio": 0.9, "capacity_utilization": 0.2, "volatility": 0.1}
        ]),
    );

    let (code, value) = run_json(&["score", "--input", path(&input)]);
    assert_eq!(code, ExitCode::RecordsRejected);

    let rows = value["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "d1");
    assert_eq!(rows[0]["tier"], "IMMEDIATE_INTERVENTION");
    assert_eq!(rows[1]["name"], "d2");
    assert_eq!(rows[1]["tier"], "ROUTINE_MONITOR");
    assert_eq!(value["rejections"][0]["record_id"], "d3");
}

#[test]
fn test_simulate_with_scenario() {
    let dir = TempDir::new().unwrap();
    let metrics = write_json(
        &dir,
        "district.json",
        &json!({"pendency_ratio": 0.6, "update_ratio": 0.3, "capacity_utilization": 0.8, "volatility": 0.2}),
    );

    let (code, value) = run_json(&[
        "simulate", "--lfi", "0.72", "--resources", "4", "--delay-days", "10", "--metrics",
        path(&metrics), "--trend", "up",
    ]);
    assert_eq!(code, ExitCode::Success);

    let projected = value["projected_lfi"].as_f64().unwrap();
    assert!((projected - 0.56).abs() < 1e-9);
    assert_eq!(value["current_tier"], "IMMEDIATE_INTERVENTION");
    assert_eq!(value["projected_tier"], "CAPACITY_REVIEW");
    assert!(value["scenario"]["impact_delta"].as_f64().unwrap() < 0.0);
    assert!(value["inaction"]["projection_30d"].as_f64().unwrap() > 0.72);
}

#[test]
fn test_simulate_rejects_out_of_range_lfi() {
    let err = run(&["simulate", "--lfi", "1.2"]).unwrap_err();
    assert!(matches!(err, CliError::InvalidInput(_)));
    assert_eq!(ExitCode::from_error(&err), ExitCode::InvalidInput);
}

#[test]
fn test_forecast_from_given_month() {
    let (code, value) = run_json(&["forecast", "--base-volume", "1000", "--from-month", "12"]);
    assert_eq!(code, ExitCode::Success);

    let months: Vec<&str> = value["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["month"].as_str().unwrap())
        .collect();
    assert_eq!(months, vec!["Jan", "Feb", "Mar", "Apr"]);
}

#[test]
fn test_malformed_batch_exit_code() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "points.json", &json!({"district_id": "d1"}));

    let err = run(&["normalize", "--input", path(&input)]).unwrap_err();
    assert!(matches!(err, CliError::MalformedBatch(_)));
    assert_eq!(ExitCode::from_error(&err), ExitCode::MalformedBatch);
}

#[test]
fn test_missing_file_exit_code() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");

    let err = run(&["rank", "--input", path(&missing)]).unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::FileError);
}

#[test]
fn test_empty_batch_succeeds() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "empty.json", "[]");

    let (code, value) = run_json(&["signals", "--input", path(&input)]);
    assert_eq!(code, ExitCode::Success);
    assert!(value["signals"].as_array().unwrap().is_empty());
}

#[test]
fn test_config_file_changes_bands() {
    let dir = TempDir::new().unwrap();
    let config = write(
        &dir,
        "aldpi.toml",
        "[bands]\ncritical = 0.95\nhigh = 0.80\nmedium_high = 0.60\nmedium = 0.40\n",
    );
    let input = write_json(&dir, "watchlist.json", &json!([{"id": "d1", "lfi": 0.85}]));

    let (_, value) = run_json(&["rank", "--input", path(&input), "--config", path(&config)]);
    assert_eq!(value["entries"][0]["risk"], "High");
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "aldpi.toml", "[bands]\ncritical = 0.5\nhigh = 0.7\n");
    let input = write(&dir, "watchlist.json", "[]");

    let err = run(&["rank", "--input", path(&input), "--config", path(&config)]).unwrap_err();
    assert!(matches!(err, CliError::ConfigError(_)));
}

#[test]
fn test_event_log_and_metrics_out() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "watchlist.json", &json!([{"id": "d1", "lfi": 0.85}]));
    let events = dir.path().join("events.jsonl");
    let metrics = dir.path().join("metrics.prom");

    for _ in 0..2 {
        run(&[
            "rank", "--input", path(&input), "--event-log", path(&events), "--metrics-out",
            path(&metrics),
        ])
        .unwrap();
    }

    let logged = EventLog::new(&events).read_all().unwrap();
    assert_eq!(logged.len(), 2);
    assert_eq!(logged[0].inputs_hash, logged[1].inputs_hash);
    assert_eq!(logged[0].accepted, 1);

    let text = std::fs::read_to_string(&metrics).unwrap();
    assert!(text.contains("aldpi_districts_ranked_total{risk=\"Critical\"} 1"));
    assert!(text.contains("aldpi_events_written_total 1"));
}

#[test]
fn test_table_output_mentions_districts() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "watchlist.json", &json!([{"id": "d11", "name": "Gaya", "lfi": 0.88}]));

    let (_, rendered) = run(&["rank", "--input", path(&input)]).unwrap();
    assert!(rendered.contains("Gaya"));
    assert!(rendered.contains("0.88"));
}
