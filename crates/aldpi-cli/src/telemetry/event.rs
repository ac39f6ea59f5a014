//! Pipeline decision events
//!
//! One `PipelineEvent` per command: what ran, a SHA-256 of the input batch,
//! and how many records were accepted or rejected. Events carry counts and
//! ids only, never record contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::Result;
use crate::{AGENT_ID, AGENT_VERSION};

/// Pipeline operation that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Normalize,
    Rank,
    Signals,
    Watchlist,
    Score,
    Simulate,
    Forecast,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Normalize => "normalize",
            Operation::Rank => "rank",
            Operation::Signals => "signals",
            Operation::Watchlist => "watchlist",
            Operation::Score => "score",
            Operation::Simulate => "simulate",
            Operation::Forecast => "forecast",
        }
    }
}

/// Audit record of a single pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub event_id: Uuid,
    pub agent_id: String,
    pub agent_version: String,
    pub operation: Operation,
    /// Hex SHA-256 of the canonical JSON input
    pub inputs_hash: String,
    pub accepted: usize,
    pub rejected: usize,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    pub fn new(operation: Operation, input: &serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            agent_id: AGENT_ID.to_string(),
            agent_version: AGENT_VERSION.to_string(),
            operation,
            inputs_hash: calculate_inputs_hash(input),
            accepted: 0,
            rejected: 0,
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_counts(mut self, accepted: usize, rejected: usize) -> Self {
        self.accepted = accepted;
        self.rejected = rejected;
        self
    }

    pub fn with_duration(mut self, duration: std::time::Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }
}

/// SHA-256 of the input batch for traceability
///
/// `serde_json::Value` objects serialize with sorted keys, so two documents
/// that differ only in key order hash the same.
pub fn calculate_inputs_hash(input: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    if let Ok(json) = serde_json::to_string(input) {
        hasher.update(json.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Append-only JSON-lines event log
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &PipelineEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Read every event back in write order
    pub fn read_all(&self) -> Result<Vec<PipelineEvent>> {
        let content = std::fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}
