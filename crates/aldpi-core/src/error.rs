//! Error types for the ALDPI decision core
//!
//! Two kinds of failure exist. A single bad record is never an `Err`: it is
//! described by a [`RecordRejection`], excluded from the output and counted.
//! Only structural problems with a whole batch, or with configuration,
//! surface as [`CoreError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// The input is not a sequence of records at all
    #[error("Malformed batch: {0}")]
    MalformedBatch(String),

    /// Engine configuration is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configuration file could not be read
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Create a malformed batch error
    pub fn malformed(msg: impl Into<String>) -> Self {
        CoreError::MalformedBatch(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        CoreError::Config(msg.into())
    }

    /// Whether this error aborts a batch operation
    pub fn is_batch_error(&self) -> bool {
        matches!(self, CoreError::MalformedBatch(_))
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::Config(format!("TOML error: {}", err))
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Why a single record was excluded from an operation's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The record could not be read into the expected shape
    Unreadable { detail: String },
    /// A required text field is missing or blank
    MissingField { field: String },
    /// LFI is NaN or outside `[0, 1]`
    LfiOutOfRange { value: f64 },
    /// Timestamp does not parse as ISO-8601 / RFC 3339
    InvalidTimestamp { value: String },
    /// A closed enumeration received a value outside its set
    UnknownVariant { field: String, value: String },
    /// A numeric field is NaN or infinite
    NonFiniteMetric { field: String },
    /// An operational ratio lies outside `[0, 1]`
    RatioOutOfRange { field: String, value: f64 },
    /// Another record in the same batch already used this identifier
    DuplicateId { id: String },
}

impl RejectionReason {
    /// Short stable code, suitable for metric labels
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::Unreadable { .. } => "unreadable",
            RejectionReason::MissingField { .. } => "missing_field",
            RejectionReason::LfiOutOfRange { .. } => "lfi_out_of_range",
            RejectionReason::InvalidTimestamp { .. } => "invalid_timestamp",
            RejectionReason::UnknownVariant { .. } => "unknown_variant",
            RejectionReason::NonFiniteMetric { .. } => "non_finite_metric",
            RejectionReason::RatioOutOfRange { .. } => "ratio_out_of_range",
            RejectionReason::DuplicateId { .. } => "duplicate_id",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::Unreadable { detail } => write!(f, "unreadable record: {}", detail),
            RejectionReason::MissingField { field } => write!(f, "missing required field '{}'", field),
            RejectionReason::LfiOutOfRange { value } => write!(f, "lfi {} outside [0, 1]", value),
            RejectionReason::InvalidTimestamp { value } => write!(f, "invalid timestamp '{}'", value),
            RejectionReason::UnknownVariant { field, value } => {
                write!(f, "unknown {} '{}'", field, value)
            }
            RejectionReason::NonFiniteMetric { field } => write!(f, "{} is not a finite number", field),
            RejectionReason::RatioOutOfRange { field, value } => {
                write!(f, "{} {} outside [0, 1]", field, value)
            }
            RejectionReason::DuplicateId { id } => write!(f, "duplicate id '{}'", id),
        }
    }
}

/// A per-record validation failure
///
/// Carries the record's position in the batch and, when known, its
/// identifier. The reason may quote the offending value or a parser
/// message, so rejections can contain record text; they are diagnostics for
/// the operator and are never part of the accepted output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRejection {
    /// Zero-based position in the input batch
    pub index: usize,
    /// Identifier of the record, if it had one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// Why the record was excluded
    pub reason: RejectionReason,
}

impl RecordRejection {
    /// Create a rejection for the record at `index`
    pub fn new(index: usize, reason: RejectionReason) -> Self {
        Self {
            index,
            record_id: None,
            reason,
        }
    }

    /// Attach the record identifier
    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !id.trim().is_empty() {
            self.record_id = Some(id);
        }
        self
    }
}

impl fmt::Display for RecordRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record_id {
            Some(id) => write!(f, "record #{} ({}): {}", self.index, id, self.reason),
            None => write!(f, "record #{}: {}", self.index, self.reason),
        }
    }
}
