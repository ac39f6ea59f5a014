//! Telemetry normalizer
//!
//! Validates each incoming point on its own and strips every field that is
//! not part of the anonymized contract. A bad point is rejected and counted;
//! it never aborts the batch.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::NormalizerConfig;
use crate::error::{CoreError, RecordRejection, RejectionReason, Result};
use crate::model::telemetry::{check_lfi, parse_timestamp};
use crate::model::{AnonymizedPoint, TelemetryPoint};

/// Outcome of a normalization batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationResult {
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub accepted_points: Vec<AnonymizedPoint>,
    /// One entry per rejected point, in input order
    #[serde(default)]
    pub rejections: Vec<RecordRejection>,
    /// Number of extra attributes dropped from accepted points
    #[serde(default)]
    pub fields_stripped: usize,
}

impl NormalizationResult {
    /// Total number of input records seen
    pub fn total(&self) -> usize {
        self.accepted_count + self.rejected_count
    }

    fn accept(&mut self, point: AnonymizedPoint, stripped: usize) {
        self.accepted_count += 1;
        self.fields_stripped += stripped;
        self.accepted_points.push(point);
    }

    fn reject(&mut self, rejection: RecordRejection) {
        debug!(index = rejection.index, reason = %rejection.reason, "telemetry point rejected");
        self.rejected_count += 1;
        self.rejections.push(rejection);
    }
}

/// Stateless telemetry normalizer
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Validate and anonymize a batch of typed points
    pub fn normalize(&self, points: &[TelemetryPoint]) -> NormalizationResult {
        let mut result = NormalizationResult::default();

        for (index, point) in points.iter().enumerate() {
            self.admit(&mut result, index, point);
        }

        log_summary(&result);
        result
    }

    /// Normalize a raw JSON batch
    ///
    /// The value must be an array; anything else is a malformed batch. Array
    /// elements that don't read as a telemetry point are rejected one by one.
    pub fn normalize_value(&self, batch: &serde_json::Value) -> Result<NormalizationResult> {
        let records = batch_elements(batch, "telemetry")?;
        let mut result = NormalizationResult::default();

        for (index, record) in records.iter().enumerate() {
            let point = match TelemetryPoint::deserialize(record) {
                Ok(point) => point,
                Err(e) => {
                    result.reject(RecordRejection::new(
                        index,
                        RejectionReason::Unreadable {
                            detail: e.to_string(),
                        },
                    ));
                    continue;
                }
            };
            self.admit(&mut result, index, &point);
        }

        log_summary(&result);
        Ok(result)
    }

    fn admit(&self, result: &mut NormalizationResult, index: usize, point: &TelemetryPoint) {
        match self.anonymize(point) {
            Ok(clean) => result.accept(clean, point.attributes.len()),
            Err(reason) => result.reject(
                RecordRejection::new(index, reason).with_record_id(point.district_id.clone()),
            ),
        }
    }

    fn anonymize(&self, point: &TelemetryPoint) -> std::result::Result<AnonymizedPoint, RejectionReason> {
        let district_id = point.district_id.trim();
        if district_id.is_empty() {
            return Err(RejectionReason::MissingField {
                field: "district_id".to_string(),
            });
        }
        let lfi = check_lfi(point.lfi)?;
        let recorded_at = parse_timestamp(&point.timestamp, self.config.accept_naive_timestamps)?;

        Ok(AnonymizedPoint {
            district_id: district_id.to_string(),
            lfi,
            recorded_at,
        })
    }
}

fn log_summary(result: &NormalizationResult) {
    info!(
        accepted = result.accepted_count,
        rejected = result.rejected_count,
        stripped = result.fields_stripped,
        "telemetry batch normalized"
    );
}

/// Validate and anonymize with the default configuration
pub fn normalize(points: &[TelemetryPoint]) -> NormalizationResult {
    Normalizer::default().normalize(points)
}

/// Borrow the elements of a JSON batch, or fail if it is not an array
pub(crate) fn batch_elements<'a>(
    batch: &'a serde_json::Value,
    kind: &str,
) -> Result<&'a Vec<serde_json::Value>> {
    batch.as_array().ok_or_else(|| {
        CoreError::malformed(format!(
            "expected an array of {} records, got {}",
            kind,
            json_kind(batch)
        ))
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
