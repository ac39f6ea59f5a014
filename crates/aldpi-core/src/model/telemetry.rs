//! Telemetry points as they arrive from ingestion and after anonymization

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RejectionReason;

/// A single per-district reading as handed over by the ingestion boundary
///
/// Anything besides the three known fields lands in `attributes`. Those are
/// treated as potentially identifying and never leave the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// Stable, non-identifying district key
    pub district_id: String,
    /// Local Flag Index, expected in `[0, 1]`
    pub lfi: f64,
    /// ISO-8601 timestamp of the reading
    pub timestamp: String,
    /// Extra fields attached upstream (operator ids, device serials, ...)
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl TelemetryPoint {
    /// Create a point with no extra attributes
    pub fn new(district_id: impl Into<String>, lfi: f64, timestamp: impl Into<String>) -> Self {
        Self {
            district_id: district_id.into(),
            lfi,
            timestamp: timestamp.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Attach an extra attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// A telemetry point that passed validation and had every extra field removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizedPoint {
    pub district_id: String,
    pub lfi: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Check that an LFI value lies in the closed unit interval
///
/// A negative zero comes back as `0.0` so that it ties with zero when sorted.
pub fn check_lfi(lfi: f64) -> Result<f64, RejectionReason> {
    if (0.0..=1.0).contains(&lfi) {
        Ok(lfi + 0.0)
    } else {
        Err(RejectionReason::LfiOutOfRange { value: lfi })
    }
}

/// Parse an ISO-8601 timestamp into UTC
///
/// RFC 3339 strings with an offset are always accepted. When
/// `accept_naive` is set, offset-less date-times are read as UTC.
pub fn parse_timestamp(raw: &str, accept_naive: bool) -> Result<DateTime<Utc>, RejectionReason> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if accept_naive {
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(naive.and_utc());
            }
        }
    }
    Err(RejectionReason::InvalidTimestamp {
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_extra_fields_are_collected_as_attributes() {
        let point: TelemetryPoint = serde_json::from_value(json!({
            "district_id": "d1",
            "lfi": 0.4,
            "timestamp": "2024-01-01T00:00:00Z",
            "operator_name": "R. Sharma",
            "device_serial": "KA-0091"
        }))
        .unwrap();

        assert_eq!(point.district_id, "d1");
        assert_eq!(point.attributes.len(), 2);
        assert!(point.attributes.contains_key("operator_name"));
    }

    #[test]
    fn test_integer_lfi_is_accepted() {
        let point: TelemetryPoint = serde_json::from_value(json!({
            "district_id": "d1",
            "lfi": 1,
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(point.lfi, 1.0);
    }

    #[test]
    fn test_check_lfi_bounds() {
        assert!(check_lfi(0.0).is_ok());
        assert!(check_lfi(1.0).is_ok());
        assert!(check_lfi(-0.01).is_err());
        assert!(check_lfi(1.5).is_err());
        assert!(check_lfi(f64::NAN).is_err());
    }

    #[test]
    fn test_check_lfi_folds_negative_zero() {
        let lfi = check_lfi(-0.0).unwrap();
        assert_eq!(lfi, 0.0);
        assert!(lfi.is_sign_positive());
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let ts = parse_timestamp("2024-01-01T05:30:00+05:30", false).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_timestamp_depends_on_flag() {
        assert!(parse_timestamp("2024-03-10T12:00:00", false).is_err());
        let ts = parse_timestamp("2024-03-10T12:00:00", true).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("yesterday", true).unwrap_err();
        assert_eq!(
            err,
            RejectionReason::InvalidTimestamp {
                value: "yesterday".to_string()
            }
        );
    }
}
