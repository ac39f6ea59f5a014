//! Decision signals: explainable alerts surfaced to analysts
//!
//! Candidates arrive with open strings for every enumerated field. A
//! candidate only becomes a [`DecisionSignal`] once every enumeration is
//! inside its closed set and all three explanation fields are present.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RejectionReason;

/// Kind of condition a signal reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Risk,
    Anomaly,
    Coverage,
    Demographic,
}

impl SignalType {
    pub const ALL: [SignalType; 4] = [
        SignalType::Risk,
        SignalType::Anomaly,
        SignalType::Coverage,
        SignalType::Demographic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Risk => "RISK",
            SignalType::Anomaly => "ANOMALY",
            SignalType::Coverage => "COVERAGE",
            SignalType::Demographic => "DEMOGRAPHIC",
        }
    }
}

impl FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RISK" => Ok(SignalType::Risk),
            "ANOMALY" => Ok(SignalType::Anomaly),
            "COVERAGE" => Ok(SignalType::Coverage),
            "DEMOGRAPHIC" => Ok(SignalType::Demographic),
            _ => Err(format!("Unknown signal type: {}", s)),
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal severity; `High` sorts above `Medium` above `Low`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// All severities, most severe first
    pub const ALL: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Severity::High),
            "MEDIUM" => Ok(Severity::Medium),
            "LOW" => Ok(Severity::Low),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of the underlying metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
    #[serde(alias = "STABLE")]
    Flat,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "UP",
            Trend::Down => "DOWN",
            Trend::Flat => "FLAT",
        }
    }
}

impl FromStr for Trend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(Trend::Up),
            "DOWN" => Ok(Trend::Down),
            // older producers spell the flat trend "STABLE"
            "FLAT" | "STABLE" => Ok(Trend::Flat),
            _ => Err(format!("Unknown trend: {}", s)),
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unvalidated signal as produced by an anomaly-detection process
///
/// Every field is optional so that a partially filled record can still be
/// read and then rejected with a precise reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalCandidate {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub signal_type: Option<String>,
    pub title: Option<String>,
    pub district: Option<String>,
    pub severity: Option<String>,
    #[serde(alias = "dataSummary")]
    pub data_summary: Option<String>,
    #[serde(alias = "whyItMatters")]
    pub why_it_matters: Option<String>,
    #[serde(alias = "recommendedAction")]
    pub recommended_action: Option<String>,
    #[serde(alias = "metricValue")]
    pub metric_value: Option<f64>,
    pub trend: Option<String>,
}

impl SignalCandidate {
    /// Identifier as given, even if blank
    pub fn raw_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Check every invariant and produce a validated signal
    ///
    /// Returns the first violated invariant.
    pub fn validate(self) -> Result<DecisionSignal, RejectionReason> {
        let id = required_text("id", self.id)?;
        let signal_type = closed_variant::<SignalType>("type", self.signal_type)?;
        let severity = closed_variant::<Severity>("severity", self.severity)?;
        let trend = closed_variant::<Trend>("trend", self.trend)?;
        let data_summary = required_text("data_summary", self.data_summary)?;
        let why_it_matters = required_text("why_it_matters", self.why_it_matters)?;
        let recommended_action = required_text("recommended_action", self.recommended_action)?;

        let metric_value = match self.metric_value {
            // -0.0 + 0.0 is +0.0
            Some(v) if v.is_finite() => v + 0.0,
            Some(_) => {
                return Err(RejectionReason::NonFiniteMetric {
                    field: "metric_value".to_string(),
                })
            }
            None => {
                return Err(RejectionReason::MissingField {
                    field: "metric_value".to_string(),
                })
            }
        };

        Ok(DecisionSignal {
            id,
            signal_type,
            title: self.title.unwrap_or_default(),
            district: self.district.unwrap_or_default(),
            severity,
            data_summary,
            why_it_matters,
            recommended_action,
            metric_value,
            trend,
        })
    }
}

fn required_text(field: &str, value: Option<String>) -> Result<String, RejectionReason> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(RejectionReason::MissingField {
            field: field.to_string(),
        }),
    }
}

fn closed_variant<T: FromStr>(field: &str, value: Option<String>) -> Result<T, RejectionReason> {
    let raw = value.ok_or_else(|| RejectionReason::MissingField {
        field: field.to_string(),
    })?;
    raw.parse::<T>().map_err(|_| RejectionReason::UnknownVariant {
        field: field.to_string(),
        value: raw,
    })
}

/// A validated, read-only decision signal
///
/// Deserializing goes through [`SignalCandidate::validate`], so an invalid
/// signal can never be materialized from JSON either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignalCandidate")]
pub struct DecisionSignal {
    pub id: String,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub title: String,
    pub district: String,
    pub severity: Severity,
    pub data_summary: String,
    pub why_it_matters: String,
    pub recommended_action: String,
    pub metric_value: f64,
    pub trend: Trend,
}

impl TryFrom<SignalCandidate> for DecisionSignal {
    type Error = RejectionReason;

    fn try_from(candidate: SignalCandidate) -> Result<Self, Self::Error> {
        candidate.validate()
    }
}

impl From<DecisionSignal> for SignalCandidate {
    fn from(signal: DecisionSignal) -> Self {
        Self {
            id: Some(signal.id),
            signal_type: Some(signal.signal_type.as_str().to_string()),
            title: Some(signal.title),
            district: Some(signal.district),
            severity: Some(signal.severity.as_str().to_string()),
            data_summary: Some(signal.data_summary),
            why_it_matters: Some(signal.why_it_matters),
            recommended_action: Some(signal.recommended_action),
            metric_value: Some(signal.metric_value),
            trend: Some(signal.trend.as_str().to_string()),
        }
    }
}
