//! District watchlist entries and the LFI risk bands

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Risk category of a district, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    #[serde(rename = "Medium-High")]
    MediumHigh,
    High,
    Critical,
}

impl RiskCategory {
    /// All categories, most severe first
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::Critical,
        RiskCategory::High,
        RiskCategory::MediumHigh,
        RiskCategory::Medium,
        RiskCategory::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::MediumHigh => "Medium-High",
            RiskCategory::High => "High",
            RiskCategory::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (inclusive) of each risk band
///
/// Anything below `medium` is `Low`. Thresholds must be strictly
/// descending from `critical` to `medium`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBands {
    pub critical: f64,
    pub high: f64,
    pub medium_high: f64,
    pub medium: f64,
}

impl Default for RiskBands {
    fn default() -> Self {
        Self::standard()
    }
}

impl RiskBands {
    /// The watchlist thresholds: 0.85 / 0.70 / 0.55 / 0.40
    pub const fn standard() -> Self {
        Self {
            critical: 0.85,
            high: 0.70,
            medium_high: 0.55,
            medium: 0.40,
        }
    }

    /// Map an LFI value to its category
    pub fn classify(&self, lfi: f64) -> RiskCategory {
        if lfi >= self.critical {
            RiskCategory::Critical
        } else if lfi >= self.high {
            RiskCategory::High
        } else if lfi >= self.medium_high {
            RiskCategory::MediumHigh
        } else if lfi >= self.medium {
            RiskCategory::Medium
        } else {
            RiskCategory::Low
        }
    }

    /// Reject tables that would make the mapping non-monotonic
    pub fn validate(&self) -> Result<()> {
        let thresholds = [self.critical, self.high, self.medium_high, self.medium];
        if thresholds.iter().any(|t| !(0.0..=1.0).contains(t)) {
            return Err(CoreError::config(format!(
                "risk band thresholds must lie in [0, 1], got {:?}",
                thresholds
            )));
        }
        if thresholds.windows(2).any(|w| w[0] <= w[1]) {
            return Err(CoreError::config(format!(
                "risk band thresholds must be strictly descending, got {:?}",
                thresholds
            )));
        }
        Ok(())
    }
}

/// Wire shape of a district entry; any `risk` sent by a caller is ignored
#[derive(Debug, Clone, Deserialize)]
struct DistrictReading {
    id: String,
    #[serde(default)]
    name: Option<String>,
    lfi: f64,
}

impl From<DistrictReading> for DistrictRiskEntry {
    fn from(reading: DistrictReading) -> Self {
        let name = reading.name.unwrap_or_else(|| reading.id.clone());
        DistrictRiskEntry::new(reading.id, name, reading.lfi)
    }
}

/// One row of the district watchlist
///
/// `risk` is always derived from `lfi`; there is no way to set it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DistrictReading")]
pub struct DistrictRiskEntry {
    pub id: String,
    pub name: String,
    pub lfi: f64,
    risk: RiskCategory,
}

impl DistrictRiskEntry {
    /// Create an entry classified with the standard bands
    pub fn new(id: impl Into<String>, name: impl Into<String>, lfi: f64) -> Self {
        Self::with_bands(id, name, lfi, &RiskBands::standard())
    }

    /// Create an entry classified with a custom band table
    pub fn with_bands(
        id: impl Into<String>,
        name: impl Into<String>,
        lfi: f64,
        bands: &RiskBands,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lfi,
            risk: bands.classify(lfi),
        }
    }

    /// Derived risk category
    pub fn risk(&self) -> RiskCategory {
        self.risk
    }

    pub(crate) fn reclassify(&mut self, bands: &RiskBands) {
        self.risk = bands.classify(self.lfi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_band_edges() {
        let bands = RiskBands::standard();
        assert_eq!(bands.classify(1.0), RiskCategory::Critical);
        assert_eq!(bands.classify(0.85), RiskCategory::Critical);
        assert_eq!(bands.classify(0.8499), RiskCategory::High);
        assert_eq!(bands.classify(0.70), RiskCategory::High);
        assert_eq!(bands.classify(0.6999), RiskCategory::MediumHigh);
        assert_eq!(bands.classify(0.55), RiskCategory::MediumHigh);
        assert_eq!(bands.classify(0.5499), RiskCategory::Medium);
        assert_eq!(bands.classify(0.40), RiskCategory::Medium);
        assert_eq!(bands.classify(0.3999), RiskCategory::Low);
        assert_eq!(bands.classify(0.0), RiskCategory::Low);
    }

    #[test]
    fn test_category_serializes_with_hyphen() {
        assert_eq!(
            serde_json::to_value(RiskCategory::MediumHigh).unwrap(),
            json!("Medium-High")
        );
        assert_eq!(RiskCategory::MediumHigh.to_string(), "Medium-High");
    }

    #[test]
    fn test_category_ordering() {
        assert!(RiskCategory::Critical > RiskCategory::High);
        assert!(RiskCategory::MediumHigh > RiskCategory::Medium);
        assert!(RiskCategory::Medium > RiskCategory::Low);
    }

    #[test]
    fn test_supplied_risk_is_ignored_on_deserialize() {
        // Bellary arrives labelled "High" but 0.85 is Critical
        let entry: DistrictRiskEntry = serde_json::from_value(json!({
            "id": "d1",
            "name": "Bellary",
            "lfi": 0.85,
            "risk": "High"
        }))
        .unwrap();
        assert_eq!(entry.risk(), RiskCategory::Critical);
    }

    #[test]
    fn test_missing_name_defaults_to_id() {
        let entry: DistrictRiskEntry =
            serde_json::from_value(json!({"id": "d7", "lfi": 0.2})).unwrap();
        assert_eq!(entry.name, "d7");
        assert_eq!(entry.risk(), RiskCategory::Low);
    }

    #[test]
    fn test_band_validation() {
        assert!(RiskBands::standard().validate().is_ok());

        let flat = RiskBands {
            critical: 0.7,
            high: 0.7,
            medium_high: 0.5,
            medium: 0.3,
        };
        assert!(flat.validate().is_err());

        let out_of_range = RiskBands {
            critical: 1.2,
            ..RiskBands::standard()
        };
        assert!(out_of_range.validate().is_err());
    }
}
