//! Data model for telemetry, district watchlist entries and decision signals

pub mod district;
pub mod signal;
pub mod telemetry;

pub use district::{DistrictRiskEntry, RiskBands, RiskCategory};
pub use signal::{DecisionSignal, Severity, SignalCandidate, SignalType, Trend};
pub use telemetry::{AnonymizedPoint, TelemetryPoint};
