//! Prometheus metrics for pipeline runs
//!
//! - `aldpi_points_total{result}` (counter) - telemetry points accepted/rejected
//! - `aldpi_signals_total{result}` (counter) - signal candidates selected/dropped/filtered
//! - `aldpi_districts_ranked_total{risk}` (counter) - ranked entries by category
//! - `aldpi_rejections_total{reason}` (counter) - per-record rejections by reason code
//! - `aldpi_operation_duration_seconds{operation}` (histogram)
//!
//! # Example
//!
//! ```rust
//! use aldpi_cli::telemetry::PipelineMetricsRegistry;
//!
//! let registry = PipelineMetricsRegistry::new().unwrap();
//! {
//!     let _timer = registry.pipeline().start_timer("rank");
//! }
//! assert!(registry.encode_text().unwrap().contains("aldpi_operation_duration_seconds"));
//! ```

use aldpi_core::{DistrictRanking, NormalizationResult, RecordRejection, ScoreReport, SignalSelection};
use prometheus::{Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;
use std::time::Instant;

use super::{Result, TelemetryError};

const NAMESPACE: &str = "aldpi";

/// Pipeline metrics for Prometheus
pub struct PipelineMetrics {
    points_total: CounterVec,
    signals_total: CounterVec,
    districts_ranked_total: CounterVec,
    rejections_total: CounterVec,
    duration_seconds: HistogramVec,
    active_operations: Gauge,
    events_written_total: Counter,
    events_failed_total: Counter,
}

impl PipelineMetrics {
    /// Create the metrics and register them with `registry`
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let points_total = CounterVec::new(
            Opts::new("points_total", "Telemetry points seen by the normalizer")
                .namespace(NAMESPACE),
            &["result"],
        )?;

        let signals_total = CounterVec::new(
            Opts::new("signals_total", "Signal candidates seen by the ranking engine")
                .namespace(NAMESPACE),
            &["result"],
        )?;

        let districts_ranked_total = CounterVec::new(
            Opts::new("districts_ranked_total", "Districts placed on the watchlist")
                .namespace(NAMESPACE),
            &["risk"],
        )?;

        let rejections_total = CounterVec::new(
            Opts::new("rejections_total", "Records rejected, by reason")
                .namespace(NAMESPACE),
            &["reason"],
        )?;

        let duration_seconds = HistogramVec::new(
            HistogramOpts::new("operation_duration_seconds", "Pipeline operation duration in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["operation"],
        )?;

        let active_operations = Gauge::new(
            "aldpi_active_operations",
            "Pipeline operations currently in progress",
        )?;

        let events_written_total = Counter::new(
            "aldpi_events_written_total",
            "Pipeline events appended to the event log",
        )?;

        let events_failed_total = Counter::new(
            "aldpi_events_failed_total",
            "Pipeline events that could not be written",
        )?;

        registry.register(Box::new(points_total.clone()))?;
        registry.register(Box::new(signals_total.clone()))?;
        registry.register(Box::new(districts_ranked_total.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;
        registry.register(Box::new(duration_seconds.clone()))?;
        registry.register(Box::new(active_operations.clone()))?;
        registry.register(Box::new(events_written_total.clone()))?;
        registry.register(Box::new(events_failed_total.clone()))?;

        Ok(Self {
            points_total,
            signals_total,
            districts_ranked_total,
            rejections_total,
            duration_seconds,
            active_operations,
            events_written_total,
            events_failed_total,
        })
    }

    fn record_rejections(&self, rejections: &[RecordRejection]) {
        for rejection in rejections {
            self.rejections_total
                .with_label_values(&[rejection.reason.code()])
                .inc();
        }
    }

    /// Record a normalizer batch
    pub fn record_normalization(&self, result: &NormalizationResult) {
        self.points_total
            .with_label_values(&["accepted"])
            .inc_by(result.accepted_count as f64);
        self.points_total
            .with_label_values(&["rejected"])
            .inc_by(result.rejected_count as f64);
        self.record_rejections(&result.rejections);
    }

    /// Record a ranked watchlist
    pub fn record_ranking(&self, ranking: &DistrictRanking) {
        for (risk, count) in &ranking.by_category {
            self.districts_ranked_total
                .with_label_values(&[risk.as_str()])
                .inc_by(*count as f64);
        }
        self.record_rejections(&ranking.rejections);
    }

    /// Record a scored district batch
    pub fn record_scoring(&self, report: &ScoreReport) {
        for (risk, count) in &report.by_category {
            self.districts_ranked_total
                .with_label_values(&[risk.as_str()])
                .inc_by(*count as f64);
        }
        self.record_rejections(&report.rejections);
    }

    /// Record a signal feed selection
    pub fn record_selection(&self, selection: &SignalSelection) {
        self.signals_total
            .with_label_values(&["selected"])
            .inc_by(selection.signals.len() as f64);
        self.signals_total
            .with_label_values(&["dropped"])
            .inc_by(selection.dropped_count as f64);
        self.signals_total
            .with_label_values(&["filtered"])
            .inc_by(selection.filtered_count as f64);
        self.record_rejections(&selection.rejections);
    }

    pub fn observe_duration(&self, operation: &str, duration_secs: f64) {
        self.duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn record_event_written(&self) {
        self.events_written_total.inc();
    }

    pub fn record_event_failed(&self) {
        self.events_failed_total.inc();
    }

    /// Start an operation timer (records duration on drop)
    pub fn start_timer(&self, operation: &str) -> OperationTimer<'_> {
        self.active_operations.inc();
        OperationTimer {
            start: Instant::now(),
            operation: operation.to_string(),
            metrics: self,
        }
    }
}

/// RAII guard for timing pipeline operations
pub struct OperationTimer<'a> {
    start: Instant,
    operation: String,
    metrics: &'a PipelineMetrics,
}

impl<'a> OperationTimer<'a> {
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl<'a> Drop for OperationTimer<'a> {
    fn drop(&mut self) {
        self.metrics
            .observe_duration(&self.operation, self.start.elapsed().as_secs_f64());
        self.metrics.active_operations.dec();
    }
}

/// Registry owning the pipeline metrics
pub struct PipelineMetricsRegistry {
    registry: Arc<Registry>,
    pipeline: PipelineMetrics,
}

impl PipelineMetricsRegistry {
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Create with an existing Prometheus registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let pipeline = PipelineMetrics::new(Arc::clone(&registry))?;
        Ok(Self { registry, pipeline })
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn pipeline(&self) -> &PipelineMetrics {
        &self.pipeline
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// Encode metrics in the Prometheus text format
    pub fn encode_text(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| TelemetryError::MetricsError(prometheus::Error::Msg(e.to_string())))
    }
}
