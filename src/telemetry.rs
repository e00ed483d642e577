//! OpenTelemetry telemetry for the palm queue engine.
//!
//! Provides structured spans, attribute constants, and an `OtelMetricsBackend`
//! that bridges the existing `MetricsBackend` trait to OpenTelemetry instruments.

use crate::metrics::{HistogramStats, MetricsBackend, MetricsSnapshot};
use async_trait::async_trait;
use dashmap::DashMap;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram, UpDownCounter};
use opentelemetry::KeyValue;
use std::sync::OnceLock;

// ============================================================================
// Span Constants
// ============================================================================

/// Span for submitting an entry into a lane
pub const SPAN_QUEUE_SUBMIT: &str = "palm.queue.submit";

/// Span for computing the derived lane views
pub const SPAN_QUEUE_LANES: &str = "palm.queue.lanes";

/// Span for a settings update
pub const SPAN_QUEUE_SETTINGS_UPDATE: &str = "palm.queue.settings_update";

/// Span for an entry status transition
pub const SPAN_QUEUE_STATUS_CHANGE: &str = "palm.queue.status_change";

// ============================================================================
// Attribute Constants
// ============================================================================

/// Factory identifier attribute
pub const ATTR_FACTORY_ID: &str = "palm.queue.factory_id";

/// Lane identifier attribute
pub const ATTR_LANE: &str = "palm.queue.lane";

/// Entry identifier attribute
pub const ATTR_ENTRY_ID: &str = "palm.queue.entry_id";

/// Assigned queue number
pub const ATTR_QUEUE_NUMBER: &str = "palm.queue.queue_number";

/// Estimated tonnage of the load
pub const ATTR_ESTIMATED_TONS: &str = "palm.queue.estimated_tons";

// ============================================================================
// Standalone Metrics (OnceLock pattern)
// ============================================================================

static METRICS: OnceLock<QueueMetricsRecorder> = OnceLock::new();

/// Holds OpenTelemetry metric instruments for queue-level observability.
pub struct QueueMetricsRecorder {
    /// Total entries admitted
    pub entries_submitted_total: Counter<u64>,
    /// Total entries rejected at admission
    pub entries_rejected_total: Counter<u64>,
    /// Total entries completed
    pub entries_completed_total: Counter<u64>,
    /// Estimated tonnage of admitted entries
    pub entry_tons: Histogram<f64>,
}

/// Get the global queue metrics recorder (None if not initialized).
pub fn metrics() -> Option<&'static QueueMetricsRecorder> {
    METRICS.get()
}

/// Initialize queue metrics using the global OpenTelemetry meter provider.
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_queue_metrics() {
    let meter = global::meter("palm-queue");

    let recorder = QueueMetricsRecorder {
        entries_submitted_total: meter
            .u64_counter("palm_queue_entries_submitted_total")
            .with_description("Total entries admitted into lanes")
            .init(),
        entries_rejected_total: meter
            .u64_counter("palm_queue_entries_rejected_total")
            .with_description("Total entries rejected because their lane was closed")
            .init(),
        entries_completed_total: meter
            .u64_counter("palm_queue_entries_completed_total")
            .with_description("Total entries marked completed")
            .init(),
        entry_tons: meter
            .f64_histogram("palm_queue_entry_tons")
            .with_description("Estimated tonnage of admitted entries")
            .init(),
    };

    let _ = METRICS.set(recorder);
}

/// Record an admitted entry. No-op if metrics are not initialized.
pub fn record_submit(lane: &str, estimated_tons: f64) {
    if let Some(m) = metrics() {
        let lane_attr = KeyValue::new("lane", lane.to_string());
        m.entries_submitted_total
            .add(1, std::slice::from_ref(&lane_attr));
        m.entry_tons
            .record(estimated_tons, std::slice::from_ref(&lane_attr));
    }
}

/// Record an admission rejection. No-op if metrics are not initialized.
pub fn record_reject(lane: &str) {
    if let Some(m) = metrics() {
        m.entries_rejected_total
            .add(1, &[KeyValue::new("lane", lane.to_string())]);
    }
}

/// Record an entry completion. No-op if metrics are not initialized.
pub fn record_complete(lane: &str) {
    if let Some(m) = metrics() {
        m.entries_completed_total
            .add(1, &[KeyValue::new("lane", lane.to_string())]);
    }
}

// ============================================================================
// OtelMetricsBackend — bridges MetricsBackend trait to OpenTelemetry
// ============================================================================

/// OpenTelemetry implementation of the `MetricsBackend` trait.
///
/// Uses lazy instrument creation via `DashMap` since the trait accepts
/// arbitrary metric names. Push-based methods (`get_counter`, `snapshot`)
/// return `None`/empty since OTLP is push-only.
pub struct OtelMetricsBackend {
    meter: opentelemetry::metrics::Meter,
    counters: DashMap<String, Counter<u64>>,
    histograms: DashMap<String, Histogram<f64>>,
    gauges: DashMap<String, UpDownCounter<i64>>,
}

impl OtelMetricsBackend {
    /// Create a new OtelMetricsBackend using the global meter provider.
    pub fn new() -> Self {
        Self {
            meter: global::meter("palm-queue"),
            counters: DashMap::new(),
            histograms: DashMap::new(),
            gauges: DashMap::new(),
        }
    }

    fn get_or_create_counter(&self, name: &str) -> Counter<u64> {
        if let Some(c) = self.counters.get(name) {
            return c.clone();
        }
        let owned = name.to_string();
        let counter = self.meter.u64_counter(owned.clone()).init();
        self.counters.insert(owned, counter.clone());
        counter
    }

    fn get_or_create_histogram(&self, name: &str) -> Histogram<f64> {
        if let Some(h) = self.histograms.get(name) {
            return h.clone();
        }
        let owned = name.to_string();
        let histogram = self.meter.f64_histogram(owned.clone()).init();
        self.histograms.insert(owned, histogram.clone());
        histogram
    }

    fn get_or_create_gauge(&self, name: &str) -> UpDownCounter<i64> {
        if let Some(g) = self.gauges.get(name) {
            return g.clone();
        }
        let owned = name.to_string();
        let gauge = self.meter.i64_up_down_counter(owned.clone()).init();
        self.gauges.insert(owned, gauge.clone());
        gauge
    }
}

impl Default for OtelMetricsBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsBackend for OtelMetricsBackend {
    async fn increment_counter(&self, name: &str, value: u64) {
        let counter = self.get_or_create_counter(name);
        counter.add(value, &[]);
    }

    async fn set_gauge(&self, name: &str, value: f64) {
        // UpDownCounter requires delta; for simplicity, we add the value as a delta.
        // This is an approximation — OTLP gauge semantics differ from set-to-value.
        let gauge = self.get_or_create_gauge(name);
        gauge.add(value as i64, &[]);
    }

    async fn record_histogram(&self, name: &str, value: f64) {
        let histogram = self.get_or_create_histogram(name);
        histogram.record(value, &[]);
    }

    async fn get_counter(&self, _name: &str) -> Option<u64> {
        // OTLP is push-only; pull-based reads are not supported
        None
    }

    async fn get_gauge(&self, _name: &str) -> Option<f64> {
        // OTLP is push-only
        None
    }

    async fn get_histogram_stats(&self, _name: &str) -> Option<HistogramStats> {
        // OTLP is push-only
        None
    }

    async fn reset(&self) {
        // No-op for OTLP (instruments are long-lived)
    }

    async fn snapshot(&self) -> MetricsSnapshot {
        // OTLP is push-only; return empty snapshot
        MetricsSnapshot::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
