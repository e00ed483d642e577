//! Metrics collection and reporting for queue observability.
//!
//! This module provides a pluggable metrics system with a local in-memory
//! implementation by default, but allows users to integrate external metrics
//! systems like Prometheus or OpenTelemetry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A pluggable metrics backend trait.
///
/// Implement this trait to integrate with external metrics systems like
/// Prometheus, OpenTelemetry, or custom monitoring solutions.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Increment a counter metric by the given value
    async fn increment_counter(&self, name: &str, value: u64);

    /// Set a gauge metric to the given value
    async fn set_gauge(&self, name: &str, value: f64);

    /// Record a histogram observation (typically tonnage per admitted entry)
    async fn record_histogram(&self, name: &str, value: f64);

    /// Get current counter value (for testing/debugging)
    async fn get_counter(&self, name: &str) -> Option<u64>;

    /// Get current gauge value (for testing/debugging)
    async fn get_gauge(&self, name: &str) -> Option<f64>;

    /// Get histogram statistics (for testing/debugging)
    async fn get_histogram_stats(&self, name: &str) -> Option<HistogramStats>;

    /// Reset all metrics (useful for testing)
    async fn reset(&self);

    /// Export all metrics as a snapshot
    async fn snapshot(&self) -> MetricsSnapshot;
}

/// Statistics for a histogram metric
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramStats {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Percentile values (p50, p90, p95, p99)
    pub percentiles: HistogramPercentiles,
}

/// Percentile values for histogram
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistogramPercentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Default for HistogramStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::MAX,
            max: f64::MIN,
            mean: 0.0,
            percentiles: HistogramPercentiles::default(),
        }
    }
}

/// Internal histogram data structure that tracks values for percentile calculation
#[derive(Debug, Clone)]
struct HistogramData {
    values: Vec<f64>,
    stats: HistogramStats,
}

impl HistogramData {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            stats: HistogramStats::new(),
        }
    }

    fn record(&mut self, value: f64) {
        self.values.push(value);
        self.stats.count += 1;
        self.stats.sum += value;
        self.stats.min = self.stats.min.min(value);
        self.stats.max = self.stats.max.max(value);
        self.stats.mean = self.stats.sum / self.stats.count as f64;
        self.update_percentiles();
    }

    fn update_percentiles(&mut self) {
        if self.values.is_empty() {
            return;
        }

        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let len = sorted.len();
        self.stats.percentiles.p50 = Self::percentile(&sorted, len, 0.50);
        self.stats.percentiles.p90 = Self::percentile(&sorted, len, 0.90);
        self.stats.percentiles.p95 = Self::percentile(&sorted, len, 0.95);
        self.stats.percentiles.p99 = Self::percentile(&sorted, len, 0.99);
    }

    fn percentile(sorted: &[f64], len: usize, p: f64) -> f64 {
        if len == 0 {
            return 0.0;
        }
        let idx = ((len as f64 * p) as usize).min(len - 1);
        sorted[idx]
    }

    fn stats(&self) -> HistogramStats {
        self.stats.clone()
    }
}

/// Snapshot of all metrics at a point in time
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    pub histograms: HashMap<String, HistogramStats>,
}

/// Local in-memory metrics implementation.
///
/// This is the default metrics backend that stores all metrics in memory.
/// Suitable for development, testing, and single-instance deployments.
pub struct LocalMetrics {
    counters: RwLock<HashMap<String, u64>>,
    gauges: RwLock<HashMap<String, f64>>,
    histograms: RwLock<HashMap<String, HistogramData>>,
}

impl LocalMetrics {
    /// Create a new local metrics instance
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for LocalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsBackend for LocalMetrics {
    async fn increment_counter(&self, name: &str, value: u64) {
        let mut counters = self.counters.write().await;
        *counters.entry(name.to_string()).or_insert(0) += value;
    }

    async fn set_gauge(&self, name: &str, value: f64) {
        let mut gauges = self.gauges.write().await;
        gauges.insert(name.to_string(), value);
    }

    async fn record_histogram(&self, name: &str, value: f64) {
        let mut histograms = self.histograms.write().await;
        histograms
            .entry(name.to_string())
            .or_insert_with(HistogramData::new)
            .record(value);
    }

    async fn get_counter(&self, name: &str) -> Option<u64> {
        let counters = self.counters.read().await;
        counters.get(name).copied()
    }

    async fn get_gauge(&self, name: &str) -> Option<f64> {
        let gauges = self.gauges.read().await;
        gauges.get(name).copied()
    }

    async fn get_histogram_stats(&self, name: &str) -> Option<HistogramStats> {
        let histograms = self.histograms.read().await;
        histograms.get(name).map(|h| h.stats())
    }

    async fn reset(&self) {
        let mut counters = self.counters.write().await;
        let mut gauges = self.gauges.write().await;
        let mut histograms = self.histograms.write().await;
        counters.clear();
        gauges.clear();
        histograms.clear();
    }

    async fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.read().await;
        let gauges = self.gauges.read().await;
        let histograms = self.histograms.read().await;

        MetricsSnapshot {
            counters: counters.clone(),
            gauges: gauges.clone(),
            histograms: histograms
                .iter()
                .map(|(k, v)| (k.clone(), v.stats()))
                .collect(),
        }
    }
}

/// Predefined metric names for queue observability
pub mod metric_names {
    /// Counter: Total entries admitted
    pub const ENTRIES_SUBMITTED: &str = "queue.entries.submitted";
    /// Counter: Total entries rejected at admission (lane closed)
    pub const ENTRIES_REJECTED: &str = "queue.entries.rejected";
    /// Counter: Total entries completed
    pub const ENTRIES_COMPLETED: &str = "queue.entries.completed";
    /// Counter: Total entries cancelled
    pub const ENTRIES_CANCELLED: &str = "queue.entries.cancelled";
    /// Counter: Total settings updates
    pub const SETTINGS_UPDATED: &str = "queue.settings.updated";

    /// Gauge: Lane utilization (current tons / quota tons)
    pub const LANE_UTILIZATION: &str = "queue.lane.utilization";

    /// Histogram: Estimated tonnage of admitted entries
    pub const ENTRY_TONS: &str = "queue.entry.tons";
}

/// Queue metrics collector that wraps a metrics backend
/// and provides convenient methods for queue-specific metrics.
pub struct QueueMetrics {
    backend: Arc<dyn MetricsBackend>,
}

impl QueueMetrics {
    /// Create a new queue metrics collector with the given backend
    pub fn new(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Create a new queue metrics collector with local in-memory backend
    pub fn local() -> Self {
        Self {
            backend: Arc::new(LocalMetrics::new()),
        }
    }

    /// Get the underlying metrics backend
    pub fn backend(&self) -> &Arc<dyn MetricsBackend> {
        &self.backend
    }

    /// Record an admitted entry and its tonnage
    pub async fn record_submit(&self, lane: &str, estimated_tons: f64) {
        self.backend
            .increment_counter(metric_names::ENTRIES_SUBMITTED, 1)
            .await;
        self.backend
            .increment_counter(&format!("{}.{}", metric_names::ENTRIES_SUBMITTED, lane), 1)
            .await;
        self.backend
            .record_histogram(metric_names::ENTRY_TONS, estimated_tons)
            .await;
        self.backend
            .record_histogram(
                &format!("{}.{}", metric_names::ENTRY_TONS, lane),
                estimated_tons,
            )
            .await;
    }

    /// Record an admission rejection (lane closed)
    pub async fn record_rejected(&self, lane: &str) {
        self.backend
            .increment_counter(metric_names::ENTRIES_REJECTED, 1)
            .await;
        self.backend
            .increment_counter(&format!("{}.{}", metric_names::ENTRIES_REJECTED, lane), 1)
            .await;
    }

    /// Record an entry completion
    pub async fn record_completed(&self, lane: &str) {
        self.backend
            .increment_counter(metric_names::ENTRIES_COMPLETED, 1)
            .await;
        self.backend
            .increment_counter(&format!("{}.{}", metric_names::ENTRIES_COMPLETED, lane), 1)
            .await;
    }

    /// Record an entry cancellation
    pub async fn record_cancelled(&self, lane: &str) {
        self.backend
            .increment_counter(metric_names::ENTRIES_CANCELLED, 1)
            .await;
        self.backend
            .increment_counter(&format!("{}.{}", metric_names::ENTRIES_CANCELLED, lane), 1)
            .await;
    }

    /// Record a settings update
    pub async fn record_settings_update(&self) {
        self.backend
            .increment_counter(metric_names::SETTINGS_UPDATED, 1)
            .await;
    }

    /// Update a lane utilization gauge (current tons / quota tons)
    pub async fn set_lane_utilization(&self, lane: &str, utilization: f64) {
        self.backend
            .set_gauge(
                &format!("{}.{}", metric_names::LANE_UTILIZATION, lane),
                utilization,
            )
            .await;
    }

    /// Get a snapshot of all metrics
    pub async fn snapshot(&self) -> MetricsSnapshot {
        self.backend.snapshot().await
    }

    /// Reset all metrics
    pub async fn reset(&self) {
        self.backend.reset().await;
    }
}

impl Clone for QueueMetrics {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}
