//! Queue monitor for tracking lane utilization and health

#[cfg(feature = "metrics")]
use crate::metrics::QueueMetrics;
use crate::queue::PalmQueue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Queue monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Monitoring interval
    pub interval: Duration,
    /// Warn once a lane's `current_tons / daily_quota_tons` reaches this ratio
    pub utilization_warning_ratio: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            utilization_warning_ratio: 0.8,
        }
    }
}

/// Queue monitor
///
/// Periodically recomputes the lane views of a watched set of factories for
/// the current day, logs their state, and warns about lanes that are closed
/// or nearing their quota.
pub struct QueueMonitor {
    queue: Arc<PalmQueue>,
    factories: Vec<String>,
    config: MonitorConfig,
    #[cfg(feature = "metrics")]
    metrics: Option<QueueMetrics>,
}

impl QueueMonitor {
    /// Create a new queue monitor watching the given factories
    pub fn new(queue: Arc<PalmQueue>, factories: Vec<String>) -> Self {
        Self::with_config(queue, factories, MonitorConfig::default())
    }

    /// Create a new queue monitor with custom configuration
    pub fn with_config(
        queue: Arc<PalmQueue>,
        factories: Vec<String>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            queue,
            factories,
            config,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Publish lane utilization gauges through the given collector
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: QueueMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Start monitoring
    pub async fn start(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.interval);

        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                self.check_lanes().await;
            }
        });
    }

    /// Check lane health for all watched factories
    async fn check_lanes(&self) {
        let today = self.queue.clock().today();

        for factory_id in &self.factories {
            let lanes = self.queue.lanes(factory_id, today).await;

            for lane in &lanes {
                let utilization = if lane.daily_quota_tons > 0.0 {
                    lane.current_tons / lane.daily_quota_tons
                } else {
                    1.0
                };

                debug!(
                    factory_id = %factory_id,
                    lane = %lane.lane_type,
                    current_tons = lane.current_tons,
                    quota_tons = lane.daily_quota_tons,
                    waiting = lane.entries_count,
                    "lane state"
                );

                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics
                        .set_lane_utilization(
                            &format!("{}.{}", factory_id, lane.lane_type),
                            utilization,
                        )
                        .await;
                }

                if !lane.is_open {
                    warn!(
                        factory_id = %factory_id,
                        lane = %lane.lane_type,
                        current_tons = lane.current_tons,
                        quota_tons = lane.daily_quota_tons,
                        "lane closed, daily quota reached"
                    );
                } else if utilization >= self.config.utilization_warning_ratio {
                    warn!(
                        factory_id = %factory_id,
                        lane = %lane.lane_type,
                        utilization = format!("{:.0}%", utilization * 100.0).as_str(),
                        "lane nearing daily quota"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::config::SettingsUpdate;
    use crate::entry::{EntryRequest, LaneType};
    use crate::event::EventEmitter;
    use chrono::NaiveDate;

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    /// Helper: engine pinned to 2025-06-01
    fn make_queue() -> Arc<PalmQueue> {
        let clock = Arc::new(FixedClock::at_midnight(june_first()));
        Arc::new(PalmQueue::with_clock(
            EventEmitter::new(100),
            clock as Arc<dyn Clock>,
        ))
    }

    // ========================================================================
    // MonitorConfig Tests
    // ========================================================================

    #[test]
    fn test_monitor_config_default() {
        let config = MonitorConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.utilization_warning_ratio, 0.8);
    }

    #[test]
    fn test_monitor_config_custom() {
        let config = MonitorConfig {
            interval: Duration::from_secs(5),
            utilization_warning_ratio: 0.5,
        };
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.utilization_warning_ratio, 0.5);
    }

    #[test]
    fn test_monitor_config_debug() {
        let config = MonitorConfig::default();
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("MonitorConfig"));
        assert!(debug_str.contains("utilization_warning_ratio"));
    }

    // ========================================================================
    // check_lanes() Tests
    // ========================================================================

    #[tokio::test]
    async fn test_check_lanes_empty_queue() {
        let queue = make_queue();
        let monitor = QueueMonitor::new(queue, vec!["f1".to_string()]);

        // Should not panic with no entries and default settings
        monitor.check_lanes().await;
    }

    #[tokio::test]
    async fn test_check_lanes_with_closed_lane() {
        let queue = make_queue();

        queue
            .update_settings(SettingsUpdate::new("f1", 100.0, 10, 70, 20))
            .await;
        queue
            .submit(EntryRequest::new(
                "f1",
                LaneType::Farmer,
                "Somchai",
                "81-2345",
                10.0,
            ))
            .await
            .unwrap();

        let monitor = QueueMonitor::new(queue, vec!["f1".to_string()]);

        // Should not panic, just emit the warning log
        monitor.check_lanes().await;
    }

    #[tokio::test]
    async fn test_check_lanes_multiple_factories() {
        let queue = make_queue();
        let monitor = QueueMonitor::new(
            queue,
            vec!["f1".to_string(), "f2".to_string(), "f3".to_string()],
        );

        monitor.check_lanes().await;
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn test_check_lanes_publishes_utilization_gauges() {
        use crate::metrics::metric_names;

        let queue = make_queue();
        queue
            .submit(EntryRequest::new(
                "f1",
                LaneType::Farmer,
                "Somchai",
                "81-2345",
                25.0,
            ))
            .await
            .unwrap();

        let metrics = QueueMetrics::local();
        let monitor =
            QueueMonitor::new(queue, vec!["f1".to_string()]).with_metrics(metrics.clone());

        monitor.check_lanes().await;

        // Farmer lane: 25 of 50 tons
        let snapshot = metrics.snapshot().await;
        assert_eq!(
            snapshot
                .gauges
                .get(&format!("{}.f1.farmer", metric_names::LANE_UTILIZATION)),
            Some(&0.5)
        );
    }

    // ========================================================================
    // start() Tests
    // ========================================================================

    #[tokio::test]
    async fn test_monitor_start_runs_periodically() {
        let queue = make_queue();
        let config = MonitorConfig {
            interval: Duration::from_millis(20),
            utilization_warning_ratio: 0.8,
        };
        let monitor = Arc::new(QueueMonitor::with_config(
            Arc::clone(&queue),
            vec!["f1".to_string()],
            config,
        ));

        Arc::clone(&monitor).start().await;

        // Let the monitor run a few cycles; the queue stays usable
        tokio::time::sleep(Duration::from_millis(80)).await;

        let lanes = queue.lanes("f1", june_first()).await;
        assert!(lanes[0].is_open);
    }
}
