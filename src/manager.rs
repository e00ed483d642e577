//! Queue manager provides the high-level API surface
//!
//! The manager is the boundary layer: it validates inputs before any state
//! mutation (the core store is deliberately permissive), optionally checks
//! factory ids against a directory, and records metrics. HTTP layers should
//! translate its typed errors: `Validation` to 400, `LaneClosed` to a
//! "quota full" response, the not-found variants to 404.

use crate::clock::Clock;
use crate::config::{QuotaSettings, SettingsUpdate};
use crate::directory::FactoryDirectory;
use crate::entry::{EntryRequest, EntryStatus, LaneType, QueueEntry};
use crate::error::{QueueError, Result};
use crate::event::EventEmitter;
#[cfg(feature = "metrics")]
use crate::metrics::QueueMetrics;
use crate::queue::{LaneSnapshot, PalmQueue};
use crate::QueueStats;
use chrono::NaiveDate;
use std::sync::Arc;

/// Queue manager
pub struct QueueManager {
    queue: Arc<PalmQueue>,
    #[cfg(feature = "metrics")]
    metrics: Option<QueueMetrics>,
    directory: Option<Arc<dyn FactoryDirectory>>,
}

impl QueueManager {
    /// Create a new queue manager
    pub(crate) fn new(queue: Arc<PalmQueue>) -> Self {
        Self {
            queue,
            #[cfg(feature = "metrics")]
            metrics: None,
            directory: None,
        }
    }

    /// Settings for a factory and day; the hardcoded default when none stored
    pub async fn settings(&self, factory_id: &str, date: NaiveDate) -> QuotaSettings {
        self.queue.settings(factory_id, date).await
    }

    /// Validate and write new quota settings
    ///
    /// The three lane percentages must sum to exactly 100 and the total must
    /// be positive; a rejected update leaves any prior record unchanged. The
    /// write always targets the current day (see [`PalmQueue::update_settings`]).
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<QuotaSettings> {
        update.validate()?;
        self.ensure_factory(&update.factory_id).await?;

        let record = self.queue.update_settings(update).await;

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_settings_update().await;
        }

        Ok(record)
    }

    /// Derived lane views in fixed order (farmer, booking, walkin)
    pub async fn lanes(&self, factory_id: &str, date: NaiveDate) -> [LaneSnapshot; 3] {
        self.queue.lanes(factory_id, date).await
    }

    /// Entries for a factory and day, optionally filtered to one lane
    pub async fn entries(
        &self,
        factory_id: &str,
        date: NaiveDate,
        lane_type: Option<LaneType>,
    ) -> Vec<QueueEntry> {
        self.queue.entries(factory_id, date, lane_type).await
    }

    /// Look up a single entry by id
    pub async fn entry(&self, id: &str) -> Result<QueueEntry> {
        self.queue
            .entry(id)
            .await
            .ok_or_else(|| QueueError::EntryNotFound(id.to_string()))
    }

    /// Validate and submit a new entry against its lane for today
    ///
    /// Returns the admitted entry with its assigned queue number, or
    /// [`QueueError::LaneClosed`] when the lane's quota is full.
    pub async fn submit(&self, request: EntryRequest) -> Result<QueueEntry> {
        request.validate()?;
        self.ensure_factory(&request.factory_id).await?;

        #[cfg(feature = "metrics")]
        let lane = request.lane_type;

        let result = self.queue.submit(request).await;

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(entry) => {
                    metrics
                        .record_submit(lane.as_str(), entry.estimated_tons)
                        .await
                }
                Err(QueueError::LaneClosed(_)) => metrics.record_rejected(lane.as_str()).await,
                Err(_) => {}
            }
        }

        result
    }

    /// Move an entry to a new lifecycle status
    pub async fn set_status(&self, id: &str, status: EntryStatus) -> Result<QueueEntry> {
        let updated = self.queue.set_status(id, status).await?;

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            match status {
                EntryStatus::Completed => {
                    metrics.record_completed(updated.lane_type.as_str()).await
                }
                EntryStatus::Cancelled => {
                    metrics.record_cancelled(updated.lane_type.as_str()).await
                }
                _ => {}
            }
        }

        Ok(updated)
    }

    /// Aggregate queue statistics for a factory and day
    pub async fn stats(&self, factory_id: &str, date: NaiveDate) -> anyhow::Result<QueueStats> {
        let lanes = self.queue.lanes(factory_id, date).await;

        let mut total_quota_tons = 0.0;
        let mut total_current_tons = 0.0;
        let mut total_waiting = 0;

        for lane in &lanes {
            total_quota_tons += lane.daily_quota_tons;
            total_current_tons += lane.current_tons;
            total_waiting += lane.entries_count;
        }

        Ok(QueueStats {
            factory_id: factory_id.to_string(),
            date,
            total_quota_tons,
            total_current_tons,
            total_waiting,
            lanes,
        })
    }

    /// Get the underlying queue engine
    pub fn queue(&self) -> Arc<PalmQueue> {
        Arc::clone(&self.queue)
    }

    /// Get the metrics collector (if configured)
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> Option<&QueueMetrics> {
        self.metrics.as_ref()
    }

    async fn ensure_factory(&self, factory_id: &str) -> Result<()> {
        if let Some(directory) = &self.directory {
            if !directory.contains(factory_id).await {
                return Err(QueueError::FactoryNotFound(factory_id.to_string()));
            }
        }
        Ok(())
    }
}

/// Queue manager builder provides a high-level API for wiring the engine
pub struct QueueManagerBuilder {
    event_emitter: EventEmitter,
    clock: Option<Arc<dyn Clock>>,
    #[cfg(feature = "metrics")]
    metrics: Option<QueueMetrics>,
    directory: Option<Arc<dyn FactoryDirectory>>,
}

impl QueueManagerBuilder {
    /// Create a new queue manager builder
    pub fn new(event_emitter: EventEmitter) -> Self {
        Self {
            event_emitter,
            clock: None,
            #[cfg(feature = "metrics")]
            metrics: None,
            directory: None,
        }
    }

    /// Inject a clock (tests pin the day boundary through this)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Add metrics collection
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: QueueMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Add a factory directory; mutating calls then reject unknown factory ids
    ///
    /// Without a directory the engine trusts any factory id it is given.
    pub fn with_directory(mut self, directory: Arc<dyn FactoryDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Build the queue manager
    pub fn build(self) -> QueueManager {
        let queue = match self.clock {
            Some(clock) => Arc::new(PalmQueue::with_clock(self.event_emitter, clock)),
            None => Arc::new(PalmQueue::new(self.event_emitter)),
        };

        QueueManager {
            queue,
            #[cfg(feature = "metrics")]
            metrics: self.metrics,
            directory: self.directory,
        }
    }
}
