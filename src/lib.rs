//! # Palm Queue
//!
//! Daily intake quota allocation and queue management for palm-oil factories.
//!
//! ## Core (always compiled)
//!
//! - Per-factory, per-day quota settings split across three fixed lanes
//!   (farmer / booking / walkin), with a sane default for unconfigured
//!   factories
//! - Append-only entry ledger with 1-based queue numbers per (factory, lane,
//!   day), resetting every calendar day
//! - Derived-on-read lane views (quota, accumulated tonnage, open/closed
//!   state, waiting count) that can never drift from the ledger
//! - Admission control that rejects entries into lanes at or over quota,
//!   serialized per bucket so concurrent submissions stay consistent
//! - Event system for queue lifecycle notifications
//! - Injectable clock for deterministic day boundaries in tests
//!
//! ## Feature Flags
//!
//! | Feature | Default | Dependencies | Description |
//! |---------|---------|-------------|-------------|
//! | `metrics` | ✅ | — | `MetricsBackend` trait, `LocalMetrics`, tonnage histograms |
//! | `monitoring` | ✅ | `metrics` | `QueueMonitor` with lane-utilization warnings |
//! | `telemetry` | ✅ | `opentelemetry`, `dashmap` | OpenTelemetry instruments and `OtelMetricsBackend` |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use palm_queue::{EntryRequest, EventEmitter, LaneType, QueueManagerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = QueueManagerBuilder::new(EventEmitter::new(100)).build();
//!
//!     let today = manager.queue().clock().today();
//!
//!     // Defaults apply until the factory stores its own split
//!     let lanes = manager.lanes("f1", today).await;
//!     println!("farmer lane quota: {} tons", lanes[0].daily_quota_tons);
//!
//!     let entry = manager
//!         .submit(EntryRequest::new("f1", LaneType::Farmer, "Somchai", "81-2345", 4.5))
//!         .await?;
//!     println!("queue number: {}", entry.queue_number);
//!     Ok(())
//! }
//! ```

// Core modules (always compiled)
pub mod clock;
pub mod config;
pub mod directory;
pub mod distance;
pub mod entry;
pub mod error;
pub mod event;
pub mod manager;
pub mod queue;

// Feature-gated modules
#[cfg(feature = "metrics")]
pub mod metrics;
#[cfg(feature = "monitoring")]
pub mod monitor;
#[cfg(feature = "telemetry")]
pub mod telemetry;

// Core re-exports
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    QuotaSettings, SettingsUpdate, DEFAULT_BOOKING_PERCENT, DEFAULT_FARMER_PERCENT,
    DEFAULT_TOTAL_QUOTA_TONS, DEFAULT_WALKIN_PERCENT,
};
pub use directory::{FactoryDirectory, StaticDirectory};
pub use distance::{haversine_km, Coordinates, EARTH_RADIUS_KM};
pub use entry::{
    EntryId, EntryRequest, EntryStatus, FactoryId, LaneType, QueueEntry, MIN_ENTRY_TONS,
};
pub use error::{QueueError, Result};
pub use event::{EventEmitter, EventPayload, EventStream, QueueEvent};
pub use manager::{QueueManager, QueueManagerBuilder};
pub use queue::{LaneSnapshot, PalmQueue};

// Feature-gated re-exports
#[cfg(feature = "metrics")]
pub use metrics::{
    metric_names, HistogramPercentiles, HistogramStats, LocalMetrics, MetricsBackend,
    MetricsSnapshot, QueueMetrics,
};
#[cfg(feature = "monitoring")]
pub use monitor::{MonitorConfig, QueueMonitor};
#[cfg(feature = "telemetry")]
pub use telemetry::OtelMetricsBackend;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Queue statistics snapshot for one factory and day
///
/// Aggregates the three lane views into factory-level totals.
///
/// # Fields
///
/// * `total_quota_tons` - Sum of the three lane quotas (the factory's total
///   daily quota)
/// * `total_current_tons` - Accumulated non-cancelled tonnage across lanes
/// * `total_waiting` - Entries still waiting across lanes
/// * `lanes` - The underlying lane views in fixed order (farmer, booking,
///   walkin)
///
/// # Example
///
/// ```rust,ignore
/// let stats = manager.stats("f1", today).await?;
/// println!("{} of {} tons taken, {} vehicles waiting",
///     stats.total_current_tons, stats.total_quota_tons, stats.total_waiting);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub factory_id: String,
    pub date: NaiveDate,
    pub total_quota_tons: f64,
    pub total_current_tons: f64,
    pub total_waiting: usize,
    pub lanes: [LaneSnapshot; 3],
}
