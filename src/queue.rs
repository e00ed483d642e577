//! Core quota allocation engine: settings store, entry ledger and lane views

use crate::clock::{Clock, SystemClock};
use crate::config::{QuotaSettings, SettingsUpdate};
use crate::entry::{EntryId, EntryRequest, EntryStatus, FactoryId, LaneType, QueueEntry};
use crate::error::{QueueError, Result};
use crate::event::{events, EventEmitter, EventStream, QueueEvent};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Key of one settings slot: exactly one record is current per factory per day
type SettingsKey = (FactoryId, NaiveDate);

/// Key of one admission bucket: queue numbers and capacity checks are scoped here
type BucketKey = (FactoryId, LaneType, NaiveDate);

/// Derived view of one lane for one factory and day
///
/// Lanes are never stored; they are recomputed from the settings record and
/// the day's ledger slice on every read, so they cannot drift out of sync
/// with the ledger.
///
/// Note the two occupancy signals measure different things: `current_tons`
/// counts every non-cancelled entry, `entries_count` only `waiting` ones. A
/// lane can report `is_open == false` with `entries_count == 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaneSnapshot {
    /// Lane identity
    pub lane_type: LaneType,
    /// Human-readable lane name
    pub name: String,
    /// Short lane description
    pub description: String,
    /// Configured percent share of the daily quota
    pub quota_percent: u8,
    /// Tonnage ceiling: `total * percent / 100`
    pub daily_quota_tons: f64,
    /// Sum of estimated tons over non-cancelled entries
    pub current_tons: f64,
    /// Whether new entries are admitted (`current_tons < daily_quota_tons`,
    /// strictly: a lane exactly at quota is closed)
    pub is_open: bool,
    /// Number of entries still waiting
    pub entries_count: usize,
}

/// Append-only entry ledger
///
/// Entries are pushed once and never removed; insertion order is preserved so
/// lane-filtered listings come back in arrival order.
#[derive(Default)]
struct Ledger {
    entries: Vec<QueueEntry>,
    by_id: HashMap<EntryId, usize>,
}

impl Ledger {
    fn bucket_count(&self, factory_id: &str, lane_type: LaneType, date: NaiveDate) -> usize {
        self.entries
            .iter()
            .filter(|e| e.factory_id == factory_id && e.lane_type == lane_type && e.date == date)
            .count()
    }
}

/// The quota allocation engine
///
/// Owns all queue state for the process: per-day quota settings, the entry
/// ledger and the per-bucket admission locks. State is process memory only; a
/// restart loses the day's queues, which matches how the system treats them —
/// ephemeral daily operational data.
///
/// Construct once at process start and share via `Arc`; request handlers
/// should not create their own instances.
pub struct PalmQueue {
    settings: RwLock<HashMap<SettingsKey, QuotaSettings>>,
    ledger: RwLock<Ledger>,
    /// Serializes count-then-insert per (factory, lane, day) so concurrent
    /// submissions cannot assign duplicate queue numbers or jointly overrun a
    /// quota. Unrelated buckets never contend.
    bucket_locks: Mutex<HashMap<BucketKey, Arc<Mutex<()>>>>,
    clock: Arc<dyn Clock>,
    event_emitter: EventEmitter,
}

impl PalmQueue {
    /// Create a new engine on the system clock
    pub fn new(event_emitter: EventEmitter) -> Self {
        Self::with_clock(event_emitter, Arc::new(SystemClock))
    }

    /// Create a new engine with an injected clock
    pub fn with_clock(event_emitter: EventEmitter, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings: RwLock::new(HashMap::new()),
            ledger: RwLock::new(Ledger::default()),
            bucket_locks: Mutex::new(HashMap::new()),
            clock,
            event_emitter,
        }
    }

    /// Get the engine's clock
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Subscribe to all queue lifecycle events as an `EventStream`
    pub fn subscribe_stream(&self) -> EventStream {
        self.event_emitter.subscribe_stream()
    }

    /// Subscribe to filtered queue lifecycle events as an `EventStream`
    pub fn subscribe_filtered(
        &self,
        filter: impl Fn(&QueueEvent) -> bool + Send + Sync + 'static,
    ) -> EventStream {
        self.event_emitter.subscribe_filtered(filter)
    }

    /// Settings for a factory and day, falling back to the hardcoded default
    ///
    /// The fallback is materialized per call and never persisted; reads have
    /// no side effects.
    pub async fn settings(&self, factory_id: &str, date: NaiveDate) -> QuotaSettings {
        let settings = self.settings.read().await;
        settings
            .get(&(factory_id.to_string(), date))
            .cloned()
            .unwrap_or_else(|| QuotaSettings::default_for(factory_id, date))
    }

    /// The stored settings record, if one exists for this factory and day
    pub async fn stored_settings(
        &self,
        factory_id: &str,
        date: NaiveDate,
    ) -> Option<QuotaSettings> {
        let settings = self.settings.read().await;
        settings.get(&(factory_id.to_string(), date)).cloned()
    }

    /// Overwrite the settings slot for the current day
    ///
    /// Writes always target "today" from the engine's clock, regardless of
    /// which day the caller was viewing; reads may target any date. Last
    /// write wins, there is no merge or history.
    ///
    /// Validation (percent sum, positive total) is the caller's
    /// responsibility; this store writes whatever it is given.
    pub async fn update_settings(&self, update: SettingsUpdate) -> QuotaSettings {
        let today = self.clock.today();
        let record = QuotaSettings::new(
            update.factory_id.clone(),
            today,
            update.total_daily_quota_tons,
            update.farmer_percent,
            update.booking_percent,
            update.walkin_percent,
        );

        let mut settings = self.settings.write().await;
        settings.insert((update.factory_id.clone(), today), record.clone());
        drop(settings);

        tracing::info!(
            factory_id = %update.factory_id,
            total_tons = update.total_daily_quota_tons,
            split = %format!(
                "{}/{}/{}",
                update.farmer_percent, update.booking_percent, update.walkin_percent
            ),
            "queue settings updated"
        );

        self.event_emitter.emit(QueueEvent::with_map(
            events::QUEUE_SETTINGS_UPDATED,
            HashMap::from([
                (
                    "factory_id".to_string(),
                    serde_json::json!(update.factory_id),
                ),
                (
                    "total_daily_quota_tons".to_string(),
                    serde_json::json!(update.total_daily_quota_tons),
                ),
            ]),
        ));

        record
    }

    /// Derived lane views for a factory and day, in fixed order
    /// (farmer, booking, walkin)
    pub async fn lanes(&self, factory_id: &str, date: NaiveDate) -> [LaneSnapshot; 3] {
        let settings = self.settings(factory_id, date).await;
        let ledger = self.ledger.read().await;
        let day_entries: Vec<&QueueEntry> = ledger
            .entries
            .iter()
            .filter(|e| e.factory_id == factory_id && e.date == date)
            .collect();

        LaneType::ALL.map(|lane| Self::snapshot_lane(&settings, lane, &day_entries))
    }

    fn snapshot_lane(
        settings: &QuotaSettings,
        lane: LaneType,
        day_entries: &[&QueueEntry],
    ) -> LaneSnapshot {
        let daily_quota_tons = settings.quota_for(lane);
        let current_tons: f64 = day_entries
            .iter()
            .filter(|e| e.lane_type == lane && e.status != EntryStatus::Cancelled)
            .map(|e| e.estimated_tons)
            .sum();
        let entries_count = day_entries
            .iter()
            .filter(|e| e.lane_type == lane && e.status == EntryStatus::Waiting)
            .count();

        LaneSnapshot {
            lane_type: lane,
            name: lane.display_name().to_string(),
            description: lane.description().to_string(),
            quota_percent: settings.percent_for(lane),
            daily_quota_tons,
            current_tons,
            is_open: current_tons < daily_quota_tons,
            entries_count,
        }
    }

    /// Entries for a factory and day
    ///
    /// With a lane filter, entries come back in arrival (insertion) order.
    /// Without one, the combined list is sorted by `queue_number`, which
    /// interleaves the independent per-lane counters rather than reflecting
    /// true arrival order across lanes.
    pub async fn entries(
        &self,
        factory_id: &str,
        date: NaiveDate,
        lane_type: Option<LaneType>,
    ) -> Vec<QueueEntry> {
        let ledger = self.ledger.read().await;
        let mut result: Vec<QueueEntry> = ledger
            .entries
            .iter()
            .filter(|e| e.factory_id == factory_id && e.date == date)
            .filter(|e| lane_type.map_or(true, |lane| e.lane_type == lane))
            .cloned()
            .collect();

        if lane_type.is_none() {
            result.sort_by_key(|e| e.queue_number);
        }
        result
    }

    /// Look up a single entry by id
    pub async fn entry(&self, id: &str) -> Option<QueueEntry> {
        let ledger = self.ledger.read().await;
        ledger.by_id.get(id).map(|&idx| ledger.entries[idx].clone())
    }

    /// Admit a new entry into its lane for today
    ///
    /// Holds the bucket lock for `(factory, lane, today)` across the
    /// admission check and the append, so the check and the assigned queue
    /// number are consistent under concurrent submissions.
    ///
    /// Field validation (tonnage minimum, required strings) is the caller's
    /// responsibility; only capacity is checked here.
    pub async fn submit(&self, request: EntryRequest) -> Result<QueueEntry> {
        let today = self.clock.today();
        let bucket = (request.factory_id.clone(), request.lane_type, today);

        let bucket_lock = {
            let mut locks = self.bucket_locks.lock().await;
            Arc::clone(locks.entry(bucket).or_default())
        };
        let _guard = bucket_lock.lock().await;

        let lanes = self.lanes(&request.factory_id, today).await;
        let lane = lanes
            .iter()
            .find(|l| l.lane_type == request.lane_type)
            .ok_or_else(|| QueueError::LaneClosed(request.lane_type))?;

        if !lane.is_open {
            tracing::warn!(
                factory_id = %request.factory_id,
                lane = %request.lane_type,
                current_tons = lane.current_tons,
                quota_tons = lane.daily_quota_tons,
                "entry rejected, lane closed"
            );
            self.event_emitter.emit(QueueEvent::with_map(
                events::QUEUE_ENTRY_REJECTED,
                HashMap::from([
                    (
                        "factory_id".to_string(),
                        serde_json::json!(request.factory_id),
                    ),
                    (
                        "lane".to_string(),
                        serde_json::json!(request.lane_type.as_str()),
                    ),
                ]),
            ));
            return Err(QueueError::LaneClosed(request.lane_type));
        }

        let entry = {
            let mut ledger = self.ledger.write().await;
            let queue_number =
                ledger.bucket_count(&request.factory_id, request.lane_type, today) as u32 + 1;
            let entry = QueueEntry {
                id: Uuid::new_v4().to_string(),
                factory_id: request.factory_id.clone(),
                lane_type: request.lane_type,
                farmer_name: request.farmer_name.clone(),
                vehicle_plate: request.vehicle_plate.clone(),
                estimated_tons: request.estimated_tons,
                queue_number,
                status: EntryStatus::Waiting,
                date: today,
                created_at: self.clock.now(),
                processed_at: None,
            };
            let next_index = ledger.entries.len();
            ledger.by_id.insert(entry.id.clone(), next_index);
            ledger.entries.push(entry.clone());
            entry
        };

        tracing::info!(
            factory_id = %entry.factory_id,
            lane = %entry.lane_type,
            entry_id = %entry.id,
            queue_number = entry.queue_number,
            estimated_tons = entry.estimated_tons,
            "entry admitted"
        );

        self.event_emitter.emit(QueueEvent::with_map(
            events::QUEUE_ENTRY_SUBMITTED,
            HashMap::from([
                ("factory_id".to_string(), serde_json::json!(entry.factory_id)),
                (
                    "lane".to_string(),
                    serde_json::json!(entry.lane_type.as_str()),
                ),
                ("entry_id".to_string(), serde_json::json!(entry.id)),
                (
                    "queue_number".to_string(),
                    serde_json::json!(entry.queue_number),
                ),
            ]),
        ));

        // The admitted load may have been the one that filled the lane
        if lane.current_tons + entry.estimated_tons >= lane.daily_quota_tons {
            self.event_emitter.emit(QueueEvent::with_map(
                events::QUEUE_LANE_CLOSED,
                HashMap::from([
                    ("factory_id".to_string(), serde_json::json!(entry.factory_id)),
                    (
                        "lane".to_string(),
                        serde_json::json!(entry.lane_type.as_str()),
                    ),
                ]),
            ));
        }

        Ok(entry)
    }

    /// Move an entry to a new lifecycle status
    ///
    /// Transitions are unrestricted (any status from any status, matching the
    /// operator workflow that jumps straight from `waiting` to `completed`).
    /// `processed_at` is stamped only when the new status is `completed` and
    /// is never cleared by later transitions.
    pub async fn set_status(&self, id: &str, status: EntryStatus) -> Result<QueueEntry> {
        let updated = {
            let mut ledger = self.ledger.write().await;
            let idx = *ledger
                .by_id
                .get(id)
                .ok_or_else(|| QueueError::EntryNotFound(id.to_string()))?;
            let entry = &mut ledger.entries[idx];
            entry.status = status;
            if status == EntryStatus::Completed {
                entry.processed_at = Some(self.clock.now());
            }
            entry.clone()
        };

        tracing::info!(
            entry_id = %updated.id,
            factory_id = %updated.factory_id,
            status = %updated.status,
            "entry status changed"
        );

        self.event_emitter.emit(QueueEvent::with_map(
            events::QUEUE_ENTRY_STATUS_CHANGED,
            HashMap::from([
                ("entry_id".to_string(), serde_json::json!(updated.id)),
                (
                    "status".to_string(),
                    serde_json::json!(updated.status.as_str()),
                ),
            ]),
        ));
        if status == EntryStatus::Completed {
            self.event_emitter.emit(QueueEvent::with_map(
                events::QUEUE_ENTRY_COMPLETED,
                HashMap::from([("entry_id".to_string(), serde_json::json!(updated.id))]),
            ));
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::event::events;

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    /// Helper: engine pinned to 2025-06-01 with a shared fixed clock
    fn make_queue() -> (Arc<PalmQueue>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at_midnight(june_first()));
        let queue = Arc::new(PalmQueue::with_clock(
            EventEmitter::new(100),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        (queue, clock)
    }

    fn farmer_request(tons: f64) -> EntryRequest {
        EntryRequest::new("f1", LaneType::Farmer, "Somchai", "81-2345", tons)
    }

    #[tokio::test]
    async fn test_settings_fallback_without_stored_record() {
        let (queue, _) = make_queue();

        let settings = queue.settings("f1", june_first()).await;
        assert_eq!(settings.total_daily_quota_tons, 500.0);
        assert_eq!(settings.farmer_percent, 10);
        assert_eq!(settings.booking_percent, 70);
        assert_eq!(settings.walkin_percent, 20);

        // The fallback must not be persisted as a side effect of the read
        assert!(queue.stored_settings("f1", june_first()).await.is_none());
    }

    #[tokio::test]
    async fn test_update_settings_targets_today() {
        let (queue, clock) = make_queue();

        // The write lands on today regardless of any viewed date
        queue
            .update_settings(SettingsUpdate::new("f1", 400.0, 20, 60, 20))
            .await;

        let tomorrow = june_first().succ_opt().unwrap();
        assert!(queue.stored_settings("f1", tomorrow).await.is_none());

        let stored = queue.stored_settings("f1", june_first()).await.unwrap();
        assert_eq!(stored.total_daily_quota_tons, 400.0);
        assert_eq!(stored.date, clock.today());
    }

    #[tokio::test]
    async fn test_update_settings_overwrites_slot() {
        let (queue, _) = make_queue();

        queue
            .update_settings(SettingsUpdate::new("f1", 400.0, 20, 60, 20))
            .await;
        queue
            .update_settings(SettingsUpdate::new("f1", 600.0, 30, 50, 20))
            .await;

        let stored = queue.stored_settings("f1", june_first()).await.unwrap();
        assert_eq!(stored.total_daily_quota_tons, 600.0);
        assert_eq!(stored.farmer_percent, 30);
    }

    #[tokio::test]
    async fn test_lanes_default_quotas_in_fixed_order() {
        let (queue, _) = make_queue();

        let lanes = queue.lanes("f1", june_first()).await;

        assert_eq!(lanes[0].lane_type, LaneType::Farmer);
        assert_eq!(lanes[1].lane_type, LaneType::Booking);
        assert_eq!(lanes[2].lane_type, LaneType::Walkin);

        assert_eq!(lanes[0].daily_quota_tons, 50.0);
        assert_eq!(lanes[1].daily_quota_tons, 350.0);
        assert_eq!(lanes[2].daily_quota_tons, 100.0);

        for lane in &lanes {
            assert_eq!(lane.current_tons, 0.0);
            assert_eq!(lane.entries_count, 0);
            assert!(lane.is_open);
        }
    }

    #[tokio::test]
    async fn test_current_tons_excludes_cancelled_only() {
        let (queue, _) = make_queue();

        queue.submit(farmer_request(5.0)).await.unwrap();
        let completed = queue.submit(farmer_request(3.0)).await.unwrap();
        let cancelled = queue.submit(farmer_request(2.0)).await.unwrap();

        queue
            .set_status(&completed.id, EntryStatus::Completed)
            .await
            .unwrap();
        queue
            .set_status(&cancelled.id, EntryStatus::Cancelled)
            .await
            .unwrap();

        let lanes = queue.lanes("f1", june_first()).await;
        let farmer = &lanes[0];

        // 5 waiting + 3 completed; the 2t cancellation does not count
        assert_eq!(farmer.current_tons, 8.0);
        // Only the waiting entry shows in the visible queue length
        assert_eq!(farmer.entries_count, 1);
    }

    #[tokio::test]
    async fn test_lane_closes_exactly_at_quota() {
        let (queue, _) = make_queue();

        // Farmer lane quota: 100 * 10% = 10 tons
        queue
            .update_settings(SettingsUpdate::new("f1", 100.0, 10, 70, 20))
            .await;

        queue.submit(farmer_request(9.99)).await.unwrap();
        let lanes = queue.lanes("f1", june_first()).await;
        assert!(lanes[0].is_open, "9.99 < 10 keeps the lane open");

        queue.submit(farmer_request(0.01)).await.unwrap();
        let lanes = queue.lanes("f1", june_first()).await;
        assert_eq!(lanes[0].current_tons, 10.0);
        assert!(!lanes[0].is_open, "a lane exactly at quota is closed");
    }

    #[tokio::test]
    async fn test_closed_lane_rejects_without_appending() {
        let (queue, _) = make_queue();

        queue
            .update_settings(SettingsUpdate::new("f1", 100.0, 10, 70, 20))
            .await;
        queue.submit(farmer_request(10.0)).await.unwrap();

        let before = queue.entries("f1", june_first(), None).await.len();

        let result = queue.submit(farmer_request(1.0)).await;
        assert!(matches!(result, Err(QueueError::LaneClosed(LaneType::Farmer))));

        let after = queue.entries("f1", june_first(), None).await.len();
        assert_eq!(before, after, "a rejected submission must not append");
    }

    #[tokio::test]
    async fn test_overrun_admitted_while_open() {
        let (queue, _) = make_queue();

        queue
            .update_settings(SettingsUpdate::new("f1", 100.0, 10, 70, 20))
            .await;

        // 9 < 10 keeps the lane open, so a 5t load is still admitted and the
        // lane overruns to 14; only subsequent submissions are rejected.
        queue.submit(farmer_request(9.0)).await.unwrap();
        queue.submit(farmer_request(5.0)).await.unwrap();

        let lanes = queue.lanes("f1", june_first()).await;
        assert_eq!(lanes[0].current_tons, 14.0);
        assert!(!lanes[0].is_open);
        assert!(queue.submit(farmer_request(0.5)).await.is_err());
    }

    #[tokio::test]
    async fn test_queue_numbers_are_per_lane() {
        let (queue, _) = make_queue();

        let mut farmer_numbers = Vec::new();
        for _ in 0..3 {
            farmer_numbers.push(queue.submit(farmer_request(1.0)).await.unwrap().queue_number);
        }

        let mut booking_numbers = Vec::new();
        for _ in 0..2 {
            let request = EntryRequest::new("f1", LaneType::Booking, "Prasert", "82-1111", 2.0);
            booking_numbers.push(queue.submit(request).await.unwrap().queue_number);
        }

        assert_eq!(farmer_numbers, vec![1, 2, 3]);
        assert_eq!(booking_numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_queue_numbers_count_cancelled_entries() {
        let (queue, _) = make_queue();

        let first = queue.submit(farmer_request(1.0)).await.unwrap();
        queue
            .set_status(&first.id, EntryStatus::Cancelled)
            .await
            .unwrap();

        // Cancelled entries stay in the bucket, so the next number is 2
        let second = queue.submit(farmer_request(1.0)).await.unwrap();
        assert_eq!(second.queue_number, 2);
    }

    #[tokio::test]
    async fn test_day_isolation() {
        let (queue, clock) = make_queue();

        queue.submit(farmer_request(5.0)).await.unwrap();
        queue.submit(farmer_request(3.0)).await.unwrap();

        // Next day: tonnage, counts and numbering all reset
        clock.advance(chrono::Duration::days(1));
        let today = clock.today();

        let lanes = queue.lanes("f1", today).await;
        assert_eq!(lanes[0].current_tons, 0.0);
        assert_eq!(lanes[0].entries_count, 0);

        let entry = queue.submit(farmer_request(2.0)).await.unwrap();
        assert_eq!(entry.queue_number, 1);

        // Yesterday's view is untouched
        let yesterday_lanes = queue.lanes("f1", june_first()).await;
        assert_eq!(yesterday_lanes[0].current_tons, 8.0);
        assert_eq!(queue.entries("f1", june_first(), None).await.len(), 2);
    }

    #[tokio::test]
    async fn test_entries_cross_lane_listing_sorts_by_queue_number() {
        let (queue, _) = make_queue();

        // Arrival order: farmer#1, booking#1, farmer#2, booking#2
        queue.submit(farmer_request(1.0)).await.unwrap();
        queue
            .submit(EntryRequest::new(
                "f1",
                LaneType::Booking,
                "Prasert",
                "82-1111",
                1.0,
            ))
            .await
            .unwrap();
        queue.submit(farmer_request(1.0)).await.unwrap();
        queue
            .submit(EntryRequest::new(
                "f1",
                LaneType::Booking,
                "Prasert",
                "82-1111",
                1.0,
            ))
            .await
            .unwrap();

        // Combined listing interleaves lanes by their independent counters
        let all = queue.entries("f1", june_first(), None).await;
        let numbers: Vec<u32> = all.iter().map(|e| e.queue_number).collect();
        assert_eq!(numbers, vec![1, 1, 2, 2]);
    }

    #[tokio::test]
    async fn test_entries_lane_filter_arrival_order() {
        let (queue, _) = make_queue();

        for tons in [1.0, 2.0, 3.0] {
            queue.submit(farmer_request(tons)).await.unwrap();
        }

        let farmers = queue
            .entries("f1", june_first(), Some(LaneType::Farmer))
            .await;
        let tons: Vec<f64> = farmers.iter().map(|e| e.estimated_tons).collect();
        assert_eq!(tons, vec![1.0, 2.0, 3.0]);

        let bookings = queue
            .entries("f1", june_first(), Some(LaneType::Booking))
            .await;
        assert!(bookings.is_empty());
    }

    #[tokio::test]
    async fn test_entries_do_not_leak_across_factories() {
        let (queue, _) = make_queue();

        queue.submit(farmer_request(5.0)).await.unwrap();
        queue
            .submit(EntryRequest::new(
                "f2",
                LaneType::Farmer,
                "Wichai",
                "83-9999",
                7.0,
            ))
            .await
            .unwrap();

        let f1_lanes = queue.lanes("f1", june_first()).await;
        let f2_lanes = queue.lanes("f2", june_first()).await;
        assert_eq!(f1_lanes[0].current_tons, 5.0);
        assert_eq!(f2_lanes[0].current_tons, 7.0);
    }

    #[tokio::test]
    async fn test_submit_initial_state() {
        let (queue, _) = make_queue();

        let entry = queue.submit(farmer_request(4.5)).await.unwrap();

        assert_eq!(entry.status, EntryStatus::Waiting);
        assert_eq!(entry.queue_number, 1);
        assert_eq!(entry.date, june_first());
        assert!(entry.processed_at.is_none());
        assert!(!entry.id.is_empty());
    }

    #[tokio::test]
    async fn test_completion_stamps_processed_at() {
        let (queue, _) = make_queue();

        let entry = queue.submit(farmer_request(4.5)).await.unwrap();
        let completed = queue
            .set_status(&entry.id, EntryStatus::Completed)
            .await
            .unwrap();

        assert_eq!(completed.status, EntryStatus::Completed);
        assert!(completed.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_cancellation_leaves_processed_at_unset() {
        let (queue, _) = make_queue();

        let entry = queue.submit(farmer_request(4.5)).await.unwrap();
        let cancelled = queue
            .set_status(&entry.id, EntryStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(cancelled.status, EntryStatus::Cancelled);
        assert!(cancelled.processed_at.is_none());
    }

    #[tokio::test]
    async fn test_reopening_keeps_stale_processed_at() {
        let (queue, _) = make_queue();

        let entry = queue.submit(farmer_request(4.5)).await.unwrap();
        queue
            .set_status(&entry.id, EntryStatus::Completed)
            .await
            .unwrap();

        // Re-opening a completed entry does not clear the completion stamp
        let reopened = queue
            .set_status(&entry.id, EntryStatus::Waiting)
            .await
            .unwrap();
        assert_eq!(reopened.status, EntryStatus::Waiting);
        assert!(reopened.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_direct_waiting_to_completed_is_allowed() {
        let (queue, _) = make_queue();

        let entry = queue.submit(farmer_request(4.5)).await.unwrap();
        let done = queue
            .set_status(&entry.id, EntryStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, EntryStatus::Completed);
    }

    #[tokio::test]
    async fn test_set_status_unknown_entry() {
        let (queue, _) = make_queue();

        let result = queue.set_status("no-such-entry", EntryStatus::Completed).await;
        assert!(matches!(result, Err(QueueError::EntryNotFound(_))));
    }

    #[tokio::test]
    async fn test_entry_lookup() {
        let (queue, _) = make_queue();

        let entry = queue.submit(farmer_request(4.5)).await.unwrap();

        let found = queue.entry(&entry.id).await.unwrap();
        assert_eq!(found.id, entry.id);
        assert_eq!(found.farmer_name, "Somchai");

        assert!(queue.entry("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_zero_percent_lane_never_opens() {
        let (queue, _) = make_queue();

        queue
            .update_settings(SettingsUpdate::new("f1", 500.0, 0, 80, 20))
            .await;

        let lanes = queue.lanes("f1", june_first()).await;
        assert_eq!(lanes[0].daily_quota_tons, 0.0);
        assert!(!lanes[0].is_open);

        let result = queue.submit(farmer_request(1.0)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_submit_emits_submitted_event() {
        let (queue, _) = make_queue();
        let mut stream = queue.subscribe_filtered(|e| e.key == events::QUEUE_ENTRY_SUBMITTED);

        queue.submit(farmer_request(4.5)).await.unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_millis(200), stream.recv())
            .await
            .expect("No submitted event received")
            .expect("Stream ended");
        assert_eq!(event.key, events::QUEUE_ENTRY_SUBMITTED);
    }

    #[tokio::test]
    async fn test_filling_submission_emits_lane_closed() {
        let (queue, _) = make_queue();
        let mut stream = queue.subscribe_filtered(|e| e.key == events::QUEUE_LANE_CLOSED);

        queue
            .update_settings(SettingsUpdate::new("f1", 100.0, 10, 70, 20))
            .await;
        queue.submit(farmer_request(10.0)).await.unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_millis(200), stream.recv())
            .await
            .expect("No lane-closed event received")
            .expect("Stream ended");
        assert_eq!(event.key, events::QUEUE_LANE_CLOSED);
    }

    #[tokio::test]
    async fn test_rejection_emits_rejected_event() {
        let (queue, _) = make_queue();

        queue
            .update_settings(SettingsUpdate::new("f1", 100.0, 10, 70, 20))
            .await;
        queue.submit(farmer_request(10.0)).await.unwrap();

        let mut stream = queue.subscribe_filtered(|e| e.key == events::QUEUE_ENTRY_REJECTED);
        let _ = queue.submit(farmer_request(1.0)).await;

        let event = tokio::time::timeout(std::time::Duration::from_millis(200), stream.recv())
            .await
            .expect("No rejected event received")
            .expect("Stream ended");
        assert_eq!(event.key, events::QUEUE_ENTRY_REJECTED);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_get_unique_numbers() {
        let (queue, _) = make_queue();

        let mut handles = Vec::new();
        for i in 0..20 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                queue
                    .submit(EntryRequest::new(
                        "f1",
                        LaneType::Booking,
                        format!("Farmer {}", i),
                        format!("80-{:04}", i),
                        1.0,
                    ))
                    .await
                    .unwrap()
                    .queue_number
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap());
        }
        numbers.sort_unstable();

        let expected: Vec<u32> = (1..=20).collect();
        assert_eq!(numbers, expected, "bucket lock must serialize numbering");
    }

    #[tokio::test]
    async fn test_lane_snapshot_serialization() {
        let (queue, _) = make_queue();
        queue.submit(farmer_request(4.5)).await.unwrap();

        let lanes = queue.lanes("f1", june_first()).await;
        let json = serde_json::to_string(&lanes).unwrap();
        assert!(json.contains("\"lane_type\":\"farmer\""));
        assert!(json.contains("\"current_tons\":4.5"));

        let parsed: [LaneSnapshot; 3] = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0], lanes[0]);
    }
}
