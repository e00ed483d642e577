//! Queue entry types: lanes, statuses and the ledger record

use crate::error::{QueueError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entry identifier
pub type EntryId = String;

/// Factory identifier
pub type FactoryId = String;

/// Minimum accepted tonnage for a single entry
pub const MIN_ENTRY_TONS: f64 = 0.1;

/// Intake lane identity
///
/// A factory splits its daily quota across exactly these three lanes. The
/// order of [`LaneType::ALL`] is part of the contract: lane views are always
/// returned as `[farmer, booking, walkin]` and consumers index by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneType {
    /// Farmers delivering without a prior booking
    Farmer,
    /// Pre-booked supplier loads with a confirmed purchase quota
    Booking,
    /// Walk-in trucks ready to unload immediately
    Walkin,
}

impl LaneType {
    /// All lanes in contract order
    pub const ALL: [LaneType; 3] = [LaneType::Farmer, LaneType::Booking, LaneType::Walkin];

    /// Lane identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            LaneType::Farmer => "farmer",
            LaneType::Booking => "booking",
            LaneType::Walkin => "walkin",
        }
    }

    /// Human-readable lane name
    pub fn display_name(&self) -> &'static str {
        match self {
            LaneType::Farmer => "General farmers",
            LaneType::Booking => "Pre-booked yard",
            LaneType::Walkin => "Walk-in",
        }
    }

    /// Short lane description shown next to the name
    pub fn description(&self) -> &'static str {
        match self {
            LaneType::Farmer => {
                "Farmers delivering palm fruit without a booking, queued in arrival order"
            }
            LaneType::Booking => {
                "Loads booked in advance with a confirmed purchase quota"
            }
            LaneType::Walkin => {
                "Express lane for trucks ready to unload immediately"
            }
        }
    }
}

impl fmt::Display for LaneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LaneType {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "farmer" => Ok(LaneType::Farmer),
            "booking" => Ok(LaneType::Booking),
            "walkin" => Ok(LaneType::Walkin),
            other => Err(QueueError::Validation(format!(
                "unknown lane type: {}",
                other
            ))),
        }
    }
}

/// Lifecycle status of a queue entry
///
/// Entries start as `waiting` and are moved by an operator; there is no
/// automatic timeout. Any status may be set from any prior status (the
/// mark-done action jumps straight from `waiting` to `completed`), so no
/// transition graph is enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Queued, counts toward the visible queue length
    Waiting,
    /// Currently being unloaded/processed
    Processing,
    /// Done; sets the processed timestamp
    Completed,
    /// Withdrawn; excluded from lane tonnage
    Cancelled,
}

impl EntryStatus {
    /// Status identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Waiting => "waiting",
            EntryStatus::Processing => "processing",
            EntryStatus::Completed => "completed",
            EntryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "waiting" => Ok(EntryStatus::Waiting),
            "processing" => Ok(EntryStatus::Processing),
            "completed" => Ok(EntryStatus::Completed),
            "cancelled" => Ok(EntryStatus::Cancelled),
            other => Err(QueueError::Validation(format!(
                "unknown entry status: {}",
                other
            ))),
        }
    }
}

/// One vehicle's queued intake request within a lane for a given day
///
/// Ledger records are append-only: an entry is created once, its `status`
/// (and `processed_at` on completion) may change, and it is never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Unique entry id
    pub id: EntryId,
    /// Factory this entry queues at
    pub factory_id: FactoryId,
    /// Lane the entry was admitted into
    pub lane_type: LaneType,
    /// Name of the delivering farmer
    pub farmer_name: String,
    /// Vehicle license plate
    pub vehicle_plate: String,
    /// Estimated load in tons
    pub estimated_tons: f64,
    /// 1-based sequence number, scoped to (factory, lane, day)
    pub queue_number: u32,
    /// Current lifecycle status
    pub status: EntryStatus,
    /// Day bucket this entry belongs to, captured at creation
    pub date: NaiveDate,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Set when the entry transitions to `completed`; never cleared afterwards
    pub processed_at: Option<DateTime<Utc>>,
}

/// Input for submitting a new queue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRequest {
    /// Target factory
    pub factory_id: FactoryId,
    /// Requested lane
    pub lane_type: LaneType,
    /// Name of the delivering farmer
    pub farmer_name: String,
    /// Vehicle license plate
    pub vehicle_plate: String,
    /// Estimated load in tons
    pub estimated_tons: f64,
}

impl EntryRequest {
    /// Create a new entry request
    pub fn new(
        factory_id: impl Into<String>,
        lane_type: LaneType,
        farmer_name: impl Into<String>,
        vehicle_plate: impl Into<String>,
        estimated_tons: f64,
    ) -> Self {
        Self {
            factory_id: factory_id.into(),
            lane_type,
            farmer_name: farmer_name.into(),
            vehicle_plate: vehicle_plate.into(),
            estimated_tons,
        }
    }

    /// Check boundary constraints; called by the API layer before any mutation
    pub fn validate(&self) -> Result<()> {
        if self.factory_id.trim().is_empty() {
            return Err(QueueError::Validation("factory id is required".to_string()));
        }
        if self.farmer_name.trim().is_empty() {
            return Err(QueueError::Validation(
                "farmer name is required".to_string(),
            ));
        }
        if self.vehicle_plate.trim().is_empty() {
            return Err(QueueError::Validation(
                "vehicle plate is required".to_string(),
            ));
        }
        if !self.estimated_tons.is_finite() || self.estimated_tons < MIN_ENTRY_TONS {
            return Err(QueueError::Validation(format!(
                "estimated tons must be at least {}",
                MIN_ENTRY_TONS
            )));
        }
        Ok(())
    }
}
