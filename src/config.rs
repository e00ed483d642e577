//! Daily quota settings per factory

use crate::entry::{FactoryId, LaneType};
use crate::error::{QueueError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default total daily quota applied when a factory has no stored settings
pub const DEFAULT_TOTAL_QUOTA_TONS: f64 = 500.0;

/// Default farmer-lane share of the daily quota
pub const DEFAULT_FARMER_PERCENT: u8 = 10;

/// Default booking-lane share of the daily quota
pub const DEFAULT_BOOKING_PERCENT: u8 = 70;

/// Default walk-in-lane share of the daily quota
pub const DEFAULT_WALKIN_PERCENT: u8 = 20;

/// Quota configuration for one factory on one calendar day
///
/// Exactly one record is current per `(factory, day)`; updating overwrites the
/// slot (last write wins, no history). Factories without a stored record fall
/// back to the hardcoded default split so a new factory can take intake
/// without explicit setup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaSettings {
    /// Factory this record belongs to
    pub factory_id: FactoryId,
    /// Day this record applies to
    pub date: NaiveDate,
    /// Total tonnage the factory accepts that day
    pub total_daily_quota_tons: f64,
    /// Farmer-lane share, percent
    pub farmer_percent: u8,
    /// Booking-lane share, percent
    pub booking_percent: u8,
    /// Walk-in-lane share, percent
    pub walkin_percent: u8,
}

impl QuotaSettings {
    /// Create a settings record
    pub fn new(
        factory_id: impl Into<String>,
        date: NaiveDate,
        total_daily_quota_tons: f64,
        farmer_percent: u8,
        booking_percent: u8,
        walkin_percent: u8,
    ) -> Self {
        Self {
            factory_id: factory_id.into(),
            date,
            total_daily_quota_tons,
            farmer_percent,
            booking_percent,
            walkin_percent,
        }
    }

    /// The default fallback (500 tons, 10/70/20) for a factory with no stored record
    ///
    /// Materializes the record only in memory; callers must not persist it as
    /// a side effect of a read.
    pub fn default_for(factory_id: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(
            factory_id,
            date,
            DEFAULT_TOTAL_QUOTA_TONS,
            DEFAULT_FARMER_PERCENT,
            DEFAULT_BOOKING_PERCENT,
            DEFAULT_WALKIN_PERCENT,
        )
    }

    /// Percent share configured for a lane
    pub fn percent_for(&self, lane: LaneType) -> u8 {
        match lane {
            LaneType::Farmer => self.farmer_percent,
            LaneType::Booking => self.booking_percent,
            LaneType::Walkin => self.walkin_percent,
        }
    }

    /// Tonnage quota derived for a lane: `total * percent / 100`
    pub fn quota_for(&self, lane: LaneType) -> f64 {
        self.total_daily_quota_tons * f64::from(self.percent_for(lane)) / 100.0
    }
}

/// Input for a settings update
///
/// Carries no date: updates always target the current calendar day server-side
/// regardless of which day the caller was viewing. That asymmetry (reads may
/// target any date, writes hit today) is deliberate: operators always edit
/// the live day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsUpdate {
    /// Factory to update
    pub factory_id: FactoryId,
    /// New total daily tonnage quota
    pub total_daily_quota_tons: f64,
    /// Farmer-lane share, percent
    pub farmer_percent: u8,
    /// Booking-lane share, percent
    pub booking_percent: u8,
    /// Walk-in-lane share, percent
    pub walkin_percent: u8,
}

impl SettingsUpdate {
    /// Create a settings update
    pub fn new(
        factory_id: impl Into<String>,
        total_daily_quota_tons: f64,
        farmer_percent: u8,
        booking_percent: u8,
        walkin_percent: u8,
    ) -> Self {
        Self {
            factory_id: factory_id.into(),
            total_daily_quota_tons,
            farmer_percent,
            booking_percent,
            walkin_percent,
        }
    }

    /// Check boundary constraints; called by the API layer before the write
    ///
    /// The store itself never validates, so a rejected update must leave any
    /// prior record untouched.
    pub fn validate(&self) -> Result<()> {
        if self.factory_id.trim().is_empty() {
            return Err(QueueError::Validation("factory id is required".to_string()));
        }
        if !self.total_daily_quota_tons.is_finite() || self.total_daily_quota_tons <= 0.0 {
            return Err(QueueError::Validation(
                "total daily quota must be greater than 0".to_string(),
            ));
        }
        for (name, percent) in [
            ("farmer", self.farmer_percent),
            ("booking", self.booking_percent),
            ("walkin", self.walkin_percent),
        ] {
            if percent > 100 {
                return Err(QueueError::Validation(format!(
                    "{} percent must be between 0 and 100",
                    name
                )));
            }
        }
        let sum = u32::from(self.farmer_percent)
            + u32::from(self.booking_percent)
            + u32::from(self.walkin_percent);
        if sum != 100 {
            return Err(QueueError::Validation(format!(
                "lane percentages must sum to 100, got {}",
                sum
            )));
        }
        Ok(())
    }
}
