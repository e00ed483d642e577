//! Error types for the palm queue system
//!
//! This module defines the error types used throughout the palm queue system.
//! All errors implement the `std::error::Error` trait via `thiserror::Error`.
//!
//! # Error Handling
//!
//! The [`QueueError`] enum covers all possible error conditions:
//! - Validation errors (percentages not summing to 100, tonnage below the
//!   minimum, missing required fields)
//! - Capacity errors (lane closed because its daily quota is reached)
//! - Lookup errors (unknown entry or factory id)
//!
//! Capacity rejections are a distinct variant so API layers can render
//! "quota full" rather than "bad input".
//!
//! # Example
//!
//! ```rust,ignore
//! use palm_queue::{QueueManager, QueueError};
//!
//! match manager.submit(request).await {
//!     Ok(entry) => { /* handle success */ },
//!     Err(QueueError::LaneClosed(lane)) => {
//!         eprintln!("Lane '{}' is closed, daily quota is full", lane);
//!     },
//!     Err(QueueError::Validation(msg)) => {
//!         eprintln!("Invalid request: {}", msg);
//!     },
//!     Err(e) => {
//!         eprintln!("Unexpected error: {}", e);
//!     }
//! }
//! ```

use crate::entry::LaneType;
use thiserror::Error;

/// Palm queue error type
///
/// Represents all possible errors that can occur in the palm queue system.
///
/// # Variants
///
/// * `Validation` - Input failed a boundary check before any state mutation
/// * `LaneClosed` - The target lane is at or over its daily tonnage quota
/// * `EntryNotFound` - The specified entry id does not exist in the ledger
/// * `FactoryNotFound` - The factory id was rejected by the configured directory
/// * `Other` - Catch-all for unexpected errors
#[derive(Error, Debug)]
pub enum QueueError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lane closed (daily quota reached)
    #[error("Lane '{0}' is closed, daily quota is full")]
    LaneClosed(LaneType),

    /// Entry not found
    #[error("Queue entry not found: {0}")]
    EntryNotFound(String),

    /// Factory not found
    #[error("Factory not found: {0}")]
    FactoryNotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Result type alias using QueueError
///
/// Convenience type alias for `std::result::Result<T, QueueError>`.
/// Used throughout the library for consistent error handling.
pub type Result<T> = std::result::Result<T, QueueError>;
