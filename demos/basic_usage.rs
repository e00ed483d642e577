//! Basic usage example
//!
//! This example demonstrates the basic usage of palm-queue:
//! - Creating a queue manager
//! - Reading the default lane views
//! - Submitting entries and watching lane state change

use palm_queue::{EntryRequest, EventEmitter, LaneType, QueueManagerBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("=== Palm Queue: Basic Usage Example ===\n");

    let manager = QueueManagerBuilder::new(EventEmitter::new(100)).build();
    let today = manager.queue().clock().today();

    // A factory with no stored settings starts on the default split:
    // 500 tons total, 10% farmer / 70% booking / 20% walk-in
    println!("Lane views for factory f1 on {}:", today);
    for lane in manager.lanes("f1", today).await {
        println!(
            "  {:<10} quota {:>6.1}t  taken {:>6.1}t  open: {}",
            lane.lane_type, lane.daily_quota_tons, lane.current_tons, lane.is_open
        );
    }

    // Three loads arrive
    println!("\nSubmitting entries...");
    let loads = [
        (LaneType::Farmer, "Somchai", "81-2345", 4.5),
        (LaneType::Farmer, "Prasert", "82-1111", 6.0),
        (LaneType::Walkin, "Wichai", "83-9999", 12.0),
    ];
    for (lane, farmer, plate, tons) in loads {
        let entry = manager
            .submit(EntryRequest::new("f1", lane, farmer, plate, tons))
            .await?;
        println!(
            "  {} got queue number {} in the {} lane ({}t)",
            entry.farmer_name, entry.queue_number, entry.lane_type, entry.estimated_tons
        );
    }

    println!("\nLane views after intake:");
    for lane in manager.lanes("f1", today).await {
        println!(
            "  {:<10} quota {:>6.1}t  taken {:>6.1}t  waiting: {}",
            lane.lane_type, lane.daily_quota_tons, lane.current_tons, lane.entries_count
        );
    }

    Ok(())
}
