//! Daily operations example
//!
//! A factory operator's day end to end:
//! - Setting the daily quota split
//! - Admitting vehicles until a lane fills up
//! - Working the queue: processing, completing, cancelling
//! - Watching lifecycle events

use palm_queue::{
    EntryRequest, EntryStatus, EventEmitter, LaneType, QueueError, QueueManagerBuilder,
    SettingsUpdate,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Palm Queue: Daily Operations Example ===\n");

    let emitter = EventEmitter::new(100);
    let mut events = emitter.subscribe();
    let manager = QueueManagerBuilder::new(emitter).build();
    let today = manager.queue().clock().today();

    // The operator tightens today's farmer share: 50 tons total, 20/60/20
    let settings = manager
        .update_settings(SettingsUpdate::new("f1", 50.0, 20, 60, 20))
        .await?;
    println!(
        "Settings for {}: {} tons total, farmer lane {}%",
        settings.date, settings.total_daily_quota_tons, settings.farmer_percent
    );

    // Farmer lane quota is 10 tons; the third truck fills it
    let mut admitted = Vec::new();
    for (farmer, plate, tons) in [
        ("Somchai", "81-2345", 4.0),
        ("Prasert", "82-1111", 3.5),
        ("Wichai", "83-9999", 3.0),
        ("Anan", "84-0007", 2.0),
    ] {
        match manager
            .submit(EntryRequest::new("f1", LaneType::Farmer, farmer, plate, tons))
            .await
        {
            Ok(entry) => {
                println!("  admitted {} as queue number {}", farmer, entry.queue_number);
                admitted.push(entry);
            }
            Err(QueueError::LaneClosed(lane)) => {
                println!("  {} turned away: {} lane is full", farmer, lane);
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Work the queue: first truck unloads, second cancels
    manager
        .set_status(&admitted[0].id, EntryStatus::Completed)
        .await?;
    manager
        .set_status(&admitted[1].id, EntryStatus::Cancelled)
        .await?;

    let stats = manager.stats("f1", today).await?;
    println!(
        "\nEnd of morning: {:.1} of {:.1} tons taken, {} still waiting",
        stats.total_current_tons, stats.total_quota_tons, stats.total_waiting
    );

    // Drain the events that accumulated along the way
    println!("\nLifecycle events:");
    while let Ok(event) = events.try_recv() {
        println!("  {}", event.key);
    }

    Ok(())
}
