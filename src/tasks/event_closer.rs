use crate::db::ElectionStore;
use crate::error::Result;
use crate::models::EventStatus;
use chrono::{DateTime, Utc};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::interval;

pub const DEFAULT_CHECK_INTERVAL_SECONDS: u64 = 60;

/// Closes every active event whose end time has passed. Returns how many
/// events this sweep closed; events closed concurrently by an admin are skipped.
pub async fn close_expired_events(store: &dyn ElectionStore, now: DateTime<Utc>) -> Result<usize> {
    let expired = store.expired_active_events(now).await?;
    if expired.is_empty() {
        return Ok(0);
    }

    info!("Found {} expired event(s).", expired.len());
    let mut closed = 0;
    for event_id in expired {
        if store
            .update_event_status(&event_id, EventStatus::Active, EventStatus::Closed)
            .await?
        {
            info!("Closed expired event {}", event_id);
            closed += 1;
        }
    }
    Ok(closed)
}

pub async fn check_expired_events_task(store: Arc<dyn ElectionStore>, check_interval_seconds: u64) {
    info!("Starting background task to close expired events...");
    let mut interval = interval(StdDuration::from_secs(check_interval_seconds.max(1)));

    loop {
        interval.tick().await;
        let now = Utc::now();

        if let Err(e) = close_expired_events(store.as_ref(), now).await {
            error!("Failed to close expired events at {}: {}", now.to_rfc3339(), e);
        }
    }
}
