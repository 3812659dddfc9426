use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::RoomStore;

/// Periodically remove expired rooms
///
/// Runs until the returned handle is aborted.
pub fn spawn_room_sweeper(store: Arc<RoomStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = store.sweep(OffsetDateTime::now_utc()).await;
            if removed > 0 {
                let remaining = store.room_count().await;
                tracing::info!(removed, remaining, "swept expired rooms");
            }
        }
    })
}
