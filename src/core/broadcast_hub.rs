//! Per-room fan-out of room snapshots.
//!
//! Every subscriber owns a bounded queue. Publishing never waits: a full
//! queue counts as a failed delivery, and a subscriber that keeps failing
//! is dropped so one stalled socket cannot hold up the rest of the room.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};

use super::RoomSnapshot;

/// Identifies one subscription across rooms
pub type SubscriberId = u64;

/// Receiving half handed to a connection
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub code: String,
    pub receiver: mpsc::Receiver<Arc<RoomSnapshot>>,
}

#[derive(Debug)]
struct Subscriber {
    id: SubscriberId,
    sender: mpsc::Sender<Arc<RoomSnapshot>>,
    failures: u32,
}

/// Delivery summary for one publish
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
    pub dropped: usize,
}

#[derive(Debug)]
pub struct BroadcastHub {
    /// room code -> subscribers in subscription order
    rooms: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
    buffer: usize,
    max_failures: u32,
}

impl BroadcastHub {
    pub fn new(buffer: usize, max_failures: u32) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
            max_failures: max_failures.max(1),
        }
    }

    // The map is only touched by short non-awaiting sections, so a poisoned
    // lock still holds consistent data.
    fn rooms(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscriber>>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber for `code`
    pub fn subscribe(&self, code: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer);

        self.rooms()
            .entry(code.to_string())
            .or_default()
            .push(Subscriber {
                id,
                sender,
                failures: 0,
            });

        tracing::debug!(game_id = %code, subscriber_id = id, "subscribed");

        Subscription {
            id,
            code: code.to_string(),
            receiver,
        }
    }

    /// Remove a subscriber; a no-op if it is already gone
    pub fn unsubscribe(&self, code: &str, id: SubscriberId) -> bool {
        let mut rooms = self.rooms();
        let Some(subscribers) = rooms.get_mut(code) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;

        if subscribers.is_empty() {
            rooms.remove(code);
        }

        if removed {
            tracing::debug!(game_id = %code, subscriber_id = id, "unsubscribed");
        }
        removed
    }

    /// Queue `snapshot` for every subscriber of `code`
    ///
    /// Callers publish under the room's write lock, which is what keeps the
    /// per-room order identical to the mutation order.
    pub fn publish(&self, code: &str, snapshot: Arc<RoomSnapshot>) -> PublishReport {
        let mut report = PublishReport::default();
        let mut rooms = self.rooms();
        let Some(subscribers) = rooms.get_mut(code) else {
            return report;
        };

        let max_failures = self.max_failures;
        subscribers.retain_mut(|subscriber| {
            match subscriber.sender.try_send(Arc::clone(&snapshot)) {
                Ok(()) => {
                    subscriber.failures = 0;
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    subscriber.failures += 1;
                    report.failed += 1;
                    if subscriber.failures >= max_failures {
                        tracing::warn!(
                            game_id = %code,
                            subscriber_id = subscriber.id,
                            failures = subscriber.failures,
                            "dropping slow subscriber"
                        );
                        report.dropped += 1;
                        false
                    } else {
                        true
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        game_id = %code,
                        subscriber_id = subscriber.id,
                        "dropping closed subscriber"
                    );
                    report.failed += 1;
                    report.dropped += 1;
                    false
                }
            }
        });

        if subscribers.is_empty() {
            rooms.remove(code);
        }

        tracing::trace!(
            game_id = %code,
            version = snapshot.version,
            delivered = report.delivered,
            failed = report.failed,
            "published snapshot"
        );
        report
    }

    /// Drop every subscriber of `code`; their receivers observe end-of-stream
    pub fn close_room(&self, code: &str) -> usize {
        self.rooms().remove(code).map_or(0, |subs| subs.len())
    }

    pub fn subscriber_count(&self, code: &str) -> usize {
        self.rooms().get(code).map_or(0, Vec::len)
    }

    pub fn total_subscribers(&self) -> usize {
        self.rooms().values().map(Vec::len).sum()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(super::SUBSCRIBER_BUFFER, super::MAX_DELIVERY_FAILURES)
    }
}
