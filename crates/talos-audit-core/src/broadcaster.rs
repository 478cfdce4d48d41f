//! # Event Broadcaster
//!
//! Fans accepted events out to live subscribers (principally SSE clients in
//! `talos-audit-http`) with bounded per-subscriber queues. A slow consumer
//! never blocks ingest and never affects other subscribers: its queue fills
//! up, the newest event is dropped for that subscriber only, and a warning
//! is logged.
//!
//! ## Threat Model
//!
//! - **Slow-consumer denial of service**: without a bound, one stalled
//!   subscriber could grow memory without limit. The queue capacity caps
//!   this per subscriber.
//! - **Head-of-line blocking**: `publish` never awaits a full queue; it
//!   drops and moves on, so one subscriber cannot stall ingest for others.

use crate::models::Event;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

/// Default bound on a subscriber's pending-event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Event>,
}

/// Fan-out broadcaster for accepted events.
#[derive(Clone)]
pub struct Broadcaster {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    queue_capacity: usize,
}

impl Broadcaster {
    pub fn new(queue_capacity: usize) -> Self {
        Broadcaster {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(0)),
            queue_capacity,
        }
    }

    /// Registers a new subscriber and returns a handle to its receive end.
    /// Dropping the returned [`Subscription`] deregisters it, even if the
    /// task holding it is cancelled mid-await rather than returning
    /// normally.
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity.max(1));
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.subscribers.lock().await.push(Subscriber { id, sender: tx });
        Subscription {
            id,
            receiver: rx,
            subscribers: self.subscribers.clone(),
        }
    }

    /// Delivers `event` to every current subscriber, dropping it for any
    /// whose queue is full. Never blocks on a slow consumer.
    pub async fn publish(&self, event: Event) {
        let snapshot: Vec<(u64, mpsc::Sender<Event>)> = {
            let guard = self.subscribers.lock().await;
            guard.iter().map(|s| (s.id, s.sender.clone())).collect()
        };

        for (id, sender) in snapshot {
            if let Err(mpsc::error::TrySendError::Full(_)) = sender.try_send(event.clone()) {
                warn!(subscriber_id = id, "dropping event for slow subscriber");
            }
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}

/// A live subscription. Deregisters itself on drop.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<Event>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl Subscription {
    /// Awaits the next broadcast event, or `None` once the broadcaster is
    /// dropped and the channel closes.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let subscribers = self.subscribers.clone();
        let id = self.id;
        tokio::spawn(async move {
            subscribers.lock().await.retain(|s| s.id != id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Event;
    use std::collections::BTreeMap;

    fn sample_event(id: &str) -> Event {
        Event {
            schema_id: "talos.audit_event".into(),
            schema_version: "v1".into(),
            event_id: id.into(),
            ts: "2026-01-01T00:00:00Z".into(),
            request_id: "r".into(),
            surface_id: "s".into(),
            outcome: "success".into(),
            principal: BTreeMap::new(),
            http: BTreeMap::new(),
            meta: BTreeMap::new(),
            resource: None,
            event_hash: "0".repeat(64),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let broadcaster = Broadcaster::new(4);
        let mut sub = broadcaster.subscribe().await;
        broadcaster.publish(sample_event("e1")).await;
        let received = sub.recv().await.unwrap();
        assert_eq!(received.event_id, "e1");
    }

    #[tokio::test]
    async fn full_queue_drops_for_that_subscriber_only() {
        let broadcaster = Broadcaster::new(1);
        let mut slow = broadcaster.subscribe().await;
        let mut fast = broadcaster.subscribe().await;

        broadcaster.publish(sample_event("e1")).await;
        // fast keeps up; slow never reads and so its one-slot queue stays full.
        assert_eq!(fast.recv().await.unwrap().event_id, "e1");

        broadcaster.publish(sample_event("e2")).await;
        assert_eq!(fast.recv().await.unwrap().event_id, "e2");

        // slow only ever sees the first event; e2 was dropped for it alone.
        let only = slow.recv().await.unwrap();
        assert_eq!(only.event_id, "e1");
    }

    #[tokio::test]
    async fn dropping_subscription_deregisters_it() {
        let broadcaster = Broadcaster::new(4);
        let sub = broadcaster.subscribe().await;
        assert_eq!(broadcaster.subscriber_count().await, 1);
        drop(sub);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(broadcaster.subscriber_count().await, 0);
    }
}
