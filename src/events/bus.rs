//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from admission, the dispatcher and every
//! display worker.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Receivers:
//!   submit()      ──┐
//!   Dispatcher    ──┼──────► Bus ──┬──► subscriber_listener ──► SubscriberSet
//!   DisplayWorker ──┘              └──► Scheduler::subscribe() (callers, tests)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and never fails.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if nobody is subscribed at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Publishes a batch collected while a lock was held.
    pub fn publish_all(&self, events: impl IntoIterator<Item = Event>) {
        for ev in events {
            self.publish(ev);
        }
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_events_in_publish_order() {
        let bus = Bus::new(0);
        let mut rx = bus.subscribe();
        bus.publish_all([
            Event::new(EventKind::RequestAdmitted),
            Event::new(EventKind::RequestProcessed),
        ]);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RequestAdmitted);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RequestProcessed);
    }

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let bus = Bus::new(4);
        bus.publish(Event::new(EventKind::ShutdownRequested));
    }
}
