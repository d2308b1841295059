//! Durable event queue
//!
//! An ordered sequence of events, append-only except for bulk removal of a
//! delivered batch. The queue itself is pure in-memory state; the tracker
//! persists the serialized form after every mutation so the durable copy and
//! the in-memory copy stay reconciled.
//!
//! Growth is bounded: under sustained delivery failure the oldest events are
//! evicted rather than letting memory grow without limit.

use tracing::warn;

use crate::event::ContextEvent;

// ----------------------------------------------------------------------------
// Event Queue
// ----------------------------------------------------------------------------

/// Ordered, bounded queue of pending events.
#[derive(Debug)]
pub struct EventQueue {
    events: Vec<ContextEvent>,
    capacity: usize,
    evicted: u64,
}

impl EventQueue {
    /// Create an empty queue holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity,
            evicted: 0,
        }
    }

    /// Rebuild a queue from previously persisted events. Restores call order;
    /// anything beyond capacity is evicted oldest-first.
    pub fn restore(events: Vec<ContextEvent>, capacity: usize) -> Self {
        let mut queue = Self::new(capacity);
        for event in events {
            queue.push(event);
        }
        queue
    }

    /// Append an event, evicting the oldest one when full.
    pub fn push(&mut self, event: ContextEvent) {
        if self.events.len() >= self.capacity && !self.events.is_empty() {
            let dropped = self.events.remove(0);
            self.evicted += 1;
            warn!(
                event = %dropped.name,
                evicted_total = self.evicted,
                capacity = self.capacity,
                "event queue full, evicting oldest event"
            );
        }
        self.events.push(event);
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Pending events in call order.
    pub fn events(&self) -> &[ContextEvent] {
        &self.events
    }

    /// Clone of the current contents, used as the batch for one delivery
    /// attempt. The queue itself is not mutated until delivery is confirmed.
    pub fn snapshot(&self) -> Vec<ContextEvent> {
        self.events.clone()
    }

    /// Remove the events of a confirmed batch by id, preserving the order of
    /// everything appended since the snapshot was taken. Returns how many
    /// events were removed.
    pub fn remove_delivered(&mut self, ids: &[String]) -> usize {
        let before = self.events.len();
        self.events.retain(|event| !ids.contains(&event.id));
        before - self.events.len()
    }

    /// Total number of events evicted due to the capacity bound.
    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    /// Serialize the queue contents for persistence (a JSON array).
    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.events)
    }

    /// Parse previously persisted queue contents.
    pub fn deserialize(raw: &str) -> serde_json::Result<Vec<ContextEvent>> {
        serde_json::from_str(raw)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TracekitConfig;
    use crate::context::ContextSnapshot;
    use crate::properties::Properties;
    use crate::session::SessionTracker;
    use crate::store::MemoryStateStore;
    use crate::types::{ManualTimeSource, TimeSource};
    use crate::user::UserStore;
    use std::sync::Arc;

    fn event(name: &str) -> ContextEvent {
        let clock = ManualTimeSource::default();
        let config = TracekitConfig {
            enable_time: false,
            enable_geo: false,
            enable_device: false,
            ..TracekitConfig::default()
        };
        let user = UserStore::new(Arc::new(MemoryStateStore::new()), clock.clone());
        let session = SessionTracker::new(clock.clone());
        let context = ContextSnapshot::capture(&config, &user, &session, &clock);
        ContextEvent::new(name, Properties::new(), context, clock.now())
    }

    #[test]
    fn test_preserves_call_order() {
        let mut queue = EventQueue::new(100);
        for name in ["a", "b", "c"] {
            queue.push(event(name));
        }

        let names: Vec<&str> = queue.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_remove_delivered_keeps_later_appends() {
        let mut queue = EventQueue::new(100);
        for name in ["a", "b", "c"] {
            queue.push(event(name));
        }

        let batch = queue.snapshot();
        let batch_ids: Vec<String> = batch.iter().map(|e| e.id.clone()).collect();

        // Events appended while the batch is in flight
        queue.push(event("d"));
        queue.push(event("e"));

        let removed = queue.remove_delivered(&batch_ids);
        assert_eq!(removed, 3);

        let names: Vec<&str> = queue.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["d", "e"]);
    }

    #[test]
    fn test_failed_delivery_leaves_queue_untouched() {
        let mut queue = EventQueue::new(100);
        for name in ["a", "b"] {
            queue.push(event(name));
        }

        let before = queue.snapshot();
        // A failed delivery performs no removal at all
        assert_eq!(queue.events(), before.as_slice());
    }

    #[test]
    fn test_bounded_eviction_drops_oldest() {
        let mut queue = EventQueue::new(3);
        for name in ["a", "b", "c", "d", "e"] {
            queue.push(event(name));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.evicted_count(), 2);
        let names: Vec<&str> = queue.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["c", "d", "e"]);
    }

    #[test]
    fn test_persistence_round_trip_is_identical() {
        let mut queue = EventQueue::new(100);
        for name in ["a", "b", "c"] {
            queue.push(event(name));
        }

        let raw = queue.serialize().unwrap();
        let restored = EventQueue::restore(EventQueue::deserialize(&raw).unwrap(), 100);

        assert_eq!(restored.events(), queue.events());
    }

    #[test]
    fn test_corrupt_persisted_queue_fails_parse() {
        assert!(EventQueue::deserialize("{not json").is_err());
        assert!(EventQueue::deserialize("[{\"id\": 1}]").is_err());
    }
}
