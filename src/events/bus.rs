//! EventBus - central pub/sub system for progress events (spec §4.8)
//!
//! Uses a tokio broadcast channel to deliver events to every subscriber with
//! minimal latency, fire-and-forget: if nobody is listening the event is
//! simply dropped. Alongside the broadcast channel the bus keeps a bounded
//! ring buffer of the last `capacity` events so a late-attaching diagnostics
//! consumer (or a test) can inspect recent history without having subscribed
//! in time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use super::types::{ProgressEvent, TimestampedEvent};

/// Default ring-buffer / diagnostics-history size (spec §4.8: N=100)
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default broadcast channel capacity (events in flight before a slow
/// subscriber starts lagging)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_000;

/// Configuration for an [`EventBus`]. Spec §9 calls for ring-buffer size to
/// be configurable rather than a hardcoded constant.
#[derive(Debug, Clone, Copy)]
pub struct EventBusOptions {
    /// How many recent events the bus retains for diagnostics queries
    pub history_capacity: usize,
    /// Broadcast channel capacity (events buffered per lagging subscriber)
    pub channel_capacity: usize,
}

impl Default for EventBusOptions {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Central event bus for orchestrator activity streaming
pub struct EventBus {
    tx: broadcast::Sender<ProgressEvent>,
    history: Mutex<VecDeque<TimestampedEvent>>,
    history_capacity: usize,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create a new event bus with the given options
    pub fn new(options: EventBusOptions) -> Self {
        debug!(?options.history_capacity, ?options.channel_capacity, "EventBus::new: called");
        let (tx, _) = broadcast::channel(options.channel_capacity.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(options.history_capacity)),
            history_capacity: options.history_capacity,
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new event bus with default options
    pub fn with_default_capacity() -> Self {
        Self::new(EventBusOptions::default())
    }

    /// Emit an event to all subscribers and append it to the diagnostics
    /// ring buffer. Fire-and-forget: no subscribers is not an error.
    pub fn emit(&self, event: ProgressEvent) {
        debug!(event_type = event.event_type(), task_id = event.task_id(), "EventBus::emit");
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = TimestampedEvent {
            id,
            timestamp: Utc::now(),
            event: event.clone(),
        };

        {
            let mut history = self.history.lock().expect("event bus history lock poisoned");
            if history.len() >= self.history_capacity {
                history.pop_front();
            }
            history.push_back(entry);
        }

        // Ignore send errors (no subscribers is fine)
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Snapshot of the last `limit` events (most recent last), for
    /// diagnostics. `limit` is clamped to the retained history size.
    pub fn recent_events(&self, limit: usize) -> Vec<TimestampedEvent> {
        debug!(limit, "EventBus::recent_events: called");
        let history = self.history.lock().expect("event bus history lock poisoned");
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for components to emit events for one task without owning the bus.
/// Cheap to clone.
#[derive(Clone)]
pub struct EventEmitter {
    bus: Arc<EventBus>,
    task_id: String,
}

impl EventEmitter {
    /// The task ID this emitter is bound to
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Emit a raw event through the owning bus
    pub fn emit(&self, event: ProgressEvent) {
        self.bus.emit(event);
    }
}

/// Create an event bus wrapped in an `Arc` for shared ownership, and expose
/// `emitter_for` through the `Arc` (since an `EventEmitter` holds a handle
/// back to the bus for history bookkeeping).
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}

pub fn create_event_bus_with_options(options: EventBusOptions) -> Arc<EventBus> {
    Arc::new(EventBus::new(options))
}

/// Create an emitter for a task from a shared bus handle
pub fn emitter_for(bus: &Arc<EventBus>, task_id: impl Into<String>) -> EventEmitter {
    EventEmitter {
        bus: Arc::clone(bus),
        task_id: task_id.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_creation() {
        let bus = EventBus::new(EventBusOptions::default());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_bus_subscribe() {
        let bus = EventBus::with_default_capacity();
        let _rx1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::with_default_capacity();
        let mut rx = bus.subscribe();

        bus.emit(ProgressEvent::TaskStarted {
            task_id: "t-1".to_string(),
            goal: "buy a phone".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.task_id(), "t-1");
        assert_eq!(event.event_type(), "TaskStarted");
    }

    #[tokio::test]
    async fn test_no_subscribers_does_not_panic() {
        let bus = EventBus::with_default_capacity();
        bus.emit(ProgressEvent::TaskStarted {
            task_id: "t-1".to_string(),
            goal: "buy a phone".to_string(),
        });
    }

    #[tokio::test]
    async fn test_emitter_via_shared_bus() {
        let bus = create_event_bus();
        let mut rx = bus.subscribe();
        let emitter = emitter_for(&bus, "exec-1");

        emitter.emit(ProgressEvent::TaskPlanning {
            task_id: emitter.task_id().to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.task_id(), "exec-1");
    }

    #[test]
    fn test_ring_buffer_bounded() {
        let bus = EventBus::new(EventBusOptions {
            history_capacity: 3,
            channel_capacity: 100,
        });

        for i in 0..10 {
            bus.emit(ProgressEvent::TaskPlanning {
                task_id: format!("t-{i}"),
            });
        }

        let recent = bus.recent_events(100);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.last().unwrap().event.task_id(), "t-9");
    }

    #[test]
    fn test_recent_events_limit() {
        let bus = EventBus::with_default_capacity();
        for i in 0..5 {
            bus.emit(ProgressEvent::TaskPlanning {
                task_id: format!("t-{i}"),
            });
        }
        let recent = bus.recent_events(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].event.task_id(), "t-4");
    }

    #[test]
    fn test_default_history_capacity() {
        assert_eq!(DEFAULT_HISTORY_CAPACITY, 100);
    }
}
