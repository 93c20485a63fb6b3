//! Progress event bus
//!
//! This module provides the event system for live observability into task
//! execution. Every significant transition in a Task's lifecycle (planning,
//! step start/success/failure, retries, provider fallback, pause/resume,
//! completion) emits a [`ProgressEvent`]. Consumers (a CLI progress
//! renderer, an HTTP SSE bridge, a persistence layer) subscribe to the bus
//! rather than reaching into executor internals.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       EVENT BUS                              │
//! │            (tokio::sync::broadcast channel)                  │
//! │                                                              │
//! │  Every transition emits an event. Every consumer subscribes. │
//! └─────────────────────────────────────────────────────────────┘
//!         ↑                    ↑                     ↑
//!    TaskExecutor         StepExecutor         DynamicExecutor
//!    emits:               emits:               emits:
//!    - TaskStarted        - StepStarted        - ProgressUpdate
//!    - TaskPlanning       - StepCompleted       - ReplayStarted
//!    - TaskCompleted      - StepFailed
//!    - TaskFailed         - StepRetrying
//!
//!         ↓                    ↓                     ↓
//! ┌───────────┐        ┌───────────┐         ┌───────────┐
//! │ CLI/TUI   │        │ SSE bridge│         │ Persistence│
//! │ progress  │        │ (host app)│         │ (host app) │
//! └───────────┘        └───────────┘         └───────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use webauto::events::{create_event_bus, emitter_for, ProgressEvent};
//!
//! let bus = create_event_bus();
//! let emitter = emitter_for(&bus, "task-123");
//! emitter.emit(ProgressEvent::TaskStarted {
//!     task_id: "task-123".into(),
//!     goal: "buy a phone".into(),
//! });
//!
//! let mut rx = bus.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("event: {:?}", event);
//! }
//! ```
//!
//! # Event types
//!
//! See [`ProgressEvent`] for the complete closed set.

mod bus;
mod types;

pub use bus::{
    create_event_bus, create_event_bus_with_options, emitter_for, EventBus, EventBusOptions,
    EventEmitter, DEFAULT_CHANNEL_CAPACITY, DEFAULT_HISTORY_CAPACITY,
};
pub use types::{ProgressEvent, TimestampedEvent};
