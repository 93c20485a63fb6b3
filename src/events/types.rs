//! Progress event types streamed out of task/step execution
//!
//! `ProgressEvent` is the vocabulary described in spec §3/§4.8: every
//! significant transition in a Task's lifecycle is emitted as one of these
//! variants, carrying just enough data for an observer (TUI, HTTP SSE
//! bridge, persistence layer) to reconstruct what happened without reaching
//! back into the executor's internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of event types (spec §3)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    TaskStarted { task_id: String, goal: String },
    TaskPlanning { task_id: String },
    TaskPlanReady { task_id: String, step_count: usize },
    TaskExecuting { task_id: String },
    StepStarted {
        task_id: String,
        step_id: String,
        step_index: usize,
        description: String,
    },
    StepCompleted {
        task_id: String,
        step_id: String,
        step_index: usize,
        provider_used: Option<String>,
        duration_ms: u64,
    },
    StepFailed {
        task_id: String,
        step_id: String,
        step_index: usize,
        error: String,
        category: String,
    },
    StepRetrying {
        task_id: String,
        step_id: String,
        retry_count: u32,
        provider: String,
    },
    ProviderFallback {
        task_id: String,
        step_id: String,
        from_strategy: String,
        to_strategy: String,
    },
    InputRequested {
        task_id: String,
        step_id: String,
        prompt: String,
    },
    InputProvided { task_id: String, step_id: String },
    TaskPaused { task_id: String },
    TaskResumed { task_id: String },
    TaskCompleted {
        task_id: String,
        successful_steps: usize,
        failed_steps: usize,
    },
    TaskFailed {
        task_id: String,
        error: String,
        failed_step_id: Option<String>,
        failed_step_description: Option<String>,
        category: Option<String>,
    },
    ProgressUpdate {
        task_id: String,
        percentage: u8,
        data: Value,
    },
    ReplayStarted { task_id: String, from_step_index: usize },
}

impl ProgressEvent {
    /// Task this event belongs to
    pub fn task_id(&self) -> &str {
        match self {
            ProgressEvent::TaskStarted { task_id, .. }
            | ProgressEvent::TaskPlanning { task_id }
            | ProgressEvent::TaskPlanReady { task_id, .. }
            | ProgressEvent::TaskExecuting { task_id }
            | ProgressEvent::StepStarted { task_id, .. }
            | ProgressEvent::StepCompleted { task_id, .. }
            | ProgressEvent::StepFailed { task_id, .. }
            | ProgressEvent::StepRetrying { task_id, .. }
            | ProgressEvent::ProviderFallback { task_id, .. }
            | ProgressEvent::InputRequested { task_id, .. }
            | ProgressEvent::InputProvided { task_id, .. }
            | ProgressEvent::TaskPaused { task_id }
            | ProgressEvent::TaskResumed { task_id }
            | ProgressEvent::TaskCompleted { task_id, .. }
            | ProgressEvent::TaskFailed { task_id, .. }
            | ProgressEvent::ProgressUpdate { task_id, .. }
            | ProgressEvent::ReplayStarted { task_id, .. } => task_id,
        }
    }

    /// Event type name, used for logging and subscriber routing
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::TaskStarted { .. } => "TaskStarted",
            ProgressEvent::TaskPlanning { .. } => "TaskPlanning",
            ProgressEvent::TaskPlanReady { .. } => "TaskPlanReady",
            ProgressEvent::TaskExecuting { .. } => "TaskExecuting",
            ProgressEvent::StepStarted { .. } => "StepStarted",
            ProgressEvent::StepCompleted { .. } => "StepCompleted",
            ProgressEvent::StepFailed { .. } => "StepFailed",
            ProgressEvent::StepRetrying { .. } => "StepRetrying",
            ProgressEvent::ProviderFallback { .. } => "ProviderFallback",
            ProgressEvent::InputRequested { .. } => "InputRequested",
            ProgressEvent::InputProvided { .. } => "InputProvided",
            ProgressEvent::TaskPaused { .. } => "TaskPaused",
            ProgressEvent::TaskResumed { .. } => "TaskResumed",
            ProgressEvent::TaskCompleted { .. } => "TaskCompleted",
            ProgressEvent::TaskFailed { .. } => "TaskFailed",
            ProgressEvent::ProgressUpdate { .. } => "ProgressUpdate",
            ProgressEvent::ReplayStarted { .. } => "ReplayStarted",
        }
    }
}

/// A timestamped event, as held in the bus's ring buffer and handed to
/// diagnostics consumers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub event: ProgressEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_accessor() {
        let event = ProgressEvent::TaskStarted {
            task_id: "t-1".to_string(),
            goal: "buy a phone".to_string(),
        };
        assert_eq!(event.task_id(), "t-1");
    }

    #[test]
    fn test_event_type_name() {
        let event = ProgressEvent::StepRetrying {
            task_id: "t-1".to_string(),
            step_id: "s-1".to_string(),
            retry_count: 1,
            provider: "API".to_string(),
        };
        assert_eq!(event.event_type(), "StepRetrying");
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let event = ProgressEvent::TaskCompleted {
            task_id: "t-1".to_string(),
            successful_steps: 2,
            failed_steps: 0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("TaskCompleted"));
        let parsed: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.task_id(), "t-1");
    }
}
