//! Task model: an ordered list of Steps pursuing a goal, with an explicit
//! state machine (spec §3, §4.6, §6.4)

mod status;

pub use status::{TaskStatus, TaskStatusError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::step::{Step, StepStatus};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Status(#[from] TaskStatusError),
    #[error("no step with id `{0}` on this task")]
    UnknownStep(String),
    #[error("task has no pending input request")]
    NoPendingInputRequest,
}

/// A step-level request for human input (spec §4.6 "Input requests")
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputRequest {
    pub step_id: String,
    pub prompt: String,
}

/// Creation/update timestamps, separate from execution timing (spec §6.4 `metadata`)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for TaskMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

/// Execution-specific timing and step counts (spec §6.4 `executionMetadata`)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskExecutionMetadata {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
}

/// Final aggregate produced when a task runs out of steps (spec §4.6)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskAggregate {
    pub goal: String,
    pub successful_steps: Vec<String>,
    pub failed_steps: Vec<String>,
    pub all_step_results: Vec<StepResultSummary>,
    pub summary: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepResultSummary {
    pub step_id: String,
    pub status: StepStatus,
    pub provider_used: Option<String>,
}

/// An ordered list of Steps pursuing a goal, with an explicit state machine
/// (spec §3)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub goal: String,
    steps: Vec<Step>,
    status: TaskStatus,
    current_step_index: usize,
    pub result: Option<TaskAggregate>,
    pub error: Option<String>,
    pending_input_request: Option<InputRequest>,
    pub metadata: TaskMetadata,
    pub execution_metadata: TaskExecutionMetadata,
}

impl Task {
    pub fn new(id: impl Into<String>, goal: impl Into<String>, steps: Vec<Step>) -> Self {
        let id = id.into();
        debug!(task_id = %id, step_count = steps.len(), "Task::new: called");
        let total_steps = steps.len();
        Self {
            id,
            goal: goal.into(),
            steps,
            status: TaskStatus::Pending,
            current_step_index: 0,
            result: None,
            error: None,
            pending_input_request: None,
            metadata: TaskMetadata::default(),
            execution_metadata: TaskExecutionMetadata {
                total_steps,
                ..Default::default()
            },
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn pending_input_request(&self) -> Option<&InputRequest> {
        self.pending_input_request.as_ref()
    }

    fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }

    /// Enforce the task FSM (spec §3). A task in a terminal state is never
    /// mutated except through this gate, which forbids any outgoing
    /// transition from a terminal state.
    pub fn transition(&mut self, next: TaskStatus) -> Result<(), TaskError> {
        debug!(task_id = %self.id, from = ?self.status, to = ?next, "Task::transition: called");
        self.status.validate_transition(next)?;
        self.status = next;
        self.touch();
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), TaskError> {
        self.transition(TaskStatus::Running)?;
        self.execution_metadata.started_at = Some(Utc::now());
        Ok(())
    }

    /// `Task.NextStep()` (spec §4.6): the first Step whose status is
    /// Pending, scanning from `currentStepIndex` forward.
    pub fn next_step(&self) -> Option<&Step> {
        self.steps[self.current_step_index..]
            .iter()
            .find(|s| s.status() == StepStatus::Pending)
    }

    /// Index of the step `next_step` would return, if any. Exposed for
    /// executors that need to stamp a `step_index` onto progress events.
    pub fn next_pending_index(&self) -> Option<usize> {
        self.steps[self.current_step_index..]
            .iter()
            .position(|s| s.status() == StepStatus::Pending)
            .map(|offset| offset + self.current_step_index)
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    /// `Task.UpdateStep(stepId, status, result|error)` (spec §4.6)
    pub fn update_step(&mut self, step_id: &str, status: StepStatus) -> Result<(), TaskError> {
        debug!(task_id = %self.id, step_id, ?status, "Task::update_step: called");
        let step = self.step_mut(step_id).ok_or_else(|| TaskError::UnknownStep(step_id.to_string()))?;
        step.transition(status)?;
        self.touch();
        Ok(())
    }

    /// Advance `currentStepIndex` past the step just completed. Spec
    /// invariant: non-decreasing over the life of the task.
    pub fn advance(&mut self) {
        if let Some(next) = self.next_pending_index() {
            if next > self.current_step_index {
                self.current_step_index = next;
            } else {
                self.current_step_index += 1;
            }
        } else {
            self.current_step_index = self.steps.len();
        }
        self.touch();
    }

    /// `Task.progress()` (spec §8): `round(100 * |{Success,Skipped}| /
    /// totalSteps)`, clamped to `[0,100]`. Empty task reports 100.
    pub fn progress(&self) -> u8 {
        if self.steps.is_empty() {
            return 100;
        }
        let done = self
            .steps
            .iter()
            .filter(|s| matches!(s.status(), StepStatus::Success | StepStatus::Skipped))
            .count();
        let pct = (100.0 * done as f64 / self.steps.len() as f64).round();
        pct.clamp(0.0, 100.0) as u8
    }

    pub fn pause(&mut self) -> Result<(), TaskError> {
        self.transition(TaskStatus::Paused)
    }

    pub fn resume(&mut self) -> Result<(), TaskError> {
        self.transition(TaskStatus::Running)
    }

    pub fn request_input(&mut self, step_id: impl Into<String>, prompt: impl Into<String>) -> Result<(), TaskError> {
        self.transition(TaskStatus::WaitingForInput)?;
        self.pending_input_request = Some(InputRequest {
            step_id: step_id.into(),
            prompt: prompt.into(),
        });
        Ok(())
    }

    /// Clears the pending input request; the caller is expected to have
    /// attached the response to the relevant step's context before calling
    /// `resume`.
    pub fn clear_input_request(&mut self) -> Result<InputRequest, TaskError> {
        self.pending_input_request.take().ok_or(TaskError::NoPendingInputRequest)
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(error.into());
        self.execution_metadata.completed_at = Some(Utc::now());
        self.recompute_duration();
        Ok(())
    }

    /// Build the final aggregate and transition to Completed (spec §4.6
    /// "Upon running out of steps").
    pub fn complete(&mut self) -> Result<(), TaskError> {
        let successful_steps: Vec<String> = self
            .steps
            .iter()
            .filter(|s| s.status() == StepStatus::Success)
            .map(|s| s.id.clone())
            .collect();
        let failed_steps: Vec<String> = self
            .steps
            .iter()
            .filter(|s| s.status() == StepStatus::Failed)
            .map(|s| s.id.clone())
            .collect();
        let all_step_results = self
            .steps
            .iter()
            .map(|s| StepResultSummary {
                step_id: s.id.clone(),
                status: s.status(),
                provider_used: s.metadata.provider_used.clone(),
            })
            .collect();

        self.transition(TaskStatus::Completed)?;
        self.execution_metadata.completed_steps = successful_steps.len();
        self.execution_metadata.failed_steps = failed_steps.len();
        self.execution_metadata.skipped_steps = self.steps.iter().filter(|s| s.status() == StepStatus::Skipped).count();
        self.execution_metadata.completed_at = Some(Utc::now());
        self.recompute_duration();

        let summary = format!(
            "{} of {} steps succeeded pursuing goal: {}",
            successful_steps.len(),
            self.steps.len(),
            self.goal
        );
        self.result = Some(TaskAggregate {
            goal: self.goal.clone(),
            successful_steps,
            failed_steps,
            all_step_results,
            summary,
        });
        Ok(())
    }

    fn recompute_duration(&mut self) {
        if let (Some(started), Some(completed)) = (self.execution_metadata.started_at, self.execution_metadata.completed_at) {
            let delta = completed - started;
            self.execution_metadata.duration_ms = Some(delta.num_milliseconds().max(0) as u64);
        }
    }

    /// Spec §8 boundary behavior: empty step list completes immediately
    /// with an empty aggregate.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn extra_context(&self) -> Value {
        Value::Object(Default::default())
    }
}
