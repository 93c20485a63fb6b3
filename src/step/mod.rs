//! Step model: wraps one Action with expected output, failure conditions,
//! and execution status (spec §3)

mod status;

pub use status::{StepStatus, StepStatusError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::action::Action;
use crate::result::{ExecutionResult, ExpectedOutput, FailureCondition};

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Status(#[from] StepStatusError),
}

/// Execution metadata accumulated on a Step over its lifetime (spec §3)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StepExecutionMetadata {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub retry_count: u32,
    pub provider_used: Option<String>,
}

impl StepExecutionMetadata {
    /// `completedAt - startedAt`, recomputed whenever both are set (spec §8:
    /// `duration = completedAt - startedAt`)
    pub fn recompute_duration(&mut self) {
        if let (Some(started), Some(completed)) = (self.started_at, self.completed_at) {
            let delta = completed - started;
            self.duration_ms = Some(delta.num_milliseconds().max(0) as u64);
        }
    }
}

/// A planned invocation of one Action (spec §3)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub action: Action,
    pub description: String,
    #[serde(default)]
    pub expected_output: ExpectedOutput,
    #[serde(default)]
    pub failure_conditions: Vec<FailureCondition>,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    status: StepStatus,
    pub result: Option<ExecutionResult>,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: StepExecutionMetadata,
}

impl Step {
    pub fn new(id: impl Into<String>, action: Action, description: impl Into<String>) -> Self {
        let id = id.into();
        debug!(step_id = %id, "Step::new: called");
        Self {
            id,
            action,
            description: description.into(),
            expected_output: ExpectedOutput::new(),
            failure_conditions: Vec::new(),
            context: HashMap::new(),
            status: StepStatus::Pending,
            result: None,
            error: None,
            metadata: StepExecutionMetadata::default(),
        }
    }

    pub fn with_expected_output(mut self, expected: ExpectedOutput) -> Self {
        self.expected_output = expected;
        self
    }

    pub fn with_failure_conditions(mut self, conditions: Vec<FailureCondition>) -> Self {
        self.failure_conditions = conditions;
        self
    }

    pub fn with_context(mut self, context: HashMap<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Transition this step's status, enforcing the FSM of spec §3:
    /// Pending is the only entry point into Running; terminal states
    /// (Success, Failed, Skipped) never transition further.
    pub fn transition(&mut self, next: StepStatus) -> Result<(), StepStatusError> {
        debug!(step_id = %self.id, from = ?self.status, to = ?next, "Step::transition: called");
        self.status.validate_transition(next)?;
        self.status = next;
        Ok(())
    }

    pub fn mark_running(&mut self) -> Result<(), StepStatusError> {
        self.metadata.started_at = Some(Utc::now());
        self.transition(StepStatus::Running)
    }

    pub fn mark_success(&mut self, result: ExecutionResult) -> Result<(), StepStatusError> {
        self.transition(StepStatus::Success)?;
        self.metadata.completed_at = Some(Utc::now());
        self.metadata.recompute_duration();
        if let Some(provider) = result.meta().provider_name.clone() {
            self.metadata.provider_used = Some(provider);
        }
        self.result = Some(result);
        self.error = None;
        Ok(())
    }

    pub fn mark_failed(&mut self, result: ExecutionResult, error: impl Into<String>) -> Result<(), StepStatusError> {
        self.transition(StepStatus::Failed)?;
        self.metadata.completed_at = Some(Utc::now());
        self.metadata.recompute_duration();
        if let Some(provider) = result.meta().provider_name.clone() {
            self.metadata.provider_used = Some(provider);
        }
        self.error = Some(error.into());
        self.result = Some(result);
        Ok(())
    }

    pub fn mark_skipped(&mut self) -> Result<(), StepStatusError> {
        self.transition(StepStatus::Skipped)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Spec §8 invariant: for every terminal Step exactly one of
    /// `result`/`error` is non-null. Non-terminal steps must have neither.
    pub fn check_terminal_invariant(&self) -> bool {
        match self.status {
            StepStatus::Success => self.result.is_some() && self.error.is_none(),
            StepStatus::Failed => self.error.is_some(),
            StepStatus::Skipped => true,
            StepStatus::Pending | StepStatus::Running => self.result.is_none() && self.error.is_none(),
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.metadata.duration_ms.map(Duration::from_millis)
    }
}
