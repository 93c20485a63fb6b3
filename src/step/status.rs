use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Step status FSM (spec §3): transitions are monotone, Pending→Running is
/// the only entry point, and terminal states are Success/Failed/Skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("illegal step status transition {from:?} -> {to:?}")]
pub struct StepStatusError {
    pub from: StepStatus,
    pub to: StepStatus,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Failed | StepStatus::Skipped)
    }

    /// Validate a proposed transition against the FSM without mutating
    /// anything.
    pub fn validate_transition(&self, next: StepStatus) -> Result<(), StepStatusError> {
        let legal = matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Running)
                | (StepStatus::Pending, StepStatus::Skipped)
                | (StepStatus::Running, StepStatus::Success)
                | (StepStatus::Running, StepStatus::Failed)
        );
        if legal {
            Ok(())
        } else {
            Err(StepStatusError { from: *self, to: next })
        }
    }
}
