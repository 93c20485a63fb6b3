use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task status FSM (spec §3). Only these transitions are legal:
/// Pending→Running; Running→{Paused, WaitingForInput, Failed, Completed};
/// Paused→{Running, Failed}; WaitingForInput→{Running, Failed};
/// Failed/Completed are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Paused,
    WaitingForInput,
    Failed,
    Completed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("illegal task status transition {from:?} -> {to:?}")]
pub struct TaskStatusError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Completed)
    }

    pub fn validate_transition(&self, next: TaskStatus) -> Result<(), TaskStatusError> {
        use TaskStatus::*;
        let legal = matches!(
            (self, next),
            (Pending, Running)
                | (Running, Paused)
                | (Running, WaitingForInput)
                | (Running, Failed)
                | (Running, Completed)
                | (Paused, Running)
                | (Paused, Failed)
                | (WaitingForInput, Running)
                | (WaitingForInput, Failed)
        );
        if legal {
            Ok(())
        } else {
            Err(TaskStatusError { from: *self, to: next })
        }
    }
}
