use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use super::step_executor::{StepExecutor, StepExecutorError};
use crate::config::{StepExecutorOptions, TaskExecutorOptions};
use crate::events::{emitter_for, EventBus, ProgressEvent};
use crate::ids::IdGenerator;
use crate::provider::ProviderRegistry;
use crate::result::ExecutionResult;
use crate::strategy::SelectionCriteria;
use crate::task::{Task, TaskError, TaskStatus};

#[derive(Debug, Error)]
pub enum TaskExecutorError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Step(#[from] StepExecutorError),
    #[error("task is not in a resumable or pending state: {0:?}")]
    NotResumable(TaskStatus),
}

/// Cooperative pause/cancel signal a caller can flip from another task.
/// The executor observes it only at the suspension points named in spec §5
/// (between steps, never mid-provider-call).
#[derive(Default)]
pub struct TaskControl {
    pause_requested: AtomicBool,
    cancel_requested: AtomicBool,
}

impl TaskControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }

    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    fn take_pause(&self) -> bool {
        self.pause_requested.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }
}

/// Sequential state machine executor for a statically-planned Task
/// (spec §4.6).
pub struct TaskExecutor<'a> {
    registry: &'a ProviderRegistry,
    id_gen: &'a dyn IdGenerator,
    step_options: StepExecutorOptions,
    task_options: TaskExecutorOptions,
    bus: Arc<EventBus>,
}

impl<'a> TaskExecutor<'a> {
    pub fn new(
        registry: &'a ProviderRegistry,
        id_gen: &'a dyn IdGenerator,
        step_options: StepExecutorOptions,
        task_options: TaskExecutorOptions,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            id_gen,
            step_options,
            task_options,
            bus,
        }
    }

    /// `Execute(Task, ctx) -> ExecutionResult` (spec §4.6). Resumable: call
    /// again on a `Paused`/`WaitingForInput` task to continue from where it
    /// left off. `resume_input` carries a human's answer to the task's
    /// `pending_input_request` (spec §4.6 "Input requests": attaches the
    /// response under `task.providedInput` and re-executes the current
    /// step); ignored unless the task is `WaitingForInput`.
    pub async fn execute(&self, task: &mut Task, criteria: &SelectionCriteria, control: &TaskControl, resume_input: Option<Value>) -> Result<ExecutionResult, TaskExecutorError> {
        debug!(task_id = %task.id, status = ?task.status(), "TaskExecutor::execute: called");
        let emitter = emitter_for(&self.bus, task.id.clone());
        let mut resume_step_id: Option<String> = None;

        match task.status() {
            TaskStatus::Pending => {
                task.start()?;
                emitter.emit(ProgressEvent::TaskStarted {
                    task_id: task.id.clone(),
                    goal: task.goal.clone(),
                });
                if task.is_empty() {
                    task.complete()?;
                    emitter.emit(ProgressEvent::TaskCompleted {
                        task_id: task.id.clone(),
                        successful_steps: 0,
                        failed_steps: 0,
                    });
                    return Ok(ExecutionResult::success(json!(task.result)));
                }
                emitter.emit(ProgressEvent::TaskExecuting { task_id: task.id.clone() });
            }
            TaskStatus::Paused | TaskStatus::WaitingForInput => {
                if task.status() == TaskStatus::WaitingForInput {
                    let request = task.clear_input_request()?;
                    if let Some(answer) = resume_input {
                        if let Some(step) = task.step_mut(&request.step_id) {
                            step.context.insert("providedInput".to_string(), answer);
                        }
                        emitter.emit(ProgressEvent::InputProvided {
                            task_id: task.id.clone(),
                            step_id: request.step_id.clone(),
                        });
                    }
                    resume_step_id = Some(request.step_id);
                }
                task.resume()?;
                emitter.emit(ProgressEvent::TaskResumed { task_id: task.id.clone() });
            }
            other => return Err(TaskExecutorError::NotResumable(other)),
        }

        loop {
            if control.is_cancelled() {
                task.fail("Cancelled")?;
                emitter.emit(ProgressEvent::TaskFailed {
                    task_id: task.id.clone(),
                    error: "Cancelled".to_string(),
                    failed_step_id: None,
                    failed_step_description: None,
                    category: None,
                });
                return Ok(ExecutionResult::failure("Cancelled", crate::result::ErrorCategory::Unknown));
            }

            // A step left Running by a prior InputRequested return is not
            // Pending, so it won't surface from `next_pending_index` — the
            // first iteration after a resume-with-input re-targets it
            // explicitly instead of scanning forward.
            let step_index = match resume_step_id.take() {
                Some(id) => match task.steps().iter().position(|s| s.id == id) {
                    Some(index) => index,
                    None => break,
                },
                None => match task.next_pending_index() {
                    Some(index) => index,
                    None => break,
                },
            };

            let (step_id, description) = {
                let step = &task.steps()[step_index];
                (step.id.clone(), step.description.clone())
            };

            emitter.emit(ProgressEvent::StepStarted {
                task_id: task.id.clone(),
                step_id: step_id.clone(),
                step_index,
                description,
            });

            let step_executor = StepExecutor::new(self.registry, self.id_gen, self.step_options.clone());
            let step = task.step_mut(&step_id).expect("step just looked up by id exists");
            let result = step_executor.execute(step, criteria, &emitter).await?;

            if let Some(prompt) = result.data().and_then(|d| d.get("requiresInput")).and_then(|v| v.as_str()) {
                let prompt = prompt.to_string();
                task.request_input(step_id.clone(), prompt.clone())?;
                emitter.emit(ProgressEvent::InputRequested {
                    task_id: task.id.clone(),
                    step_id,
                    prompt,
                });
                return Ok(result);
            }

            if result.is_success() {
                emitter.emit(ProgressEvent::StepCompleted {
                    task_id: task.id.clone(),
                    step_id: step_id.clone(),
                    step_index,
                    provider_used: result.meta().provider_name.clone(),
                    duration_ms: result.meta().duration_ms.unwrap_or(0),
                });
            } else {
                emitter.emit(ProgressEvent::StepFailed {
                    task_id: task.id.clone(),
                    step_id: step_id.clone(),
                    step_index,
                    error: result.error_message().unwrap_or("step failed").to_string(),
                    category: result.category().map(|c| format!("{c:?}")).unwrap_or_else(|| "Unknown".to_string()),
                });
            }

            emitter.emit(ProgressEvent::ProgressUpdate {
                task_id: task.id.clone(),
                percentage: task.progress(),
                data: json!({"stepId": step_id}),
            });

            if !result.is_success() && !self.task_options.continue_on_step_failure {
                let failed_step_description = task.step(&step_id).map(|s| s.description.clone());
                let category = result.category().map(|c| format!("{c:?}"));
                let message = result.error_message().unwrap_or("step failed").to_string();
                task.fail(message.clone())?;
                emitter.emit(ProgressEvent::TaskFailed {
                    task_id: task.id.clone(),
                    error: message,
                    failed_step_id: Some(step_id),
                    failed_step_description,
                    category,
                });
                return Ok(result);
            }

            task.advance();

            if control.take_pause() {
                task.pause()?;
                emitter.emit(ProgressEvent::TaskPaused { task_id: task.id.clone() });
                return Ok(ExecutionResult::PartialSuccess {
                    data: json!({"paused": true}),
                    reason: "paused by caller".to_string(),
                    meta: Default::default(),
                });
            }
        }

        task.complete()?;
        info!(task_id = %task.id, "TaskExecutor::execute: task completed");
        emitter.emit(ProgressEvent::TaskCompleted {
            task_id: task.id.clone(),
            successful_steps: task.execution_metadata.completed_steps,
            failed_steps: task.execution_metadata.failed_steps,
        });
        Ok(ExecutionResult::success(json!(task.result)))
    }
}
