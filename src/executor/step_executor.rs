use tracing::{debug, info, warn};

use super::action_executor::ActionExecutor;
use crate::config::StepExecutorOptions;
use crate::events::{EventEmitter, ProgressEvent};
use crate::ids::IdGenerator;
use crate::provider::ProviderRegistry;
use crate::result::{validate_expected_output, ErrorCategory, ExecutionResult};
use crate::step::Step;
use crate::strategy::{SelectionCriteria, StrategySelector};

#[derive(Debug, thiserror::Error)]
pub enum StepExecutorError {
    #[error(transparent)]
    Step(#[from] crate::step::StepStatusError),
}

/// `Execute(Step, ctx) -> ExecutionResult` (spec §4.5): retry-with-backoff,
/// fallback across strategies, failure-condition check.
pub struct StepExecutor<'a> {
    registry: &'a ProviderRegistry,
    id_gen: &'a dyn IdGenerator,
    options: StepExecutorOptions,
}

impl<'a> StepExecutor<'a> {
    pub fn new(registry: &'a ProviderRegistry, id_gen: &'a dyn IdGenerator, options: StepExecutorOptions) -> Self {
        Self { registry, id_gen, options }
    }

    pub async fn execute(
        &self,
        step: &mut Step,
        criteria: &SelectionCriteria,
        emitter: &EventEmitter,
    ) -> Result<ExecutionResult, StepExecutorError> {
        debug!(step_id = %step.id, "StepExecutor::execute: called");
        if step.status() == crate::step::StepStatus::Pending {
            step.mark_running()?;
        }

        let selector = StrategySelector::new(self.registry);
        let Some((mut strategy, mut provider)) = selector.select(&step.action, criteria).await else {
            warn!(step_id = %step.id, "StepExecutor::execute: no strategy available");
            let result = ExecutionResult::failure("no healthy provider available for any strategy", ErrorCategory::ProviderError);
            step.mark_failed(result.clone(), "no strategy available")?;
            return Ok(result);
        };

        let action_executor = ActionExecutor::new(self.id_gen);
        let mut retry_count_for_strategy: u32 = 0;
        let mut total_retry_count: u32 = 0;

        loop {
            let result = action_executor.execute(&step.action, &provider).await;

            if result.is_success() {
                let data = result.data().cloned().unwrap_or_else(|| serde_json::json!({}));

                if let Some(prompt) = data.get("requiresInput").and_then(|v| v.as_str()) {
                    if !step.context.contains_key("providedInput") {
                        debug!(step_id = %step.id, prompt, "StepExecutor::execute: step requests human input, leaving step running");
                        return Ok(ExecutionResult::PartialSuccess {
                            data,
                            reason: format!("requires input: {prompt}"),
                            meta: result.meta().clone(),
                        });
                    }
                }

                let warnings = validate_expected_output(&data, &step.expected_output);
                let condition_triggered = step.failure_conditions.iter().any(|cond| cond.evaluate(&data));

                if condition_triggered {
                    let failure = ExecutionResult::Failure {
                        error: "failure condition matched on successful result".to_string(),
                        category: ErrorCategory::ValidationError,
                        meta: result.meta().clone(),
                    };
                    step.metadata.retry_count = total_retry_count;
                    step.mark_failed(failure.clone(), "failure condition matched on successful result")?;
                    return Ok(failure);
                }

                let mut finalized = result;
                for warning in warnings {
                    finalized.meta_mut().push_warning(warning);
                }
                step.metadata.retry_count = total_retry_count;
                step.mark_success(finalized.clone())?;
                return Ok(finalized);
            }

            if result.is_retryable() && retry_count_for_strategy < self.options.max_retries {
                retry_count_for_strategy += 1;
                total_retry_count += 1;
                step.metadata.retry_count = total_retry_count;
                emitter.emit(ProgressEvent::StepRetrying {
                    task_id: emitter.task_id().to_string(),
                    step_id: step.id.clone(),
                    retry_count: retry_count_for_strategy,
                    provider: provider.name().to_string(),
                });
                let delay = self.options.retry_delay * retry_count_for_strategy;
                tokio::time::sleep(delay).await;
                continue;
            }

            match selector.fallback(strategy, result.is_retryable(), criteria).await {
                Some((next_strategy, next_provider)) => {
                    info!(step_id = %step.id, from = %strategy, to = %next_strategy, "StepExecutor::execute: falling back");
                    emitter.emit(ProgressEvent::ProviderFallback {
                        task_id: emitter.task_id().to_string(),
                        step_id: step.id.clone(),
                        from_strategy: strategy.to_string(),
                        to_strategy: next_strategy.to_string(),
                    });
                    strategy = next_strategy;
                    provider = next_provider;
                    retry_count_for_strategy = 0;
                    continue;
                }
                None => {
                    step.metadata.retry_count = total_retry_count;
                    let message = result.error_message().unwrap_or("step failed").to_string();
                    step.mark_failed(result.clone(), message)?;
                    return Ok(result);
                }
            }
        }
    }
}
