//! Dynamic (AI-feedback loop) executor (spec §4.7): an alternative to the
//! static-plan Task Executor for when the plan is not known in advance.
//! Execute -> extract -> decide -> repeat, with cycle and budget guards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::action::{Action, ActionError};
use crate::ai::{AiOracle, AiOracleError};
use crate::config::DynamicExecutorOptions;
use crate::events::{emitter_for, EventBus, ProgressEvent};
use crate::executor::{ActionExecutor, TaskControl};
use crate::ids::IdGenerator;
use crate::provider::ProviderRegistry;
use crate::strategy::{SelectionCriteria, StrategySelector};

use super::context::{ExecutionContext, TerminationReason};
use super::page_state::PageStateExtractor;

#[derive(Debug, Error)]
pub enum DynamicExecutorError {
    #[error(transparent)]
    Oracle(#[from] AiOracleError),
    #[error("oracle proposed an invalid action: {0}")]
    InvalidAction(#[from] ActionError),
    #[error("no provider available to execute action {0}")]
    NoStrategyForAction(String),
}

/// `ExecuteWithFeedback(goal, opts) -> {success, collectedData, summary,
/// contextSnapshot}` (spec §4.7)
#[derive(Clone, Debug)]
pub struct DynamicExecutionOutcome {
    pub success: bool,
    pub collected_data: HashMap<String, Value>,
    pub summary: String,
    pub context_snapshot: Value,
}

/// Reads a value out of `data` by a dotted field-path selector. A missing
/// selector (spec's `dataToExtract: map<key, selector-or-null>` with a null
/// selector) collects the whole payload instead.
fn extract_by_selector(data: &Value, selector: Option<&str>) -> Value {
    match selector {
        None => data.clone(),
        Some(path) => {
            let mut current = data;
            for segment in path.split('.') {
                match current.get(segment) {
                    Some(next) => current = next,
                    None => return Value::Null,
                }
            }
            current.clone()
        }
    }
}

/// Alternative to the Task Executor (spec §4.6) for goals without a known
/// plan: consults an `AiOracle` after every action to choose the next one.
pub struct DynamicExecutor<'a> {
    registry: &'a ProviderRegistry,
    id_gen: &'a dyn IdGenerator,
    oracle: Arc<dyn AiOracle>,
    options: DynamicExecutorOptions,
    bus: Arc<EventBus>,
}

impl<'a> DynamicExecutor<'a> {
    pub fn new(registry: &'a ProviderRegistry, id_gen: &'a dyn IdGenerator, oracle: Arc<dyn AiOracle>, options: DynamicExecutorOptions, bus: Arc<EventBus>) -> Self {
        Self {
            registry,
            id_gen,
            oracle,
            options,
            bus,
        }
    }

    /// `ExecuteWithFeedback(goal, opts)` (spec §4.7 algorithm).
    pub async fn execute_with_feedback(&self, goal: impl Into<String>, criteria: &SelectionCriteria, control: &TaskControl) -> Result<DynamicExecutionOutcome, DynamicExecutorError> {
        let goal = goal.into();
        let task_id = self.id_gen.next_id("dyn-task");
        info!(task_id = %task_id, %goal, "DynamicExecutor::execute_with_feedback: called");
        let emitter = emitter_for(&self.bus, task_id.clone());

        let mut ctx = ExecutionContext::new(goal.clone(), self.options.clone());
        emitter.emit(ProgressEvent::TaskStarted {
            task_id: task_id.clone(),
            goal: goal.clone(),
        });
        emitter.emit(ProgressEvent::ProgressUpdate {
            task_id: task_id.clone(),
            percentage: 0,
            data: json!({"mode": "dynamic"}),
        });

        let selector = StrategySelector::new(self.registry);
        let action_executor = ActionExecutor::new(self.id_gen);

        loop {
            if control_cancelled(control) {
                ctx.mark_failed("Cancelled");
                break;
            }

            let (cont, reason) = ctx.should_continue();
            if !cont {
                debug!(task_id = %task_id, ?reason, "DynamicExecutor::execute_with_feedback: stopping");
                break;
            }

            let cycle = ctx.detect_cycle();
            if cycle.has_cycle {
                let url = cycle.url.unwrap_or_default();
                warn!(task_id = %task_id, %url, count = cycle.visit_count, "DynamicExecutor::execute_with_feedback: cycle detected");
                ctx.mark_failed(format!("loop on {url}"));
                break;
            }

            let decision = self.oracle.decide_next_action(&ctx.for_ai()).await?;

            let Some(next_action) = decision.next_action.filter(|_| !decision.goal_achieved) else {
                ctx.mark_goal_achieved(decision.reasoning);
                break;
            };

            let action = Action::new(next_action.kind, next_action.params)?;

            let Some((_strategy, provider)) = selector.select(&action, criteria).await else {
                return Err(DynamicExecutorError::NoStrategyForAction(action.kind().to_string()));
            };

            let started = Instant::now();
            let result = action_executor.execute(&action, &provider).await;
            let elapsed = started.elapsed();
            let succeeded = result.is_success();
            let result_data = result.data().cloned();

            if succeeded {
                if let Some(data) = &result_data {
                    let page_state = PageStateExtractor::extract_from_result_data(data);
                    ctx.update_page_state(page_state);
                    for (key, field_selector) in &decision.data_to_extract {
                        let value = extract_by_selector(data, field_selector.as_deref());
                        ctx.collect(key.clone(), value);
                    }
                }
            }

            let iteration = ctx.iteration_count() + 1;
            ctx.add_action(action.clone(), result, elapsed);

            emitter.emit(ProgressEvent::ProgressUpdate {
                task_id: task_id.clone(),
                percentage: 0,
                data: json!({
                    "iteration": iteration,
                    "actionKind": action.kind().to_string(),
                    "success": succeeded,
                }),
            });
        }

        let success = ctx.goal_achieved();
        let summary = ctx.summary();
        let collected_data = ctx.collected_data().clone();
        let context_snapshot = ctx.for_ai();

        if success {
            emitter.emit(ProgressEvent::TaskCompleted {
                task_id: task_id.clone(),
                successful_steps: ctx.iteration_count() as usize,
                failed_steps: 0,
            });
        } else {
            emitter.emit(ProgressEvent::TaskFailed {
                task_id: task_id.clone(),
                error: ctx.failure_reason().unwrap_or("dynamic execution did not converge").to_string(),
                failed_step_id: None,
                failed_step_description: None,
                category: None,
            });
        }

        Ok(DynamicExecutionOutcome {
            success,
            collected_data,
            summary,
            context_snapshot,
        })
    }
}

fn control_cancelled(control: &TaskControl) -> bool {
    control.is_cancelled()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, ActionParams};
    use crate::ai::mock::MockAiOracle;
    use crate::ai::{NextActionChoice, NextActionSpec};
    use crate::provider::mock::MockProvider;
    use crate::provider::{Reliability, Speed};
    use crate::result::ExecutionResult;
    use crate::strategy::Strategy;
    use std::time::Duration;

    fn registry_with_navigate_responses(htmls: Vec<&str>) -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        let responses = htmls
            .into_iter()
            .map(|html| ExecutionResult::success(json!({"url": "https://x/page", "html": html})))
            .collect();
        registry.register(Strategy::Api, Arc::new(MockProvider::new("API", MockProvider::full_capabilities(Speed::Fast, Reliability::High), responses)));
        registry
    }

    fn navigate_decision() -> NextActionChoice {
        NextActionChoice {
            goal_achieved: false,
            reasoning: "keep navigating".into(),
            next_action: Some(NextActionSpec {
                kind: ActionKind::Navigate,
                params: ActionParams::Navigate { url: "https://x/page".into(), wait_for: None },
                description: "go to page".into(),
            }),
            data_to_extract: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_goal_achieved_stops_loop() {
        let registry = registry_with_navigate_responses(vec!["<html></html>"]);
        let id_gen = crate::ids::UuidV7IdGenerator;
        let oracle = Arc::new(MockAiOracle::new().with_decision(NextActionChoice {
            goal_achieved: true,
            reasoning: "already have the price".into(),
            next_action: None,
            data_to_extract: HashMap::new(),
        }));
        let bus = crate::events::create_event_bus();
        let executor = DynamicExecutor::new(&registry, &id_gen, oracle, DynamicExecutorOptions::default(), bus);
        let control = TaskControl::new();

        let outcome = executor.execute_with_feedback("collect price", &SelectionCriteria::none(), &control).await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_cycle_detection_marks_failure() {
        let registry = registry_with_navigate_responses(vec!["<html></html>", "<html></html>", "<html></html>"]);
        let id_gen = crate::ids::UuidV7IdGenerator;
        let mut oracle = MockAiOracle::new();
        for _ in 0..3 {
            oracle = oracle.with_decision(navigate_decision());
        }
        let oracle = Arc::new(oracle);
        let bus = crate::events::create_event_bus();
        let options = DynamicExecutorOptions {
            max_iterations: 10,
            timeout: Duration::from_secs(60),
            cycle_threshold: 3,
        };
        let executor = DynamicExecutor::new(&registry, &id_gen, oracle, options, bus);
        let control = TaskControl::new();

        let outcome = executor.execute_with_feedback("collect top 3 product prices", &SelectionCriteria::none(), &control).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.summary.contains("https://x/page"));
    }

    #[tokio::test]
    async fn test_max_iterations_guard() {
        let registry = registry_with_navigate_responses(vec!["<html></html>"; 2]);
        let id_gen = crate::ids::UuidV7IdGenerator;
        let mut oracle = MockAiOracle::new();
        for i in 0..2 {
            oracle = oracle.with_decision(NextActionChoice {
                goal_achieved: false,
                reasoning: "keep going".into(),
                next_action: Some(NextActionSpec {
                    kind: ActionKind::Navigate,
                    params: ActionParams::Navigate { url: format!("https://x/page{i}"), wait_for: None },
                    description: "go".into(),
                }),
                data_to_extract: HashMap::new(),
            });
        }
        let oracle = Arc::new(oracle);
        let bus = crate::events::create_event_bus();
        let options = DynamicExecutorOptions {
            max_iterations: 2,
            timeout: Duration::from_secs(60),
            cycle_threshold: 3,
        };
        let executor = DynamicExecutor::new(&registry, &id_gen, oracle, options, bus);
        let control = TaskControl::new();

        let outcome = executor.execute_with_feedback("goal", &SelectionCriteria::none(), &control).await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_data_extraction_collects_selected_fields() {
        let registry = registry_with_navigate_responses(vec!["<html></html>"]);
        let id_gen = crate::ids::UuidV7IdGenerator;
        let mut data_to_extract = HashMap::new();
        data_to_extract.insert("pageUrl".to_string(), Some("url".to_string()));
        let oracle = Arc::new(
            MockAiOracle::new()
                .with_decision(NextActionChoice {
                    goal_achieved: false,
                    reasoning: "navigate then collect".into(),
                    next_action: Some(NextActionSpec {
                        kind: ActionKind::Navigate,
                        params: ActionParams::Navigate { url: "https://x/page".into(), wait_for: None },
                        description: "go".into(),
                    }),
                    data_to_extract,
                })
                .with_decision(NextActionChoice {
                    goal_achieved: true,
                    reasoning: "done".into(),
                    next_action: None,
                    data_to_extract: HashMap::new(),
                }),
        );
        let bus = crate::events::create_event_bus();
        let executor = DynamicExecutor::new(&registry, &id_gen, oracle, DynamicExecutorOptions::default(), bus);
        let control = TaskControl::new();

        let outcome = executor.execute_with_feedback("goal", &SelectionCriteria::none(), &control).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.collected_data.get("pageUrl"), Some(&json!("https://x/page")));
    }

    #[tokio::test]
    async fn test_no_provider_available_errors() {
        let registry = ProviderRegistry::new();
        let id_gen = crate::ids::UuidV7IdGenerator;
        let oracle = Arc::new(MockAiOracle::new().with_decision(navigate_decision()));
        let bus = crate::events::create_event_bus();
        let executor = DynamicExecutor::new(&registry, &id_gen, oracle, DynamicExecutorOptions::default(), bus);
        let control = TaskControl::new();

        let result = executor.execute_with_feedback("goal", &SelectionCriteria::none(), &control).await;
        assert!(matches!(result, Err(DynamicExecutorError::NoStrategyForAction(_))));
    }
}
