//! Orchestrator (spec §2 "System overview" control-flow diagrams): owns the
//! provider registry and event bus as explicit instances rather than
//! module-level singletons (spec §9 "Global state"), and wires together the
//! two control-flow paths a host embeds against:
//!
//! - static plan: `Orchestrator -> Planner -> Task -> TaskExecutor`
//! - dynamic: `Orchestrator -> DynamicExecutor`
//!
//! The Planner step itself is just `AiOracle::generate_plan` turned into a
//! `Task`; this module owns no planning logic of its own.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::action::{Action, ActionError};
use crate::ai::{AiOracle, AiOracleError};
use crate::config::Config;
use crate::dynamic::{DynamicExecutionOutcome, DynamicExecutor, DynamicExecutorError};
use crate::events::{create_event_bus_with_options, EventBus, EventBusOptions};
use crate::executor::{TaskControl, TaskExecutor, TaskExecutorError};
use crate::goal::GoalParser;
use crate::ids::{IdGenerator, UuidV7IdGenerator};
use crate::provider::ProviderRegistry;
use crate::result::ExecutionResult;
use crate::strategy::SelectionCriteria;
use crate::step::Step;
use crate::task::Task;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Oracle(#[from] AiOracleError),
    #[error(transparent)]
    Task(#[from] TaskExecutorError),
    #[error(transparent)]
    Dynamic(#[from] DynamicExecutorError),
    #[error("planner produced an invalid plan: {0}")]
    InvalidPlan(String),
}

impl From<ActionError> for OrchestratorError {
    fn from(err: ActionError) -> Self {
        OrchestratorError::InvalidPlan(err.to_string())
    }
}

/// Top-level entry point a host application constructs once and reuses
/// across tasks. Holds the registry and bus that the spec's "Global state"
/// note calls for injecting explicitly instead of reaching for a singleton.
pub struct Orchestrator {
    registry: ProviderRegistry,
    bus: Arc<EventBus>,
    id_gen: Box<dyn IdGenerator>,
    config: Config,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        info!("Orchestrator::new: called");
        let bus = create_event_bus_with_options(EventBusOptions {
            history_capacity: config.event_bus_capacity,
            ..EventBusOptions::default()
        });
        Self {
            registry: ProviderRegistry::new(),
            bus,
            id_gen: Box::new(UuidV7IdGenerator),
            config,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `Orchestrator -> Planner -> Task` (spec §2). Goal hints are parsed
    /// purely to enrich the oracle's context; the oracle still decides the
    /// actual plan.
    pub async fn plan_task(&self, goal: impl Into<String>, oracle: &dyn AiOracle) -> Result<Task, OrchestratorError> {
        let goal = goal.into();
        let hints = GoalParser::extract(&goal);
        debug!(%goal, url_hints = hints.urls.len(), action_hints = hints.action_hints.len(), "Orchestrator::plan_task: called");

        let context = serde_json::json!({
            "hints": {
                "urls": hints.urls,
                "quotedTerms": hints.quoted_terms,
                "actionHints": hints.action_hints.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            }
        });
        let plan = oracle.generate_plan(&goal, &context).await?;
        plan.validate().map_err(|e| OrchestratorError::InvalidPlan(e.to_string()))?;

        let mut steps = Vec::with_capacity(plan.steps.len());
        for plan_step in plan.steps {
            let action = Action::new(plan_step.kind, plan_step.params)?;
            let mut step = Step::new(self.id_gen.next_id("step"), action, plan_step.description);
            if !plan_step.expected_output.is_empty() {
                step = step.with_expected_output(plan_step.expected_output);
            }
            if !plan_step.failure_conditions.is_empty() {
                step = step.with_failure_conditions(plan_step.failure_conditions);
            }
            steps.push(step);
        }

        Ok(Task::new(self.id_gen.next_id("task"), goal, steps))
    }

    /// `TaskExecutor.Execute` over the injected registry/bus (spec §4.6).
    /// `resume_input` is forwarded to `TaskExecutor::execute`: a human's
    /// answer to a `WaitingForInput` task's pending request, ignored
    /// otherwise.
    pub async fn run_task(
        &self,
        task: &mut Task,
        criteria: &SelectionCriteria,
        control: &TaskControl,
        resume_input: Option<serde_json::Value>,
    ) -> Result<ExecutionResult, OrchestratorError> {
        let executor = TaskExecutor::new(
            &self.registry,
            self.id_gen.as_ref(),
            self.config.step_executor.clone(),
            self.config.task_executor.clone(),
            self.bus(),
        );
        Ok(executor.execute(task, criteria, control, resume_input).await?)
    }

    /// `Orchestrator -> DynamicExecutor` (spec §2, §4.7).
    pub async fn run_dynamic(
        &self,
        goal: impl Into<String>,
        oracle: Arc<dyn AiOracle>,
        criteria: &SelectionCriteria,
        control: &TaskControl,
    ) -> Result<DynamicExecutionOutcome, OrchestratorError> {
        let executor = DynamicExecutor::new(&self.registry, self.id_gen.as_ref(), oracle, self.config.dynamic_executor.clone(), self.bus());
        Ok(executor.execute_with_feedback(goal, criteria, control).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::ai::mock::MockAiOracle;
    use crate::ai::{GeneratedPlan, PlanStep};
    use crate::action::ActionParams;
    use crate::provider::mock::MockProvider;
    use crate::provider::{Reliability, Speed};
    use crate::result::ExpectedOutput;
    use crate::strategy::Strategy;
    use serde_json::json;

    #[tokio::test]
    async fn test_plan_task_builds_steps_from_oracle_plan() {
        let orchestrator = Orchestrator::new(Config::default());
        let oracle = MockAiOracle::new().with_plan(GeneratedPlan {
            steps: vec![PlanStep {
                kind: ActionKind::Navigate,
                params: ActionParams::Navigate { url: "https://example.com".into(), wait_for: None },
                description: "open the site".into(),
                expected_output: ExpectedOutput::new(),
                failure_conditions: Vec::new(),
            }],
            confidence: 0.9,
            reasoning: "single navigate step is enough".into(),
        });

        let task = orchestrator.plan_task("open example.com", &oracle).await.unwrap();
        assert_eq!(task.steps().len(), 1);
        assert_eq!(task.goal, "open example.com");
    }

    #[tokio::test]
    async fn test_run_task_executes_against_registered_provider() {
        let orchestrator = Orchestrator::new(Config::default());
        orchestrator.registry().register(
            Strategy::Api,
            Arc::new(MockProvider::new(
                "API",
                MockProvider::full_capabilities(Speed::Fast, Reliability::High),
                vec![ExecutionResult::success(json!({"url": "https://example.com"}))],
            )),
        );

        let step = Step::new("s-1", Action::navigate("https://example.com").unwrap(), "open the site");
        let mut task = Task::new("t-1", "open example.com", vec![step]);
        let control = TaskControl::new();

        orchestrator.run_task(&mut task, &SelectionCriteria::none(), &control, None).await.unwrap();
        assert!(task.result.is_some());
    }
}
