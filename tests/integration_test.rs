//! End-to-end scenario tests for the orchestrator and its two control-flow
//! paths (static plan and dynamic feedback loop).
//!
//! The library's own canned-response test doubles (`provider::mock`,
//! `ai::mock`) are `#[cfg(test)]`-gated and therefore invisible from an
//! external integration test binary, so this file carries its own minimal
//! scripted `Provider`/`AiOracle` doubles in the same canned-response style.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use webauto::action::{Action, ActionKind, ActionParams};
use webauto::ai::{AiOracle, AiOracleError, GeneratedPlan, NextActionChoice, NextActionSpec, PlanStep};
use webauto::config::{Config, DynamicExecutorOptions};
use webauto::executor::TaskControl;
use webauto::provider::{CapabilitySet, HealthStatus, Provider, Reliability, Speed};
use webauto::result::{ExecutionResult, ExpectedOutput, FailureCondition, FailureOp};
use webauto::strategy::{SelectionCriteria, Strategy};
use webauto::Orchestrator;

struct ScriptedProvider {
    name: String,
    capabilities: CapabilitySet,
    responses: Mutex<Vec<ExecutionResult>>,
    call_count: AtomicUsize,
}

impl ScriptedProvider {
    fn new(name: impl Into<String>, responses: Vec<ExecutionResult>) -> Self {
        Self {
            name: name.into(),
            capabilities: CapabilitySet {
                supports_navigation: true,
                supports_search: true,
                supports_extraction: true,
                supports_interaction: true,
                supports_pagination: true,
                supports_file_upload: false,
                requires_javascript: false,
                speed: Speed::Fast,
                reliability: Reliability::High,
            },
            responses: Mutex::new(responses),
            call_count: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::healthy()
    }

    async fn execute(&self, _action: &Action) -> ExecutionResult {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().expect("scripted provider lock poisoned");
        if responses.is_empty() {
            ExecutionResult::failure("scripted provider exhausted", webauto::result::ErrorCategory::Unknown)
        } else {
            responses.remove(0)
        }
    }
}

struct ScriptedOracle {
    plans: Mutex<Vec<GeneratedPlan>>,
    decisions: Mutex<Vec<NextActionChoice>>,
}

impl ScriptedOracle {
    fn with_plan(plan: GeneratedPlan) -> Self {
        Self {
            plans: Mutex::new(vec![plan]),
            decisions: Mutex::new(Vec::new()),
        }
    }

    fn with_decisions(decisions: Vec<NextActionChoice>) -> Self {
        Self {
            plans: Mutex::new(Vec::new()),
            decisions: Mutex::new(decisions),
        }
    }
}

#[async_trait]
impl AiOracle for ScriptedOracle {
    async fn generate_plan(&self, _goal: &str, _context: &serde_json::Value) -> Result<GeneratedPlan, AiOracleError> {
        let mut plans = self.plans.lock().expect("scripted oracle lock poisoned");
        if plans.is_empty() {
            Err(AiOracleError::Upstream("scripted oracle plans exhausted".to_string()))
        } else {
            Ok(plans.remove(0))
        }
    }

    async fn suggest_selectors(&self, _html_or_summary: &str, _intent: &str, _ctx: &serde_json::Value) -> Result<webauto::ai::SelectorSuggestions, AiOracleError> {
        Ok(webauto::ai::SelectorSuggestions {
            selectors: Vec::new(),
            reasoning: "not exercised".to_string(),
        })
    }

    async fn decide_next_action(&self, _exec_ctx_for_ai: &serde_json::Value) -> Result<NextActionChoice, AiOracleError> {
        let mut decisions = self.decisions.lock().expect("scripted oracle lock poisoned");
        if decisions.is_empty() {
            Err(AiOracleError::Upstream("scripted oracle decisions exhausted".to_string()))
        } else {
            Ok(decisions.remove(0))
        }
    }
}

fn navigate_plan_step(url: &str, description: &str) -> PlanStep {
    PlanStep {
        kind: ActionKind::Navigate,
        params: ActionParams::Navigate { url: url.to_string(), wait_for: None },
        description: description.to_string(),
        expected_output: ExpectedOutput::new(),
        failure_conditions: Vec::new(),
    }
}

// =============================================================================
// Static-plan path: Orchestrator -> Planner -> Task -> TaskExecutor
// =============================================================================

#[tokio::test]
async fn test_happy_path_single_provider() {
    let orchestrator = Orchestrator::new(Config::default());
    orchestrator.registry().register(
        Strategy::Api,
        Arc::new(ScriptedProvider::new("API", vec![ExecutionResult::success(json!({"url": "https://shop.example/search?q=iPhone14"}))])),
    );

    let oracle = ScriptedOracle::with_plan(GeneratedPlan {
        steps: vec![navigate_plan_step("https://shop.example/search?q=iPhone14", "open the search results")],
        confidence: 0.95,
        reasoning: "single navigate satisfies the goal".to_string(),
    });

    let mut task = orchestrator.plan_task("find iPhone 14 price", &oracle).await.expect("plan_task should succeed");
    assert_eq!(task.steps().len(), 1);

    let control = TaskControl::new();
    let result = orchestrator.run_task(&mut task, &SelectionCriteria::none(), &control, None).await.expect("run_task should succeed");
    assert!(result.is_success());
    assert_eq!(task.status(), webauto::task::TaskStatus::Completed);
}

#[tokio::test]
async fn test_retry_then_fallback_across_strategies() {
    let orchestrator = Orchestrator::new(Config::default());
    orchestrator.registry().register(
        Strategy::Api,
        Arc::new(ScriptedProvider::new(
            "API",
            vec![
                ExecutionResult::failure("connection reset", webauto::result::ErrorCategory::Network),
                ExecutionResult::failure("connection reset", webauto::result::ErrorCategory::Network),
                ExecutionResult::failure("connection reset", webauto::result::ErrorCategory::Network),
            ],
        )),
    );
    orchestrator.registry().register(
        Strategy::Scraper,
        Arc::new(ScriptedProvider::new("Scraper", vec![ExecutionResult::success(json!({"text": ["$899"]}))])),
    );

    let oracle = ScriptedOracle::with_plan(GeneratedPlan {
        steps: vec![navigate_plan_step("https://shop.example/search?q=iPhone14", "open the search results")],
        confidence: 0.8,
        reasoning: "navigate to the search results".to_string(),
    });

    let mut task = orchestrator.plan_task("find iPhone 14 price", &oracle).await.unwrap();
    let control = TaskControl::new();
    let result = orchestrator.run_task(&mut task, &SelectionCriteria::none(), &control, None).await.unwrap();

    assert!(result.is_success());
    assert_eq!(task.status(), webauto::task::TaskStatus::Completed);
}

#[tokio::test]
async fn test_fatal_plan_validation_rejects_mismatched_step() {
    let orchestrator = Orchestrator::new(Config::default());

    let oracle = ScriptedOracle::with_plan(GeneratedPlan {
        steps: vec![PlanStep {
            kind: ActionKind::Click,
            params: ActionParams::Navigate { url: "https://shop.example".to_string(), wait_for: None },
            description: "mismatched kind/params".to_string(),
            expected_output: ExpectedOutput::new(),
            failure_conditions: Vec::new(),
        }],
        confidence: 0.5,
        reasoning: "broken plan".to_string(),
    });

    let err = orchestrator.plan_task("do something", &oracle).await.expect_err("mismatched plan must be rejected");
    assert!(matches!(err, webauto::orchestrator::OrchestratorError::InvalidPlan(_)));
}

#[tokio::test]
async fn test_failure_condition_fails_task_even_on_successful_fetch() {
    let orchestrator = Orchestrator::new(Config::default());
    orchestrator.registry().register(
        Strategy::Api,
        Arc::new(ScriptedProvider::new("API", vec![ExecutionResult::success(json!({"text": "Out of stock"}))])),
    );

    let oracle = ScriptedOracle::with_plan(GeneratedPlan {
        steps: vec![PlanStep {
            kind: ActionKind::ExtractText,
            params: ActionParams::ExtractText { selector: ".availability".to_string(), multiple: false },
            description: "check stock status".to_string(),
            expected_output: ExpectedOutput::new(),
            failure_conditions: vec![FailureCondition {
                field: "text".to_string(),
                op: FailureOp::Equals,
                value: json!("Out of stock"),
            }],
        }],
        confidence: 0.9,
        reasoning: "extract stock status".to_string(),
    });

    let mut task = orchestrator.plan_task("buy the item if in stock", &oracle).await.unwrap();
    let control = TaskControl::new();
    let result = orchestrator.run_task(&mut task, &SelectionCriteria::none(), &control, None).await.unwrap();

    assert!(!result.is_success());
    assert_eq!(task.status(), webauto::task::TaskStatus::Failed);
}

#[tokio::test]
async fn test_pause_then_resume_completes_task() {
    let orchestrator = Orchestrator::new(Config::default());
    let provider = Arc::new(ScriptedProvider::new(
        "API",
        vec![ExecutionResult::success(json!({"ok": true})), ExecutionResult::success(json!({"ok": true}))],
    ));
    orchestrator.registry().register(Strategy::Api, provider.clone());

    let oracle = ScriptedOracle::with_plan(GeneratedPlan {
        steps: vec![
            navigate_plan_step("https://shop.example/a", "open page a"),
            navigate_plan_step("https://shop.example/b", "open page b"),
        ],
        confidence: 0.9,
        reasoning: "two-step browse".to_string(),
    });

    let mut task = orchestrator.plan_task("browse two pages", &oracle).await.unwrap();
    let control = TaskControl::new();
    control.request_pause();

    let paused = orchestrator.run_task(&mut task, &SelectionCriteria::none(), &control, None).await.unwrap();
    assert!(!paused.is_success() || matches!(paused, ExecutionResult::PartialSuccess { .. }));
    assert_eq!(task.status(), webauto::task::TaskStatus::Paused);
    assert_eq!(provider.call_count(), 1);

    let control2 = TaskControl::new();
    let completed = orchestrator.run_task(&mut task, &SelectionCriteria::none(), &control2, None).await.unwrap();
    assert!(completed.is_success());
    assert_eq!(task.status(), webauto::task::TaskStatus::Completed);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_resume_with_input_answers_request_and_completes_task() {
    let orchestrator = Orchestrator::new(Config::default());
    let provider = Arc::new(ScriptedProvider::new(
        "API",
        vec![
            ExecutionResult::PartialSuccess {
                data: json!({"requiresInput": "which shipping address?"}),
                reason: "requires input: which shipping address?".to_string(),
                meta: Default::default(),
            },
            ExecutionResult::success(json!({"ok": true})),
        ],
    ));
    orchestrator.registry().register(Strategy::Api, provider.clone());

    let oracle = ScriptedOracle::with_plan(GeneratedPlan {
        steps: vec![navigate_plan_step("https://shop.example/checkout", "confirm shipping address")],
        confidence: 0.9,
        reasoning: "single checkout step".to_string(),
    });

    let mut task = orchestrator.plan_task("checkout", &oracle).await.unwrap();
    let control = TaskControl::new();

    let waiting = orchestrator.run_task(&mut task, &SelectionCriteria::none(), &control, None).await.unwrap();
    assert!(matches!(waiting, ExecutionResult::PartialSuccess { .. }));
    assert_eq!(task.status(), webauto::task::TaskStatus::WaitingForInput);
    assert_eq!(provider.call_count(), 1);

    let control2 = TaskControl::new();
    let completed = orchestrator
        .run_task(&mut task, &SelectionCriteria::none(), &control2, Some(json!("221B Baker Street")))
        .await
        .unwrap();
    assert!(completed.is_success());
    assert_eq!(task.status(), webauto::task::TaskStatus::Completed);
    assert_eq!(provider.call_count(), 2);
}

// =============================================================================
// Dynamic path: Orchestrator -> DynamicExecutor
// =============================================================================

#[tokio::test]
async fn test_dynamic_loop_detects_cycle_and_fails() {
    let orchestrator = Orchestrator::new(Config {
        dynamic_executor: DynamicExecutorOptions {
            max_iterations: 10,
            timeout: Duration::from_secs(60),
            cycle_threshold: 3,
        },
        ..Config::default()
    });
    orchestrator.registry().register(
        Strategy::Api,
        Arc::new(ScriptedProvider::new(
            "API",
            vec![
                ExecutionResult::success(json!({"url": "https://shop.example/page", "html": "<html></html>"})),
                ExecutionResult::success(json!({"url": "https://shop.example/page", "html": "<html></html>"})),
                ExecutionResult::success(json!({"url": "https://shop.example/page", "html": "<html></html>"})),
            ],
        )),
    );

    let navigate_again = || NextActionChoice {
        goal_achieved: false,
        reasoning: "keep navigating back to the same page".to_string(),
        next_action: Some(NextActionSpec {
            kind: ActionKind::Navigate,
            params: ActionParams::Navigate { url: "https://shop.example/page".to_string(), wait_for: None },
            description: "revisit the page".to_string(),
        }),
        data_to_extract: HashMap::new(),
    };
    let oracle = Arc::new(ScriptedOracle::with_decisions(vec![navigate_again(), navigate_again(), navigate_again()]));

    let control = TaskControl::new();
    let outcome = orchestrator
        .run_dynamic("collect top 3 product prices", oracle, &SelectionCriteria::none(), &control)
        .await
        .expect("dynamic execution itself should not error");

    assert!(!outcome.success);
    assert!(outcome.summary.contains("https://shop.example/page"));
}

#[tokio::test]
async fn test_dynamic_loop_stops_when_goal_achieved() {
    let orchestrator = Orchestrator::new(Config::default());
    orchestrator.registry().register(
        Strategy::Api,
        Arc::new(ScriptedProvider::new(
            "API",
            vec![ExecutionResult::success(json!({"url": "https://shop.example/page", "price": "$899"}))],
        )),
    );

    let oracle = Arc::new(ScriptedOracle::with_decisions(vec![
        NextActionChoice {
            goal_achieved: false,
            reasoning: "navigate to the product page first".to_string(),
            next_action: Some(NextActionSpec {
                kind: ActionKind::Navigate,
                params: ActionParams::Navigate { url: "https://shop.example/page".to_string(), wait_for: None },
                description: "open product page".to_string(),
            }),
            data_to_extract: HashMap::new(),
        },
        NextActionChoice {
            goal_achieved: true,
            reasoning: "price collected".to_string(),
            next_action: None,
            data_to_extract: HashMap::new(),
        },
    ]));

    let control = TaskControl::new();
    let outcome = orchestrator.run_dynamic("find the product price", oracle, &SelectionCriteria::none(), &control).await.unwrap();

    assert!(outcome.success);
    assert!(outcome.summary.contains("goal achieved"));
}
