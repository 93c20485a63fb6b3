//! AI Oracle interface (spec §6.2): consumed by the Planner and the Dynamic
//! Executor. The core only defines the trait boundary and a canned-response
//! mock for tests; no concrete LLM-backed implementation lives here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::action::{ActionKind, ActionParams};
use crate::result::{ExpectedOutput, FailureCondition};

#[derive(Debug, Error)]
pub enum AiOracleError {
    #[error("oracle returned a plan step outside the closed action-kind set or with a parameter mismatch: {0}")]
    InvalidPlan(String),
    #[error("oracle call failed: {0}")]
    Upstream(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanStep {
    pub kind: ActionKind,
    pub params: ActionParams,
    pub description: String,
    #[serde(default)]
    pub expected_output: ExpectedOutput,
    #[serde(default)]
    pub failure_conditions: Vec<FailureCondition>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub steps: Vec<PlanStep>,
    pub confidence: f64,
    pub reasoning: String,
}

impl GeneratedPlan {
    /// Validate that every step's kind matches its params' kind (spec §6.2:
    /// "implementations must validate that kind is in the closed set... and
    /// that params match the declared schema; invalid plans are rejected
    /// before execution"). Kind membership in the closed set is already
    /// enforced by `ActionKind` being a Rust enum.
    pub fn validate(&self) -> Result<(), AiOracleError> {
        for (index, step) in self.steps.iter().enumerate() {
            if step.params.kind() != step.kind {
                return Err(AiOracleError::InvalidPlan(format!(
                    "plan step {index} declares kind {} but params are for kind {}",
                    step.kind,
                    step.params.kind()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuggestedSelector {
    pub purpose: String,
    pub selector: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectorSuggestions {
    pub selectors: Vec<SuggestedSelector>,
    pub reasoning: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NextActionSpec {
    pub kind: ActionKind,
    pub params: ActionParams,
    pub description: String,
}

/// `DecideNextAction` result (spec §4.7/§6.2). `next_action = None` is the
/// spec's `NONE` sentinel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NextActionChoice {
    pub goal_achieved: bool,
    pub reasoning: String,
    pub next_action: Option<NextActionSpec>,
    #[serde(default)]
    pub data_to_extract: HashMap<String, Option<String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoverySuggestion {
    pub action: ActionKind,
    pub params: ActionParams,
    pub reasoning: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoveryAdvice {
    pub recoverable: bool,
    pub suggestions: Vec<RecoverySuggestion>,
}

/// Three required methods plus one optional one, all returning structured
/// records rather than prose (spec §6.2).
#[async_trait]
pub trait AiOracle: Send + Sync {
    async fn generate_plan(&self, goal: &str, context: &Value) -> Result<GeneratedPlan, AiOracleError>;

    async fn suggest_selectors(&self, html_or_summary: &str, intent: &str, ctx: &Value) -> Result<SelectorSuggestions, AiOracleError>;

    async fn decide_next_action(&self, exec_ctx_for_ai: &Value) -> Result<NextActionChoice, AiOracleError>;

    /// Optional; consumed by implementations of the step executor that
    /// support error recovery. Default: no recovery suggestion.
    async fn recover_from_error(&self, _error: &str, _ctx: &Value) -> Result<Option<RecoveryAdvice>, AiOracleError> {
        Ok(None)
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Canned-response test double: replays scripted `decide_next_action`
    /// responses in order, erroring once exhausted. Grounded in the same
    /// pattern as a canned-response LLM client test double.
    pub struct MockAiOracle {
        plan_responses: Mutex<Vec<GeneratedPlan>>,
        decision_responses: Mutex<Vec<NextActionChoice>>,
        call_count: AtomicUsize,
    }

    impl MockAiOracle {
        pub fn new() -> Self {
            Self {
                plan_responses: Mutex::new(Vec::new()),
                decision_responses: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn with_plan(self, plan: GeneratedPlan) -> Self {
            self.plan_responses.lock().expect("mock oracle lock poisoned").push(plan);
            self
        }

        pub fn with_decision(self, decision: NextActionChoice) -> Self {
            self.decision_responses.lock().expect("mock oracle lock poisoned").push(decision);
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    impl Default for MockAiOracle {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl AiOracle for MockAiOracle {
        async fn generate_plan(&self, _goal: &str, _context: &Value) -> Result<GeneratedPlan, AiOracleError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.plan_responses.lock().expect("mock oracle lock poisoned");
            if responses.is_empty() {
                Err(AiOracleError::Upstream("mock oracle plan responses exhausted".to_string()))
            } else {
                Ok(responses.remove(0))
            }
        }

        async fn suggest_selectors(&self, _html_or_summary: &str, _intent: &str, _ctx: &Value) -> Result<SelectorSuggestions, AiOracleError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(SelectorSuggestions {
                selectors: Vec::new(),
                reasoning: "mock oracle does not suggest selectors".to_string(),
            })
        }

        async fn decide_next_action(&self, _exec_ctx_for_ai: &Value) -> Result<NextActionChoice, AiOracleError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.decision_responses.lock().expect("mock oracle lock poisoned");
            if responses.is_empty() {
                Err(AiOracleError::Upstream("mock oracle decision responses exhausted".to_string()))
            } else {
                Ok(responses.remove(0))
            }
        }
    }
}
