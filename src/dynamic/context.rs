//! Execution context for the dynamic (AI-feedback loop) executor (spec §3
//! "Execution context (dynamic executor)", §4.7, §8 termination invariants)

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::action::{Action, ActionKind};
use crate::config::DynamicExecutorOptions;
use crate::result::ExecutionResult;

use super::page_state::PageState;

/// One entry in the dynamic executor's action history (spec §3
/// `actionHistory: list<{iteration, action, result, elapsed}>`)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionHistoryEntry {
    pub iteration: u32,
    pub action: Action,
    pub result: ExecutionResult,
    pub elapsed_ms: u64,
}

/// Outcome of `DetectCycle` (spec §4.7, §8 "Cycle detection triggers
/// exactly when the same URL appears ≥ cycleThreshold times in history")
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleDetection {
    pub has_cycle: bool,
    pub url: Option<String>,
    pub visit_count: u32,
}

/// Why the dynamic executor stopped looping (spec §4.7 "Termination (any
/// of)")
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    GoalAchieved,
    MaxIterations,
    Timeout,
    Failure,
    Cycle,
}

/// `{goal, collectedData, actionHistory, visitedUrls, currentPageState,
/// iterationCount, goalAchieved, failureReason, startTime, maxIterations,
/// timeout}` (spec §3)
#[derive(Debug)]
pub struct ExecutionContext {
    pub goal: String,
    collected_data: HashMap<String, Value>,
    action_history: Vec<ActionHistoryEntry>,
    visited_urls: HashSet<String>,
    current_page_state: Option<PageState>,
    iteration_count: u32,
    goal_achieved: bool,
    failure_reason: Option<String>,
    start_time: Instant,
    options: DynamicExecutorOptions,
}

impl ExecutionContext {
    pub fn new(goal: impl Into<String>, options: DynamicExecutorOptions) -> Self {
        let goal = goal.into();
        debug!(%goal, "ExecutionContext::new: called");
        Self {
            goal,
            collected_data: HashMap::new(),
            action_history: Vec::new(),
            visited_urls: HashSet::new(),
            current_page_state: None,
            iteration_count: 0,
            goal_achieved: false,
            failure_reason: None,
            start_time: Instant::now(),
            options,
        }
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn goal_achieved(&self) -> bool {
        self.goal_achieved
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn collected_data(&self) -> &HashMap<String, Value> {
        &self.collected_data
    }

    pub fn action_history(&self) -> &[ActionHistoryEntry] {
        &self.action_history
    }

    pub fn visited_urls(&self) -> &HashSet<String> {
        &self.visited_urls
    }

    pub fn current_page_state(&self) -> Option<&PageState> {
        self.current_page_state.as_ref()
    }

    /// `ctx.ShouldContinue()` (spec §4.7). Termination invariant (spec §8):
    /// `iterationCount <= maxIterations` AND `elapsed <= timeout +
    /// oneActionSlack` AND `goalAchieved XOR failureReason set`.
    pub fn should_continue(&self) -> (bool, Option<TerminationReason>) {
        if self.goal_achieved {
            return (false, Some(TerminationReason::GoalAchieved));
        }
        if self.failure_reason.is_some() {
            return (false, Some(TerminationReason::Failure));
        }
        if self.iteration_count >= self.options.max_iterations {
            return (false, Some(TerminationReason::MaxIterations));
        }
        if self.elapsed() >= self.options.timeout {
            return (false, Some(TerminationReason::Timeout));
        }
        (true, None)
    }

    /// `ctx.DetectCycle(cycleThreshold)` (spec §4.7, §8): the same URL
    /// appearing `>= cycleThreshold` times among the Navigate actions in
    /// history counts as a cycle.
    pub fn detect_cycle(&self) -> CycleDetection {
        let threshold = self.options.cycle_threshold;
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for entry in &self.action_history {
            if entry.action.kind() != ActionKind::Navigate {
                continue;
            }
            if let crate::action::ActionParams::Navigate { url, .. } = entry.action.params() {
                *counts.entry(url.as_str()).or_insert(0) += 1;
            }
        }
        for (url, count) in &counts {
            if *count >= threshold {
                debug!(url, count, threshold, "ExecutionContext::detect_cycle: cycle detected");
                return CycleDetection {
                    has_cycle: true,
                    url: Some((*url).to_string()),
                    visit_count: *count,
                };
            }
        }
        CycleDetection {
            has_cycle: false,
            url: None,
            visit_count: 0,
        }
    }

    /// `ctx.MarkFailed(reason)` (spec §4.7)
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(reason = %reason, "ExecutionContext::mark_failed: called");
        self.failure_reason = Some(reason);
    }

    /// `ctx.MarkGoalAchieved(reasoning)` (spec §4.7). The `reasoning` is
    /// recorded as collected data under the `_reasoning` key for the final
    /// summary.
    pub fn mark_goal_achieved(&mut self, reasoning: impl Into<String>) {
        debug!("ExecutionContext::mark_goal_achieved: called");
        self.goal_achieved = true;
        self.collected_data.insert("_reasoning".to_string(), json!(reasoning.into()));
    }

    /// `ctx.AddAction(action, result)` (spec §4.7 algorithm): records the
    /// action, its result, and the elapsed time, incrementing
    /// `iterationCount` and updating `visitedUrls` when the action was a
    /// Navigate.
    pub fn add_action(&mut self, action: Action, result: ExecutionResult, elapsed: Duration) {
        self.iteration_count += 1;
        if action.kind() == ActionKind::Navigate {
            if let crate::action::ActionParams::Navigate { url, .. } = action.params() {
                self.visited_urls.insert(url.clone());
            }
        }
        self.action_history.push(ActionHistoryEntry {
            iteration: self.iteration_count,
            action,
            result,
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    /// `ctx.UpdatePageState(pageState)` (spec §4.7 algorithm)
    pub fn update_page_state(&mut self, state: PageState) {
        self.current_page_state = Some(state);
    }

    /// `ctx.Collect(key, value)` (spec §4.7 algorithm)
    pub fn collect(&mut self, key: impl Into<String>, value: Value) {
        self.collected_data.insert(key.into(), value);
    }

    /// `ctx.ForAI()` (spec §4.7 algorithm): a JSON projection of the
    /// context handed to the AI oracle's `DecideNextAction`. Intentionally
    /// excludes `options`/internal bookkeeping and caps history length so
    /// the oracle call stays bounded.
    pub fn for_ai(&self) -> Value {
        let recent_history: Vec<Value> = self
            .action_history
            .iter()
            .rev()
            .take(10)
            .map(|entry| {
                json!({
                    "iteration": entry.iteration,
                    "actionKind": entry.action.kind().to_string(),
                    "success": entry.result.is_success(),
                    "elapsedMs": entry.elapsed_ms,
                })
            })
            .collect();

        json!({
            "goal": self.goal,
            "collectedData": self.collected_data,
            "recentActions": recent_history,
            "visitedUrls": self.visited_urls.iter().cloned().collect::<Vec<_>>(),
            "currentPageState": self.current_page_state,
            "iterationCount": self.iteration_count,
        })
    }

    /// Final summary text for the caller, grounded in the task executor's
    /// `TaskAggregate.summary` convention (spec §4.6).
    pub fn summary(&self) -> String {
        if self.goal_achieved {
            format!("goal achieved after {} iteration(s): {}", self.iteration_count, self.goal)
        } else {
            format!(
                "goal not achieved after {} iteration(s): {}",
                self.iteration_count,
                self.failure_reason.as_deref().unwrap_or("unknown reason")
            )
        }
    }
}
