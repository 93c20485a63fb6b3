use std::sync::Arc;

use tracing::debug;

use super::Strategy;
use crate::action::Action;
use crate::provider::{Provider, ProviderRegistry, Speed};

/// Selection inputs (spec §4.3)
#[derive(Clone, Debug, Default)]
pub struct SelectionCriteria {
    pub requires_javascript: bool,
    pub requires_interaction: bool,
    pub requires_file_upload: bool,
    /// Soft hint only — never excludes a candidate
    pub preferred_speed: Option<Speed>,
    pub exclude_strategies: Vec<Strategy>,
    pub force_strategies: Vec<Strategy>,
}

impl SelectionCriteria {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Stateless selector: selection and fallback depend only on inputs plus a
/// registry snapshot read at call time (spec §4.3 invariant).
pub struct StrategySelector<'a> {
    registry: &'a ProviderRegistry,
}

impl<'a> StrategySelector<'a> {
    pub fn new(registry: &'a ProviderRegistry) -> Self {
        Self { registry }
    }

    fn candidate_order(&self, criteria: &SelectionCriteria) -> Vec<Strategy> {
        if !criteria.force_strategies.is_empty() {
            Strategy::DEFAULT_ORDER
                .into_iter()
                .filter(|s| criteria.force_strategies.contains(s))
                .collect()
        } else {
            Strategy::DEFAULT_ORDER.to_vec()
        }
    }

    fn violates_hard_requirements(&self, strategy: Strategy, capabilities: &crate::provider::CapabilitySet, criteria: &SelectionCriteria) -> bool {
        if criteria.requires_interaction && !capabilities.supports_interaction {
            return true;
        }
        if criteria.requires_file_upload && !capabilities.supports_file_upload {
            return true;
        }
        if criteria.requires_javascript && strategy == Strategy::Api {
            // API strategy can never honor a JS requirement
            return true;
        }
        false
    }

    /// §4.3 Selection algorithm, steps 1-6.
    pub async fn select(&self, action: &Action, criteria: &SelectionCriteria) -> Option<(Strategy, Arc<dyn Provider>)> {
        debug!(action_kind = %action.kind(), "StrategySelector::select: called");
        let requirement = action.kind().capability_requirement();

        for strategy in self.candidate_order(criteria) {
            if criteria.exclude_strategies.contains(&strategy) {
                continue;
            }
            let Some(provider) = self.registry.get(strategy) else {
                continue;
            };
            if !provider.health_check().await.healthy {
                continue;
            }
            if !provider.capabilities().satisfies(requirement) {
                continue;
            }
            if self.violates_hard_requirements(strategy, provider.capabilities(), criteria) {
                continue;
            }
            return Some((strategy, provider));
        }
        None
    }

    /// §4.3 Fallback: given the current strategy and whether the error
    /// that ended the retry loop was retryable, advance through the
    /// priority order starting after the current strategy. Visits each
    /// strategy at most once (spec §8 invariant).
    pub async fn fallback(&self, current: Strategy, error_retryable: bool, criteria: &SelectionCriteria) -> Option<(Strategy, Arc<dyn Provider>)> {
        debug!(%current, error_retryable, "StrategySelector::fallback: called");
        if !error_retryable {
            return None;
        }

        let order = self.candidate_order(criteria);
        let current_pos = order.iter().position(|s| *s == current);
        let remaining: Vec<Strategy> = match current_pos {
            Some(pos) => order[pos + 1..].to_vec(),
            None => order,
        };

        for strategy in remaining {
            if criteria.exclude_strategies.contains(&strategy) {
                continue;
            }
            let Some(provider) = self.registry.get(strategy) else {
                continue;
            };
            if !provider.health_check().await.healthy {
                continue;
            }
            return Some((strategy, provider));
        }
        None
    }
}
