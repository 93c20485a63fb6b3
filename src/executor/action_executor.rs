use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::action::Action;
use crate::ids::IdGenerator;
use crate::provider::Provider;
use crate::result::{ErrorCategory, ExecutionResult};

/// `Execute(Action, Provider, ctx) -> ExecutionResult` (spec §4.4). Order of
/// operations: validate (already total at construction time, so this step
/// degenerates to confirming `CanHandle`), dispatch, normalize, stamp
/// metadata.
pub struct ActionExecutor<'a> {
    id_gen: &'a dyn IdGenerator,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(id_gen: &'a dyn IdGenerator) -> Self {
        Self { id_gen }
    }

    pub async fn execute(&self, action: &Action, provider: &Arc<dyn Provider>) -> ExecutionResult {
        debug!(action_kind = %action.kind(), provider = provider.name(), "ActionExecutor::execute: called");
        let action_id = self.id_gen.next_id("action");
        let start = Instant::now();

        if !provider.can_handle(action) {
            return ExecutionResult::failure(
                format!("provider {} cannot handle action {}", provider.name(), action.kind()),
                ErrorCategory::ProviderError,
            );
        }

        let mut result = provider.execute(action).await;
        let meta = result.meta_mut();
        meta.action_id = Some(action_id);
        meta.action_kind = Some(action.kind().to_string());
        meta.provider_name = Some(provider.name().to_string());
        meta.duration_ms = Some(start.elapsed().as_millis() as u64);
        result
    }
}
