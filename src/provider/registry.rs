use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::{HealthStatus, Provider, ProviderError};
use crate::strategy::Strategy;

/// `StrategyTag → Provider` plus `Name → Provider` (spec §4.2). Reads are
/// lock-free snapshots taken under a short read lock; registration takes a
/// short write lock (spec §5 locking discipline).
pub struct ProviderRegistry {
    by_strategy: RwLock<HashMap<Strategy, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            by_strategy: RwLock::new(HashMap::new()),
        }
    }

    /// Register a provider under a strategy tag. Registering a second
    /// provider for the same tag replaces the prior one, which is handed
    /// back to the caller for disposal (spec §4.2 failure mode).
    pub fn register(&self, strategy: Strategy, provider: Arc<dyn Provider>) -> Option<Arc<dyn Provider>> {
        info!(%strategy, provider = provider.name(), "ProviderRegistry::register: called");
        let mut guard = self.by_strategy.write().expect("provider registry lock poisoned");
        guard.insert(strategy, provider)
    }

    pub fn get(&self, strategy: Strategy) -> Option<Arc<dyn Provider>> {
        debug!(%strategy, "ProviderRegistry::get: called");
        let guard = self.by_strategy.read().expect("provider registry lock poisoned");
        guard.get(&strategy).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn Provider>> {
        debug!(name, "ProviderRegistry::get_by_name: called");
        let guard = self.by_strategy.read().expect("provider registry lock poisoned");
        guard.values().find(|p| p.name() == name).cloned()
    }

    pub fn try_get(&self, strategy: Strategy) -> Result<Arc<dyn Provider>, ProviderError> {
        self.get(strategy).ok_or(ProviderError::NoProviderForStrategy(strategy))
    }

    pub fn try_get_by_name(&self, name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        self.get_by_name(name).ok_or_else(|| ProviderError::NoProviderForName(name.to_string()))
    }

    /// All registered `(strategy, provider)` pairs, snapshotted.
    pub fn all(&self) -> Vec<(Strategy, Arc<dyn Provider>)> {
        let guard = self.by_strategy.read().expect("provider registry lock poisoned");
        guard.iter().map(|(s, p)| (*s, Arc::clone(p))).collect()
    }

    /// Run health checks against every registered provider.
    pub async fn health_all(&self) -> HashMap<Strategy, HealthStatus> {
        debug!("ProviderRegistry::health_all: called");
        let snapshot = self.all();
        let mut out = HashMap::with_capacity(snapshot.len());
        for (strategy, provider) in snapshot {
            out.insert(strategy, provider.health_check().await);
        }
        out
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
