//! Provider interface and registry (spec §3, §4.2, §6.1)

mod registry;

pub use registry::ProviderRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::{Action, CapabilityRequirement};
use crate::result::ExecutionResult;
use crate::strategy::Strategy;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no provider registered for strategy {0:?}")]
    NoProviderForStrategy(Strategy),
    #[error("no provider registered with name `{0}`")]
    NoProviderForName(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speed {
    Fast,
    Medium,
    Slow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    Low,
    Medium,
    High,
}

/// Static-per-instance capability record (spec §3)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub supports_navigation: bool,
    pub supports_search: bool,
    pub supports_extraction: bool,
    pub supports_interaction: bool,
    pub supports_pagination: bool,
    pub supports_file_upload: bool,
    pub requires_javascript: bool,
    pub speed: Speed,
    pub reliability: Reliability,
}

impl CapabilitySet {
    /// Whether this capability set satisfies the requirement a given
    /// action kind imposes (spec §4.2 mapping).
    pub fn satisfies(&self, requirement: CapabilityRequirement) -> bool {
        match requirement {
            CapabilityRequirement::Navigation => self.supports_navigation,
            CapabilityRequirement::Search => self.supports_search,
            CapabilityRequirement::Extraction => self.supports_extraction,
            CapabilityRequirement::Interaction => self.supports_interaction,
            CapabilityRequirement::Always => true,
        }
    }
}

/// Health-check outcome (spec §4.2)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub details: String,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            details: "ok".to_string(),
        }
    }

    pub fn unhealthy(details: impl Into<String>) -> Self {
        Self {
            healthy: false,
            details: details.into(),
        }
    }
}

/// Concrete executor of Actions for one Strategy (spec §6.1, consumed
/// interface — the core only defines the boundary; concrete browser/
/// scraper/API implementations are a host concern).
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn capabilities(&self) -> &CapabilitySet;

    /// Deterministic check derived from capabilities (spec §4.2)
    fn can_handle(&self, action: &Action) -> bool {
        self.capabilities().satisfies(action.kind().capability_requirement())
    }

    async fn health_check(&self) -> HealthStatus;

    async fn execute(&self, action: &Action) -> ExecutionResult;
}
