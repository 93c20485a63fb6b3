//! Strategy tags and the strategy selector (spec §3, §4.3)

mod selector;

pub use selector::{SelectionCriteria, StrategySelector};

use serde::{Deserialize, Serialize};

/// One of {API, Scraper, Browser}, with a fixed default priority order
/// API < Scraper < Browser (lower = higher priority) (spec §3)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    Api,
    Scraper,
    Browser,
}

impl Strategy {
    /// Default priority order, highest priority first (spec §3, §4.3)
    pub const DEFAULT_ORDER: [Strategy; 3] = [Strategy::Api, Strategy::Scraper, Strategy::Browser];

    pub fn priority(&self) -> u8 {
        match self {
            Strategy::Api => 0,
            Strategy::Scraper => 1,
            Strategy::Browser => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Api => "API",
            Strategy::Scraper => "Scraper",
            Strategy::Browser => "Browser",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
