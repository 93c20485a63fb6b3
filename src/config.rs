//! Configuration objects (spec §9 "Builder vs config object")
//!
//! Every executor takes a single `*Options` record with documented
//! defaults rather than a loose map of parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for the step executor's retry/fallback loop (spec §4.5)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StepExecutorOptions {
    /// Max retries per strategy before falling back (default 2)
    pub max_retries: u32,
    /// Base delay between retries on the same provider (default 1s).
    /// Implementations may back off, but delays must be monotonic
    /// non-decreasing.
    #[serde(with = "duration_millis")]
    pub retry_delay: Duration,
}

impl Default for StepExecutorOptions {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Options for the task executor (spec §4.6)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskExecutorOptions {
    /// If false, any step failure fails the whole task (default false)
    pub continue_on_step_failure: bool,
}

impl Default for TaskExecutorOptions {
    fn default() -> Self {
        Self {
            continue_on_step_failure: false,
        }
    }
}

/// Options for the dynamic (AI feedback-loop) executor (spec §4.7)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicExecutorOptions {
    pub max_iterations: u32,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    /// Same URL visited this many times or more ⇒ cycle detected
    pub cycle_threshold: u32,
}

impl Default for DynamicExecutorOptions {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            timeout: Duration::from_secs(120),
            cycle_threshold: 3,
        }
    }
}

/// Top-level configuration for an embedding host. The core never reads this
/// from a file itself; a host may serialize/deserialize it as it likes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub step_executor: StepExecutorOptions,
    pub task_executor: TaskExecutorOptions,
    pub dynamic_executor: DynamicExecutorOptions,
    pub event_bus_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_executor: StepExecutorOptions::default(),
            task_executor: TaskExecutorOptions::default(),
            dynamic_executor: DynamicExecutorOptions::default(),
            event_bus_capacity: crate::events::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_executor_defaults() {
        let opts = StepExecutorOptions::default();
        assert_eq!(opts.max_retries, 2);
        assert_eq!(opts.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_dynamic_executor_defaults() {
        let opts = DynamicExecutorOptions::default();
        assert_eq!(opts.max_iterations, 25);
        assert_eq!(opts.cycle_threshold, 3);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.step_executor.max_retries, config.step_executor.max_retries);
    }
}
