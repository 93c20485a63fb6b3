//! Execution outcomes and the error taxonomy (spec §3, §7)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Closed error taxonomy (spec §7)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorCategory {
    Network,
    SelectorNotFound,
    Timeout,
    InvalidInput,
    ProviderError,
    ValidationError,
    Unknown,
}

impl ErrorCategory {
    /// Whether an error of this category may be retried in place.
    ///
    /// Per spec §7: Network, Timeout, ProviderError, SelectorNotFound are
    /// retryable; InvalidInput, ValidationError, Unknown are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::ProviderError
                | ErrorCategory::SelectorNotFound
        )
    }

    /// Fallback classification by substring matching on an error message,
    /// used when a provider does not declare a category itself (spec §7a).
    pub fn classify_message(message: &str) -> ErrorCategory {
        debug!(message, "ErrorCategory::classify_message: called");
        let lower = message.to_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            ErrorCategory::Timeout
        } else if lower.contains("selector") || lower.contains("not found") || lower.contains("no such element") {
            ErrorCategory::SelectorNotFound
        } else if lower.contains("network") || lower.contains("connection") || lower.contains("dns") {
            ErrorCategory::Network
        } else if lower.contains("invalid") || lower.contains("missing required") {
            ErrorCategory::InvalidInput
        } else if lower.contains("validation") {
            ErrorCategory::ValidationError
        } else if lower.contains("provider") {
            ErrorCategory::ProviderError
        } else {
            ErrorCategory::Unknown
        }
    }
}

/// Metadata stamped onto every `ExecutionResult` by the action executor (spec §4.4)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub action_id: Option<String>,
    pub action_kind: Option<String>,
    pub provider_name: Option<String>,
    pub duration_ms: Option<u64>,
    /// Non-fatal warnings accumulated while validating against `expectedOutput`
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ResultMetadata {
    pub fn with_provider(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    pub fn with_action(mut self, id: impl Into<String>, kind: impl Into<String>) -> Self {
        self.action_id = Some(id.into());
        self.action_kind = Some(kind.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Tagged execution outcome (spec §3)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ExecutionResult {
    Success {
        data: Value,
        meta: ResultMetadata,
    },
    PartialSuccess {
        data: Value,
        reason: String,
        meta: ResultMetadata,
    },
    Failure {
        error: String,
        category: ErrorCategory,
        meta: ResultMetadata,
    },
    Timeout {
        duration_ms: u64,
        meta: ResultMetadata,
    },
    RetryNeeded {
        error: String,
        meta: ResultMetadata,
    },
}

impl ExecutionResult {
    /// Whether this outcome is retryable in place (spec §3, §8 boundary:
    /// `RetryNeeded` is retryable regardless of category)
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecutionResult::Failure { category, .. } => category.is_retryable(),
            ExecutionResult::Timeout { .. } => true,
            ExecutionResult::RetryNeeded { .. } => true,
            ExecutionResult::Success { .. } | ExecutionResult::PartialSuccess { .. } => false,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. } | ExecutionResult::PartialSuccess { .. })
    }

    pub fn meta(&self) -> &ResultMetadata {
        match self {
            ExecutionResult::Success { meta, .. }
            | ExecutionResult::PartialSuccess { meta, .. }
            | ExecutionResult::Failure { meta, .. }
            | ExecutionResult::Timeout { meta, .. }
            | ExecutionResult::RetryNeeded { meta, .. } => meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ResultMetadata {
        match self {
            ExecutionResult::Success { meta, .. }
            | ExecutionResult::PartialSuccess { meta, .. }
            | ExecutionResult::Failure { meta, .. }
            | ExecutionResult::Timeout { meta, .. }
            | ExecutionResult::RetryNeeded { meta, .. } => meta,
        }
    }

    /// Read a field out of the result's `data` payload, used by failure
    /// condition evaluation and `expectedOutput` checks.
    pub fn data(&self) -> Option<&Value> {
        match self {
            ExecutionResult::Success { data, .. } | ExecutionResult::PartialSuccess { data, .. } => Some(data),
            _ => None,
        }
    }

    /// The human-readable error message, if this outcome carries one.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ExecutionResult::Failure { error, .. } | ExecutionResult::RetryNeeded { error, .. } => Some(error),
            ExecutionResult::Timeout { .. } => Some("timed out"),
            ExecutionResult::Success { .. } | ExecutionResult::PartialSuccess { .. } => None,
        }
    }

    /// The error category, if this outcome carries one. `RetryNeeded` and
    /// `Timeout` are not associated with a category in the tagged shape, so
    /// they classify as `ProviderError`/`Timeout` respectively for callers
    /// that need a category to log or fall back on.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            ExecutionResult::Failure { category, .. } => Some(*category),
            ExecutionResult::Timeout { .. } => Some(ErrorCategory::Timeout),
            ExecutionResult::RetryNeeded { .. } => Some(ErrorCategory::ProviderError),
            ExecutionResult::Success { .. } | ExecutionResult::PartialSuccess { .. } => None,
        }
    }

    pub fn failure(error: impl Into<String>, category: ErrorCategory) -> Self {
        ExecutionResult::Failure {
            error: error.into(),
            category,
            meta: ResultMetadata::default(),
        }
    }

    pub fn success(data: Value) -> Self {
        ExecutionResult::Success {
            data,
            meta: ResultMetadata::default(),
        }
    }
}

/// A single failure-condition clause evaluated over a result's `data`
/// (spec §3 Step.failureConditions)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FailureCondition {
    pub field: String,
    pub op: FailureOp,
    pub value: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureOp {
    Equals,
    NotEquals,
    Contains,
    Exists,
    NotExists,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "lt")]
    LessThan,
}

impl FailureCondition {
    /// Evaluate this condition against a result's `data` object. Returns
    /// true when the condition is met (meaning: convert the result to a
    /// Failure).
    pub fn evaluate(&self, data: &Value) -> bool {
        let actual = data.get(&self.field);
        match self.op {
            FailureOp::Exists => actual.is_some(),
            FailureOp::NotExists => actual.is_none(),
            FailureOp::Equals => actual.map(|a| a == &self.value).unwrap_or(false),
            FailureOp::NotEquals => actual.map(|a| a != &self.value).unwrap_or(true),
            FailureOp::Contains => match (actual, &self.value) {
                (Some(Value::String(s)), Value::String(needle)) => s.contains(needle.as_str()),
                (Some(Value::Array(arr)), needle) => arr.contains(needle),
                _ => false,
            },
            FailureOp::GreaterThan => match (actual.and_then(Value::as_f64), self.value.as_f64()) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
            FailureOp::LessThan => match (actual.and_then(Value::as_f64), self.value.as_f64()) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
        }
    }
}

/// Loosely-typed expected output schema: field name -> expected JSON "type" name.
/// Missing fields or type mismatches are recorded as warnings, never fatal
/// (spec §4.5).
pub type ExpectedOutput = HashMap<String, String>;

/// Validate `data` against an expected-output schema, returning the set of
/// warnings (never an error — this check is advisory only).
pub fn validate_expected_output(data: &Value, expected: &ExpectedOutput) -> Vec<String> {
    debug!(field_count = expected.len(), "validate_expected_output: called");
    let mut warnings = Vec::new();
    for (field, expected_type) in expected {
        match data.get(field) {
            None => warnings.push(format!("expected field `{field}` missing from result data")),
            Some(value) => {
                if !json_type_matches(value, expected_type) {
                    warnings.push(format!(
                        "field `{field}` expected type `{expected_type}` but found `{}`",
                        json_type_name(value)
                    ));
                }
            }
        }
    }
    warnings
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn json_type_matches(value: &Value, expected_type: &str) -> bool {
    match expected_type {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}
