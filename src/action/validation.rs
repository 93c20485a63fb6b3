use thiserror::Error;
use tracing::debug;

use super::kind::{ActionKind, ActionParams};

/// Validation failures for the action model (spec §4.1)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("params kind {params_kind} does not match declared kind {declared_kind}")]
    KindMismatch {
        declared_kind: ActionKind,
        params_kind: ActionKind,
    },
    #[error("required field `{field}` is empty for {kind}")]
    EmptyRequiredField { kind: ActionKind, field: &'static str },
    #[error("field `{field}` must be greater than zero for {kind}")]
    NonPositiveField { kind: ActionKind, field: &'static str },
}

/// Total, deterministic validation (spec §4.1): required params present,
/// types match (enforced structurally by `ActionParams`'s tagged shape),
/// enum values in declared set, and kind-specific field constraints (no
/// empty selectors/URLs, positive durations).
pub fn validate(kind: ActionKind, params: &ActionParams) -> Result<(), ActionError> {
    debug!(?kind, "action::validate: called");

    let params_kind = params.kind();
    if params_kind != kind {
        return Err(ActionError::KindMismatch {
            declared_kind: kind,
            params_kind,
        });
    }

    match params {
        ActionParams::Navigate { url, .. } => require_non_empty(kind, "url", url)?,
        ActionParams::Click { selector } => require_non_empty(kind, "selector", selector)?,
        ActionParams::Type { selector, text } => {
            require_non_empty(kind, "selector", selector)?;
            if text.is_empty() {
                return Err(ActionError::EmptyRequiredField { kind, field: "text" });
            }
        }
        ActionParams::ExtractText { selector, .. } => require_non_empty(kind, "selector", selector)?,
        ActionParams::ExtractAttribute { selector, attribute } => {
            require_non_empty(kind, "selector", selector)?;
            require_non_empty(kind, "attribute", attribute)?;
        }
        ActionParams::Wait { duration_ms } => {
            if *duration_ms == 0 {
                return Err(ActionError::NonPositiveField { kind, field: "duration_ms" });
            }
        }
        ActionParams::Search { query } => require_non_empty(kind, "query", query)?,
    }

    Ok(())
}

fn require_non_empty(kind: ActionKind, field: &'static str, value: &str) -> Result<(), ActionError> {
    if value.trim().is_empty() {
        Err(ActionError::EmptyRequiredField { kind, field })
    } else {
        Ok(())
    }
}
