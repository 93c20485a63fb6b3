//! Action model: the atomic, schema-validated unit of web automation
//! (spec §3, §4.1)

mod kind;
mod validation;

pub use kind::{ActionKind, ActionParams};
pub use validation::ActionError;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A validated, immutable action. The only way to construct one is
/// [`Action::new`], which runs full schema validation; once constructed, an
/// Action is guaranteed to pass validation again (spec §3 invariant: an
/// Action that passes validation may fail to *execute* but must never fail
/// schema checks later).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    kind: ActionKind,
    params: ActionParams,
}

impl Action {
    /// Canonical constructor: `kind` + `params`, fully validated (spec §4.1).
    /// Convenience constructors per kind are provided below but are
    /// non-normative wrappers around this one.
    pub fn new(kind: ActionKind, params: ActionParams) -> Result<Self, ActionError> {
        debug!(?kind, "Action::new: called");
        validation::validate(kind, &params)?;
        Ok(Self { kind, params })
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn params(&self) -> &ActionParams {
        &self.params
    }

    /// Declared output shape for this action's kind (spec §4.1 `OutputShape`)
    pub fn output_shape(&self) -> &'static [&'static str] {
        kind::output_shape(self.kind)
    }

    pub fn navigate(url: impl Into<String>) -> Result<Self, ActionError> {
        Self::new(ActionKind::Navigate, ActionParams::Navigate { url: url.into(), wait_for: None })
    }

    pub fn click(selector: impl Into<String>) -> Result<Self, ActionError> {
        Self::new(ActionKind::Click, ActionParams::Click { selector: selector.into() })
    }

    pub fn type_text(selector: impl Into<String>, text: impl Into<String>) -> Result<Self, ActionError> {
        Self::new(
            ActionKind::Type,
            ActionParams::Type {
                selector: selector.into(),
                text: text.into(),
            },
        )
    }

    pub fn extract_text(selector: impl Into<String>, multiple: bool) -> Result<Self, ActionError> {
        Self::new(
            ActionKind::ExtractText,
            ActionParams::ExtractText {
                selector: selector.into(),
                multiple,
            },
        )
    }

    pub fn extract_attribute(selector: impl Into<String>, attribute: impl Into<String>) -> Result<Self, ActionError> {
        Self::new(
            ActionKind::ExtractAttribute,
            ActionParams::ExtractAttribute {
                selector: selector.into(),
                attribute: attribute.into(),
            },
        )
    }

    pub fn wait(duration_ms: u64) -> Result<Self, ActionError> {
        Self::new(ActionKind::Wait, ActionParams::Wait { duration_ms })
    }

    pub fn search(query: impl Into<String>) -> Result<Self, ActionError> {
        Self::new(ActionKind::Search, ActionParams::Search { query: query.into() })
    }
}
