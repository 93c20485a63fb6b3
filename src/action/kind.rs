use serde::{Deserialize, Serialize};

/// Closed set of action kinds (spec §3)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    ExtractText,
    ExtractAttribute,
    Wait,
    Search,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "Navigate",
            ActionKind::Click => "Click",
            ActionKind::Type => "Type",
            ActionKind::ExtractText => "ExtractText",
            ActionKind::ExtractAttribute => "ExtractAttribute",
            ActionKind::Wait => "Wait",
            ActionKind::Search => "Search",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-specific parameter record. The tag is carried by the enum variant
/// name so this doubles as the declared schema: required fields are
/// non-`Option` struct fields, optional fields with defaults are `Option`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ActionParams {
    Navigate {
        url: String,
        #[serde(default)]
        wait_for: Option<String>,
    },
    Click {
        selector: String,
    },
    Type {
        selector: String,
        text: String,
    },
    ExtractText {
        selector: String,
        #[serde(default)]
        multiple: bool,
    },
    ExtractAttribute {
        selector: String,
        attribute: String,
    },
    Wait {
        duration_ms: u64,
    },
    Search {
        query: String,
    },
}

impl ActionParams {
    /// The `ActionKind` this params record claims to belong to.
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionParams::Navigate { .. } => ActionKind::Navigate,
            ActionParams::Click { .. } => ActionKind::Click,
            ActionParams::Type { .. } => ActionKind::Type,
            ActionParams::ExtractText { .. } => ActionKind::ExtractText,
            ActionParams::ExtractAttribute { .. } => ActionKind::ExtractAttribute,
            ActionParams::Wait { .. } => ActionKind::Wait,
            ActionParams::Search { .. } => ActionKind::Search,
        }
    }
}

/// Declared output shape per kind (spec §4.1 `OutputShape(kind)`), used by
/// the step executor to validate results against `expectedOutput`.
pub fn output_shape(kind: ActionKind) -> &'static [&'static str] {
    match kind {
        ActionKind::Navigate => &["url", "title", "statusCode"],
        ActionKind::Click => &["clicked"],
        ActionKind::Type => &["typed"],
        ActionKind::ExtractText => &["text"],
        ActionKind::ExtractAttribute => &["value"],
        ActionKind::Wait => &["waitedMs"],
        ActionKind::Search => &["results"],
    }
}

/// Mapping from action kind to the capability it requires of a provider
/// (spec §4.2): `{Navigate,Search→navigation/search; ExtractText,
/// ExtractAttribute→extraction; Click,Type→interaction; Wait→always}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityRequirement {
    Navigation,
    Search,
    Extraction,
    Interaction,
    Always,
}

impl ActionKind {
    pub fn capability_requirement(&self) -> CapabilityRequirement {
        match self {
            ActionKind::Navigate => CapabilityRequirement::Navigation,
            ActionKind::Search => CapabilityRequirement::Search,
            ActionKind::ExtractText | ActionKind::ExtractAttribute => CapabilityRequirement::Extraction,
            ActionKind::Click | ActionKind::Type => CapabilityRequirement::Interaction,
            ActionKind::Wait => CapabilityRequirement::Always,
        }
    }
}
