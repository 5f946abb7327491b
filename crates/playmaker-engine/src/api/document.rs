use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::components::behavior::Trigger;
use crate::components::entity::EntityRecord;

/// Saved stage: the authored entities in draw order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageDocument {
    #[serde(default, alias = "assets")]
    pub entities: Vec<EntityRecord>,
}

impl StageDocument {
    /// Parse a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A behavior as requested from the authoring palette, before it has an id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorDraft {
    #[serde(alias = "type")]
    pub trigger_type: Trigger,
    #[serde(alias = "behavior")]
    pub behavior_kind: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl BehaviorDraft {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
