use crate::api::types::{BehaviorId, EntityId};
use crate::components::behavior::Trigger;

/// Errors surfaced at the authoring boundary.
///
/// The simulation itself never fails: it clamps, skips or logs. These are
/// returned only to the host so it can tell the user why an edit was refused.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    /// The entity already has a behavior with this trigger and kind.
    #[error("behavior '{trigger} -> {kind}' already exists")]
    DuplicateBehavior { trigger: Trigger, kind: &'static str },

    /// No entity with this id is on the stage.
    #[error("no entity with id {0}")]
    EntityNotFound(EntityId),

    /// No behavior with this id on the given entity.
    #[error("entity {0} has no behavior with id {1}")]
    BehaviorNotFound(EntityId, BehaviorId),

    /// A behavior kind name that is not in the palette.
    #[error("unknown behavior kind '{0}'")]
    UnknownKind(String),

    /// Authoring edits are only accepted while editing.
    #[error("the stage is running; stop it before editing")]
    Running,

    /// A document or record could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
