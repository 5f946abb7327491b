use serde::{Deserialize, Serialize};

use crate::components::behavior::Trigger;
use crate::input::keys::Key;

/// Configuration for the stage, provided by the host.
///
/// Every field has a default; a JSON config only needs to name the fields it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StageConfig {
    /// Canvas width in stage units (default: 800).
    pub canvas_width: f32,
    /// Canvas height in stage units (default: 600).
    pub canvas_height: f32,
    /// Downward acceleration added to `vy` every frame for gravity entities.
    /// The stage is Y-down, so gravity is positive.
    pub gravity: f32,
    /// Vertical velocity applied by a jump on a gravity entity.
    pub jump_impulse: f32,
    /// Edge length of the square resize handle at an entity's bottom-right corner.
    pub resize_handle_size: f32,
    /// Whether a key-triggered `setVector` also nudges the entity by its new
    /// velocity in the same frame.
    pub vector_nudge: bool,
    /// Per-axis bound of the `setVector` nudge.
    pub vector_nudge_limit: f32,
    /// Which held keys fire which trigger.
    pub key_bindings: Vec<KeyBinding>,
}

/// Maps a held key to the trigger it fires each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: Key,
    pub trigger: Trigger,
}

impl KeyBinding {
    pub fn new(key: Key, trigger: Trigger) -> Self {
        Self { key, trigger }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 600.0,
            gravity: 1.0,
            jump_impulse: -10.0,
            resize_handle_size: 10.0,
            vector_nudge: true,
            vector_nudge_limit: 10.0,
            key_bindings: vec![
                KeyBinding::new(Key::Space, Trigger::SpacePress),
                KeyBinding::new(Key::ArrowUp, Trigger::KeyPress),
                KeyBinding::new(Key::ArrowDown, Trigger::KeyPressDown),
                KeyBinding::new(Key::ArrowLeft, Trigger::KeyPressLeft),
                KeyBinding::new(Key::ArrowRight, Trigger::KeyPressRight),
            ],
        }
    }
}

impl StageConfig {
    /// Parse a config from a JSON string. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Canvas size as a vector.
    pub fn bounds(&self) -> glam::Vec2 {
        glam::Vec2::new(self.canvas_width, self.canvas_height)
    }

    /// The trigger bound to `key`, if any.
    pub fn trigger_for(&self, key: &Key) -> Option<Trigger> {
        self.key_bindings
            .iter()
            .find(|binding| &binding.key == key)
            .map(|binding| binding.trigger)
    }
}
