use std::collections::BTreeSet;

use glam::Vec2;

use super::keys::Key;

/// Input event types the stage understands.
/// The browser host forwards raw DOM events as these.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A click began at canvas coordinates (x, y).
    PointerDown { x: f32, y: f32 },
    /// A click ended at canvas coordinates (x, y).
    PointerUp { x: f32, y: f32 },
    /// The cursor moved to canvas coordinates (x, y).
    PointerMove { x: f32, y: f32 },
    /// The cursor left the canvas.
    PointerLeave,
    /// A key was pressed.
    KeyDown { key: Key },
    /// A key was released.
    KeyUp { key: Key },
}

/// Keys currently held and the last known pointer position.
///
/// Updated by input events between frames; sampled into a
/// [`FrameContext`](crate::core::frame::FrameContext) at the start of each tick.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: BTreeSet<Key>,
    pointer: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: &Key) {
        self.held.remove(key);
    }

    pub fn is_held(&self, key: &Key) -> bool {
        self.held.contains(key)
    }

    /// Held keys in a stable order.
    pub fn held(&self) -> impl Iterator<Item = &Key> {
        self.held.iter()
    }

    pub fn set_pointer(&mut self, pos: Vec2) {
        self.pointer = pos;
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Forget every held key (on mode changes, so a key held while stopping
    /// doesn't fire on the next run).
    pub fn release_all(&mut self) {
        self.held.clear();
    }
}
