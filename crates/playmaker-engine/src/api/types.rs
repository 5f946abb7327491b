use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Runtime instance identifier of an entity placed on the stage.
/// Two placements of the same asset share an asset id but never an `EntityId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

/// Identifier of a behavior attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Largest id the stage issues or accepts from a document. Hosts read ids
/// back as signed 32-bit integers.
pub const MAX_ID: u32 = i32::MAX as u32;

/// Hands out fresh entity and behavior ids.
///
/// Ids are never reused within a stage. Loading a document calls
/// [`IdAllocator::reserve_entity`] / [`IdAllocator::reserve_behavior`] so
/// that freshly issued ids never collide with loaded ones.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next_entity: u32,
    next_behavior: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            next_behavior: 1,
        }
    }

    /// Generate the next unique entity ID.
    pub fn next_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity = self.next_entity.saturating_add(1);
        id
    }

    /// Generate the next unique behavior ID.
    pub fn next_behavior(&mut self) -> BehaviorId {
        let id = BehaviorId(self.next_behavior);
        self.next_behavior = self.next_behavior.saturating_add(1);
        id
    }

    /// Make sure `id` is never handed out again. Ids above [`MAX_ID`] are
    /// refused and leave the allocator untouched.
    pub fn reserve_entity(&mut self, id: EntityId) -> bool {
        if id.0 > MAX_ID {
            return false;
        }
        self.next_entity = self.next_entity.max(id.0 + 1);
        true
    }

    /// Make sure `id` is never handed out again. Ids above [`MAX_ID`] are
    /// refused and leave the allocator untouched.
    pub fn reserve_behavior(&mut self, id: BehaviorId) -> bool {
        if id.0 > MAX_ID {
            return false;
        }
        self.next_behavior = self.next_behavior.max(id.0 + 1);
        true
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A stage event handed from Rust to the browser host.
/// Generic container: `kind` identifies the event, `a/b/c` carry payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct StageEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl StageEvent {
    pub const FLOATS: usize = 4;

    /// A win object was touched. `a` carries the frame number.
    pub const KIND_WIN: f32 = 1.0;

    pub fn win(frame: u64) -> Self {
        Self {
            kind: Self::KIND_WIN,
            a: frame as f32,
            ..Self::default()
        }
    }

    pub fn is_win(&self) -> bool {
        self.kind == Self::KIND_WIN
    }
}
