use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::config::StageConfig;
use crate::api::error::StageError;
use crate::api::types::{BehaviorId, EntityId, IdAllocator};
use crate::components::behavior::{Behavior, BehaviorKind, BehaviorRecord};
use crate::core::collision::Aabb;

/// Lower bound for entity width and height.
pub const MIN_ENTITY_SIZE: f32 = 16.0;
/// Width and height of an entity created without an explicit size.
pub const DEFAULT_ENTITY_SIZE: f32 = 32.0;

/// What the entity was placed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    Sprite,
    Object,
}

/// Per-frame contact bookkeeping. Cleared and rebuilt by every resolver pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contacts {
    pub colliding_with: BTreeSet<EntityId>,
    pub above: bool,
    pub below: bool,
    pub left: bool,
    pub right: bool,
    /// Touching or clamped at a canvas edge this pass.
    pub with_canvas: bool,
}

impl Contacts {
    pub fn clear(&mut self) {
        self.colliding_with.clear();
        self.above = false;
        self.below = false;
        self.left = false;
        self.right = false;
        self.with_canvas = false;
    }
}

/// Fat Entity: one placed object with its physics state and behavior list.
///
/// Positions are top-left corners in canvas units, Y grows downward.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Unique runtime identifier.
    pub id: EntityId,
    /// Library asset this entity was placed from. Shared between placements.
    pub asset_id: String,
    pub name: String,
    pub kind: AssetKind,
    /// Image source handed to the renderer.
    pub sprite: String,
    pub pos: Vec2,
    pub size: Vec2,
    /// Size at placement, used as the aspect reference.
    pub original_size: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub opacity: f32,
    pub has_collision: bool,
    pub is_static: bool,
    pub has_gravity: bool,
    pub is_win_object: bool,
    /// Ground-contact token consumed by a gravity jump.
    pub can_jump: bool,
    /// A jump arc currently owns `pos.y`; integration skips this entity.
    pub is_animating: bool,
    pub contacts: Contacts,
    pub behaviors: Vec<Behavior>,
}

impl Entity {
    /// Create a new entity with the given ID at the origin.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            asset_id: String::new(),
            name: String::new(),
            kind: AssetKind::Sprite,
            sprite: String::new(),
            pos: Vec2::ZERO,
            size: Vec2::splat(DEFAULT_ENTITY_SIZE),
            original_size: Vec2::splat(DEFAULT_ENTITY_SIZE),
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            opacity: 1.0,
            has_collision: false,
            is_static: false,
            has_gravity: false,
            is_win_object: false,
            can_jump: true,
            is_animating: false,
            contacts: Contacts::default(),
            behaviors: Vec::new(),
        }
    }

    /// Build an entity from a creation record, filling defaults and clamping.
    pub fn create(spec: &EntitySpec, id: EntityId, config: &StageConfig) -> Self {
        let size = Vec2::new(
            spec.width.unwrap_or(DEFAULT_ENTITY_SIZE),
            spec.height.unwrap_or(DEFAULT_ENTITY_SIZE),
        )
        .max(Vec2::splat(MIN_ENTITY_SIZE));

        let mut entity = Self::new(id)
            .with_pos(Vec2::new(spec.x.unwrap_or(0.0), spec.y.unwrap_or(0.0)))
            .with_size(size);
        entity.asset_id = spec.asset_id.clone().unwrap_or_default();
        entity.name = spec.name.clone().unwrap_or_default();
        entity.kind = spec.kind.unwrap_or_default();
        entity.sprite = spec.sprite.clone().unwrap_or_default();
        entity.set_opacity(spec.opacity.unwrap_or(1.0));
        entity.has_collision = spec.has_collision.unwrap_or(false);
        entity.set_gravity(spec.has_gravity.unwrap_or(false), config.gravity);
        entity
    }

    // -- Builder pattern --

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sprite(mut self, sprite: impl Into<String>) -> Self {
        self.sprite = sprite.into();
        self
    }

    pub fn with_pos(mut self, pos: Vec2) -> Self {
        self.pos = pos;
        self
    }

    /// Set the size (min-clamped) and make it the aspect reference.
    pub fn with_size(mut self, size: Vec2) -> Self {
        self.resize(size.x, size.y);
        self.original_size = self.size;
        self
    }

    pub fn with_collision(mut self) -> Self {
        self.has_collision = true;
        self
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.set_gravity(true, gravity);
        self
    }

    pub fn with_static(mut self) -> Self {
        self.set_static(true);
        self
    }

    pub fn with_win(mut self) -> Self {
        self.has_collision = true;
        self.is_win_object = true;
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    // -- Geometry --

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size / 2.0
    }

    /// Edge-inclusive hit test.
    pub fn contains_point(&self, p: Vec2) -> bool {
        self.bounds().contains_point(p)
    }

    /// Whether `p` is on the square handle centred on the bottom-right corner.
    pub fn is_over_resize_handle(&self, p: Vec2, handle_size: f32) -> bool {
        let min = self.pos + self.size - Vec2::splat(handle_size / 2.0);
        Aabb::new(min, Vec2::splat(handle_size)).contains_point(p)
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width.max(MIN_ENTITY_SIZE), height.max(MIN_ENTITY_SIZE));
    }

    /// Fit inside `width` x `height` keeping the placement aspect ratio.
    pub fn resize_keep_aspect(&mut self, width: f32, height: f32) {
        if self.original_size.y <= 0.0 || height <= 0.0 {
            self.resize(width, height);
            return;
        }
        let aspect = self.original_size.x / self.original_size.y;
        if width / height > aspect {
            self.resize(height * aspect, height);
        } else {
            self.resize(width, width / aspect);
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    // -- Flags --

    /// Toggle gravity. Acceleration y follows the flag.
    pub fn set_gravity(&mut self, on: bool, gravity: f32) {
        self.has_gravity = on;
        self.acceleration.y = if on && !self.is_static { gravity } else { 0.0 };
    }

    /// Static entities always collide and never move on their own.
    pub fn set_static(&mut self, on: bool) {
        self.is_static = on;
        if on {
            self.has_collision = true;
            self.velocity = Vec2::ZERO;
            self.acceleration = Vec2::ZERO;
        }
    }

    pub fn set_velocity_x(&mut self, vx: f32) {
        if !self.is_static {
            self.velocity.x = vx;
        }
    }

    pub fn set_velocity_y(&mut self, vy: f32) {
        if !self.is_static {
            self.velocity.y = vy;
        }
    }

    /// Undo what a removed flag-setter implied, unless a remaining behavior
    /// still implies it.
    pub fn revert_flags_for(&mut self, removed: &BehaviorKind, gravity: f32) {
        let still = |kind: BehaviorKind| self.behaviors.iter().any(|b| b.kind == kind);
        let keep_collision = still(BehaviorKind::EnableCollision)
            || still(BehaviorKind::WinCollision)
            || still(BehaviorKind::SetStatic);
        let keep_gravity = still(BehaviorKind::EnableGravity);
        let keep_static = still(BehaviorKind::SetStatic);
        let keep_win = still(BehaviorKind::WinCollision);

        match removed {
            BehaviorKind::EnableCollision => {}
            BehaviorKind::WinCollision if !keep_win => self.is_win_object = false,
            BehaviorKind::SetStatic if !keep_static => {
                self.is_static = false;
                self.set_gravity(self.has_gravity, gravity);
            }
            BehaviorKind::EnableGravity => {
                if !keep_gravity {
                    self.set_gravity(false, gravity);
                }
                return;
            }
            _ => return,
        }
        if !keep_collision {
            self.has_collision = false;
        }
    }

    // -- Behaviors --

    /// Attach a behavior. A second behavior with the same trigger and kind is
    /// rejected and the list is left unchanged.
    pub fn attach_behavior(&mut self, behavior: Behavior) -> Result<BehaviorId, StageError> {
        if self
            .behaviors
            .iter()
            .any(|b| b.same_slot(behavior.trigger, &behavior.kind))
        {
            log::warn!(
                "{} already has '{} -> {}'",
                self.id,
                behavior.trigger,
                behavior.kind.name()
            );
            return Err(StageError::DuplicateBehavior {
                trigger: behavior.trigger,
                kind: behavior.kind.name(),
            });
        }
        let id = behavior.id;
        self.behaviors.push(behavior);
        Ok(id)
    }

    /// Detach a behavior, cancelling anything it had running.
    pub fn detach_behavior(&mut self, id: BehaviorId) -> Result<Behavior, StageError> {
        let idx = self
            .behaviors
            .iter()
            .position(|b| b.id == id)
            .ok_or(StageError::BehaviorNotFound(self.id, id))?;
        let mut behavior = self.behaviors.remove(idx);
        behavior.cleanup();
        self.refresh_animating();
        Ok(behavior)
    }

    pub fn behavior_mut(&mut self, id: BehaviorId) -> Option<&mut Behavior> {
        self.behaviors.iter_mut().find(|b| b.id == id)
    }

    /// Cancel every in-flight animation. Returns how many were cancelled.
    pub fn cleanup_behaviors(&mut self) -> usize {
        let mut cancelled = 0;
        for behavior in self.behaviors.iter_mut() {
            if behavior.cleanup() {
                cancelled += 1;
            }
        }
        self.is_animating = false;
        cancelled
    }

    /// Recompute `is_animating` from the behaviors' animation state.
    pub fn refresh_animating(&mut self) {
        self.is_animating = self
            .behaviors
            .iter()
            .any(|b| b.animation().drives_position());
    }

    // -- Persistence --

    /// Clone through the persisted schema: a new instance id, new behavior
    /// ids, and every ephemeral field back at its initial value.
    pub fn duplicate(&self, ids: &mut IdAllocator, config: &StageConfig) -> Self {
        let mut record = self.to_record();
        record.id = ids.next_entity();
        for behavior in &mut record.behaviors {
            behavior.id = ids.next_behavior();
        }
        Self::from_record(&record, config)
    }

    pub fn to_record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id,
            asset_id: self.asset_id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            sprite: self.sprite.clone(),
            x: self.pos.x,
            y: self.pos.y,
            width: self.size.x,
            height: self.size.y,
            original_width: self.original_size.x,
            original_height: self.original_size.y,
            opacity: self.opacity,
            has_collision: self.has_collision,
            has_gravity: self.has_gravity,
            is_static: self.is_static,
            is_win_object: self.is_win_object,
            behaviors: self.behaviors.iter().map(Behavior::to_record).collect(),
        }
    }

    /// Rebuild an entity from its record. Unknown behavior kinds and repeats
    /// of an already loaded trigger/kind pair are dropped.
    pub fn from_record(record: &EntityRecord, config: &StageConfig) -> Self {
        let mut entity = Self::new(record.id).with_pos(Vec2::new(record.x, record.y));
        entity.asset_id = record.asset_id.clone();
        entity.name = record.name.clone();
        entity.kind = record.kind;
        entity.sprite = record.sprite.clone();
        entity.resize(record.width, record.height);
        entity.original_size = if record.original_width > 0.0 && record.original_height > 0.0 {
            Vec2::new(record.original_width, record.original_height)
        } else {
            entity.size
        };
        entity.set_opacity(record.opacity);
        entity.has_collision = record.has_collision;
        entity.set_static(record.is_static);
        entity.set_gravity(record.has_gravity, config.gravity);
        entity.is_win_object = record.is_win_object;
        for behavior in record.behaviors.iter().filter_map(Behavior::from_record) {
            // Duplicates are logged by `attach_behavior`; the first one wins.
            let _ = entity.attach_behavior(behavior);
        }
        entity
    }
}

/// Creation record for a new placement. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntitySpec {
    pub asset_id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<AssetKind>,
    #[serde(alias = "imgSrc")]
    pub sprite: Option<String>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub opacity: Option<f32>,
    pub has_collision: Option<bool>,
    pub has_gravity: Option<bool>,
}

impl EntitySpec {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn default_opacity() -> f32 {
    1.0
}

fn default_size() -> f32 {
    DEFAULT_ENTITY_SIZE
}

/// Persisted shape of an entity. Ephemeral state is not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub id: EntityId,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: AssetKind,
    #[serde(default, alias = "imgSrc")]
    pub sprite: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_size")]
    pub width: f32,
    #[serde(default = "default_size")]
    pub height: f32,
    #[serde(default)]
    pub original_width: f32,
    #[serde(default)]
    pub original_height: f32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub has_collision: bool,
    #[serde(default)]
    pub has_gravity: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_win_object: bool,
    #[serde(default, alias = "actions")]
    pub behaviors: Vec<BehaviorRecord>,
}
