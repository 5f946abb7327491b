//! Trigger/behavior pairs attached to entities.
//!
//! A [`Behavior`] couples a [`Trigger`] (when) with a [`BehaviorKind`] (what).
//! Kinds are a closed enum, so dispatch is one exhaustive match. Kind names
//! only exist as strings in saved documents and palette requests; both go
//! through [`BehaviorKind::from_parts`], and [`Behavior::from_record`] drops
//! unknown ones with a warning.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::types::BehaviorId;
use crate::components::animation::{self, Animation};
use crate::components::entity::Entity;
use crate::core::frame::FrameContext;

/// The event class that activates a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// Once, when the stage starts running.
    OnStart,
    /// Pointer-down on this entity (topmost only).
    OnClick,
    /// Pointer-down anywhere on the canvas.
    MouseDown,
    /// Up arrow held.
    KeyPress,
    /// Down arrow held.
    KeyPressDown,
    /// Left arrow held.
    KeyPressLeft,
    /// Right arrow held.
    KeyPressRight,
    /// Space held.
    SpacePress,
}

impl Trigger {
    pub const ALL: [Trigger; 8] = [
        Trigger::OnStart,
        Trigger::OnClick,
        Trigger::MouseDown,
        Trigger::KeyPress,
        Trigger::KeyPressDown,
        Trigger::KeyPressLeft,
        Trigger::KeyPressRight,
        Trigger::SpacePress,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Trigger::OnStart => "onStart",
            Trigger::OnClick => "onClick",
            Trigger::MouseDown => "mouseDown",
            Trigger::KeyPress => "keyPress",
            Trigger::KeyPressDown => "keyPressDown",
            Trigger::KeyPressLeft => "keyPressLeft",
            Trigger::KeyPressRight => "keyPressRight",
            Trigger::SpacePress => "spacePress",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The concrete effect a behavior applies, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorKind {
    /// Arc animation without gravity, impulse with gravity.
    Jump { height: f32, duration_ms: f32 },
    /// Relative step, rolled back if it lands in a collision.
    Move { dx: f32, dy: f32 },
    /// Centre the entity on the pointer.
    Teleport,
    /// Overwrite velocity; `None` keeps that axis.
    SetVector { x: Option<f32>, y: Option<f32> },
    /// Multiply width and height.
    ChangeSize { scale: f32 },
    /// Absolute placement, rolled back if it lands in a collision.
    SetPosition { x: Option<f32>, y: Option<f32> },
    /// Opacity ramp 0 -> 1.
    FadeIn { duration_ms: f32 },
    EnableCollision,
    EnableGravity,
    SetStatic,
    WinCollision,
    MoveUp { distance: f32 },
    MoveDown { distance: f32 },
    MoveLeft { distance: f32 },
    MoveRight { distance: f32 },
}

const DEFAULT_JUMP_HEIGHT: f32 = 50.0;
const DEFAULT_JUMP_DURATION_MS: f32 = 2000.0;
const DEFAULT_FADE_DURATION_MS: f32 = 1000.0;
const DEFAULT_STEP_DISTANCE: f32 = 10.0;

impl BehaviorKind {
    pub const NAMES: [&'static str; 15] = [
        "jump",
        "move",
        "teleport",
        "setVector",
        "changeSize",
        "setPosition",
        "fadeIn",
        "enableCollision",
        "enableGravity",
        "setStatic",
        "winCollision",
        "moveUp",
        "moveDown",
        "moveLeft",
        "moveRight",
    ];

    /// The persisted camelCase name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            BehaviorKind::Jump { .. } => "jump",
            BehaviorKind::Move { .. } => "move",
            BehaviorKind::Teleport => "teleport",
            BehaviorKind::SetVector { .. } => "setVector",
            BehaviorKind::ChangeSize { .. } => "changeSize",
            BehaviorKind::SetPosition { .. } => "setPosition",
            BehaviorKind::FadeIn { .. } => "fadeIn",
            BehaviorKind::EnableCollision => "enableCollision",
            BehaviorKind::EnableGravity => "enableGravity",
            BehaviorKind::SetStatic => "setStatic",
            BehaviorKind::WinCollision => "winCollision",
            BehaviorKind::MoveUp { .. } => "moveUp",
            BehaviorKind::MoveDown { .. } => "moveDown",
            BehaviorKind::MoveLeft { .. } => "moveLeft",
            BehaviorKind::MoveRight { .. } => "moveRight",
        }
    }

    /// Time-boxed kinds guarded against re-entrant starts.
    pub fn is_continuous(&self) -> bool {
        matches!(self, BehaviorKind::Jump { .. } | BehaviorKind::FadeIn { .. })
    }

    /// Kinds that only flip entity flags.
    pub fn is_flag_setter(&self) -> bool {
        matches!(
            self,
            BehaviorKind::EnableCollision
                | BehaviorKind::EnableGravity
                | BehaviorKind::SetStatic
                | BehaviorKind::WinCollision
        )
    }

    /// Build a kind from its name with default parameters.
    pub fn defaults(name: &str) -> Option<Self> {
        Self::from_parts(name, &Map::new())
    }

    /// Build a kind from its name and a parameter bag.
    ///
    /// Missing, non-numeric and zero values fall back to the kind's default
    /// (a zero-height jump or zero-length step is never what an author meant).
    /// Optional axes stay `None` unless a number is given.
    pub fn from_parts(name: &str, params: &Map<String, Value>) -> Option<Self> {
        let kind = match name {
            "jump" => BehaviorKind::Jump {
                height: number_or(params, "height", DEFAULT_JUMP_HEIGHT),
                duration_ms: number_or(params, "duration", DEFAULT_JUMP_DURATION_MS),
            },
            "move" => BehaviorKind::Move {
                dx: number_or(params, "x", 0.0),
                dy: number_or(params, "y", 0.0),
            },
            "teleport" => BehaviorKind::Teleport,
            "setVector" => BehaviorKind::SetVector {
                x: number(params, "x"),
                y: number(params, "y"),
            },
            "changeSize" => BehaviorKind::ChangeSize {
                scale: number_or(params, "scale", 1.0),
            },
            "setPosition" => BehaviorKind::SetPosition {
                x: number(params, "x"),
                y: number(params, "y"),
            },
            "fadeIn" => BehaviorKind::FadeIn {
                duration_ms: number_or(params, "duration", DEFAULT_FADE_DURATION_MS),
            },
            "enableCollision" => BehaviorKind::EnableCollision,
            "enableGravity" => BehaviorKind::EnableGravity,
            "setStatic" => BehaviorKind::SetStatic,
            "winCollision" => BehaviorKind::WinCollision,
            "moveUp" => BehaviorKind::MoveUp {
                distance: number_or(params, "distance", DEFAULT_STEP_DISTANCE),
            },
            "moveDown" => BehaviorKind::MoveDown {
                distance: number_or(params, "distance", DEFAULT_STEP_DISTANCE),
            },
            "moveLeft" => BehaviorKind::MoveLeft {
                distance: number_or(params, "distance", DEFAULT_STEP_DISTANCE),
            },
            "moveRight" => BehaviorKind::MoveRight {
                distance: number_or(params, "distance", DEFAULT_STEP_DISTANCE),
            },
            _ => return None,
        };
        Some(kind)
    }

    /// The parameter bag as persisted.
    pub fn parameters(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut put = |key: &str, value: f32| {
            map.insert(key.to_string(), float_value(value));
        };
        match *self {
            BehaviorKind::Jump {
                height,
                duration_ms,
            } => {
                put("height", height);
                put("duration", duration_ms);
            }
            BehaviorKind::Move { dx, dy } => {
                put("x", dx);
                put("y", dy);
            }
            BehaviorKind::SetVector { x, y } | BehaviorKind::SetPosition { x, y } => {
                if let Some(x) = x {
                    put("x", x);
                }
                if let Some(y) = y {
                    put("y", y);
                }
            }
            BehaviorKind::ChangeSize { scale } => put("scale", scale),
            BehaviorKind::FadeIn { duration_ms } => put("duration", duration_ms),
            BehaviorKind::MoveUp { distance }
            | BehaviorKind::MoveDown { distance }
            | BehaviorKind::MoveLeft { distance }
            | BehaviorKind::MoveRight { distance } => put("distance", distance),
            BehaviorKind::Teleport
            | BehaviorKind::EnableCollision
            | BehaviorKind::EnableGravity
            | BehaviorKind::SetStatic
            | BehaviorKind::WinCollision => {}
        }
        map
    }
}

/// Widen through the shortest decimal form so `0.1f32` persists as `0.1`.
fn float_value(value: f32) -> Value {
    value
        .to_string()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

fn number(params: &Map<String, Value>, key: &str) -> Option<f32> {
    params.get(key).and_then(Value::as_f64).map(|v| v as f32)
}

fn number_or(params: &Map<String, Value>, key: &str, default: f32) -> f32 {
    match number(params, key) {
        Some(v) if v != 0.0 && v.is_finite() => v,
        _ => default,
    }
}

/// A trigger/kind pair owned by exactly one entity.
#[derive(Debug, Clone)]
pub struct Behavior {
    pub id: BehaviorId,
    pub trigger: Trigger,
    pub kind: BehaviorKind,
    pub enabled: bool,
    animation: Animation,
    /// Parameters the kind does not read, carried through save/load untouched.
    extra: Map<String, Value>,
}

impl Behavior {
    pub fn new(id: BehaviorId, trigger: Trigger, kind: BehaviorKind) -> Self {
        Self {
            id,
            trigger,
            kind,
            enabled: true,
            animation: Animation::Idle,
            extra: Map::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether this behavior has the same trigger and kind as `other`.
    pub fn same_slot(&self, trigger: Trigger, kind: &BehaviorKind) -> bool {
        self.trigger == trigger && self.kind.name() == kind.name()
    }

    /// Whether an animation started by this behavior is still in flight.
    pub fn is_running(&self) -> bool {
        self.animation.is_running()
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    /// Apply this behavior to `entity`. Returns whether anything was applied.
    ///
    /// Disabled behaviors and re-entrant starts of a running jump or fade
    /// are rejected without touching the entity.
    pub fn execute(&mut self, entity: &mut Entity, ctx: &FrameContext) -> bool {
        if !self.enabled {
            return false;
        }
        if self.kind.is_continuous() && self.is_running() {
            return false;
        }

        match self.kind {
            BehaviorKind::Jump {
                height,
                duration_ms,
            } => {
                if entity.has_gravity {
                    if !entity.can_jump {
                        return false;
                    }
                    entity.set_velocity_y(ctx.jump_impulse);
                    entity.can_jump = false;
                    return true;
                }
                self.animation = Animation::jump(ctx.now_ms, entity.pos.y, height, duration_ms);
                entity.is_animating = true;
                true
            }
            BehaviorKind::Move { dx, dy } => {
                let target = entity.pos + Vec2::new(dx, dy);
                try_place(entity, target, ctx)
            }
            BehaviorKind::SetPosition { x, y } => {
                let target = Vec2::new(x.unwrap_or(entity.pos.x), y.unwrap_or(entity.pos.y));
                try_place(entity, target, ctx)
            }
            BehaviorKind::Teleport => {
                entity.pos = ctx.pointer - entity.size / 2.0;
                true
            }
            BehaviorKind::MoveUp { distance } => {
                let blocked = entity.contacts.above;
                step_unless(entity, blocked, Vec2::new(0.0, -distance))
            }
            BehaviorKind::MoveDown { distance } => {
                let blocked = entity.contacts.below;
                step_unless(entity, blocked, Vec2::new(0.0, distance))
            }
            BehaviorKind::MoveLeft { distance } => {
                let blocked = entity.contacts.left;
                step_unless(entity, blocked, Vec2::new(-distance, 0.0))
            }
            BehaviorKind::MoveRight { distance } => {
                let blocked = entity.contacts.right;
                step_unless(entity, blocked, Vec2::new(distance, 0.0))
            }
            BehaviorKind::SetVector { x, y } => {
                if let Some(x) = x {
                    entity.set_velocity_x(x);
                }
                if let Some(y) = y {
                    entity.set_velocity_y(y);
                }
                true
            }
            BehaviorKind::ChangeSize { scale } => {
                let size = entity.size * scale;
                entity.resize(size.x, size.y);
                true
            }
            BehaviorKind::FadeIn { duration_ms } => {
                entity.opacity = 0.0;
                self.animation = Animation::fade(ctx.now_ms, duration_ms);
                true
            }
            BehaviorKind::EnableCollision => {
                log::debug!("enabling collision for {}", entity.name);
                entity.has_collision = true;
                true
            }
            BehaviorKind::EnableGravity => {
                log::debug!("enabling gravity for {}", entity.name);
                entity.set_gravity(true, ctx.gravity);
                true
            }
            BehaviorKind::SetStatic => {
                log::debug!("setting {} static", entity.name);
                entity.set_static(true);
                true
            }
            BehaviorKind::WinCollision => {
                log::debug!("enabling win collision for {}", entity.name);
                entity.has_collision = true;
                entity.is_win_object = true;
                true
            }
        }
    }

    /// Advance an in-flight animation to `now_ms` and write the result to `entity`.
    ///
    /// A jump on a collision-enabled entity that is blocked from above stops
    /// where it is. Returns whether the animation is still running.
    pub fn advance(&mut self, entity: &mut Entity, now_ms: f64) -> bool {
        if !self.animation.is_running() {
            return false;
        }
        if self.animation.drives_position() && entity.has_collision && entity.contacts.above {
            log::debug!("jump of {} blocked from above", entity.name);
            self.animation = Animation::Idle;
            return false;
        }

        let (next, step) = animation::advance(&self.animation, now_ms);
        if let Some(y) = step.y {
            entity.pos.y = y;
        }
        if let Some(opacity) = step.opacity {
            entity.set_opacity(opacity);
        }
        self.animation = next;
        !step.finished
    }

    /// Cancel any in-flight animation. Returns whether something was cancelled.
    pub fn cleanup(&mut self) -> bool {
        let was_running = self.animation.is_running();
        self.animation = Animation::Idle;
        was_running
    }

    // -- Persistence --

    pub fn to_record(&self) -> BehaviorRecord {
        BehaviorRecord {
            id: self.id,
            trigger: self.trigger,
            kind: self.kind.name().to_string(),
            parameters: {
                let mut parameters = self.extra.clone();
                parameters.extend(self.kind.parameters());
                parameters
            },
            enabled: self.enabled,
        }
    }

    /// Rebuild a behavior from its record. Unknown kinds are logged and skipped.
    pub fn from_record(record: &BehaviorRecord) -> Option<Self> {
        match BehaviorKind::from_parts(&record.kind, &record.parameters) {
            Some(kind) => {
                let known = kind.parameters();
                let extra = record
                    .parameters
                    .iter()
                    .filter(|(key, _)| !known.contains_key(*key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Some(Self {
                    id: record.id,
                    trigger: record.trigger,
                    kind,
                    enabled: record.enabled,
                    animation: Animation::Idle,
                    extra,
                })
            }
            None => {
                log::warn!(
                    "skipping behavior {} with unknown kind '{}'",
                    record.id,
                    record.kind
                );
                None
            }
        }
    }
}

/// Move to `target` unless a collision-enabled entity would land in a collision.
fn try_place(entity: &mut Entity, target: Vec2, ctx: &FrameContext) -> bool {
    let before = entity.pos;
    entity.pos = target;
    if entity.has_collision && ctx.is_blocked(entity.id, entity.bounds()) {
        entity.pos = before;
        return false;
    }
    true
}

/// Step by `delta` unless collision is on and the entity is touching on that side.
fn step_unless(entity: &mut Entity, blocked: bool, delta: Vec2) -> bool {
    if entity.has_collision && blocked {
        return false;
    }
    entity.pos += delta;
    true
}

fn default_enabled() -> bool {
    true
}

/// Persisted shape of a behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorRecord {
    pub id: BehaviorId,
    #[serde(rename = "triggerType", alias = "type")]
    pub trigger: Trigger,
    #[serde(rename = "behaviorKind", alias = "behavior")]
    pub kind: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl BehaviorRecord {
    /// Parse a record from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
