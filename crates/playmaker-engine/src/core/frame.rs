use glam::Vec2;

use crate::api::config::StageConfig;
use crate::api::types::EntityId;
use crate::components::entity::Entity;
use crate::core::collision::Aabb;
use crate::input::keys::Key;
use crate::input::state::InputState;

/// A collision-enabled entity's box as it stood when the frame began.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub id: EntityId,
    pub bounds: Aabb,
}

/// Everything a behavior may read during one frame.
///
/// Built once per frame (and once per pointer-down) and handed to every
/// `execute` call by shared reference.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub frame: u64,
    pub now_ms: f64,
    /// Time since the previous frame (0 on the first).
    pub elapsed_ms: f64,
    pub held: Vec<Key>,
    pub pointer: Vec2,
    pub bounds: Vec2,
    pub gravity: f32,
    pub jump_impulse: f32,
    pub obstacles: Vec<Obstacle>,
}

impl FrameContext {
    /// An empty context: no input, no obstacles.
    pub fn new(frame: u64, now_ms: f64, config: &StageConfig) -> Self {
        Self {
            frame,
            now_ms,
            elapsed_ms: 0.0,
            held: Vec::new(),
            pointer: Vec2::ZERO,
            bounds: config.bounds(),
            gravity: config.gravity,
            jump_impulse: config.jump_impulse,
            obstacles: Vec::new(),
        }
    }

    /// Snapshot input and collision-enabled entities for this frame.
    pub fn sample(
        frame: u64,
        now_ms: f64,
        elapsed_ms: f64,
        input: &InputState,
        entities: &[Entity],
        config: &StageConfig,
    ) -> Self {
        let mut ctx = Self::new(frame, now_ms, config)
            .with_pointer(input.pointer())
            .with_obstacles(entities);
        ctx.elapsed_ms = elapsed_ms;
        ctx.held = input.held().cloned().collect();
        ctx
    }

    // -- Builder pattern --

    pub fn with_pointer(mut self, pointer: Vec2) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn with_held(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.held = keys.into_iter().collect();
        self
    }

    pub fn with_obstacles<'a>(mut self, entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        self.obstacles = entities
            .into_iter()
            .filter(|e| e.has_collision)
            .map(|e| Obstacle {
                id: e.id,
                bounds: e.bounds(),
            })
            .collect();
        self
    }

    pub fn is_held(&self, key: &Key) -> bool {
        self.held.contains(key)
    }

    /// Whether entity `id` placed at `bounds` would leave the canvas or
    /// overlap another collision-enabled entity.
    pub fn is_blocked(&self, id: EntityId, bounds: Aabb) -> bool {
        !bounds.within(self.bounds)
            || self
                .obstacles
                .iter()
                .any(|o| o.id != id && o.bounds.overlaps(&bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_copies_input() {
        let config = StageConfig::default();
        let mut input = InputState::new();
        input.press(Key::Space);
        input.set_pointer(Vec2::new(5.0, 6.0));
        let entities = vec![
            Entity::new(EntityId(1)).with_collision(),
            Entity::new(EntityId(2)),
        ];

        let ctx = FrameContext::sample(3, 50.0, 16.0, &input, &entities, &config);
        assert_eq!(ctx.frame, 3);
        assert_eq!(ctx.elapsed_ms, 16.0);
        assert!(ctx.is_held(&Key::Space));
        assert_eq!(ctx.pointer, Vec2::new(5.0, 6.0));
        assert_eq!(ctx.obstacles.len(), 1);
    }

    #[test]
    fn blocked_by_others_not_self() {
        let config = StageConfig::default();
        let me = Entity::new(EntityId(1)).with_collision();
        let ctx = FrameContext::new(0, 0.0, &config).with_obstacles([&me]);
        assert!(!ctx.is_blocked(me.id, me.bounds()));
        assert!(ctx.is_blocked(EntityId(2), Aabb::new(Vec2::new(10.0, 10.0), Vec2::splat(32.0))));
        assert!(ctx.is_blocked(me.id, Aabb::new(Vec2::new(-1.0, 0.0), Vec2::splat(32.0))));
    }
}
