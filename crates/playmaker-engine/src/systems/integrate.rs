use glam::Vec2;

use crate::components::entity::Entity;

/// Explicit Euler step: velocity += acceleration, then position += velocity.
///
/// Static entities are pinned (velocity and acceleration forced to zero).
/// Entities whose position is owned by a jump arc are skipped.
/// Returns whether any entity moved.
pub fn integrate(entities: &mut [Entity]) -> bool {
    let mut moved = false;
    for entity in entities.iter_mut() {
        if entity.is_static {
            entity.velocity = Vec2::ZERO;
            entity.acceleration = Vec2::ZERO;
            continue;
        }
        if entity.is_animating {
            continue;
        }
        entity.velocity += entity.acceleration;
        if entity.velocity != Vec2::ZERO {
            entity.pos += entity.velocity;
            moved = true;
        }
    }
    moved
}
