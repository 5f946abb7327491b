//! Animation system: advances in-flight jump arcs and fades.

use crate::components::entity::Entity;

/// Advance every running behavior animation to `now_ms`.
///
/// Call this once per frame, after trigger dispatch. Returns how many
/// animations are still running afterwards.
pub fn tick_animations(entities: &mut [Entity], now_ms: f64) -> usize {
    let mut running = 0;
    for entity in entities.iter_mut() {
        if !entity.behaviors.iter().any(|b| b.is_running()) {
            continue;
        }
        let mut behaviors = std::mem::take(&mut entity.behaviors);
        for behavior in behaviors.iter_mut() {
            if behavior.advance(entity, now_ms) {
                running += 1;
            }
        }
        entity.behaviors = behaviors;
        entity.refresh_animating();
    }
    running
}
