//! Trigger dispatch: runs the behaviors matching a trigger against their entity.

use glam::Vec2;

use crate::api::config::StageConfig;
use crate::components::behavior::{BehaviorKind, Trigger};
use crate::components::entity::Entity;
use crate::core::frame::FrameContext;

/// Execute every behavior on `entity` bound to `trigger`, in list order.
///
/// With `nudge` set, a `setVector` that applied also steps the entity by its
/// new velocity on the axes it set, bounded by the given limit.
/// Returns how many behaviors applied.
pub fn fire_on_entity(
    entity: &mut Entity,
    trigger: Trigger,
    ctx: &FrameContext,
    nudge: Option<f32>,
) -> usize {
    // Behaviors mutate their owner, so lift the list out while they run.
    let mut behaviors = std::mem::take(&mut entity.behaviors);
    let mut applied = 0;

    for behavior in behaviors.iter_mut().filter(|b| b.trigger == trigger) {
        if !behavior.execute(entity, ctx) {
            continue;
        }
        applied += 1;
        if let (Some(limit), BehaviorKind::SetVector { x, y }) = (nudge, &behavior.kind) {
            let step = entity.velocity.clamp(Vec2::splat(-limit), Vec2::splat(limit));
            if x.is_some() {
                entity.pos.x += step.x;
            }
            if y.is_some() {
                entity.pos.y += step.y;
            }
        }
    }

    entity.behaviors = behaviors;
    applied
}

/// Fire `trigger` on every entity, in list order.
pub fn fire_on_all(entities: &mut [Entity], trigger: Trigger, ctx: &FrameContext) -> usize {
    entities
        .iter_mut()
        .map(|entity| fire_on_entity(entity, trigger, ctx, None))
        .sum()
}

/// Fire the trigger of every held, bound key on every entity.
/// A trigger bound to more than one held key fires once.
pub fn dispatch_key_triggers(entities: &mut [Entity], ctx: &FrameContext, config: &StageConfig) -> usize {
    let mut triggers: Vec<Trigger> = Vec::new();
    for trigger in ctx.held.iter().filter_map(|key| config.trigger_for(key)) {
        if !triggers.contains(&trigger) {
            triggers.push(trigger);
        }
    }

    let nudge = config.vector_nudge.then_some(config.vector_nudge_limit.abs());
    let mut applied = 0;
    for trigger in triggers {
        for entity in entities.iter_mut() {
            applied += fire_on_entity(entity, trigger, ctx, nudge);
        }
    }
    applied
}
