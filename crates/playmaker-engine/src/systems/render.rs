use crate::api::types::EntityId;
use crate::assets::registry::SpriteRegistry;
use crate::components::entity::Entity;
use crate::renderer::instance::{RenderBuffer, RenderInstance};

/// Build the render buffer from the current entity list, in draw order.
/// Sprite sources are interned as they are met.
pub fn build_render_buffer(
    entities: &[Entity],
    sprites: &mut SpriteRegistry,
    selected: Option<EntityId>,
    buffer: &mut RenderBuffer,
) {
    buffer.clear();

    for entity in entities {
        let sprite = sprites.intern(&entity.sprite);
        buffer.push(RenderInstance {
            x: entity.pos.x,
            y: entity.pos.y,
            width: entity.size.x,
            height: entity.size.y,
            opacity: entity.opacity,
            sprite: sprite.0 as f32,
            selected: if selected == Some(entity.id) { 1.0 } else { 0.0 },
            _pad: 0.0,
        });
    }
}
