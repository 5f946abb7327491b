pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod renderer;
pub mod input;
pub mod assets;

// Re-export key types at crate root for convenience
pub use api::config::{KeyBinding, StageConfig};
pub use api::document::{BehaviorDraft, StageDocument};
pub use api::error::StageError;
pub use api::host::StageHost;
pub use api::types::{BehaviorId, EntityId, IdAllocator, StageEvent};
pub use components::animation::{Animation, AnimationStep};
pub use components::behavior::{Behavior, BehaviorKind, BehaviorRecord, Trigger};
pub use components::entity::{AssetKind, Contacts, Entity, EntityRecord, EntitySpec};
pub use core::collision::{Aabb, CollisionResolver, ResolveReport};
pub use core::frame::FrameContext;
pub use core::scene::Scene;
pub use core::stage::Stage;
pub use core::time::FrameClock;
pub use renderer::instance::{RenderBuffer, RenderInstance};
pub use input::{InputEvent, InputState, Key};
pub use assets::registry::{SpriteId, SpriteRegistry};
pub use systems::render::build_render_buffer;
