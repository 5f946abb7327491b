use playmaker_engine::{
    build_render_buffer, BehaviorId, Entity, EntityId, EntitySpec, InputEvent, RenderBuffer,
    SpriteId, SpriteRegistry, Stage, StageConfig, StageError, StageEvent, StageHost,
};
use glam::Vec2;

/// What the browser reads back after each call: the draw list, the sprite
/// sources it indexes into, and any events raised since the last tick.
#[derive(Default)]
pub struct FrameOutput {
    render_buffer: RenderBuffer,
    sprites: SpriteRegistry,
    events: Vec<StageEvent>,
}

impl StageHost for FrameOutput {
    fn redraw(&mut self, entities: &[Entity], selected: Option<EntityId>) {
        build_render_buffer(entities, &mut self.sprites, selected, &mut self.render_buffer);
    }

    fn on_win(&mut self, frame: u64) {
        self.events.push(StageEvent::win(frame));
    }
}

/// Owns the stage and its output buffers for the `#[wasm_bindgen]` exports.
///
/// wasm-bindgen cannot export a struct holding the stage by reference, so
/// `lib.rs` keeps one of these in a `thread_local!` and forwards to it.
pub struct StageRunner {
    stage: Stage,
    output: FrameOutput,
}

impl StageRunner {
    pub fn new(config: StageConfig) -> Self {
        Self {
            stage: Stage::new(config),
            output: FrameOutput::default(),
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Rebuild the draw list from whatever is on screen.
    pub fn redraw(&mut self) {
        self.output.redraw(self.stage.entities(), self.stage.selected());
    }

    // ---- Frame loop ----

    /// Run one frame. Events from the previous frame are dropped first.
    /// Returns whether the host should request another animation frame.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.output.events.clear();
        self.stage.tick(now_ms, &mut self.output)
    }

    pub fn play(&mut self, now_ms: f64) {
        self.stage.enter_running(now_ms);
        self.redraw();
    }

    pub fn stop(&mut self) {
        self.stage.exit_running();
        self.output.events.clear();
        self.redraw();
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.stage.handle_input(event, &mut self.output);
    }

    // ---- Authoring ----

    pub fn load(&mut self, json: &str) -> Result<usize, StageError> {
        let count = self.stage.load_json(json)?;
        self.redraw();
        Ok(count)
    }

    pub fn save(&self) -> Result<String, StageError> {
        self.stage.save_json()
    }

    pub fn drop_entity(&mut self, spec_json: &str, x: f32, y: f32) -> Result<u32, StageError> {
        let spec = EntitySpec::from_json(spec_json)?;
        let id = self.stage.drop_entity(&spec, Vec2::new(x, y))?;
        self.redraw();
        Ok(id.0)
    }

    pub fn delete_entity(&mut self, id: u32) -> Result<(), StageError> {
        self.stage.delete_entity(EntityId(id))?;
        self.redraw();
        Ok(())
    }

    pub fn attach_behavior(&mut self, entity: u32, json: &str) -> Result<u32, StageError> {
        let id = self.stage.attach_behavior_json(EntityId(entity), json)?;
        self.redraw();
        Ok(id.0)
    }

    pub fn detach_behavior(&mut self, entity: u32, behavior: u32) -> Result<(), StageError> {
        self.stage.detach_behavior(EntityId(entity), BehaviorId(behavior))?;
        self.redraw();
        Ok(())
    }

    pub fn set_behavior_enabled(&mut self, entity: u32, behavior: u32, enabled: bool) -> Result<(), StageError> {
        self.stage
            .set_behavior_enabled(EntityId(entity), BehaviorId(behavior), enabled)
    }

    /// JSON of one on-screen entity, for the inspector panel.
    pub fn entity_json(&self, id: u32) -> Result<Option<String>, StageError> {
        match self.stage.entity(EntityId(id)) {
            Some(entity) => Ok(Some(serde_json::to_string(&entity.to_record())?)),
            None => Ok(None),
        }
    }

    // ---- Pointer accessors for reads from WASM memory ----

    pub fn instances_ptr(&self) -> *const f32 {
        self.output.render_buffer.instances_ptr()
    }

    pub fn instance_count(&self) -> u32 {
        self.output.render_buffer.instance_count()
    }

    pub fn events_ptr(&self) -> *const f32 {
        self.output.events.as_ptr() as *const f32
    }

    pub fn events_len(&self) -> u32 {
        self.output.events.len() as u32
    }

    pub fn sprite_source(&self, index: u32) -> Option<String> {
        self.output.sprites.source(SpriteId(index)).map(str::to_string)
    }

    pub fn sprite_count(&self) -> u32 {
        self.output.sprites.len() as u32
    }
}
