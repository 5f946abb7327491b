//! `#[wasm_bindgen]` exports for the Playmaker stage.
//!
//! The browser page owns the animation-frame loop: after `stage_play` it calls
//! `stage_tick(now)` from `requestAnimationFrame` until it returns `false`,
//! then reads the instance and event buffers straight out of WASM memory.
//! Events are cleared at the start of every tick, so read them after each
//! `stage_tick` and `stage_pointer_down`.

pub mod runner;

pub use runner::{FrameOutput, StageRunner};

use std::cell::RefCell;

use playmaker_engine::{InputEvent, Key, StageConfig};
use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<Option<StageRunner>> = RefCell::new(None);
}

fn with_runner<R>(f: impl FnOnce(&mut StageRunner) -> R) -> R {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        let runner = borrow
            .as_mut()
            .expect("Stage not initialized. Call stage_init() first.");
        f(runner)
    })
}

/// Create the stage. `config_json` may be empty or a partial `StageConfig`.
#[wasm_bindgen]
pub fn stage_init(config_json: &str) -> Result<(), JsError> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let config = if config_json.trim().is_empty() {
        StageConfig::default()
    } else {
        StageConfig::from_json(config_json)?
    };
    let (width, height) = (config.canvas_width, config.canvas_height);

    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(StageRunner::new(config));
    });
    log::info!("playmaker stage: initialized ({}x{})", width, height);
    Ok(())
}

// ---- Persistence ----

#[wasm_bindgen]
pub fn stage_load(json: &str) -> Result<u32, JsError> {
    let count = with_runner(|r| r.load(json))?;
    Ok(count as u32)
}

#[wasm_bindgen]
pub fn stage_save() -> Result<String, JsError> {
    Ok(with_runner(|r| r.save())?)
}

// ---- Authoring ----

/// Place a new entity from an asset description, centred on `(x, y)`.
/// Returns the new entity id.
#[wasm_bindgen]
pub fn stage_drop_entity(spec_json: &str, x: f32, y: f32) -> Result<u32, JsError> {
    Ok(with_runner(|r| r.drop_entity(spec_json, x, y))?)
}

#[wasm_bindgen]
pub fn stage_delete_entity(id: u32) -> Result<(), JsError> {
    Ok(with_runner(|r| r.delete_entity(id))?)
}

/// Attach a behavior given as `{"triggerType", "behaviorKind", "parameters"}`.
/// Rejected duplicates come back as an error the page can show.
#[wasm_bindgen]
pub fn stage_attach_behavior(entity: u32, json: &str) -> Result<u32, JsError> {
    Ok(with_runner(|r| r.attach_behavior(entity, json))?)
}

#[wasm_bindgen]
pub fn stage_detach_behavior(entity: u32, behavior: u32) -> Result<(), JsError> {
    Ok(with_runner(|r| r.detach_behavior(entity, behavior))?)
}

#[wasm_bindgen]
pub fn stage_set_behavior_enabled(entity: u32, behavior: u32, enabled: bool) -> Result<(), JsError> {
    Ok(with_runner(|r| r.set_behavior_enabled(entity, behavior, enabled))?)
}

#[wasm_bindgen]
pub fn stage_entity_json(id: u32) -> Result<Option<String>, JsError> {
    Ok(with_runner(|r| r.entity_json(id))?)
}

/// Selected entity id, or -1.
#[wasm_bindgen]
pub fn stage_selected() -> i32 {
    with_runner(|r| r.stage().selected().map_or(-1, |id| id.0 as i32))
}

// ---- Mode ----

#[wasm_bindgen]
pub fn stage_play(now_ms: f64) {
    with_runner(|r| r.play(now_ms));
}

#[wasm_bindgen]
pub fn stage_stop() {
    with_runner(|r| r.stop());
}

#[wasm_bindgen]
pub fn stage_is_running() -> bool {
    with_runner(|r| r.stage().is_running())
}

/// Run one frame. Keep requesting animation frames while this returns true.
#[wasm_bindgen]
pub fn stage_tick(now_ms: f64) -> bool {
    with_runner(|r| r.tick(now_ms))
}

#[wasm_bindgen]
pub fn stage_redraw() {
    with_runner(|r| r.redraw());
}

// ---- Input ----

#[wasm_bindgen]
pub fn stage_pointer_down(x: f32, y: f32) {
    with_runner(|r| r.push_input(InputEvent::PointerDown { x, y }));
}

#[wasm_bindgen]
pub fn stage_pointer_move(x: f32, y: f32) {
    with_runner(|r| r.push_input(InputEvent::PointerMove { x, y }));
}

#[wasm_bindgen]
pub fn stage_pointer_up(x: f32, y: f32) {
    with_runner(|r| r.push_input(InputEvent::PointerUp { x, y }));
}

#[wasm_bindgen]
pub fn stage_pointer_leave() {
    with_runner(|r| r.push_input(InputEvent::PointerLeave));
}

/// `code` is `KeyboardEvent.code`. Returns true when the page should
/// `preventDefault()` (arrow keys and space while running).
#[wasm_bindgen]
pub fn stage_key_down(code: &str) -> bool {
    let key = Key::from_code(code);
    let suppress = key.is_navigation();
    with_runner(|r| {
        let running = r.stage().is_running();
        r.push_input(InputEvent::KeyDown { key });
        running && suppress
    })
}

#[wasm_bindgen]
pub fn stage_key_up(code: &str) {
    let key = Key::from_code(code);
    with_runner(|r| r.push_input(InputEvent::KeyUp { key }));
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn get_instances_ptr() -> *const f32 {
    with_runner(|r| r.instances_ptr())
}

#[wasm_bindgen]
pub fn get_instance_count() -> u32 {
    with_runner(|r| r.instance_count())
}

#[wasm_bindgen]
pub fn get_events_ptr() -> *const f32 {
    with_runner(|r| r.events_ptr())
}

#[wasm_bindgen]
pub fn get_events_len() -> u32 {
    with_runner(|r| r.events_len())
}

#[wasm_bindgen]
pub fn get_sprite_count() -> u32 {
    with_runner(|r| r.sprite_count())
}

/// Image source for a sprite index found in the instance buffer.
#[wasm_bindgen]
pub fn get_sprite_source(index: u32) -> Option<String> {
    with_runner(|r| r.sprite_source(index))
}

#[wasm_bindgen]
pub fn get_canvas_width() -> f32 {
    with_runner(|r| r.stage().config().canvas_width)
}

#[wasm_bindgen]
pub fn get_canvas_height() -> f32 {
    with_runner(|r| r.stage().config().canvas_height)
}
