//! The play/edit controller and per-frame simulation loop.
//!
//! A [`Stage`] owns the authored scene. Entering play mode clones every
//! authored entity through its persisted schema and runs the clones; leaving
//! play mode cancels their animations and drops them, so nothing that
//! happens while running leaks back into the authored scene.
//!
//! The stage has no timer. The host calls [`Stage::tick`] once per display
//! refresh while it returns `true`.

use std::collections::HashSet;

use glam::Vec2;

use crate::api::config::StageConfig;
use crate::api::document::{BehaviorDraft, StageDocument};
use crate::api::error::StageError;
use crate::api::host::StageHost;
use crate::api::types::{BehaviorId, EntityId, IdAllocator, MAX_ID};
use crate::components::behavior::{Behavior, BehaviorKind, Trigger};
use crate::components::entity::{Entity, EntitySpec};
use crate::core::collision::CollisionResolver;
use crate::core::frame::FrameContext;
use crate::core::scene::Scene;
use crate::core::time::FrameClock;
use crate::input::keys::Key;
use crate::input::state::{InputEvent, InputState};
use crate::systems::animation::tick_animations;
use crate::systems::dispatch::{dispatch_key_triggers, fire_on_all, fire_on_entity};
use crate::systems::integrate::integrate;

enum Mode {
    Editing,
    /// Play-mode clones of the authored entities.
    Running(Scene),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Dragging { id: EntityId, offset: Vec2 },
    Resizing { id: EntityId, start: Vec2, initial: Vec2 },
}

pub struct Stage {
    config: StageConfig,
    authored: Scene,
    mode: Mode,
    resolver: CollisionResolver,
    input: InputState,
    clock: FrameClock,
    ids: IdAllocator,
    selected: Option<EntityId>,
    gesture: Gesture,
}

impl Stage {
    pub fn new(config: StageConfig) -> Self {
        Self {
            config,
            authored: Scene::new(),
            mode: Mode::Editing,
            resolver: CollisionResolver::new(),
            input: InputState::new(),
            clock: FrameClock::new(),
            ids: IdAllocator::new(),
            selected: None,
            gesture: Gesture::Idle,
        }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        matches!(self.mode, Mode::Running(_))
    }

    /// The entities currently on screen: the play clones while running,
    /// otherwise the authored scene.
    pub fn entities(&self) -> &[Entity] {
        match &self.mode {
            Mode::Running(scene) => scene.as_slice(),
            Mode::Editing => self.authored.as_slice(),
        }
    }

    /// The authored scene, untouched by play mode.
    pub fn authored(&self) -> &Scene {
        &self.authored
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities().iter().find(|e| e.id == id)
    }

    /// Topmost on-screen entity under `p`.
    pub fn entity_at(&self, p: Vec2) -> Option<EntityId> {
        self.entities()
            .iter()
            .rev()
            .find(|e| e.contains_point(p))
            .map(|e| e.id)
    }

    pub fn selected(&self) -> Option<EntityId> {
        self.selected
    }

    /// Frames ticked since play mode was entered.
    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }

    // ---- Mode transitions ----

    /// Switch to play mode at host time `now_ms`.
    ///
    /// Clones every authored entity, forgets held keys and win contacts, then
    /// runs every `onStart` behavior once in list order.
    pub fn enter_running(&mut self, now_ms: f64) {
        if self.is_running() {
            log::debug!("enter_running: already running");
            return;
        }

        let mut scene: Scene = self
            .authored
            .iter()
            .map(|e| e.duplicate(&mut self.ids, &self.config))
            .collect();

        self.resolver.reset();
        self.input.release_all();
        self.clock.reset(now_ms);
        self.selected = None;
        self.gesture = Gesture::Idle;

        let ctx = FrameContext::sample(0, now_ms, 0.0, &self.input, scene.as_slice(), &self.config);
        let started = fire_on_all(scene.as_mut_slice(), Trigger::OnStart, &ctx);

        log::info!(
            "play mode: {} entities, {} start behaviors applied",
            scene.len(),
            started
        );
        self.mode = Mode::Running(scene);
    }

    /// Return to editing. Every play-mode animation is cancelled and the
    /// clones are dropped. Returns whether the mode changed.
    pub fn exit_running(&mut self) -> bool {
        let Mode::Running(mut scene) = std::mem::replace(&mut self.mode, Mode::Editing) else {
            log::debug!("exit_running: already editing");
            return false;
        };

        let cancelled: usize = scene.iter_mut().map(Entity::cleanup_behaviors).sum();
        self.input.release_all();
        self.gesture = Gesture::Idle;
        log::info!(
            "edit mode: dropped {} play entities, cancelled {} animations",
            scene.len(),
            cancelled
        );
        true
    }

    // ---- Frame loop ----

    /// Run one frame at host time `now_ms`.
    ///
    /// Returns whether the host should schedule another frame; `false` while
    /// editing.
    pub fn tick<H: StageHost + ?Sized>(&mut self, now_ms: f64, host: &mut H) -> bool {
        let Mode::Running(scene) = &mut self.mode else {
            return false;
        };

        let elapsed = self.clock.advance(now_ms);
        let frame = self.clock.frame();
        self.resolver.begin_frame();

        let ctx = FrameContext::sample(frame, now_ms, elapsed, &self.input, scene.as_slice(), &self.config);
        log::trace!("frame {} (+{:.1} ms)", frame, ctx.elapsed_ms);
        let entities = scene.as_mut_slice();

        dispatch_key_triggers(entities, &ctx, &self.config);
        tick_animations(entities, now_ms);

        let mut wins = self.resolver.resolve(entities, ctx.bounds, true).wins;
        if integrate(entities) {
            wins += self.resolver.resolve(entities, ctx.bounds, true).wins;
        }

        for _ in 0..wins {
            host.on_win(frame);
        }
        host.redraw(entities, self.selected);
        true
    }

    // ---- Input ----

    /// Route a host input event.
    pub fn handle_input<H: StageHost + ?Sized>(&mut self, event: InputEvent, host: &mut H) {
        match event {
            InputEvent::PointerDown { x, y } => self.pointer_down(Vec2::new(x, y), host),
            InputEvent::PointerMove { x, y } => self.pointer_move(Vec2::new(x, y), host),
            InputEvent::PointerUp { x, y } => self.pointer_up(Vec2::new(x, y)),
            InputEvent::PointerLeave => self.pointer_leave(host),
            InputEvent::KeyDown { key } => self.key_down(key),
            InputEvent::KeyUp { key } => self.key_up(&key),
        }
    }

    /// Running: `onClick` on the topmost entity under `p`, then `mouseDown`
    /// on every entity, then one resolver pass.
    /// Editing: start a resize, select-and-drag, or deselect.
    pub fn pointer_down<H: StageHost + ?Sized>(&mut self, p: Vec2, host: &mut H) {
        self.input.set_pointer(p);

        if !self.is_running() {
            self.begin_gesture(p);
            host.redraw(self.authored.as_slice(), self.selected);
            return;
        }
        let Mode::Running(scene) = &mut self.mode else {
            return;
        };

        let frame = self.clock.frame();
        let ctx = FrameContext::sample(
            frame,
            self.clock.now_ms(),
            0.0,
            &self.input,
            scene.as_slice(),
            &self.config,
        );
        if let Some(id) = scene.topmost_at(p) {
            if let Some(entity) = scene.get_mut(id) {
                fire_on_entity(entity, Trigger::OnClick, &ctx, None);
            }
        }
        fire_on_all(scene.as_mut_slice(), Trigger::MouseDown, &ctx);

        let report = self.resolver.resolve(scene.as_mut_slice(), ctx.bounds, true);
        for _ in 0..report.wins {
            host.on_win(frame);
        }
    }

    pub fn pointer_move<H: StageHost + ?Sized>(&mut self, p: Vec2, host: &mut H) {
        self.input.set_pointer(p);
        if self.is_running() {
            return;
        }

        let (id, has_collision) = match self.gesture {
            Gesture::Idle => return,
            Gesture::Dragging { id, offset } => {
                let Some(entity) = self.authored.get_mut(id) else {
                    self.gesture = Gesture::Idle;
                    return;
                };
                entity.pos = p - offset;
                (id, entity.has_collision)
            }
            Gesture::Resizing { id, start, initial } => {
                let Some(entity) = self.authored.get_mut(id) else {
                    self.gesture = Gesture::Idle;
                    return;
                };
                let size = initial + (p - start);
                entity.resize(size.x, size.y);
                (id, entity.has_collision)
            }
        };

        if has_collision {
            self.resolve_authored();
        }
        log::trace!("gesture moved {}", id);
        host.redraw(self.authored.as_slice(), self.selected);
    }

    pub fn pointer_up(&mut self, p: Vec2) {
        self.input.set_pointer(p);
        self.gesture = Gesture::Idle;
    }

    /// The pointer left the canvas: an unfinished resize snaps back.
    pub fn pointer_leave<H: StageHost + ?Sized>(&mut self, host: &mut H) {
        if let Gesture::Resizing { id, initial, .. } = self.gesture {
            if let Some(entity) = self.authored.get_mut(id) {
                entity.resize(initial.x, initial.y);
            }
            host.redraw(self.authored.as_slice(), self.selected);
        }
        self.gesture = Gesture::Idle;
    }

    /// Keys are only tracked while running.
    pub fn key_down(&mut self, key: Key) {
        if self.is_running() {
            self.input.press(key);
        }
    }

    pub fn key_up(&mut self, key: &Key) {
        self.input.release(key);
    }

    fn begin_gesture(&mut self, p: Vec2) {
        let handle = self.config.resize_handle_size;
        if let Some(entity) = self.selected.and_then(|id| self.authored.get(id)) {
            if entity.is_over_resize_handle(p, handle) {
                self.gesture = Gesture::Resizing {
                    id: entity.id,
                    start: p,
                    initial: entity.size,
                };
                return;
            }
        }

        match self.authored.topmost_at(p).and_then(|id| self.authored.get(id)) {
            Some(entity) => {
                self.selected = Some(entity.id);
                self.gesture = Gesture::Dragging {
                    id: entity.id,
                    offset: p - entity.pos,
                };
            }
            None => {
                self.selected = None;
                self.gesture = Gesture::Idle;
            }
        }
    }

    fn resolve_authored(&mut self) {
        let bounds = self.config.bounds();
        self.resolver.resolve(self.authored.as_mut_slice(), bounds, false);
    }

    // ---- Authoring ----

    fn ensure_editing(&self) -> Result<(), StageError> {
        if self.is_running() {
            return Err(StageError::Running);
        }
        Ok(())
    }

    fn authored_mut(&mut self, id: EntityId) -> Result<&mut Entity, StageError> {
        self.authored.get_mut(id).ok_or(StageError::EntityNotFound(id))
    }

    /// Place a new entity exactly as described by `spec`.
    pub fn add_entity(&mut self, spec: &EntitySpec) -> Result<EntityId, StageError> {
        self.ensure_editing()?;
        let id = self.ids.next_entity();
        self.authored.spawn(Entity::create(spec, id, &self.config));
        Ok(id)
    }

    /// Place a new entity centred on the drop point `at`.
    pub fn drop_entity(&mut self, spec: &EntitySpec, at: Vec2) -> Result<EntityId, StageError> {
        self.ensure_editing()?;
        let id = self.ids.next_entity();
        let mut entity = Entity::create(spec, id, &self.config);
        entity.pos = at - entity.size / 2.0;
        log::debug!("dropped {} '{}' at {}", id, entity.name, entity.pos);
        self.authored.spawn(entity);
        Ok(id)
    }

    /// Delete an entity from whatever is on screen.
    ///
    /// While running this removes the play clone only, and its animations
    /// stop at once.
    pub fn delete_entity(&mut self, id: EntityId) -> Result<Entity, StageError> {
        let scene = match &mut self.mode {
            Mode::Running(scene) => scene,
            Mode::Editing => &mut self.authored,
        };
        let mut entity = scene.despawn(id).ok_or(StageError::EntityNotFound(id))?;
        entity.cleanup_behaviors();
        if self.selected == Some(id) {
            self.selected = None;
            self.gesture = Gesture::Idle;
        }
        Ok(entity)
    }

    /// Attach `trigger -> kind` to an authored entity.
    ///
    /// An `onStart` flag-setter also sets its flag on the authored entity
    /// right away, so the editor shows its effect.
    pub fn attach_behavior(
        &mut self,
        entity_id: EntityId,
        trigger: Trigger,
        kind: BehaviorKind,
    ) -> Result<BehaviorId, StageError> {
        self.ensure_editing()?;
        let ctx = FrameContext::new(0, 0.0, &self.config);
        let behavior_id = self.ids.next_behavior();
        let entity = self.authored_mut(entity_id)?;

        let behavior = Behavior::new(behavior_id, trigger, kind);
        let immediate = (trigger == Trigger::OnStart && behavior.kind.is_flag_setter()).then(|| behavior.clone());
        let id = entity.attach_behavior(behavior)?;
        if let Some(mut flag) = immediate {
            flag.execute(entity, &ctx);
        }
        log::debug!("attached {} to {}", id, entity_id);
        Ok(id)
    }

    /// Attach a behavior given as palette JSON
    /// (`{"triggerType": .., "behaviorKind": .., "parameters": {..}}`).
    pub fn attach_behavior_json(&mut self, entity_id: EntityId, json: &str) -> Result<BehaviorId, StageError> {
        let draft = BehaviorDraft::from_json(json)?;
        let kind = BehaviorKind::from_parts(&draft.behavior_kind, &draft.parameters)
            .ok_or(StageError::UnknownKind(draft.behavior_kind))?;
        self.attach_behavior(entity_id, draft.trigger_type, kind)
    }

    /// Detach a behavior. Flags it implied are reverted unless another
    /// behavior on the entity still implies them.
    pub fn detach_behavior(&mut self, entity_id: EntityId, behavior_id: BehaviorId) -> Result<Behavior, StageError> {
        self.ensure_editing()?;
        let gravity = self.config.gravity;
        let entity = self.authored_mut(entity_id)?;
        let removed = entity.detach_behavior(behavior_id)?;
        if removed.kind.is_flag_setter() {
            entity.revert_flags_for(&removed.kind, gravity);
        }
        Ok(removed)
    }

    pub fn set_behavior_enabled(
        &mut self,
        entity_id: EntityId,
        behavior_id: BehaviorId,
        enabled: bool,
    ) -> Result<(), StageError> {
        self.ensure_editing()?;
        let behavior = self
            .authored_mut(entity_id)?
            .behavior_mut(behavior_id)
            .ok_or(StageError::BehaviorNotFound(entity_id, behavior_id))?;
        behavior.enabled = enabled;
        Ok(())
    }

    /// Move an authored entity's top-left corner to `pos`.
    pub fn move_entity(&mut self, id: EntityId, pos: Vec2) -> Result<(), StageError> {
        self.ensure_editing()?;
        let entity = self.authored_mut(id)?;
        entity.pos = pos;
        if entity.has_collision {
            self.resolve_authored();
        }
        Ok(())
    }

    pub fn resize_entity(&mut self, id: EntityId, width: f32, height: f32, keep_aspect: bool) -> Result<(), StageError> {
        self.ensure_editing()?;
        let entity = self.authored_mut(id)?;
        if keep_aspect {
            entity.resize_keep_aspect(width, height);
        } else {
            entity.resize(width, height);
        }
        if entity.has_collision {
            self.resolve_authored();
        }
        Ok(())
    }

    /// Select an authored entity, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<EntityId>) -> Result<(), StageError> {
        self.ensure_editing()?;
        if let Some(id) = id {
            if self.authored.get(id).is_none() {
                return Err(StageError::EntityNotFound(id));
            }
        }
        self.selected = id;
        Ok(())
    }

    // ---- Persistence ----

    /// Serialize the authored scene. Play-mode state is never saved.
    pub fn save_json(&self) -> Result<String, StageError> {
        let doc = StageDocument {
            entities: self.authored.iter().map(Entity::to_record).collect(),
        };
        Ok(doc.to_json()?)
    }

    /// Replace the authored scene with a saved document. Returns the number
    /// of entities loaded.
    pub fn load_json(&mut self, json: &str) -> Result<usize, StageError> {
        self.ensure_editing()?;
        let doc = StageDocument::from_json(json)?;

        for record in &doc.entities {
            self.ids.reserve_entity(record.id);
            for behavior in &record.behaviors {
                self.ids.reserve_behavior(behavior.id);
            }
        }

        // Oversized or repeated ids are renumbered; the first holder keeps its id.
        let mut seen = HashSet::new();
        let mut seen_behaviors = HashSet::new();
        let mut scene = Scene::with_capacity(doc.entities.len());
        for record in &doc.entities {
            let mut entity = Entity::from_record(record, &self.config);
            if entity.id.0 > MAX_ID || !seen.insert(entity.id) {
                let fresh = self.ids.next_entity();
                log::warn!("entity id {} in document is unusable, using {}", entity.id, fresh);
                entity.id = fresh;
                seen.insert(fresh);
            }
            for behavior in entity.behaviors.iter_mut() {
                if behavior.id.0 > MAX_ID || !seen_behaviors.insert(behavior.id) {
                    let fresh = self.ids.next_behavior();
                    log::warn!("behavior id {} in document is unusable, using {}", behavior.id, fresh);
                    behavior.id = fresh;
                    seen_behaviors.insert(fresh);
                }
            }
            scene.spawn(entity);
        }

        self.authored = scene;
        self.selected = None;
        self.gesture = Gesture::Idle;
        log::info!("loaded {} entities", self.authored.len());
        Ok(self.authored.len())
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(StageConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::entity::EntityRecord;

    #[derive(Default)]
    struct Recorder {
        redraws: usize,
        wins: Vec<u64>,
    }

    impl StageHost for Recorder {
        fn redraw(&mut self, _entities: &[Entity], _selected: Option<EntityId>) {
            self.redraws += 1;
        }

        fn on_win(&mut self, frame: u64) {
            self.wins.push(frame);
        }
    }

    fn spec(x: f32, y: f32) -> EntitySpec {
        EntitySpec {
            x: Some(x),
            y: Some(y),
            ..EntitySpec::default()
        }
    }

    fn records(stage: &Stage) -> Vec<EntityRecord> {
        stage.authored().iter().map(Entity::to_record).collect()
    }

    fn kind(name: &str) -> BehaviorKind {
        BehaviorKind::defaults(name).unwrap()
    }

    #[test]
    fn tick_while_editing_stops_the_loop() {
        let mut stage = Stage::default();
        let mut host = Recorder::default();
        assert!(!stage.tick(0.0, &mut host));
        assert_eq!(host.redraws, 0);
    }

    #[test]
    fn mode_round_trip_restores_authored_state() {
        let mut stage = Stage::default();
        let hero = stage.add_entity(&spec(100.0, 100.0)).unwrap();
        stage
            .attach_behavior(hero, Trigger::OnStart, BehaviorKind::Move { dx: 40.0, dy: 0.0 })
            .unwrap();
        stage.attach_behavior(hero, Trigger::OnStart, kind("enableGravity")).unwrap();
        stage.attach_behavior(hero, Trigger::SpacePress, kind("jump")).unwrap();
        let before = records(&stage);

        let mut host = Recorder::default();
        stage.enter_running(0.0);
        assert!(stage.is_running());
        assert_eq!(stage.entities()[0].pos.x, 140.0);
        stage.key_down(Key::Space);
        for i in 1..=10 {
            assert!(stage.tick(i as f64 * 16.0, &mut host));
        }
        assert_ne!(stage.entities()[0].pos, Vec2::new(100.0, 100.0));

        assert!(stage.exit_running());
        assert!(!stage.exit_running());
        assert_eq!(records(&stage), before);
        assert_eq!(stage.entities()[0].pos, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn play_clones_get_fresh_ids() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(0.0, 0.0)).unwrap();
        stage.enter_running(0.0);
        stage.enter_running(5.0);
        assert_eq!(stage.entities().len(), 1);
        assert_ne!(stage.entities()[0].id, id);
    }

    #[test]
    fn on_start_runs_in_list_order() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(10.0, 10.0)).unwrap();
        stage
            .attach_behavior(id, Trigger::OnStart, BehaviorKind::SetPosition { x: Some(300.0), y: None })
            .unwrap();
        stage
            .attach_behavior(id, Trigger::OnStart, BehaviorKind::Move { dx: 5.0, dy: 5.0 })
            .unwrap();
        stage.enter_running(0.0);
        assert_eq!(stage.entities()[0].pos, Vec2::new(305.0, 15.0));
        assert_eq!(stage.authored().as_slice()[0].pos, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn resting_on_win_object_wins_once() {
        let mut stage = Stage::default();
        let goal = stage
            .add_entity(&EntitySpec {
                width: Some(100.0),
                ..spec(0.0, 500.0)
            })
            .unwrap();
        stage.attach_behavior(goal, Trigger::OnStart, kind("winCollision")).unwrap();
        stage.attach_behavior(goal, Trigger::OnStart, kind("setStatic")).unwrap();

        let player = stage.add_entity(&spec(10.0, 468.0)).unwrap();
        stage.attach_behavior(player, Trigger::OnStart, kind("enableCollision")).unwrap();
        stage.attach_behavior(player, Trigger::OnStart, kind("enableGravity")).unwrap();

        let mut host = Recorder::default();
        stage.enter_running(0.0);
        for i in 1..=5 {
            stage.tick(i as f64 * 16.0, &mut host);
        }
        assert_eq!(host.wins, vec![1]);
        assert_eq!(host.redraws, 5);
        let player = &stage.entities()[1];
        assert_eq!(player.pos.y, 468.0);
        assert!(player.can_jump);
    }

    #[test]
    fn gravity_jump_fires_once_while_space_held() {
        let mut stage = Stage::default();
        let player = stage.add_entity(&spec(10.0, 568.0)).unwrap();
        stage.attach_behavior(player, Trigger::OnStart, kind("enableCollision")).unwrap();
        stage.attach_behavior(player, Trigger::OnStart, kind("enableGravity")).unwrap();
        stage.attach_behavior(player, Trigger::SpacePress, kind("jump")).unwrap();

        let mut host = Recorder::default();
        stage.enter_running(0.0);
        stage.key_down(Key::Space);

        stage.tick(16.0, &mut host);
        // Impulse -10, then one frame of gravity.
        assert_eq!(stage.entities()[0].velocity.y, -9.0);
        assert_eq!(stage.entities()[0].pos.y, 559.0);

        stage.tick(32.0, &mut host);
        assert_eq!(stage.entities()[0].velocity.y, -8.0);
        assert!(!stage.entities()[0].can_jump);
    }

    #[test]
    fn pointer_down_while_running_dispatches_click_and_mouse_down() {
        let mut stage = Stage::default();
        let back = stage.add_entity(&spec(100.0, 100.0)).unwrap();
        let front = stage.add_entity(&spec(110.0, 110.0)).unwrap();
        for id in [back, front] {
            stage
                .attach_behavior(id, Trigger::OnClick, BehaviorKind::Move { dx: 0.0, dy: 50.0 })
                .unwrap();
            stage
                .attach_behavior(id, Trigger::MouseDown, BehaviorKind::Move { dx: 1.0, dy: 0.0 })
                .unwrap();
        }

        let mut host = Recorder::default();
        stage.enter_running(0.0);
        stage.pointer_down(Vec2::new(120.0, 120.0), &mut host);

        let entities = stage.entities();
        assert_eq!(entities[0].pos, Vec2::new(101.0, 100.0));
        assert_eq!(entities[1].pos, Vec2::new(111.0, 160.0));
    }

    #[test]
    fn teleport_follows_pointer() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(0.0, 0.0)).unwrap();
        stage.attach_behavior(id, Trigger::MouseDown, kind("teleport")).unwrap();
        stage.enter_running(0.0);
        stage.pointer_down(Vec2::new(400.0, 300.0), &mut ());
        assert_eq!(stage.entities()[0].center(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn keys_are_ignored_while_editing() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(100.0, 100.0)).unwrap();
        stage.attach_behavior(id, Trigger::KeyPressRight, kind("moveRight")).unwrap();

        stage.key_down(Key::ArrowRight);
        stage.enter_running(0.0);
        stage.tick(16.0, &mut ());
        assert_eq!(stage.entities()[0].pos.x, 100.0);

        stage.key_down(Key::ArrowRight);
        stage.tick(32.0, &mut ());
        assert_eq!(stage.entities()[0].pos.x, 110.0);
        stage.key_up(&Key::ArrowRight);
        stage.tick(48.0, &mut ());
        assert_eq!(stage.entities()[0].pos.x, 110.0);
    }

    #[test]
    fn exit_cancels_running_jump() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(100.0, 300.0)).unwrap();
        stage.attach_behavior(id, Trigger::MouseDown, kind("jump")).unwrap();
        stage.enter_running(0.0);
        stage.pointer_down(Vec2::new(5.0, 5.0), &mut ());
        stage.tick(500.0, &mut ());
        assert!(stage.entities()[0].is_animating);
        assert!(stage.entities()[0].pos.y < 300.0);

        stage.exit_running();
        let authored = &stage.entities()[0];
        assert_eq!(authored.pos.y, 300.0);
        assert!(!authored.is_animating);
        assert!(authored.behaviors.iter().all(|b| !b.is_running()));
    }

    #[test]
    fn authoring_is_rejected_while_running() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(0.0, 0.0)).unwrap();
        stage.enter_running(0.0);

        assert!(matches!(stage.add_entity(&spec(1.0, 1.0)), Err(StageError::Running)));
        assert!(matches!(
            stage.attach_behavior(id, Trigger::OnClick, kind("jump")),
            Err(StageError::Running)
        ));
        assert!(matches!(stage.select(Some(id)), Err(StageError::Running)));
        assert!(matches!(stage.load_json("{}"), Err(StageError::Running)));
        assert!(stage.save_json().is_ok());
    }

    #[test]
    fn delete_while_running_only_touches_the_clone() {
        let mut stage = Stage::default();
        stage.add_entity(&spec(0.0, 0.0)).unwrap();
        stage.enter_running(0.0);
        let clone = stage.entities()[0].id;

        assert!(stage.delete_entity(clone).is_ok());
        assert!(stage.entities().is_empty());
        assert!(matches!(stage.delete_entity(clone), Err(StageError::EntityNotFound(_))));

        stage.exit_running();
        assert_eq!(stage.entities().len(), 1);
    }

    #[test]
    fn duplicate_attach_is_rejected_through_the_stage() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(0.0, 0.0)).unwrap();
        stage.attach_behavior(id, Trigger::MouseDown, kind("jump")).unwrap();
        let err = stage.attach_behavior(id, Trigger::MouseDown, kind("jump")).unwrap_err();
        assert!(matches!(err, StageError::DuplicateBehavior { .. }));
        assert_eq!(stage.authored().get(id).unwrap().behaviors.len(), 1);
    }

    #[test]
    fn start_flag_setters_apply_and_revert() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(0.0, 0.0)).unwrap();
        let set_static = stage.attach_behavior(id, Trigger::OnStart, kind("setStatic")).unwrap();
        let collide = stage.attach_behavior(id, Trigger::OnStart, kind("enableCollision")).unwrap();
        let e = stage.authored().get(id).unwrap();
        assert!(e.is_static && e.has_collision);

        stage.detach_behavior(id, set_static).unwrap();
        let e = stage.authored().get(id).unwrap();
        assert!(!e.is_static && e.has_collision);

        stage.detach_behavior(id, collide).unwrap();
        assert!(!stage.authored().get(id).unwrap().has_collision);
    }

    #[test]
    fn click_flag_setters_wait_for_play() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(0.0, 0.0)).unwrap();
        stage.attach_behavior(id, Trigger::OnClick, kind("enableGravity")).unwrap();
        assert!(!stage.authored().get(id).unwrap().has_gravity);
    }

    #[test]
    fn attach_from_palette_json() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(0.0, 0.0)).unwrap();
        let json = r#"{ "triggerType": "mouseDown", "behaviorKind": "changeSize", "parameters": { "scale": 1.5 } }"#;
        stage.attach_behavior_json(id, json).unwrap();

        let sound = r#"{ "triggerType": "onStart", "behaviorKind": "playSound" }"#;
        assert!(matches!(
            stage.attach_behavior_json(id, sound),
            Err(StageError::UnknownKind(k)) if k == "playSound"
        ));
        assert!(matches!(stage.attach_behavior_json(id, "nope"), Err(StageError::Json(_))));
        assert_eq!(stage.authored().get(id).unwrap().behaviors.len(), 1);
    }

    #[test]
    fn drop_centres_on_pointer() {
        let mut stage = Stage::default();
        let id = stage
            .drop_entity(
                &EntitySpec {
                    width: Some(64.0),
                    height: Some(40.0),
                    ..EntitySpec::default()
                },
                Vec2::new(200.0, 200.0),
            )
            .unwrap();
        assert_eq!(stage.entity(id).unwrap().pos, Vec2::new(168.0, 180.0));
    }

    #[test]
    fn drag_gesture_moves_selected_entity() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(100.0, 100.0)).unwrap();
        let mut host = Recorder::default();

        stage.pointer_down(Vec2::new(110.0, 105.0), &mut host);
        assert_eq!(stage.selected(), Some(id));
        stage.pointer_move(Vec2::new(210.0, 155.0), &mut host);
        assert_eq!(stage.entity(id).unwrap().pos, Vec2::new(200.0, 150.0));
        stage.pointer_up(Vec2::new(210.0, 155.0));
        stage.pointer_move(Vec2::new(400.0, 400.0), &mut host);
        assert_eq!(stage.entity(id).unwrap().pos, Vec2::new(200.0, 150.0));

        stage.pointer_down(Vec2::new(700.0, 500.0), &mut host);
        assert_eq!(stage.selected(), None);
        assert!(host.redraws >= 3);
    }

    #[test]
    fn dragging_into_a_wall_is_resolved() {
        let mut stage = Stage::default();
        let wall = stage.add_entity(&spec(200.0, 100.0)).unwrap();
        stage.attach_behavior(wall, Trigger::OnStart, kind("setStatic")).unwrap();
        let block = stage.add_entity(&spec(100.0, 100.0)).unwrap();
        stage.attach_behavior(block, Trigger::OnStart, kind("enableCollision")).unwrap();

        stage.pointer_down(Vec2::new(101.0, 101.0), &mut ());
        stage.pointer_move(Vec2::new(191.0, 101.0), &mut ());
        assert_eq!(stage.entity(block).unwrap().pos, Vec2::new(168.0, 100.0));
        assert_eq!(stage.entity(wall).unwrap().pos, Vec2::new(200.0, 100.0));
    }

    #[test]
    fn resize_gesture_and_cancel() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(100.0, 100.0)).unwrap();
        stage.select(Some(id)).unwrap();

        stage.pointer_down(Vec2::new(132.0, 132.0), &mut ());
        stage.pointer_move(Vec2::new(152.0, 142.0), &mut ());
        assert_eq!(stage.entity(id).unwrap().size, Vec2::new(52.0, 42.0));
        stage.pointer_move(Vec2::new(0.0, 0.0), &mut ());
        assert_eq!(stage.entity(id).unwrap().size, Vec2::splat(16.0));

        stage.pointer_leave(&mut ());
        assert_eq!(stage.entity(id).unwrap().size, Vec2::splat(32.0));
        assert_eq!(stage.selected(), Some(id));
    }

    #[test]
    fn resize_entity_keeps_aspect_on_request() {
        let mut stage = Stage::default();
        let id = stage
            .add_entity(&EntitySpec {
                width: Some(40.0),
                height: Some(20.0),
                ..EntitySpec::default()
            })
            .unwrap();
        stage.resize_entity(id, 100.0, 100.0, true).unwrap();
        assert_eq!(stage.entity(id).unwrap().size, Vec2::new(100.0, 50.0));
        stage.resize_entity(id, 10.0, 70.0, false).unwrap();
        assert_eq!(stage.entity(id).unwrap().size, Vec2::new(16.0, 70.0));
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut stage = Stage::default();
        let id = stage
            .add_entity(&EntitySpec {
                name: Some("hero".into()),
                sprite: Some("hero.png".into()),
                ..spec(20.0, 30.0)
            })
            .unwrap();
        stage.attach_behavior(id, Trigger::SpacePress, kind("jump")).unwrap();
        stage.attach_behavior(id, Trigger::OnStart, kind("winCollision")).unwrap();
        let json = stage.save_json().unwrap();

        let mut other = Stage::default();
        assert_eq!(other.load_json(&json).unwrap(), 1);
        assert_eq!(records(&other), records(&stage));

        // Fresh ids never collide with loaded ones.
        let next = other.add_entity(&spec(0.0, 0.0)).unwrap();
        assert!(next > id);
    }

    #[test]
    fn load_skips_unknown_kinds_and_duplicate_ids() {
        let json = r#"{ "entities": [
            { "id": 3, "name": "a", "behaviors": [
                { "id": 1, "triggerType": "onStart", "behaviorKind": "playSound" },
                { "id": 2, "triggerType": "onClick", "behaviorKind": "teleport" }
            ] },
            { "id": 3, "name": "b" }
        ] }"#;
        let mut stage = Stage::default();
        assert_eq!(stage.load_json(json).unwrap(), 2);
        let entities = stage.entities();
        assert_eq!(entities[0].behaviors.len(), 1);
        assert_ne!(entities[0].id, entities[1].id);
        assert!(matches!(stage.load_json("[1, 2"), Err(StageError::Json(_))));
    }

    #[test]
    fn holding_into_a_static_goal_wins_once() {
        let mut stage = Stage::default();
        let goal = stage.add_entity(&spec(200.0, 100.0)).unwrap();
        stage.attach_behavior(goal, Trigger::OnStart, kind("winCollision")).unwrap();
        stage.attach_behavior(goal, Trigger::OnStart, kind("setStatic")).unwrap();
        let player = stage.add_entity(&spec(168.0, 100.0)).unwrap();
        stage.attach_behavior(player, Trigger::OnStart, kind("enableCollision")).unwrap();
        stage.attach_behavior(player, Trigger::KeyPressRight, kind("moveRight")).unwrap();

        let mut host = Recorder::default();
        stage.enter_running(0.0);
        stage.key_down(Key::ArrowRight);
        for i in 1..=6 {
            stage.tick(i as f64 * 16.0, &mut host);
        }
        assert_eq!(host.wins, vec![1]);
        let player = &stage.entities()[1];
        assert_eq!(player.pos.x, 168.0);
        assert!(player.contacts.right);
    }

    #[test]
    fn delete_while_running_cancels_the_clone_animation() {
        let mut stage = Stage::default();
        let id = stage.add_entity(&spec(100.0, 300.0)).unwrap();
        stage.attach_behavior(id, Trigger::MouseDown, kind("jump")).unwrap();
        stage.enter_running(0.0);
        stage.pointer_down(Vec2::new(5.0, 5.0), &mut ());
        stage.tick(500.0, &mut ());
        let clone = stage.entities()[0].id;
        assert!(stage.entities()[0].is_animating);

        let removed = stage.delete_entity(clone).unwrap();
        assert!(!removed.is_animating);
        assert!(removed.behaviors.iter().all(|b| !b.is_running()));
        assert!(stage.entities().is_empty());
    }

    #[test]
    fn set_vector_nudge_is_resolved_before_integration() {
        let mut stage = Stage::default();
        let player = stage.add_entity(&spec(165.0, 100.0)).unwrap();
        stage.attach_behavior(player, Trigger::OnStart, kind("enableCollision")).unwrap();
        stage
            .attach_behavior(player, Trigger::KeyPressRight, BehaviorKind::SetVector { x: Some(8.0), y: None })
            .unwrap();
        let wall = stage.add_entity(&spec(200.0, 100.0)).unwrap();
        stage.attach_behavior(wall, Trigger::OnStart, kind("enableCollision")).unwrap();

        stage.enter_running(0.0);
        stage.key_down(Key::ArrowRight);
        stage.tick(16.0, &mut ());

        // Nudged to 173, overlapping the wall by 5; both dynamic, so each gives 2.5.
        let entities = stage.entities();
        assert_eq!(entities[0].pos.x, 170.5);
        assert_eq!(entities[1].pos.x, 202.5);
        assert_eq!(entities[0].velocity.x, 0.0);
    }

    #[test]
    fn load_drops_repeated_trigger_kind_pairs() {
        let json = r#"{ "entities": [
            { "id": 1, "behaviors": [
                { "id": 1, "triggerType": "mouseDown", "behaviorKind": "jump" },
                { "id": 2, "triggerType": "mouseDown", "behaviorKind": "jump" }
            ] }
        ] }"#;
        let mut stage = Stage::default();
        assert_eq!(stage.load_json(json).unwrap(), 1);
        let behaviors = &stage.entities()[0].behaviors;
        assert_eq!(behaviors.len(), 1);
        assert_eq!(behaviors[0].id, BehaviorId(1));
    }

    #[test]
    fn load_renumbers_oversized_ids() {
        let json = r#"{ "entities": [
            { "id": 4294967295, "behaviors": [
                { "id": 4294967295, "triggerType": "onClick", "behaviorKind": "teleport" }
            ] },
            { "id": 7, "behaviors": [
                { "id": 3, "triggerType": "onClick", "behaviorKind": "teleport" },
                { "id": 3, "triggerType": "mouseDown", "behaviorKind": "teleport" }
            ] }
        ] }"#;
        let mut stage = Stage::default();
        assert_eq!(stage.load_json(json).unwrap(), 2);

        let entities = stage.entities();
        assert_eq!(entities[0].id, EntityId(8));
        assert_eq!(entities[1].id, EntityId(7));
        let mut behavior_ids: Vec<u32> = entities
            .iter()
            .flat_map(|e| e.behaviors.iter().map(|b| b.id.0))
            .collect();
        behavior_ids.sort_unstable();
        assert_eq!(behavior_ids, vec![3, 4, 5]);

        stage.enter_running(0.0);
        stage.tick(16.0, &mut ());
        assert!(stage.entities().iter().all(|e| e.id.0 <= MAX_ID));
        assert!(stage.exit_running());
        let next = stage.add_entity(&spec(0.0, 0.0)).unwrap();
        assert!(next.0 <= MAX_ID);
    }
}
