use crate::api::types::EntityId;
use crate::components::entity::Entity;

/// Callbacks from the stage to whatever embeds it.
///
/// The stage keeps no rendering state; it hands the current entity list to
/// `redraw` once per frame (and after editing gestures) and reports wins as
/// they start.
pub trait StageHost {
    /// Draw `entities` in order. `selected` is the entity being edited, if any.
    fn redraw(&mut self, entities: &[Entity], selected: Option<EntityId>);

    /// A win contact started during `frame`.
    fn on_win(&mut self, _frame: u64) {}
}

/// A host that draws nothing and ignores wins.
impl StageHost for () {
    fn redraw(&mut self, _entities: &[Entity], _selected: Option<EntityId>) {}
}
