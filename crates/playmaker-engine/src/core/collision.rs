//! AABB collision resolution between collision-enabled entities.
//!
//! Every pass clears and rebuilds each entity's [`Contacts`] for every pair
//! that touches or overlaps, pushes overlapping pairs apart along the axis of
//! least overlap, then clamps dynamic entities to the canvas. A resolved pair
//! is left exactly touching and stays in contact on the next pass. The only
//! state kept across passes is the set of win pairs in contact, so a win
//! fires once per onset.
//!
//! [`Contacts`]: crate::components::entity::Contacts

use std::collections::HashSet;

use glam::Vec2;

use crate::api::types::EntityId;
use crate::components::entity::Entity;

/// Axis-aligned box given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.min + self.size / 2.0
    }

    /// Penetration depth along x, from centre distance and half extents.
    /// Negative when the boxes are apart on this axis.
    pub fn overlap_x(&self, other: &Aabb) -> f32 {
        (self.size.x + other.size.x) / 2.0 - (self.center().x - other.center().x).abs()
    }

    pub fn overlap_y(&self, other: &Aabb) -> f32 {
        (self.size.y + other.size.y) / 2.0 - (self.center().y - other.center().y).abs()
    }

    /// Strict overlap: boxes that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let (a_max, b_max) = (self.max(), other.max());
        self.min.x < b_max.x && a_max.x > other.min.x && self.min.y < b_max.y && a_max.y > other.min.y
    }

    /// Edge-inclusive point test.
    pub fn contains_point(&self, p: Vec2) -> bool {
        let max = self.max();
        p.x >= self.min.x && p.x <= max.x && p.y >= self.min.y && p.y <= max.y
    }

    /// Whether the box lies entirely inside `[0, bounds]`.
    pub fn within(&self, bounds: Vec2) -> bool {
        let max = self.max();
        self.min.x >= 0.0 && self.min.y >= 0.0 && max.x <= bounds.x && max.y <= bounds.y
    }
}

/// What one resolver pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Win contacts that started during this pass.
    pub wins: u32,
    /// Whether any position was corrected.
    pub corrected: bool,
}

/// Gap below which two boxes count as touching.
pub const CONTACT_EPSILON: f32 = 1e-3;

/// Pairwise resolver with edge-triggered win tracking.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    previous: HashSet<(EntityId, EntityId)>,
    current: HashSet<(EntityId, EntityId)>,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll the win-pair window: what was seen this frame becomes "last frame".
    pub fn begin_frame(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }

    /// Forget every tracked pair.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.current.clear();
    }

    /// Run one pass over `entities`.
    ///
    /// With `detect_wins` off (editing), win pairs are neither reported nor
    /// tracked.
    pub fn resolve(&mut self, entities: &mut [Entity], bounds: Vec2, detect_wins: bool) -> ResolveReport {
        let mut report = ResolveReport::default();
        for entity in entities.iter_mut() {
            entity.contacts.clear();
        }

        for j in 1..entities.len() {
            let (head, tail) = entities.split_at_mut(j);
            let b = &mut tail[0];
            for a in head.iter_mut() {
                if !a.has_collision || !b.has_collision || (a.is_static && b.is_static) {
                    continue;
                }
                let Some(corrected) = resolve_pair(a, b) else {
                    continue;
                };
                report.corrected |= corrected;

                if detect_wins && (a.is_win_object || b.is_win_object) && self.note_win_contact(a.id, b.id) {
                    log::info!("win: {} touched {}", a.name, b.name);
                    report.wins += 1;
                }
            }
        }

        for entity in entities.iter_mut().filter(|e| e.has_collision && !e.is_static) {
            report.corrected |= clamp_to_canvas(entity, bounds);
        }
        report
    }

    /// Record a win-pair contact. Returns true on onset only.
    fn note_win_contact(&mut self, a: EntityId, b: EntityId) -> bool {
        let key = if a <= b { (a, b) } else { (b, a) };
        let fresh = !self.previous.contains(&key);
        self.current.insert(key) && fresh
    }
}

/// Record contact between a touching pair and separate it along the axis of
/// least overlap if the boxes actually overlap.
///
/// Returns `None` when the boxes are apart (corner-only contact counts as
/// apart), otherwise whether any position changed. Contacts, directional
/// flags, velocity zeroing and jump restore apply to touching pairs too.
/// A static side absorbs no correction; two dynamic sides split it evenly.
pub fn resolve_pair(a: &mut Entity, b: &mut Entity) -> Option<bool> {
    let (ab, bb) = (a.bounds(), b.bounds());
    let (ox, oy) = (ab.overlap_x(&bb), ab.overlap_y(&bb));
    if ox < -CONTACT_EPSILON || oy < -CONTACT_EPSILON || ox.max(oy) <= CONTACT_EPSILON {
        return None;
    }
    let penetrating = ab.overlaps(&bb);

    a.contacts.colliding_with.insert(b.id);
    b.contacts.colliding_with.insert(a.id);

    let (share_a, share_b) = match (a.is_static, b.is_static) {
        (true, true) => (0.0, 0.0),
        (true, false) => (0.0, 1.0),
        (false, true) => (1.0, 0.0),
        (false, false) => (0.5, 0.5),
    };

    let delta = bb.center() - ab.center();

    if ox < oy {
        // `dir` points from a toward b.
        let dir = if delta.x > 0.0 { 1.0 } else { -1.0 };
        if dir > 0.0 {
            a.contacts.right = true;
            b.contacts.left = true;
        } else {
            a.contacts.left = true;
            b.contacts.right = true;
        }
        if penetrating {
            a.pos.x -= dir * ox * share_a;
            b.pos.x += dir * ox * share_b;
        }
        if share_a > 0.0 && a.velocity.x * dir > 0.0 {
            a.velocity.x = 0.0;
        }
        if share_b > 0.0 && b.velocity.x * dir < 0.0 {
            b.velocity.x = 0.0;
        }
    } else {
        let dir = if delta.y > 0.0 { 1.0 } else { -1.0 };
        // dir > 0: a is above b.
        let (upper, lower, upper_share) = if dir > 0.0 {
            (&mut *a, &mut *b, share_a)
        } else {
            (&mut *b, &mut *a, share_b)
        };
        upper.contacts.below = true;
        lower.contacts.above = true;
        if upper_share > 0.0 && upper.has_gravity {
            upper.can_jump = true;
        }

        if penetrating {
            a.pos.y -= dir * oy * share_a;
            b.pos.y += dir * oy * share_b;
        }
        if share_a > 0.0 && a.velocity.y * dir > 0.0 {
            a.velocity.y = 0.0;
        }
        if share_b > 0.0 && b.velocity.y * dir < 0.0 {
            b.velocity.y = 0.0;
        }
    }

    Some(penetrating && (share_a > 0.0 || share_b > 0.0))
}

/// Keep a dynamic entity inside the canvas. Returns whether it was moved.
fn clamp_to_canvas(entity: &mut Entity, bounds: Vec2) -> bool {
    let max = (bounds - entity.size).max(Vec2::ZERO);
    let mut moved = false;

    if entity.pos.x <= 0.0 {
        entity.contacts.left = true;
        entity.contacts.with_canvas = true;
        if entity.pos.x < 0.0 {
            entity.pos.x = 0.0;
            entity.velocity.x = 0.0;
            moved = true;
        }
    } else if entity.pos.x >= max.x {
        entity.contacts.right = true;
        entity.contacts.with_canvas = true;
        if entity.pos.x > max.x {
            entity.pos.x = max.x;
            entity.velocity.x = 0.0;
            moved = true;
        }
    }

    if entity.pos.y <= 0.0 {
        entity.contacts.above = true;
        entity.contacts.with_canvas = true;
        if entity.pos.y < 0.0 {
            entity.pos.y = 0.0;
            entity.velocity.y = 0.0;
            moved = true;
        }
    } else if entity.pos.y >= max.y {
        entity.contacts.below = true;
        entity.contacts.with_canvas = true;
        if entity.pos.y > max.y {
            entity.pos.y = max.y;
            entity.velocity.y = 0.0;
            entity.can_jump = true;
            moved = true;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: Vec2 = Vec2::new(800.0, 600.0);

    fn boxed(id: u32, x: f32, y: f32) -> Entity {
        Entity::new(EntityId(id))
            .with_pos(Vec2::new(x, y))
            .with_collision()
    }

    #[test]
    fn aabb_edges_do_not_overlap() {
        let a = Aabb::new(Vec2::ZERO, Vec2::splat(32.0));
        let b = Aabb::new(Vec2::new(32.0, 0.0), Vec2::splat(32.0));
        assert!(!a.overlaps(&b));
        assert_eq!(a.overlap_x(&b), 0.0);
        assert!(a.contains_point(Vec2::new(32.0, 32.0)));
        assert!(a.within(CANVAS));
        assert!(!Aabb::new(Vec2::new(790.0, 0.0), Vec2::splat(32.0)).within(CANVAS));
    }

    #[test]
    fn min_overlap_splits_evenly() {
        let mut a = boxed(1, 0.0, 0.0);
        let mut b = boxed(2, 20.0, 0.0);
        assert_eq!(a.bounds().overlap_x(&b.bounds()), 12.0);
        assert_eq!(a.bounds().overlap_y(&b.bounds()), 32.0);

        assert_eq!(resolve_pair(&mut a, &mut b), Some(true));
        assert_eq!(a.pos, Vec2::new(-6.0, 0.0));
        assert_eq!(b.pos, Vec2::new(26.0, 0.0));
        assert!(a.contacts.right && b.contacts.left);
        assert!(a.contacts.colliding_with.contains(&EntityId(2)));
        assert!(!a.bounds().overlaps(&b.bounds()));
    }

    #[test]
    fn static_side_absorbs_nothing() {
        let mut floor = boxed(1, 0.0, 100.0).with_static();
        let mut player = boxed(2, 4.0, 72.0).with_gravity(1.0);
        player.velocity.y = 4.0;
        player.can_jump = false;

        assert_eq!(resolve_pair(&mut floor, &mut player), Some(true));
        assert_eq!(floor.pos, Vec2::new(0.0, 100.0));
        assert_eq!(player.pos, Vec2::new(4.0, 68.0));
        assert_eq!(player.velocity.y, 0.0);
        assert!(player.can_jump);
        assert!(player.contacts.below && floor.contacts.above);
    }

    #[test]
    fn touching_pair_keeps_contact_without_moving() {
        let mut wall = boxed(1, 200.0, 100.0).with_static();
        let mut player = boxed(2, 168.0, 100.0);
        player.velocity.x = 3.0;

        assert_eq!(resolve_pair(&mut wall, &mut player), Some(false));
        assert_eq!(player.pos, Vec2::new(168.0, 100.0));
        assert!(player.contacts.right && wall.contacts.left);
        assert!(player.contacts.colliding_with.contains(&EntityId(1)));
        assert_eq!(player.velocity.x, 0.0);

        // Corners only, or a real gap, is no contact.
        let mut corner = boxed(3, 232.0, 132.0);
        assert_eq!(resolve_pair(&mut wall, &mut corner), None);
        let mut apart = boxed(4, 160.0, 100.0);
        assert_eq!(resolve_pair(&mut wall, &mut apart), None);
    }

    #[test]
    fn win_stays_tracked_while_pressed_against_goal() {
        let mut resolver = CollisionResolver::new();
        let mut entities = vec![boxed(1, 200.0, 100.0).with_static().with_win(), boxed(2, 168.0, 100.0)];
        let mut wins = 0;
        for frame in 0..6 {
            resolver.begin_frame();
            // Every other frame the player pushes back in.
            if frame % 2 == 0 {
                entities[1].pos.x += 10.0;
            }
            wins += resolver.resolve(&mut entities, CANVAS, true).wins;
            assert_eq!(entities[1].pos.x, 168.0);
            assert!(entities[1].contacts.right);
        }
        assert_eq!(wins, 1);
    }

    #[test]
    fn separating_velocity_is_kept() {
        let mut a = boxed(1, 0.0, 0.0);
        let mut b = boxed(2, 20.0, 0.0);
        a.velocity.x = -3.0;
        b.velocity.x = -2.0;
        resolve_pair(&mut a, &mut b);
        assert_eq!(a.velocity.x, -3.0);
        assert_eq!(b.velocity.x, 0.0);
    }

    #[test]
    fn both_static_pairs_are_skipped() {
        let mut resolver = CollisionResolver::new();
        let mut entities = vec![boxed(1, 0.0, 0.0).with_static(), boxed(2, 10.0, 0.0).with_static()];
        let report = resolver.resolve(&mut entities, CANVAS, true);
        assert_eq!(report, ResolveReport::default());
        assert_eq!(entities[1].pos, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn entities_without_collision_pass_through() {
        let mut resolver = CollisionResolver::new();
        let mut entities = vec![boxed(1, 0.0, 0.0), Entity::new(EntityId(2)).with_pos(Vec2::new(5.0, 5.0))];
        let report = resolver.resolve(&mut entities, CANVAS, true);
        assert!(!report.corrected);
        assert!(entities[0].contacts.colliding_with.is_empty());
    }

    #[test]
    fn win_fires_once_per_onset() {
        let mut resolver = CollisionResolver::new();
        let mut wins = 0;
        for _ in 0..5 {
            resolver.begin_frame();
            // Held overlapping every frame.
            let mut entities = vec![boxed(1, 100.0, 100.0).with_win(), boxed(2, 110.0, 100.0)];
            wins += resolver.resolve(&mut entities, CANVAS, true).wins;
        }
        assert_eq!(wins, 1);

        // A frame apart, then touching again, is a new onset.
        resolver.begin_frame();
        let mut apart = vec![boxed(1, 100.0, 100.0).with_win(), boxed(2, 300.0, 100.0)];
        assert_eq!(resolver.resolve(&mut apart, CANVAS, true).wins, 0);
        resolver.begin_frame();
        let mut again = vec![boxed(1, 100.0, 100.0).with_win(), boxed(2, 110.0, 100.0)];
        assert_eq!(resolver.resolve(&mut again, CANVAS, true).wins, 1);
    }

    #[test]
    fn two_passes_in_one_frame_fire_once() {
        let mut resolver = CollisionResolver::new();
        resolver.begin_frame();
        let mut first = vec![boxed(1, 0.0, 0.0).with_win(), boxed(2, 10.0, 0.0)];
        let mut second = first.clone();
        assert_eq!(resolver.resolve(&mut first, CANVAS, true).wins, 1);
        assert_eq!(resolver.resolve(&mut second, CANVAS, true).wins, 0);
    }

    #[test]
    fn editing_passes_ignore_wins() {
        let mut resolver = CollisionResolver::new();
        let mut entities = vec![boxed(1, 0.0, 0.0).with_win(), boxed(2, 10.0, 0.0)];
        assert_eq!(resolver.resolve(&mut entities, CANVAS, false).wins, 0);
        resolver.begin_frame();
        let mut entities = vec![boxed(1, 0.0, 0.0).with_win(), boxed(2, 10.0, 0.0)];
        assert_eq!(resolver.resolve(&mut entities, CANVAS, true).wins, 1);
    }

    #[test]
    fn floor_clamp_restores_jump() {
        let mut resolver = CollisionResolver::new();
        let mut player = boxed(1, 50.0, 600.0 - 32.0 + 3.0).with_gravity(1.0);
        player.velocity.y = 5.0;
        player.can_jump = false;
        let mut entities = vec![player];

        let report = resolver.resolve(&mut entities, CANVAS, true);
        assert!(report.corrected);
        assert_eq!(entities[0].pos.y, 568.0);
        assert_eq!(entities[0].velocity.y, 0.0);
        assert!(entities[0].can_jump);
        assert!(entities[0].contacts.below && entities[0].contacts.with_canvas);
    }

    #[test]
    fn bounds_hold_after_every_pass() {
        let mut resolver = CollisionResolver::new();
        let mut entities = vec![
            boxed(1, -40.0, -3.0),
            boxed(2, 790.0, 599.0),
            boxed(3, 780.0, 590.0),
            boxed(4, 100.0, 100.0).with_size(Vec2::new(900.0, 20.0)),
        ];
        resolver.resolve(&mut entities, CANVAS, false);
        for e in &entities {
            let max = (CANVAS - e.size).max(Vec2::ZERO);
            assert!(e.pos.x >= 0.0 && e.pos.x <= max.x, "{:?}", e.pos);
            assert!(e.pos.y >= 0.0 && e.pos.y <= max.y, "{:?}", e.pos);
        }
    }
}
