//! Arcade-style bodies moving against static rectangles.
//!
//! Coordinates are screen-style: +x right, +y down. Upward impulses are
//! negative and "down" contact means something solid below the body.
//!
//! Motion is resolved with **axis-separable move-and-slide**: X first against
//! every solid rectangle, then Y using the corrected X. A blocked axis zeroes
//! only that velocity component, so a body can slide along a wall or floor.
//! Bodies never collide with each other here; body-vs-body intersection is an
//! overlap query (see `contact`).

use glam::Vec2;
use serde::Deserialize;

const EPS: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center_x: f32,
    pub center_y: f32,
    pub half_w: f32,
    pub half_h: f32,
}

impl Aabb {
    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self {
            center_x: min.x + size.x * 0.5,
            center_y: min.y + size.y * 0.5,
            half_w: size.x * 0.5,
            half_h: size.y * 0.5,
        }
    }

    pub fn min_x(&self) -> f32 {
        self.center_x - self.half_w
    }

    pub fn max_x(&self) -> f32 {
        self.center_x + self.half_w
    }

    /// Top edge.
    pub fn min_y(&self) -> f32 {
        self.center_y - self.half_h
    }

    /// Bottom edge.
    pub fn max_y(&self) -> f32 {
        self.center_y + self.half_h
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_y() < other.max_y()
            && other.min_y() < self.max_y()
    }
}

/// Axis-aligned region used for the world and camera extents.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Bounds {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Sides of a body currently in contact with something.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Touching {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl Touching {
    pub fn any(&self) -> bool {
        self.left || self.right || self.up || self.down
    }

    pub fn merge(&mut self, other: Touching) {
        self.left |= other.left;
        self.right |= other.right;
        self.up |= other.up;
        self.down |= other.down;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Up,
    Down,
}

impl Side {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

/// Sprite mirroring. Sprites are authored facing right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn is_flipped(self) -> bool {
        self == Facing::Left
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticId(pub usize);

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StaticGroup {
    Platforms,
    Pipes,
}

#[derive(Debug, Clone)]
pub struct StaticBody {
    pub id: StaticId,
    pub group: StaticGroup,
    pub texture: String,
    pub aabb: Aabb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHit {
    pub id: StaticId,
    pub group: StaticGroup,
    pub side: Side,
}

#[derive(Debug, Clone)]
pub struct CollisionMoveResult {
    pub aabb: Aabb,
    pub blocked: Touching,
    pub hits: Vec<StaticHit>,
}

/// Collision box relative to the body's position (the sprite's top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub size: Vec2,
    pub offset: Vec2,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub hitbox: Hitbox,
    pub allow_gravity: bool,
    /// Added on top of world gravity.
    pub gravity: Vec2,
    pub collide_world_bounds: bool,
    pub enabled: bool,
    pub touching: Touching,
    pub blocked: Touching,
    /// Position change during the last physics step.
    pub delta: Vec2,
}

impl Body {
    pub fn new(position: Vec2, hitbox: Hitbox) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            hitbox,
            allow_gravity: true,
            gravity: Vec2::ZERO,
            collide_world_bounds: false,
            enabled: true,
            touching: Touching::default(),
            blocked: Touching::default(),
            delta: Vec2::ZERO,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_min_size(self.position + self.hitbox.offset, self.hitbox.size)
    }

    pub fn set_hitbox(&mut self, hitbox: Hitbox) {
        self.hitbox = hitbox;
    }

    /// Stop taking part in physics and overlap queries.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.velocity = Vec2::ZERO;
        self.delta = Vec2::ZERO;
        self.touching = Touching::default();
        self.blocked = Touching::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticGeometry {
    bodies: Vec<StaticBody>,
}

impl StaticGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, group: StaticGroup, texture: &str, aabb: Aabb) -> StaticId {
        let id = StaticId(self.bodies.len());
        self.bodies.push(StaticBody {
            id,
            group,
            texture: texture.to_string(),
            aabb,
        });
        id
    }

    pub fn get(&self, id: StaticId) -> Option<&StaticBody> {
        self.bodies.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StaticBody> {
        self.bodies.iter()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn count_in(&self, group: StaticGroup) -> usize {
        self.bodies.iter().filter(|b| b.group == group).count()
    }

    #[allow(dead_code)]
    pub fn move_and_collide(&self, aabb: Aabb, dx: f32, dy: f32, groups: &[StaticGroup]) -> Aabb {
        self.move_and_collide_detailed(aabb, dx, dy, groups).aabb
    }

    pub fn move_and_collide_detailed(
        &self,
        aabb: Aabb,
        dx: f32,
        dy: f32,
        groups: &[StaticGroup],
    ) -> CollisionMoveResult {
        let (resolved_x, hits_x) = self.resolve_axis_x(aabb, dx, groups);
        let collided_x = (resolved_x - (aabb.center_x + dx)).abs() > EPS * 0.1;

        let mut moved = aabb;
        moved.center_x = resolved_x;
        let (resolved_y, hits_y) = self.resolve_axis_y(moved, dy, groups);
        let collided_y = (resolved_y - (aabb.center_y + dy)).abs() > EPS * 0.1;
        moved.center_y = resolved_y;

        let blocked = Touching {
            left: collided_x && dx < 0.0,
            right: collided_x && dx > 0.0,
            up: collided_y && dy < 0.0,
            down: collided_y && dy > 0.0,
        };

        let mut hits = Vec::with_capacity(hits_x.len() + hits_y.len());
        if collided_x {
            let side = if dx > 0.0 { Side::Right } else { Side::Left };
            hits.extend(hits_x.into_iter().map(|b| StaticHit {
                id: b.id,
                group: b.group,
                side,
            }));
        }
        if collided_y {
            let side = if dy > 0.0 { Side::Down } else { Side::Up };
            hits.extend(hits_y.into_iter().map(|b| StaticHit {
                id: b.id,
                group: b.group,
                side,
            }));
        }

        CollisionMoveResult {
            aabb: moved,
            blocked,
            hits,
        }
    }

    fn resolve_axis_x<'a>(
        &'a self,
        aabb: Aabb,
        dx: f32,
        groups: &[StaticGroup],
    ) -> (f32, Vec<&'a StaticBody>) {
        if dx == 0.0 {
            return (aabb.center_x, Vec::new());
        }

        let mut candidate_x = aabb.center_x + dx;
        let mut stoppers: Vec<(&StaticBody, f32)> = Vec::new();
        for body in self.bodies.iter().filter(|b| groups.contains(&b.group)) {
            if !spans_overlap(aabb.min_y(), aabb.max_y(), body.aabb.min_y(), body.aabb.max_y()) {
                continue;
            }
            if dx > 0.0 {
                let face = body.aabb.min_x();
                if face >= aabb.max_x() - EPS && face < candidate_x + aabb.half_w {
                    let stop = face - aabb.half_w;
                    candidate_x = candidate_x.min(stop);
                    stoppers.push((body, stop));
                }
            } else {
                let face = body.aabb.max_x();
                if face <= aabb.min_x() + EPS && face > candidate_x - aabb.half_w {
                    let stop = face + aabb.half_w;
                    candidate_x = candidate_x.max(stop);
                    stoppers.push((body, stop));
                }
            }
        }

        // Guardrail: never push opposite direction during resolution.
        candidate_x = if dx > 0.0 {
            candidate_x.max(aabb.center_x)
        } else {
            candidate_x.min(aabb.center_x)
        };

        let hits = stoppers
            .into_iter()
            .filter(|(_, stop)| (stop - candidate_x).abs() <= EPS)
            .map(|(body, _)| body)
            .collect();
        (candidate_x, hits)
    }

    fn resolve_axis_y<'a>(
        &'a self,
        aabb: Aabb,
        dy: f32,
        groups: &[StaticGroup],
    ) -> (f32, Vec<&'a StaticBody>) {
        if dy == 0.0 {
            return (aabb.center_y, Vec::new());
        }

        let mut candidate_y = aabb.center_y + dy;
        let mut stoppers: Vec<(&StaticBody, f32)> = Vec::new();
        for body in self.bodies.iter().filter(|b| groups.contains(&b.group)) {
            if !spans_overlap(aabb.min_x(), aabb.max_x(), body.aabb.min_x(), body.aabb.max_x()) {
                continue;
            }
            if dy > 0.0 {
                let face = body.aabb.min_y();
                if face >= aabb.max_y() - EPS && face < candidate_y + aabb.half_h {
                    let stop = face - aabb.half_h;
                    candidate_y = candidate_y.min(stop);
                    stoppers.push((body, stop));
                }
            } else {
                let face = body.aabb.max_y();
                if face <= aabb.min_y() + EPS && face > candidate_y - aabb.half_h {
                    let stop = face + aabb.half_h;
                    candidate_y = candidate_y.max(stop);
                    stoppers.push((body, stop));
                }
            }
        }

        // Guardrail: never push opposite direction during resolution.
        candidate_y = if dy > 0.0 {
            candidate_y.max(aabb.center_y)
        } else {
            candidate_y.min(aabb.center_y)
        };

        let hits = stoppers
            .into_iter()
            .filter(|(_, stop)| (stop - candidate_y).abs() <= EPS)
            .map(|(body, _)| body)
            .collect();
        (candidate_y, hits)
    }
}

/// Open-interval overlap, shrunk by `EPS` so boxes that merely share an edge
/// (a body resting on a floor) do not block sideways motion.
fn spans_overlap(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> bool {
    a_min < b_max - EPS && b_min < a_max - EPS
}

pub struct PhysicsWorld {
    pub gravity: Vec2,
    pub bounds: Bounds,
    pub statics: StaticGeometry,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2, bounds: Bounds) -> Self {
        Self {
            gravity,
            bounds,
            statics: StaticGeometry::new(),
        }
    }

    /// Integrate one body for `dt` seconds against the statics in `groups`.
    /// Touching flags are rebuilt from scratch every step.
    pub fn step_body(&self, body: &mut Body, dt: f32, groups: &[StaticGroup]) -> Vec<StaticHit> {
        body.touching = Touching::default();
        body.blocked = Touching::default();
        body.delta = Vec2::ZERO;
        if !body.enabled {
            return Vec::new();
        }

        if body.allow_gravity {
            body.velocity += (self.gravity + body.gravity) * dt;
        }

        let start = body.position;
        let before = body.aabb();
        let motion = body.velocity * dt;
        let result = self
            .statics
            .move_and_collide_detailed(before, motion.x, motion.y, groups);
        body.position += Vec2::new(
            result.aabb.center_x - before.center_x,
            result.aabb.center_y - before.center_y,
        );

        let blocked = result.blocked;
        if (blocked.left && body.velocity.x < 0.0) || (blocked.right && body.velocity.x > 0.0) {
            body.velocity.x = 0.0;
        }
        if (blocked.up && body.velocity.y < 0.0) || (blocked.down && body.velocity.y > 0.0) {
            body.velocity.y = 0.0;
        }
        body.blocked = blocked;
        body.touching = blocked;

        if body.collide_world_bounds {
            let edges = self.clamp_to_bounds(body);
            body.blocked.merge(edges);
            body.touching.merge(edges);
        }

        body.delta = body.position - start;
        result.hits
    }

    fn clamp_to_bounds(&self, body: &mut Body) -> Touching {
        let aabb = body.aabb();
        let mut edges = Touching::default();

        if aabb.min_x() < self.bounds.x {
            body.position.x += self.bounds.x - aabb.min_x();
            body.velocity.x = body.velocity.x.max(0.0);
            edges.left = true;
        } else if aabb.max_x() > self.bounds.right() {
            body.position.x -= aabb.max_x() - self.bounds.right();
            body.velocity.x = body.velocity.x.min(0.0);
            edges.right = true;
        }

        if aabb.min_y() < self.bounds.y {
            body.position.y += self.bounds.y - aabb.min_y();
            body.velocity.y = body.velocity.y.max(0.0);
            edges.up = true;
        } else if aabb.max_y() > self.bounds.bottom() {
            body.position.y -= aabb.max_y() - self.bounds.bottom();
            body.velocity.y = body.velocity.y.min(0.0);
            edges.down = true;
        }

        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;
    const SOLID: &[StaticGroup] = &[StaticGroup::Platforms, StaticGroup::Pipes];

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Aabb {
        Aabb::from_min_size(Vec2::new(x, y), Vec2::new(w, h))
    }

    fn box_hitbox(size: f32) -> Hitbox {
        Hitbox {
            size: Vec2::splat(size),
            offset: Vec2::ZERO,
        }
    }

    fn world_with_floor() -> PhysicsWorld {
        let mut world = PhysicsWorld::new(
            Vec2::new(0.0, 500.0),
            Bounds {
                x: 0.0,
                y: 0.0,
                width: 1000.0,
                height: 1000.0,
            },
        );
        world
            .statics
            .add(StaticGroup::Platforms, "floor", rect(0.0, 848.0, 1000.0, 70.0));
        world
    }

    #[test]
    fn move_and_collide_blocks_motion_into_wall() {
        let mut statics = StaticGeometry::new();
        let wall = statics.add(StaticGroup::Pipes, "pipe", rect(64.0, 0.0, 32.0, 64.0));

        let start = rect(32.0, 16.0, 16.0, 16.0);
        let result = statics.move_and_collide_detailed(start, 40.0, 0.0, SOLID);
        assert!((result.aabb.max_x() - 64.0).abs() < 0.001);
        assert!(result.blocked.right);
        assert!(!result.blocked.left);
        assert_eq!(
            result.hits,
            vec![StaticHit {
                id: wall,
                group: StaticGroup::Pipes,
                side: Side::Right
            }]
        );
    }

    #[test]
    fn groups_filter_which_statics_are_solid() {
        let mut statics = StaticGeometry::new();
        statics.add(StaticGroup::Pipes, "pipe", rect(64.0, 0.0, 32.0, 64.0));

        let start = rect(32.0, 16.0, 16.0, 16.0);
        let moved = statics.move_and_collide(start, 40.0, 0.0, &[StaticGroup::Platforms]);
        assert!((moved.center_x - (start.center_x + 40.0)).abs() < 0.001);
    }

    #[test]
    fn resting_on_floor_does_not_block_sideways_motion() {
        let mut statics = StaticGeometry::new();
        statics.add(StaticGroup::Platforms, "floor", rect(0.0, 100.0, 500.0, 20.0));

        let standing = rect(50.0, 80.0, 20.0, 20.0);
        let result = statics.move_and_collide_detailed(standing, 5.0, 0.5, SOLID);
        assert!(!result.blocked.right);
        assert!(result.blocked.down);
        assert!((result.aabb.center_x - (standing.center_x + 5.0)).abs() < 0.001);
        assert!((result.aabb.max_y() - 100.0).abs() < 0.001);
    }

    #[test]
    fn moving_up_into_ceiling_never_pushes_down() {
        let mut statics = StaticGeometry::new();
        statics.add(StaticGroup::Platforms, "ceiling", rect(0.0, 0.0, 500.0, 50.0));

        let start = rect(100.0, 50.0, 20.0, 20.0);
        let result = statics.move_and_collide_detailed(start, 0.0, -10.0, SOLID);
        assert!(result.blocked.up);
        assert!(result.aabb.center_y <= start.center_y + 0.0001);
    }

    #[test]
    fn landing_sets_touching_down_and_zeroes_fall_speed() {
        let world = world_with_floor();
        let mut body = Body::new(Vec2::new(100.0, 780.0), box_hitbox(60.0));
        for _ in 0..60 {
            world.step_body(&mut body, DT, SOLID);
        }
        assert!(body.touching.down);
        assert_eq!(body.velocity.y, 0.0);
        assert!((body.aabb().max_y() - 848.0).abs() < 0.01);
    }

    #[test]
    fn airborne_body_accelerates_with_gravity() {
        let world = world_with_floor();
        let mut body = Body::new(Vec2::new(100.0, 100.0), box_hitbox(20.0));
        body.gravity = Vec2::new(0.0, 500.0);
        world.step_body(&mut body, DT, SOLID);
        assert!(!body.touching.down);
        assert!((body.velocity.y - 1000.0 * DT).abs() < 0.001);
        assert!(body.delta.y > 0.0);
    }

    #[test]
    fn gravity_can_be_disabled() {
        let world = world_with_floor();
        let mut body = Body::new(Vec2::new(100.0, 100.0), box_hitbox(20.0));
        body.allow_gravity = false;
        body.velocity = Vec2::new(0.0, -60.0);
        world.step_body(&mut body, DT, SOLID);
        assert_eq!(body.velocity.y, -60.0);
        assert!((body.position.y - 99.0).abs() < 0.001);
    }

    #[test]
    fn world_bounds_clamp_and_report_contact() {
        let world = world_with_floor();
        let mut body = Body::new(Vec2::new(2.0, 100.0), box_hitbox(20.0));
        body.allow_gravity = false;
        body.collide_world_bounds = true;
        body.velocity = Vec2::new(-600.0, 0.0);
        world.step_body(&mut body, DT, SOLID);
        assert_eq!(body.position.x, 0.0);
        assert_eq!(body.velocity.x, 0.0);
        assert!(body.touching.left);
        assert!(body.blocked.left);
    }

    #[test]
    fn disabled_body_does_not_move() {
        let world = world_with_floor();
        let mut body = Body::new(Vec2::new(100.0, 100.0), box_hitbox(20.0));
        body.velocity = Vec2::new(100.0, 0.0);
        body.disable();
        let hits = world.step_body(&mut body, DT, SOLID);
        assert!(hits.is_empty());
        assert_eq!(body.position, Vec2::new(100.0, 100.0));
    }
}
