//! Enemy behaviors: boundary patrol on a platform and vertical floating.
//!
//! Behaviors only set velocities (and, for floaters, clamp position); the
//! physics step moves the body. Defeated enemies are inert.

use std::fmt;

use ow_core::animation::Animator;

use crate::physics::{Body, Facing, StaticGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(pub usize);

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enemy#{}", self.0)
    }
}

/// Walks between two x boundaries. `x` is the sprite position, not the hitbox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPatrol {
    pub left: f32,
    pub right: f32,
    pub speed: f32,
}

impl LinearPatrol {
    pub fn apply(&self, body: &mut Body, facing: &mut Facing) {
        let x = body.position.x;
        if x >= self.right && !facing.is_flipped() {
            body.velocity.x = -self.speed;
            *facing = Facing::Left;
        } else if x <= self.left && facing.is_flipped() {
            body.velocity.x = self.speed;
            *facing = Facing::Right;
        }
    }
}

/// Oscillates vertically between `min_y` and `max_y`, gravity off.
/// `direction` is +1 (moving down the screen) or -1 (moving up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatPatrol {
    pub min_y: f32,
    pub max_y: f32,
    pub speed: f32,
    pub direction: f32,
}

impl FloatPatrol {
    pub fn apply(&mut self, body: &mut Body) {
        let y = body.position.y;
        if y <= self.min_y {
            self.direction = 1.0;
        } else if y >= self.max_y {
            self.direction = -1.0;
        }
        body.position.y = y.clamp(self.min_y, self.max_y);
        body.velocity.y = self.speed * self.direction;
    }

    pub fn clamp(&self, body: &mut Body) {
        body.position.y = body.position.y.clamp(self.min_y, self.max_y);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Patrol(LinearPatrol),
    Float(FloatPatrol),
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: EnemyId,
    pub name: String,
    pub body: Body,
    pub facing: Facing,
    pub behavior: Behavior,
    pub collides_with: Vec<StaticGroup>,
    pub reverse_on_obstacle: bool,
    pub animator: Animator,
    defeated: bool,
}

impl Enemy {
    pub fn new(id: EnemyId, name: &str, mut body: Body, behavior: Behavior, animation: &str) -> Self {
        match behavior {
            Behavior::Patrol(patrol) => {
                body.velocity.x = patrol.speed;
            }
            Behavior::Float(float) => {
                body.allow_gravity = false;
                body.velocity.y = float.speed * float.direction;
            }
        }
        Self {
            id,
            name: name.to_string(),
            body,
            facing: Facing::Right,
            behavior,
            collides_with: Vec::new(),
            reverse_on_obstacle: false,
            animator: Animator::new(animation),
            defeated: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.defeated && self.body.enabled
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Pre-physics velocity decision.
    pub fn patrol(&mut self) {
        if !self.is_active() {
            return;
        }
        match &mut self.behavior {
            Behavior::Patrol(patrol) => patrol.apply(&mut self.body, &mut self.facing),
            Behavior::Float(float) => float.apply(&mut self.body),
        }
    }

    /// Post-physics correction so a floater never ends a step outside its range.
    pub fn settle(&mut self) {
        if !self.is_active() {
            return;
        }
        if let Behavior::Float(float) = &self.behavior {
            float.clamp(&mut self.body);
        }
    }

    /// Turn around after bumping an obstacle, keyed off the facing flag.
    pub fn reverse(&mut self) {
        if !self.is_active() {
            return;
        }
        let Behavior::Patrol(patrol) = self.behavior else {
            return;
        };
        if self.facing.is_flipped() {
            self.body.velocity.x = patrol.speed;
            self.facing = Facing::Right;
        } else {
            self.body.velocity.x = -patrol.speed;
            self.facing = Facing::Left;
        }
    }

    /// Irreversible for the rest of the level session.
    pub fn defeat(&mut self) {
        self.defeated = true;
        self.body.disable();
    }
}
