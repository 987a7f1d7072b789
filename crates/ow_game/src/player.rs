use glam::Vec2;
use ow_core::animation::Animator;
use ow_core::input::DirectionSnapshot;

use crate::physics::{Body, Facing, Hitbox, StaticGroup};

pub const WALK_SPEED: f32 = 200.0;
pub const JUMP_VELOCITY: f32 = -550.0;
pub const STOMP_BOUNCE_VELOCITY: f32 = -300.0;

pub const STANDING_HITBOX: Hitbox = Hitbox {
    size: Vec2::new(20.0, 60.0),
    offset: Vec2::new(25.0, 0.0),
};

/// Half height, shifted down so the feet stay on the same line as standing.
pub const CROUCH_HITBOX: Hitbox = Hitbox {
    size: Vec2::new(20.0, 30.0),
    offset: Vec2::new(25.0, 30.0),
};

pub const ANIM_IDLE: &str = "idle";
pub const ANIM_WALK: &str = "walk";
pub const ANIM_CROUCH: &str = "crouch";

pub const PLAYER_COLLIDES_WITH: &[StaticGroup] = &[StaticGroup::Platforms, StaticGroup::Pipes];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    WalkingLeft,
    WalkingRight,
    Crouching,
}

impl PlayerState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WalkingLeft => "walk-left",
            Self::WalkingRight => "walk-right",
            Self::Crouching => "crouch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub body: Body,
    pub facing: Facing,
    pub animator: Animator,
    pub state: PlayerState,
    spawn: Vec2,
}

impl Player {
    pub fn new(spawn: Vec2) -> Self {
        Self {
            body: Body::new(spawn, STANDING_HITBOX),
            facing: Facing::Right,
            animator: Animator::new(ANIM_IDLE),
            state: PlayerState::Idle,
            spawn,
        }
    }

    pub fn spawn(&self) -> Vec2 {
        self.spawn
    }

    /// Per-step movement decision. Horizontal priority is
    /// left > right > down > none; the jump check runs independently.
    pub fn drive(&mut self, input: &DirectionSnapshot) -> PlayerState {
        self.body.velocity.x = 0.0;

        let state = if input.left {
            self.body.velocity.x = -WALK_SPEED;
            self.animator.play(ANIM_WALK, true);
            self.facing = Facing::Left;
            PlayerState::WalkingLeft
        } else if input.right {
            self.body.velocity.x = WALK_SPEED;
            self.animator.play(ANIM_WALK, true);
            self.facing = Facing::Right;
            PlayerState::WalkingRight
        } else if input.down {
            self.animator.play(ANIM_CROUCH, true);
            self.body.set_hitbox(CROUCH_HITBOX);
            PlayerState::Crouching
        } else {
            self.animator.play(ANIM_IDLE, true);
            self.body.set_hitbox(STANDING_HITBOX);
            PlayerState::Idle
        };

        if input.up && self.body.touching.down {
            self.body.velocity.y = JUMP_VELOCITY;
        }

        self.state = state;
        state
    }

    pub fn is_airborne(&self) -> bool {
        !self.body.touching.down
    }

    pub fn bounce(&mut self) {
        self.body.velocity.y = STOMP_BOUNCE_VELOCITY;
    }

    /// Teleport back to the spawn point. Velocity is left alone.
    pub fn reset_to_spawn(&mut self) {
        self.body.position = self.spawn;
    }
}
