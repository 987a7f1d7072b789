//! The level session: every mutable piece of one running level, stepped at a
//! fixed rate. Entities are addressed by `EnemyId` / `StaticId`.

use glam::Vec2;
use ow_core::animation::AnimationSet;
use ow_core::input::DirectionSnapshot;

use crate::config::GameConfig;
use crate::contact::{
    query_overlaps, resolve, ContactEvent, EntityId, OverlapEvent, Resolution, ResolveRules,
};
use crate::enemy::{Behavior, Enemy, EnemyId, FloatPatrol, LinearPatrol};
use crate::level::{build_animations, BehaviorSpec, LevelFile};
use crate::physics::{Body, Bounds, Hitbox, PhysicsWorld, StaticGeometry, StaticGroup, StaticHit};
use crate::player::{Player, PlayerState, PLAYER_COLLIDES_WITH};

#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    pub texture: String,
    pub position: Vec2,
    pub scale: f32,
    pub origin: Vec2,
}

/// What happened during one `World::step`.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: u64,
    pub player_state: PlayerState,
    pub contacts: Vec<ContactEvent>,
    pub overlaps: Vec<OverlapEvent>,
    pub resolutions: Vec<Resolution>,
}

pub struct World {
    level_id: String,
    physics: PhysicsWorld,
    camera: Bounds,
    decorations: Vec<Decoration>,
    animations: AnimationSet,
    player: Player,
    enemies: Vec<Enemy>,
    rules: ResolveRules,
    frame: u64,
}

impl World {
    pub fn from_level(level: &LevelFile, config: &GameConfig) -> Result<Self, String> {
        let animations = build_animations(level)
            .map_err(|e| format!("Level '{}': {e}", level.level_id))?;

        let mut physics = PhysicsWorld::new(Vec2::new(0.0, config.gravity_y), level.world);
        for platform in &level.platforms {
            physics
                .statics
                .add(StaticGroup::Platforms, &platform.texture, platform.aabb());
        }
        for pipe in &level.pipes {
            physics
                .statics
                .add(StaticGroup::Pipes, &pipe.texture, pipe.aabb());
        }

        let decorations = level
            .decorations
            .iter()
            .map(|d| Decoration {
                texture: d.texture.clone(),
                position: Vec2::new(d.x, d.y),
                scale: d.scale,
                origin: Vec2::from(d.origin),
            })
            .collect();

        let mut player = Player::new(Vec2::new(level.player.x, level.player.y));
        player.body.collide_world_bounds = level.player.collide_world_bounds;

        let enemies: Vec<Enemy> = level
            .enemies
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let mut body = Body::new(
                    Vec2::new(spec.x, spec.y),
                    Hitbox {
                        size: Vec2::new(spec.width, spec.height),
                        offset: Vec2::ZERO,
                    },
                );
                body.gravity = Vec2::new(0.0, spec.gravity_y);
                body.collide_world_bounds = spec.collide_world_bounds;

                let (behavior, reverse_on_obstacle) = match spec.behavior {
                    BehaviorSpec::Patrol {
                        left,
                        right,
                        speed,
                        reverse_on_obstacle,
                    } => (
                        Behavior::Patrol(LinearPatrol { left, right, speed }),
                        reverse_on_obstacle,
                    ),
                    BehaviorSpec::Float {
                        min_y,
                        max_y,
                        speed,
                        direction,
                    } => (
                        Behavior::Float(FloatPatrol {
                            min_y,
                            max_y,
                            speed,
                            direction,
                        }),
                        false,
                    ),
                };

                let mut enemy = Enemy::new(
                    EnemyId(index),
                    &spec.id,
                    body,
                    behavior,
                    &spec.animation,
                );
                enemy.collides_with = spec.collides_with.clone();
                enemy.reverse_on_obstacle = reverse_on_obstacle;
                enemy
            })
            .collect();

        let rules = ResolveRules {
            side_contact: level.side_contact,
            obstacle_group: StaticGroup::Pipes,
            reversing: enemies
                .iter()
                .filter(|e| e.reverse_on_obstacle)
                .map(|e| e.id)
                .collect(),
        };

        log::info!(
            "Level '{}' ready: {} platforms, {} pipes, {} decorations, {} enemies, side contact {:?}",
            level.level_id,
            physics.statics.count_in(StaticGroup::Platforms),
            physics.statics.count_in(StaticGroup::Pipes),
            level.decorations.len(),
            enemies.len(),
            rules.side_contact
        );

        Ok(Self {
            level_id: level.level_id.clone(),
            physics,
            camera: level.camera,
            decorations,
            animations,
            player,
            enemies,
            rules,
            frame: 0,
        })
    }

    /// Advance the level by one fixed step of `dt` seconds.
    pub fn step(&mut self, input: &DirectionSnapshot, dt: f32) -> FrameReport {
        self.frame += 1;

        let player_state = self.player.drive(input);
        for enemy in &mut self.enemies {
            enemy.patrol();
        }

        let mut contacts = Vec::new();
        let hits = self
            .physics
            .step_body(&mut self.player.body, dt, PLAYER_COLLIDES_WITH);
        contacts.extend(hits.into_iter().map(|hit| contact_from(EntityId::Player, hit)));
        for enemy in self.enemies.iter_mut().filter(|e| e.is_active()) {
            let hits = self
                .physics
                .step_body(&mut enemy.body, dt, &enemy.collides_with);
            let subject = EntityId::Enemy(enemy.id);
            contacts.extend(hits.into_iter().map(|hit| contact_from(subject, hit)));
        }

        let overlaps = query_overlaps(&self.player, &self.enemies);
        for overlap in &overlaps {
            self.player.body.touching.merge(overlap.player_touching);
        }

        let resolutions = resolve(&contacts, &overlaps, &self.rules);
        self.apply(&resolutions);

        for enemy in &mut self.enemies {
            enemy.settle();
        }
        self.tick_animations(dt);

        FrameReport {
            frame: self.frame,
            player_state,
            contacts,
            overlaps,
            resolutions,
        }
    }

    /// Carry out resolutions in order.
    pub fn apply(&mut self, resolutions: &[Resolution]) {
        for resolution in resolutions {
            match *resolution {
                Resolution::ReverseEnemy(id) => {
                    if let Some(enemy) = self.enemy_mut(id) {
                        enemy.reverse();
                        log::debug!(
                            "{id} ({}) reversed at obstacle, now {:?}",
                            enemy.name,
                            enemy.facing
                        );
                    }
                }
                Resolution::DefeatEnemy(id) => {
                    if let Some(enemy) = self.enemy_mut(id) {
                        enemy.defeat();
                        log::info!("Player stomped {id} ({})", enemy.name);
                    }
                }
                Resolution::BouncePlayer => self.player.bounce(),
                Resolution::ResetPlayer => {
                    self.player.reset_to_spawn();
                    let spawn = self.player.spawn();
                    log::info!(
                        "Player touched an enemy from the side, reset to spawn ({}, {})",
                        spawn.x,
                        spawn.y
                    );
                }
            }
        }
    }

    fn tick_animations(&mut self, dt: f32) {
        let dt_us = (dt as f64 * 1_000_000.0).round() as u64;
        if let Some(clip) = self.animations.get(self.player.animator.key()) {
            self.player.animator.tick(dt_us, clip);
        }
        for enemy in self.enemies.iter_mut().filter(|e| e.is_active()) {
            if let Some(clip) = self.animations.get(enemy.animator.key()) {
                enemy.animator.tick(dt_us, clip);
            }
        }
    }

    fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.enemies.get_mut(id.0)
    }

    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Texture key of the player's current animation frame.
    pub fn player_texture(&self) -> Option<&str> {
        let clip = self.animations.get(self.player.animator.key())?;
        clip.frames
            .get(self.player.animator.frame_index)
            .map(String::as_str)
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    #[allow(dead_code)]
    pub fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.get(id.0)
    }

    pub fn active_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.is_active()).count()
    }

    pub fn statics(&self) -> &StaticGeometry {
        &self.physics.statics
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn world_bounds(&self) -> Bounds {
        self.physics.bounds
    }

    pub fn camera_bounds(&self) -> Bounds {
        self.camera
    }

    pub fn rules(&self) -> &ResolveRules {
        &self.rules
    }

    /// One-line summary for the window title and logs.
    pub fn status_line(&self) -> String {
        let position = self.player.body.position;
        format!(
            "{} | x={:.0} y={:.0} | {} | enemies {}/{}",
            self.level_id,
            position.x,
            position.y,
            self.player.state.label(),
            self.active_enemy_count(),
            self.enemies.len()
        )
    }
}

fn contact_from(subject: EntityId, hit: StaticHit) -> ContactEvent {
    ContactEvent {
        subject,
        other: hit.id,
        group: hit.group,
        normal: hit.side,
    }
}
