//! Contact query and resolution.
//!
//! The physics step reports which statics stopped each body. After that, the
//! player is overlap-tested against every active enemy. Both lists feed a pure
//! `resolve` pass that decides what happens; the world applies the result.

use std::collections::HashSet;

use serde::Deserialize;

use crate::enemy::{Enemy, EnemyId};
use crate::physics::{Body, Side, StaticGroup, StaticId, Touching};
use crate::player::Player;

/// Extra penetration tolerated when deciding which side an overlap came from.
pub const OVERLAP_BIAS: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityId {
    Player,
    Enemy(EnemyId),
}

/// A dynamic body was stopped by a static on `normal` (the side of the
/// moving body that made contact).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub subject: EntityId,
    pub other: StaticId,
    pub group: StaticGroup,
    pub normal: Side,
}

/// Player and enemy boxes intersect. Touching flags describe the pair only
/// for the enemy; the player's flags also carry its resting contact this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapEvent {
    pub enemy: EnemyId,
    pub player_touching: Touching,
    pub enemy_touching: Touching,
}

impl OverlapEvent {
    pub fn is_stomp(&self) -> bool {
        self.player_touching.down && self.enemy_touching.up
    }
}

/// What a non-stomp overlap does to the player.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SideContact {
    Reset,
    #[default]
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRules {
    pub side_contact: SideContact,
    pub obstacle_group: StaticGroup,
    pub reversing: HashSet<EnemyId>,
}

impl Default for ResolveRules {
    fn default() -> Self {
        Self {
            side_contact: SideContact::default(),
            obstacle_group: StaticGroup::Pipes,
            reversing: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    ReverseEnemy(EnemyId),
    DefeatEnemy(EnemyId),
    BouncePlayer,
    ResetPlayer,
}

/// Side flags for two intersecting bodies, decided from their relative motion
/// this step. Returns `None` when the boxes do not intersect.
pub fn overlap_sides(a: &Body, b: &Body) -> Option<(Touching, Touching)> {
    let box_a = a.aabb();
    let box_b = b.aabb();
    if !box_a.intersects(&box_b) {
        return None;
    }

    let mut touch_a = Touching::default();
    let mut touch_b = Touching::default();

    let rel_y = a.delta.y - b.delta.y;
    if rel_y > 0.0 {
        if box_a.max_y() - box_b.min_y() <= rel_y + OVERLAP_BIAS {
            touch_a.down = true;
            touch_b.up = true;
        }
    } else if rel_y < 0.0 && box_b.max_y() - box_a.min_y() <= -rel_y + OVERLAP_BIAS {
        touch_a.up = true;
        touch_b.down = true;
    }

    if !touch_a.any() {
        let rel_x = a.delta.x - b.delta.x;
        if rel_x > 0.0 {
            if box_a.max_x() - box_b.min_x() <= rel_x + OVERLAP_BIAS {
                touch_a.right = true;
                touch_b.left = true;
            }
        } else if rel_x < 0.0 && box_b.max_x() - box_a.min_x() <= -rel_x + OVERLAP_BIAS {
            touch_a.left = true;
            touch_b.right = true;
        }
    }

    Some((touch_a, touch_b))
}

pub fn query_overlaps(player: &Player, enemies: &[Enemy]) -> Vec<OverlapEvent> {
    if !player.body.enabled {
        return Vec::new();
    }
    enemies
        .iter()
        .filter(|enemy| enemy.is_active())
        .filter_map(|enemy| {
            let (pair_player, pair_enemy) = overlap_sides(&player.body, &enemy.body)?;
            let mut player_touching = player.body.touching;
            player_touching.merge(pair_player);
            Some(OverlapEvent {
                enemy: enemy.id,
                player_touching,
                enemy_touching: pair_enemy,
            })
        })
        .collect()
}

/// Decide the consequences of this step's contacts. Output order is
/// reversals first, then overlaps in query order; duplicates are dropped.
pub fn resolve(
    contacts: &[ContactEvent],
    overlaps: &[OverlapEvent],
    rules: &ResolveRules,
) -> Vec<Resolution> {
    let mut out: Vec<Resolution> = Vec::new();

    for contact in contacts {
        let EntityId::Enemy(id) = contact.subject else {
            continue;
        };
        if contact.group == rules.obstacle_group
            && contact.normal.is_horizontal()
            && rules.reversing.contains(&id)
        {
            push_unique(&mut out, Resolution::ReverseEnemy(id));
        }
    }

    for overlap in overlaps {
        if overlap.is_stomp() {
            push_unique(&mut out, Resolution::DefeatEnemy(overlap.enemy));
            push_unique(&mut out, Resolution::BouncePlayer);
        } else if rules.side_contact == SideContact::Reset {
            push_unique(&mut out, Resolution::ResetPlayer);
        }
    }

    out
}

fn push_unique(out: &mut Vec<Resolution>, resolution: Resolution) {
    if !out.contains(&resolution) {
        out.push(resolution);
    }
}
