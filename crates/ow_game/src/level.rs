//! Data-driven level description and its loader.
//!
//! A level file lists every texture and animation it uses up front; placements
//! and enemies refer to them by key. Validation is strict so `World` setup can
//! assume every reference resolves.

use glam::Vec2;
use ow_core::animation::{AnimationClip, AnimationSet, Repeat};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::contact::SideContact;
use crate::physics::{Aabb, Bounds, StaticGroup};
use crate::player::{ANIM_CROUCH, ANIM_IDLE, ANIM_WALK};

pub const LEVEL_FORMAT_VERSION: &str = "0.1";

#[derive(Debug, Deserialize, Clone)]
pub struct LevelFile {
    pub version: String,
    pub level_id: String,
    pub world: Bounds,
    pub camera: Bounds,
    #[serde(default)]
    pub side_contact: SideContact,
    /// Texture key to file path, relative to the asset root.
    pub textures: BTreeMap<String, String>,
    pub animations: BTreeMap<String, ClipSpec>,
    #[serde(default)]
    pub decorations: Vec<DecorationSpec>,
    #[serde(default)]
    pub platforms: Vec<PlacementSpec>,
    #[serde(default)]
    pub pipes: Vec<PlacementSpec>,
    pub player: PlayerSpec,
    #[serde(default)]
    pub enemies: Vec<EnemySpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClipSpec {
    pub frames: Vec<String>,
    pub frame_rate: f32,
    /// Extra passes after the first; negative loops forever.
    #[serde(default)]
    pub repeat: i32,
}

/// Non-colliding scenery.
#[derive(Debug, Deserialize, Clone)]
pub struct DecorationSpec {
    pub texture: String,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_origin")]
    pub origin: [f32; 2],
}

/// A static rectangle. `origin` is the normalized anchor inside the rectangle
/// that sits at `(x, y)`.
#[derive(Debug, Deserialize, Clone)]
pub struct PlacementSpec {
    pub texture: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_origin")]
    pub origin: [f32; 2],
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlayerSpec {
    pub x: f32,
    pub y: f32,
    /// Off by default: the player can fall out through floor gaps.
    #[serde(default)]
    pub collide_world_bounds: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnemySpec {
    pub id: String,
    pub texture: String,
    pub animation: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Added on top of world gravity.
    #[serde(default)]
    pub gravity_y: f32,
    #[serde(default)]
    pub collide_world_bounds: bool,
    #[serde(default)]
    pub collides_with: Vec<StaticGroup>,
    pub behavior: BehaviorSpec,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BehaviorSpec {
    Patrol {
        left: f32,
        right: f32,
        speed: f32,
        #[serde(default)]
        reverse_on_obstacle: bool,
    },
    Float {
        min_y: f32,
        max_y: f32,
        speed: f32,
        #[serde(default = "default_direction")]
        direction: f32,
    },
}

impl PlacementSpec {
    pub fn aabb(&self) -> Aabb {
        let size = Vec2::new(self.width, self.height);
        let min = Vec2::new(self.x, self.y) - Vec2::from(self.origin) * size;
        Aabb::from_min_size(min, size)
    }
}

pub fn load_level_from_path(level_path: &Path) -> Result<LevelFile, String> {
    let raw = fs::read_to_string(level_path)
        .map_err(|e| format!("Failed to read level file {}: {e}", level_path.display()))?;
    parse_level(&raw).map_err(|e| format!("{e} ({})", level_path.display()))
}

pub fn parse_level(raw: &str) -> Result<LevelFile, String> {
    let level: LevelFile =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse level JSON: {e}"))?;
    validate_level(&level)?;
    Ok(level)
}

fn validate_level(level: &LevelFile) -> Result<(), String> {
    if level.version != LEVEL_FORMAT_VERSION {
        return Err(format!(
            "Level validation failed: unsupported version '{}' (expected '{}')",
            level.version, LEVEL_FORMAT_VERSION
        ));
    }
    if level.level_id.trim().is_empty() {
        return Err("Level validation failed: level_id is empty".to_string());
    }
    check_bounds("world", &level.world)?;
    check_bounds("camera", &level.camera)?;

    let texture_known = |key: &str, owner: &str| -> Result<(), String> {
        if level.textures.contains_key(key) {
            Ok(())
        } else {
            Err(format!(
                "Level validation failed: {owner} references unknown texture '{key}'"
            ))
        }
    };

    for (key, clip) in &level.animations {
        if clip.frames.is_empty() {
            return Err(format!(
                "Level validation failed: animation '{key}' has no frames"
            ));
        }
        if clip.frame_rate.is_nan() || clip.frame_rate <= 0.0 {
            return Err(format!(
                "Level validation failed: animation '{key}' frame_rate must be > 0"
            ));
        }
        for frame in &clip.frames {
            texture_known(frame, &format!("animation '{key}'"))?;
        }
    }
    for required in [ANIM_IDLE, ANIM_WALK, ANIM_CROUCH] {
        if !level.animations.contains_key(required) {
            return Err(format!(
                "Level validation failed: player animation '{required}' is missing"
            ));
        }
    }

    for decoration in &level.decorations {
        texture_known(&decoration.texture, "decoration")?;
        if decoration.scale <= 0.0 {
            return Err(format!(
                "Level validation failed: decoration '{}' at ({}, {}) has non-positive scale",
                decoration.texture, decoration.x, decoration.y
            ));
        }
    }

    for (group, placements) in [("platform", &level.platforms), ("pipe", &level.pipes)] {
        for (index, placement) in placements.iter().enumerate() {
            texture_known(&placement.texture, &format!("{group} #{index}"))?;
            if placement.width <= 0.0 || placement.height <= 0.0 {
                return Err(format!(
                    "Level validation failed: {group} #{index} must have positive size (got {}x{})",
                    placement.width, placement.height
                ));
            }
        }
    }

    let mut enemy_ids = HashSet::new();
    for enemy in &level.enemies {
        if enemy.id.trim().is_empty() {
            return Err("Level validation failed: enemy id is empty".to_string());
        }
        if !enemy_ids.insert(enemy.id.as_str()) {
            return Err(format!(
                "Level validation failed: duplicate enemy id '{}'",
                enemy.id
            ));
        }
        texture_known(&enemy.texture, &format!("enemy '{}'", enemy.id))?;
        if !level.animations.contains_key(&enemy.animation) {
            return Err(format!(
                "Level validation failed: enemy '{}' references unknown animation '{}'",
                enemy.id, enemy.animation
            ));
        }
        if enemy.width <= 0.0 || enemy.height <= 0.0 {
            return Err(format!(
                "Level validation failed: enemy '{}' must have positive size",
                enemy.id
            ));
        }
        validate_behavior(&enemy.id, &enemy.behavior)?;
    }

    Ok(())
}

fn validate_behavior(id: &str, behavior: &BehaviorSpec) -> Result<(), String> {
    match *behavior {
        BehaviorSpec::Patrol {
            left, right, speed, ..
        } => {
            if left >= right {
                return Err(format!(
                    "Level validation failed: enemy '{id}' patrol left ({left}) must be < right ({right})"
                ));
            }
            if speed <= 0.0 {
                return Err(format!(
                    "Level validation failed: enemy '{id}' patrol speed must be > 0"
                ));
            }
        }
        BehaviorSpec::Float {
            min_y,
            max_y,
            speed,
            direction,
        } => {
            if min_y >= max_y {
                return Err(format!(
                    "Level validation failed: enemy '{id}' float min_y ({min_y}) must be < max_y ({max_y})"
                ));
            }
            if speed <= 0.0 {
                return Err(format!(
                    "Level validation failed: enemy '{id}' float speed must be > 0"
                ));
            }
            if direction != 1.0 && direction != -1.0 {
                return Err(format!(
                    "Level validation failed: enemy '{id}' float direction must be 1 or -1 (got {direction})"
                ));
            }
        }
    }
    Ok(())
}

fn check_bounds(name: &str, bounds: &Bounds) -> Result<(), String> {
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return Err(format!(
            "Level validation failed: {name} bounds must have positive size (got {}x{})",
            bounds.width, bounds.height
        ));
    }
    Ok(())
}

pub fn build_animations(level: &LevelFile) -> Result<AnimationSet, String> {
    let mut set = AnimationSet::new();
    for (key, spec) in &level.animations {
        let clip = AnimationClip::new(
            spec.frames.clone(),
            spec.frame_rate,
            Repeat::from_count(spec.repeat),
        )
        .map_err(|e| format!("Animation '{key}': {e}"))?;
        set.insert(key, clip);
    }
    Ok(set)
}

/// Declared textures whose file does not exist under `asset_root`.
pub fn missing_texture_files(level: &LevelFile, asset_root: &Path) -> Vec<(String, PathBuf)> {
    level
        .textures
        .iter()
        .map(|(key, rel)| (key.clone(), asset_root.join(rel)))
        .filter(|(_, path)| !path.is_file())
        .collect()
}

/// Polls a file's modification time. Switching levels retargets the watcher.
pub struct FileWatcher {
    path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl FileWatcher {
    pub fn new(path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&path);
        Self {
            path,
            last_seen_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn retarget(&mut self, path: PathBuf) {
        *self = Self::new(path);
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

const fn default_scale() -> f32 {
    1.0
}

const fn default_origin() -> [f32; 2] {
    [0.5, 0.5]
}

const fn default_direction() -> f32 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    const FULL: &str = include_str!("../../../assets/levels/overworld_full.json");
    const PATROL: &str = include_str!("../../../assets/levels/overworld_patrol.json");
    const PLAIN: &str = include_str!("../../../assets/levels/overworld_plain.json");

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "ow_level_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn minimal_level(enemies: &str) -> String {
        format!(
            r#"{{
              "version": "0.1",
              "level_id": "test_level",
              "world": {{ "width": 1000, "height": 600 }},
              "camera": {{ "width": 1000, "height": 600 }},
              "textures": {{ "hero": "img/hero.png", "ground": "img/ground.png" }},
              "animations": {{
                "idle": {{ "frames": ["hero"], "frame_rate": 10 }},
                "walk": {{ "frames": ["hero"], "frame_rate": 10, "repeat": -1 }},
                "crouch": {{ "frames": ["hero"], "frame_rate": 10 }}
              }},
              "platforms": [
                {{ "texture": "ground", "x": 0, "y": 500, "width": 1000, "height": 100, "origin": [0, 0] }}
              ],
              "player": {{ "x": 100, "y": 400 }},
              "enemies": [{enemies}]
            }}"#
        )
    }

    fn walker(id: &str, left: f32, right: f32) -> String {
        format!(
            r#"{{ "id": "{id}", "texture": "hero", "animation": "walk", "x": 200, "y": 468,
                 "width": 32, "height": 32,
                 "behavior": {{ "kind": "patrol", "left": {left}, "right": {right}, "speed": 100 }} }}"#
        )
    }

    #[test]
    fn shipped_full_level_loads() {
        let level = parse_level(FULL).expect("full level should validate");
        assert_eq!(level.level_id, "overworld_full");
        assert_eq!(level.platforms.len(), 7);
        assert_eq!(level.pipes.len(), 3);
        assert_eq!(level.enemies.len(), 3);
        assert_eq!(level.side_contact, SideContact::Reset);
        assert_eq!(level.world.width, 19200.0);
        assert_eq!((level.player.x, level.player.y), (300.0, 780.0));
        assert!(matches!(
            level.enemies[0].behavior,
            BehaviorSpec::Patrol {
                left,
                right,
                reverse_on_obstacle: true,
                ..
            } if left == 100.0 && right == 675.0
        ));
        assert!(matches!(
            level.enemies[2].behavior,
            BehaviorSpec::Float { .. }
        ));
    }

    #[test]
    fn shipped_patrol_level_loads() {
        let level = parse_level(PATROL).expect("patrol level should validate");
        assert_eq!(level.enemies.len(), 2);
        assert_eq!(level.side_contact, SideContact::Ignore);
        assert!(level.enemies.iter().all(|e| matches!(
            e.behavior,
            BehaviorSpec::Patrol {
                reverse_on_obstacle: false,
                ..
            }
        )));
    }

    #[test]
    fn shipped_plain_level_has_no_enemies_or_pipes() {
        let level = parse_level(PLAIN).expect("plain level should validate");
        assert!(level.enemies.is_empty());
        assert!(level.pipes.is_empty());
        assert_eq!(level.world.width, 3840.0);
        assert_eq!(level.camera.width, 3840.0);
    }

    #[test]
    fn floor_origin_anchors_bottom_edge() {
        let level = parse_level(FULL).expect("full level should validate");
        let floor = level.platforms[0].aabb();
        assert!((floor.min_y() - 848.0).abs() < 0.001);
        assert!((floor.max_y() - 918.0).abs() < 0.001);
        assert!((floor.min_x() - (640.0 - 0.7 * 980.0)).abs() < 0.001);

        let pipe = level.pipes[0].aabb();
        assert!((pipe.min_x() - 360.0).abs() < 0.001);
        assert!((pipe.max_y() - 848.0).abs() < 0.001);
    }

    #[test]
    fn load_level_from_path_reads_file() {
        let path = temp_file_path("valid");
        fs::write(&path, minimal_level(&walker("a", 100.0, 300.0))).expect("write level");
        let level = load_level_from_path(&path).expect("valid level should load");
        assert_eq!(level.level_id, "test_level");
        assert_eq!(level.world.x, 0.0);
        assert_eq!(level.side_contact, SideContact::Ignore);
        assert!(!level.player.collide_world_bounds);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_level_reports_path_on_parse_error() {
        let path = temp_file_path("broken");
        fs::write(&path, "{ not json").expect("write level");
        let err = load_level_from_path(&path).expect_err("broken JSON should fail");
        assert!(err.contains("Failed to parse level JSON"));
        assert!(err.contains(&path.display().to_string()));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn duplicate_enemy_ids_are_rejected() {
        let enemies = format!("{},{}", walker("a", 100.0, 300.0), walker("a", 100.0, 300.0));
        let err = parse_level(&minimal_level(&enemies)).expect_err("duplicate ids should fail");
        assert!(err.contains("duplicate enemy id 'a'"));
    }

    #[test]
    fn inverted_patrol_bounds_are_rejected() {
        let err = parse_level(&minimal_level(&walker("a", 300.0, 100.0)))
            .expect_err("left >= right should fail");
        assert!(err.contains("must be < right"));
    }

    #[test]
    fn unknown_texture_is_rejected() {
        let raw = minimal_level("").replace(r#""texture": "ground""#, r#""texture": "lava""#);
        let err = parse_level(&raw).expect_err("unknown texture should fail");
        assert!(err.contains("unknown texture 'lava'"));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let raw = minimal_level("").replace(r#""version": "0.1""#, r#""version": "9.9""#);
        let err = parse_level(&raw).expect_err("bad version should fail");
        assert!(err.contains("unsupported version"));
    }

    #[test]
    fn missing_player_clip_is_rejected() {
        let raw = minimal_level("").replace(r#""crouch":"#, r#""duck":"#);
        let err = parse_level(&raw).expect_err("missing crouch clip should fail");
        assert!(err.contains("'crouch' is missing"));
    }

    #[test]
    fn float_direction_must_be_unit() {
        let floater = r#"{ "id": "f", "texture": "hero", "animation": "walk", "x": 200, "y": 300,
            "width": 32, "height": 32,
            "behavior": { "kind": "float", "min_y": 100, "max_y": 400, "speed": 50, "direction": 0.5 } }"#;
        let err = parse_level(&minimal_level(floater)).expect_err("bad direction should fail");
        assert!(err.contains("direction must be 1 or -1"));
    }

    #[test]
    fn build_animations_maps_repeat_counts() {
        let level = parse_level(FULL).expect("full level should validate");
        let set = build_animations(&level).expect("clips should build");
        assert!(set.contains(ANIM_WALK));
        assert_eq!(
            set.get(ANIM_WALK).expect("walk clip").repeat,
            Repeat::Forever
        );
        assert_eq!(set.get(ANIM_IDLE).expect("idle clip").repeat, Repeat::Times(0));
    }

    #[test]
    fn missing_texture_files_lists_absent_assets() {
        let level = parse_level(&minimal_level("")).expect("level should validate");
        let root = std::env::temp_dir().join(format!(
            "ow_level_assets_{}_{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("system time before unix epoch")
                .as_nanos()
        ));
        fs::create_dir_all(root.join("img")).expect("create asset dir");
        fs::write(root.join("img/hero.png"), b"png").expect("write texture");

        let missing = missing_texture_files(&level, &root);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].0, "ground");

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_watcher_detects_newly_created_file() {
        let path = temp_file_path("watcher_create");
        let _ = fs::remove_file(&path);

        let mut watcher = FileWatcher::new(path.clone());
        assert!(!watcher.should_reload(), "missing file should not reload");

        fs::write(&path, minimal_level("")).expect("write level");
        assert!(
            watcher.should_reload(),
            "creating file should trigger reload once"
        );
        assert!(
            !watcher.should_reload(),
            "without changes, second poll should not reload"
        );
        assert_eq!(watcher.path(), path.as_path());

        let _ = fs::remove_file(path);
    }
}
