use glam::Vec2;
use ow_core::input::DirectionSnapshot;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::MAX_FIXED_DT;
use crate::contact::Resolution;
use crate::world::World;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<DirectionSnapshot> {
        let mut out = Vec::new();
        for frame in &self.frames {
            let snapshot = DirectionSnapshot {
                up: frame.up,
                left: frame.left,
                down: frame.down,
                right: frame.right,
            };
            for _ in 0..frame.repeat.max(1) {
                out.push(snapshot);
            }
        }
        out
    }
}

/// End state of a headless run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub position: Vec2,
    pub velocity: Vec2,
    pub airborne: bool,
    pub enemies_defeated: usize,
    pub player_resets: usize,
    pub active_enemies: usize,
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if !(replay.fixed_dt > 0.0 && f64::from(replay.fixed_dt) <= MAX_FIXED_DT) {
        return Err(format!(
            "Replay validation failed: fixed_dt must be in (0, {MAX_FIXED_DT}], got {}",
            replay.fixed_dt
        ));
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

/// Feed every replay input through `world` at the replay's own step size.
pub fn run_replay(world: &mut World, replay: &ReplaySequence) -> ReplaySummary {
    let inputs = replay.expanded_inputs();
    let mut enemies_defeated = 0;
    let mut player_resets = 0;
    for input in &inputs {
        let report = world.step(input, replay.fixed_dt);
        for resolution in &report.resolutions {
            match resolution {
                Resolution::DefeatEnemy(_) => enemies_defeated += 1,
                Resolution::ResetPlayer => player_resets += 1,
                Resolution::ReverseEnemy(_) | Resolution::BouncePlayer => {}
            }
        }
    }

    let player = world.player();
    ReplaySummary {
        steps: inputs.len(),
        position: player.body.position,
        velocity: player.body.velocity,
        airborne: player.is_airborne(),
        enemies_defeated,
        player_resets,
        active_enemies: world.active_enemy_count(),
    }
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::level::parse_level;
    use std::time::{SystemTime, UNIX_EPOCH};

    const FULL: &str = include_str!("../../../assets/levels/overworld_full.json");

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "ow_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn full_world() -> World {
        let level = parse_level(FULL).expect("full level should validate");
        World::from_level(&level, &GameConfig::default()).expect("world should build")
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "right": true, "repeat": 3 },
                { "up": true },
                { "down": true, "repeat": 0 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 5);
        assert!(expanded[0].right && !expanded[0].up);
        assert!(expanded[3].up);
        assert!(expanded[4].down, "repeat 0 still plays once");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_rejects_empty_frames() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_rejects_step_sizes_outside_range() {
        for fixed_dt in ["5.0", "0.0", "-0.016"] {
            let path = temp_file_path("dt");
            fs::write(
                &path,
                format!(r#"{{ "fixed_dt": {fixed_dt}, "frames": [{{ "right": true }}] }}"#),
            )
            .expect("write replay file");
            let err = load_replay_from_path(&path).expect_err("out of range dt should fail");
            assert!(err.contains("fixed_dt must be in"), "{err}");
            let _ = fs::remove_file(path);
        }

        let replay = ReplaySequence {
            fixed_dt: MAX_FIXED_DT as f32,
            frames: vec![ReplayFrame {
                up: false,
                left: false,
                down: false,
                right: true,
                repeat: 1,
            }],
        };
        assert!(validate_replay(&replay).is_ok());
    }

    #[test]
    fn shipped_replay_parses() {
        let replay: ReplaySequence =
            serde_json::from_str(include_str!("../../../assets/replays/walk_and_jump.json"))
                .expect("shipped replay should parse");
        validate_replay(&replay).expect("shipped replay should validate");
        assert!(replay.expanded_inputs().len() > 60);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let replay = ReplaySequence {
            fixed_dt: 1.0 / 60.0,
            frames: vec![
                ReplayFrame {
                    up: false,
                    left: false,
                    down: false,
                    right: true,
                    repeat: 60,
                },
                ReplayFrame {
                    up: true,
                    left: false,
                    down: false,
                    right: true,
                    repeat: 1,
                },
                ReplayFrame {
                    up: false,
                    left: false,
                    down: false,
                    right: true,
                    repeat: 120,
                },
                ReplayFrame {
                    up: false,
                    left: true,
                    down: true,
                    right: false,
                    repeat: 45,
                },
            ],
        };

        let mut world_a = full_world();
        let mut world_b = full_world();
        let run_a = run_replay(&mut world_a, &replay);
        let run_b = run_replay(&mut world_b, &replay);

        assert_eq!(run_a.steps, 226);
        assert_eq!(run_a, run_b);
        assert_eq!(
            world_a.enemies()[0].body.position,
            world_b.enemies()[0].body.position
        );
    }
}
