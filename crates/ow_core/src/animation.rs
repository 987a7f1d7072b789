//! Frame-based sprite animation with deterministic integer timing.
//!
//! Clips are a list of texture keys played at a fixed frame rate. Timing is
//! kept in integer microseconds so advancement is identical across platforms
//! under the fixed-timestep loop.

use std::collections::HashMap;

/// How many extra times a clip plays after the first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Forever,
    Times(u32),
}

impl Repeat {
    /// Negative counts mean "loop forever", matching the level file format.
    pub fn from_count(count: i32) -> Self {
        if count < 0 {
            Self::Forever
        } else {
            Self::Times(count as u32)
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub frames: Vec<String>,
    pub frame_duration_us: u64,
    pub repeat: Repeat,
}

impl AnimationClip {
    pub fn new(frames: Vec<String>, frame_rate: f32, repeat: Repeat) -> Result<Self, String> {
        if frames.is_empty() {
            return Err("Animation clip has no frames".to_string());
        }
        if frame_rate.is_nan() || frame_rate <= 0.0 {
            return Err(format!(
                "Animation clip frame_rate must be > 0 (got {frame_rate})"
            ));
        }
        let frame_duration_us = ((1_000_000.0 / frame_rate as f64).round() as u64).max(1);
        Ok(Self {
            frames,
            frame_duration_us,
            repeat,
        })
    }

    pub fn total_duration_us(&self) -> u64 {
        self.frame_duration_us * self.frames.len() as u64
    }
}

/// Named clips available to a level.
#[derive(Debug, Clone, Default)]
pub struct AnimationSet {
    clips: HashMap<String, AnimationClip>,
}

impl AnimationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, clip: AnimationClip) {
        self.clips.insert(key.to_string(), clip);
    }

    pub fn get(&self, key: &str) -> Option<&AnimationClip> {
        self.clips.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.clips.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Playback state of one sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animator {
    key: String,
    pub frame_index: usize,
    pub elapsed_us: u64,
    pub loops_done: u32,
    pub finished: bool,
}

impl Animator {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            frame_index: 0,
            elapsed_us: 0,
            loops_done: 0,
            finished: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Switch to `key`. With `ignore_if_playing`, asking for the clip that is
    /// already running keeps its progress. Returns true when playback restarted.
    pub fn play(&mut self, key: &str, ignore_if_playing: bool) -> bool {
        if ignore_if_playing && self.key == key {
            return false;
        }
        *self = Self::new(key);
        true
    }

    /// Advance by `dt_us` and return the texture key of the current frame.
    pub fn tick<'a>(&mut self, dt_us: u64, clip: &'a AnimationClip) -> &'a str {
        if clip.frames.is_empty() {
            return "";
        }
        if self.finished {
            return &clip.frames[self.frame_index.min(clip.frames.len() - 1)];
        }

        self.elapsed_us += dt_us;
        while self.elapsed_us >= clip.frame_duration_us {
            self.elapsed_us -= clip.frame_duration_us;
            self.frame_index += 1;
            if self.frame_index < clip.frames.len() {
                continue;
            }

            let again = match clip.repeat {
                Repeat::Forever => true,
                Repeat::Times(n) => self.loops_done < n,
            };
            if again {
                self.loops_done = self.loops_done.saturating_add(1);
                self.frame_index = 0;
            } else {
                self.frame_index = clip.frames.len() - 1;
                self.elapsed_us = 0;
                self.finished = true;
                break;
            }
        }

        &clip.frames[self.frame_index]
    }
}
