//! Overworld -- host loop and entry point.
//!
//! winit drives the event loop via `ApplicationHandler`. Simulation runs inside
//! `RedrawRequested` on a **fixed timestep** (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. handle command keys and hot reload at the frame boundary
//!   3. `while should_step()` -- sample the direction snapshot, `World::step`
//!   4. refresh the window title from the world status line
//!
//! Nothing is drawn; the window exists for keyboard focus and status. With
//! `--replay` the first level runs headless over recorded inputs instead.

mod config;
mod contact;
mod enemy;
mod level;
mod physics;
mod player;
mod replay;
mod world;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use config::{load_config_or_default, GameConfig, DEFAULT_CONFIG_PATH};
use level::{load_level_from_path, missing_texture_files, FileWatcher};
use ow_core::input::{InputState, Key};
use ow_core::time::TimeState;
use replay::{load_replay_from_path, run_replay};
use world::{FrameReport, World};

const DEFAULT_LEVELS: &[&str] = &[
    "assets/levels/overworld_full.json",
    "assets/levels/overworld_patrol.json",
    "assets/levels/overworld_plain.json",
];
const DEBUG_SNAPSHOT_INTERVAL: u64 = 60;

#[derive(Parser, Debug)]
#[command(name = "ow_game", about = "Side-scrolling platformer level runner")]
struct Cli {
    /// Game config JSON. Missing file means built-in defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Level file; repeat to build the N-key rotation. Defaults to the shipped levels.
    #[arg(long = "level")]
    levels: Vec<PathBuf>,

    /// Directory texture paths in level files are relative to.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Run the first level headless over this replay file and exit.
    #[arg(long)]
    replay: Option<PathBuf>,
}

fn load_world(level_path: &Path, config: &GameConfig, asset_root: &Path) -> Result<World, String> {
    let level = load_level_from_path(level_path)?;
    for (key, path) in missing_texture_files(&level, asset_root) {
        log::warn!(
            "Level '{}': texture '{key}' not found at {}",
            level.level_id,
            path.display()
        );
    }
    let world = World::from_level(&level, config)?;
    log_world_layout(&world);
    Ok(world)
}

fn log_world_layout(world: &World) {
    let bounds = world.world_bounds();
    let camera = world.camera_bounds();
    log::info!(
        "Level '{}': world {}x{}, camera {}x{}, {} statics, {} decorations",
        world.level_id(),
        bounds.width,
        bounds.height,
        camera.width,
        camera.height,
        world.statics().len(),
        world.decorations().len()
    );
    let (left, right) = world
        .statics()
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), body| {
            (lo.min(body.aabb.min_x()), hi.max(body.aabb.max_x()))
        });
    if left <= right {
        log::debug!("  statics span x {left:.1}..{right:.1}");
    }
    for decoration in world.decorations() {
        log::debug!(
            "  decoration '{}' at ({}, {}) scale {} origin ({}, {})",
            decoration.texture,
            decoration.position.x,
            decoration.position.y,
            decoration.scale,
            decoration.origin.x,
            decoration.origin.y
        );
    }
    log::debug!("  side contact: {:?}", world.rules().side_contact);
    for enemy in world.enemies() {
        log::debug!(
            "  {} '{}' at ({}, {}) {:?}",
            enemy.id,
            enemy.name,
            enemy.body.position.x,
            enemy.body.position.y,
            enemy.behavior
        );
    }
}

fn log_debug_snapshot(world: &World, report: &FrameReport, fps: f64) {
    log::debug!(
        "frame {} | {} | {} | texture {} | contacts {} | overlaps {} | {:.0} fps",
        report.frame,
        world.status_line(),
        report.player_state.label(),
        world.player_texture().unwrap_or("-"),
        report.contacts.len(),
        report.overlaps.len(),
        fps
    );
    for contact in &report.contacts {
        if contact.normal.is_horizontal() {
            let texture = world
                .statics()
                .get(contact.other)
                .map_or("?", |body| body.texture.as_str());
            log::debug!(
                "  {:?} blocked by static #{} '{texture}' on {:?}",
                contact.subject,
                contact.other.0,
                contact.normal
            );
        }
    }
    for enemy in world.enemies().iter().filter(|e| e.is_defeated()) {
        log::debug!("  {} '{}' defeated", enemy.id, enemy.name);
    }
}

struct GameState {
    window: Arc<Window>,
    config: GameConfig,
    asset_root: PathBuf,
    levels: Vec<PathBuf>,
    level_index: usize,
    world: World,
    watcher: FileWatcher,
    time: TimeState,
    input: InputState,
    title: String,
}

impl GameState {
    fn new(
        window: Arc<Window>,
        config: GameConfig,
        asset_root: PathBuf,
        levels: Vec<PathBuf>,
    ) -> Result<Self, String> {
        let first = levels
            .first()
            .cloned()
            .ok_or_else(|| "No level files configured".to_string())?;
        let world = load_world(&first, &config, &asset_root)?;
        let time = TimeState::with_fixed_dt(config.fixed_dt);
        Ok(Self {
            window,
            config,
            asset_root,
            levels,
            level_index: 0,
            world,
            watcher: FileWatcher::new(first),
            time,
            input: InputState::new(),
            title: String::new(),
        })
    }

    fn current_level_path(&self) -> &Path {
        &self.levels[self.level_index]
    }

    /// Rebuild the world from disk. On failure the running world is kept.
    fn reload_level(&mut self, reason: &str) {
        match load_world(self.current_level_path(), &self.config, &self.asset_root) {
            Ok(world) => {
                self.world = world;
                self.time.reset_accumulator();
                log::info!(
                    "Level reloaded ({reason}): {} from {}",
                    self.world.level_id(),
                    self.watcher.path().display()
                );
            }
            Err(err) => {
                log::error!("Level reload failed ({reason}): {err}");
            }
        }
    }

    fn next_level(&mut self) {
        let next = (self.level_index + 1) % self.levels.len();
        match load_world(&self.levels[next], &self.config, &self.asset_root) {
            Ok(world) => {
                self.level_index = next;
                self.world = world;
                self.watcher.retarget(self.levels[next].clone());
                self.time.reset_accumulator();
                log::info!(
                    "Switched to level {}/{}: {}",
                    next + 1,
                    self.levels.len(),
                    self.world.level_id()
                );
            }
            Err(err) => {
                log::error!(
                    "Level switch to {} failed: {err}",
                    self.levels[next].display()
                );
            }
        }
    }

    fn refresh_title(&mut self) {
        let title = format!("{} | {}", self.config.title, self.world.status_line());
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }
}

struct App {
    config: GameConfig,
    asset_root: PathBuf,
    levels: Vec<PathBuf>,
    state: Option<GameState>,
}

impl App {
    fn new(config: GameConfig, asset_root: PathBuf, levels: Vec<PathBuf>) -> Self {
        Self {
            config,
            asset_root,
            levels,
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window =
            match ow_platform::window::create_window(event_loop, &self.config.platform_config()) {
                Ok(window) => window,
                Err(err) => {
                    log::error!("{err}");
                    event_loop.exit();
                    return;
                }
            };
        match GameState::new(
            window,
            self.config.clone(),
            self.asset_root.clone(),
            self.levels.clone(),
        ) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Startup failed: {err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Focused(false) => {
                state.input.release_all();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(game_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(game_key),
                            ElementState::Released => state.input.key_up(game_key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                state.time.begin_frame();

                // Command keys and reloads run once per frame, between steps.
                if state.input.is_just_pressed(Key::Escape) {
                    event_loop.exit();
                    return;
                }
                if state.input.is_just_pressed(Key::F3) {
                    state.config.debug = !state.config.debug;
                    log::info!(
                        "Debug snapshots: {}",
                        if state.config.debug { "ON" } else { "OFF" }
                    );
                }
                if state.input.is_just_pressed(Key::N) {
                    state.next_level();
                } else if state.input.is_just_pressed(Key::R) {
                    state.reload_level("manual trigger (R)");
                } else if state.watcher.should_reload() {
                    state.reload_level("file watcher");
                }

                let dt = state.time.fixed_dt as f32;
                while state.time.should_step() {
                    let snapshot = state.config.bindings.snapshot(&state.input);
                    let report = state.world.step(&snapshot, dt);
                    if state.config.debug && report.frame % DEBUG_SNAPSHOT_INTERVAL == 0 {
                        log_debug_snapshot(&state.world, &report, state.time.smoothed_fps);
                    }
                }
                state.input.end_frame();

                if state.time.steps_this_frame > 0 {
                    state.refresh_title();
                }
            }

            _ => {}
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyN => Some(Key::N),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

fn run_headless(
    replay_path: &Path,
    level_path: &Path,
    config: &GameConfig,
    asset_root: &Path,
) -> Result<(), String> {
    let replay = load_replay_from_path(replay_path)?;
    let mut world = load_world(level_path, config, asset_root)?;
    log::info!(
        "Replaying {} ({} frames at {:.4}s) on {}",
        replay_path.display(),
        replay.frames.len(),
        replay.fixed_dt,
        world.level_id()
    );
    let summary = run_replay(&mut world, &replay);
    log::info!(
        "Replay done at frame {}: {} steps, player at ({:.2}, {:.2}) vel ({:.2}, {:.2}) {}, \
         {} defeated, {} resets, {} enemies active",
        world.frame(),
        summary.steps,
        summary.position.x,
        summary.position.y,
        summary.velocity.x,
        summary.velocity.y,
        if summary.airborne { "airborne" } else { "grounded" },
        summary.enemies_defeated,
        summary.player_resets,
        summary.active_enemies
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    log::info!("Overworld starting...");

    let config = match load_config_or_default(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };
    let levels: Vec<PathBuf> = if cli.levels.is_empty() {
        DEFAULT_LEVELS.iter().map(PathBuf::from).collect()
    } else {
        cli.levels.clone()
    };

    if let Some(replay_path) = &cli.replay {
        if let Err(err) = run_headless(replay_path, &levels[0], &config, &cli.assets) {
            log::error!("Replay failed: {err}");
            std::process::exit(1);
        }
        return;
    }

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, cli.assets, levels);
    event_loop.run_app(&mut app).expect("Event loop error");
}
