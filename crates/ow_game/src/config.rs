use ow_core::input::KeyBindings;
use ow_platform::window::PlatformConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "assets/config/game.json";

/// Largest fixed step accepted from config or replay files, equal to the
/// `TimeState` accumulator cap.
pub const MAX_FIXED_DT: f64 = 0.25;

/// Host and simulation settings. Every field has a default so a partial (or
/// missing) file still yields a playable setup.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub gravity_y: f32,
    pub debug: bool,
    pub fixed_dt: f64,
    pub bindings: KeyBindings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            title: "Overworld".to_string(),
            width: 1920,
            height: 1080,
            gravity_y: 500.0,
            debug: false,
            fixed_dt: 1.0 / 60.0,
            bindings: KeyBindings::default(),
        }
    }
}

impl GameConfig {
    pub fn platform_config(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            resizable: true,
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)
        .map_err(|e| format!("Config validation failed for {}: {e}", path.display()))?;
    Ok(config)
}

/// A missing file falls back to defaults; a present but broken file is an error.
pub fn load_config_or_default(path: &Path) -> Result<GameConfig, String> {
    if !path.exists() {
        log::warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(GameConfig::default());
    }
    load_config_from_path(path)
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    if config.width == 0 || config.height == 0 {
        return Err(format!(
            "window size must be non-zero (got {}x{})",
            config.width, config.height
        ));
    }
    if !(config.fixed_dt > 0.0 && config.fixed_dt <= MAX_FIXED_DT) {
        return Err(format!(
            "fixed_dt must be in (0, {MAX_FIXED_DT}] (got {})",
            config.fixed_dt
        ));
    }
    if !config.gravity_y.is_finite() {
        return Err("gravity_y must be finite".to_string());
    }
    config.bindings.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ow_core::input::Key;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "ow_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn shipped_config_parses() {
        let config: GameConfig =
            serde_json::from_str(include_str!("../../../assets/config/game.json"))
                .expect("shipped config should parse");
        validate_config(&config).expect("shipped config should validate");
        assert_eq!(config.gravity_y, 500.0);
        assert_eq!(config.bindings, KeyBindings::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let path = temp_file_path("partial");
        fs::write(&path, r#"{ "title": "Test", "debug": true }"#).expect("write config");

        let config = load_config_from_path(&path).expect("partial config should load");
        assert_eq!(config.title, "Test");
        assert!(config.debug);
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert_eq!(config.gravity_y, 500.0);
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < 1e-12);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn custom_bindings_parse() {
        let path = temp_file_path("bindings");
        fs::write(
            &path,
            r#"{ "bindings": { "up": "Up", "left": "Left", "down": "Down", "right": "Right" } }"#,
        )
        .expect("write config");

        let config = load_config_from_path(&path).expect("config should load");
        assert_eq!(config.bindings.up, Key::Up);
        assert_eq!(config.bindings.right, Key::Right);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn duplicate_bindings_are_rejected() {
        let path = temp_file_path("dup_bindings");
        fs::write(&path, r#"{ "bindings": { "up": "A" } }"#).expect("write config");

        let err = load_config_from_path(&path).expect_err("duplicate keys should fail");
        assert!(err.contains("distinct"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn zero_fixed_dt_is_rejected() {
        let path = temp_file_path("zero_dt");
        fs::write(&path, r#"{ "fixed_dt": 0.0 }"#).expect("write config");

        let err = load_config_from_path(&path).expect_err("zero dt should fail");
        assert!(err.contains("fixed_dt"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_config_uses_defaults() {
        let path = temp_file_path("missing");
        let _ = fs::remove_file(&path);
        let config = load_config_or_default(&path).expect("missing config falls back");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn platform_config_mirrors_window_fields() {
        let config = GameConfig {
            title: "Level".to_string(),
            width: 800,
            height: 600,
            ..GameConfig::default()
        };
        let platform = config.platform_config();
        assert_eq!(platform.title, "Level");
        assert_eq!(platform.width, 800);
        assert_eq!(platform.height, 600);
    }
}
