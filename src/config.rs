//! Versioned JSON configuration.
//!
//! Holds tunable thresholds, timings and key assignments. Every section and
//! field falls back to its default, so hand-edited or older files load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::interaction::Key;
use crate::keybindings::{KeyBindings, MAX_CLASS_HOTKEYS};
use crate::tools::AnnotationTool;

/// Format version written by this build. Files with a higher version are refused.
pub const CONFIG_VERSION: u32 = 1;

const CONFIG_DIR: &str = "annoscope";
const CONFIG_FILE: &str = "annoscope-config.json";

// ============================================================================
// Sections
// ============================================================================

/// Verbosity for the replay binary's logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        self.into()
    }
}

/// Tunable thresholds and timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub log_level: LogLevel,
    /// Handle and vertex hit radius, view pixels
    pub handle_radius_px: f32,
    /// Polygon closing radius around the first vertex, view pixels
    pub close_threshold_px: f32,
    /// Arrow-key nudge, image pixels
    pub nudge_step: f32,
    /// Arrow-key nudge with shift, image pixels
    pub nudge_step_large: f32,
    /// Undo depth
    pub history_size: usize,
    pub heartbeat_interval_secs: u64,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Multiplicative zoom step
    pub zoom_factor: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            handle_radius_px: constants::HANDLE_HIT_RADIUS,
            close_threshold_px: constants::POLYGON_CLOSE_THRESHOLD,
            nudge_step: constants::NUDGE_STEP,
            nudge_step_large: constants::NUDGE_STEP_LARGE,
            history_size: constants::UNDO_HISTORY_SIZE,
            heartbeat_interval_secs: constants::HEARTBEAT_INTERVAL.as_secs(),
            zoom_min: constants::zoom::MIN,
            zoom_max: constants::zoom::MAX,
            zoom_factor: constants::zoom::FACTOR,
        }
    }
}

impl Preferences {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// Stored key assignments. Tools missing from the map keep their default key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindingsConfig {
    pub tools: HashMap<AnnotationTool, Key>,
    /// Slot `i` picks the `i`-th class of the task
    pub class_hotkeys: Vec<Option<Key>>,
}

impl Default for KeyBindingsConfig {
    fn default() -> Self {
        Self::from(&KeyBindings::default())
    }
}

impl From<&KeyBindings> for KeyBindingsConfig {
    fn from(bindings: &KeyBindings) -> Self {
        Self {
            tools: AnnotationTool::all()
                .iter()
                .map(|tool| (*tool, bindings.key_for_tool(*tool)))
                .collect(),
            class_hotkeys: bindings.class_hotkeys.to_vec(),
        }
    }
}

impl KeyBindingsConfig {
    /// Build runtime bindings. Extra class slots are ignored and missing ones
    /// stay unassigned.
    pub fn to_keybindings(&self) -> KeyBindings {
        let mut bindings = KeyBindings::default();
        for (tool, key) in &self.tools {
            bindings.set_tool_key(*tool, *key);
        }
        for index in 0..MAX_CLASS_HOTKEYS {
            bindings.set_class_key(index, self.class_hotkeys.get(index).copied().flatten());
        }
        bindings
    }
}

// ============================================================================
// Engine Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub version: u32,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub keybindings: KeyBindingsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            keybindings: KeyBindingsConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a config file body, refusing versions this build does not know.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        match config.version {
            v if v > CONFIG_VERSION => Err(ConfigError::VersionTooNew {
                file_version: v,
                supported_version: CONFIG_VERSION,
            }),
            _ => Ok(config),
        }
    }

    pub fn default_filename() -> &'static str {
        CONFIG_FILE
    }

    /// `<config dir>/annoscope/annoscope-config.json`, or under `~/.config`
    /// when the platform reports no config directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .map(|base| base.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Load the user's config file. A missing or unreadable file yields `None`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.is_file() {
            log::debug!("📝 No config at {}", path.display());
            return None;
        }
        Self::load(&path)
            .inspect(|_| log::info!("📝 Loaded config from {}", path.display()))
            .inspect_err(|e| log::warn!("Ignoring config {}: {}", path.display(), e))
            .ok()
    }

    /// Write to `path`, creating its directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("📝 Saved config to {}", path.display());
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save(&path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Config version {file_version} is newer than {supported_version}")]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("Config I/O failed: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No config directory on this platform")]
    NoConfigDir,
}
