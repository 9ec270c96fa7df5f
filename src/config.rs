//! Config - nested sections per component, JSON on disk.
//!
//! Every field has a serde default so partial files (or none at all) load
//! cleanly. The `preferences` section is the user-tunable part; the rest
//! are timing constants that rarely change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::control::grammar::Grammar;
use crate::error::Result;

// ── Preferences ────────────────────────────────────────────

/// User-facing preferences, persisted between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_dwell_time_ms")]
    pub dwell_time_ms: f64,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f64,
    /// Whether tracking should be switched on at startup.
    #[serde(default)]
    pub tracking_enabled: bool,
    /// Whether voice commands should be switched on at startup.
    #[serde(default)]
    pub voice_enabled: bool,
    #[serde(default)]
    pub precision_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dwell_time_ms: default_dwell_time_ms(),
            sensitivity: default_sensitivity(),
            smoothing_factor: default_smoothing_factor(),
            tracking_enabled: false,
            voice_enabled: false,
            precision_mode: false,
        }
    }
}

// ── Component sections ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Distance from the top/bottom edge that counts as "near" (px).
    #[serde(default = "default_edge_threshold_px")]
    pub edge_threshold_px: f64,
    /// Scroll distance per tick at sensitivity 1.0 (px).
    #[serde(default = "default_step_px")]
    pub step_px: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            edge_threshold_px: default_edge_threshold_px(),
            step_px: default_step_px(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_record_ms")]
    pub record_ms: u64,
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            record_ms: default_record_ms(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Unmute after this long even if synthesis never reports finished.
    #[serde(default = "default_unmute_timeout_ms")]
    pub unmute_timeout_ms: u64,
    #[serde(default = "default_restart_base_ms")]
    pub restart_base_ms: u64,
    #[serde(default = "default_restart_max_ms")]
    pub restart_max_ms: u64,
    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            unmute_timeout_ms: default_unmute_timeout_ms(),
            restart_base_ms: default_restart_base_ms(),
            restart_max_ms: default_restart_max_ms(),
            max_restart_attempts: default_max_restart_attempts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Animation tick period (ms); 16 ≈ 60 Hz.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Status log period (s).
    #[serde(default = "default_status_interval_s")]
    pub status_interval_s: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            status_interval_s: default_status_interval_s(),
        }
    }
}

// ── Top-level config ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub grammar: Grammar,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferences: Preferences::default(),
            scroll: ScrollConfig::default(),
            calibration: CalibrationConfig::default(),
            voice: VoiceConfig::default(),
            runtime: RuntimeConfig::default(),
            grammar: Grammar::default(),
        }
    }
}

// ── Default value functions ────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_dwell_time_ms() -> f64 {
    1000.0
}

fn default_sensitivity() -> f64 {
    1.0
}

fn default_smoothing_factor() -> f64 {
    5.0
}

fn default_edge_threshold_px() -> f64 {
    100.0
}

fn default_step_px() -> f64 {
    10.0
}

fn default_settle_ms() -> u64 {
    800
}

fn default_record_ms() -> u64 {
    1200
}

fn default_sample_interval_ms() -> u64 {
    50
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_unmute_timeout_ms() -> u64 {
    3000
}

fn default_restart_base_ms() -> u64 {
    250
}

fn default_restart_max_ms() -> u64 {
    8000
}

fn default_max_restart_attempts() -> u32 {
    6
}

fn default_tick_ms() -> u64 {
    16
}

fn default_status_interval_s() -> u64 {
    5
}

// ── Load / save ────────────────────────────────────────────

/// Default config location: `$GAZEPILOT_CONFIG`, else
/// `$XDG_CONFIG_HOME/gazepilot/config.json`, else `~/.config/...`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("GAZEPILOT_CONFIG") {
        return PathBuf::from(path);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("gazepilot").join("config.json")
}

/// Load config from `path`. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path)?;
    let cfg: Config = serde_json::from_str(&contents)?;
    info!("Loaded config from {}", path.display());
    Ok(cfg)
}

/// Write config to `path` as pretty JSON, creating parent directories.
pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(cfg)?;
    std::fs::write(path, json)?;
    info!("Saved config to {}", path.display());
    Ok(())
}
