use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::User;
use crate::feed::{self, LoopMode, DEFAULT_CAPACITY};

const DEFAULT_ENV_PREFIX: &str = "LIVE_TUI";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub stack: StackConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DataConfig {
    /// Stream data file; the bundled sample is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityConfig {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub avatar: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            avatar: String::new(),
        }
    }
}

impl IdentityConfig {
    pub fn user(&self) -> User {
        User {
            username: self.username.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

fn default_username() -> String {
    "guest".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StackConfig {
    #[serde(default = "default_stack_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default, with = "humantime_serde")]
    pub exit_animation: Duration,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_stack_loop_mode")]
    pub loop_mode: LoopMode,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            interval: default_stack_interval(),
            exit_animation: Duration::ZERO,
            capacity: default_capacity(),
            loop_mode: default_stack_loop_mode(),
        }
    }
}

impl StackConfig {
    pub fn settings(&self) -> Result<feed::Settings, feed::SettingsError> {
        feed::Settings {
            interval: self.interval,
            exit_animation: self.exit_animation,
            capacity: self.capacity,
            loop_mode: self.loop_mode,
        }
        .validate()
    }
}

fn default_stack_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_stack_loop_mode() -> LoopMode {
    LoopMode::Finite
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlayConfig {
    #[serde(default = "default_overlay_enabled")]
    pub enabled: bool,
    #[serde(default = "default_overlay_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default = "default_overlay_exit_animation", with = "humantime_serde")]
    pub exit_animation: Duration,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub loop_mode: LoopMode,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: default_overlay_enabled(),
            interval: default_overlay_interval(),
            exit_animation: default_overlay_exit_animation(),
            capacity: default_capacity(),
            loop_mode: LoopMode::Cyclic,
        }
    }
}

impl OverlayConfig {
    pub fn settings(&self) -> Result<feed::Settings, feed::SettingsError> {
        feed::Settings {
            interval: self.interval,
            exit_animation: self.exit_animation,
            capacity: self.capacity,
            loop_mode: self.loop_mode,
        }
        .validate()
    }
}

fn default_overlay_enabled() -> bool {
    true
}

fn default_overlay_interval() -> Duration {
    Duration::from_millis(1500)
}

fn default_overlay_exit_animation() -> Duration {
    Duration::from_millis(2500)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("live-tui").join("live-tui.log"))
}

fn default_log_filter() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

/// Defaults, then the config file, then `LIVE_TUI_*` environment variables.
/// An explicitly requested config file must exist; the default one may not.
pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        anyhow::ensure!(
            path.exists(),
            "config: file not found at {}",
            path.display()
        );
        cfg = read_config_file(path)?;
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            cfg = read_config_file(&default_path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

pub fn to_yaml(cfg: &Config) -> Result<String> {
    serde_yaml::to_string(cfg).context("config: failed to serialize config")
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            apply_env_value(cfg, &normalized, value);
        }
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "data.path" => {
            cfg.data.path = if value.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            }
        }
        "identity.username" => {
            if !value.trim().is_empty() {
                cfg.identity.username = value;
            }
        }
        "identity.avatar" => cfg.identity.avatar = value,
        "stack.interval" => set_duration(&mut cfg.stack.interval, &value),
        "stack.exit_animation" => set_duration(&mut cfg.stack.exit_animation, &value),
        "stack.capacity" => set_usize(&mut cfg.stack.capacity, &value),
        "stack.loop_mode" => set_loop_mode(&mut cfg.stack.loop_mode, &value),
        "overlay.enabled" => cfg.overlay.enabled = parse_bool(&value),
        "overlay.interval" => set_duration(&mut cfg.overlay.interval, &value),
        "overlay.exit_animation" => set_duration(&mut cfg.overlay.exit_animation, &value),
        "overlay.capacity" => set_usize(&mut cfg.overlay.capacity, &value),
        "overlay.loop_mode" => set_loop_mode(&mut cfg.overlay.loop_mode, &value),
        "logging.file" => {
            cfg.logging.file = if value.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            }
        }
        "logging.filter" => cfg.logging.filter = value,
        _ => {}
    }
}

fn set_duration(target: &mut Duration, value: &str) {
    if let Ok(duration) = humantime::parse_duration(value.trim()) {
        *target = duration;
    }
}

fn set_usize(target: &mut usize, value: &str) {
    if let Ok(parsed) = value.trim().parse::<usize>() {
        *target = parsed;
    }
}

fn set_loop_mode(target: &mut LoopMode, value: &str) {
    if let Some(mode) = LoopMode::from_key(value) {
        *target = mode;
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("live-tui").join("config.yaml"))
}
