//! Configuration management

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::adapters::receiver::VolumeScale;
use crate::protocol::DEFAULT_TIMEOUT;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub receiver: ReceiverConfig,
}

/// Host-supplied settings for one receiver.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Full-scale native volume of the firmware (50 or 100).
    #[serde(default)]
    pub volume_scale: VolumeScale,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub navigation: NavigationConfig,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            name: default_name(),
            poll_interval_secs: default_poll_interval_secs(),
            volume_scale: VolumeScale::default(),
            timeout_secs: default_timeout_secs(),
            navigation: NavigationConfig::default(),
        }
    }
}

impl ReceiverConfig {
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_name() -> String {
    "Yamaha R-N301".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Retry tuning for multi-step menu navigation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NavigationConfig {
    /// Extra List_Info queries while the menu reports `Busy`.
    #[serde(default = "default_busy_retries")]
    pub busy_retries: u32,

    #[serde(default = "default_busy_delay_ms")]
    pub busy_delay_ms: u64,

    /// Cursor Return commands sent before giving up on reaching layer 1.
    #[serde(default = "default_max_return_steps")]
    pub max_return_steps: u32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            busy_retries: default_busy_retries(),
            busy_delay_ms: default_busy_delay_ms(),
            max_return_steps: default_max_return_steps(),
        }
    }
}

impl NavigationConfig {
    pub fn busy_delay(&self) -> Duration {
        Duration::from_millis(self.busy_delay_ms)
    }
}

fn default_busy_retries() -> u32 {
    5
}

fn default_busy_delay_ms() -> u64 {
    250
}

fn default_max_return_steps() -> u32 {
    10
}

const APP_DIR_NAME: &str = "rn301-control";

/// Get config directory (XDG_CONFIG_HOME or platform default)
pub fn get_config_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("RN301_CONFIG_DIR") {
        return std::path::PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join("Library/Application Support")
                .join(APP_DIR_NAME);
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return std::path::PathBuf::from(xdg).join(APP_DIR_NAME);
        }
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join(".config")
                .join(APP_DIR_NAME);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return std::path::PathBuf::from(appdata).join(APP_DIR_NAME);
        }
    }

    // Fallback to current directory
    std::path::PathBuf::from(".")
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let mut builder = ::config::Config::builder()
        // Load from config file if it exists (config.toml, config.json, ...)
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // Override with environment variables (RN301_RECEIVER__HOST, RN301_RECEIVER__NAVIGATION__BUSY_RETRIES, ...)
        .add_source(
            ::config::Environment::with_prefix("RN301")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    // Shortcut: RN301_HOST beats every other source for the receiver address
    if let Ok(host) = std::env::var("RN301_HOST") {
        if !host.trim().is_empty() {
            builder = builder.set_override("receiver.host", host.trim())?;
        }
    }

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}
