//! Application settings and configuration management

use crate::scheduler::BackpressurePolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Character whose speech is played; packets to/from other ids are ignored
    #[serde(default = "default_character_id")]
    pub character_id: String,
    /// Tick driver cadence in milliseconds
    #[serde(default = "default_period_ms")]
    pub tick_period_ms: u64,
    /// Queue poll cadence in milliseconds
    #[serde(default = "default_period_ms")]
    pub poll_period_ms: u64,
    /// ALSA device to use for audio playback
    #[serde(default = "default_alsa_device")]
    pub alsa_device: String,
    /// Maximum queued chunks; unbounded when absent
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    /// What a full queue does with new chunks
    #[serde(default)]
    pub backpressure: BackpressurePolicy,
    #[serde(default = "default_command_buffer_size")]
    pub command_buffer_size: usize,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_character_id() -> String {
    "agent".to_string()
}

fn default_period_ms() -> u64 {
    100
}

fn default_alsa_device() -> String {
    "default".to_string()
}

fn default_command_buffer_size() -> usize {
    32
}

fn default_event_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error types for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    ParseError(String),
    ValidationError(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(s) => write!(f, "Parse error: {}", s),
            ConfigError::ValidationError(s) => write!(f, "Validation error: {}", s),
        }
    }
}

impl Error for ConfigError {}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            character_id: default_character_id(),
            tick_period_ms: default_period_ms(),
            poll_period_ms: default_period_ms(),
            alsa_device: default_alsa_device(),
            queue_capacity: None,
            backpressure: BackpressurePolicy::default(),
            command_buffer_size: default_command_buffer_size(),
            event_capacity: default_event_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("r-voiceline").join("config.json")
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.character_id.trim().is_empty() {
            return Err(ConfigError::ValidationError("Character ID cannot be empty".to_string()));
        }
        if self.tick_period_ms == 0 || self.poll_period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Tick and poll periods must be greater than zero".to_string(),
            ));
        }
        if self.queue_capacity == Some(0) {
            return Err(ConfigError::ValidationError("Queue capacity must be greater than zero".to_string()));
        }
        if self.command_buffer_size == 0 || self.event_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "Command buffer and event capacity must be greater than zero".to_string(),
            ));
        }
        if self.alsa_device.is_empty() {
            return Err(ConfigError::ValidationError("ALSA device cannot be empty".to_string()));
        }

        Ok(())
    }
}
