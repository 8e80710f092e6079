use std::path::{Path, PathBuf};

use rc_protocol::MotorChannel;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ControlError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub input: InputConfig,
    /// Where the terminal UI writes its log. Defaults to the user cache dir.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_drive_channel")]
    pub drive: MotorChannel,
    #[serde(default = "default_steering_channel")]
    pub steering: MotorChannel,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            drive: default_drive_channel(),
            steering: default_steering_channel(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Terminals without key release reporting: a key counts as released
    /// once it has not repeated for this long.
    #[serde(default = "default_release_timeout_ms")]
    pub release_timeout_ms: u64,
    /// Same, for the gap between a press and its first auto-repeat. Must
    /// outlast the keyboard's repeat delay (660 ms on a stock X server).
    #[serde(default = "default_first_repeat_timeout_ms")]
    pub first_repeat_timeout_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            release_timeout_ms: default_release_timeout_ms(),
            first_repeat_timeout_ms: default_first_repeat_timeout_ms(),
        }
    }
}

fn default_port() -> String {
    if cfg!(windows) {
        "COM10".to_string()
    } else {
        "/dev/ttyUSB0".to_string()
    }
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_write_timeout_ms() -> u64 {
    500
}

fn default_drive_channel() -> MotorChannel {
    MotorChannel::DRIVE
}

fn default_steering_channel() -> MotorChannel {
    MotorChannel::STEERING
}

fn default_release_timeout_ms() -> u64 {
    600
}

fn default_first_repeat_timeout_ms() -> u64 {
    1000
}

impl ControllerConfig {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing file at the default location yields the defaults; an explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ControlError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ControlError> {
        let text = std::fs::read_to_string(path).map_err(|e| ControlError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::parse(&text).map_err(|message| ControlError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("rc-car").join("controller.toml"))
}

pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|base| base.join("rc-car").join("controller.log"))
}
