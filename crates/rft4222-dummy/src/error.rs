//! Error types for simulator configuration

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read simulator config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse simulator config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown preset '{0}' (expected mode0, mode1, mode2 or mode3)")]
    UnknownPreset(String),

    #[error("Unknown device type '{0}'")]
    UnknownDeviceType(String),

    #[error("Unsupported system clock '{0}' (expected 24, 48, 60 or 80)")]
    UnknownClock(String),

    #[error("Config defines no devices")]
    NoDevices,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
