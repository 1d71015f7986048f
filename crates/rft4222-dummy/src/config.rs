//! TOML description of a simulated setup
//!
//! Either pick a preset or list the interfaces explicitly:
//!
//! ```toml
//! chip_version = 0x42220400
//! clock = "80"
//!
//! [[device]]
//! description = "FT4222 D"
//! serial_number = "SIM0001D"
//! device_type = "4222H_1_2"
//! location_id = 0x14
//! accepts_gpio = false
//!
//! [[i2c_target]]
//! address = 0x50
//! size = 256
//! fill = 0xFF
//! ```

use std::fs;
use std::path::Path;

use rft4222_core::{ClockRate, DeviceType};
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::{SimDevice, SimDriver};

/// Parsed simulator configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// `mode0` to `mode3`; devices listed below are appended to it
    pub preset: Option<String>,
    #[serde(default, deserialize_with = "deserialize_hex_u32_opt")]
    pub chip_version: Option<u32>,
    /// System clock in MHz
    pub clock: Option<String>,
    #[serde(default)]
    pub fail_uninitialize: bool,
    #[serde(default)]
    pub device: Vec<DeviceEntry>,
    #[serde(default)]
    pub i2c_target: Vec<I2cTargetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceEntry {
    pub description: String,
    pub serial_number: String,
    pub device_type: String,
    #[serde(default, deserialize_with = "deserialize_hex_u32")]
    pub location_id: u32,
    #[serde(default)]
    pub accepts_gpio: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct I2cTargetEntry {
    #[serde(deserialize_with = "deserialize_hex_u32")]
    pub address: u32,
    #[serde(deserialize_with = "deserialize_hex_u32")]
    pub size: u32,
    #[serde(default = "default_fill", deserialize_with = "deserialize_hex_u32")]
    pub fill: u32,
}

fn default_fill() -> u32 {
    0xFF
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HexOrInt {
    Int(u32),
    Str(String),
}

impl HexOrInt {
    fn into_u32<E: serde::de::Error>(self) -> std::result::Result<u32, E> {
        match self {
            HexOrInt::Int(n) => Ok(n),
            HexOrInt::Str(s) => parse_number(&s).map_err(E::custom),
        }
    }
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    HexOrInt::deserialize(deserializer)?.into_u32()
}

fn deserialize_hex_u32_opt<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<HexOrInt>::deserialize(deserializer)?
        .map(HexOrInt::into_u32)
        .transpose()
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

impl SimConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build the simulated driver
    pub fn build(self) -> Result<SimDriver> {
        let mut devices = match self.preset.as_deref() {
            Some(name) => SimDriver::preset_devices(name)
                .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?,
            None => Vec::new(),
        };

        for entry in self.device {
            let device_type = DeviceType::parse(&entry.device_type)
                .ok_or_else(|| ConfigError::UnknownDeviceType(entry.device_type.clone()))?;
            devices.push(
                SimDevice::new(entry.description, entry.serial_number, device_type)
                    .with_location(entry.location_id)
                    .with_gpio(entry.accepts_gpio),
            );
        }
        if devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }

        let mut driver = SimDriver::new(devices);
        if let Some(version) = self.chip_version {
            driver = driver.with_chip_version(version);
        }
        if let Some(clock) = self.clock {
            let rate = ClockRate::parse(&clock).ok_or(ConfigError::UnknownClock(clock))?;
            driver = driver.with_clock(rate);
        }
        for target in self.i2c_target {
            // Addresses wider than the bus are truncated like the chip would
            driver = driver.with_i2c_target(
                target.address as u16,
                vec![target.fill as u8; target.size as usize],
            );
        }
        driver.set_fail_uninitialize(self.fail_uninitialize);
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_explicit_devices() {
        let cfg = SimConfig::from_toml_str(
            r#"
            chip_version = "0x42220300"
            clock = "80"

            [[device]]
            description = "FT4222 D"
            serial_number = "X1D"
            device_type = "4222H_1_2"
            location_id = "0x24"
            accepts_gpio = true

            [[i2c_target]]
            address = 0x50
            size = 16
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chip_version, Some(0x4222_0300));
        assert_eq!(cfg.device[0].location_id, 0x24);
        assert_eq!(cfg.i2c_target[0].fill, 0xFF);

        let driver = cfg.build().unwrap();
        assert_eq!(driver.devices().len(), 1);
        assert!(driver.devices()[0].accepts_gpio);
    }

    #[test]
    fn preset_config() {
        let driver = SimConfig::from_toml_str("preset = \"mode2\"")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(driver.devices().len(), 4);
    }

    #[test]
    fn rejects_bad_values() {
        let cfg = SimConfig::from_toml_str("preset = \"mode7\"").unwrap();
        assert!(matches!(cfg.build(), Err(ConfigError::UnknownPreset(_))));
        assert!(matches!(
            SimConfig::default().build(),
            Err(ConfigError::NoDevices)
        ));
        assert!(SimConfig::from_toml_str("bogus = 1").is_err());
    }

    #[test]
    fn number_formats() {
        assert_eq!(parse_number("0x10").unwrap(), 16);
        assert_eq!(parse_number(" 42 ").unwrap(), 42);
        assert!(parse_number("0xZZ").is_err());
    }
}
