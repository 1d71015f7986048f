//! Backend registration and selection
//!
//! Backends are compiled in through cargo features. A backend is selected
//! on the command line as `name` or `name:key=value,...`.

use std::collections::HashMap;

use rft4222_core::Driver;
use thiserror::Error;

/// Information about a backend
pub struct BackendInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

/// Errors raised while selecting a backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidParam(String),

    #[error("Unknown backend '{name}' [available: {available}]")]
    Unknown { name: String, available: String },

    #[error("Unknown parameter '{key}' for backend '{backend}'")]
    UnknownParam { backend: &'static str, key: String },

    #[cfg(feature = "dummy")]
    #[error("Unknown simulator preset '{0}' (expected mode0, mode1, mode2 or mode3)")]
    UnknownPreset(String),

    #[cfg(feature = "dummy")]
    #[error(transparent)]
    Config(#[from] rft4222_dummy::ConfigError),
}

/// Get information about all backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &["sim"],
        description: "Simulated chip (preset=<mode0-3> or config=<file.toml>)",
    });

    #[cfg(feature = "usb")]
    backends.push(BackendInfo {
        name: "usb",
        aliases: &["nusb"],
        description: "Direct USB access through nusb (VID:0403 PID:601c)",
    });

    #[cfg(feature = "d2xx")]
    backends.push(BackendInfo {
        name: "d2xx",
        aliases: &["ftd2xx", "libft4222"],
        description: "FTDI vendor libraries (libftd2xx + libft4222)",
    });

    backends
}

/// Generate a short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let backends = available_backends();
    let names: Vec<&str> = backends.iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the primary backend name
pub fn find_backend(name: &str) -> Option<&'static str> {
    available_backends()
        .into_iter()
        .find(|b| b.name == name || b.aliases.contains(&name))
        .map(|b| b.name)
}

/// Parsed `name:key=value,...` backend string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendParams {
    pub name: String,
    pub params: HashMap<String, String>,
}

/// Parse a backend string such as `dummy:preset=mode1`
pub fn parse_backend_params(s: &str) -> Result<BackendParams, BackendError> {
    let (name, rest) = match s.split_once(':') {
        Some((name, rest)) => (name, Some(rest)),
        None => (s, None),
    };

    let mut params = HashMap::new();
    if let Some(rest) = rest {
        for part in rest.split(',').filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| BackendError::InvalidParam(part.to_string()))?;
            params.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        params,
    })
}

/// Instantiate the backend named by `backend`
pub fn open_backend(backend: &str) -> Result<Box<dyn Driver>, BackendError> {
    let params = parse_backend_params(backend)?;
    let name = find_backend(&params.name).ok_or_else(|| BackendError::Unknown {
        name: params.name.clone(),
        available: backend_names_short(),
    })?;
    log::debug!("Using backend '{}' with {:?}", name, params.params);

    match name {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params.params),
        #[cfg(feature = "usb")]
        "usb" => {
            reject_params("usb", &params.params)?;
            Ok(Box::new(rft4222_usb::UsbDriver::new()))
        }
        #[cfg(feature = "d2xx")]
        "d2xx" => {
            reject_params("d2xx", &params.params)?;
            Ok(Box::new(rft4222_d2xx::D2xxDriver::new()))
        }
        _ => Err(BackendError::Unknown {
            name: params.name,
            available: backend_names_short(),
        }),
    }
}

#[allow(dead_code)]
fn reject_params(
    backend: &'static str,
    params: &HashMap<String, String>,
) -> Result<(), BackendError> {
    match params.keys().next() {
        Some(key) => Err(BackendError::UnknownParam {
            backend,
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(params: &HashMap<String, String>) -> Result<Box<dyn Driver>, BackendError> {
    use rft4222_dummy::{SimConfig, SimDriver};

    if let Some(key) = params.keys().find(|k| *k != "config" && *k != "preset") {
        return Err(BackendError::UnknownParam {
            backend: "dummy",
            key: key.clone(),
        });
    }

    if let Some(path) = params.get("config") {
        log::info!("Loading simulator configuration from {}", path);
        let driver = SimConfig::from_toml_file(path)?.build()?;
        return Ok(Box::new(driver));
    }

    let preset = params.get("preset").map(String::as_str).unwrap_or("mode0");
    SimDriver::preset(preset)
        .map(|d| Box::new(d) as Box<dyn Driver>)
        .ok_or_else(|| BackendError::UnknownPreset(preset.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_params() {
        let p = parse_backend_params("dummy").unwrap();
        assert_eq!(p.name, "dummy");
        assert!(p.params.is_empty());

        let p = parse_backend_params("dummy:preset=mode1,config=sim.toml").unwrap();
        assert_eq!(p.name, "dummy");
        assert_eq!(p.params.get("preset").map(String::as_str), Some("mode1"));
        assert_eq!(p.params.get("config").map(String::as_str), Some("sim.toml"));

        assert!(matches!(
            parse_backend_params("dummy:preset"),
            Err(BackendError::InvalidParam(_))
        ));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            open_backend("nope"),
            Err(BackendError::Unknown { .. })
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn dummy_presets() {
        let lib = open_backend("sim:preset=mode1").unwrap();
        assert_eq!(rft4222_core::get_device_info_list(&*lib).unwrap().len(), 4);

        assert!(matches!(
            open_backend("dummy:preset=mode7"),
            Err(BackendError::UnknownPreset(_))
        ));
        assert!(matches!(
            open_backend("dummy:speed=1"),
            Err(BackendError::UnknownParam { .. })
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn demo_config_loads() {
        let config = rft4222_dummy::SimConfig::from_toml_str(include_str!("../demos/sim.toml"))
            .unwrap();
        let lib = config.build().unwrap();
        assert_eq!(lib.devices().len(), 2);
        assert_eq!(lib.i2c_memory(0x50).map(|m| m.len()), Some(256));
    }
}
