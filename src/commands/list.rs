//! List commands implementation

use rft4222_core::{get_device_info_list, lookup, DeviceFlags, Driver, Result};

use crate::backends;

/// List all backends compiled into this binary
pub fn list_backends() {
    let backends = backends::available_backends();
    if backends.is_empty() {
        println!("No backends available (recompile with backend features enabled)");
        return;
    }

    println!("Available backends:");
    println!();
    for b in &backends {
        let aliases = if b.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", b.aliases.join(", "))
        };
        println!("  {:8} - {}{}", b.name, b.description, aliases);
    }
}

/// Enumerate interfaces and show how each one would be opened
pub fn list_devices(lib: &dyn Driver) -> Result<()> {
    let devices = get_device_info_list(lib)?;
    if devices.is_empty() {
        println!("No FT4222H interfaces found");
        return Ok(());
    }

    println!(
        "{:<4} {:<10} {:<12} {:<10} {:>8}  Opens as",
        "#", "Desc", "Serial", "Type", "Location"
    );
    println!("{}", "-".repeat(72));

    for dev in &devices {
        let resolution = match lookup(&dev.description, dev.device_type) {
            Some(res) => res.to_string(),
            None => "unsupported".to_string(),
        };
        let open = if dev.flags.contains(DeviceFlags::OPEN) {
            " [open]"
        } else {
            ""
        };
        println!(
            "{:<4} {:<10} {:<12} {:<10} {:>8}  {}{}",
            dev.index,
            dev.description,
            dev.serial_number,
            dev.device_type.to_string(),
            format!("0x{:x}", dev.location_id),
            resolution,
            open
        );
    }

    Ok(())
}
