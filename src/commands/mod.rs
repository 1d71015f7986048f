//! CLI command implementations
//!
//! Every command opens one interface, walks it through the handle states it
//! needs and closes it again. Handles that are dropped on an error path
//! release the device on their own.

mod gpio;
mod i2c;
mod info;
mod list;
mod spi;

pub use gpio::{run_gpio_read, run_gpio_write};
pub use i2c::{run_i2c_read, run_i2c_write};
pub use info::run_info;
pub use list::{list_backends, list_devices};
pub use spi::{run_spi_transfer, SpiTransferArgs};

use rft4222_core::{
    open_by_description, open_by_idx, open_by_location, open_by_serial, Driver, Ft4222Handle,
    Result,
};

use crate::cli::TargetArgs;

/// Open the interface picked by `target`, defaulting to list index 0
pub fn open_target<'a>(lib: &'a dyn Driver, target: &TargetArgs) -> Result<Ft4222Handle<'a>> {
    let handle = if let Some(serial) = &target.serial {
        open_by_serial(lib, serial)?
    } else if let Some(description) = &target.description {
        open_by_description(lib, description)?
    } else if let Some(location) = target.location {
        open_by_location(lib, location)?
    } else {
        open_by_idx(lib, target.index.unwrap_or(0))?
    };
    log::info!("Opened {}", handle.tag());
    Ok(handle)
}

/// Format bytes as space separated hex
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[]), "");
        assert_eq!(format_hex(&[0x9f, 0x00, 0xef]), "9f 00 ef");
    }
}
