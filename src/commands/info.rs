//! Info command implementation

use rft4222_core::{Driver, Result};

use crate::cli::TargetArgs;
use crate::commands::open_target;

/// Open an interface and print what the chip reports about itself
pub fn run_info(lib: &dyn Driver, target: &TargetArgs) -> Result<()> {
    let handle = open_target(lib, target)?;

    {
        let common = handle.common();
        let info = common.get_device_info()?;
        println!("Interface:   {}", info.description);
        println!("Serial:      {}", info.serial_number);
        println!("Type:        {}", info.device_type);
        println!("USB ID:      {:04x}:{:04x}", info.id >> 16, info.id & 0xFFFF);
        println!("Opened as:   {}", handle.tag());
        println!("Versions:    {}", common.get_version()?);
        println!("Clock:       {}", common.get_clock()?);

        // Not every backend can answer these
        match common.get_driver_version() {
            Ok(v) => println!("Driver:      {}", v),
            Err(e) => log::debug!("Driver version unavailable: {}", e),
        }
        match common.get_max_transfer_size() {
            Ok(size) => println!("Max xfer:    {} bytes", size),
            Err(e) => log::debug!("Max transfer size unavailable: {}", e),
        }
    }

    handle.close()
}
