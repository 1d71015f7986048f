//! I2C commands implementation

use rft4222_core::prelude::*;
use rft4222_core::{Driver, Error, I2cMaster, Result};

use crate::cli::TargetArgs;
use crate::commands::{format_hex, open_target};

fn open_i2c<'a>(lib: &'a dyn Driver, target: &TargetArgs, kbps: u32) -> Result<I2cMaster<'a>> {
    let stream = open_target(lib, target)?
        .into_data_stream()
        .map_err(|handle| {
            Error::InvalidArgs(format!(
                "interface is a {}, I2C needs a data stream interface (mode 0 A or mode 3)",
                handle.tag()
            ))
        })?;
    Ok(stream.init_i2c_master(kbps)?)
}

pub fn run_i2c_read(
    lib: &dyn Driver,
    target: &TargetArgs,
    addr: u32,
    len: usize,
    kbps: u32,
) -> Result<()> {
    let i2c = open_i2c(lib, target, kbps)?;
    let data = i2c.read(addr, len)?;
    println!("{}", format_hex(&data));
    i2c.close()
}

pub fn run_i2c_write(
    lib: &dyn Driver,
    target: &TargetArgs,
    addr: u32,
    data: &[u8],
    kbps: u32,
) -> Result<()> {
    let i2c = open_i2c(lib, target, kbps)?;
    let written = i2c.write(addr, data)?;
    log::info!("Wrote {} of {} bytes to 0x{:02x}", written, data.len(), addr);
    i2c.close()
}
