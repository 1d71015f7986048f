//! GPIO commands implementation

use rft4222_core::prelude::*;
use rft4222_core::{Direction, Driver, Error, Gpio, PortId, Result};

use crate::cli::TargetArgs;
use crate::commands::open_target;

fn open_gpio<'a>(
    lib: &'a dyn Driver,
    target: &TargetArgs,
    dirs: [Direction; 4],
) -> Result<Gpio<'a>> {
    let stream = open_target(lib, target)?
        .into_gpio_stream()
        .map_err(|handle| {
            Error::InvalidArgs(format!(
                "interface is a {}, GPIO needs mode 0 interface B or mode 1 interface D",
                handle.tag()
            ))
        })?;
    Ok(stream.init_gpio(dirs)?)
}

/// Read one pin with all pins configured as inputs
pub fn run_gpio_read(lib: &dyn Driver, target: &TargetArgs, port: u8) -> Result<()> {
    let port = PortId::try_from(port)?;
    let gpio = open_gpio(lib, target, [Direction::Input; 4])?;
    let level = gpio.read(port)?;
    println!("GPIO{}: {}", port.index(), u8::from(level));
    gpio.close()
}

/// Drive one pin; the other pins stay inputs
pub fn run_gpio_write(lib: &dyn Driver, target: &TargetArgs, port: u8, value: u8) -> Result<()> {
    let port = PortId::try_from(port)?;
    let mut dirs = [Direction::Input; 4];
    dirs[port.index()] = Direction::Output;

    let gpio = open_gpio(lib, target, dirs)?;
    gpio.write(port, value != 0)?;
    log::info!("GPIO{} set to {}", port.index(), value);
    gpio.close()
}
