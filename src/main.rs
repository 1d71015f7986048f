//! rft4222 - Command line access to FT4222H USB bridges
//!
//! Opens one interface of an FT4222H through a selectable backend, resolves
//! which personality the interface has (data stream, GPIO or SPI master)
//! and runs a single GPIO, SPI or I2C operation on it.
//!
//! Backends are compiled in through cargo features:
//! - **dummy** - simulated chip, configurable from a TOML file
//! - **usb** - vendor requests straight over USB via nusb
//! - **d2xx** - FTDI's libftd2xx/libft4222 shared libraries

mod backends;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, GpioCommands, I2cCommands, SpiCommands};
use commands::SpiTransferArgs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::ListBackends => {
            commands::list_backends();
        }
        Commands::Devices { backend } => {
            let lib = backends::open_backend(&backend)?;
            commands::list_devices(&*lib)?;
        }
        Commands::Info { backend, target } => {
            let lib = backends::open_backend(&backend)?;
            commands::run_info(&*lib, &target)?;
        }
        Commands::Gpio(cmd) => match cmd {
            GpioCommands::Read {
                backend,
                target,
                port,
            } => {
                let lib = backends::open_backend(&backend)?;
                commands::run_gpio_read(&*lib, &target, port)?;
            }
            GpioCommands::Write {
                backend,
                target,
                port,
                value,
            } => {
                let lib = backends::open_backend(&backend)?;
                commands::run_gpio_write(&*lib, &target, port, value)?;
            }
        },
        Commands::Spi(cmd) => match cmd {
            SpiCommands::Transfer {
                backend,
                target,
                data,
                read,
                single,
                div,
                io,
                mode,
                cs,
            } => {
                let lib = backends::open_backend(&backend)?;
                let args = SpiTransferArgs {
                    data: data.0,
                    read,
                    single: single.map(|s| s.0),
                    div,
                    io,
                    mode,
                    cs,
                };
                commands::run_spi_transfer(&*lib, &target, &args)?;
            }
        },
        Commands::I2c(cmd) => match cmd {
            I2cCommands::Read {
                backend,
                target,
                addr,
                len,
                kbps,
            } => {
                let lib = backends::open_backend(&backend)?;
                commands::run_i2c_read(&*lib, &target, addr, len, kbps)?;
            }
            I2cCommands::Write {
                backend,
                target,
                addr,
                data,
                kbps,
            } => {
                let lib = backends::open_backend(&backend)?;
                commands::run_i2c_write(&*lib, &target, addr, &data.0, kbps)?;
            }
        },
    }

    Ok(())
}
