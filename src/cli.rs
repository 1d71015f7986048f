//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand};

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Byte string given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

/// Parse a byte string such as "9f0001", "9f 00 01" or "0x9f,0x00"
fn parse_hex_bytes(s: &str) -> Result<HexBytes, String> {
    let mut digits = String::new();
    for token in s.split(|c: char| c.is_whitespace() || c == ',' || c == ':') {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if token.len() % 2 != 0 {
            // "0x1" style single nibble
            digits.push('0');
        }
        digits.push_str(token);
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Invalid hex bytes: '{}'", s));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()
        .map(HexBytes)
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Native driver to use [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "rft4222")]
#[command(author, version, about = "FT4222H USB bridge tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which interface to open; the first one if nothing is given
#[derive(clap::Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct TargetArgs {
    /// Device list index
    #[arg(long)]
    pub index: Option<i64>,

    /// Interface serial number (e.g. "FT1234A")
    #[arg(long)]
    pub serial: Option<String>,

    /// Interface description (e.g. "FT4222 A")
    #[arg(long)]
    pub description: Option<String>,

    /// USB location ID (hex or decimal)
    #[arg(long, value_parser = parse_hex_u32)]
    pub location: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List compiled-in backends
    ListBackends,

    /// Enumerate FT4222H interfaces
    Devices {
        #[arg(short, long, help = backend_help())]
        backend: String,
    },

    /// Open an interface and show its mode, chip version and clock
    Info {
        #[arg(short, long, help = backend_help())]
        backend: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// GPIO access (mode 0 interface B, mode 1 interface D)
    #[command(subcommand)]
    Gpio(GpioCommands),

    /// SPI master transfers
    #[command(subcommand)]
    Spi(SpiCommands),

    /// I2C master transfers
    #[command(subcommand)]
    I2c(I2cCommands),
}

#[derive(Subcommand)]
pub enum GpioCommands {
    /// Read one pin
    Read {
        #[arg(short, long, help = backend_help())]
        backend: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Pin number (0-3)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=3))]
        port: u8,
    },

    /// Drive one pin
    Write {
        #[arg(short, long, help = backend_help())]
        backend: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Pin number (0-3)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=3))]
        port: u8,

        /// Level to drive (0 or 1)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        value: u8,
    },
}

#[derive(Subcommand)]
pub enum SpiCommands {
    /// Clock bytes out and read the answer
    Transfer {
        #[arg(short, long, help = backend_help())]
        backend: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Bytes to send (hex, e.g. "9f" or "03 00 10 00")
        #[arg(value_parser = parse_hex_bytes)]
        data: HexBytes,

        /// Bytes to read after the data has been sent
        #[arg(short, long, default_value_t = 0)]
        read: usize,

        /// Bytes sent on a single line before the multi-line phase (dual/quad only)
        #[arg(long, value_parser = parse_hex_bytes)]
        single: Option<HexBytes>,

        /// System clock divisor (2-512, power of two)
        #[arg(long, default_value_t = 16)]
        div: u32,

        /// I/O mode: single, dual or quad
        #[arg(long, default_value = "single")]
        io: String,

        /// SPI mode (0-3)
        #[arg(long, default_value_t = 0)]
        mode: u8,

        /// Chip select (0-3)
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
        cs: u8,
    },
}

#[derive(Subcommand)]
pub enum I2cCommands {
    /// Read bytes from a target
    Read {
        #[arg(short, long, help = backend_help())]
        backend: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Target address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Number of bytes to read
        #[arg(short, long)]
        len: usize,

        /// Bus speed in kbps (60-3400)
        #[arg(long, default_value_t = 100)]
        kbps: u32,
    },

    /// Write bytes to a target
    Write {
        #[arg(short, long, help = backend_help())]
        backend: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Target address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Bytes to write (hex)
        #[arg(value_parser = parse_hex_bytes)]
        data: HexBytes,

        /// Bus speed in kbps (60-3400)
        #[arg(long, default_value_t = 100)]
        kbps: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("9f").unwrap().0, vec![0x9F]);
        assert_eq!(parse_hex_bytes("03 00 10 00").unwrap().0, vec![3, 0, 0x10, 0]);
        assert_eq!(parse_hex_bytes("0x9f,0x1").unwrap().0, vec![0x9F, 0x01]);
        assert_eq!(
            parse_hex_bytes("deadBEEF").unwrap().0,
            vec![0xDE, 0xAD, 0xBE, 0xEF]
        );
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x50").unwrap(), 0x50);
        assert_eq!(parse_hex_u32("80").unwrap(), 80);
        assert!(parse_hex_u32("0xg").is_err());
    }

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn target_options_are_exclusive() {
        let res = Cli::try_parse_from([
            "rft4222", "info", "-b", "dummy", "--index", "0", "--serial", "X",
        ]);
        assert!(res.is_err());
    }
}
