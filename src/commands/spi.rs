//! SPI transfer command implementation
//!
//! SPI master is available on data stream interfaces and on the dedicated
//! SPI master interfaces of modes 1 and 2. The command accepts either.

use rft4222_core::prelude::*;
use rft4222_core::{
    ClkDiv, DataStream, Driver, Error, InitResult, IoMode, Result, SpiMasterConfig,
    SpiMasterMulti, SpiMasterSingle, SpiMasterStream, SsoMap,
};

use crate::cli::TargetArgs;
use crate::commands::{format_hex, open_target};

/// Settings of one `spi transfer` invocation
#[derive(Debug, Clone)]
pub struct SpiTransferArgs {
    pub data: Vec<u8>,
    pub read: usize,
    pub single: Option<Vec<u8>>,
    pub div: u32,
    pub io: String,
    pub mode: u8,
    pub cs: u8,
}

/// Stream handles that can become an SPI master
trait SpiMasterSource<'a>: StreamHandle<'a> {
    fn into_single(self, config: SpiMasterConfig) -> InitResult<SpiMasterSingle<'a, Self>, Self>;
    fn into_multi(
        self,
        io: IoMode,
        config: SpiMasterConfig,
    ) -> InitResult<SpiMasterMulti<'a, Self>, Self>;
}

impl<'a> SpiMasterSource<'a> for DataStream<'a> {
    fn into_single(self, config: SpiMasterConfig) -> InitResult<SpiMasterSingle<'a, Self>, Self> {
        self.init_single_spi_master(config)
    }

    fn into_multi(
        self,
        io: IoMode,
        config: SpiMasterConfig,
    ) -> InitResult<SpiMasterMulti<'a, Self>, Self> {
        match io {
            IoMode::Quad => self.init_quad_spi_master(config),
            _ => self.init_dual_spi_master(config),
        }
    }
}

impl<'a> SpiMasterSource<'a> for SpiMasterStream<'a> {
    fn into_single(self, config: SpiMasterConfig) -> InitResult<SpiMasterSingle<'a, Self>, Self> {
        self.init_single_spi_master(config)
    }

    fn into_multi(
        self,
        io: IoMode,
        config: SpiMasterConfig,
    ) -> InitResult<SpiMasterMulti<'a, Self>, Self> {
        match io {
            IoMode::Quad => self.init_quad_spi_master(config),
            _ => self.init_dual_spi_master(config),
        }
    }
}

fn build_config(args: &SpiTransferArgs) -> Result<SpiMasterConfig> {
    let clk_div = ClkDiv::from_divisor(args.div).ok_or_else(|| {
        Error::InvalidArgs(format!(
            "clock divisor {} is not a power of two in 2..=512",
            args.div
        ))
    })?;
    let sso_map = SsoMap::from_bits(1 << args.cs)
        .ok_or_else(|| Error::InvalidArgs(format!("chip select {} out of range", args.cs)))?;
    Ok(SpiMasterConfig::new()
        .with_clk_div(clk_div)
        .with_mode(args.mode)?
        .with_sso_map(sso_map))
}

fn transfer<'a, S: SpiMasterSource<'a>>(
    stream: S,
    io: IoMode,
    config: SpiMasterConfig,
    args: &SpiTransferArgs,
) -> Result<Vec<u8>> {
    match io {
        IoMode::Single => {
            if args.single.is_some() {
                return Err(Error::InvalidArgs(
                    "--single only applies to dual and quad transfers".into(),
                ));
            }
            let spi = stream.into_single(config)?;
            let miso = if args.read == 0 {
                // Full duplex: show what came back while sending
                spi.single_read_write(&args.data, true)?
            } else {
                if !args.data.is_empty() {
                    spi.single_write(&args.data, false)?;
                }
                spi.single_read(args.read, true)?
            };
            spi.close()?;
            Ok(miso)
        }
        IoMode::Dual | IoMode::Quad => {
            let spi = stream.into_multi(io, config)?;
            let single = args.single.as_deref().unwrap_or_default();
            let miso = spi.multi_read_write(single, &args.data, args.read)?;
            spi.close()?;
            Ok(miso)
        }
    }
}

/// Run one chip-select framed SPI transfer and print the bytes read
pub fn run_spi_transfer(lib: &dyn Driver, target: &TargetArgs, args: &SpiTransferArgs) -> Result<()> {
    let io = IoMode::parse(&args.io).ok_or_else(|| {
        Error::InvalidArgs(format!(
            "unknown I/O mode '{}' (expected single, dual or quad)",
            args.io
        ))
    })?;
    let config = build_config(args)?;
    log::debug!("SPI config: {:?}", config);

    let handle = open_target(lib, target)?;
    let miso = match handle.into_data_stream() {
        Ok(stream) => transfer(stream, io, config, args)?,
        Err(handle) => match handle.into_spi_master_stream() {
            Ok(stream) => transfer(stream, io, config, args)?,
            Err(handle) => {
                return Err(Error::InvalidArgs(format!(
                    "interface is a {}, which cannot act as SPI master",
                    handle.tag()
                )))
            }
        },
    };

    println!("{}", format_hex(&miso));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SpiTransferArgs {
        SpiTransferArgs {
            data: vec![0x9f],
            read: 3,
            single: None,
            div: 16,
            io: "single".into(),
            mode: 0,
            cs: 1,
        }
    }

    #[test]
    fn config_from_args() {
        let config = build_config(&args()).unwrap();
        assert_eq!(config.clk_div, ClkDiv::Div16);
        assert_eq!(config.sso_map, SsoMap::SS_1);
    }

    #[test]
    fn bad_divisor_is_rejected() {
        let mut a = args();
        a.div = 3;
        assert!(matches!(build_config(&a), Err(Error::InvalidArgs(_))));
        a.div = 16;
        a.mode = 4;
        assert!(matches!(build_config(&a), Err(Error::InvalidArgs(_))));
    }
}
