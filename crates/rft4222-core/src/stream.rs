//! Stream-mode handles
//!
//! The FT4222H is strapped (DCNF1/DCNF0 pins) into one of four modes, each
//! exposing a fixed set of USB interfaces:
//!
//! | Interface | Mode 0      | Mode 1     | Mode 2     | Mode 3      |
//! |-----------|-------------|------------|------------|-------------|
//! | A         | Data stream | SPI master | SPI master | Data stream |
//! | B         | GPIO        | SPI master | SPI master | -           |
//! | C         | -           | SPI master | SPI master | -           |
//! | D         | -           | GPIO       | SPI master | -           |
//!
//! A stream handle owns one opened interface and offers only the `init_*`
//! transitions its wiring allows. Each `init_*` consumes the stream handle.
//! On success the native handle moves into the returned capability; on
//! failure the stream handle comes back inside a [`TransitionError`].

use std::fmt;

use crate::claim::{Claim, Owner, Role};
use crate::driver::{Driver, FtHandle};
use crate::error::{Error, NativeResult, Result, TransitionError};
use crate::gpio::{Direction, Gpio};
use crate::handle::CommonOps;
use crate::i2c::master::I2cMaster;
use crate::i2c::slave::I2cSlave;
use crate::spi::master::{IoMode, SpiMasterConfig, SpiMasterMulti, SpiMasterSingle};
use crate::spi::slave::{IoProtocol, SlaveProtocol, SpiSlaveProto, SpiSlaveRaw};

/// USB interface personality of a stream handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeTag {
    /// All serial protocols, no GPIO
    DataStream,
    /// GPIO only
    Gpio,
    /// SPI master only
    SpiMaster,
}

impl ModeTag {
    pub fn name(self) -> &'static str {
        match self {
            ModeTag::DataStream => "data stream",
            ModeTag::Gpio => "GPIO stream",
            ModeTag::SpiMaster => "SPI master stream",
        }
    }
}

impl fmt::Display for ModeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stream handle of a statically known mode
pub trait StreamHandle<'a>: CommonOps<'a> + Sized {
    const TAG: ModeTag;

    #[doc(hidden)]
    fn from_claim(claim: Claim<'a>) -> Self;

    /// Close the underlying device handle
    fn close(self) -> Result<()> {
        self.into_claim().close()
    }
}

/// Run a native init primitive and move the handle into a protocol claim
pub(crate) fn init_with<'a, S, C>(
    stream: S,
    name: &'static str,
    init: impl FnOnce(&dyn Driver, &FtHandle) -> NativeResult<()>,
    wrap: impl FnOnce(Claim<'a>) -> C,
) -> std::result::Result<C, TransitionError<S>>
where
    S: StreamHandle<'a>,
{
    match stream.claim().call(init) {
        Ok(()) => {
            log::debug!("Initialized {} on {}", name, S::TAG);
            Ok(wrap(stream.into_claim().transfer(Role::Protocol(name))))
        }
        Err(e) => {
            log::debug!("Failed to initialize {} on {}: {}", name, S::TAG, e);
            Err(TransitionError::new(stream, e))
        }
    }
}

fn init_spi_master<'a, S: StreamHandle<'a>, C>(
    stream: S,
    config: SpiMasterConfig,
    wrap: impl FnOnce(Claim<'a>) -> C,
) -> std::result::Result<C, TransitionError<S>> {
    init_with(
        stream,
        "SPI master",
        |lib, h| lib.spi_master_init(h, &config),
        wrap,
    )
}

macro_rules! stream_handle {
    ($(#[$meta:meta])* $name:ident, $tag:expr) => {
        $(#[$meta])*
        pub struct $name<'a> {
            claim: Claim<'a>,
        }

        impl<'a> Owner<'a> for $name<'a> {
            fn claim(&self) -> &Claim<'a> {
                &self.claim
            }

            fn into_claim(self) -> Claim<'a> {
                self.claim
            }
        }

        impl<'a> CommonOps<'a> for $name<'a> {}

        impl<'a> StreamHandle<'a> for $name<'a> {
            const TAG: ModeTag = $tag;

            fn from_claim(claim: Claim<'a>) -> Self {
                debug_assert_eq!(claim.role(), Role::Stream($tag));
                Self { claim }
            }
        }

        impl<'a> $name<'a> {
            pub(crate) fn new(lib: &'a dyn Driver, handle: FtHandle) -> Self {
                Self {
                    claim: Claim::new(lib, handle, Role::Stream($tag)),
                }
            }

            pub fn tag(&self) -> ModeTag {
                $tag
            }
        }

        impl fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("live", &self.claim.is_live())
                    .finish()
            }
        }
    };
}

stream_handle!(
    /// Interface in data-stream mode (mode 0 interface A, mode 3)
    ///
    /// Every serial protocol can be initialized here; GPIO cannot.
    DataStream,
    ModeTag::DataStream
);

stream_handle!(
    /// Interface dedicated to GPIO (mode 0 interface B, mode 1 interface D)
    GpioStream,
    ModeTag::Gpio
);

stream_handle!(
    /// Interface dedicated to SPI master (modes 1 and 2)
    SpiMasterStream,
    ModeTag::SpiMaster
);

/// Result of an `init_*` transition on stream handle `S`
pub type InitResult<C, S> = std::result::Result<C, TransitionError<S>>;

impl<'a> DataStream<'a> {
    /// SPI master using one data line (full duplex)
    pub fn init_single_spi_master(
        self,
        config: SpiMasterConfig,
    ) -> InitResult<SpiMasterSingle<'a, Self>, Self> {
        init_spi_master(self, config.with_io_mode(IoMode::Single), SpiMasterSingle::from_claim)
    }

    /// SPI master using two data lines (half duplex)
    pub fn init_dual_spi_master(
        self,
        config: SpiMasterConfig,
    ) -> InitResult<SpiMasterMulti<'a, Self>, Self> {
        init_spi_master(self, config.with_io_mode(IoMode::Dual), SpiMasterMulti::from_claim)
    }

    /// SPI master using four data lines (half duplex)
    pub fn init_quad_spi_master(
        self,
        config: SpiMasterConfig,
    ) -> InitResult<SpiMasterMulti<'a, Self>, Self> {
        init_spi_master(self, config.with_io_mode(IoMode::Quad), SpiMasterMulti::from_claim)
    }

    /// SPI slave without the FTDI framing protocol
    pub fn init_raw_spi_slave(self) -> InitResult<SpiSlaveRaw<'a>, Self> {
        init_with(
            self,
            "SPI slave",
            |lib, h| lib.spi_slave_init_ex(h, IoProtocol::NoProtocol),
            SpiSlaveRaw::from_claim,
        )
    }

    /// SPI slave with the FTDI framing protocol (with or without ACKs)
    pub fn init_proto_spi_slave(
        self,
        protocol: SlaveProtocol,
    ) -> InitResult<SpiSlaveProto<'a>, Self> {
        init_with(
            self,
            "SPI slave",
            |lib, h| lib.spi_slave_init_ex(h, protocol.into()),
            SpiSlaveProto::from_claim,
        )
    }

    /// I2C master running at `kbps` (60 to 3400)
    ///
    /// An out-of-range speed is rejected before the device is touched.
    pub fn init_i2c_master(self, kbps: u32) -> InitResult<I2cMaster<'a>, Self> {
        if !crate::i2c::master::KBPS_RANGE.contains(&kbps) {
            let error = Error::InvalidArgs(format!(
                "I2C speed {} kbps out of range ({}..={})",
                kbps,
                crate::i2c::master::KBPS_RANGE.start(),
                crate::i2c::master::KBPS_RANGE.end()
            ));
            return Err(TransitionError::new(self, error));
        }
        init_with(
            self,
            "I2C master",
            |lib, h| lib.i2c_master_init(h, kbps),
            I2cMaster::from_claim,
        )
    }

    pub fn init_i2c_slave(self) -> InitResult<I2cSlave<'a>, Self> {
        init_with(
            self,
            "I2C slave",
            |lib, h| lib.i2c_slave_init(h),
            I2cSlave::from_claim,
        )
    }
}

impl<'a> GpioStream<'a> {
    /// Configure the four GPIO pins
    pub fn init_gpio(self, dirs: [Direction; 4]) -> InitResult<Gpio<'a>, Self> {
        init_with(
            self,
            "GPIO",
            |lib, h| lib.gpio_init(h, dirs),
            Gpio::from_claim,
        )
    }
}

impl<'a> SpiMasterStream<'a> {
    pub fn init_single_spi_master(
        self,
        config: SpiMasterConfig,
    ) -> InitResult<SpiMasterSingle<'a, Self>, Self> {
        init_spi_master(self, config.with_io_mode(IoMode::Single), SpiMasterSingle::from_claim)
    }

    pub fn init_dual_spi_master(
        self,
        config: SpiMasterConfig,
    ) -> InitResult<SpiMasterMulti<'a, Self>, Self> {
        init_spi_master(self, config.with_io_mode(IoMode::Dual), SpiMasterMulti::from_claim)
    }

    pub fn init_quad_spi_master(
        self,
        config: SpiMasterConfig,
    ) -> InitResult<SpiMasterMulti<'a, Self>, Self> {
        init_spi_master(self, config.with_io_mode(IoMode::Quad), SpiMasterMulti::from_claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceType;
    use crate::driver::testing::Recorder;
    use crate::handle::Capability;

    #[test]
    fn gpio_round_trip_keeps_tag() {
        let lib = Recorder::new("FT4222 B", DeviceType::Dev4222H0);
        let stream = GpioStream::new(&lib, FtHandle::from_raw(1));
        let gpio = stream.init_gpio([Direction::Input; 4]).unwrap();
        let stream = gpio.uninitialize().unwrap();
        assert_eq!(stream.tag(), ModeTag::Gpio);
        stream.close().unwrap();
        assert_eq!(
            *lib.calls.borrow(),
            vec!["gpio_init", "uninitialize", "close"]
        );
    }

    #[test]
    fn failed_init_hands_stream_back() {
        let mut lib = Recorder::new("FT4222 B", DeviceType::Dev4222H0);
        lib.gpio_ok = false;
        let stream = GpioStream::new(&lib, FtHandle::from_raw(1));
        let err = stream.init_gpio([Direction::Output; 4]).unwrap_err();
        assert!(matches!(
            err.error(),
            Error::Status(crate::Ft4222Status::GpioNotSupportedInThisMode)
        ));
        let stream = err.into_handle();
        assert_eq!(stream.tag(), ModeTag::Gpio);
        assert_eq!(lib.count("close"), 0);
        drop(stream);
        assert_eq!(lib.count("close"), 1);
    }

    #[test]
    fn i2c_speed_checked_before_native_call() {
        let lib = Recorder::new("FT4222 A", DeviceType::Dev4222H0);
        let stream = DataStream::new(&lib, FtHandle::from_raw(1));
        let err = stream.init_i2c_master(59).unwrap_err();
        assert!(matches!(err.error(), Error::InvalidArgs(_)));
        let err = err.into_handle().init_i2c_master(3401).unwrap_err();
        assert!(matches!(err.error(), Error::InvalidArgs(_)));
        assert!(lib.calls.borrow().is_empty());
    }
}
