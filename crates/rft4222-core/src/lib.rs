//! rft4222-core - Mode resolution and handle lifecycle for FT4222H bridges
//!
//! The FT4222H exposes up to four USB interfaces whose personality depends
//! on how the chip is strapped. This crate opens one interface through a
//! [`Driver`] backend, works out which personality it has, and hands back a
//! typed stream handle. Protocols are activated by consuming that handle:
//!
//! ```text
//! open_by_* -> Ft4222Handle -> DataStream  -> init_i2c_master -> I2cMaster
//!                           -> GpioStream  -> init_gpio       -> Gpio
//!                           -> SpiMasterStream -> init_*_spi_master -> SpiMaster*
//! ```
//!
//! Every transition takes `self`, so exactly one value owns the native
//! handle at any time. `uninitialize` goes back to the stream handle the
//! capability was created from, and dropping any live handle releases it.
//!
//! # Example
//!
//! ```
//! use rft4222_core::prelude::*;
//! use rft4222_core::{open_by_description, Direction, PortId};
//! use rft4222_dummy::SimDriver;
//!
//! let lib = SimDriver::mode0();
//! let stream = open_by_description(&lib, "FT4222 B")?
//!     .into_gpio_stream()
//!     .expect("interface B is GPIO in mode 0");
//! let gpio = stream.init_gpio([Direction::Output; 4])?;
//! gpio.write(PortId::Port2, true)?;
//! let stream = gpio.uninitialize()?;
//! stream.close()?;
//! # Ok::<(), rft4222_core::Error>(())
//! ```
//!
//! A handle cannot be used after it has been moved into the next state:
//!
//! ```compile_fail
//! use rft4222_core::prelude::*;
//! use rft4222_core::{open_by_description, Direction};
//! use rft4222_dummy::SimDriver;
//!
//! let lib = SimDriver::mode0();
//! let stream = open_by_description(&lib, "FT4222 B").unwrap()
//!     .into_gpio_stream().unwrap();
//! let _gpio = stream.init_gpio([Direction::Input; 4]).unwrap();
//! stream.close().unwrap();
//! ```
//!
//! ```compile_fail
//! use rft4222_core::prelude::*;
//! use rft4222_core::{open_by_description, Direction, PortId};
//! use rft4222_dummy::SimDriver;
//!
//! let lib = SimDriver::mode0();
//! let stream = open_by_description(&lib, "FT4222 B").unwrap()
//!     .into_gpio_stream().unwrap();
//! let gpio = stream.init_gpio([Direction::Input; 4]).unwrap();
//! let _stream = gpio.uninitialize().unwrap();
//! gpio.read(PortId::Port0).unwrap();
//! ```
//!
//! Operations a mode does not offer do not exist on its type:
//!
//! ```compile_fail
//! use rft4222_core::open_by_description;
//! use rft4222_dummy::SimDriver;
//!
//! let lib = SimDriver::mode1();
//! let stream = open_by_description(&lib, "FT4222 A").unwrap()
//!     .into_spi_master_stream().unwrap();
//! let _i2c = stream.init_i2c_master(400);
//! ```

#![warn(rust_2018_idioms)]

mod claim;
pub mod device;
pub mod driver;
pub mod error;
pub mod gpio;
pub mod handle;
pub mod i2c;
pub mod mode;
pub mod open;
pub mod spi;
pub mod stream;

pub use device::{
    BufferType, ChipVersion, ClockRate, DeviceFlags, DeviceInfo, DeviceType, DriverVersion,
    GpioTrigger, ShortDeviceInfo, SwChipVersion,
};
pub use driver::{Driver, FtHandle, OpenTarget};
pub use error::{Error, Ft4222Status, NativeResult, Result, TransitionError};
pub use gpio::{Direction, Gpio, PortId};
pub use handle::{Capability, CommonOps};
pub use i2c::master::{CtrlStatus, I2cMaster, TransactionFlag};
pub use i2c::slave::I2cSlave;
pub use mode::{lookup, resolve, Ft4222Handle, Resolution, MODE_TABLE};
pub use open::{
    get_device_info_detail, get_device_info_list, open_by_description, open_by_idx,
    open_by_location, open_by_serial,
};
pub use spi::master::{
    ClkDiv, CsPolarity, IoMode, SpiMaster, SpiMasterConfig, SpiMasterMulti, SpiMasterSingle,
    SsoMap,
};
pub use spi::slave::{SlaveProtocol, SpiSlaveProto, SpiSlaveRaw};
pub use spi::{ClkPhase, ClkPolarity, DriveStrength, TransactionIdx};
pub use stream::{DataStream, GpioStream, InitResult, ModeTag, SpiMasterStream, StreamHandle};

/// Traits needed to call handle methods
pub mod prelude {
    pub use crate::handle::{Capability, CommonOps};
    pub use crate::spi::slave::SpiSlaveCommon;
    pub use crate::spi::SpiCommon;
    pub use crate::stream::StreamHandle;
}
