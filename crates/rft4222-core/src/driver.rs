//! Native driver seam
//!
//! The FT4222H firmware protocol lives in an external library (LibFT4222 on
//! top of D2XX, or the raw USB implementation in `rft4222-usb`). This module
//! defines the [`Driver`] trait that such a backend implements. Every
//! primitive is a single blocking call returning a native status; none of
//! them know about mode tags or capability types.
//!
//! A backend is constructed once by the caller and passed by reference to
//! [`open_by_idx`](crate::open_by_idx) and friends. Handles borrow it, so
//! the library always outlives every handle carved out of it.
//!
//! Only enumeration, open/close, short device info and `uninitialize` are
//! required. Everything else defaults to `NOT_SUPPORTED` (D2XX calls) or
//! `FUN_NOT_SUPPORT` (FT4222 calls), which lets partial backends stay small.

use crate::device::{
    BufferType, ClockRate, DeviceInfo, DriverVersion, GpioTrigger, ShortDeviceInfo, SwChipVersion,
};
use crate::error::{Ft4222Status, NativeResult};
use crate::gpio::{Direction, PortId};
use crate::i2c::master::{CtrlStatus, TransactionFlag};
use crate::spi::master::{CsPolarity, IoMode, SpiMasterConfig};
use crate::spi::slave::IoProtocol;
use crate::spi::{ClkPhase, ClkPolarity, DriveStrength};

/// Opaque token for one open USB interface
///
/// Move-only: a token is never duplicated, so at most one owner can ever
/// hand it to [`Driver::close`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct FtHandle(usize);

impl FtHandle {
    /// Wrap a raw backend value (a pointer or table index)
    pub fn from_raw(raw: usize) -> Self {
        FtHandle(raw)
    }

    pub fn as_raw(&self) -> usize {
        self.0
    }
}

/// How to select a device in [`Driver::open_ex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenTarget<'s> {
    Serial(&'s str),
    Description(&'s str),
    Location(u32),
}

const D2XX_UNSUPPORTED: Ft4222Status = Ft4222Status::NotSupported;
const FT4222_UNSUPPORTED: Ft4222Status = Ft4222Status::FunNotSupport;

/// Primitives of the native FT4222H library
pub trait Driver {
    // --- D2XX: enumeration and raw handles ---

    /// Build the device list and return its length
    fn create_device_info_list(&self) -> NativeResult<u32>;

    /// Details of the list entry at `index`
    fn get_device_info_detail(&self, index: u32) -> NativeResult<DeviceInfo>;

    fn open(&self, index: u32) -> NativeResult<FtHandle>;

    fn open_ex(&self, target: OpenTarget<'_>) -> NativeResult<FtHandle>;

    fn close(&self, handle: FtHandle) -> NativeResult<()>;

    /// Type, id, serial number and description of an open handle
    fn get_device_info(&self, handle: &FtHandle) -> NativeResult<ShortDeviceInfo>;

    fn get_driver_version(&self, _handle: &FtHandle) -> NativeResult<DriverVersion> {
        Err(D2XX_UNSUPPORTED)
    }

    fn purge(&self, _handle: &FtHandle, _mask: BufferType) -> NativeResult<()> {
        Err(D2XX_UNSUPPORTED)
    }

    fn reset_device(&self, _handle: &FtHandle) -> NativeResult<()> {
        Err(D2XX_UNSUPPORTED)
    }

    // --- FT4222 common ---

    /// Drop any protocol context, leaving a plain open handle
    fn uninitialize(&self, handle: &FtHandle) -> NativeResult<()>;

    fn set_clock(&self, _handle: &FtHandle, _rate: ClockRate) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn get_clock(&self, _handle: &FtHandle) -> NativeResult<ClockRate> {
        Err(FT4222_UNSUPPORTED)
    }

    fn set_wakeup_interrupt(&self, _handle: &FtHandle, _enable: bool) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn set_interrupt_trigger(&self, _handle: &FtHandle, _trigger: GpioTrigger) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn set_suspend_out(&self, _handle: &FtHandle, _enable: bool) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn get_max_transfer_size(&self, _handle: &FtHandle) -> NativeResult<u16> {
        Err(FT4222_UNSUPPORTED)
    }

    fn get_version(&self, _handle: &FtHandle) -> NativeResult<SwChipVersion> {
        Err(FT4222_UNSUPPORTED)
    }

    fn chip_reset(&self, _handle: &FtHandle) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    // --- GPIO ---

    fn gpio_init(&self, _handle: &FtHandle, _dirs: [Direction; 4]) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn gpio_read(&self, _handle: &FtHandle, _port: PortId) -> NativeResult<bool> {
        Err(FT4222_UNSUPPORTED)
    }

    fn gpio_write(&self, _handle: &FtHandle, _port: PortId, _state: bool) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn gpio_set_input_trigger(
        &self,
        _handle: &FtHandle,
        _port: PortId,
        _trigger: GpioTrigger,
    ) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    /// Number of queued trigger events for `port`
    fn gpio_get_trigger_status(&self, _handle: &FtHandle, _port: PortId) -> NativeResult<u16> {
        Err(FT4222_UNSUPPORTED)
    }

    fn gpio_read_trigger_queue(
        &self,
        _handle: &FtHandle,
        _port: PortId,
        _max_events: u16,
    ) -> NativeResult<Vec<GpioTrigger>> {
        Err(FT4222_UNSUPPORTED)
    }

    fn gpio_set_waveform_mode(&self, _handle: &FtHandle, _enable: bool) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    // --- SPI (master and slave) ---

    fn spi_reset(&self, _handle: &FtHandle) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn spi_reset_transaction(&self, _handle: &FtHandle, _index: u8) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn spi_set_driving_strength(
        &self,
        _handle: &FtHandle,
        _clk: DriveStrength,
        _io: DriveStrength,
        _sso: DriveStrength,
    ) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    // --- SPI master ---

    fn spi_master_init(&self, _handle: &FtHandle, _config: &SpiMasterConfig) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn spi_master_set_cs_polarity(&self, _handle: &FtHandle, _polarity: CsPolarity) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn spi_master_set_lines(&self, _handle: &FtHandle, _mode: IoMode) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    /// Read `len` bytes (at most 65535) in single I/O mode
    fn spi_master_single_read(
        &self,
        _handle: &FtHandle,
        _len: u16,
        _end_transaction: bool,
    ) -> NativeResult<Vec<u8>> {
        Err(FT4222_UNSUPPORTED)
    }

    /// Write up to 65535 bytes in single I/O mode, returning the count sent
    fn spi_master_single_write(
        &self,
        _handle: &FtHandle,
        _data: &[u8],
        _end_transaction: bool,
    ) -> NativeResult<u16> {
        Err(FT4222_UNSUPPORTED)
    }

    /// Full-duplex exchange of up to 65535 bytes
    fn spi_master_single_read_write(
        &self,
        _handle: &FtHandle,
        _data: &[u8],
        _end_transaction: bool,
    ) -> NativeResult<Vec<u8>> {
        Err(FT4222_UNSUPPORTED)
    }

    /// Three-phase half-duplex transfer in dual or quad mode
    fn spi_master_multi_read_write(
        &self,
        _handle: &FtHandle,
        _single_write: &[u8],
        _multi_write: &[u8],
        _multi_read_len: u16,
    ) -> NativeResult<Vec<u8>> {
        Err(FT4222_UNSUPPORTED)
    }

    // --- SPI slave ---

    fn spi_slave_init_ex(&self, _handle: &FtHandle, _protocol: IoProtocol) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn spi_slave_set_mode(
        &self,
        _handle: &FtHandle,
        _polarity: ClkPolarity,
        _phase: ClkPhase,
    ) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn spi_slave_get_rx_status(&self, _handle: &FtHandle) -> NativeResult<u16> {
        Err(FT4222_UNSUPPORTED)
    }

    fn spi_slave_read(&self, _handle: &FtHandle, _len: u16) -> NativeResult<Vec<u8>> {
        Err(FT4222_UNSUPPORTED)
    }

    fn spi_slave_write(&self, _handle: &FtHandle, _data: &[u8]) -> NativeResult<u16> {
        Err(FT4222_UNSUPPORTED)
    }

    // --- I2C master ---

    fn i2c_master_init(&self, _handle: &FtHandle, _kbps: u32) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_master_read(&self, _handle: &FtHandle, _addr: u16, _len: u16) -> NativeResult<Vec<u8>> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_master_write(&self, _handle: &FtHandle, _addr: u16, _data: &[u8]) -> NativeResult<u16> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_master_read_ex(
        &self,
        _handle: &FtHandle,
        _addr: u16,
        _flag: TransactionFlag,
        _len: u16,
    ) -> NativeResult<Vec<u8>> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_master_write_ex(
        &self,
        _handle: &FtHandle,
        _addr: u16,
        _flag: TransactionFlag,
        _data: &[u8],
    ) -> NativeResult<u16> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_master_reset(&self, _handle: &FtHandle) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_master_get_status(&self, _handle: &FtHandle) -> NativeResult<CtrlStatus> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_master_reset_bus(&self, _handle: &FtHandle) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    // --- I2C slave ---

    fn i2c_slave_init(&self, _handle: &FtHandle) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_slave_reset(&self, _handle: &FtHandle) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_slave_get_address(&self, _handle: &FtHandle) -> NativeResult<u8> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_slave_set_address(&self, _handle: &FtHandle, _addr: u8) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_slave_get_rx_status(&self, _handle: &FtHandle) -> NativeResult<u16> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_slave_read(&self, _handle: &FtHandle, _len: u16) -> NativeResult<Vec<u8>> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_slave_write(&self, _handle: &FtHandle, _data: &[u8]) -> NativeResult<u16> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_slave_set_clock_stretch(&self, _handle: &FtHandle, _enable: bool) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }

    fn i2c_slave_set_resp_word(&self, _handle: &FtHandle, _word: u8) -> NativeResult<()> {
        Err(FT4222_UNSUPPORTED)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal in-crate driver for unit tests

    use std::cell::RefCell;

    use super::*;
    use crate::device::{DeviceFlags, DeviceType};

    /// Single-device driver that records the name of every call
    pub(crate) struct Recorder {
        pub description: &'static str,
        pub device_type: DeviceType,
        pub gpio_ok: bool,
        pub uninit_ok: bool,
        pub calls: RefCell<Vec<&'static str>>,
    }

    impl Recorder {
        pub(crate) fn new(description: &'static str, device_type: DeviceType) -> Self {
            Self {
                description,
                device_type,
                gpio_ok: true,
                uninit_ok: true,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn log(&self, name: &'static str) {
            self.calls.borrow_mut().push(name);
        }

        pub(crate) fn count(&self, name: &str) -> usize {
            self.calls.borrow().iter().filter(|c| **c == name).count()
        }
    }

    impl Driver for Recorder {
        fn create_device_info_list(&self) -> NativeResult<u32> {
            self.log("create_device_info_list");
            Ok(1)
        }

        fn get_device_info_detail(&self, index: u32) -> NativeResult<DeviceInfo> {
            self.log("get_device_info_detail");
            Ok(DeviceInfo {
                index,
                flags: DeviceFlags::HIGH_SPEED,
                device_type: self.device_type,
                id: 0x0403_601C,
                location_id: 0x11,
                serial_number: "REC0".into(),
                description: self.description.into(),
            })
        }

        fn open(&self, _index: u32) -> NativeResult<FtHandle> {
            self.log("open");
            Ok(FtHandle::from_raw(1))
        }

        fn open_ex(&self, _target: OpenTarget<'_>) -> NativeResult<FtHandle> {
            self.log("open_ex");
            Ok(FtHandle::from_raw(1))
        }

        fn close(&self, _handle: FtHandle) -> NativeResult<()> {
            self.log("close");
            Ok(())
        }

        fn get_device_info(&self, _handle: &FtHandle) -> NativeResult<ShortDeviceInfo> {
            self.log("get_device_info");
            Ok(ShortDeviceInfo {
                device_type: self.device_type,
                id: 0x0403_601C,
                serial_number: "REC0".into(),
                description: self.description.into(),
            })
        }

        fn uninitialize(&self, _handle: &FtHandle) -> NativeResult<()> {
            self.log("uninitialize");
            if self.uninit_ok {
                Ok(())
            } else {
                Err(Ft4222Status::IoError)
            }
        }

        fn gpio_init(&self, _handle: &FtHandle, _dirs: [Direction; 4]) -> NativeResult<()> {
            self.log("gpio_init");
            if self.gpio_ok {
                Ok(())
            } else {
                Err(Ft4222Status::GpioNotSupportedInThisMode)
            }
        }

        fn gpio_read(&self, _handle: &FtHandle, _port: PortId) -> NativeResult<bool> {
            self.log("gpio_read");
            Ok(true)
        }
    }
}
