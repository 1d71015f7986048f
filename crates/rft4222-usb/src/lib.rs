//! rft4222-usb - FT4222H driver over raw USB
//!
//! This crate implements [`rft4222_core::Driver`] directly on top of
//! `nusb`, without LibFT4222 or D2XX. The FT4222H is a dedicated
//! SPI/I2C/GPIO bridge with its own vendor protocol (not MPSSE).
//!
//! # Supported Features
//!
//! - Enumeration: every USB interface of every FT4222H becomes one
//!   device-list entry, named and typed the way the vendor driver does
//! - Chip version, system clock, chip reset and buffer purge
//! - SPI master: init, single I/O transfers, dual/quad multi-I/O transfers,
//!   line switching, chip-select polarity and resets
//! - GPIO: `gpio_init` checks that the chip mode routes GPIO to the
//!   interface, which is what mode resolution needs
//!
//! # Limitations
//!
//! - GPIO pin access, SPI slave and I2C are not implemented and return
//!   `FUN_NOT_SUPPORT`
//! - The wire protocol has no clock query; `get_clock` reports the last
//!   clock set through this handle (60 MHz after power-up)
//!
//! # Example
//!
//! ```no_run
//! use rft4222_core::{open_by_idx, ModeTag};
//! use rft4222_usb::UsbDriver;
//!
//! let lib = UsbDriver::new();
//! let handle = open_by_idx(&lib, 0)?;
//! assert_eq!(handle.tag(), ModeTag::SpiMaster);
//! # Ok::<(), rft4222_core::Error>(())
//! ```

mod device;
mod error;
mod protocol;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use nusb::MaybeFuture;
use rft4222_core::{
    BufferType, ClockRate, CsPolarity, DeviceFlags, DeviceInfo, Direction, Driver, Ft4222Status,
    FtHandle, IoMode, NativeResult, OpenTarget, ShortDeviceInfo, SpiMasterConfig, SwChipVersion,
};

pub use device::InterfaceEntry;
pub use error::{Result, UsbError};
pub use protocol::{FT4222H_PID, FTDI_VID};

use device::{Active, UsbInterface};
use protocol::{interface_description, interface_serial, location_id};

/// Native driver backed by nusb
///
/// The device list is rebuilt by `create_device_info_list` and scanned
/// lazily on first use.
pub struct UsbDriver {
    entries: RefCell<Option<Vec<InterfaceEntry>>>,
    open: RefCell<HashMap<usize, UsbInterface>>,
    next_handle: Cell<usize>,
}

impl Default for UsbDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbDriver {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(None),
            open: RefCell::new(HashMap::new()),
            next_handle: Cell::new(1),
        }
    }

    /// Enumerate all FT4222H interfaces on the bus
    pub fn scan() -> Result<Vec<InterfaceEntry>> {
        let mut entries = Vec::new();
        let devices = nusb::list_devices()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == FTDI_VID && d.product_id() == FT4222H_PID);

        for info in devices {
            let mut interfaces: Vec<u8> = info.interfaces().map(|i| i.interface_number()).collect();
            interfaces.sort_unstable();
            interfaces.dedup();
            let num_interfaces = interfaces.len() as u8;
            let serial = info.serial_number().unwrap_or("").to_string();

            for interface in interfaces {
                entries.push(InterfaceEntry {
                    interface,
                    num_interfaces,
                    serial_number: interface_serial(&serial, num_interfaces, interface),
                    description: interface_description(num_interfaces, interface),
                    location_id: location_id(info.busnum(), info.device_address(), interface),
                    info: info.clone(),
                });
            }
        }

        log::debug!("Found {} FT4222H interfaces", entries.len());
        Ok(entries)
    }

    fn rescan(&self) -> NativeResult<usize> {
        let entries = Self::scan().map_err(Ft4222Status::from)?;
        let len = entries.len();
        *self.entries.borrow_mut() = Some(entries);
        Ok(len)
    }

    fn find_entry(&self, pred: impl Fn(&InterfaceEntry) -> bool) -> NativeResult<InterfaceEntry> {
        if self.entries.borrow().is_none() {
            self.rescan()?;
        }
        self.entries
            .borrow()
            .iter()
            .flatten()
            .find(|e| pred(e))
            .cloned()
            .ok_or(Ft4222Status::DeviceNotFound)
    }

    fn is_open(&self, location_id: u32) -> bool {
        self.open
            .borrow()
            .values()
            .any(|i| i.entry().location_id == location_id)
    }

    fn open_entry(&self, entry: InterfaceEntry) -> NativeResult<FtHandle> {
        if self.is_open(entry.location_id) {
            return Err(Ft4222Status::DeviceNotOpened);
        }
        let interface = UsbInterface::open(&entry).map_err(|e| {
            log::debug!("{}: {}", entry.description, e);
            Ft4222Status::from(e)
        })?;
        let raw = self.next_handle.get();
        self.next_handle.set(raw + 1);
        self.open.borrow_mut().insert(raw, interface);
        log::debug!("Opened {} as handle {}", entry.description, raw);
        Ok(FtHandle::from_raw(raw))
    }

    /// Run `f` on the interface behind `handle`
    fn with<T>(
        &self,
        handle: &FtHandle,
        f: impl FnOnce(&mut UsbInterface) -> Result<T>,
    ) -> NativeResult<T> {
        let mut open = self.open.borrow_mut();
        let interface = open
            .get_mut(&handle.as_raw())
            .ok_or(Ft4222Status::InvalidHandle)?;
        f(interface).map_err(|e| {
            log::debug!("handle {}: {}", handle.as_raw(), e);
            Ft4222Status::from(e)
        })
    }

    fn with_spi<T>(
        &self,
        handle: &FtHandle,
        f: impl FnOnce(&mut UsbInterface) -> Result<T>,
    ) -> NativeResult<T> {
        self.with(handle, |i| {
            if i.active() != Active::SpiMaster {
                return Err(UsbError::Native(Ft4222Status::IsNotSpiMode));
            }
            f(i)
        })
    }
}

impl Driver for UsbDriver {
    fn create_device_info_list(&self) -> NativeResult<u32> {
        self.rescan().map(|n| n as u32)
    }

    fn get_device_info_detail(&self, index: u32) -> NativeResult<DeviceInfo> {
        let entry = self
            .entries
            .borrow()
            .as_ref()
            .ok_or(Ft4222Status::DeviceListNotReady)?
            .get(index as usize)
            .cloned()
            .ok_or(Ft4222Status::DeviceNotFound)?;

        let mut flags = DeviceFlags::HIGH_SPEED;
        if self.is_open(entry.location_id) {
            flags |= DeviceFlags::OPEN;
        }
        let short = entry.short_info();
        Ok(DeviceInfo {
            index,
            flags,
            device_type: short.device_type,
            id: short.id,
            location_id: entry.location_id,
            serial_number: short.serial_number,
            description: short.description,
        })
    }

    fn open(&self, index: u32) -> NativeResult<FtHandle> {
        if self.entries.borrow().is_none() {
            self.rescan()?;
        }
        let entry = self
            .entries
            .borrow()
            .iter()
            .flatten()
            .nth(index as usize)
            .cloned()
            .ok_or(Ft4222Status::DeviceNotFound)?;
        self.open_entry(entry)
    }

    fn open_ex(&self, target: OpenTarget<'_>) -> NativeResult<FtHandle> {
        let entry = match target {
            OpenTarget::Serial(serial) => self.find_entry(|e| e.serial_number == serial)?,
            OpenTarget::Description(desc) => self.find_entry(|e| e.description == desc)?,
            OpenTarget::Location(loc) => self.find_entry(|e| e.location_id == loc)?,
        };
        self.open_entry(entry)
    }

    fn close(&self, handle: FtHandle) -> NativeResult<()> {
        // Dropping the nusb interface releases the claim
        match self.open.borrow_mut().remove(&handle.as_raw()) {
            Some(interface) => {
                log::debug!("Closed {}", interface.entry().description);
                Ok(())
            }
            None => Err(Ft4222Status::InvalidHandle),
        }
    }

    fn get_device_info(&self, handle: &FtHandle) -> NativeResult<ShortDeviceInfo> {
        self.with(handle, |i| Ok(i.entry().short_info()))
    }

    fn purge(&self, handle: &FtHandle, mask: BufferType) -> NativeResult<()> {
        self.with(handle, |i| {
            i.purge(mask);
            Ok(())
        })
    }

    fn reset_device(&self, handle: &FtHandle) -> NativeResult<()> {
        self.with(handle, |i| i.reset())
    }

    fn uninitialize(&self, handle: &FtHandle) -> NativeResult<()> {
        self.with(handle, |i| i.uninitialize())
    }

    fn set_clock(&self, handle: &FtHandle, rate: ClockRate) -> NativeResult<()> {
        self.with(handle, |i| i.set_clock(rate))
    }

    fn get_clock(&self, handle: &FtHandle) -> NativeResult<ClockRate> {
        self.with(handle, |i| Ok(i.clock()))
    }

    fn get_version(&self, handle: &FtHandle) -> NativeResult<SwChipVersion> {
        self.with(handle, |i| {
            let [chip_version, _, _] = i.get_version()?;
            // No vendor library in the path
            Ok(SwChipVersion {
                chip_version,
                dll_version: 0,
            })
        })
    }

    fn chip_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        self.with(handle, |i| i.reset())
    }

    fn gpio_init(&self, handle: &FtHandle, _dirs: [Direction; 4]) -> NativeResult<()> {
        self.with(handle, |i| i.gpio_init())
    }

    fn spi_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        self.with_spi(handle, |i| i.spi_reset())
    }

    fn spi_reset_transaction(&self, handle: &FtHandle, index: u8) -> NativeResult<()> {
        self.with_spi(handle, |i| i.spi_reset_transaction(index))
    }

    fn spi_master_init(&self, handle: &FtHandle, config: &SpiMasterConfig) -> NativeResult<()> {
        self.with(handle, |i| i.configure_spi_master(config))
    }

    fn spi_master_set_cs_polarity(&self, handle: &FtHandle, polarity: CsPolarity) -> NativeResult<()> {
        self.with_spi(handle, |i| i.set_cs_polarity(polarity))
    }

    fn spi_master_set_lines(&self, handle: &FtHandle, mode: IoMode) -> NativeResult<()> {
        self.with_spi(handle, |i| i.set_io_lines(mode))
    }

    fn spi_master_single_read(
        &self,
        handle: &FtHandle,
        len: u16,
        end_transaction: bool,
    ) -> NativeResult<Vec<u8>> {
        let dummy = vec![0u8; len as usize];
        self.with_spi(handle, |i| i.spi_exchange(&dummy, end_transaction))
    }

    fn spi_master_single_write(
        &self,
        handle: &FtHandle,
        data: &[u8],
        end_transaction: bool,
    ) -> NativeResult<u16> {
        let len = u16::try_from(data.len()).map_err(|_| Ft4222Status::InvalidArgs)?;
        self.with_spi(handle, |i| {
            i.spi_exchange(data, end_transaction)?;
            Ok(len)
        })
    }

    fn spi_master_single_read_write(
        &self,
        handle: &FtHandle,
        data: &[u8],
        end_transaction: bool,
    ) -> NativeResult<Vec<u8>> {
        self.with_spi(handle, |i| i.spi_exchange(data, end_transaction))
    }

    fn spi_master_multi_read_write(
        &self,
        handle: &FtHandle,
        single_write: &[u8],
        multi_write: &[u8],
        multi_read_len: u16,
    ) -> NativeResult<Vec<u8>> {
        self.with_spi(handle, |i| {
            i.spi_transfer_multi(single_write, multi_write, multi_read_len as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::device_type_for;
    use rft4222_core::{lookup, DeviceType, ModeTag, Resolution};

    fn describe_interface(num_interfaces: u8, index: u8) -> (DeviceType, String) {
        (
            device_type_for(num_interfaces),
            interface_description(num_interfaces, index),
        )
    }

    #[test]
    fn layouts_match_mode_table() {
        // Mode 0: two interfaces, stream then GPIO
        let (ty, desc) = describe_interface(2, 0);
        assert_eq!(
            lookup(&desc, ty),
            Some(Resolution::Stream(ModeTag::DataStream))
        );
        let (ty, desc) = describe_interface(2, 1);
        assert_eq!(lookup(&desc, ty), Some(Resolution::Stream(ModeTag::Gpio)));

        // Modes 1 and 2 share a layout, interface D needs the probe
        let (ty, desc) = describe_interface(4, 3);
        assert_eq!(ty, DeviceType::Dev4222H1_2);
        assert_eq!(lookup(&desc, ty), Some(Resolution::ProbeGpio));

        let (ty, desc) = describe_interface(1, 0);
        assert_eq!(
            lookup(&desc, ty),
            Some(Resolution::Stream(ModeTag::DataStream))
        );
    }

    #[test]
    fn unknown_handle_is_invalid() {
        let lib = UsbDriver::new();
        let handle = FtHandle::from_raw(42);
        assert_eq!(
            lib.get_device_info(&handle),
            Err(Ft4222Status::InvalidHandle)
        );
        assert_eq!(lib.close(handle), Err(Ft4222Status::InvalidHandle));
    }

    #[test]
    fn detail_needs_a_list() {
        let lib = UsbDriver::new();
        assert_eq!(
            lib.get_device_info_detail(0),
            Err(Ft4222Status::DeviceListNotReady)
        );
    }
}
