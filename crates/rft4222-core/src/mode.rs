//! Mode resolution
//!
//! A freshly opened interface is classified by the description string and
//! device type reported by the driver. Seven combinations are known. Six of
//! them map straight to a stream handle; interface D of a chip in mode 1 or
//! mode 2 looks identical in both, so it is told apart by probing GPIO.

use std::fmt;

use crate::device::DeviceType;
use crate::driver::{Driver, FtHandle};
use crate::error::{Error, Result};
use crate::gpio::Direction;
use crate::handle::CommonOps;
use crate::stream::{DataStream, GpioStream, ModeTag, SpiMasterStream, StreamHandle};

/// How a table entry turns a raw handle into a stream handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The entry names the stream mode directly
    Stream(ModeTag),
    /// GPIO stream if GPIO init is accepted, SPI master stream otherwise
    ProbeGpio,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Stream(tag) => write!(f, "{}", tag),
            Resolution::ProbeGpio => f.write_str("GPIO or SPI master stream (probed)"),
        }
    }
}

/// Every known `(description, device type)` pair
pub const MODE_TABLE: [(&str, DeviceType, Resolution); 7] = [
    ("FT4222 A", DeviceType::Dev4222H0, Resolution::Stream(ModeTag::DataStream)),
    ("FT4222 B", DeviceType::Dev4222H0, Resolution::Stream(ModeTag::Gpio)),
    ("FT4222 A", DeviceType::Dev4222H1_2, Resolution::Stream(ModeTag::SpiMaster)),
    ("FT4222 B", DeviceType::Dev4222H1_2, Resolution::Stream(ModeTag::SpiMaster)),
    ("FT4222 C", DeviceType::Dev4222H1_2, Resolution::Stream(ModeTag::SpiMaster)),
    ("FT4222 D", DeviceType::Dev4222H1_2, Resolution::ProbeGpio),
    ("FT4222", DeviceType::Dev4222H3, Resolution::Stream(ModeTag::DataStream)),
];

/// Pin setup used for the GPIO probe; inputs never drive the bus
const PROBE_DIRECTIONS: [Direction; 4] = [Direction::Input; 4];

/// Look up the resolution for an enumeration entry
///
/// The description must match exactly, including the space before the
/// interface letter.
pub fn lookup(description: &str, device_type: DeviceType) -> Option<Resolution> {
    MODE_TABLE
        .iter()
        .find(|(desc, ty, _)| *desc == description && *ty == device_type)
        .map(|(_, _, res)| *res)
}

/// An opened interface wrapped in the stream handle matching its wiring
#[derive(Debug)]
pub enum Ft4222Handle<'a> {
    DataStream(DataStream<'a>),
    Gpio(GpioStream<'a>),
    SpiMaster(SpiMasterStream<'a>),
}

impl<'a> Ft4222Handle<'a> {
    pub fn tag(&self) -> ModeTag {
        match self {
            Ft4222Handle::DataStream(_) => ModeTag::DataStream,
            Ft4222Handle::Gpio(_) => ModeTag::Gpio,
            Ft4222Handle::SpiMaster(_) => ModeTag::SpiMaster,
        }
    }

    /// Chip-wide operations regardless of the stream mode
    pub fn common(&self) -> &dyn CommonOps<'a> {
        match self {
            Ft4222Handle::DataStream(h) => h,
            Ft4222Handle::Gpio(h) => h,
            Ft4222Handle::SpiMaster(h) => h,
        }
    }

    pub fn close(self) -> Result<()> {
        match self {
            Ft4222Handle::DataStream(h) => h.close(),
            Ft4222Handle::Gpio(h) => h.close(),
            Ft4222Handle::SpiMaster(h) => h.close(),
        }
    }

    /// The data stream inside, or `self` back if the mode differs
    pub fn into_data_stream(self) -> std::result::Result<DataStream<'a>, Self> {
        match self {
            Ft4222Handle::DataStream(h) => Ok(h),
            other => Err(other),
        }
    }

    pub fn into_gpio_stream(self) -> std::result::Result<GpioStream<'a>, Self> {
        match self {
            Ft4222Handle::Gpio(h) => Ok(h),
            other => Err(other),
        }
    }

    pub fn into_spi_master_stream(self) -> std::result::Result<SpiMasterStream<'a>, Self> {
        match self {
            Ft4222Handle::SpiMaster(h) => Ok(h),
            other => Err(other),
        }
    }
}

impl<'a> From<DataStream<'a>> for Ft4222Handle<'a> {
    fn from(h: DataStream<'a>) -> Self {
        Ft4222Handle::DataStream(h)
    }
}

impl<'a> From<GpioStream<'a>> for Ft4222Handle<'a> {
    fn from(h: GpioStream<'a>) -> Self {
        Ft4222Handle::Gpio(h)
    }
}

impl<'a> From<SpiMasterStream<'a>> for Ft4222Handle<'a> {
    fn from(h: SpiMasterStream<'a>) -> Self {
        Ft4222Handle::SpiMaster(h)
    }
}

fn wrap(lib: &dyn Driver, handle: FtHandle, tag: ModeTag) -> Ft4222Handle<'_> {
    match tag {
        ModeTag::DataStream => DataStream::new(lib, handle).into(),
        ModeTag::Gpio => GpioStream::new(lib, handle).into(),
        ModeTag::SpiMaster => SpiMasterStream::new(lib, handle).into(),
    }
}

/// Close a handle that never made it into a stream handle
fn discard(lib: &dyn Driver, handle: FtHandle) {
    if let Err(status) = lib.close(handle) {
        if !status.is_soft_close_error() {
            log::warn!("Failed to close unresolved handle: {}", status);
        }
    }
}

/// Classify a freshly opened handle and wrap it in its stream handle
///
/// The handle is closed if it cannot be classified.
pub fn resolve(lib: &dyn Driver, handle: FtHandle) -> Result<Ft4222Handle<'_>> {
    let info = match lib.get_device_info(&handle) {
        Ok(info) => info,
        Err(status) => {
            log::debug!("Short device info query failed: {}", status);
            discard(lib, handle);
            return Err(Error::InvalidHandle);
        }
    };

    let Some(resolution) = lookup(&info.description, info.device_type) else {
        discard(lib, handle);
        return Err(Error::InvalidMode {
            description: info.description,
            device_type: info.device_type,
        });
    };

    let tag = match resolution {
        Resolution::Stream(tag) => tag,
        Resolution::ProbeGpio => match probe_gpio(lib, &handle) {
            Ok(tag) => tag,
            Err(e) => {
                discard(lib, handle);
                return Err(e);
            }
        },
    };
    log::debug!("'{}' ({}) resolved to {}", info.description, info.device_type, tag);
    Ok(wrap(lib, handle, tag))
}

/// Tell mode 1 (GPIO) from mode 2 (SPI master) on interface D
///
/// A successful probe is rolled back before returning. If the rollback
/// fails the interface is left in an unknown state and the error is fatal.
fn probe_gpio(lib: &dyn Driver, handle: &FtHandle) -> Result<ModeTag> {
    match lib.gpio_init(handle, PROBE_DIRECTIONS) {
        Ok(()) => {
            if let Err(status) = lib.uninitialize(handle) {
                log::error!("GPIO probe succeeded but rollback failed: {}", status);
                return Err(Error::ProbeRollback(status));
            }
            Ok(ModeTag::Gpio)
        }
        Err(status) => {
            log::trace!("GPIO probe rejected ({}), assuming SPI master", status);
            Ok(ModeTag::SpiMaster)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::Recorder;

    #[test]
    fn lookup_is_exact() {
        assert_eq!(
            lookup("FT4222 A", DeviceType::Dev4222H0),
            Some(Resolution::Stream(ModeTag::DataStream))
        );
        assert_eq!(lookup("FT4222 D", DeviceType::Dev4222H1_2), Some(Resolution::ProbeGpio));
        assert_eq!(lookup("FT4222A", DeviceType::Dev4222H0), None);
        assert_eq!(lookup("FT4222 C", DeviceType::Dev4222H0), None);
        assert_eq!(lookup("FT4222", DeviceType::Dev4222H0), None);
    }

    #[test]
    fn probe_accepted_rolls_back() {
        let lib = Recorder::new("FT4222 D", DeviceType::Dev4222H1_2);
        let handle = resolve(&lib, FtHandle::from_raw(1)).unwrap();
        assert_eq!(handle.tag(), ModeTag::Gpio);
        assert_eq!(
            *lib.calls.borrow(),
            vec!["get_device_info", "gpio_init", "uninitialize"]
        );
        handle.close().unwrap();
    }

    #[test]
    fn probe_rejected_means_spi_master() {
        let mut lib = Recorder::new("FT4222 D", DeviceType::Dev4222H1_2);
        lib.gpio_ok = false;
        let handle = resolve(&lib, FtHandle::from_raw(1)).unwrap();
        assert_eq!(handle.tag(), ModeTag::SpiMaster);
        assert_eq!(lib.count("uninitialize"), 0);
    }

    #[test]
    fn failed_rollback_is_fatal_and_closes() {
        let mut lib = Recorder::new("FT4222 D", DeviceType::Dev4222H1_2);
        lib.uninit_ok = false;
        let err = resolve(&lib, FtHandle::from_raw(1)).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(lib.count("close"), 1);
    }

    #[test]
    fn unknown_pair_closes_handle() {
        let lib = Recorder::new("FT4222 E", DeviceType::Dev4222H0);
        let err = resolve(&lib, FtHandle::from_raw(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidMode { .. }));
        assert_eq!(lib.count("close"), 1);
    }

    #[test]
    fn narrowing_hands_back_on_mismatch() {
        let lib = Recorder::new("FT4222 B", DeviceType::Dev4222H0);
        let handle = resolve(&lib, FtHandle::from_raw(1)).unwrap();
        let handle = handle.into_data_stream().unwrap_err();
        let gpio = handle.into_gpio_stream().unwrap();
        assert_eq!(gpio.tag(), ModeTag::Gpio);
    }
}
