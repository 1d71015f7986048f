//! Enumeration and opening
//!
//! Every `open_by_*` function opens one USB interface and passes the raw
//! handle to [`resolve`](crate::resolve), so callers only ever see a
//! classified [`Ft4222Handle`].

use crate::device::DeviceInfo;
use crate::driver::{Driver, OpenTarget};
use crate::error::{Error, Result};
use crate::mode::{resolve, Ft4222Handle};

/// Exclusive upper bound of a device index
pub const DEVICE_INDEX_LIMIT: i64 = 1 << 31;

/// Longest serial number the driver stores
pub const MAX_SERIAL_LEN: usize = 16;

/// Longest description the driver stores
pub const MAX_DESCRIPTION_LEN: usize = 64;

fn check_index(index: i64) -> Result<u32> {
    if (0..DEVICE_INDEX_LIMIT).contains(&index) {
        Ok(index as u32)
    } else {
        Err(Error::InvalidId(index))
    }
}

fn check_str(what: &str, value: &str, max: usize) -> Result<()> {
    if value.is_empty() || value.len() > max {
        return Err(Error::InvalidArgs(format!(
            "{} '{}' must be 1 to {} bytes long",
            what, value, max
        )));
    }
    Ok(())
}

/// Details of every connected device
pub fn get_device_info_list(lib: &dyn Driver) -> Result<Vec<DeviceInfo>> {
    let count = lib.create_device_info_list()?;
    log::debug!("Driver reports {} device(s)", count);
    (0..count)
        .map(|idx| lib.get_device_info_detail(idx).map_err(Error::from))
        .collect()
}

/// Details of the device list entry at `index`
pub fn get_device_info_detail(lib: &dyn Driver, index: i64) -> Result<DeviceInfo> {
    let index = check_index(index)?;
    Ok(lib.get_device_info_detail(index)?)
}

/// Open the device list entry at `index` (0 to 2^31 - 1)
pub fn open_by_idx(lib: &dyn Driver, index: i64) -> Result<Ft4222Handle<'_>> {
    let index = check_index(index)?;
    log::debug!("Opening device #{}", index);
    let handle = lib.open(index)?;
    resolve(lib, handle)
}

pub fn open_by_serial<'a>(lib: &'a dyn Driver, serial: &str) -> Result<Ft4222Handle<'a>> {
    check_str("Serial number", serial, MAX_SERIAL_LEN)?;
    log::debug!("Opening device with serial '{}'", serial);
    let handle = lib.open_ex(OpenTarget::Serial(serial))?;
    resolve(lib, handle)
}

/// Open by description, e.g. `"FT4222 A"`
///
/// Several chips with the same description cannot be told apart; the
/// driver opens the first one.
pub fn open_by_description<'a>(lib: &'a dyn Driver, description: &str) -> Result<Ft4222Handle<'a>> {
    check_str("Description", description, MAX_DESCRIPTION_LEN)?;
    log::debug!("Opening device '{}'", description);
    let handle = lib.open_ex(OpenTarget::Description(description))?;
    resolve(lib, handle)
}

/// Open by USB location ID
///
/// The vendor driver does not support this on Linux and reports
/// `NOT_SUPPORTED` there.
pub fn open_by_location(lib: &dyn Driver, location: u32) -> Result<Ft4222Handle<'_>> {
    log::debug!("Opening device at location 0x{:x}", location);
    let handle = lib.open_ex(OpenTarget::Location(location))?;
    resolve(lib, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceType;
    use crate::driver::testing::Recorder;
    use crate::ModeTag;

    #[test]
    fn index_boundary() {
        let lib = Recorder::new("FT4222 A", DeviceType::Dev4222H0);
        assert!(matches!(open_by_idx(&lib, -1), Err(Error::InvalidId(-1))));
        assert!(matches!(
            open_by_idx(&lib, DEVICE_INDEX_LIMIT),
            Err(Error::InvalidId(_))
        ));
        assert!(matches!(
            get_device_info_detail(&lib, DEVICE_INDEX_LIMIT),
            Err(Error::InvalidId(_))
        ));
        assert!(lib.calls.borrow().is_empty());

        let handle = open_by_idx(&lib, 0).unwrap();
        assert_eq!(handle.tag(), ModeTag::DataStream);
        assert_eq!(lib.calls.borrow()[0], "open");
    }

    #[test]
    fn serial_length_checked() {
        let lib = Recorder::new("FT4222 A", DeviceType::Dev4222H0);
        assert!(matches!(
            open_by_serial(&lib, "A".repeat(17).as_str()),
            Err(Error::InvalidArgs(_))
        ));
        assert!(lib.calls.borrow().is_empty());
        open_by_serial(&lib, "REC0").unwrap().close().unwrap();
        assert_eq!(lib.count("close"), 1);
    }

    #[test]
    fn list_walks_every_entry() {
        let lib = Recorder::new("FT4222", DeviceType::Dev4222H3);
        let list = get_device_info_list(&lib).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].description, "FT4222");
    }
}
