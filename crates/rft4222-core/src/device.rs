//! Device description types shared by the driver seam and the handles

use std::fmt;

use bitflags::bitflags;

/// USB device type code reported by the D2XX layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceType {
    Bm = 0,
    Am = 1,
    Dev100Ax = 2,
    Unknown = 3,
    Dev2232C = 4,
    Dev232R = 5,
    Dev2232H = 6,
    Dev4232H = 7,
    Dev232H = 8,
    XSeries = 9,
    /// FT4222H in mode 0
    Dev4222H0 = 10,
    /// FT4222H in mode 1 or 2 (indistinguishable from enumeration data)
    Dev4222H1_2 = 11,
    /// FT4222H in mode 3
    Dev4222H3 = 12,
    Dev4222Prog = 13,
    Dev900 = 14,
    Dev930 = 15,
    DevUmftpd3a = 16,
}

impl DeviceType {
    /// Decode a raw type code; unrecognized values become `Unknown`
    pub fn from_raw(raw: u32) -> Self {
        use DeviceType::*;
        match raw {
            0 => Bm,
            1 => Am,
            2 => Dev100Ax,
            4 => Dev2232C,
            5 => Dev232R,
            6 => Dev2232H,
            7 => Dev4232H,
            8 => Dev232H,
            9 => XSeries,
            10 => Dev4222H0,
            11 => Dev4222H1_2,
            12 => Dev4222H3,
            13 => Dev4222Prog,
            14 => Dev900,
            15 => Dev930,
            16 => DevUmftpd3a,
            _ => Unknown,
        }
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Parse the names used in configuration files (`"4222H_0"`, `"4222H_1_2"`, ...)
    pub fn parse(s: &str) -> Option<Self> {
        use DeviceType::*;
        let ty = match s.trim().to_ascii_uppercase().trim_start_matches("DEV_") {
            "BM" => Bm,
            "AM" => Am,
            "100AX" => Dev100Ax,
            "UNKNOWN" => Unknown,
            "2232C" => Dev2232C,
            "232R" => Dev232R,
            "2232H" => Dev2232H,
            "4232H" => Dev4232H,
            "232H" => Dev232H,
            "X_SERIES" => XSeries,
            "4222H_0" => Dev4222H0,
            "4222H_1_2" => Dev4222H1_2,
            "4222H_3" => Dev4222H3,
            "4222_PROG" => Dev4222Prog,
            "900" => Dev900,
            "930" => Dev930,
            "UMFTPD3A" => DevUmftpd3a,
            _ => return None,
        };
        Some(ty)
    }

    fn name(self) -> &'static str {
        use DeviceType::*;
        match self {
            Bm => "DEV_BM",
            Am => "DEV_AM",
            Dev100Ax => "DEV_100AX",
            Unknown => "DEV_UNKNOWN",
            Dev2232C => "DEV_2232C",
            Dev232R => "DEV_232R",
            Dev2232H => "DEV_2232H",
            Dev4232H => "DEV_4232H",
            Dev232H => "DEV_232H",
            XSeries => "DEV_X_SERIES",
            Dev4222H0 => "DEV_4222H_0",
            Dev4222H1_2 => "DEV_4222H_1_2",
            Dev4222H3 => "DEV_4222H_3",
            Dev4222Prog => "DEV_4222_PROG",
            Dev900 => "DEV_900",
            Dev930 => "DEV_930",
            DevUmftpd3a => "DEV_UMFTPD3A",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Flags reported in a device list entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeviceFlags: u32 {
        /// The device is already opened by some process
        const OPEN       = 1;
        /// High-speed USB device
        const HIGH_SPEED = 2;
    }
}

bitflags! {
    /// Buffers to purge
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferType: u32 {
        const RX = 1;
        const TX = 2;
    }
}

bitflags! {
    /// GPIO trigger conditions
    ///
    /// Also used as the interrupt trigger of the chip's INT pin.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GpioTrigger: u32 {
        const RISING     = 0x01;
        const FALLING    = 0x02;
        const LEVEL_HIGH = 0x04;
        const LEVEL_LOW  = 0x08;
    }
}

/// One entry of the device list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position in the device list
    pub index: u32,
    pub flags: DeviceFlags,
    pub device_type: DeviceType,
    /// `VID << 16 | PID`
    pub id: u32,
    pub location_id: u32,
    pub serial_number: String,
    pub description: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} '{}' serial={} type={} id={:04x}:{:04x} loc=0x{:x}{}",
            self.index,
            self.description,
            self.serial_number,
            self.device_type,
            self.id >> 16,
            self.id & 0xFFFF,
            self.location_id,
            if self.flags.contains(DeviceFlags::OPEN) {
                " [open]"
            } else {
                ""
            }
        )
    }
}

/// Information available for an already opened handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortDeviceInfo {
    pub device_type: DeviceType,
    pub id: u32,
    pub serial_number: String,
    pub description: String,
}

/// Kernel driver version, packed as `0x00MMmmbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverVersion(pub u32);

impl DriverVersion {
    pub fn major(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn minor(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn build(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.build())
    }
}

/// System clock of the FT4222H
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ClockRate {
    #[default]
    Sys60MHz = 0,
    Sys24MHz = 1,
    Sys48MHz = 2,
    Sys80MHz = 3,
}

impl ClockRate {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ClockRate::Sys60MHz),
            1 => Some(ClockRate::Sys24MHz),
            2 => Some(ClockRate::Sys48MHz),
            3 => Some(ClockRate::Sys80MHz),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Clock frequency in kHz
    pub fn to_khz(self) -> u32 {
        match self {
            ClockRate::Sys60MHz => 60_000,
            ClockRate::Sys24MHz => 24_000,
            ClockRate::Sys48MHz => 48_000,
            ClockRate::Sys80MHz => 80_000,
        }
    }

    /// Parse a clock given in MHz ("60", "24", "48", "80")
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_end_matches("MHz").trim_end_matches("mhz") {
            "60" => Some(ClockRate::Sys60MHz),
            "24" => Some(ClockRate::Sys24MHz),
            "48" => Some(ClockRate::Sys48MHz),
            "80" => Some(ClockRate::Sys80MHz),
            _ => None,
        }
    }
}

impl fmt::Display for ClockRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz", self.to_khz() / 1000)
    }
}

/// Silicon revision, decoded from the raw chip version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ChipVersion {
    RevA = 0x4222_0100,
    RevB = 0x4222_0200,
    RevC = 0x4222_0300,
    RevD = 0x4222_0400,
}

impl ChipVersion {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x4222_0100 => Some(ChipVersion::RevA),
            0x4222_0200 => Some(ChipVersion::RevB),
            0x4222_0300 => Some(ChipVersion::RevC),
            0x4222_0400 => Some(ChipVersion::RevD),
            _ => None,
        }
    }
}

/// Chip and library version pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwChipVersion {
    pub chip_version: u32,
    pub dll_version: u32,
}

impl SwChipVersion {
    pub fn revision(&self) -> Option<ChipVersion> {
        ChipVersion::from_raw(self.chip_version)
    }
}

impl fmt::Display for SwChipVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision() {
            Some(rev) => write!(f, "chip 0x{:08X} ({:?})", self.chip_version, rev)?,
            None => write!(f, "chip 0x{:08X}", self.chip_version)?,
        }
        write!(f, ", library 0x{:08X}", self.dll_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_codes() {
        assert_eq!(DeviceType::from_raw(10), DeviceType::Dev4222H0);
        assert_eq!(DeviceType::from_raw(11), DeviceType::Dev4222H1_2);
        assert_eq!(DeviceType::from_raw(12), DeviceType::Dev4222H3);
        assert_eq!(DeviceType::from_raw(99), DeviceType::Unknown);
        assert_eq!(DeviceType::parse("4222H_1_2"), Some(DeviceType::Dev4222H1_2));
        assert_eq!(DeviceType::parse("DEV_4222H_3"), Some(DeviceType::Dev4222H3));
        assert_eq!(DeviceType::parse("bogus"), None);
    }

    #[test]
    fn driver_version_fields() {
        let v = DriverVersion(0x0001_0203);
        assert_eq!((v.major(), v.minor(), v.build()), (1, 2, 3));
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn chip_revision() {
        let v = SwChipVersion {
            chip_version: 0x4222_0400,
            dll_version: 0x0101_0004,
        };
        assert_eq!(v.revision(), Some(ChipVersion::RevD));
        assert_eq!(ClockRate::parse("80"), Some(ClockRate::Sys80MHz));
        assert_eq!(ClockRate::from_raw(7), None);
    }
}
