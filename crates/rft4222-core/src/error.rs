//! Status codes and error types
//!
//! [`Ft4222Status`] mirrors the numeric codes returned by the native driver
//! (the D2XX range starting at 0 and the FT4222 extension range starting at
//! 1000). [`Error`] is what the handle layer hands back to callers.

use std::fmt;

use thiserror::Error;

use crate::device::DeviceType;

/// Status code returned by a native driver primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Ft4222Status {
    Ok = 0,
    InvalidHandle = 1,
    DeviceNotFound = 2,
    DeviceNotOpened = 3,
    IoError = 4,
    InsufficientResources = 5,
    InvalidParameter = 6,
    InvalidBaudRate = 7,
    DeviceNotOpenedForErase = 8,
    DeviceNotOpenedForWrite = 9,
    FailedToWriteDevice = 10,
    EepromReadFailed = 11,
    EepromWriteFailed = 12,
    EepromEraseFailed = 13,
    EepromNotPresent = 14,
    EepromNotProgrammed = 15,
    InvalidArgs = 16,
    NotSupported = 17,
    OtherError = 18,
    DeviceListNotReady = 19,

    DeviceNotSupported = 1000,
    ClkNotSupported = 1001,
    VendorCmdNotSupported = 1002,
    IsNotSpiMode = 1003,
    IsNotI2cMode = 1004,
    IsNotSpiSingleMode = 1005,
    IsNotSpiMultiMode = 1006,
    WrongI2cAddr = 1007,
    InvalidFunction = 1008,
    InvalidPointer = 1009,
    ExceededMaxTransferSize = 1010,
    FailedToReadDevice = 1011,
    I2cNotSupportedInThisMode = 1012,
    GpioNotSupportedInThisMode = 1013,
    GpioExceededMaxPortnum = 1014,
    GpioWriteNotSupported = 1015,
    GpioPullupInvalidInInputmode = 1016,
    GpioPulldownInvalidInInputmode = 1017,
    GpioOpendrainInvalidInOutputmode = 1018,
    InterruptNotSupported = 1019,
    GpioInputNotSupported = 1020,
    EventNotSupported = 1021,
    FunNotSupport = 1022,
}

impl Ft4222Status {
    /// Decode a raw status code; unknown values collapse to `OtherError`
    pub fn from_raw(raw: u32) -> Self {
        use Ft4222Status::*;
        match raw {
            0 => Ok,
            1 => InvalidHandle,
            2 => DeviceNotFound,
            3 => DeviceNotOpened,
            4 => IoError,
            5 => InsufficientResources,
            6 => InvalidParameter,
            7 => InvalidBaudRate,
            8 => DeviceNotOpenedForErase,
            9 => DeviceNotOpenedForWrite,
            10 => FailedToWriteDevice,
            11 => EepromReadFailed,
            12 => EepromWriteFailed,
            13 => EepromEraseFailed,
            14 => EepromNotPresent,
            15 => EepromNotProgrammed,
            16 => InvalidArgs,
            17 => NotSupported,
            19 => DeviceListNotReady,
            1000 => DeviceNotSupported,
            1001 => ClkNotSupported,
            1002 => VendorCmdNotSupported,
            1003 => IsNotSpiMode,
            1004 => IsNotI2cMode,
            1005 => IsNotSpiSingleMode,
            1006 => IsNotSpiMultiMode,
            1007 => WrongI2cAddr,
            1008 => InvalidFunction,
            1009 => InvalidPointer,
            1010 => ExceededMaxTransferSize,
            1011 => FailedToReadDevice,
            1012 => I2cNotSupportedInThisMode,
            1013 => GpioNotSupportedInThisMode,
            1014 => GpioExceededMaxPortnum,
            1015 => GpioWriteNotSupported,
            1016 => GpioPullupInvalidInInputmode,
            1017 => GpioPulldownInvalidInInputmode,
            1018 => GpioOpendrainInvalidInOutputmode,
            1019 => InterruptNotSupported,
            1020 => GpioInputNotSupported,
            1021 => EventNotSupported,
            1022 => FunNotSupport,
            _ => OtherError,
        }
    }

    /// Raw numeric value as used by the native library
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Turn a raw status into a `Result`, treating `OK` as success
    pub fn check(raw: u32) -> NativeResult<()> {
        match Self::from_raw(raw) {
            Ft4222Status::Ok => Ok(()),
            status => Err(status),
        }
    }

    /// Statuses that a close call may report for a handle that is
    /// already gone. Treated as success when releasing a handle.
    pub fn is_soft_close_error(self) -> bool {
        matches!(
            self,
            Ft4222Status::Ok
                | Ft4222Status::DeviceNotOpened
                | Ft4222Status::InvalidHandle
                | Ft4222Status::DeviceNotFound
        )
    }

    /// Symbolic name as printed by the vendor tools
    pub fn name(self) -> &'static str {
        use Ft4222Status::*;
        match self {
            Ok => "OK",
            InvalidHandle => "INVALID_HANDLE",
            DeviceNotFound => "DEVICE_NOT_FOUND",
            DeviceNotOpened => "DEVICE_NOT_OPENED",
            IoError => "IO_ERROR",
            InsufficientResources => "INSUFFICIENT_RESOURCES",
            InvalidParameter => "INVALID_PARAMETER",
            InvalidBaudRate => "INVALID_BAUD_RATE",
            DeviceNotOpenedForErase => "DEVICE_NOT_OPENED_FOR_ERASE",
            DeviceNotOpenedForWrite => "DEVICE_NOT_OPENED_FOR_WRITE",
            FailedToWriteDevice => "FAILED_TO_WRITE_DEVICE",
            EepromReadFailed => "EEPROM_READ_FAILED",
            EepromWriteFailed => "EEPROM_WRITE_FAILED",
            EepromEraseFailed => "EEPROM_ERASE_FAILED",
            EepromNotPresent => "EEPROM_NOT_PRESENT",
            EepromNotProgrammed => "EEPROM_NOT_PROGRAMMED",
            InvalidArgs => "INVALID_ARGS",
            NotSupported => "NOT_SUPPORTED",
            OtherError => "OTHER_ERROR",
            DeviceListNotReady => "DEVICE_LIST_NOT_READY",
            DeviceNotSupported => "DEVICE_NOT_SUPPORTED",
            ClkNotSupported => "CLK_NOT_SUPPORTED",
            VendorCmdNotSupported => "VENDER_CMD_NOT_SUPPORTED",
            IsNotSpiMode => "IS_NOT_SPI_MODE",
            IsNotI2cMode => "IS_NOT_I2C_MODE",
            IsNotSpiSingleMode => "IS_NOT_SPI_SINGLE_MODE",
            IsNotSpiMultiMode => "IS_NOT_SPI_MULTI_MODE",
            WrongI2cAddr => "WRONG_I2C_ADDR",
            InvalidFunction => "INVAILD_FUNCTION",
            InvalidPointer => "INVALID_POINTER",
            ExceededMaxTransferSize => "EXCEEDED_MAX_TRANSFER_SIZE",
            FailedToReadDevice => "FAILED_TO_READ_DEVICE",
            I2cNotSupportedInThisMode => "I2C_NOT_SUPPORTED_IN_THIS_MODE",
            GpioNotSupportedInThisMode => "GPIO_NOT_SUPPORTED_IN_THIS_MODE",
            GpioExceededMaxPortnum => "GPIO_EXCEEDED_MAX_PORTNUM",
            GpioWriteNotSupported => "GPIO_WRITE_NOT_SUPPORTED",
            GpioPullupInvalidInInputmode => "GPIO_PULLUP_INVALID_IN_INPUTMODE",
            GpioPulldownInvalidInInputmode => "GPIO_PULLDOWN_INVALID_IN_INPUTMODE",
            GpioOpendrainInvalidInOutputmode => "GPIO_OPENDRAIN_INVALID_IN_OUTPUTMODE",
            InterruptNotSupported => "INTERRUPT_NOT_SUPPORTED",
            GpioInputNotSupported => "GPIO_INPUT_NOT_SUPPORTED",
            EventNotSupported => "EVENT_NOT_SUPPORTED",
            FunNotSupport => "FUN_NOT_SUPPORT",
        }
    }
}

impl fmt::Display for Ft4222Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_raw())
    }
}

impl std::error::Error for Ft4222Status {}

/// Result of a single native primitive
pub type NativeResult<T> = std::result::Result<T, Ft4222Status>;

/// Errors surfaced by the handle layer
#[derive(Debug, Error)]
pub enum Error {
    /// The short device info query failed, or the handle is unusable
    #[error("Invalid device handle")]
    InvalidHandle,

    /// The (description, device type) pair is not a known chip wiring
    #[error("Unsupported FT4222 configuration: '{description}' with device type {device_type}")]
    InvalidMode {
        description: String,
        device_type: DeviceType,
    },

    /// Device index outside `0..2^31`
    #[error("Invalid device index: {0} (must be in range 0..2^31)")]
    InvalidId(i64),

    /// A caller-supplied argument is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgs(String),

    /// The handle has already been consumed by a transition or close
    #[error("{0} handle is no longer open")]
    DeviceNotOpened(&'static str),

    /// Status returned verbatim by the native driver
    #[error("FT4222 driver error: {0}")]
    Status(#[from] Ft4222Status),

    /// GPIO was accepted during mode probing but could not be rolled back
    #[error("Failed to roll back GPIO probe ({0}); device state is indeterminate")]
    ProbeRollback(Ft4222Status),
}

impl Error {
    /// Whether the device must be considered unusable after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ProbeRollback(_))
    }

    /// Native status behind this error, if any
    pub fn status(&self) -> Option<Ft4222Status> {
        match self {
            Error::Status(s) | Error::ProbeRollback(s) => Some(*s),
            Error::InvalidHandle => Some(Ft4222Status::InvalidHandle),
            Error::DeviceNotOpened(_) => Some(Ft4222Status::DeviceNotOpened),
            Error::InvalidId(_) | Error::InvalidArgs(_) => Some(Ft4222Status::InvalidArgs),
            Error::InvalidMode { .. } => None,
        }
    }
}

/// Result type for handle operations
pub type Result<T> = std::result::Result<T, Error>;

/// A transition that was rejected
///
/// Returned by `init_*` and other consuming transitions when the native
/// call fails. The original handle is still live and is handed back so the
/// caller can retry or pick another transition. Converting into [`Error`]
/// drops (and thereby closes) the handle.
pub struct TransitionError<H> {
    handle: H,
    error: Error,
}

impl<H> TransitionError<H> {
    pub(crate) fn new(handle: H, error: Error) -> Self {
        Self { handle, error }
    }

    /// The error that caused the rejection
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Recover the still-live handle
    pub fn into_handle(self) -> H {
        self.handle
    }

    /// Split into the still-live handle and the error
    pub fn into_parts(self) -> (H, Error) {
        (self.handle, self.error)
    }
}

impl<H> fmt::Debug for TransitionError<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<H> fmt::Display for TransitionError<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl<H> std::error::Error for TransitionError<H> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<H> From<TransitionError<H>> for Error {
    fn from(e: TransitionError<H>) -> Self {
        e.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_known_codes() {
        assert_eq!(Ft4222Status::from_raw(16), Ft4222Status::InvalidArgs);
        assert_eq!(Ft4222Status::from_raw(1013), Ft4222Status::GpioNotSupportedInThisMode);
        assert_eq!(Ft4222Status::FunNotSupport.as_raw(), 1022);
        assert_eq!(Ft4222Status::from_raw(500), Ft4222Status::OtherError);
    }

    #[test]
    fn check_maps_ok_to_unit() {
        assert!(Ft4222Status::check(0).is_ok());
        assert_eq!(Ft4222Status::check(4), Err(Ft4222Status::IoError));
    }

    #[test]
    fn soft_close_errors() {
        assert!(Ft4222Status::DeviceNotFound.is_soft_close_error());
        assert!(Ft4222Status::InvalidHandle.is_soft_close_error());
        assert!(!Ft4222Status::IoError.is_soft_close_error());
    }

    #[test]
    fn rollback_is_fatal() {
        assert!(Error::ProbeRollback(Ft4222Status::IoError).is_fatal());
        assert!(!Error::Status(Ft4222Status::IoError).is_fatal());
        assert_eq!(
            Error::DeviceNotOpened("GPIO").status(),
            Some(Ft4222Status::DeviceNotOpened)
        );
    }
}
