//! Error types for the USB backend

use std::fmt;

use rft4222_core::Ft4222Status;

/// Result type for USB backend operations
pub type Result<T> = std::result::Result<T, UsbError>;

/// Errors that can occur while talking to the FT4222H over raw USB
#[derive(Debug)]
pub enum UsbError {
    /// Device not found
    DeviceNotFound,
    /// Failed to open device
    OpenFailed(String),
    /// Failed to claim interface
    ClaimFailed(String),
    /// USB transfer failed
    TransferFailed(String),
    /// Invalid response from device
    InvalidResponse(String),
    /// Invalid parameter
    InvalidParameter(String),
    /// The chip refused the request in its current mode
    Native(Ft4222Status),
}

impl fmt::Display for UsbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsbError::DeviceNotFound => {
                write!(f, "FT4222H device not found (VID:0403 PID:601c)")
            }
            UsbError::OpenFailed(msg) => write!(f, "Failed to open FT4222H: {}", msg),
            UsbError::ClaimFailed(msg) => write!(f, "Failed to claim interface: {}", msg),
            UsbError::TransferFailed(msg) => write!(f, "USB transfer failed: {}", msg),
            UsbError::InvalidResponse(msg) => {
                write!(f, "Invalid response from FT4222H: {}", msg)
            }
            UsbError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            UsbError::Native(status) => write!(f, "FT4222H refused request: {}", status),
        }
    }
}

impl std::error::Error for UsbError {}

impl From<nusb::Error> for UsbError {
    fn from(e: nusb::Error) -> Self {
        UsbError::TransferFailed(e.to_string())
    }
}

impl From<Ft4222Status> for UsbError {
    fn from(status: Ft4222Status) -> Self {
        UsbError::Native(status)
    }
}

impl From<UsbError> for Ft4222Status {
    /// Closest native status, so callers see the same codes as with LibFT4222
    fn from(e: UsbError) -> Self {
        match e {
            UsbError::DeviceNotFound => Ft4222Status::DeviceNotFound,
            UsbError::OpenFailed(_) | UsbError::ClaimFailed(_) => Ft4222Status::DeviceNotOpened,
            UsbError::TransferFailed(_) => Ft4222Status::IoError,
            UsbError::InvalidResponse(_) => Ft4222Status::OtherError,
            UsbError::InvalidParameter(_) => Ft4222Status::InvalidParameter,
            UsbError::Native(status) => status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_native_status() {
        let status: Ft4222Status = UsbError::TransferFailed("stall".into()).into();
        assert_eq!(status, Ft4222Status::IoError);
        let status: Ft4222Status = UsbError::ClaimFailed("busy".into()).into();
        assert_eq!(status, Ft4222Status::DeviceNotOpened);
        let status: Ft4222Status =
            UsbError::Native(Ft4222Status::GpioNotSupportedInThisMode).into();
        assert_eq!(status, Ft4222Status::GpioNotSupportedInThisMode);
    }
}
