//! Ownership of a native handle
//!
//! Every stream and capability handle stores its [`FtHandle`] in a
//! [`Claim`]. The claim is the only place that checks liveness, the only
//! place that releases the native handle, and the only place a handle moves
//! from one owner to the next.
//!
//! The module is private; its `pub` items are reachable from the public
//! handle traits but cannot be named or implemented outside the crate.

use crate::driver::{Driver, FtHandle};
use crate::error::{Error, NativeResult, Result};
use crate::stream::ModeTag;

/// What the native handle is currently initialized as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Plain open handle wrapped by a stream handle
    Stream(ModeTag),
    /// Protocol-initialized handle wrapped by a capability
    Protocol(&'static str),
}

impl Role {
    fn name(self) -> &'static str {
        match self {
            Role::Stream(tag) => tag.name(),
            Role::Protocol(name) => name,
        }
    }
}

/// Exclusive owner of one native handle
pub struct Claim<'a> {
    lib: &'a dyn Driver,
    handle: Option<FtHandle>,
    role: Role,
}

impl<'a> Claim<'a> {
    pub(crate) fn new(lib: &'a dyn Driver, handle: FtHandle, role: Role) -> Self {
        Self {
            lib,
            handle: Some(handle),
            role,
        }
    }

    pub(crate) fn role(&self) -> Role {
        self.role
    }

    pub(crate) fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Borrow the native handle, failing once it has been consumed
    pub(crate) fn get(&self) -> Result<&FtHandle> {
        self.handle
            .as_ref()
            .ok_or(Error::DeviceNotOpened(self.role.name()))
    }

    /// Run one native primitive against the live handle
    pub(crate) fn call<T>(
        &self,
        op: impl FnOnce(&dyn Driver, &FtHandle) -> NativeResult<T>,
    ) -> Result<T> {
        let handle = self.get()?;
        op(self.lib, handle).map_err(Error::Status)
    }

    /// Move the native handle into a fresh claim with a new role
    ///
    /// `self` is left empty in the same step, so there is never a moment
    /// with two live owners. A spent claim transfers into a spent claim.
    pub(crate) fn transfer(mut self, role: Role) -> Claim<'a> {
        log::debug!("{} -> {}", self.role.name(), role.name());
        Claim {
            lib: self.lib,
            handle: self.handle.take(),
            role,
        }
    }

    /// Close the native handle without uninitializing first
    ///
    /// A second call is a no-op. Statuses meaning "already gone" are
    /// treated as success.
    pub(crate) fn close(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        log::debug!("Closing {} handle", self.role.name());
        match self.lib.close(handle) {
            Err(status) if !status.is_soft_close_error() => Err(Error::Status(status)),
            _ => Ok(()),
        }
    }

    /// Release the handle: uninitialize a protocol handle, then close
    pub(crate) fn release(&mut self) -> Result<()> {
        if let (Role::Protocol(name), Some(handle)) = (self.role, self.handle.as_ref()) {
            if let Err(status) = self.lib.uninitialize(handle) {
                log::warn!("Failed to uninitialize {} before close: {}", name, status);
            }
        }
        self.close()
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            log::trace!("Dropping live {} handle", self.role.name());
            if let Err(e) = self.release() {
                log::warn!("Failed to release {} handle: {}", self.role.name(), e);
            }
        }
    }
}

/// Access to the claim behind a handle type
pub trait Owner<'a> {
    fn claim(&self) -> &Claim<'a>;

    fn into_claim(self) -> Claim<'a>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceType;
    use crate::driver::testing::Recorder;
    use crate::gpio::PortId;

    fn gpio_claim(lib: &Recorder) -> Claim<'_> {
        Claim::new(lib, FtHandle::from_raw(1), Role::Protocol("GPIO"))
    }

    #[test]
    fn spent_claim_reports_device_not_opened() {
        let lib = Recorder::new("FT4222 B", DeviceType::Dev4222H0);
        let mut claim = gpio_claim(&lib);
        claim.release().unwrap();

        let err = claim.call(|lib, h| lib.gpio_read(h, PortId::Port0)).unwrap_err();
        assert!(matches!(err, Error::DeviceNotOpened("GPIO")));
        assert_eq!(lib.count("gpio_read"), 0);
    }

    #[test]
    fn close_twice_is_noop() {
        let lib = Recorder::new("FT4222 A", DeviceType::Dev4222H0);
        let mut claim = Claim::new(&lib, FtHandle::from_raw(1), Role::Stream(ModeTag::DataStream));
        claim.close().unwrap();
        claim.close().unwrap();
        drop(claim);
        assert_eq!(lib.count("close"), 1);
    }

    #[test]
    fn transfer_moves_ownership() {
        let lib = Recorder::new("FT4222 B", DeviceType::Dev4222H0);
        let stream = Claim::new(&lib, FtHandle::from_raw(1), Role::Stream(ModeTag::Gpio));
        let gpio = stream.transfer(Role::Protocol("GPIO"));
        assert!(gpio.is_live());
        // The emptied stream claim was dropped without touching the device
        assert_eq!(lib.count("close"), 0);
        drop(gpio);
        assert_eq!(lib.count("uninitialize"), 1);
        assert_eq!(lib.count("close"), 1);
    }

    #[test]
    fn drop_releases_protocol_handle() {
        let lib = Recorder::new("FT4222 B", DeviceType::Dev4222H0);
        drop(gpio_claim(&lib));
        assert_eq!(*lib.calls.borrow(), vec!["uninitialize", "close"]);
    }
}
