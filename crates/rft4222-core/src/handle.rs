//! Operations shared by every live handle
//!
//! Stream handles and capability handles both own a native handle through a
//! `Claim`. [`CommonOps`] exposes the chip-wide accessors on either kind;
//! [`Capability`] adds the inverse transition back to the stream handle a
//! capability was carved out of.
//!
//! Both traits are sealed. Import them (or [`crate::prelude`]) to call
//! their methods.

use crate::claim::{Owner, Role};
use crate::device::{BufferType, ClockRate, DriverVersion, GpioTrigger, ShortDeviceInfo, SwChipVersion};
use crate::error::Result;
use crate::stream::StreamHandle;

/// Chip-wide accessors available on any live handle
pub trait CommonOps<'a>: Owner<'a> {
    /// Set the system clock
    fn set_clock(&self, rate: ClockRate) -> Result<()> {
        self.claim().call(|lib, h| lib.set_clock(h, rate))
    }

    /// Current system clock
    fn get_clock(&self) -> Result<ClockRate> {
        self.claim().call(|lib, h| lib.get_clock(h))
    }

    /// Enable or disable wake-up from suspend on GPIO3
    fn set_wakeup_interrupt(&self, enable: bool) -> Result<()> {
        self.claim().call(|lib, h| lib.set_wakeup_interrupt(h, enable))
    }

    /// Trigger condition of the interrupt pin (GPIO3)
    fn set_interrupt_trigger(&self, trigger: GpioTrigger) -> Result<()> {
        self.claim().call(|lib, h| lib.set_interrupt_trigger(h, trigger))
    }

    /// Drive the suspend-out signal on GPIO2
    fn set_suspend_out(&self, enable: bool) -> Result<()> {
        self.claim().call(|lib, h| lib.set_suspend_out(h, enable))
    }

    /// Largest single USB transfer the current mode accepts
    fn get_max_transfer_size(&self) -> Result<u16> {
        self.claim().call(|lib, h| lib.get_max_transfer_size(h))
    }

    fn get_version(&self) -> Result<SwChipVersion> {
        self.claim().call(|lib, h| lib.get_version(h))
    }

    fn get_device_info(&self) -> Result<ShortDeviceInfo> {
        self.claim().call(|lib, h| lib.get_device_info(h))
    }

    fn get_driver_version(&self) -> Result<DriverVersion> {
        self.claim().call(|lib, h| lib.get_driver_version(h))
    }

    fn purge_buffers(&self, mask: BufferType) -> Result<()> {
        self.claim().call(|lib, h| lib.purge(h, mask))
    }

    /// Reset the chip and release the handle
    ///
    /// The device re-enumerates afterwards and must be opened again.
    fn chip_reset(self) -> Result<()>
    where
        Self: Sized,
    {
        let mut claim = self.into_claim();
        log::info!("Resetting FT4222 chip");
        claim.call(|lib, h| lib.chip_reset(h))?;
        claim.close()
    }

    /// Reset the USB device and release the handle
    fn reset_device(self) -> Result<()>
    where
        Self: Sized,
    {
        let mut claim = self.into_claim();
        claim.call(|lib, h| lib.reset_device(h))?;
        claim.close()
    }
}

/// A protocol-initialized handle that remembers its origin stream type
pub trait Capability<'a>: CommonOps<'a> + Sized {
    /// Stream handle type this capability returns to
    type Origin: StreamHandle<'a>;

    /// Strip the protocol and get the stream handle back
    ///
    /// The returned handle has the same mode tag as the one `init_*` was
    /// called on. If the native call fails the handle is released.
    fn uninitialize(self) -> Result<Self::Origin> {
        let claim = self.into_claim();
        claim.call(|lib, h| lib.uninitialize(h))?;
        let claim = claim.transfer(Role::Stream(Self::Origin::TAG));
        Ok(Self::Origin::from_claim(claim))
    }

    /// Uninitialize and close in one step
    fn close(self) -> Result<()> {
        self.uninitialize()?.close()
    }
}

/// Declare a capability handle whose origin is a fixed stream type
macro_rules! capability {
    ($(#[$meta:meta])* $name:ident, $origin:ident, $proto:expr) => {
        $(#[$meta])*
        pub struct $name<'a> {
            claim: $crate::claim::Claim<'a>,
        }

        impl<'a> $name<'a> {
            pub(crate) fn from_claim(claim: $crate::claim::Claim<'a>) -> Self {
                debug_assert_eq!(claim.role(), $crate::claim::Role::Protocol($proto));
                Self { claim }
            }
        }

        impl<'a> $crate::claim::Owner<'a> for $name<'a> {
            fn claim(&self) -> &$crate::claim::Claim<'a> {
                &self.claim
            }

            fn into_claim(self) -> $crate::claim::Claim<'a> {
                self.claim
            }
        }

        impl<'a> $crate::handle::CommonOps<'a> for $name<'a> {}

        impl<'a> $crate::handle::Capability<'a> for $name<'a> {
            type Origin = $crate::stream::$origin<'a>;
        }

        impl ::std::fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("live", &self.claim.is_live())
                    .finish()
            }
        }
    };
}

pub(crate) use capability;
