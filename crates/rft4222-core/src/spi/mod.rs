//! SPI capabilities
//!
//! The master side lives in [`master`], the slave side in [`slave`]. Both
//! share the bus-level operations of [`SpiCommon`].

pub mod master;
pub mod slave;

use crate::error::Result;
use crate::handle::CommonOps;

/// Clock idle level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ClkPolarity {
    #[default]
    IdleLow = 0,
    IdleHigh = 1,
}

/// Clock edge on which data is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ClkPhase {
    #[default]
    Leading = 0,
    Trailing = 1,
}

impl ClkPolarity {
    /// Polarity and phase for a classic SPI mode number (0 to 3)
    pub fn mode(mode: u8) -> Option<(ClkPolarity, ClkPhase)> {
        let pol = if mode & 0b10 != 0 {
            ClkPolarity::IdleHigh
        } else {
            ClkPolarity::IdleLow
        };
        let pha = if mode & 0b01 != 0 {
            ClkPhase::Trailing
        } else {
            ClkPhase::Leading
        };
        (mode <= 3).then_some((pol, pha))
    }
}

/// Output drive strength of a pin group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DriveStrength {
    #[default]
    Ds4mA = 0,
    Ds8mA = 1,
    Ds12mA = 2,
    Ds16mA = 3,
}

/// Index of an SPI transaction slot (0 to 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionIdx(u8);

impl TransactionIdx {
    pub fn new(index: u8) -> Option<Self> {
        (index <= 3).then_some(TransactionIdx(index))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Bus operations shared by SPI master and SPI slave handles
pub trait SpiCommon<'a>: CommonOps<'a> {
    /// Reset the SPI engine; all settings are kept
    fn reset_bus(&self) -> Result<()> {
        self.claim().call(|lib, h| lib.spi_reset(h))
    }

    /// Purge buffers and reset the state of one transaction slot
    fn reset_transaction(&self, index: TransactionIdx) -> Result<()> {
        self.claim()
            .call(|lib, h| lib.spi_reset_transaction(h, index.get()))
    }

    /// Drive strength of the clock, data and slave-select pins
    fn set_driving_strength(
        &self,
        clk: DriveStrength,
        io: DriveStrength,
        sso: DriveStrength,
    ) -> Result<()> {
        self.claim()
            .call(|lib, h| lib.spi_set_driving_strength(h, clk, io, sso))
    }
}

/// Check a single-call transfer length (1 to 65535 bytes)
pub(crate) fn check_len(what: &str, len: usize) -> Result<u16> {
    match u16::try_from(len) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(crate::Error::InvalidArgs(format!(
            "{} length {} out of range (1..=65535)",
            what, len
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spi_modes() {
        assert_eq!(
            ClkPolarity::mode(0),
            Some((ClkPolarity::IdleLow, ClkPhase::Leading))
        );
        assert_eq!(
            ClkPolarity::mode(3),
            Some((ClkPolarity::IdleHigh, ClkPhase::Trailing))
        );
        assert_eq!(ClkPolarity::mode(4), None);
    }

    #[test]
    fn transfer_length_bounds() {
        assert!(check_len("read", 0).is_err());
        assert_eq!(check_len("read", 65535).unwrap(), 65535);
        assert!(check_len("read", 65536).is_err());
        assert!(TransactionIdx::new(4).is_none());
    }
}
