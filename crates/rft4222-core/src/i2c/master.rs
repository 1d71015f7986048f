//! I2C master capability

use std::ops::RangeInclusive;

use bitflags::bitflags;

use crate::claim::Owner;
use crate::error::{Error, Result};
use crate::handle::capability;
use crate::spi::check_len;

/// Accepted bus speeds in kbit/s
pub const KBPS_RANGE: RangeInclusive<u32> = 60..=3400;

bitflags! {
    /// START/STOP conditions framing an extended transfer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TransactionFlag: u8 {
        /// No START or STOP, continue the current transaction
        const NONE           = 0x80;
        const START          = 0x02;
        /// Repeated START; no master code is sent in high-speed mode
        const REPEATED_START = 0x03;
        const STOP           = 0x04;
        const START_AND_STOP = 0x06;
    }
}

bitflags! {
    /// Controller status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CtrlStatus: u8 {
        const CONTROLLER_BUSY  = 1 << 0;
        const ERROR            = 1 << 1;
        const SLAVE_ADDR_NACK  = 1 << 2;
        const DATA_NACK        = 1 << 3;
        const ARBITRATION_LOST = 1 << 4;
        const IDLE             = 1 << 5;
        const BUS_BUSY         = 1 << 6;
    }
}

capability!(
    /// I2C master handle
    I2cMaster,
    DataStream,
    "I2C master"
);

fn check_addr(addr: u32) -> Result<u16> {
    u16::try_from(addr)
        .map_err(|_| Error::InvalidArgs(format!("I2C address 0x{:x} out of range (0..=0xFFFF)", addr)))
}

impl I2cMaster<'_> {
    /// Read `len` bytes (1 to 65535) from the device at `addr`
    pub fn read(&self, addr: u32, len: usize) -> Result<Vec<u8>> {
        let addr = check_addr(addr)?;
        let len = check_len("I2C read", len)?;
        self.claim().call(|lib, h| lib.i2c_master_read(h, addr, len))
    }

    /// Write 1 to 65535 bytes to the device at `addr`
    pub fn write(&self, addr: u32, data: &[u8]) -> Result<usize> {
        let addr = check_addr(addr)?;
        check_len("I2C write", data.len())?;
        self.claim()
            .call(|lib, h| lib.i2c_master_write(h, addr, data))
            .map(usize::from)
    }

    /// Read with explicit START/STOP framing
    pub fn read_ex(&self, addr: u32, flag: TransactionFlag, len: usize) -> Result<Vec<u8>> {
        let addr = check_addr(addr)?;
        let len = check_len("I2C read", len)?;
        self.claim()
            .call(|lib, h| lib.i2c_master_read_ex(h, addr, flag, len))
    }

    /// Write with explicit START/STOP framing
    pub fn write_ex(&self, addr: u32, flag: TransactionFlag, data: &[u8]) -> Result<usize> {
        let addr = check_addr(addr)?;
        check_len("I2C write", data.len())?;
        self.claim()
            .call(|lib, h| lib.i2c_master_write_ex(h, addr, flag, data))
            .map(usize::from)
    }

    pub fn get_status(&self) -> Result<CtrlStatus> {
        self.claim().call(|lib, h| lib.i2c_master_get_status(h))
    }

    /// Reset the controller; settings are kept
    pub fn reset(&self) -> Result<()> {
        self.claim().call(|lib, h| lib.i2c_master_reset(h))
    }

    /// Clock SCL to free a bus held low by a slave
    pub fn reset_bus(&self) -> Result<()> {
        self.claim().call(|lib, h| lib.i2c_master_reset_bus(h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_range() {
        assert_eq!(check_addr(0x50).unwrap(), 0x50);
        assert_eq!(check_addr(0xFFFF).unwrap(), 0xFFFF);
        assert!(check_addr(0x1_0000).is_err());
    }

    #[test]
    fn speed_range() {
        assert!(KBPS_RANGE.contains(&100));
        assert!(KBPS_RANGE.contains(&3400));
        assert!(!KBPS_RANGE.contains(&59));
    }
}
