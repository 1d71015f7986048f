//! I2C slave capability

use crate::claim::Owner;
use crate::error::{Error, Result};
use crate::handle::capability;
use crate::spi::check_len;

capability!(
    /// I2C slave handle
    I2cSlave,
    DataStream,
    "I2C slave"
);

impl I2cSlave<'_> {
    /// Reset the slave controller; settings are kept
    pub fn reset(&self) -> Result<()> {
        self.claim().call(|lib, h| lib.i2c_slave_reset(h))
    }

    pub fn get_address(&self) -> Result<u8> {
        self.claim().call(|lib, h| lib.i2c_slave_get_address(h))
    }

    /// Set the 7-bit slave address
    ///
    /// The FT4222H datasheet gives slave mode 7-bit addressing only, and
    /// `FT4222_I2CSlave_SetAddress` in LibFT4222 takes a `uint8`.
    /// Values above 0x7F are rejected before reaching the driver.
    pub fn set_address(&self, addr: u8) -> Result<()> {
        if addr > 0x7F {
            return Err(Error::InvalidArgs(format!(
                "I2C slave address 0x{:02x} is not a 7-bit address",
                addr
            )));
        }
        self.claim().call(|lib, h| lib.i2c_slave_set_address(h, addr))
    }

    /// Number of bytes waiting in the receive queue
    pub fn get_rx_status(&self) -> Result<u16> {
        self.claim().call(|lib, h| lib.i2c_slave_get_rx_status(h))
    }

    pub fn read(&self, len: usize) -> Result<Vec<u8>> {
        let len = check_len("I2C slave read", len)?;
        self.claim().call(|lib, h| lib.i2c_slave_read(h, len))
    }

    pub fn write(&self, data: &[u8]) -> Result<usize> {
        check_len("I2C slave write", data.len())?;
        self.claim()
            .call(|lib, h| lib.i2c_slave_write(h, data))
            .map(usize::from)
    }

    /// Clock stretching is off after init
    pub fn set_clock_stretch(&self, enable: bool) -> Result<()> {
        self.claim()
            .call(|lib, h| lib.i2c_slave_set_clock_stretch(h, enable))
    }

    /// Byte sent when the master reads from an empty transmit queue
    ///
    /// Only used while clock stretching is disabled. Defaults to 0xFF.
    pub fn set_resp_word(&self, word: u8) -> Result<()> {
        self.claim()
            .call(|lib, h| lib.i2c_slave_set_resp_word(h, word))
    }
}
