//! SPI slave capability
//!
//! Two flavours exist: raw (bytes in, bytes out) and the FTDI framing
//! protocol described in AN_329, optionally without ACKs. Both come from a
//! [`DataStream`](crate::DataStream).

use super::{check_len, ClkPhase, ClkPolarity, SpiCommon};
use crate::error::Result;
use crate::handle::capability;

/// Framing used by the SPI slave engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IoProtocol {
    WithProtocol = 0,
    NoProtocol = 1,
    NoAck = 2,
}

/// Framing choices for [`SpiSlaveProto`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlaveProtocol {
    #[default]
    WithAck,
    NoAck,
}

impl From<SlaveProtocol> for IoProtocol {
    fn from(p: SlaveProtocol) -> Self {
        match p {
            SlaveProtocol::WithAck => IoProtocol::WithProtocol,
            SlaveProtocol::NoAck => IoProtocol::NoAck,
        }
    }
}

/// Operations shared by both SPI slave flavours
pub trait SpiSlaveCommon<'a>: SpiCommon<'a> {
    fn set_mode(&self, polarity: ClkPolarity, phase: ClkPhase) -> Result<()> {
        self.claim()
            .call(|lib, h| lib.spi_slave_set_mode(h, polarity, phase))
    }

    /// Number of bytes waiting in the receive queue
    fn get_rx_status(&self) -> Result<u16> {
        self.claim().call(|lib, h| lib.spi_slave_get_rx_status(h))
    }

    /// Read up to `len` bytes (1 to 65535) from the receive queue
    fn read(&self, len: usize) -> Result<Vec<u8>> {
        let len = check_len("SPI slave read", len)?;
        self.claim().call(|lib, h| lib.spi_slave_read(h, len))
    }

    /// Queue 1 to 65535 bytes for the master to clock out
    fn write(&self, data: &[u8]) -> Result<usize> {
        check_len("SPI slave write", data.len())?;
        self.claim()
            .call(|lib, h| lib.spi_slave_write(h, data))
            .map(usize::from)
    }
}

capability!(
    /// SPI slave without framing
    SpiSlaveRaw,
    DataStream,
    "SPI slave"
);

capability!(
    /// SPI slave using the FTDI framing protocol
    SpiSlaveProto,
    DataStream,
    "SPI slave"
);

impl<'a> SpiCommon<'a> for SpiSlaveRaw<'a> {}
impl<'a> SpiSlaveCommon<'a> for SpiSlaveRaw<'a> {}
impl<'a> SpiCommon<'a> for SpiSlaveProto<'a> {}
impl<'a> SpiSlaveCommon<'a> for SpiSlaveProto<'a> {}
