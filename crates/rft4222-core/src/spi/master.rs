//! SPI master capability
//!
//! Single I/O mode is full duplex; dual and quad modes are half duplex and
//! use a three-phase transfer (single-line command, multi-line write,
//! multi-line read). A master handle can switch between the two with
//! [`SpiMasterSingle::set_io_mode`] / [`SpiMasterMulti::set_io_mode`], which
//! consume the handle and return one of the other type.
//!
//! Master handles are generic over the stream handle they were created
//! from, so `uninitialize` gives back a [`DataStream`](crate::DataStream)
//! or a [`SpiMasterStream`](crate::SpiMasterStream) as appropriate.

use std::fmt;
use std::marker::PhantomData;

use bitflags::bitflags;

use super::{ClkPhase, ClkPolarity, SpiCommon};
use crate::claim::{Claim, Owner, Role};
use crate::error::{Error, Result, TransitionError};
use crate::handle::{Capability, CommonOps};
use crate::stream::StreamHandle;

/// Largest payload of one native single-mode call
pub const MAX_SINGLE_CHUNK: usize = u16::MAX as usize;

/// Largest single-line phase of a multi-I/O transfer
pub const MAX_MULTI_SINGLE_WRITE: usize = 15;

/// Largest multi-line write or read phase
pub const MAX_MULTI_DATA: usize = u16::MAX as usize;

const PROTOCOL: &str = "SPI master";

/// Number of data lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum IoMode {
    #[default]
    Single = 1,
    Dual = 2,
    Quad = 4,
}

impl IoMode {
    pub fn lines(self) -> u8 {
        self as u8
    }

    /// Parse "single", "dual" or "quad"
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "1" => Some(IoMode::Single),
            "dual" | "2" => Some(IoMode::Dual),
            "quad" | "4" => Some(IoMode::Quad),
            _ => None,
        }
    }
}

/// Divisor applied to the system clock to derive SCK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ClkDiv {
    Div2 = 1,
    Div4 = 2,
    #[default]
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
    Div256 = 8,
    Div512 = 9,
}

impl ClkDiv {
    pub const ALL: [ClkDiv; 9] = [
        ClkDiv::Div2,
        ClkDiv::Div4,
        ClkDiv::Div8,
        ClkDiv::Div16,
        ClkDiv::Div32,
        ClkDiv::Div64,
        ClkDiv::Div128,
        ClkDiv::Div256,
        ClkDiv::Div512,
    ];

    pub fn divisor(self) -> u32 {
        1 << (self as u32)
    }

    pub fn as_raw(self) -> u8 {
        self as u8
    }

    /// Look up a divisor by its numeric value (2, 4, ... 512)
    pub fn from_divisor(divisor: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.divisor() == divisor)
    }
}

/// Active level of the chip-select lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CsPolarity {
    #[default]
    ActiveLow = 0,
    ActiveHigh = 1,
}

bitflags! {
    /// Slave-select outputs driven during a transfer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SsoMap: u8 {
        const SS_0 = 1;
        const SS_1 = 2;
        const SS_2 = 4;
        const SS_3 = 8;
    }
}

impl Default for SsoMap {
    fn default() -> Self {
        SsoMap::SS_0
    }
}

/// SPI master settings applied by `init_*_spi_master`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpiMasterConfig {
    pub io_mode: IoMode,
    pub clk_div: ClkDiv,
    pub clk_polarity: ClkPolarity,
    pub clk_phase: ClkPhase,
    pub sso_map: SsoMap,
}

impl SpiMasterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the I/O mode (normally chosen by the `init_*` call)
    pub fn with_io_mode(mut self, io_mode: IoMode) -> Self {
        self.io_mode = io_mode;
        self
    }

    pub fn with_clk_div(mut self, clk_div: ClkDiv) -> Self {
        self.clk_div = clk_div;
        self
    }

    /// Set polarity and phase from an SPI mode number (0 to 3)
    pub fn with_mode(mut self, mode: u8) -> Result<Self> {
        let (pol, pha) = ClkPolarity::mode(mode)
            .ok_or_else(|| Error::InvalidArgs(format!("SPI mode {} out of range (0..=3)", mode)))?;
        self.clk_polarity = pol;
        self.clk_phase = pha;
        Ok(self)
    }

    pub fn with_sso_map(mut self, sso_map: SsoMap) -> Self {
        self.sso_map = sso_map;
        self
    }
}

/// SPI master in single I/O mode
pub struct SpiMasterSingle<'a, S> {
    claim: Claim<'a>,
    origin: PhantomData<fn() -> S>,
}

/// SPI master in dual or quad I/O mode
pub struct SpiMasterMulti<'a, S> {
    claim: Claim<'a>,
    origin: PhantomData<fn() -> S>,
}

/// Either kind of SPI master, as returned by `set_io_mode`
pub enum SpiMaster<'a, S> {
    Single(SpiMasterSingle<'a, S>),
    Multi(SpiMasterMulti<'a, S>),
}

fn set_lines<'a, H: Owner<'a>>(
    handle: H,
    mode: IoMode,
) -> std::result::Result<Claim<'a>, TransitionError<H>> {
    match handle.claim().call(|lib, h| lib.spi_master_set_lines(h, mode)) {
        Ok(()) => {
            log::debug!("SPI master switched to {:?} I/O", mode);
            Ok(handle.into_claim())
        }
        Err(e) => Err(TransitionError::new(handle, e)),
    }
}

fn wrap_lines<'a, S>(claim: Claim<'a>, mode: IoMode) -> SpiMaster<'a, S> {
    match mode {
        IoMode::Single => SpiMaster::Single(SpiMasterSingle::from_claim(claim)),
        IoMode::Dual | IoMode::Quad => SpiMaster::Multi(SpiMasterMulti::from_claim(claim)),
    }
}

impl<'a, S> SpiMasterSingle<'a, S> {
    pub(crate) fn from_claim(claim: Claim<'a>) -> Self {
        debug_assert_eq!(claim.role(), Role::Protocol(PROTOCOL));
        Self {
            claim,
            origin: PhantomData,
        }
    }

    /// Select the active level of the chip-select lines
    pub fn set_cs_polarity(&self, polarity: CsPolarity) -> Result<()> {
        self.claim
            .call(|lib, h| lib.spi_master_set_cs_polarity(h, polarity))
    }

    /// Switch the number of data lines, re-typing the handle
    pub fn set_io_mode(
        self,
        mode: IoMode,
    ) -> std::result::Result<SpiMaster<'a, S>, TransitionError<Self>> {
        set_lines(self, mode).map(|claim| wrap_lines(claim, mode))
    }

    /// Clock in `len` bytes
    ///
    /// Longer reads are split into native calls of at most 65535 bytes;
    /// chip select is held between them and `end_transaction` only applies
    /// to the last one.
    pub fn single_read(&self, len: usize, end_transaction: bool) -> Result<Vec<u8>> {
        if len == 0 {
            return Err(Error::InvalidArgs("read length must be non-zero".into()));
        }
        let mut data = Vec::with_capacity(len);
        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(MAX_SINGLE_CHUNK);
            remaining -= chunk;
            let end = end_transaction && remaining == 0;
            let part = self
                .claim
                .call(|lib, h| lib.spi_master_single_read(h, chunk as u16, end))?;
            data.extend_from_slice(&part);
        }
        log::trace!("SPI single read {} bytes", data.len());
        Ok(data)
    }

    /// Clock out `data`, returning the number of bytes sent
    pub fn single_write(&self, data: &[u8], end_transaction: bool) -> Result<usize> {
        if data.is_empty() {
            return Err(Error::InvalidArgs("write data must be non-empty".into()));
        }
        let mut written = 0;
        let mut chunks = data.chunks(MAX_SINGLE_CHUNK).peekable();
        while let Some(chunk) = chunks.next() {
            let end = end_transaction && chunks.peek().is_none();
            written += self
                .claim
                .call(|lib, h| lib.spi_master_single_write(h, chunk, end))? as usize;
        }
        log::trace!("SPI single write {} bytes", written);
        Ok(written)
    }

    /// Full-duplex exchange; returns as many bytes as were sent
    pub fn single_read_write(&self, data: &[u8], end_transaction: bool) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(Error::InvalidArgs("write data must be non-empty".into()));
        }
        let mut read = Vec::with_capacity(data.len());
        let mut chunks = data.chunks(MAX_SINGLE_CHUNK).peekable();
        while let Some(chunk) = chunks.next() {
            let end = end_transaction && chunks.peek().is_none();
            let part = self
                .claim
                .call(|lib, h| lib.spi_master_single_read_write(h, chunk, end))?;
            read.extend_from_slice(&part);
        }
        Ok(read)
    }
}

impl<'a, S> SpiMasterMulti<'a, S> {
    pub(crate) fn from_claim(claim: Claim<'a>) -> Self {
        debug_assert_eq!(claim.role(), Role::Protocol(PROTOCOL));
        Self {
            claim,
            origin: PhantomData,
        }
    }

    pub fn set_cs_polarity(&self, polarity: CsPolarity) -> Result<()> {
        self.claim
            .call(|lib, h| lib.spi_master_set_cs_polarity(h, polarity))
    }

    /// Switch the number of data lines, re-typing the handle
    pub fn set_io_mode(
        self,
        mode: IoMode,
    ) -> std::result::Result<SpiMaster<'a, S>, TransitionError<Self>> {
        set_lines(self, mode).map(|claim| wrap_lines(claim, mode))
    }

    /// Three-phase half-duplex transfer
    ///
    /// `single_write` (0 to 15 bytes) goes out on one line, `multi_write`
    /// (0 to 65535 bytes) on all lines, then `read_len` (0 to 65535) bytes
    /// are read on all lines. At least one phase must be non-empty.
    pub fn multi_read_write(
        &self,
        single_write: &[u8],
        multi_write: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>> {
        if single_write.len() > MAX_MULTI_SINGLE_WRITE {
            return Err(Error::InvalidArgs(format!(
                "single-line phase of {} bytes exceeds {}",
                single_write.len(),
                MAX_MULTI_SINGLE_WRITE
            )));
        }
        if multi_write.len() > MAX_MULTI_DATA {
            return Err(Error::InvalidArgs(format!(
                "multi-line write of {} bytes exceeds {}",
                multi_write.len(),
                MAX_MULTI_DATA
            )));
        }
        if read_len > MAX_MULTI_DATA {
            return Err(Error::InvalidArgs(format!(
                "multi-line read of {} bytes exceeds {}",
                read_len, MAX_MULTI_DATA
            )));
        }
        if single_write.len() + multi_write.len() + read_len == 0 {
            return Err(Error::InvalidArgs(
                "total number of bytes to read and write must be non-zero".into(),
            ));
        }
        self.claim.call(|lib, h| {
            lib.spi_master_multi_read_write(h, single_write, multi_write, read_len as u16)
        })
    }
}

impl<'a, S> Owner<'a> for SpiMasterSingle<'a, S> {
    fn claim(&self) -> &Claim<'a> {
        &self.claim
    }

    fn into_claim(self) -> Claim<'a> {
        self.claim
    }
}

impl<'a, S> Owner<'a> for SpiMasterMulti<'a, S> {
    fn claim(&self) -> &Claim<'a> {
        &self.claim
    }

    fn into_claim(self) -> Claim<'a> {
        self.claim
    }
}

impl<'a, S> CommonOps<'a> for SpiMasterSingle<'a, S> {}
impl<'a, S> CommonOps<'a> for SpiMasterMulti<'a, S> {}
impl<'a, S> SpiCommon<'a> for SpiMasterSingle<'a, S> {}
impl<'a, S> SpiCommon<'a> for SpiMasterMulti<'a, S> {}

impl<'a, S: StreamHandle<'a>> Capability<'a> for SpiMasterSingle<'a, S> {
    type Origin = S;
}

impl<'a, S: StreamHandle<'a>> Capability<'a> for SpiMasterMulti<'a, S> {
    type Origin = S;
}

impl<'a, S: StreamHandle<'a>> SpiMaster<'a, S> {
    pub fn uninitialize(self) -> Result<S> {
        match self {
            SpiMaster::Single(m) => m.uninitialize(),
            SpiMaster::Multi(m) => m.uninitialize(),
        }
    }

    pub fn close(self) -> Result<()> {
        self.uninitialize()?.close()
    }
}

impl<S> fmt::Debug for SpiMasterSingle<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpiMasterSingle")
            .field("live", &self.claim.is_live())
            .finish()
    }
}

impl<S> fmt::Debug for SpiMasterMulti<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpiMasterMulti")
            .field("live", &self.claim.is_live())
            .finish()
    }
}

impl<S> fmt::Debug for SpiMaster<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpiMaster::Single(m) => m.fmt(f),
            SpiMaster::Multi(m) => m.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_divisors() {
        assert_eq!(ClkDiv::Div2.divisor(), 2);
        assert_eq!(ClkDiv::Div512.divisor(), 512);
        assert_eq!(ClkDiv::from_divisor(64), Some(ClkDiv::Div64));
        assert_eq!(ClkDiv::from_divisor(3), None);
        assert_eq!(ClkDiv::Div16.as_raw(), 4);
    }

    #[test]
    fn config_builder() {
        let cfg = SpiMasterConfig::new()
            .with_clk_div(ClkDiv::Div4)
            .with_mode(3)
            .unwrap()
            .with_sso_map(SsoMap::SS_1);
        assert_eq!(cfg.clk_polarity, ClkPolarity::IdleHigh);
        assert_eq!(cfg.clk_phase, ClkPhase::Trailing);
        assert_eq!(cfg.sso_map.bits(), 2);
        assert!(SpiMasterConfig::new().with_mode(7).is_err());
    }

    #[test]
    fn io_mode_parse() {
        assert_eq!(IoMode::parse("QUAD"), Some(IoMode::Quad));
        assert_eq!(IoMode::parse("octal"), None);
        assert_eq!(IoMode::Dual.lines(), 2);
    }
}
