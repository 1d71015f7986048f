//! GPIO capability
//!
//! Available on a [`GpioStream`](crate::GpioStream). The four pins can be
//! read, driven, and monitored through a per-pin trigger queue.

use crate::claim::Owner;
use crate::device::GpioTrigger;
use crate::error::{Error, Result};
use crate::handle::capability;

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Output = 0,
    Input = 1,
}

/// One of the four GPIO pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PortId {
    Port0 = 0,
    Port1 = 1,
    Port2 = 2,
    Port3 = 3,
}

impl PortId {
    pub const ALL: [PortId; 4] = [PortId::Port0, PortId::Port1, PortId::Port2, PortId::Port3];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for PortId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        PortId::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| Error::InvalidArgs(format!("GPIO port {} out of range (0..=3)", value)))
    }
}

/// Largest number of events one trigger-queue read may return
pub const MAX_TRIGGER_EVENTS: usize = u16::MAX as usize;

capability!(
    /// GPIO-initialized handle
    Gpio,
    GpioStream,
    "GPIO"
);

impl Gpio<'_> {
    /// Sample the level of a pin
    pub fn read(&self, port: PortId) -> Result<bool> {
        self.claim().call(|lib, h| lib.gpio_read(h, port))
    }

    /// Drive an output pin
    pub fn write(&self, port: PortId, state: bool) -> Result<()> {
        self.claim().call(|lib, h| lib.gpio_write(h, port, state))
    }

    /// Select which edges or levels queue events on an input pin
    pub fn set_input_trigger(&self, port: PortId, trigger: GpioTrigger) -> Result<()> {
        self.claim()
            .call(|lib, h| lib.gpio_set_input_trigger(h, port, trigger))
    }

    /// Number of events waiting in the trigger queue of `port`
    pub fn get_queued_trigger_event_count(&self, port: PortId) -> Result<u16> {
        self.claim().call(|lib, h| lib.gpio_get_trigger_status(h, port))
    }

    /// Pop up to `max_events` (1 to 65535) events from the trigger queue
    pub fn read_trigger_queue(&self, port: PortId, max_events: usize) -> Result<Vec<GpioTrigger>> {
        if !(1..=MAX_TRIGGER_EVENTS).contains(&max_events) {
            return Err(Error::InvalidArgs(format!(
                "max_events {} out of range (1..={})",
                max_events, MAX_TRIGGER_EVENTS
            )));
        }
        self.claim()
            .call(|lib, h| lib.gpio_read_trigger_queue(h, port, max_events as u16))
    }

    /// Enable waveform mode, where the trigger queue records every level
    pub fn set_waveform_mode(&self, enable: bool) -> Result<()> {
        self.claim().call(|lib, h| lib.gpio_set_waveform_mode(h, enable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_from_index() {
        assert_eq!(PortId::try_from(3).unwrap(), PortId::Port3);
        assert!(matches!(PortId::try_from(4), Err(Error::InvalidArgs(_))));
    }
}
