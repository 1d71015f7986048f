//! One claimed FT4222H interface
//!
//! [`UsbInterface`] owns the nusb interface and implements the vendor
//! requests the [`UsbDriver`](crate::UsbDriver) forwards to it. It knows
//! nothing about handle tables or native status codes.

use std::time::Duration;

use nusb::transfer::{Buffer, Bulk, ControlIn, ControlOut, ControlType, In, Out, Recipient};
use nusb::{Endpoint, Interface, MaybeFuture};
use rft4222_core::{
    BufferType, ClockRate, CsPolarity, Ft4222Status, IoMode, ShortDeviceInfo, SpiMasterConfig,
};

use crate::error::{Result, UsbError};
use crate::protocol::*;

const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);
const BULK_TIMEOUT: Duration = Duration::from_secs(30);

/// Where an interface sits on the bus, as found during enumeration
#[derive(Debug, Clone)]
pub struct InterfaceEntry {
    pub info: nusb::DeviceInfo,
    pub interface: u8,
    pub num_interfaces: u8,
    pub serial_number: String,
    pub description: String,
    pub location_id: u32,
}

impl InterfaceEntry {
    pub fn short_info(&self) -> ShortDeviceInfo {
        ShortDeviceInfo {
            device_type: device_type_for(self.num_interfaces),
            id: FT4222H_ID,
            serial_number: self.serial_number.clone(),
            description: self.description.clone(),
        }
    }
}

/// Protocol currently set up on an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Active {
    None,
    Gpio,
    SpiMaster,
}

/// An open FT4222H interface
pub struct UsbInterface {
    entry: InterfaceEntry,
    interface: Interface,
    control_index: u16,
    in_ep: u8,
    out_ep: u8,
    /// I/O lines the chip is currently set to
    io_lines: u8,
    /// Last clock written with SET_CLOCK; the chip powers up at 60 MHz
    clock: ClockRate,
    active: Active,
}

impl UsbInterface {
    /// Claim the interface described by `entry`
    pub fn open(entry: &InterfaceEntry) -> Result<Self> {
        log::debug!(
            "Opening FT4222H interface {} at bus {} address {}",
            entry.interface,
            entry.info.busnum(),
            entry.info.device_address()
        );

        let device = entry
            .info
            .open()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?;

        let config_desc = device
            .active_configuration()
            .map_err(|e| UsbError::OpenFailed(format!("Failed to get config: {}", e)))?;

        let mut in_ep: Option<u8> = None;
        let mut out_ep: Option<u8> = None;
        for iface in config_desc.interface_alt_settings() {
            if iface.interface_number() != entry.interface {
                continue;
            }
            for ep in iface.endpoints() {
                if ep.transfer_type() == nusb::descriptors::TransferType::Bulk {
                    if ep.direction() == nusb::transfer::Direction::In {
                        in_ep = Some(ep.address());
                    } else {
                        out_ep = Some(ep.address());
                    }
                }
            }
        }
        let in_ep =
            in_ep.ok_or_else(|| UsbError::OpenFailed("Could not find IN endpoint".to_string()))?;
        let out_ep =
            out_ep.ok_or_else(|| UsbError::OpenFailed("Could not find OUT endpoint".to_string()))?;

        let interface = device
            .claim_interface(entry.interface)
            .wait()
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;

        let control_index = control_index(config_desc.num_interfaces());
        log::debug!(
            "Using interface {}, IN EP 0x{:02X}, OUT EP 0x{:02X}, control_index {}",
            entry.interface,
            in_ep,
            out_ep,
            control_index
        );

        Ok(Self {
            entry: entry.clone(),
            interface,
            control_index,
            in_ep,
            out_ep,
            io_lines: 1,
            clock: ClockRate::default(),
            active: Active::None,
        })
    }

    pub fn entry(&self) -> &InterfaceEntry {
        &self.entry
    }

    pub fn active(&self) -> Active {
        self.active
    }

    pub fn clock(&self) -> ClockRate {
        self.clock
    }

    /// Chip version plus two firmware words
    pub fn get_version(&self) -> Result<[u32; 3]> {
        let data = self.control_in(FT4222_GET_VERSION, VERSION_RESPONSE_LEN)?;
        parse_version(&data).ok_or_else(|| {
            UsbError::InvalidResponse(format!(
                "Version response too short: {} < {}",
                data.len(),
                VERSION_RESPONSE_LEN
            ))
        })
    }

    /// Chip mode strapped by the DCNF pins (0 to 3)
    pub fn get_chip_mode(&self) -> Result<u8> {
        let data = self.control_in(FT4222_GET_CONFIG, CONFIG_RESPONSE_LEN)?;
        let mode = *data
            .first()
            .ok_or_else(|| UsbError::InvalidResponse("Empty response for config".into()))?;
        if channels_for_mode(mode).is_none() {
            return Err(UsbError::InvalidResponse(format!(
                "Unknown mode byte: 0x{:02x}",
                mode
            )));
        }
        log::debug!("FT4222H mode: {}", mode);
        Ok(mode)
    }

    /// Reset the serial engine and drain both buffers
    pub fn reset(&self) -> Result<()> {
        // wIndex = 0 here, not control_index
        self.control_out_with_index(FT4222_RESET_REQUEST, FT4222_RESET_SIO, 0, &[])?;
        self.purge(BufferType::RX | BufferType::TX);
        log::debug!("FT4222H reset complete");
        Ok(())
    }

    /// Flush chip-side buffers; failures are logged and otherwise ignored
    pub fn purge(&self, mask: BufferType) {
        if mask.contains(BufferType::TX) {
            for _ in 0..OUTPUT_FLUSH_COUNT {
                if let Err(e) = self.control_out(FT4222_RESET_REQUEST, FT4222_OUTPUT_FLUSH) {
                    log::warn!("FT4222 output flush failed: {}", e);
                    break;
                }
            }
        }
        if mask.contains(BufferType::RX) {
            if let Err(e) = self.control_out(FT4222_RESET_REQUEST, FT4222_INPUT_FLUSH) {
                log::warn!("FT4222 input flush failed: {}", e);
            }
        }
    }

    pub fn set_clock(&mut self, clock: ClockRate) -> Result<()> {
        self.config_request(FT4222_SET_CLOCK, clock.as_raw() as u8)?;
        self.clock = clock;
        log::debug!("Set system clock to {} MHz", clock.to_khz() / 1000);
        Ok(())
    }

    /// Accept GPIO only on the interface the chip mode routes it to
    pub fn gpio_init(&mut self) -> Result<()> {
        let mode = self.get_chip_mode()?;
        if gpio_interface_for_mode(mode) != Some(self.entry.interface) {
            return Err(UsbError::Native(Ft4222Status::GpioNotSupportedInThisMode));
        }
        self.active = Active::Gpio;
        Ok(())
    }

    /// Put the interface into SPI master mode
    pub fn configure_spi_master(&mut self, config: &SpiMasterConfig) -> Result<()> {
        let mode = self.get_chip_mode()?;
        let channels = channels_for_mode(mode).unwrap_or(1);
        let cs = config.sso_map.bits().trailing_zeros() as u8;
        if config.sso_map.is_empty() || cs >= channels {
            return Err(UsbError::InvalidParameter(format!(
                "CS{} not available (device has {} channels)",
                cs, channels
            )));
        }

        self.reset()?;

        self.config_request(FT4222_SPI_RESET_TRANSACTION, cs)?;
        self.io_lines = config.io_mode.lines();
        self.config_request(FT4222_SPI_SET_IO_LINES, self.io_lines)?;
        self.config_request(FT4222_SPI_SET_CLK_DIV, config.clk_div.as_raw())?;
        self.config_request(FT4222_SPI_SET_CLK_IDLE, config.clk_polarity as u8)?;
        self.config_request(FT4222_SPI_SET_CAPTURE, config.clk_phase as u8)?;
        self.config_request(FT4222_SPI_SET_CS_ACTIVE, CsPolarity::ActiveLow as u8)?;
        self.config_request(FT4222_SPI_SET_CS_MASK, config.sso_map.bits())?;
        self.config_request(FT4222_SET_MODE, FT4222_MODE_SPI_MASTER)?;

        self.active = Active::SpiMaster;
        log::debug!(
            "FT4222H SPI master: CS mask 0x{:02X}, {:?}, {} kHz",
            config.sso_map.bits(),
            config.io_mode,
            self.clock.to_khz() / config.clk_div.divisor()
        );
        Ok(())
    }

    /// Leave the current protocol
    pub fn uninitialize(&mut self) -> Result<()> {
        if self.active == Active::SpiMaster {
            self.config_request(FT4222_SPI_RESET, FT4222_SPI_RESET_FULL)?;
            self.io_lines = 1;
        }
        self.active = Active::None;
        Ok(())
    }

    pub fn spi_reset(&self) -> Result<()> {
        self.config_request(FT4222_SPI_RESET, FT4222_SPI_RESET_FULL)
    }

    pub fn spi_reset_transaction(&self, index: u8) -> Result<()> {
        self.config_request(FT4222_SPI_RESET_TRANSACTION, index)
    }

    pub fn set_cs_polarity(&self, polarity: CsPolarity) -> Result<()> {
        self.config_request(FT4222_SPI_SET_CS_ACTIVE, polarity as u8)
    }

    /// Switch the number of data lines
    pub fn set_io_lines(&mut self, mode: IoMode) -> Result<()> {
        let lines = mode.lines();
        if lines != self.io_lines {
            self.config_request(FT4222_SPI_SET_IO_LINES, lines)?;
            self.config_request(FT4222_SPI_RESET, FT4222_SPI_RESET_LINE_NUM)?;
            self.io_lines = lines;
            log::trace!("Set I/O lines to {}", lines);
        }
        Ok(())
    }

    /// Full-duplex single I/O exchange
    ///
    /// Every byte clocked out clocks one byte in, so the IN side always
    /// has to be drained, even for a pure write.
    pub fn spi_exchange(&mut self, out: &[u8], end_transaction: bool) -> Result<Vec<u8>> {
        if self.io_lines != 1 {
            return Err(UsbError::Native(Ft4222Status::IsNotSpiSingleMode));
        }
        if out.is_empty() {
            return Ok(Vec::new());
        }
        self.bulk_write(out)?;
        if end_transaction {
            // An empty packet deasserts CS
            self.bulk_write(&[])?;
        }
        let response = self.bulk_read(out.len())?;
        if response.len() != out.len() {
            return Err(UsbError::InvalidResponse(format!(
                "Expected {} bytes, got {}",
                out.len(),
                response.len()
            )));
        }
        Ok(response)
    }

    /// Half-duplex multi I/O transfer
    ///
    /// Format: | header | single-I/O phase | multi-I/O write phase |, then
    /// the multi-I/O read phase comes back on the IN endpoint.
    pub fn spi_transfer_multi(
        &mut self,
        single_write: &[u8],
        multi_write: &[u8],
        multi_read_len: usize,
    ) -> Result<Vec<u8>> {
        if self.io_lines == 1 {
            return Err(UsbError::Native(Ft4222Status::IsNotSpiMultiMode));
        }

        let header = multi_io_header(single_write.len(), multi_write.len(), multi_read_len);
        let mut out_buf =
            Vec::with_capacity(MULTI_IO_HEADER_SIZE + single_write.len() + multi_write.len());
        out_buf.extend_from_slice(&header);
        out_buf.extend_from_slice(single_write);
        out_buf.extend_from_slice(multi_write);

        self.bulk_write(&out_buf)?;
        self.bulk_write(&[])?;

        if multi_read_len > 0 {
            self.bulk_read(multi_read_len)
        } else {
            Ok(Vec::new())
        }
    }

    fn control_in(&self, value: u16, length: u16) -> Result<Vec<u8>> {
        let data = self
            .interface
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request: FT4222_INFO_REQUEST,
                    value,
                    index: self.control_index,
                    length,
                },
                CONTROL_TIMEOUT,
            )
            .wait()
            .map_err(|e| UsbError::TransferFailed(format!("Info request failed: {}", e)))?;
        Ok(data)
    }

    fn control_out(&self, request: u8, value: u16) -> Result<()> {
        self.control_out_with_index(request, value, self.control_index, &[])
    }

    fn control_out_with_index(&self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<()> {
        self.interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    data,
                },
                CONTROL_TIMEOUT,
            )
            .wait()
            .map_err(|e| UsbError::TransferFailed(format!("Control transfer failed: {}", e)))?;
        Ok(())
    }

    fn config_request(&self, cmd: u8, data: u8) -> Result<()> {
        log::trace!("config 0x{:02X} <- 0x{:02X}", cmd, data);
        self.control_out(FT4222_CONFIG_REQUEST, config_value(cmd, data))
    }

    fn bulk_write(&mut self, data: &[u8]) -> Result<()> {
        let mut out_ep: Endpoint<Bulk, Out> = self
            .interface
            .endpoint(self.out_ep)
            .map_err(|e| UsbError::TransferFailed(e.to_string()))?;

        if data.is_empty() {
            out_ep
                .transfer_blocking(Buffer::new(0), BULK_TIMEOUT)
                .into_result()
                .map_err(|e| UsbError::TransferFailed(format!("Empty packet failed: {}", e)))?;
            log::trace!("Bulk write empty packet (CS deassert)");
            return Ok(());
        }

        for (i, chunk) in data.chunks(WRITE_CHUNK_SIZE).enumerate() {
            let mut out_buf = Buffer::new(chunk.len());
            out_buf.extend_from_slice(chunk);
            out_ep
                .transfer_blocking(out_buf, BULK_TIMEOUT)
                .into_result()
                .map_err(|e| {
                    UsbError::TransferFailed(format!(
                        "Bulk write failed at offset {}: {}",
                        i * WRITE_CHUNK_SIZE,
                        e
                    ))
                })?;
        }

        log::trace!("Bulk write {} bytes", data.len());
        Ok(())
    }

    fn bulk_read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut in_ep: Endpoint<Bulk, In> = self
            .interface
            .endpoint(self.in_ep)
            .map_err(|e| UsbError::TransferFailed(e.to_string()))?;

        let max_packet_size = in_ep.max_packet_size();
        let mut result = Vec::with_capacity(len);
        let mut remaining = len;

        while remaining > 0 {
            let aligned_len = read_request_len(remaining, max_packet_size);
            let mut in_buf = Buffer::new(aligned_len);
            in_buf.set_requested_len(aligned_len);

            let data = in_ep
                .transfer_blocking(in_buf, BULK_TIMEOUT)
                .into_result()
                .map_err(|e| UsbError::TransferFailed(format!("Bulk read failed: {}", e)))?;

            if data.len() < MODEM_STATUS_SIZE {
                return Err(UsbError::InvalidResponse("Response too short".into()));
            }

            // Each packet starts with two modem status bytes
            for packet in data.chunks(max_packet_size) {
                let payload = packet.get(MODEM_STATUS_SIZE..).unwrap_or(&[]);
                let to_copy = std::cmp::min(payload.len(), remaining);
                result.extend_from_slice(&payload[..to_copy]);
                remaining -= to_copy;
            }
        }

        log::trace!("Bulk read {} bytes", result.len());
        Ok(result)
    }
}
