//! FT4222H USB protocol constants and helpers
//!
//! The FT4222H speaks a vendor-specific protocol over control and bulk
//! transfers. Configuration goes through the control endpoint, payload
//! through one bulk IN/OUT pair per interface.

use rft4222_core::DeviceType;

// ============================================================================
// USB device identifiers
// ============================================================================

/// FTDI vendor ID
pub const FTDI_VID: u16 = 0x0403;
/// FT4222H product ID
pub const FT4222H_PID: u16 = 0x601C;

/// Combined ID as reported in the device list
pub const FT4222H_ID: u32 = ((FTDI_VID as u32) << 16) | FT4222H_PID as u32;

// ============================================================================
// Control requests
// ============================================================================

pub const FT4222_RESET_REQUEST: u8 = 0x00;
pub const FT4222_INFO_REQUEST: u8 = 0x20;
pub const FT4222_CONFIG_REQUEST: u8 = 0x21;

/// Reset command values (wValue for RESET_REQUEST)
pub const FT4222_RESET_SIO: u16 = 0x0000;
pub const FT4222_OUTPUT_FLUSH: u16 = 0x0001;
pub const FT4222_INPUT_FLUSH: u16 = 0x0002;

/// Info command values (wValue for INFO_REQUEST)
pub const FT4222_GET_VERSION: u16 = 0x0000;
pub const FT4222_GET_CONFIG: u16 = 0x0001;

pub const VERSION_RESPONSE_LEN: u16 = 12;
pub const CONFIG_RESPONSE_LEN: u16 = 13;

/// Config command codes (lower byte of wValue for CONFIG_REQUEST)
pub const FT4222_SET_CLOCK: u8 = 0x04;
pub const FT4222_SET_MODE: u8 = 0x05;
pub const FT4222_SPI_SET_IO_LINES: u8 = 0x42;
pub const FT4222_SPI_SET_CS_ACTIVE: u8 = 0x43;
pub const FT4222_SPI_SET_CLK_DIV: u8 = 0x44;
pub const FT4222_SPI_SET_CLK_IDLE: u8 = 0x45;
pub const FT4222_SPI_SET_CAPTURE: u8 = 0x46;
pub const FT4222_SPI_SET_CS_MASK: u8 = 0x48;
pub const FT4222_SPI_RESET_TRANSACTION: u8 = 0x49;
pub const FT4222_SPI_RESET: u8 = 0x4A;

/// SPI reset types (data byte for FT4222_SPI_RESET)
pub const FT4222_SPI_RESET_FULL: u8 = 0;
pub const FT4222_SPI_RESET_LINE_NUM: u8 = 1;

/// Mode values (data byte for SET_MODE)
pub const FT4222_MODE_SPI_MASTER: u8 = 3;

/// Output flushes sent per purge; the chip needs several to drain
pub const OUTPUT_FLUSH_COUNT: usize = 6;

// ============================================================================
// Bulk transfers
// ============================================================================

/// Modem status bytes at the start of each IN packet
pub const MODEM_STATUS_SIZE: usize = 2;

/// Largest IN request
pub const READ_BUFFER_SIZE: usize = 2048;

/// Largest OUT chunk; bigger writes stall the endpoint
pub const WRITE_CHUNK_SIZE: usize = 2048;

/// Multi-I/O header: | 0x8 | single_len:4 | write_len:16 | read_len:16 |
pub const MULTI_IO_HEADER_SIZE: usize = 5;
pub const MULTI_IO_MAGIC: u8 = 0x80;

// ============================================================================
// Helpers
// ============================================================================

/// Encode a config request: wValue = (data << 8) | cmd
pub fn config_value(cmd: u8, data: u8) -> u16 {
    ((data as u16) << 8) | cmd as u16
}

/// wIndex used for config requests
///
/// LibFT4222 addresses interface 1 whenever the chip exposes more than one.
pub fn control_index(num_interfaces: u8) -> u16 {
    if num_interfaces > 1 {
        1
    } else {
        0
    }
}

/// Build the header of a multi-I/O transfer
///
/// Lengths must already be validated (single <= 15, others <= 65535).
pub fn multi_io_header(single_len: usize, write_len: usize, read_len: usize) -> [u8; MULTI_IO_HEADER_SIZE] {
    let write = (write_len as u16).to_le_bytes();
    let read = (read_len as u16).to_le_bytes();
    [
        MULTI_IO_MAGIC | (single_len as u8 & 0x0F),
        write[0],
        write[1],
        read[0],
        read[1],
    ]
}

/// Decode the GET_VERSION response: chip version plus two firmware words
pub fn parse_version(data: &[u8]) -> Option<[u32; 3]> {
    if data.len() < VERSION_RESPONSE_LEN as usize {
        return None;
    }
    let word = |i: usize| u32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
    Some([word(0), word(4), word(8)])
}

/// Chip-select lines available in a chip mode (GET_CONFIG byte 0)
pub fn channels_for_mode(mode: u8) -> Option<u8> {
    match mode {
        0 => Some(1),
        1 => Some(3),
        2 => Some(4),
        3 => Some(1),
        _ => None,
    }
}

/// Interface carrying the GPIO function in a chip mode
///
/// Only modes 0 and 1 route GPIO to USB, always on their last interface.
pub fn gpio_interface_for_mode(mode: u8) -> Option<u8> {
    match mode {
        0 => Some(1),
        1 => Some(3),
        _ => None,
    }
}

/// Device type the vendor driver reports, derived from the interface count
pub fn device_type_for(num_interfaces: u8) -> DeviceType {
    match num_interfaces {
        1 => DeviceType::Dev4222H3,
        2 => DeviceType::Dev4222H0,
        4 => DeviceType::Dev4222H1_2,
        _ => DeviceType::Unknown,
    }
}

fn interface_letter(index: u8) -> char {
    (b'A' + index) as char
}

/// Description of one interface: "FT4222 A", "FT4222 B", ... or "FT4222"
pub fn interface_description(num_interfaces: u8, index: u8) -> String {
    if num_interfaces == 1 {
        "FT4222".to_string()
    } else {
        format!("FT4222 {}", interface_letter(index))
    }
}

/// Serial number of one interface: the device serial plus the interface letter
pub fn interface_serial(serial: &str, num_interfaces: u8, index: u8) -> String {
    if num_interfaces == 1 {
        serial.to_string()
    } else {
        format!("{}{}", serial, interface_letter(index))
    }
}

/// Location ID unique per bus, address and interface
pub fn location_id(bus: u8, address: u8, interface: u8) -> u32 {
    ((bus as u32) << 12) | ((address as u32) << 4) | (interface as u32 & 0x0F)
}

/// Size of the next IN request for `remaining` payload bytes
pub fn read_request_len(remaining: usize, max_packet_size: usize) -> usize {
    let request_len = std::cmp::min(remaining + MODEM_STATUS_SIZE, READ_BUFFER_SIZE);
    request_len.div_ceil(max_packet_size) * max_packet_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_value() {
        assert_eq!(config_value(FT4222_SPI_SET_CS_MASK, 1 << 2), 0x0448);
        assert_eq!(config_value(FT4222_SET_MODE, FT4222_MODE_SPI_MASTER), 0x0305);
        assert_eq!(control_index(4), 1);
        assert_eq!(control_index(1), 0);
    }

    #[test]
    fn test_multi_io_header() {
        assert_eq!(
            multi_io_header(4, 0x0102, 0x0300),
            [0x84, 0x02, 0x01, 0x00, 0x03]
        );
        assert_eq!(multi_io_header(15, 0, 0xFFFF), [0x8F, 0, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_parse_version() {
        let mut data = vec![0x42, 0x22, 0x04, 0x00];
        data.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(parse_version(&data), Some([0x4222_0400, 1, 2]));
        assert_eq!(parse_version(&data[..11]), None);
    }

    #[test]
    fn test_interface_naming() {
        assert_eq!(interface_description(2, 1), "FT4222 B");
        assert_eq!(interface_description(4, 3), "FT4222 D");
        assert_eq!(interface_description(1, 0), "FT4222");
        assert_eq!(interface_serial("FT1234", 4, 0), "FT1234A");
        assert_eq!(interface_serial("FT1234", 1, 0), "FT1234");
    }

    #[test]
    fn test_mode_layout() {
        assert_eq!(device_type_for(1), DeviceType::Dev4222H3);
        assert_eq!(device_type_for(2), DeviceType::Dev4222H0);
        assert_eq!(device_type_for(4), DeviceType::Dev4222H1_2);
        assert_eq!(device_type_for(3), DeviceType::Unknown);
        assert_eq!(channels_for_mode(2), Some(4));
        assert_eq!(channels_for_mode(7), None);
        assert_eq!(gpio_interface_for_mode(0), Some(1));
        assert_eq!(gpio_interface_for_mode(1), Some(3));
        assert_eq!(gpio_interface_for_mode(2), None);
    }

    #[test]
    fn test_location_id() {
        assert_eq!(location_id(1, 5, 2), 0x1052);
        assert_ne!(location_id(1, 5, 0), location_id(1, 5, 1));
    }

    #[test]
    fn test_read_request_len() {
        assert_eq!(read_request_len(10, 512), 512);
        assert_eq!(read_request_len(600, 512), 1024);
        assert_eq!(read_request_len(100_000, 512), 2048);
    }
}
