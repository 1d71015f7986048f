//! rft4222-d2xx - FT4222H driver over the vendor libraries
//!
//! Forwards every [`Driver`] primitive to LibFT4222 (`libft4222`) and the
//! D2XX library (`libftd2xx`). Both shared objects must be installed; the
//! crate is only built with the `d2xx` feature of the CLI.
//!
//! Status codes are passed through unchanged, so callers see exactly what
//! the vendor library reported.

mod ffi;

use std::ffi::CString;
use std::ptr;

use libc::{c_char, c_void};
use rft4222_core::{
    BufferType, ClockRate, CsPolarity, CtrlStatus, DeviceFlags, DeviceInfo, DeviceType, Direction,
    DriveStrength, Driver, DriverVersion, Ft4222Status, FtHandle, GpioTrigger, IoMode,
    NativeResult, OpenTarget, PortId, ShortDeviceInfo, SpiMasterConfig, SwChipVersion,
    TransactionFlag,
};
use rft4222_core::spi::slave::IoProtocol;
use rft4222_core::{ClkPhase, ClkPolarity};

use ffi::*;

/// Driver backed by LibFT4222 and D2XX
#[derive(Debug, Default)]
pub struct D2xxDriver {
    _private: (),
}

impl D2xxDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check(status: FT_STATUS) -> NativeResult<()> {
    let result = Ft4222Status::check(status);
    if let Err(e) = result {
        log::trace!("native call returned {}", e);
    }
    result
}

fn raw(handle: &FtHandle) -> FT_HANDLE {
    handle.as_raw() as FT_HANDLE
}

fn bool_arg(value: bool) -> BOOL {
    value as BOOL
}

/// Decode a NUL-terminated buffer filled in by the library
fn c_buf_to_string(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn c_string(s: &str) -> NativeResult<CString> {
    CString::new(s).map_err(|_| Ft4222Status::InvalidArgs)
}

/// Transfer length as the library's 16-bit count
fn len_u16(len: usize) -> NativeResult<u16> {
    u16::try_from(len).map_err(|_| Ft4222Status::InvalidArgs)
}

fn len_u8(len: usize) -> NativeResult<u8> {
    u8::try_from(len).map_err(|_| Ft4222Status::InvalidArgs)
}

/// Truncate a read buffer to what the library reported
fn filled(mut buf: Vec<u8>, len: usize) -> Vec<u8> {
    buf.truncate(len);
    buf
}

impl Driver for D2xxDriver {
    fn create_device_info_list(&self) -> NativeResult<u32> {
        let mut count: DWORD = 0;
        check(unsafe { FT_CreateDeviceInfoList(&mut count) })?;
        Ok(count)
    }

    fn get_device_info_detail(&self, index: u32) -> NativeResult<DeviceInfo> {
        let mut flags: DWORD = 0;
        let mut ty: DWORD = 0;
        let mut id: DWORD = 0;
        let mut loc: DWORD = 0;
        let mut serial = [0 as c_char; SERIAL_BUF_LEN];
        let mut description = [0 as c_char; DESCRIPTION_BUF_LEN];
        let mut handle: FT_HANDLE = ptr::null_mut();
        check(unsafe {
            FT_GetDeviceInfoDetail(
                index,
                &mut flags,
                &mut ty,
                &mut id,
                &mut loc,
                serial.as_mut_ptr(),
                description.as_mut_ptr(),
                &mut handle,
            )
        })?;
        Ok(DeviceInfo {
            index,
            flags: DeviceFlags::from_bits_truncate(flags),
            device_type: DeviceType::from_raw(ty),
            id,
            location_id: loc,
            serial_number: c_buf_to_string(&serial),
            description: c_buf_to_string(&description),
        })
    }

    fn open(&self, index: u32) -> NativeResult<FtHandle> {
        let index = i32::try_from(index).map_err(|_| Ft4222Status::InvalidArgs)?;
        let mut handle: FT_HANDLE = ptr::null_mut();
        check(unsafe { FT_Open(index, &mut handle) })?;
        Ok(FtHandle::from_raw(handle as usize))
    }

    fn open_ex(&self, target: OpenTarget<'_>) -> NativeResult<FtHandle> {
        let mut handle: FT_HANDLE = ptr::null_mut();
        let status = match target {
            OpenTarget::Serial(serial) => {
                let arg = c_string(serial)?;
                unsafe {
                    FT_OpenEx(
                        arg.as_ptr() as *mut c_void,
                        FT_OPEN_BY_SERIAL_NUMBER,
                        &mut handle,
                    )
                }
            }
            OpenTarget::Description(description) => {
                let arg = c_string(description)?;
                unsafe {
                    FT_OpenEx(
                        arg.as_ptr() as *mut c_void,
                        FT_OPEN_BY_DESCRIPTION,
                        &mut handle,
                    )
                }
            }
            // libftd2xx on Linux has no location lookup
            #[cfg(target_os = "linux")]
            OpenTarget::Location(_) => return Err(Ft4222Status::NotSupported),
            #[cfg(not(target_os = "linux"))]
            OpenTarget::Location(loc) => unsafe {
                // The location is passed by value in the pointer argument
                FT_OpenEx(loc as usize as *mut c_void, FT_OPEN_BY_LOCATION, &mut handle)
            },
        };
        check(status)?;
        Ok(FtHandle::from_raw(handle as usize))
    }

    fn close(&self, handle: FtHandle) -> NativeResult<()> {
        check(unsafe { FT_Close(raw(&handle)) })
    }

    fn get_device_info(&self, handle: &FtHandle) -> NativeResult<ShortDeviceInfo> {
        let mut ty: DWORD = 0;
        let mut id: DWORD = 0;
        let mut serial = [0 as c_char; SERIAL_BUF_LEN];
        let mut description = [0 as c_char; DESCRIPTION_BUF_LEN];
        check(unsafe {
            FT_GetDeviceInfo(
                raw(handle),
                &mut ty,
                &mut id,
                serial.as_mut_ptr(),
                description.as_mut_ptr(),
                ptr::null_mut(),
            )
        })?;
        Ok(ShortDeviceInfo {
            device_type: DeviceType::from_raw(ty),
            id,
            serial_number: c_buf_to_string(&serial),
            description: c_buf_to_string(&description),
        })
    }

    fn get_driver_version(&self, handle: &FtHandle) -> NativeResult<DriverVersion> {
        let mut version: DWORD = 0;
        check(unsafe { FT_GetDriverVersion(raw(handle), &mut version) })?;
        Ok(DriverVersion(version))
    }

    fn purge(&self, handle: &FtHandle, mask: BufferType) -> NativeResult<()> {
        check(unsafe { FT_Purge(raw(handle), mask.bits()) })
    }

    fn reset_device(&self, handle: &FtHandle) -> NativeResult<()> {
        check(unsafe { FT_ResetDevice(raw(handle)) })
    }

    fn uninitialize(&self, handle: &FtHandle) -> NativeResult<()> {
        check(unsafe { FT4222_UnInitialize(raw(handle)) })
    }

    fn set_clock(&self, handle: &FtHandle, rate: ClockRate) -> NativeResult<()> {
        check(unsafe { FT4222_SetClock(raw(handle), rate.as_raw()) })
    }

    fn get_clock(&self, handle: &FtHandle) -> NativeResult<ClockRate> {
        let mut clk = 0;
        check(unsafe { FT4222_GetClock(raw(handle), &mut clk) })?;
        ClockRate::from_raw(clk).ok_or(Ft4222Status::OtherError)
    }

    fn set_wakeup_interrupt(&self, handle: &FtHandle, enable: bool) -> NativeResult<()> {
        check(unsafe { FT4222_SetWakeUpInterrupt(raw(handle), bool_arg(enable)) })
    }

    fn set_interrupt_trigger(&self, handle: &FtHandle, trigger: GpioTrigger) -> NativeResult<()> {
        check(unsafe { FT4222_SetInterruptTrigger(raw(handle), trigger.bits()) })
    }

    fn set_suspend_out(&self, handle: &FtHandle, enable: bool) -> NativeResult<()> {
        check(unsafe { FT4222_SetSuspendOut(raw(handle), bool_arg(enable)) })
    }

    fn get_max_transfer_size(&self, handle: &FtHandle) -> NativeResult<u16> {
        let mut size = 0u16;
        check(unsafe { FT4222_GetMaxTransferSize(raw(handle), &mut size) })?;
        Ok(size)
    }

    fn get_version(&self, handle: &FtHandle) -> NativeResult<SwChipVersion> {
        let mut version = FT4222_Version::default();
        check(unsafe { FT4222_GetVersion(raw(handle), &mut version) })?;
        Ok(SwChipVersion {
            chip_version: version.chipVersion,
            dll_version: version.dllVersion,
        })
    }

    fn chip_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        check(unsafe { FT4222_ChipReset(raw(handle)) })
    }

    // --- GPIO ---

    fn gpio_init(&self, handle: &FtHandle, dirs: [Direction; 4]) -> NativeResult<()> {
        let mut dirs = dirs.map(|d| d as u32);
        check(unsafe { FT4222_GPIO_Init(raw(handle), dirs.as_mut_ptr()) })
    }

    fn gpio_read(&self, handle: &FtHandle, port: PortId) -> NativeResult<bool> {
        let mut value: BOOL = 0;
        check(unsafe { FT4222_GPIO_Read(raw(handle), port as u32, &mut value) })?;
        Ok(value != 0)
    }

    fn gpio_write(&self, handle: &FtHandle, port: PortId, state: bool) -> NativeResult<()> {
        check(unsafe { FT4222_GPIO_Write(raw(handle), port as u32, bool_arg(state)) })
    }

    fn gpio_set_input_trigger(
        &self,
        handle: &FtHandle,
        port: PortId,
        trigger: GpioTrigger,
    ) -> NativeResult<()> {
        check(unsafe { FT4222_GPIO_SetInputTrigger(raw(handle), port as u32, trigger.bits()) })
    }

    fn gpio_get_trigger_status(&self, handle: &FtHandle, port: PortId) -> NativeResult<u16> {
        let mut queued = 0u16;
        check(unsafe { FT4222_GPIO_GetTriggerStatus(raw(handle), port as u32, &mut queued) })?;
        Ok(queued)
    }

    fn gpio_read_trigger_queue(
        &self,
        handle: &FtHandle,
        port: PortId,
        max_events: u16,
    ) -> NativeResult<Vec<GpioTrigger>> {
        let mut events = vec![0u32; max_events as usize];
        let mut read = 0u16;
        check(unsafe {
            FT4222_GPIO_ReadTriggerQueue(
                raw(handle),
                port as u32,
                events.as_mut_ptr(),
                max_events,
                &mut read,
            )
        })?;
        events.truncate(read as usize);
        Ok(events
            .into_iter()
            .map(GpioTrigger::from_bits_truncate)
            .collect())
    }

    fn gpio_set_waveform_mode(&self, handle: &FtHandle, enable: bool) -> NativeResult<()> {
        check(unsafe { FT4222_GPIO_SetWaveFormMode(raw(handle), bool_arg(enable)) })
    }

    // --- SPI ---

    fn spi_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        check(unsafe { FT4222_SPI_Reset(raw(handle)) })
    }

    fn spi_reset_transaction(&self, handle: &FtHandle, index: u8) -> NativeResult<()> {
        check(unsafe { FT4222_SPI_ResetTransaction(raw(handle), index) })
    }

    fn spi_set_driving_strength(
        &self,
        handle: &FtHandle,
        clk: DriveStrength,
        io: DriveStrength,
        sso: DriveStrength,
    ) -> NativeResult<()> {
        check(unsafe {
            FT4222_SPI_SetDrivingStrength(raw(handle), clk as u32, io as u32, sso as u32)
        })
    }

    fn spi_master_init(&self, handle: &FtHandle, config: &SpiMasterConfig) -> NativeResult<()> {
        check(unsafe {
            FT4222_SPIMaster_Init(
                raw(handle),
                config.io_mode as u32,
                config.clk_div.as_raw() as u32,
                config.clk_polarity as u32,
                config.clk_phase as u32,
                config.sso_map.bits(),
            )
        })
    }

    fn spi_master_set_cs_polarity(&self, handle: &FtHandle, polarity: CsPolarity) -> NativeResult<()> {
        check(unsafe { FT4222_SPIMaster_SetCS(raw(handle), polarity as u32) })
    }

    fn spi_master_set_lines(&self, handle: &FtHandle, mode: IoMode) -> NativeResult<()> {
        check(unsafe { FT4222_SPIMaster_SetLines(raw(handle), mode as u32) })
    }

    fn spi_master_single_read(
        &self,
        handle: &FtHandle,
        len: u16,
        end_transaction: bool,
    ) -> NativeResult<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        let mut read = 0u16;
        check(unsafe {
            FT4222_SPIMaster_SingleRead(
                raw(handle),
                buf.as_mut_ptr(),
                len,
                &mut read,
                bool_arg(end_transaction),
            )
        })?;
        Ok(filled(buf, read as usize))
    }

    fn spi_master_single_write(
        &self,
        handle: &FtHandle,
        data: &[u8],
        end_transaction: bool,
    ) -> NativeResult<u16> {
        let len = len_u16(data.len())?;
        let mut buf = data.to_vec();
        let mut written = 0u16;
        check(unsafe {
            FT4222_SPIMaster_SingleWrite(
                raw(handle),
                buf.as_mut_ptr(),
                len,
                &mut written,
                bool_arg(end_transaction),
            )
        })?;
        Ok(written)
    }

    fn spi_master_single_read_write(
        &self,
        handle: &FtHandle,
        data: &[u8],
        end_transaction: bool,
    ) -> NativeResult<Vec<u8>> {
        let len = len_u16(data.len())?;
        let mut write = data.to_vec();
        let mut read = vec![0u8; data.len()];
        let mut transferred = 0u16;
        check(unsafe {
            FT4222_SPIMaster_SingleReadWrite(
                raw(handle),
                read.as_mut_ptr(),
                write.as_mut_ptr(),
                len,
                &mut transferred,
                bool_arg(end_transaction),
            )
        })?;
        Ok(filled(read, transferred as usize))
    }

    fn spi_master_multi_read_write(
        &self,
        handle: &FtHandle,
        single_write: &[u8],
        multi_write: &[u8],
        multi_read_len: u16,
    ) -> NativeResult<Vec<u8>> {
        let single_len = len_u8(single_write.len())?;
        let multi_len = len_u16(multi_write.len())?;
        // The library takes both write phases from one buffer
        let mut write = Vec::with_capacity(single_write.len() + multi_write.len());
        write.extend_from_slice(single_write);
        write.extend_from_slice(multi_write);
        let mut read = vec![0u8; multi_read_len as usize];
        let mut read_len = 0u32;
        check(unsafe {
            FT4222_SPIMaster_MultiReadWrite(
                raw(handle),
                read.as_mut_ptr(),
                write.as_mut_ptr(),
                single_len,
                multi_len,
                multi_read_len,
                &mut read_len,
            )
        })?;
        Ok(filled(read, read_len as usize))
    }

    fn spi_slave_init_ex(&self, handle: &FtHandle, protocol: IoProtocol) -> NativeResult<()> {
        check(unsafe { FT4222_SPISlave_InitEx(raw(handle), protocol as u32) })
    }

    fn spi_slave_set_mode(
        &self,
        handle: &FtHandle,
        polarity: ClkPolarity,
        phase: ClkPhase,
    ) -> NativeResult<()> {
        check(unsafe { FT4222_SPISlave_SetMode(raw(handle), polarity as u32, phase as u32) })
    }

    fn spi_slave_get_rx_status(&self, handle: &FtHandle) -> NativeResult<u16> {
        let mut size = 0u16;
        check(unsafe { FT4222_SPISlave_GetRxStatus(raw(handle), &mut size) })?;
        Ok(size)
    }

    fn spi_slave_read(&self, handle: &FtHandle, len: u16) -> NativeResult<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        let mut read = 0u16;
        check(unsafe { FT4222_SPISlave_Read(raw(handle), buf.as_mut_ptr(), len, &mut read) })?;
        Ok(filled(buf, read as usize))
    }

    fn spi_slave_write(&self, handle: &FtHandle, data: &[u8]) -> NativeResult<u16> {
        let len = len_u16(data.len())?;
        let mut buf = data.to_vec();
        let mut written = 0u16;
        check(unsafe {
            FT4222_SPISlave_Write(raw(handle), buf.as_mut_ptr(), len, &mut written)
        })?;
        Ok(written)
    }

    // --- I2C master ---

    fn i2c_master_init(&self, handle: &FtHandle, kbps: u32) -> NativeResult<()> {
        check(unsafe { FT4222_I2CMaster_Init(raw(handle), kbps) })
    }

    fn i2c_master_read(&self, handle: &FtHandle, addr: u16, len: u16) -> NativeResult<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        let mut read = 0u16;
        check(unsafe {
            FT4222_I2CMaster_Read(raw(handle), addr, buf.as_mut_ptr(), len, &mut read)
        })?;
        Ok(filled(buf, read as usize))
    }

    fn i2c_master_write(&self, handle: &FtHandle, addr: u16, data: &[u8]) -> NativeResult<u16> {
        let len = len_u16(data.len())?;
        let mut buf = data.to_vec();
        let mut written = 0u16;
        check(unsafe {
            FT4222_I2CMaster_Write(
                raw(handle),
                addr,
                buf.as_mut_ptr(),
                len,
                &mut written,
            )
        })?;
        Ok(written)
    }

    fn i2c_master_read_ex(
        &self,
        handle: &FtHandle,
        addr: u16,
        flag: TransactionFlag,
        len: u16,
    ) -> NativeResult<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        let mut read = 0u16;
        check(unsafe {
            FT4222_I2CMaster_ReadEx(
                raw(handle),
                addr,
                flag.bits(),
                buf.as_mut_ptr(),
                len,
                &mut read,
            )
        })?;
        Ok(filled(buf, read as usize))
    }

    fn i2c_master_write_ex(
        &self,
        handle: &FtHandle,
        addr: u16,
        flag: TransactionFlag,
        data: &[u8],
    ) -> NativeResult<u16> {
        let len = len_u16(data.len())?;
        let mut buf = data.to_vec();
        let mut written = 0u16;
        check(unsafe {
            FT4222_I2CMaster_WriteEx(
                raw(handle),
                addr,
                flag.bits(),
                buf.as_mut_ptr(),
                len,
                &mut written,
            )
        })?;
        Ok(written)
    }

    fn i2c_master_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        check(unsafe { FT4222_I2CMaster_Reset(raw(handle)) })
    }

    fn i2c_master_get_status(&self, handle: &FtHandle) -> NativeResult<CtrlStatus> {
        let mut status = 0u8;
        check(unsafe { FT4222_I2CMaster_GetStatus(raw(handle), &mut status) })?;
        Ok(CtrlStatus::from_bits_truncate(status))
    }

    fn i2c_master_reset_bus(&self, handle: &FtHandle) -> NativeResult<()> {
        check(unsafe { FT4222_I2CMaster_ResetBus(raw(handle)) })
    }

    // --- I2C slave ---

    fn i2c_slave_init(&self, handle: &FtHandle) -> NativeResult<()> {
        check(unsafe { FT4222_I2CSlave_Init(raw(handle)) })
    }

    fn i2c_slave_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        check(unsafe { FT4222_I2CSlave_Reset(raw(handle)) })
    }

    fn i2c_slave_get_address(&self, handle: &FtHandle) -> NativeResult<u8> {
        let mut addr = 0u8;
        check(unsafe { FT4222_I2CSlave_GetAddress(raw(handle), &mut addr) })?;
        Ok(addr)
    }

    fn i2c_slave_set_address(&self, handle: &FtHandle, addr: u8) -> NativeResult<()> {
        check(unsafe { FT4222_I2CSlave_SetAddress(raw(handle), addr) })
    }

    fn i2c_slave_get_rx_status(&self, handle: &FtHandle) -> NativeResult<u16> {
        let mut size = 0u16;
        check(unsafe { FT4222_I2CSlave_GetRxStatus(raw(handle), &mut size) })?;
        Ok(size)
    }

    fn i2c_slave_read(&self, handle: &FtHandle, len: u16) -> NativeResult<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        let mut read = 0u16;
        check(unsafe { FT4222_I2CSlave_Read(raw(handle), buf.as_mut_ptr(), len, &mut read) })?;
        Ok(filled(buf, read as usize))
    }

    fn i2c_slave_write(&self, handle: &FtHandle, data: &[u8]) -> NativeResult<u16> {
        let len = len_u16(data.len())?;
        let mut buf = data.to_vec();
        let mut written = 0u16;
        check(unsafe {
            FT4222_I2CSlave_Write(raw(handle), buf.as_mut_ptr(), len, &mut written)
        })?;
        Ok(written)
    }

    fn i2c_slave_set_clock_stretch(&self, handle: &FtHandle, enable: bool) -> NativeResult<()> {
        check(unsafe { FT4222_I2CSlave_SetClockStretch(raw(handle), bool_arg(enable)) })
    }

    fn i2c_slave_set_resp_word(&self, handle: &FtHandle, word: u8) -> NativeResult<()> {
        check(unsafe { FT4222_I2CSlave_SetRespWord(raw(handle), word) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_c_buffers() {
        let mut buf = [0 as c_char; SERIAL_BUF_LEN];
        for (dst, src) in buf.iter_mut().zip(b"FT4XYZ1A".iter()) {
            *dst = *src as c_char;
        }
        assert_eq!(c_buf_to_string(&buf), "FT4XYZ1A");

        // Unterminated buffers stop at the end
        let full = [b'A' as c_char; 4];
        assert_eq!(c_buf_to_string(&full), "AAAA");
    }

    #[test]
    fn rejects_interior_nul() {
        assert_eq!(c_string("FT4222\0A").unwrap_err(), Ft4222Status::InvalidArgs);
        assert!(c_string("FT4222 A").is_ok());
    }

    #[test]
    fn rejects_oversized_transfers() {
        assert_eq!(len_u16(0xFFFF), Ok(0xFFFF));
        assert_eq!(len_u16(0x1_0000), Err(Ft4222Status::InvalidArgs));
        assert_eq!(len_u8(255), Ok(255));
        assert_eq!(len_u8(256), Err(Ft4222Status::InvalidArgs));
    }

    #[test]
    fn truncates_short_reads() {
        assert_eq!(filled(vec![1, 2, 3, 4], 2), vec![1, 2]);
    }
}
