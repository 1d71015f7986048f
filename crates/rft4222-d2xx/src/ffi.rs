//! Raw declarations for libftd2xx and libft4222
//!
//! Types follow the vendor headers on Linux: `DWORD`, `ULONG` and C enums
//! are 32 bits wide, `BOOL` is an `int`.

#![allow(non_snake_case, non_camel_case_types)]

use libc::{c_char, c_int, c_uint, c_void};

pub type FT_HANDLE = *mut c_void;
pub type FT_STATUS = c_uint;
pub type DWORD = c_uint;
pub type BOOL = c_int;

pub const FT_OPEN_BY_SERIAL_NUMBER: DWORD = 1;
pub const FT_OPEN_BY_DESCRIPTION: DWORD = 2;
#[cfg(not(target_os = "linux"))]
pub const FT_OPEN_BY_LOCATION: DWORD = 4;

/// Serial number buffer, including the terminating NUL
pub const SERIAL_BUF_LEN: usize = 16;
/// Description buffer, including the terminating NUL
pub const DESCRIPTION_BUF_LEN: usize = 64;

#[repr(C)]
#[derive(Debug, Default)]
pub struct FT4222_Version {
    pub chipVersion: DWORD,
    pub dllVersion: DWORD,
}

#[link(name = "ftd2xx")]
extern "C" {
    pub fn FT_CreateDeviceInfoList(lpdwNumDevs: *mut DWORD) -> FT_STATUS;
    pub fn FT_GetDeviceInfoDetail(
        dwIndex: DWORD,
        lpdwFlags: *mut DWORD,
        lpdwType: *mut DWORD,
        lpdwID: *mut DWORD,
        lpdwLocId: *mut DWORD,
        lpSerialNumber: *mut c_char,
        lpDescription: *mut c_char,
        pftHandle: *mut FT_HANDLE,
    ) -> FT_STATUS;
    pub fn FT_Open(deviceNumber: c_int, pHandle: *mut FT_HANDLE) -> FT_STATUS;
    pub fn FT_OpenEx(pArg1: *mut c_void, Flags: DWORD, pHandle: *mut FT_HANDLE) -> FT_STATUS;
    pub fn FT_Close(ftHandle: FT_HANDLE) -> FT_STATUS;
    pub fn FT_GetDeviceInfo(
        ftHandle: FT_HANDLE,
        lpftDevice: *mut DWORD,
        lpdwID: *mut DWORD,
        SerialNumber: *mut c_char,
        Description: *mut c_char,
        Dummy: *mut c_void,
    ) -> FT_STATUS;
    pub fn FT_GetDriverVersion(ftHandle: FT_HANDLE, lpdwVersion: *mut DWORD) -> FT_STATUS;
    pub fn FT_Purge(ftHandle: FT_HANDLE, Mask: DWORD) -> FT_STATUS;
    pub fn FT_ResetDevice(ftHandle: FT_HANDLE) -> FT_STATUS;
}

#[link(name = "ft4222")]
extern "C" {
    pub fn FT4222_UnInitialize(ftHandle: FT_HANDLE) -> FT_STATUS;
    pub fn FT4222_SetClock(ftHandle: FT_HANDLE, clk: c_uint) -> FT_STATUS;
    pub fn FT4222_GetClock(ftHandle: FT_HANDLE, clk: *mut c_uint) -> FT_STATUS;
    pub fn FT4222_SetWakeUpInterrupt(ftHandle: FT_HANDLE, enable: BOOL) -> FT_STATUS;
    pub fn FT4222_SetInterruptTrigger(ftHandle: FT_HANDLE, trigger: c_uint) -> FT_STATUS;
    pub fn FT4222_SetSuspendOut(ftHandle: FT_HANDLE, enable: BOOL) -> FT_STATUS;
    pub fn FT4222_GetMaxTransferSize(ftHandle: FT_HANDLE, pMaxSize: *mut u16) -> FT_STATUS;
    pub fn FT4222_GetVersion(ftHandle: FT_HANDLE, pVersion: *mut FT4222_Version) -> FT_STATUS;
    pub fn FT4222_ChipReset(ftHandle: FT_HANDLE) -> FT_STATUS;

    pub fn FT4222_GPIO_Init(ftHandle: FT_HANDLE, gpioDir: *mut c_uint) -> FT_STATUS;
    pub fn FT4222_GPIO_Read(ftHandle: FT_HANDLE, portNum: c_uint, value: *mut BOOL) -> FT_STATUS;
    pub fn FT4222_GPIO_Write(ftHandle: FT_HANDLE, portNum: c_uint, bValue: BOOL) -> FT_STATUS;
    pub fn FT4222_GPIO_SetInputTrigger(
        ftHandle: FT_HANDLE,
        portNum: c_uint,
        trigger: c_uint,
    ) -> FT_STATUS;
    pub fn FT4222_GPIO_GetTriggerStatus(
        ftHandle: FT_HANDLE,
        portNum: c_uint,
        queueSize: *mut u16,
    ) -> FT_STATUS;
    pub fn FT4222_GPIO_ReadTriggerQueue(
        ftHandle: FT_HANDLE,
        portNum: c_uint,
        events: *mut c_uint,
        readSize: u16,
        sizeofRead: *mut u16,
    ) -> FT_STATUS;
    pub fn FT4222_GPIO_SetWaveFormMode(ftHandle: FT_HANDLE, enable: BOOL) -> FT_STATUS;

    pub fn FT4222_SPI_Reset(ftHandle: FT_HANDLE) -> FT_STATUS;
    pub fn FT4222_SPI_ResetTransaction(ftHandle: FT_HANDLE, spiIdx: u8) -> FT_STATUS;
    pub fn FT4222_SPI_SetDrivingStrength(
        ftHandle: FT_HANDLE,
        clkStrength: c_uint,
        ioStrength: c_uint,
        ssoStrength: c_uint,
    ) -> FT_STATUS;

    pub fn FT4222_SPIMaster_Init(
        ftHandle: FT_HANDLE,
        ioLine: c_uint,
        clock: c_uint,
        cpol: c_uint,
        cpha: c_uint,
        ssoMap: u8,
    ) -> FT_STATUS;
    pub fn FT4222_SPIMaster_SetCS(ftHandle: FT_HANDLE, cs: c_uint) -> FT_STATUS;
    pub fn FT4222_SPIMaster_SetLines(ftHandle: FT_HANDLE, spiMode: c_uint) -> FT_STATUS;
    pub fn FT4222_SPIMaster_SingleRead(
        ftHandle: FT_HANDLE,
        buffer: *mut u8,
        bufferSize: u16,
        sizeOfRead: *mut u16,
        isEndTransaction: BOOL,
    ) -> FT_STATUS;
    pub fn FT4222_SPIMaster_SingleWrite(
        ftHandle: FT_HANDLE,
        buffer: *mut u8,
        bufferSize: u16,
        sizeTransferred: *mut u16,
        isEndTransaction: BOOL,
    ) -> FT_STATUS;
    pub fn FT4222_SPIMaster_SingleReadWrite(
        ftHandle: FT_HANDLE,
        readBuffer: *mut u8,
        writeBuffer: *mut u8,
        bufferSize: u16,
        sizeTransferred: *mut u16,
        isEndTransaction: BOOL,
    ) -> FT_STATUS;
    pub fn FT4222_SPIMaster_MultiReadWrite(
        ftHandle: FT_HANDLE,
        readBuffer: *mut u8,
        writeBuffer: *mut u8,
        singleWriteBytes: u8,
        multiWriteBytes: u16,
        multiReadBytes: u16,
        sizeOfRead: *mut u32,
    ) -> FT_STATUS;

    pub fn FT4222_SPISlave_InitEx(ftHandle: FT_HANDLE, protocolOpt: c_uint) -> FT_STATUS;
    pub fn FT4222_SPISlave_SetMode(ftHandle: FT_HANDLE, cpol: c_uint, cpha: c_uint) -> FT_STATUS;
    pub fn FT4222_SPISlave_GetRxStatus(ftHandle: FT_HANDLE, pRxSize: *mut u16) -> FT_STATUS;
    pub fn FT4222_SPISlave_Read(
        ftHandle: FT_HANDLE,
        buffer: *mut u8,
        bufferSize: u16,
        sizeOfRead: *mut u16,
    ) -> FT_STATUS;
    pub fn FT4222_SPISlave_Write(
        ftHandle: FT_HANDLE,
        buffer: *mut u8,
        bufferSize: u16,
        sizeTransferred: *mut u16,
    ) -> FT_STATUS;

    pub fn FT4222_I2CMaster_Init(ftHandle: FT_HANDLE, kbps: u32) -> FT_STATUS;
    pub fn FT4222_I2CMaster_Read(
        ftHandle: FT_HANDLE,
        deviceAddress: u16,
        buffer: *mut u8,
        bufferSize: u16,
        sizeTransferred: *mut u16,
    ) -> FT_STATUS;
    pub fn FT4222_I2CMaster_Write(
        ftHandle: FT_HANDLE,
        deviceAddress: u16,
        buffer: *mut u8,
        bufferSize: u16,
        sizeTransferred: *mut u16,
    ) -> FT_STATUS;
    pub fn FT4222_I2CMaster_ReadEx(
        ftHandle: FT_HANDLE,
        deviceAddress: u16,
        flag: u8,
        buffer: *mut u8,
        bufferSize: u16,
        sizeTransferred: *mut u16,
    ) -> FT_STATUS;
    pub fn FT4222_I2CMaster_WriteEx(
        ftHandle: FT_HANDLE,
        deviceAddress: u16,
        flag: u8,
        buffer: *mut u8,
        bufferSize: u16,
        sizeTransferred: *mut u16,
    ) -> FT_STATUS;
    pub fn FT4222_I2CMaster_Reset(ftHandle: FT_HANDLE) -> FT_STATUS;
    pub fn FT4222_I2CMaster_GetStatus(ftHandle: FT_HANDLE, controllerStatus: *mut u8) -> FT_STATUS;
    pub fn FT4222_I2CMaster_ResetBus(ftHandle: FT_HANDLE) -> FT_STATUS;

    pub fn FT4222_I2CSlave_Init(ftHandle: FT_HANDLE) -> FT_STATUS;
    pub fn FT4222_I2CSlave_Reset(ftHandle: FT_HANDLE) -> FT_STATUS;
    pub fn FT4222_I2CSlave_GetAddress(ftHandle: FT_HANDLE, addr: *mut u8) -> FT_STATUS;
    pub fn FT4222_I2CSlave_SetAddress(ftHandle: FT_HANDLE, addr: u8) -> FT_STATUS;
    pub fn FT4222_I2CSlave_GetRxStatus(ftHandle: FT_HANDLE, pRxSize: *mut u16) -> FT_STATUS;
    pub fn FT4222_I2CSlave_Read(
        ftHandle: FT_HANDLE,
        buffer: *mut u8,
        bufferSize: u16,
        sizeTransferred: *mut u16,
    ) -> FT_STATUS;
    pub fn FT4222_I2CSlave_Write(
        ftHandle: FT_HANDLE,
        buffer: *mut u8,
        bufferSize: u16,
        sizeTransferred: *mut u16,
    ) -> FT_STATUS;
    pub fn FT4222_I2CSlave_SetClockStretch(ftHandle: FT_HANDLE, enable: BOOL) -> FT_STATUS;
    pub fn FT4222_I2CSlave_SetRespWord(ftHandle: FT_HANDLE, responseWord: u8) -> FT_STATUS;
}
