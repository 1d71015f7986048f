//! rft4222-dummy - Simulated FT4222H driver
//!
//! [`SimDriver`] implements the [`Driver`] seam without hardware. It holds a
//! table of USB interfaces, tracks which protocol each open handle has been
//! initialized with, and keeps a log of every primitive it was asked to run,
//! so tests can check exactly which native calls a sequence of handle
//! operations produced.
//!
//! All interfaces share one simulated chip: one system clock, four GPIO
//! pins, one SPI bus and one I2C bus. On the SPI bus MISO is looped back to
//! MOSI unless a response has been queued. The I2C bus holds small
//! EEPROM-like targets addressed with a one-byte word pointer.

mod config;
mod error;

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};

use rft4222_core::driver::{Driver, FtHandle, OpenTarget};
use rft4222_core::gpio::{Direction, PortId};
use rft4222_core::spi::slave::IoProtocol;
use rft4222_core::{
    BufferType, ClkPhase, ClkPolarity, ClockRate, CsPolarity, CtrlStatus, DeviceFlags,
    DeviceInfo, DeviceType, DriveStrength, DriverVersion, Ft4222Status, GpioTrigger, IoMode,
    ModeTag, NativeResult, Resolution, ShortDeviceInfo, SpiMasterConfig, SwChipVersion,
    TransactionFlag,
};

pub use config::{DeviceEntry, I2cTargetEntry, SimConfig};
pub use error::{ConfigError, Result};

/// `VID << 16 | PID` reported for every simulated interface
pub const FT4222_ID: u32 = 0x0403_601C;

/// Chip revision reported unless configured otherwise
pub const DEFAULT_CHIP_VERSION: u32 = 0x4222_0400;

const LIBRARY_VERSION: u32 = 0x0104_0408;
const KERNEL_DRIVER_VERSION: u32 = 0x0002_1222;
const MAX_TRANSFER_SIZE: u16 = 512;
const DEFAULT_I2C_SLAVE_ADDR: u8 = 0x40;

/// One simulated USB interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDevice {
    pub description: String,
    pub serial_number: String,
    pub device_type: DeviceType,
    pub location_id: u32,
    /// Whether GPIO init succeeds on interface D (mode 1) or not (mode 2)
    ///
    /// Other interfaces take their personality from the mode table.
    pub accepts_gpio: bool,
}

impl SimDevice {
    pub fn new(
        description: impl Into<String>,
        serial_number: impl Into<String>,
        device_type: DeviceType,
    ) -> Self {
        Self {
            description: description.into(),
            serial_number: serial_number.into(),
            device_type,
            location_id: 0,
            accepts_gpio: false,
        }
    }

    pub fn with_location(mut self, location_id: u32) -> Self {
        self.location_id = location_id;
        self
    }

    pub fn with_gpio(mut self, accepts_gpio: bool) -> Self {
        self.accepts_gpio = accepts_gpio;
        self
    }

    /// What the firmware allows on this interface, `None` if unsupported
    fn personality(&self) -> Option<ModeTag> {
        match rft4222_core::lookup(&self.description, self.device_type)? {
            Resolution::Stream(tag) => Some(tag),
            Resolution::ProbeGpio if self.accepts_gpio => Some(ModeTag::Gpio),
            Resolution::ProbeGpio => Some(ModeTag::SpiMaster),
        }
    }
}

/// One primitive invocation seen by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    /// Raw handle value, for calls made on an open handle
    pub handle: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    None,
    Gpio,
    SpiMaster(IoMode),
    SpiSlave(IoProtocol),
    I2cMaster(u32),
    I2cSlave,
}

#[derive(Debug)]
struct Session {
    device: usize,
    protocol: Protocol,
}

#[derive(Debug, Default)]
struct Pins {
    dirs: [Option<Direction>; 4],
    levels: [bool; 4],
    triggers: [GpioTrigger; 4],
    queues: [VecDeque<GpioTrigger>; 4],
    waveform: bool,
}

impl Pins {
    /// Drop pin setup left by a GPIO session; line levels stay as they are
    fn release(&mut self) {
        self.dirs = [None; 4];
        self.triggers = [GpioTrigger::empty(); 4];
        self.queues.iter_mut().for_each(VecDeque::clear);
        self.waveform = false;
    }

    fn is_configured(&self) -> bool {
        self.dirs.iter().any(Option::is_some)
            || self.triggers.iter().any(|t| !t.is_empty())
            || self.queues.iter().any(|q| !q.is_empty())
            || self.waveform
    }
}

#[derive(Debug)]
struct I2cTarget {
    memory: Vec<u8>,
    pointer: usize,
}

#[derive(Debug)]
struct Chip {
    next_handle: usize,
    sessions: HashMap<usize, Session>,
    clock: ClockRate,
    pins: Pins,
    cs_polarity: CsPolarity,
    miso: VecDeque<u8>,
    mosi: Vec<u8>,
    slave_rx: VecDeque<u8>,
    slave_tx: Vec<u8>,
    i2c_targets: BTreeMap<u16, I2cTarget>,
    i2c_status: CtrlStatus,
    i2c_slave_addr: u8,
}

impl Default for Chip {
    fn default() -> Self {
        Self {
            next_handle: 1,
            sessions: HashMap::new(),
            clock: ClockRate::default(),
            pins: Pins::default(),
            cs_polarity: CsPolarity::default(),
            miso: VecDeque::new(),
            mosi: Vec::new(),
            slave_rx: VecDeque::new(),
            slave_tx: Vec::new(),
            i2c_targets: BTreeMap::new(),
            i2c_status: CtrlStatus::IDLE,
            i2c_slave_addr: DEFAULT_I2C_SLAVE_ADDR,
        }
    }
}

/// Simulated native FT4222H library
#[derive(Debug)]
pub struct SimDriver {
    devices: Vec<SimDevice>,
    chip_version: u32,
    fail_uninitialize: Cell<bool>,
    chip: RefCell<Chip>,
    calls: RefCell<Vec<Call>>,
}

impl SimDriver {
    pub fn new(devices: Vec<SimDevice>) -> Self {
        Self {
            devices,
            chip_version: DEFAULT_CHIP_VERSION,
            fail_uninitialize: Cell::new(false),
            chip: RefCell::new(Chip::default()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Interface list of a chip strapped into `name` (`mode0` to `mode3`)
    pub fn preset_devices(name: &str) -> Option<Vec<SimDevice>> {
        let quad = |accepts_gpio: bool| -> Vec<SimDevice> {
            ["A", "B", "C", "D"]
                .iter()
                .enumerate()
                .map(|(i, letter)| {
                    SimDevice::new(
                        format!("FT4222 {}", letter),
                        format!("SIM0001{}", letter),
                        DeviceType::Dev4222H1_2,
                    )
                    .with_location(0x11 + i as u32)
                    .with_gpio(*letter == "D" && accepts_gpio)
                })
                .collect()
        };
        let devices = match name {
            "mode0" => vec![
                SimDevice::new("FT4222 A", "SIM0001A", DeviceType::Dev4222H0).with_location(0x11),
                SimDevice::new("FT4222 B", "SIM0001B", DeviceType::Dev4222H0).with_location(0x12),
            ],
            "mode1" => quad(true),
            "mode2" => quad(false),
            "mode3" => {
                vec![SimDevice::new("FT4222", "SIM0001", DeviceType::Dev4222H3).with_location(0x11)]
            }
            _ => return None,
        };
        Some(devices)
    }

    pub fn preset(name: &str) -> Option<Self> {
        Self::preset_devices(name).map(Self::new)
    }

    /// Mode 0: data stream on A, GPIO on B
    pub fn mode0() -> Self {
        Self::new(Self::preset_devices("mode0").unwrap_or_default())
    }

    /// Mode 1: SPI master on A to C, GPIO on D
    pub fn mode1() -> Self {
        Self::new(Self::preset_devices("mode1").unwrap_or_default())
    }

    /// Mode 2: SPI master on all four interfaces
    pub fn mode2() -> Self {
        Self::new(Self::preset_devices("mode2").unwrap_or_default())
    }

    /// Mode 3: a single data-stream interface
    pub fn mode3() -> Self {
        Self::new(Self::preset_devices("mode3").unwrap_or_default())
    }

    pub fn with_chip_version(mut self, chip_version: u32) -> Self {
        self.chip_version = chip_version;
        self
    }

    pub fn with_clock(self, clock: ClockRate) -> Self {
        self.chip.borrow_mut().clock = clock;
        self
    }

    /// Attach an EEPROM-like target to the I2C bus
    pub fn with_i2c_target(self, address: u16, memory: Vec<u8>) -> Self {
        self.chip
            .borrow_mut()
            .i2c_targets
            .insert(address, I2cTarget { memory, pointer: 0 });
        self
    }

    /// Make every `uninitialize` call fail with `IO_ERROR`
    pub fn set_fail_uninitialize(&self, fail: bool) {
        self.fail_uninitialize.set(fail);
    }

    pub fn devices(&self) -> &[SimDevice] {
        &self.devices
    }

    // --- Inspection ---

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Names of all primitives called so far, in order
    pub fn ops(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|c| c.op).collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.op == op).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Number of handles currently open
    pub fn open_handles(&self) -> usize {
        self.chip.borrow().sessions.len()
    }

    /// Whether any open handle still carries protocol state
    pub fn has_protocol_state(&self) -> bool {
        self.chip
            .borrow()
            .sessions
            .values()
            .any(|s| s.protocol != Protocol::None)
    }

    /// Whether any pin still carries direction, trigger or waveform setup
    pub fn pins_configured(&self) -> bool {
        self.chip.borrow().pins.is_configured()
    }

    pub fn gpio_level(&self, port: PortId) -> bool {
        self.chip.borrow().pins.levels[port.index()]
    }

    /// Drive an input pin from outside, queueing matching trigger events
    pub fn drive_input(&self, port: PortId, level: bool) {
        let mut chip = self.chip.borrow_mut();
        let pins = &mut chip.pins;
        let i = port.index();
        if pins.dirs[i] == Some(Direction::Output) {
            log::warn!("Ignoring external drive of output pin {:?}", port);
            return;
        }
        let old = pins.levels[i];
        pins.levels[i] = level;
        let trigger = pins.triggers[i];
        let mut events = Vec::new();
        if !old && level && trigger.contains(GpioTrigger::RISING) {
            events.push(GpioTrigger::RISING);
        }
        if old && !level && trigger.contains(GpioTrigger::FALLING) {
            events.push(GpioTrigger::FALLING);
        }
        if level && (pins.waveform || trigger.contains(GpioTrigger::LEVEL_HIGH)) {
            events.push(GpioTrigger::LEVEL_HIGH);
        }
        if !level && (pins.waveform || trigger.contains(GpioTrigger::LEVEL_LOW)) {
            events.push(GpioTrigger::LEVEL_LOW);
        }
        pins.queues[i].extend(events);
    }

    /// Bytes the slave will return on the next SPI master reads
    pub fn queue_miso(&self, data: &[u8]) {
        self.chip.borrow_mut().miso.extend(data.iter().copied());
    }

    /// Everything an SPI master has clocked out so far
    pub fn mosi(&self) -> Vec<u8> {
        self.chip.borrow().mosi.clone()
    }

    /// Bytes an external master sends to the SPI slave
    pub fn push_spi_slave_rx(&self, data: &[u8]) {
        self.chip.borrow_mut().slave_rx.extend(data.iter().copied());
    }

    /// Bytes the SPI or I2C slave has queued for the external master
    pub fn slave_tx(&self) -> Vec<u8> {
        self.chip.borrow().slave_tx.clone()
    }

    pub fn i2c_memory(&self, address: u16) -> Option<Vec<u8>> {
        self.chip
            .borrow()
            .i2c_targets
            .get(&address)
            .map(|t| t.memory.clone())
    }

    // --- Internals ---

    fn log(&self, op: &'static str, handle: Option<&FtHandle>) {
        log::trace!("sim: {}", op);
        self.calls.borrow_mut().push(Call {
            op,
            handle: handle.map(FtHandle::as_raw),
        });
    }

    /// Run `f` on the session behind `handle`
    fn session<T>(
        &self,
        op: &'static str,
        handle: &FtHandle,
        f: impl FnOnce(&SimDevice, &mut Protocol, &mut Chip) -> NativeResult<T>,
    ) -> NativeResult<T> {
        self.log(op, Some(handle));
        let mut chip = self.chip.borrow_mut();
        let chip = &mut *chip;
        let session = chip
            .sessions
            .get_mut(&handle.as_raw())
            .ok_or(Ft4222Status::InvalidHandle)?;
        let device = &self.devices[session.device];
        let mut protocol = session.protocol;
        let result = f(device, &mut protocol, chip);
        if let Some(session) = chip.sessions.get_mut(&handle.as_raw()) {
            session.protocol = protocol;
        }
        result
    }

    fn open_device(&self, index: usize) -> NativeResult<FtHandle> {
        let mut chip = self.chip.borrow_mut();
        if chip.sessions.values().any(|s| s.device == index) {
            return Err(Ft4222Status::DeviceNotOpened);
        }
        let raw = chip.next_handle;
        chip.next_handle += 1;
        chip.sessions.insert(
            raw,
            Session {
                device: index,
                protocol: Protocol::None,
            },
        );
        log::debug!("sim: opened '{}' as #{}", self.devices[index].description, raw);
        Ok(FtHandle::from_raw(raw))
    }
}

fn require_gpio(protocol: &Protocol) -> NativeResult<()> {
    match protocol {
        Protocol::Gpio => Ok(()),
        _ => Err(Ft4222Status::GpioNotSupportedInThisMode),
    }
}

fn require_spi(protocol: &Protocol) -> NativeResult<()> {
    match protocol {
        Protocol::SpiMaster(_) | Protocol::SpiSlave(_) => Ok(()),
        _ => Err(Ft4222Status::IsNotSpiMode),
    }
}

fn require_spi_single(protocol: &Protocol) -> NativeResult<()> {
    match protocol {
        Protocol::SpiMaster(IoMode::Single) => Ok(()),
        Protocol::SpiMaster(_) => Err(Ft4222Status::IsNotSpiSingleMode),
        _ => Err(Ft4222Status::IsNotSpiMode),
    }
}

fn require_i2c_master(protocol: &Protocol) -> NativeResult<()> {
    match protocol {
        Protocol::I2cMaster(_) => Ok(()),
        _ => Err(Ft4222Status::IsNotI2cMode),
    }
}

fn require_i2c_slave(protocol: &Protocol) -> NativeResult<()> {
    match protocol {
        Protocol::I2cSlave => Ok(()),
        _ => Err(Ft4222Status::IsNotI2cMode),
    }
}

fn require_personality(device: &SimDevice, allowed: &[ModeTag], err: Ft4222Status) -> NativeResult<()> {
    match device.personality() {
        Some(tag) if allowed.contains(&tag) => Ok(()),
        _ => Err(err),
    }
}

/// Byte count reported back for a write; the native count is 16 bits
fn tx_len(data: &[u8]) -> NativeResult<u16> {
    u16::try_from(data.len()).map_err(|_| Ft4222Status::InvalidArgs)
}

fn pop_bytes(queue: &mut VecDeque<u8>, len: usize, fill: impl Fn(usize) -> u8) -> Vec<u8> {
    (0..len).map(|i| queue.pop_front().unwrap_or_else(|| fill(i))).collect()
}

fn i2c_write(chip: &mut Chip, addr: u16, data: &[u8]) -> NativeResult<u16> {
    let len = tx_len(data)?;
    let Some(target) = chip.i2c_targets.get_mut(&addr) else {
        chip.i2c_status = CtrlStatus::ERROR | CtrlStatus::SLAVE_ADDR_NACK | CtrlStatus::IDLE;
        return Err(Ft4222Status::FailedToWriteDevice);
    };
    if let Some((&word, rest)) = data.split_first() {
        target.pointer = word as usize;
        for &b in rest {
            if !target.memory.is_empty() {
                let at = target.pointer % target.memory.len();
                target.memory[at] = b;
            }
            target.pointer += 1;
        }
    }
    chip.i2c_status = CtrlStatus::IDLE;
    Ok(len)
}

fn i2c_read(chip: &mut Chip, addr: u16, len: u16) -> NativeResult<Vec<u8>> {
    let Some(target) = chip.i2c_targets.get_mut(&addr) else {
        chip.i2c_status = CtrlStatus::ERROR | CtrlStatus::SLAVE_ADDR_NACK | CtrlStatus::IDLE;
        return Err(Ft4222Status::FailedToReadDevice);
    };
    let mut out = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let byte = match target.memory.len() {
            0 => 0xFF,
            n => target.memory[target.pointer % n],
        };
        out.push(byte);
        target.pointer += 1;
    }
    chip.i2c_status = CtrlStatus::IDLE;
    Ok(out)
}

impl Driver for SimDriver {
    fn create_device_info_list(&self) -> NativeResult<u32> {
        self.log("create_device_info_list", None);
        Ok(self.devices.len() as u32)
    }

    fn get_device_info_detail(&self, index: u32) -> NativeResult<DeviceInfo> {
        self.log("get_device_info_detail", None);
        let device = self
            .devices
            .get(index as usize)
            .ok_or(Ft4222Status::DeviceNotFound)?;
        let open = self
            .chip
            .borrow()
            .sessions
            .values()
            .any(|s| s.device == index as usize);
        let mut flags = DeviceFlags::HIGH_SPEED;
        flags.set(DeviceFlags::OPEN, open);
        Ok(DeviceInfo {
            index,
            flags,
            device_type: device.device_type,
            id: FT4222_ID,
            location_id: device.location_id,
            serial_number: device.serial_number.clone(),
            description: device.description.clone(),
        })
    }

    fn open(&self, index: u32) -> NativeResult<FtHandle> {
        self.log("open", None);
        if index as usize >= self.devices.len() {
            return Err(Ft4222Status::DeviceNotFound);
        }
        self.open_device(index as usize)
    }

    fn open_ex(&self, target: OpenTarget<'_>) -> NativeResult<FtHandle> {
        self.log("open_ex", None);
        let index = self
            .devices
            .iter()
            .position(|d| match target {
                OpenTarget::Serial(s) => d.serial_number == s,
                OpenTarget::Description(s) => d.description == s,
                OpenTarget::Location(loc) => d.location_id == loc,
            })
            .ok_or(Ft4222Status::DeviceNotFound)?;
        self.open_device(index)
    }

    fn close(&self, handle: FtHandle) -> NativeResult<()> {
        self.log("close", Some(&handle));
        match self.chip.borrow_mut().sessions.remove(&handle.as_raw()) {
            Some(_) => Ok(()),
            None => Err(Ft4222Status::InvalidHandle),
        }
    }

    fn get_device_info(&self, handle: &FtHandle) -> NativeResult<ShortDeviceInfo> {
        self.session("get_device_info", handle, |device, _, _| {
            Ok(ShortDeviceInfo {
                device_type: device.device_type,
                id: FT4222_ID,
                serial_number: device.serial_number.clone(),
                description: device.description.clone(),
            })
        })
    }

    fn get_driver_version(&self, handle: &FtHandle) -> NativeResult<DriverVersion> {
        self.session("get_driver_version", handle, |_, _, _| {
            Ok(DriverVersion(KERNEL_DRIVER_VERSION))
        })
    }

    fn purge(&self, handle: &FtHandle, _mask: BufferType) -> NativeResult<()> {
        self.session("purge", handle, |_, _, _| Ok(()))
    }

    fn reset_device(&self, handle: &FtHandle) -> NativeResult<()> {
        self.session("reset_device", handle, |_, protocol, _| {
            *protocol = Protocol::None;
            Ok(())
        })
    }

    fn uninitialize(&self, handle: &FtHandle) -> NativeResult<()> {
        let fail = self.fail_uninitialize.get();
        self.session("uninitialize", handle, |_, protocol, chip| {
            if fail {
                return Err(Ft4222Status::IoError);
            }
            if *protocol == Protocol::Gpio {
                chip.pins.release();
            }
            *protocol = Protocol::None;
            Ok(())
        })
    }

    fn set_clock(&self, handle: &FtHandle, rate: ClockRate) -> NativeResult<()> {
        self.session("set_clock", handle, |_, _, chip| {
            chip.clock = rate;
            Ok(())
        })
    }

    fn get_clock(&self, handle: &FtHandle) -> NativeResult<ClockRate> {
        self.session("get_clock", handle, |_, _, chip| Ok(chip.clock))
    }

    fn set_wakeup_interrupt(&self, handle: &FtHandle, _enable: bool) -> NativeResult<()> {
        self.session("set_wakeup_interrupt", handle, |_, _, _| Ok(()))
    }

    fn set_interrupt_trigger(&self, handle: &FtHandle, _trigger: GpioTrigger) -> NativeResult<()> {
        self.session("set_interrupt_trigger", handle, |_, _, _| Ok(()))
    }

    fn set_suspend_out(&self, handle: &FtHandle, _enable: bool) -> NativeResult<()> {
        self.session("set_suspend_out", handle, |_, _, _| Ok(()))
    }

    fn get_max_transfer_size(&self, handle: &FtHandle) -> NativeResult<u16> {
        self.session("get_max_transfer_size", handle, |_, _, _| Ok(MAX_TRANSFER_SIZE))
    }

    fn get_version(&self, handle: &FtHandle) -> NativeResult<SwChipVersion> {
        let chip_version = self.chip_version;
        self.session("get_version", handle, |_, _, _| {
            Ok(SwChipVersion {
                chip_version,
                dll_version: LIBRARY_VERSION,
            })
        })
    }

    fn chip_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        self.session("chip_reset", handle, |_, protocol, chip| {
            *protocol = Protocol::None;
            chip.clock = ClockRate::default();
            chip.pins = Pins::default();
            Ok(())
        })
    }

    // --- GPIO ---

    fn gpio_init(&self, handle: &FtHandle, dirs: [Direction; 4]) -> NativeResult<()> {
        self.session("gpio_init", handle, |device, protocol, chip| {
            require_personality(device, &[ModeTag::Gpio], Ft4222Status::GpioNotSupportedInThisMode)?;
            *protocol = Protocol::Gpio;
            chip.pins.dirs = dirs.map(Some);
            Ok(())
        })
    }

    fn gpio_read(&self, handle: &FtHandle, port: PortId) -> NativeResult<bool> {
        self.session("gpio_read", handle, |_, protocol, chip| {
            require_gpio(protocol)?;
            Ok(chip.pins.levels[port.index()])
        })
    }

    fn gpio_write(&self, handle: &FtHandle, port: PortId, state: bool) -> NativeResult<()> {
        self.session("gpio_write", handle, |_, protocol, chip| {
            require_gpio(protocol)?;
            if chip.pins.dirs[port.index()] != Some(Direction::Output) {
                return Err(Ft4222Status::GpioWriteNotSupported);
            }
            chip.pins.levels[port.index()] = state;
            Ok(())
        })
    }

    fn gpio_set_input_trigger(
        &self,
        handle: &FtHandle,
        port: PortId,
        trigger: GpioTrigger,
    ) -> NativeResult<()> {
        self.session("gpio_set_input_trigger", handle, |_, protocol, chip| {
            require_gpio(protocol)?;
            if chip.pins.dirs[port.index()] != Some(Direction::Input) {
                return Err(Ft4222Status::GpioInputNotSupported);
            }
            chip.pins.triggers[port.index()] = trigger;
            Ok(())
        })
    }

    fn gpio_get_trigger_status(&self, handle: &FtHandle, port: PortId) -> NativeResult<u16> {
        self.session("gpio_get_trigger_status", handle, |_, protocol, chip| {
            require_gpio(protocol)?;
            Ok(chip.pins.queues[port.index()].len().min(u16::MAX as usize) as u16)
        })
    }

    fn gpio_read_trigger_queue(
        &self,
        handle: &FtHandle,
        port: PortId,
        max_events: u16,
    ) -> NativeResult<Vec<GpioTrigger>> {
        self.session("gpio_read_trigger_queue", handle, |_, protocol, chip| {
            require_gpio(protocol)?;
            let queue = &mut chip.pins.queues[port.index()];
            let n = queue.len().min(max_events as usize);
            Ok(queue.drain(..n).collect())
        })
    }

    fn gpio_set_waveform_mode(&self, handle: &FtHandle, enable: bool) -> NativeResult<()> {
        self.session("gpio_set_waveform_mode", handle, |_, protocol, chip| {
            require_gpio(protocol)?;
            chip.pins.waveform = enable;
            Ok(())
        })
    }

    // --- SPI ---

    fn spi_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        self.session("spi_reset", handle, |_, protocol, _| require_spi(protocol))
    }

    fn spi_reset_transaction(&self, handle: &FtHandle, index: u8) -> NativeResult<()> {
        self.session("spi_reset_transaction", handle, |_, protocol, _| {
            require_spi(protocol)?;
            if index > 3 {
                return Err(Ft4222Status::InvalidParameter);
            }
            Ok(())
        })
    }

    fn spi_set_driving_strength(
        &self,
        handle: &FtHandle,
        _clk: DriveStrength,
        _io: DriveStrength,
        _sso: DriveStrength,
    ) -> NativeResult<()> {
        self.session("spi_set_driving_strength", handle, |_, protocol, _| {
            require_spi(protocol)
        })
    }

    fn spi_master_init(&self, handle: &FtHandle, config: &SpiMasterConfig) -> NativeResult<()> {
        self.session("spi_master_init", handle, |device, protocol, _| {
            require_personality(
                device,
                &[ModeTag::DataStream, ModeTag::SpiMaster],
                Ft4222Status::IsNotSpiMode,
            )?;
            *protocol = Protocol::SpiMaster(config.io_mode);
            Ok(())
        })
    }

    fn spi_master_set_cs_polarity(&self, handle: &FtHandle, polarity: CsPolarity) -> NativeResult<()> {
        self.session("spi_master_set_cs_polarity", handle, |_, protocol, chip| {
            match *protocol {
                Protocol::SpiMaster(_) => {
                    chip.cs_polarity = polarity;
                    Ok(())
                }
                _ => Err(Ft4222Status::IsNotSpiMode),
            }
        })
    }

    fn spi_master_set_lines(&self, handle: &FtHandle, mode: IoMode) -> NativeResult<()> {
        self.session("spi_master_set_lines", handle, |_, protocol, _| match *protocol {
            Protocol::SpiMaster(_) => {
                *protocol = Protocol::SpiMaster(mode);
                Ok(())
            }
            _ => Err(Ft4222Status::IsNotSpiMode),
        })
    }

    fn spi_master_single_read(
        &self,
        handle: &FtHandle,
        len: u16,
        _end_transaction: bool,
    ) -> NativeResult<Vec<u8>> {
        self.session("spi_master_single_read", handle, |_, protocol, chip| {
            require_spi_single(protocol)?;
            Ok(pop_bytes(&mut chip.miso, len as usize, |_| 0xFF))
        })
    }

    fn spi_master_single_write(
        &self,
        handle: &FtHandle,
        data: &[u8],
        _end_transaction: bool,
    ) -> NativeResult<u16> {
        self.session("spi_master_single_write", handle, |_, protocol, chip| {
            require_spi_single(protocol)?;
            let len = tx_len(data)?;
            chip.mosi.extend_from_slice(data);
            Ok(len)
        })
    }

    fn spi_master_single_read_write(
        &self,
        handle: &FtHandle,
        data: &[u8],
        _end_transaction: bool,
    ) -> NativeResult<Vec<u8>> {
        self.session("spi_master_single_read_write", handle, |_, protocol, chip| {
            require_spi_single(protocol)?;
            chip.mosi.extend_from_slice(data);
            Ok(pop_bytes(&mut chip.miso, data.len(), |i| data[i]))
        })
    }

    fn spi_master_multi_read_write(
        &self,
        handle: &FtHandle,
        single_write: &[u8],
        multi_write: &[u8],
        multi_read_len: u16,
    ) -> NativeResult<Vec<u8>> {
        self.session("spi_master_multi_read_write", handle, |_, protocol, chip| {
            match *protocol {
                Protocol::SpiMaster(IoMode::Dual | IoMode::Quad) => {}
                Protocol::SpiMaster(IoMode::Single) => return Err(Ft4222Status::IsNotSpiMultiMode),
                _ => return Err(Ft4222Status::IsNotSpiMode),
            }
            chip.mosi.extend_from_slice(single_write);
            chip.mosi.extend_from_slice(multi_write);
            Ok(pop_bytes(&mut chip.miso, multi_read_len as usize, |_| 0xFF))
        })
    }

    fn spi_slave_init_ex(&self, handle: &FtHandle, io_protocol: IoProtocol) -> NativeResult<()> {
        self.session("spi_slave_init_ex", handle, |device, protocol, _| {
            require_personality(device, &[ModeTag::DataStream], Ft4222Status::IsNotSpiMode)?;
            *protocol = Protocol::SpiSlave(io_protocol);
            Ok(())
        })
    }

    fn spi_slave_set_mode(
        &self,
        handle: &FtHandle,
        _polarity: ClkPolarity,
        _phase: ClkPhase,
    ) -> NativeResult<()> {
        self.session("spi_slave_set_mode", handle, |_, protocol, _| match *protocol {
            Protocol::SpiSlave(_) => Ok(()),
            _ => Err(Ft4222Status::IsNotSpiMode),
        })
    }

    fn spi_slave_get_rx_status(&self, handle: &FtHandle) -> NativeResult<u16> {
        self.session("spi_slave_get_rx_status", handle, |_, protocol, chip| match *protocol {
            Protocol::SpiSlave(_) => Ok(chip.slave_rx.len().min(u16::MAX as usize) as u16),
            _ => Err(Ft4222Status::IsNotSpiMode),
        })
    }

    fn spi_slave_read(&self, handle: &FtHandle, len: u16) -> NativeResult<Vec<u8>> {
        self.session("spi_slave_read", handle, |_, protocol, chip| match *protocol {
            Protocol::SpiSlave(_) => {
                let n = chip.slave_rx.len().min(len as usize);
                Ok(chip.slave_rx.drain(..n).collect())
            }
            _ => Err(Ft4222Status::IsNotSpiMode),
        })
    }

    fn spi_slave_write(&self, handle: &FtHandle, data: &[u8]) -> NativeResult<u16> {
        self.session("spi_slave_write", handle, |_, protocol, chip| match *protocol {
            Protocol::SpiSlave(_) => {
                let len = tx_len(data)?;
                chip.slave_tx.extend_from_slice(data);
                Ok(len)
            }
            _ => Err(Ft4222Status::IsNotSpiMode),
        })
    }

    // --- I2C ---

    fn i2c_master_init(&self, handle: &FtHandle, kbps: u32) -> NativeResult<()> {
        self.session("i2c_master_init", handle, |device, protocol, chip| {
            require_personality(
                device,
                &[ModeTag::DataStream],
                Ft4222Status::I2cNotSupportedInThisMode,
            )?;
            *protocol = Protocol::I2cMaster(kbps);
            chip.i2c_status = CtrlStatus::IDLE;
            Ok(())
        })
    }

    fn i2c_master_read(&self, handle: &FtHandle, addr: u16, len: u16) -> NativeResult<Vec<u8>> {
        self.session("i2c_master_read", handle, |_, protocol, chip| {
            require_i2c_master(protocol)?;
            i2c_read(chip, addr, len)
        })
    }

    fn i2c_master_write(&self, handle: &FtHandle, addr: u16, data: &[u8]) -> NativeResult<u16> {
        self.session("i2c_master_write", handle, |_, protocol, chip| {
            require_i2c_master(protocol)?;
            i2c_write(chip, addr, data)
        })
    }

    fn i2c_master_read_ex(
        &self,
        handle: &FtHandle,
        addr: u16,
        flag: TransactionFlag,
        len: u16,
    ) -> NativeResult<Vec<u8>> {
        self.session("i2c_master_read_ex", handle, |_, protocol, chip| {
            require_i2c_master(protocol)?;
            log::trace!("sim: I2C read flags {:?}", flag);
            i2c_read(chip, addr, len)
        })
    }

    fn i2c_master_write_ex(
        &self,
        handle: &FtHandle,
        addr: u16,
        flag: TransactionFlag,
        data: &[u8],
    ) -> NativeResult<u16> {
        self.session("i2c_master_write_ex", handle, |_, protocol, chip| {
            require_i2c_master(protocol)?;
            log::trace!("sim: I2C write flags {:?}", flag);
            i2c_write(chip, addr, data)
        })
    }

    fn i2c_master_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        self.session("i2c_master_reset", handle, |_, protocol, chip| {
            require_i2c_master(protocol)?;
            chip.i2c_status = CtrlStatus::IDLE;
            Ok(())
        })
    }

    fn i2c_master_get_status(&self, handle: &FtHandle) -> NativeResult<CtrlStatus> {
        self.session("i2c_master_get_status", handle, |_, protocol, chip| {
            require_i2c_master(protocol)?;
            Ok(chip.i2c_status)
        })
    }

    fn i2c_master_reset_bus(&self, handle: &FtHandle) -> NativeResult<()> {
        self.session("i2c_master_reset_bus", handle, |_, protocol, chip| {
            require_i2c_master(protocol)?;
            chip.i2c_status = CtrlStatus::IDLE;
            Ok(())
        })
    }

    fn i2c_slave_init(&self, handle: &FtHandle) -> NativeResult<()> {
        self.session("i2c_slave_init", handle, |device, protocol, _| {
            require_personality(
                device,
                &[ModeTag::DataStream],
                Ft4222Status::I2cNotSupportedInThisMode,
            )?;
            *protocol = Protocol::I2cSlave;
            Ok(())
        })
    }

    fn i2c_slave_reset(&self, handle: &FtHandle) -> NativeResult<()> {
        self.session("i2c_slave_reset", handle, |_, protocol, _| require_i2c_slave(protocol))
    }

    fn i2c_slave_get_address(&self, handle: &FtHandle) -> NativeResult<u8> {
        self.session("i2c_slave_get_address", handle, |_, protocol, chip| {
            require_i2c_slave(protocol)?;
            Ok(chip.i2c_slave_addr)
        })
    }

    fn i2c_slave_set_address(&self, handle: &FtHandle, addr: u8) -> NativeResult<()> {
        self.session("i2c_slave_set_address", handle, |_, protocol, chip| {
            require_i2c_slave(protocol)?;
            chip.i2c_slave_addr = addr;
            Ok(())
        })
    }

    fn i2c_slave_get_rx_status(&self, handle: &FtHandle) -> NativeResult<u16> {
        self.session("i2c_slave_get_rx_status", handle, |_, protocol, chip| {
            require_i2c_slave(protocol)?;
            Ok(chip.slave_rx.len().min(u16::MAX as usize) as u16)
        })
    }

    fn i2c_slave_read(&self, handle: &FtHandle, len: u16) -> NativeResult<Vec<u8>> {
        self.session("i2c_slave_read", handle, |_, protocol, chip| {
            require_i2c_slave(protocol)?;
            let n = chip.slave_rx.len().min(len as usize);
            Ok(chip.slave_rx.drain(..n).collect())
        })
    }

    fn i2c_slave_write(&self, handle: &FtHandle, data: &[u8]) -> NativeResult<u16> {
        self.session("i2c_slave_write", handle, |_, protocol, chip| {
            require_i2c_slave(protocol)?;
            let len = tx_len(data)?;
            chip.slave_tx.extend_from_slice(data);
            Ok(len)
        })
    }

    fn i2c_slave_set_clock_stretch(&self, handle: &FtHandle, _enable: bool) -> NativeResult<()> {
        self.session("i2c_slave_set_clock_stretch", handle, |_, protocol, _| {
            require_i2c_slave(protocol)
        })
    }

    fn i2c_slave_set_resp_word(&self, handle: &FtHandle, _word: u8) -> NativeResult<()> {
        self.session("i2c_slave_set_resp_word", handle, |_, protocol, _| {
            require_i2c_slave(protocol)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_follow_mode_table() {
        let mode1 = SimDriver::mode1();
        let mode2 = SimDriver::mode2();
        assert_eq!(mode1.devices()[3].personality(), Some(ModeTag::Gpio));
        assert_eq!(mode2.devices()[3].personality(), Some(ModeTag::SpiMaster));
        assert_eq!(
            SimDriver::mode0().devices()[1].personality(),
            Some(ModeTag::Gpio)
        );
        assert!(SimDriver::preset("mode4").is_none());
    }

    #[test]
    fn interface_opens_once() {
        let sim = SimDriver::mode3();
        let h = sim.open(0).unwrap();
        assert_eq!(sim.open(0), Err(Ft4222Status::DeviceNotOpened));
        let info = sim.get_device_info_detail(0).unwrap();
        assert!(info.flags.contains(DeviceFlags::OPEN));
        sim.close(h).unwrap();
        assert_eq!(sim.open_handles(), 0);
        assert_eq!(sim.open(1), Err(Ft4222Status::DeviceNotFound));
    }

    #[test]
    fn closed_handle_is_invalid() {
        let sim = SimDriver::mode3();
        let h = sim.open(0).unwrap();
        let raw = h.as_raw();
        sim.close(h).unwrap();
        let stale = FtHandle::from_raw(raw);
        assert_eq!(sim.get_clock(&stale), Err(Ft4222Status::InvalidHandle));
        assert_eq!(sim.close(stale), Err(Ft4222Status::InvalidHandle));
    }

    #[test]
    fn gpio_only_on_gpio_interface() {
        let sim = SimDriver::mode0();
        let a = sim.open_ex(OpenTarget::Description("FT4222 A")).unwrap();
        assert_eq!(
            sim.gpio_init(&a, [Direction::Input; 4]),
            Err(Ft4222Status::GpioNotSupportedInThisMode)
        );
        let b = sim.open_ex(OpenTarget::Serial("SIM0001B")).unwrap();
        sim.gpio_init(&b, [Direction::Output, Direction::Input, Direction::Input, Direction::Input])
            .unwrap();
        sim.gpio_write(&b, PortId::Port0, true).unwrap();
        assert!(sim.gpio_level(PortId::Port0));
        assert_eq!(
            sim.gpio_write(&b, PortId::Port1, true),
            Err(Ft4222Status::GpioWriteNotSupported)
        );
    }

    #[test]
    fn gpio_uninitialize_releases_pins() {
        let sim = SimDriver::mode0();
        let b = sim.open_ex(OpenTarget::Description("FT4222 B")).unwrap();
        sim.gpio_init(&b, [Direction::Output; 4]).unwrap();
        sim.gpio_write(&b, PortId::Port2, false).unwrap();
        assert!(sim.pins_configured());

        sim.uninitialize(&b).unwrap();
        assert!(!sim.pins_configured());
        assert!(!sim.has_protocol_state());
        sim.drive_input(PortId::Port2, true);
        assert!(sim.gpio_level(PortId::Port2));
        sim.close(b).unwrap();
    }

    #[test]
    fn oversized_write_is_rejected() {
        assert_eq!(tx_len(&[0u8; 0xFFFF]), Ok(0xFFFF));
        assert_eq!(tx_len(&vec![0u8; 0x1_0000]), Err(Ft4222Status::InvalidArgs));
    }

    #[test]
    fn gpio_trigger_queue() {
        let sim = SimDriver::mode0();
        let b = sim.open(1).unwrap();
        sim.gpio_init(&b, [Direction::Input; 4]).unwrap();
        sim.gpio_set_input_trigger(&b, PortId::Port3, GpioTrigger::RISING | GpioTrigger::FALLING)
            .unwrap();
        sim.drive_input(PortId::Port3, true);
        sim.drive_input(PortId::Port3, false);
        assert_eq!(sim.gpio_get_trigger_status(&b, PortId::Port3).unwrap(), 2);
        let events = sim.gpio_read_trigger_queue(&b, PortId::Port3, 1).unwrap();
        assert_eq!(events, vec![GpioTrigger::RISING]);
        assert_eq!(sim.gpio_get_trigger_status(&b, PortId::Port3).unwrap(), 1);
    }

    #[test]
    fn spi_loopback_and_queued_response() {
        let sim = SimDriver::mode2();
        let h = sim.open(0).unwrap();
        sim.spi_master_init(&h, &SpiMasterConfig::new()).unwrap();
        assert_eq!(
            sim.spi_master_single_read_write(&h, &[1, 2, 3], true).unwrap(),
            vec![1, 2, 3]
        );
        sim.queue_miso(&[0xEF, 0x40]);
        assert_eq!(
            sim.spi_master_single_read(&h, 3, true).unwrap(),
            vec![0xEF, 0x40, 0xFF]
        );
        assert_eq!(
            sim.spi_master_multi_read_write(&h, &[0x6B], &[], 1),
            Err(Ft4222Status::IsNotSpiMultiMode)
        );
        sim.spi_master_set_lines(&h, IoMode::Quad).unwrap();
        sim.spi_master_multi_read_write(&h, &[0x6B], &[0, 0, 0], 4).unwrap();
        assert_eq!(sim.mosi(), vec![1, 2, 3, 0x6B, 0, 0, 0]);
    }

    #[test]
    fn i2c_eeprom_target() {
        let sim = SimDriver::mode3().with_i2c_target(0x50, vec![0; 8]);
        let h = sim.open(0).unwrap();
        sim.i2c_master_init(&h, 400).unwrap();
        sim.i2c_master_write(&h, 0x50, &[2, 0xAA, 0xBB]).unwrap();
        sim.i2c_master_write(&h, 0x50, &[2]).unwrap();
        assert_eq!(sim.i2c_master_read(&h, 0x50, 2).unwrap(), vec![0xAA, 0xBB]);
        assert_eq!(
            sim.i2c_master_read(&h, 0x51, 1),
            Err(Ft4222Status::FailedToReadDevice)
        );
        let status = sim.i2c_master_get_status(&h).unwrap();
        assert!(status.contains(CtrlStatus::SLAVE_ADDR_NACK));
    }

    #[test]
    fn uninitialize_clears_protocol() {
        let sim = SimDriver::mode3();
        let h = sim.open(0).unwrap();
        sim.i2c_slave_init(&h).unwrap();
        assert!(sim.has_protocol_state());
        sim.set_fail_uninitialize(true);
        assert_eq!(sim.uninitialize(&h), Err(Ft4222Status::IoError));
        sim.set_fail_uninitialize(false);
        sim.uninitialize(&h).unwrap();
        assert!(!sim.has_protocol_state());
        assert_eq!(
            sim.ops(),
            vec!["open", "i2c_slave_init", "uninitialize", "uninitialize"]
        );
    }
}
