//! Handle transitions against the simulated driver

use rft4222_core::prelude::*;
use rft4222_core::{
    open_by_description, ClkDiv, Direction, Error, Ft4222Status, GpioTrigger, IoMode, ModeTag,
    PortId, SlaveProtocol, SpiMaster, SpiMasterConfig, TransactionFlag, TransactionIdx,
};
use rft4222_dummy::SimDriver;

#[test]
fn gpio_round_trip_keeps_tag() {
    let sim = SimDriver::mode0();
    let stream = open_by_description(&sim, "FT4222 B")
        .unwrap()
        .into_gpio_stream()
        .unwrap();
    let gpio = stream
        .init_gpio([Direction::Output, Direction::Input, Direction::Input, Direction::Input])
        .unwrap();
    gpio.write(PortId::Port0, true).unwrap();
    assert!(gpio.read(PortId::Port0).unwrap());

    let stream = gpio.uninitialize().unwrap();
    assert_eq!(stream.tag(), ModeTag::Gpio);
    assert!(!sim.has_protocol_state());
    stream.close().unwrap();
    assert_eq!(sim.open_handles(), 0);
}

#[test]
fn uninitialize_releases_gpio_pins() {
    let sim = SimDriver::mode0();
    let stream = open_by_description(&sim, "FT4222 B")
        .unwrap()
        .into_gpio_stream()
        .unwrap();
    let gpio = stream.init_gpio([Direction::Output; 4]).unwrap();
    gpio.write(PortId::Port0, false).unwrap();
    assert!(sim.pins_configured());

    let stream = gpio.uninitialize().unwrap();
    assert!(!sim.pins_configured());
    // Port0 is no longer an output, so an external driver wins
    sim.drive_input(PortId::Port0, true);
    assert!(sim.gpio_level(PortId::Port0));
    stream.close().unwrap();
}

#[test]
fn spi_master_round_trip_returns_origin_type() {
    let sim = SimDriver::mode3();
    let stream = open_by_description(&sim, "FT4222")
        .unwrap()
        .into_data_stream()
        .unwrap();
    let spi = stream
        .init_single_spi_master(SpiMasterConfig::new().with_clk_div(ClkDiv::Div16))
        .unwrap();
    // The origin type is statically DataStream, so I2C is available again
    let stream = spi.uninitialize().unwrap();
    let i2c = stream.init_i2c_master(400).unwrap();
    i2c.close().unwrap();
    assert_eq!(
        sim.ops(),
        vec![
            "open_ex",
            "get_device_info",
            "spi_master_init",
            "uninitialize",
            "i2c_master_init",
            "uninitialize",
            "close",
        ]
    );
}

#[test]
fn spi_master_stream_round_trip() {
    let sim = SimDriver::mode2();
    let stream = open_by_description(&sim, "FT4222 C")
        .unwrap()
        .into_spi_master_stream()
        .unwrap();
    let spi = stream.init_quad_spi_master(SpiMasterConfig::new()).unwrap();
    let out = spi.multi_read_write(&[0xEB], &[0, 0, 0, 0], 4).unwrap();
    assert_eq!(out, vec![0xFF; 4]);
    let stream = spi.uninitialize().unwrap();
    assert_eq!(stream.tag(), ModeTag::SpiMaster);
}

#[test]
fn failed_uninitialize_still_releases() {
    let sim = SimDriver::mode2();
    let stream = open_by_description(&sim, "FT4222 A")
        .unwrap()
        .into_spi_master_stream()
        .unwrap();
    sim.set_fail_uninitialize(true);
    let spi = stream.init_single_spi_master(SpiMasterConfig::new()).unwrap();
    let err = spi.uninitialize().unwrap_err();
    assert_eq!(err.status(), Some(Ft4222Status::IoError));
    // A failed uninitialize still releases the handle
    assert_eq!(sim.open_handles(), 0);

    sim.set_fail_uninitialize(false);
    let stream = open_by_description(&sim, "FT4222 D")
        .unwrap()
        .into_spi_master_stream()
        .unwrap();
    let spi = stream.init_dual_spi_master(SpiMasterConfig::new()).unwrap();
    spi.close().unwrap();
}

#[test]
fn rejected_init_hands_stream_back() {
    let sim = SimDriver::mode0();
    let stream = open_by_description(&sim, "FT4222 A")
        .unwrap()
        .into_data_stream()
        .unwrap();
    let err = stream.init_i2c_master(5000).unwrap_err();
    assert!(matches!(err.error(), Error::InvalidArgs(_)));
    let stream = err.into_handle();
    assert_eq!(sim.count("i2c_master_init"), 0);

    let slave = stream.init_i2c_slave().unwrap();
    slave.set_address(0x22).unwrap();
    assert_eq!(slave.get_address().unwrap(), 0x22);
    assert!(matches!(slave.set_address(0x80), Err(Error::InvalidArgs(_))));
    assert_eq!(sim.count("i2c_slave_set_address"), 1);
    slave.set_address(0x7F).unwrap();
    assert_eq!(slave.get_address().unwrap(), 0x7F);
    slave.close().unwrap();
}

#[test]
fn native_rejection_converts_into_error() {
    fn init(sim: &SimDriver) -> rft4222_core::Result<()> {
        let stream = open_by_description(sim, "FT4222 B")?
            .into_gpio_stream()
            .map_err(|_| Error::InvalidArgs("not a GPIO stream".into()))?;
        let gpio = stream.init_gpio([Direction::Input; 4])?;
        gpio.close()
    }
    let sim = SimDriver::mode0();
    init(&sim).unwrap();
    assert_eq!(sim.open_handles(), 0);
}

#[test]
fn close_is_idempotent_through_drop() {
    let sim = SimDriver::mode3();
    {
        let handle = open_by_description(&sim, "FT4222").unwrap();
        let stream = handle.into_data_stream().unwrap();
        let slave = stream.init_raw_spi_slave().unwrap();
        slave.close().unwrap();
    }
    assert_eq!(sim.count("close"), 1);
    assert_eq!(sim.count("uninitialize"), 1);
}

#[test]
fn dropping_capability_releases_it() {
    let sim = SimDriver::mode3();
    {
        let stream = open_by_description(&sim, "FT4222")
            .unwrap()
            .into_data_stream()
            .unwrap();
        let _slave = stream.init_proto_spi_slave(SlaveProtocol::NoAck).unwrap();
        assert!(sim.has_protocol_state());
    }
    assert_eq!(sim.open_handles(), 0);
    assert_eq!(&sim.ops()[2..], ["spi_slave_init_ex", "uninitialize", "close"]);
}

#[test]
fn one_live_owner_per_interface() {
    let sim = SimDriver::mode0();
    let a = open_by_description(&sim, "FT4222 A").unwrap();
    // The interface is held by `a`; a second open is refused by the driver
    assert!(open_by_description(&sim, "FT4222 A").is_err());
    let stream = a.into_data_stream().unwrap();
    let spi = stream.init_single_spi_master(SpiMasterConfig::new()).unwrap();
    assert_eq!(sim.open_handles(), 1);
    let stream = spi.uninitialize().unwrap();
    assert_eq!(sim.open_handles(), 1);
    stream.close().unwrap();
    assert_eq!(sim.open_handles(), 0);
}

#[test]
fn set_io_mode_retypes_handle() {
    let sim = SimDriver::mode3();
    let stream = open_by_description(&sim, "FT4222")
        .unwrap()
        .into_data_stream()
        .unwrap();
    let single = stream.init_single_spi_master(SpiMasterConfig::new()).unwrap();
    single.set_cs_polarity(rft4222_core::CsPolarity::ActiveHigh).unwrap();
    let multi = match single.set_io_mode(IoMode::Dual).unwrap() {
        SpiMaster::Multi(m) => m,
        SpiMaster::Single(_) => panic!("expected multi I/O handle"),
    };
    multi.multi_read_write(&[0x3B], &[], 2).unwrap();
    let master = multi.set_io_mode(IoMode::Single).unwrap();
    assert!(matches!(master, SpiMaster::Single(_)));
    let stream = master.uninitialize().unwrap();
    assert_eq!(stream.tag(), ModeTag::DataStream);
    assert_eq!(sim.count("spi_master_set_lines"), 2);
}

#[test]
fn long_single_write_is_chunked() {
    let sim = SimDriver::mode3();
    let stream = open_by_description(&sim, "FT4222")
        .unwrap()
        .into_data_stream()
        .unwrap();
    let spi = stream.init_single_spi_master(SpiMasterConfig::new()).unwrap();
    let data = vec![0x5A; 70_000];
    assert_eq!(spi.single_write(&data, true).unwrap(), 70_000);
    assert_eq!(sim.count("spi_master_single_write"), 2);
    assert_eq!(sim.mosi().len(), 70_000);

    sim.queue_miso(&[1, 2]);
    let read = spi.single_read(65_536, true).unwrap();
    assert_eq!(read.len(), 65_536);
    assert_eq!(&read[..3], &[1, 2, 0xFF]);
    assert_eq!(spi.single_read_write(&[9, 8], false).unwrap(), vec![9, 8]);
}

#[test]
fn multi_transfer_limits() {
    let sim = SimDriver::mode3();
    let stream = open_by_description(&sim, "FT4222")
        .unwrap()
        .into_data_stream()
        .unwrap();
    let spi = stream.init_quad_spi_master(SpiMasterConfig::new()).unwrap();
    let calls = sim.calls().len();
    assert!(matches!(
        spi.multi_read_write(&[0; 16], &[], 1),
        Err(Error::InvalidArgs(_))
    ));
    assert!(matches!(
        spi.multi_read_write(&[], &[], 0),
        Err(Error::InvalidArgs(_))
    ));
    assert!(matches!(
        spi.multi_read_write(&[], &[], 65_536),
        Err(Error::InvalidArgs(_))
    ));
    assert_eq!(sim.calls().len(), calls);
    spi.reset_bus().unwrap();
    spi.reset_transaction(TransactionIdx::new(3).unwrap()).unwrap();
}

#[test]
fn spi_slave_queues() {
    let sim = SimDriver::mode0();
    let stream = open_by_description(&sim, "FT4222 A")
        .unwrap()
        .into_data_stream()
        .unwrap();
    let slave = stream.init_raw_spi_slave().unwrap();
    sim.push_spi_slave_rx(&[1, 2, 3]);
    assert_eq!(slave.get_rx_status().unwrap(), 3);
    assert_eq!(slave.read(2).unwrap(), vec![1, 2]);
    assert_eq!(slave.write(&[7, 7]).unwrap(), 2);
    assert_eq!(sim.slave_tx(), vec![7, 7]);
    assert!(matches!(slave.read(0), Err(Error::InvalidArgs(_))));
}

#[test]
fn i2c_master_transfers() {
    let sim = SimDriver::mode0().with_i2c_target(0x50, vec![0; 16]);
    let stream = open_by_description(&sim, "FT4222 A")
        .unwrap()
        .into_data_stream()
        .unwrap();
    let i2c = stream.init_i2c_master(100).unwrap();
    i2c.write(0x50, &[0, 0xDE, 0xAD]).unwrap();
    i2c.write_ex(0x50, TransactionFlag::START, &[0]).unwrap();
    let data = i2c.read_ex(0x50, TransactionFlag::REPEATED_START | TransactionFlag::STOP, 2);
    assert_eq!(data.unwrap(), vec![0xDE, 0xAD]);

    let err = i2c.read(0x51, 1).unwrap_err();
    assert_eq!(err.status(), Some(Ft4222Status::FailedToReadDevice));
    assert!(i2c
        .get_status()
        .unwrap()
        .contains(rft4222_core::CtrlStatus::SLAVE_ADDR_NACK));
    i2c.reset().unwrap();
    assert!(matches!(i2c.read(0x1_0000, 1), Err(Error::InvalidArgs(_))));
}

#[test]
fn gpio_trigger_queue_through_handle() {
    let sim = SimDriver::mode1();
    let stream = open_by_description(&sim, "FT4222 D")
        .unwrap()
        .into_gpio_stream()
        .unwrap();
    let gpio = stream.init_gpio([Direction::Input; 4]).unwrap();
    gpio.set_input_trigger(PortId::Port1, GpioTrigger::RISING).unwrap();
    sim.drive_input(PortId::Port1, true);
    sim.drive_input(PortId::Port1, false);
    sim.drive_input(PortId::Port1, true);
    assert_eq!(gpio.get_queued_trigger_event_count(PortId::Port1).unwrap(), 2);
    let events = gpio.read_trigger_queue(PortId::Port1, 10).unwrap();
    assert_eq!(events, vec![GpioTrigger::RISING; 2]);
    assert!(matches!(
        gpio.read_trigger_queue(PortId::Port1, 0),
        Err(Error::InvalidArgs(_))
    ));
}

#[test]
fn common_ops_on_every_handle() {
    let sim = SimDriver::mode0();
    let handle = open_by_description(&sim, "FT4222 A").unwrap();
    handle.common().set_clock(rft4222_core::ClockRate::Sys80MHz).unwrap();
    let version = handle.common().get_version().unwrap();
    assert_eq!(version.revision(), Some(rft4222_core::ChipVersion::RevD));

    let stream = handle.into_data_stream().unwrap();
    let i2c = stream.init_i2c_master(1000).unwrap();
    assert_eq!(i2c.get_clock().unwrap(), rft4222_core::ClockRate::Sys80MHz);
    assert_eq!(i2c.get_device_info().unwrap().description, "FT4222 A");
    i2c.chip_reset().unwrap();
    assert_eq!(sim.open_handles(), 0);
    assert_eq!(sim.count("uninitialize"), 0);
}
