//! Mode resolution against the simulated driver

use rft4222_core::{
    open_by_description, open_by_idx, open_by_location, resolve, DeviceType, Driver, Error,
    ModeTag, PortId, Resolution, MODE_TABLE,
};
use rft4222_dummy::{SimDevice, SimDriver};

fn single(description: &str, device_type: DeviceType, accepts_gpio: bool) -> SimDriver {
    SimDriver::new(vec![
        SimDevice::new(description, "T1", device_type).with_gpio(accepts_gpio)
    ])
}

#[test]
fn every_table_entry_resolves() {
    for (description, device_type, resolution) in MODE_TABLE {
        let expected = match resolution {
            Resolution::Stream(tag) => vec![(false, tag)],
            Resolution::ProbeGpio => vec![(true, ModeTag::Gpio), (false, ModeTag::SpiMaster)],
        };
        for (accepts_gpio, tag) in expected {
            let sim = single(description, device_type, accepts_gpio);
            let handle = open_by_idx(&sim, 0).unwrap();
            assert_eq!(handle.tag(), tag, "{} / {}", description, device_type);
            handle.close().unwrap();
            assert_eq!(sim.open_handles(), 0);
        }
    }
}

#[test]
fn unknown_pairs_are_invalid_mode() {
    let pairs = [
        ("FT4222 C", DeviceType::Dev4222H0),
        ("FT4222 D", DeviceType::Dev4222H0),
        ("FT4222", DeviceType::Dev4222H1_2),
        ("FT4222 A", DeviceType::Dev4222H3),
        ("FT4222A", DeviceType::Dev4222H0),
        ("FT4222 A", DeviceType::Dev232H),
        ("USB <-> Serial", DeviceType::Dev4222H0),
    ];
    for (description, device_type) in pairs {
        let sim = single(description, device_type, true);
        match open_by_idx(&sim, 0) {
            Err(Error::InvalidMode {
                description: d,
                device_type: t,
            }) => {
                assert_eq!(d, description);
                assert_eq!(t, device_type);
            }
            other => panic!("{} / {}: {:?}", description, device_type, other),
        }
        // The raw handle does not leak
        assert_eq!(sim.open_handles(), 0);
        assert_eq!(sim.count("gpio_init"), 0);
    }
}

#[test]
fn probe_success_is_rolled_back() {
    let sim = SimDriver::mode1();
    let handle = open_by_description(&sim, "FT4222 D").unwrap();
    assert_eq!(handle.tag(), ModeTag::Gpio);
    assert_eq!(
        sim.ops(),
        vec!["open_ex", "get_device_info", "gpio_init", "uninitialize"]
    );
    assert!(!sim.has_protocol_state());
    // All four pins are back to power-up defaults
    assert!(!sim.pins_configured());
    sim.drive_input(PortId::Port3, true);
    assert!(sim.gpio_level(PortId::Port3));
    handle.close().unwrap();
}

#[test]
fn probe_failure_makes_no_mutating_calls() {
    let sim = SimDriver::mode2();
    let handle = open_by_description(&sim, "FT4222 D").unwrap();
    assert_eq!(handle.tag(), ModeTag::SpiMaster);
    assert_eq!(sim.ops(), vec!["open_ex", "get_device_info", "gpio_init"]);
    assert!(!sim.has_protocol_state());
}

#[test]
fn probe_rollback_failure_is_fatal() {
    let sim = SimDriver::mode1();
    sim.set_fail_uninitialize(true);
    let err = open_by_description(&sim, "FT4222 D").unwrap_err();
    assert!(matches!(err, Error::ProbeRollback(_)));
    assert!(err.is_fatal());
    assert_eq!(sim.open_handles(), 0);
}

#[test]
fn short_info_failure_is_invalid_handle() {
    let sim = SimDriver::mode0();
    // A handle value the simulator never handed out
    let err = resolve(&sim, rft4222_core::FtHandle::from_raw(99)).unwrap_err();
    assert!(matches!(err, Error::InvalidHandle));
}

#[test]
fn index_boundary() {
    let sim = SimDriver::mode0();
    assert!(matches!(open_by_idx(&sim, -1), Err(Error::InvalidId(-1))));
    assert!(matches!(
        open_by_idx(&sim, 1 << 31),
        Err(Error::InvalidId(0x8000_0000))
    ));
    assert!(sim.calls().is_empty());

    let handle = open_by_idx(&sim, 0).unwrap();
    assert_eq!(sim.ops()[0], "open");
    handle.close().unwrap();

    // In range but past the end of the list: the driver decides
    let err = open_by_idx(&sim, (1 << 31) - 1).unwrap_err();
    assert_eq!(err.status(), Some(rft4222_core::Ft4222Status::DeviceNotFound));
}

#[test]
fn open_by_location_resolves() {
    let sim = SimDriver::mode0();
    let handle = open_by_location(&sim, 0x12).unwrap();
    assert_eq!(handle.tag(), ModeTag::Gpio);
    drop(handle);
    assert_eq!(sim.open_handles(), 0);
}

#[test]
fn device_list_matches_driver() {
    let sim = SimDriver::mode1();
    let list = rft4222_core::get_device_info_list(&sim).unwrap();
    assert_eq!(list.len(), 4);
    assert_eq!(list[3].description, "FT4222 D");
    assert_eq!(list[3].device_type, DeviceType::Dev4222H1_2);
    assert_eq!(sim.create_device_info_list().unwrap(), 4);
}
