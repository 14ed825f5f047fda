use crate::address::DeviceAddress;
use crate::advertisement::{APPLE_COMPANY_ID, AdvertisementEvent, RawAdvertisement};
use std::time::{Duration, SystemTime};

/// A stable device address for unit tests.
pub const TEST_ADDRESS: DeviceAddress = DeviceAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// Eddystone service UUID in the form BlueZ reports it.
pub const EDDYSTONE_UUID: &str = "0000feaa-0000-1000-8000-00805f9b34fb";

/// Apple manufacturer payload: iBeacon, major 1, minor 2, -59 dBm.
pub fn ibeacon_payload() -> Vec<u8> {
    vec![
        0x02, 0x15, // iBeacon type and length
        0xE2, 0xC5, 0x6D, 0xB5, 0xDF, 0xFB, 0x48, 0xD2, // uuid
        0xB0, 0x60, 0xD0, 0xF5, 0xA7, 0x10, 0x96, 0xE0, //
        0x00, 0x01, // major
        0x00, 0x02, // minor
        0xC5, // tx power
    ]
}

/// Eddystone TLM: 3044 mV, 12.59375 °C, 5 PDUs, 1400 uptime ticks.
pub fn tlm_payload() -> Vec<u8> {
    vec![
        0x20, 0x00, // TLM, version 0
        0x0B, 0xE4, // battery
        0x0C, 0x98, // temperature
        0x00, 0x00, 0x00, 0x05, // PDU count
        0x00, 0x00, 0x05, 0x78, // uptime
    ]
}

/// Eddystone UID at -20 dBm.
pub fn uid_payload() -> Vec<u8> {
    vec![
        0x00, 0xEC, // UID, tx power
        0xED, 0xD1, 0xEB, 0xEA, 0xC0, 0x4E, 0x5D, 0xEF, 0xA0, 0x17, // namespace
        0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, // instance
    ]
}

/// Inverse of [`crate::decoder::to_hex`] for assertions.
pub fn from_hex(hex: &str) -> Vec<u8> {
    assert!(hex.len() % 2 == 0, "odd-length hex: {hex}");
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

/// An advertisement event with a fixed timestamp.
pub fn event(address: DeviceAddress, advertisement: RawAdvertisement) -> AdvertisementEvent {
    AdvertisementEvent {
        address,
        name: None,
        rssi: Some(-67),
        timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000),
        advertisement,
    }
}

/// An iBeacon advertisement event from `address`.
pub fn ibeacon_event(address: DeviceAddress) -> AdvertisementEvent {
    event(
        address,
        RawAdvertisement::default().with_manufacturer_data(APPLE_COMPANY_ID, ibeacon_payload()),
    )
}
