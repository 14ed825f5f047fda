//! Raw advertisement input as delivered by a scanner backend.

use crate::address::DeviceAddress;
use std::time::SystemTime;

/// Company identifier assigned to Apple by the Bluetooth SIG.
pub const APPLE_COMPANY_ID: u16 = 0x004C;

/// Reserved 16-bit service UUID for Eddystone, as it appears inside UUID strings.
pub const EDDYSTONE_SERVICE_MARKER: &str = "feaa";

/// Manufacturer and service data of one advertisement.
///
/// Both lists keep the order the backend delivered them in. The decoder
/// walks them front to back, so for duplicate or competing entries the last
/// one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAdvertisement {
    /// Company identifier → payload, company-ID prefix already stripped.
    pub manufacturer_data: Vec<(u16, Vec<u8>)>,
    /// Service UUID (string form) → payload.
    pub service_data: Vec<(String, Vec<u8>)>,
    /// Advertised service UUIDs.
    pub service_uuids: Vec<String>,
}

impl RawAdvertisement {
    pub fn is_empty(&self) -> bool {
        self.manufacturer_data.is_empty()
            && self.service_data.is_empty()
            && self.service_uuids.is_empty()
    }

    /// Append manufacturer data, keeping insertion order.
    pub fn with_manufacturer_data(mut self, company_id: u16, data: impl Into<Vec<u8>>) -> Self {
        self.manufacturer_data.push((company_id, data.into()));
        self
    }

    /// Append service data, keeping insertion order.
    pub fn with_service_data(mut self, uuid: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.service_data.push((uuid.into(), data.into()));
        self
    }
}

/// One advertisement as seen by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisementEvent {
    pub address: DeviceAddress,
    /// Local name, when the device advertises one
    pub name: Option<String>,
    /// Received signal strength in dBm
    pub rssi: Option<i16>,
    /// When the advertisement was received
    pub timestamp: SystemTime,
    pub advertisement: RawAdvertisement,
}

impl AdvertisementEvent {
    pub fn new(address: DeviceAddress, advertisement: RawAdvertisement) -> Self {
        Self {
            address,
            name: None,
            rssi: None,
            timestamp: SystemTime::now(),
            advertisement,
        }
    }
}
