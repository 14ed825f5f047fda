//! Bluetooth device address.
//!
//! Backends hand out addresses in different shapes (`bluer::Address`, raw
//! little-endian bytes from HCI reports). Everything downstream of the
//! scanner works with [`DeviceAddress`] only.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 6-byte Bluetooth device address in display order (most significant byte first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct DeviceAddress(pub [u8; 6]);

impl DeviceAddress {
    /// Build an address from the little-endian byte order used in HCI events.
    pub fn from_le_bytes(mut bytes: [u8; 6]) -> Self {
        bytes.reverse();
        Self(bytes)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl Serialize for DeviceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors returned when parsing a device address string.
#[derive(Error, Debug, PartialEq)]
pub enum ParseAddressError {
    #[error("invalid device address: expected 6 octets, got {0}")]
    OctetCount(usize),
    #[error("invalid device address: octet {0} must be two hex digits")]
    OctetWidth(usize),
    #[error("invalid device address: '{0}' is not valid hex")]
    NotHex(String),
}

impl FromStr for DeviceAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let octets: Vec<&str> = s.split([':', '-']).collect();
        if octets.len() != 6 {
            return Err(ParseAddressError::OctetCount(octets.len()));
        }

        let mut bytes = [0u8; 6];
        for (i, (slot, octet)) in bytes.iter_mut().zip(&octets).enumerate() {
            if octet.len() != 2 {
                return Err(ParseAddressError::OctetWidth(i));
            }
            *slot = u8::from_str_radix(octet, 16)
                .map_err(|_| ParseAddressError::NotHex(octet.to_string()))?;
        }

        Ok(DeviceAddress(bytes))
    }
}

impl From<[u8; 6]> for DeviceAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::Address> for DeviceAddress {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_uppercase_colon_separated() {
        let addr = DeviceAddress([0xC4, 0x7C, 0x8D, 0x0A, 0x01, 0xFF]);
        assert_eq!(addr.to_string(), "C4:7C:8D:0A:01:FF");
    }

    #[test]
    fn hci_byte_order_is_reversed() {
        let addr = DeviceAddress::from_le_bytes([0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(addr.to_string(), "01:02:03:04:05:06");
    }

    #[test]
    fn parses_colon_and_dash_forms() {
        let colon: DeviceAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        let dash: DeviceAddress = "AA-BB-CC-DD-EE-FF".parse().unwrap();
        assert_eq!(colon, dash);
        assert_eq!(colon.0, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(
            "AA:BB:CC".parse::<DeviceAddress>(),
            Err(ParseAddressError::OctetCount(3))
        );
        assert_eq!(
            "AA:BB:CC:DD:EE:F".parse::<DeviceAddress>(),
            Err(ParseAddressError::OctetWidth(5))
        );
        assert!(matches!(
            "AA:BB:CC:DD:EE:ZZ".parse::<DeviceAddress>(),
            Err(ParseAddressError::NotHex(_))
        ));
    }

    #[test]
    fn serializes_as_display_string() {
        let addr = DeviceAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            "\"AA:BB:CC:DD:EE:FF\""
        );
    }
}
