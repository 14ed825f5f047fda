//! Advertising data (AD) structure parser.
//!
//! A legacy advertising payload is a list of `length | type | data`
//! structures. Only the types the beacon decoder and the output formats care
//! about are picked out; everything else is skipped.

use crate::advertisement::RawAdvertisement;
use crate::decoder::format_uuid;

pub const AD_TYPE_INCOMPLETE_16_SERVICE_LIST: u8 = 0x02;
pub const AD_TYPE_COMPLETE_16_SERVICE_LIST: u8 = 0x03;
pub const AD_TYPE_INCOMPLETE_32_SERVICE_LIST: u8 = 0x04;
pub const AD_TYPE_COMPLETE_32_SERVICE_LIST: u8 = 0x05;
pub const AD_TYPE_INCOMPLETE_128_SERVICE_LIST: u8 = 0x06;
pub const AD_TYPE_COMPLETE_128_SERVICE_LIST: u8 = 0x07;
pub const AD_TYPE_SHORT_NAME: u8 = 0x08;
pub const AD_TYPE_FULL_NAME: u8 = 0x09;
pub const AD_TYPE_SERVICE_DATA_16: u8 = 0x16;
pub const AD_TYPE_SERVICE_DATA_32: u8 = 0x20;
pub const AD_TYPE_SERVICE_DATA_128: u8 = 0x21;
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// Fields extracted from one advertising payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisingData {
    pub local_name: Option<String>,
    pub advertisement: RawAdvertisement,
}

/// Expand a 16- or 32-bit UUID using the Bluetooth base UUID.
pub fn expand_short_uuid(value: u32) -> String {
    format!("{value:08x}-0000-1000-8000-00805f9b34fb")
}

/// Render a 128-bit UUID sent little-endian over the air.
fn uuid128_from_le(bytes: &[u8]) -> Option<String> {
    let mut be: [u8; 16] = bytes.try_into().ok()?;
    be.reverse();
    Some(format_uuid(&be))
}

fn split_uuid(data: &[u8], width: usize) -> Option<(String, &[u8])> {
    if data.len() < width {
        return None;
    }
    let (uuid, rest) = data.split_at(width);
    let uuid = match width {
        2 => expand_short_uuid(u32::from(u16::from_le_bytes([uuid[0], uuid[1]]))),
        4 => expand_short_uuid(u32::from_le_bytes([uuid[0], uuid[1], uuid[2], uuid[3]])),
        _ => uuid128_from_le(uuid)?,
    };
    Some((uuid, rest))
}

fn push_uuid_list(uuids: &mut Vec<String>, data: &[u8], width: usize) {
    for chunk in data.chunks_exact(width) {
        if let Some((uuid, _)) = split_uuid(chunk, width) {
            uuids.push(uuid);
        }
    }
}

/// Parse AD structures.
///
/// Parsing stops at a zero-length structure or one that runs past the end of
/// `data`; whatever was parsed before that is returned.
pub fn parse(data: &[u8]) -> AdvertisingData {
    let mut parsed = AdvertisingData::default();
    let mut short_name = None;

    let mut offset = 0;
    while offset + 2 <= data.len() {
        let len = usize::from(data[offset]);
        if len == 0 || offset + 1 + len > data.len() {
            break;
        }

        let ad_type = data[offset + 1];
        let body = &data[offset + 2..offset + 1 + len];
        let advertisement = &mut parsed.advertisement;

        match ad_type {
            AD_TYPE_MANUFACTURER_DATA if body.len() >= 2 => {
                let company_id = u16::from_le_bytes([body[0], body[1]]);
                advertisement
                    .manufacturer_data
                    .push((company_id, body[2..].to_vec()));
            }
            AD_TYPE_SERVICE_DATA_16 | AD_TYPE_SERVICE_DATA_32 | AD_TYPE_SERVICE_DATA_128 => {
                let width = match ad_type {
                    AD_TYPE_SERVICE_DATA_16 => 2,
                    AD_TYPE_SERVICE_DATA_32 => 4,
                    _ => 16,
                };
                if let Some((uuid, payload)) = split_uuid(body, width) {
                    advertisement.service_data.push((uuid, payload.to_vec()));
                }
            }
            AD_TYPE_INCOMPLETE_16_SERVICE_LIST | AD_TYPE_COMPLETE_16_SERVICE_LIST => {
                push_uuid_list(&mut advertisement.service_uuids, body, 2);
            }
            AD_TYPE_INCOMPLETE_32_SERVICE_LIST | AD_TYPE_COMPLETE_32_SERVICE_LIST => {
                push_uuid_list(&mut advertisement.service_uuids, body, 4);
            }
            AD_TYPE_INCOMPLETE_128_SERVICE_LIST | AD_TYPE_COMPLETE_128_SERVICE_LIST => {
                push_uuid_list(&mut advertisement.service_uuids, body, 16);
            }
            AD_TYPE_FULL_NAME => {
                parsed.local_name = Some(String::from_utf8_lossy(body).into_owned());
            }
            AD_TYPE_SHORT_NAME => {
                short_name = Some(String::from_utf8_lossy(body).into_owned());
            }
            _ => {}
        }

        offset += 1 + len;
    }

    if parsed.local_name.is_none() {
        parsed.local_name = short_name;
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{decode_advertisement, is_eddystone_uuid};
    use crate::test_utils::{ibeacon_payload, tlm_payload};

    fn structure(ad_type: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![body.len() as u8 + 1, ad_type];
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn parses_ibeacon_advertisement() {
        let mut manufacturer = vec![0x4C, 0x00];
        manufacturer.extend(ibeacon_payload());

        let mut data = structure(0x01, &[0x06]); // flags
        data.extend(structure(AD_TYPE_MANUFACTURER_DATA, &manufacturer));

        let parsed = parse(&data);
        assert_eq!(
            parsed.advertisement.manufacturer_data,
            vec![(0x004C, ibeacon_payload())]
        );
        assert!(decode_advertisement(&parsed.advertisement).ibeacon().is_some());
    }

    #[test]
    fn parses_eddystone_advertisement() {
        let mut service_data = vec![0xAA, 0xFE];
        service_data.extend(tlm_payload());

        let mut data = structure(AD_TYPE_COMPLETE_16_SERVICE_LIST, &[0xAA, 0xFE]);
        data.extend(structure(AD_TYPE_SERVICE_DATA_16, &service_data));
        data.extend(structure(AD_TYPE_FULL_NAME, b"kontakt"));

        let parsed = parse(&data);
        assert_eq!(parsed.local_name.as_deref(), Some("kontakt"));
        assert_eq!(
            parsed.advertisement.service_uuids,
            vec!["0000feaa-0000-1000-8000-00805f9b34fb".to_string()]
        );
        let (uuid, payload) = &parsed.advertisement.service_data[0];
        assert!(is_eddystone_uuid(uuid));
        assert_eq!(payload, &tlm_payload());
    }

    #[test]
    fn uuid128_is_reversed() {
        let le: Vec<u8> = (0..16u8).rev().collect();
        let parsed = parse(&structure(AD_TYPE_COMPLETE_128_SERVICE_LIST, &le));
        assert_eq!(
            parsed.advertisement.service_uuids,
            vec!["00010203-0405-0607-0809-0a0b0c0d0e0f".to_string()]
        );
    }

    #[test]
    fn complete_name_wins_over_short_name() {
        let mut data = structure(AD_TYPE_SHORT_NAME, b"Bea");
        data.extend(structure(AD_TYPE_FULL_NAME, b"Beacon"));
        assert_eq!(parse(&data).local_name.as_deref(), Some("Beacon"));

        let data = structure(AD_TYPE_SHORT_NAME, b"Bea");
        assert_eq!(parse(&data).local_name.as_deref(), Some("Bea"));
    }

    #[test]
    fn truncated_structure_keeps_earlier_fields() {
        let mut data = structure(AD_TYPE_FULL_NAME, b"tag");
        // claims 10 bytes, only 3 follow
        data.extend_from_slice(&[0x0A, AD_TYPE_MANUFACTURER_DATA, 0x4C, 0x00]);

        let parsed = parse(&data);
        assert_eq!(parsed.local_name.as_deref(), Some("tag"));
        assert!(parsed.advertisement.manufacturer_data.is_empty());
    }

    #[test]
    fn zero_length_stops_parsing() {
        let mut data = vec![0x00, 0x00];
        data.extend(structure(AD_TYPE_FULL_NAME, b"hidden"));
        assert_eq!(parse(&data), AdvertisingData::default());
    }

    #[test]
    fn short_manufacturer_and_service_data_are_skipped() {
        let mut data = structure(AD_TYPE_MANUFACTURER_DATA, &[0x4C]);
        data.extend(structure(AD_TYPE_SERVICE_DATA_16, &[0xAA]));
        assert!(parse(&data).advertisement.is_empty());
    }

    #[test]
    fn empty_payload() {
        assert_eq!(parse(&[]), AdvertisingData::default());
    }
}
