//! Advertisement decoder.
//!
//! Turns the manufacturer and service data of one advertisement into a
//! [`BeaconRecord`]. Decoding is a pure function of its input: no state is
//! kept between calls, and any input, including empty buffers, produces a
//! well-formed record.
//!
//! # One identity per advertisement
//!
//! Entries are applied in order and each one replaces what the previous one
//! set: manufacturer data first, then Eddystone service data. When an
//! advertisement carries several manufacturer blocks or several Eddystone
//! entries, the record describes the last one only. This is a known
//! limitation, kept on purpose so that records stay flat.
//!
//! A frame that fails to decode still replaces `raw_hex` (and `company_id`
//! for manufacturer data) but leaves the beacon decoded from an earlier
//! entry in place. Non-Apple manufacturer data clears it.

pub mod eddystone;
pub mod ibeacon;
mod reader;

use crate::advertisement::{APPLE_COMPANY_ID, EDDYSTONE_SERVICE_MARKER, RawAdvertisement};
use crate::beacon::{Beacon, BeaconRecord};
use std::fmt;
use thiserror::Error;

/// Frame layouts the decoder knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    IBeacon,
    Eddystone,
    EddystoneUid,
    EddystoneUrl,
    EddystoneTlm,
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameFormat::IBeacon => "iBeacon",
            FrameFormat::Eddystone => "Eddystone",
            FrameFormat::EddystoneUid => "Eddystone-UID",
            FrameFormat::EddystoneUrl => "Eddystone-URL",
            FrameFormat::EddystoneTlm => "Eddystone-TLM",
        })
    }
}

/// A frame that could not be decoded.
///
/// Never escapes [`decode_advertisement`]; the dispatcher turns it into a
/// record without structured fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{frame} frame is empty")]
    Empty { frame: FrameFormat },
    #[error("{frame} frame too short: need {needed} bytes, got {actual}")]
    TooShort {
        frame: FrameFormat,
        needed: usize,
        actual: usize,
    },
}

/// A record together with the frame errors met while building it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub record: BeaconRecord,
    pub errors: Vec<DecodeError>,
}

/// Lowercase hex encoding.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Lowercase 8-4-4-4-12 rendering of a 16-byte UUID.
pub fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex = to_hex(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Whether a service UUID string refers to the Eddystone service.
pub fn is_eddystone_uuid(uuid: &str) -> bool {
    uuid.to_ascii_lowercase().contains(EDDYSTONE_SERVICE_MARKER)
}

/// Decode an advertisement into a beacon record.
pub fn decode_advertisement(advertisement: &RawAdvertisement) -> BeaconRecord {
    decode_advertisement_with_errors(advertisement).record
}

/// Like [`decode_advertisement`], also returning why frames were rejected.
pub fn decode_advertisement_with_errors(advertisement: &RawAdvertisement) -> Decoded {
    let mut decoded = Decoded::default();

    for (company_id, data) in &advertisement.manufacturer_data {
        apply_manufacturer_data(&mut decoded, *company_id, data);
    }

    for (uuid, data) in &advertisement.service_data {
        if is_eddystone_uuid(uuid) {
            apply_eddystone_data(&mut decoded, data);
        }
    }

    decoded
}

fn apply_manufacturer_data(decoded: &mut Decoded, company_id: u16, data: &[u8]) {
    let record = &mut decoded.record;
    record.company_id = Some(company_id);
    record.raw_hex = Some(to_hex(data));

    if company_id != APPLE_COMPANY_ID {
        record.beacon = None;
        return;
    }

    // a failed decode leaves the kind set by earlier entries
    match ibeacon::decode(data) {
        Ok(ibeacon) => record.beacon = Some(Beacon::IBeacon(ibeacon)),
        Err(e) => decoded.errors.push(e),
    }
}

fn apply_eddystone_data(decoded: &mut Decoded, data: &[u8]) {
    let record = &mut decoded.record;
    record.raw_hex = Some(to_hex(data));

    match eddystone::decode(data) {
        Ok(frame) => record.beacon = Some(Beacon::Eddystone(frame)),
        Err(e) => decoded.errors.push(e),
    }
}
