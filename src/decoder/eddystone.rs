//! Eddystone service-data frames (UID, URL, TLM).
//!
//! Byte 0 of the service data selects the frame layout. Multi-byte values
//! are big-endian.

use super::reader::FrameReader;
use super::{DecodeError, FrameFormat};
use crate::beacon::{EddystoneFrame, Telemetry};

pub const FRAME_TYPE_UID: u8 = 0x00;
pub const FRAME_TYPE_URL: u8 = 0x10;
pub const FRAME_TYPE_TLM: u8 = 0x20;

const TX_POWER_OFFSET: usize = 1;

pub const UID_MIN_LEN: usize = 18;
const UID_NAMESPACE: std::ops::Range<usize> = 2..12;
const UID_INSTANCE: std::ops::Range<usize> = 12..18;

pub const URL_MIN_LEN: usize = 3;
const URL_SCHEME_OFFSET: usize = 2;
const URL_BODY_OFFSET: usize = 3;

pub const TLM_MIN_LEN: usize = 14;
const TLM_VERSION_OFFSET: usize = 1;
const TLM_BATTERY_OFFSET: usize = 2;
const TLM_TEMPERATURE_OFFSET: usize = 4;
const TLM_PDU_COUNT_OFFSET: usize = 6;
const TLM_UPTIME_OFFSET: usize = 10;

/// Decode Eddystone service data.
///
/// Unknown frame types are not an error: they come back as
/// [`EddystoneFrame::Other`] carrying the discriminator byte.
pub fn decode(data: &[u8]) -> Result<EddystoneFrame, DecodeError> {
    let Some(&frame_type) = data.first() else {
        return Err(DecodeError::Empty {
            frame: FrameFormat::Eddystone,
        });
    };

    match frame_type {
        FRAME_TYPE_UID => decode_uid(data),
        FRAME_TYPE_URL => decode_url(data),
        FRAME_TYPE_TLM => decode_tlm(data),
        other => Ok(EddystoneFrame::Other { frame_type: other }),
    }
}

fn decode_uid(data: &[u8]) -> Result<EddystoneFrame, DecodeError> {
    let reader = FrameReader::new(FrameFormat::EddystoneUid, data);
    reader.require_len(UID_MIN_LEN)?;

    Ok(EddystoneFrame::Uid {
        tx_power: reader.read_i8(TX_POWER_OFFSET)?,
        namespace: reader.read_hex(UID_NAMESPACE)?,
        instance: reader.read_hex(UID_INSTANCE)?,
    })
}

fn decode_url(data: &[u8]) -> Result<EddystoneFrame, DecodeError> {
    let reader = FrameReader::new(FrameFormat::EddystoneUrl, data);
    reader.require_len(URL_MIN_LEN)?;

    Ok(EddystoneFrame::Url {
        tx_power: reader.read_i8(TX_POWER_OFFSET)?,
        url_scheme: reader.read_u8(URL_SCHEME_OFFSET)?,
        encoded_url: reader.read_hex(URL_BODY_OFFSET..data.len())?,
    })
}

fn decode_tlm(data: &[u8]) -> Result<EddystoneFrame, DecodeError> {
    let reader = FrameReader::new(FrameFormat::EddystoneTlm, data);
    reader.require_len(TLM_MIN_LEN)?;

    // 8.8 fixed point
    let temperature = reader.read_i16_be(TLM_TEMPERATURE_OFFSET)?;

    Ok(EddystoneFrame::Tlm(Telemetry {
        version: reader.read_u8(TLM_VERSION_OFFSET)?,
        battery_voltage_mv: reader.read_u16_be(TLM_BATTERY_OFFSET)?,
        temperature_c: f64::from(temperature) / 256.0,
        advertising_pdu_count: reader.read_u32_be(TLM_PDU_COUNT_OFFSET)?,
        seconds_since_boot: reader.read_u32_be(TLM_UPTIME_OFFSET)?,
    }))
}
