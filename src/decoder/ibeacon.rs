//! Apple iBeacon manufacturer-data layout.
//!
//! The payload starts after the company identifier:
//!
//! ```text
//! 0      2                    18      20      22
//! | type | proximity uuid (16) | major | minor | tx |
//! ```

use super::reader::FrameReader;
use super::{DecodeError, FrameFormat, format_uuid};
use crate::beacon::IBeacon;

pub const MIN_LEN: usize = 23;
pub const UUID_OFFSET: usize = 2;
pub const MAJOR_OFFSET: usize = 18;
pub const MINOR_OFFSET: usize = 20;
pub const TX_POWER_OFFSET: usize = 22;

/// Decode an Apple manufacturer-data payload as an iBeacon.
///
/// The two-byte type/length prefix is not checked.
pub fn decode(data: &[u8]) -> Result<IBeacon, DecodeError> {
    let reader = FrameReader::new(FrameFormat::IBeacon, data);
    reader.require_len(MIN_LEN)?;

    Ok(IBeacon {
        uuid: format_uuid(&reader.read_array::<16>(UUID_OFFSET)?),
        major: reader.read_u16_be(MAJOR_OFFSET)?,
        minor: reader.read_u16_be(MINOR_OFFSET)?,
        tx_power: reader.read_i8(TX_POWER_OFFSET)?,
    })
}
