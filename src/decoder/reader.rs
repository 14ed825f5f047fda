use super::{DecodeError, FrameFormat, to_hex};
use std::ops::Range;

/// Bounds-checked big-endian access to a frame buffer.
///
/// Every read that would run past the end of the buffer returns
/// [`DecodeError::TooShort`] instead of panicking.
pub(crate) struct FrameReader<'a> {
    frame: FrameFormat,
    payload: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(frame: FrameFormat, payload: &'a [u8]) -> Self {
        Self { frame, payload }
    }

    fn too_short(&self, needed: usize) -> DecodeError {
        DecodeError::TooShort {
            frame: self.frame,
            needed,
            actual: self.payload.len(),
        }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), DecodeError> {
        if self.payload.len() < needed {
            return Err(self.too_short(needed));
        }
        Ok(())
    }

    pub fn read_slice(&self, range: Range<usize>) -> Result<&'a [u8], DecodeError> {
        self.payload
            .get(range.clone())
            .ok_or_else(|| self.too_short(range.end))
    }

    pub fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_slice(offset..offset + N)?;
        <[u8; N]>::try_from(bytes).map_err(|_| self.too_short(offset + N))
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, DecodeError> {
        self.payload
            .get(offset)
            .copied()
            .ok_or_else(|| self.too_short(offset + 1))
    }

    pub fn read_i8(&self, offset: usize) -> Result<i8, DecodeError> {
        self.read_array::<1>(offset).map(i8::from_be_bytes)
    }

    pub fn read_u16_be(&self, offset: usize) -> Result<u16, DecodeError> {
        self.read_array(offset).map(u16::from_be_bytes)
    }

    pub fn read_i16_be(&self, offset: usize) -> Result<i16, DecodeError> {
        self.read_array(offset).map(i16::from_be_bytes)
    }

    pub fn read_u32_be(&self, offset: usize) -> Result<u32, DecodeError> {
        self.read_array(offset).map(u32::from_be_bytes)
    }

    pub fn read_hex(&self, range: Range<usize>) -> Result<String, DecodeError> {
        self.read_slice(range).map(to_hex)
    }
}
