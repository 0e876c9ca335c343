//! Low-level protobuf wire format helpers.
//!
//! The scanner needs just enough of the wire format to read the path
//! field's length prefix and, when salvaging, to step over whole fields
//! without interpreting them.
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 5: I32 (fixed32, sfixed32, float)

use crate::error::{Error, Result};
use crate::MAX_FIELD_NUMBER;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    I32 = 5,
}

impl WireType {
    /// Encodes a single-byte field key for `field_number` with this wire type.
    ///
    /// Only meaningful for field numbers below 16.
    pub const fn key(self, field_number: u8) -> u8 {
        (field_number << 3) | self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::I32),
            _ => Err(Error::invalid_wire_format(
                0,
                format!("unknown wire type: {}", value),
            )),
        }
    }
}

/// Decode a varint starting at `offset`.
///
/// Returns the decoded value and the offset just past its last byte. Bits
/// beyond the 64th are dropped; the length of the encoding is not bounded.
pub fn decode_varint(data: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    let mut position = offset;

    loop {
        let Some(&byte) = data.get(position) else {
            return Err(Error::truncated(position));
        };
        position += 1;

        result |= u64::from(byte & 0x7F).checked_shl(shift).unwrap_or(0);
        shift = shift.saturating_add(7);

        if byte & 0x80 == 0 {
            return Ok((result, position));
        }
    }
}

/// Consume a single protobuf field from the start of `data`.
///
/// Returns the field number and total bytes consumed (tag and value).
pub fn consume_field(data: &[u8]) -> Result<(u32, usize)> {
    if data.is_empty() {
        return Err(Error::invalid_wire_format(0, "empty data"));
    }

    let (tag, tag_len) = decode_varint(data, 0)
        .map_err(|_| Error::invalid_wire_format(0, "failed to decode field tag"))?;

    let wire_type = WireType::try_from((tag & 0x07) as u8)?;
    let field_number = tag >> 3;

    if field_number == 0 || field_number > u64::from(MAX_FIELD_NUMBER) {
        return Err(Error::invalid_wire_format(
            0,
            format!("field number {} out of range", field_number),
        ));
    }

    let value_len = match wire_type {
        WireType::Varint => {
            let (_, end) = decode_varint(data, tag_len).map_err(|_| {
                Error::invalid_wire_format(tag_len, "failed to decode varint value")
            })?;
            end - tag_len
        }
        WireType::I64 => fixed_len(data, tag_len, 8)?,
        WireType::I32 => fixed_len(data, tag_len, 4)?,
        WireType::Len => {
            let (length, end) = decode_varint(data, tag_len).map_err(|_| {
                Error::invalid_wire_format(tag_len, "failed to decode length prefix")
            })?;

            let available = data.len() - end;
            match usize::try_from(length) {
                Ok(length) if length <= available => end - tag_len + length,
                _ => {
                    return Err(Error::invalid_wire_format(
                        tag_len,
                        format!(
                            "not enough bytes for LEN field (need {}, have {})",
                            length, available
                        ),
                    ))
                }
            }
        }
        // The tag itself is the whole marker
        WireType::StartGroup | WireType::EndGroup => 0,
    };

    Ok((field_number as u32, tag_len + value_len))
}

fn fixed_len(data: &[u8], tag_len: usize, width: usize) -> Result<usize> {
    if data.len() < tag_len + width {
        return Err(Error::invalid_wire_format(
            tag_len,
            format!("not enough bytes for {}-byte fixed value", width),
        ));
    }
    Ok(width)
}
