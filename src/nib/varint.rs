//! Flex numbers: the archive's variable-length integers.
//!
//! Each byte carries 7 bits, least significant chunk first. Unlike LEB128 the
//! *last* byte is the one with the high bit set; every earlier byte has it
//! clear. Values wider than 31 bits are rejected.

use crate::util::{Error, Result};

/// Bit marking the final byte of a flex number.
pub const TERMINATOR_BIT: u8 = 0x80;

/// Largest shift accepted before a terminator must appear.
const MAX_SHIFT: u32 = 30;

/// Largest decodable value (31 bits).
const MAX_VALUE: u32 = (1 << 31) - 1;

/// Decode a flex number at `offset`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode(bytes: &[u8], offset: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;
    let mut pos = offset;

    loop {
        let byte = *bytes
            .get(pos)
            .ok_or_else(|| Error::corrupt(format!("flex number runs past end at offset {pos}")))?;
        pos += 1;

        let chunk = u32::from(byte & 0x7F);
        if chunk > MAX_VALUE >> shift {
            return Err(Error::MalformedVarint { offset });
        }
        value |= chunk << shift;
        shift += 7;

        if byte & TERMINATOR_BIT != 0 {
            break;
        }
        if shift > MAX_SHIFT {
            return Err(Error::MalformedVarint { offset });
        }
    }

    Ok((value, pos - offset))
}

/// Append the flex encoding of `value` to `buf`.
pub fn encode_into(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let chunk = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(chunk | TERMINATOR_BIT);
            return;
        }
        buf.push(chunk);
    }
}

/// Encode `value` as a fresh byte vector.
pub fn encode(value: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(value));
    encode_into(&mut buf, value);
    buf
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(value: u32) -> usize {
    let bits = 32 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}
