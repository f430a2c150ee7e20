//! Read and write DWARF's "Little Endian Base 128" (LEB128) variable length
//! integer encoding.
//!
//! The official documentation for LEB128 is the DWARF 4 standard, section
//! 7.6. Reading advances the given slice past the bytes consumed; writing
//! appends to the given vector and returns the number of bytes written.

const CONTINUATION_BIT: u8 = 1 << 7;
const SIGN_BIT: u8 = 1 << 6;

#[inline]
fn low_bits_of_byte(byte: u8) -> u8 {
    byte & !CONTINUATION_BIT
}

#[inline]
fn low_bits_of_u64(val: u64) -> u8 {
    let byte = val & (std::u8::MAX as u64);
    low_bits_of_byte(byte as u8)
}

/// A module for reading LEB128-encoded signed and unsigned integers.
pub mod read {
    use super::{low_bits_of_byte, CONTINUATION_BIT, SIGN_BIT};
    use crate::parser::{Error, Result};

    fn take(input: &mut &[u8]) -> Result<u8> {
        match input.split_first() {
            Some((&byte, rest)) => {
                *input = rest;
                Ok(byte)
            }
            None => Err(Error::UnexpectedEof),
        }
    }

    /// Read an unsigned LEB128 number from the front of the given slice.
    pub fn unsigned(input: &mut &[u8]) -> Result<u64> {
        let mut result = 0;
        let mut shift = 0;

        loop {
            let byte = take(input)?;
            if shift == 63 && byte != 0x00 && byte != 0x01 {
                return Err(Error::BadUnsignedLeb128);
            }

            let low_bits = u64::from(low_bits_of_byte(byte));
            result |= low_bits << shift;

            if byte & CONTINUATION_BIT == 0 {
                return Ok(result);
            }

            shift += 7;
        }
    }

    /// Read a signed LEB128 number from the front of the given slice.
    pub fn signed(input: &mut &[u8]) -> Result<i64> {
        let mut result = 0;
        let mut shift = 0;
        let size = 64;
        let mut byte;

        loop {
            byte = take(input)?;
            if shift == 63 && byte != 0x00 && byte != 0x7f {
                return Err(Error::BadSignedLeb128);
            }

            let low_bits = i64::from(low_bits_of_byte(byte));
            result |= low_bits << shift;
            shift += 7;

            if byte & CONTINUATION_BIT == 0 {
                break;
            }
        }

        if shift < size && (SIGN_BIT & byte) == SIGN_BIT {
            // Sign extend the result.
            result |= !0 << shift;
        }

        Ok(result)
    }
}

/// A module for writing LEB128-encoded signed and unsigned integers.
pub mod write {
    use super::{low_bits_of_u64, CONTINUATION_BIT};

    /// Write the given unsigned number using the LEB128 encoding to the given
    /// vector, and return the number of bytes written.
    pub fn unsigned(out: &mut Vec<u8>, mut val: u64) -> usize {
        let mut bytes_written = 0;
        loop {
            let mut byte = low_bits_of_u64(val);
            val >>= 7;
            if val != 0 {
                // More bytes to come, so set the continuation bit.
                byte |= CONTINUATION_BIT;
            }

            out.push(byte);
            bytes_written += 1;

            if val == 0 {
                return bytes_written;
            }
        }
    }

    /// Write the given signed number using the LEB128 encoding to the given
    /// vector, and return the number of bytes written.
    pub fn signed(out: &mut Vec<u8>, mut val: i64) -> usize {
        let mut bytes_written = 0;
        loop {
            let mut byte = val as u8;
            // Keep the sign bit for testing.
            val >>= 6;
            let done = val == 0 || val == -1;
            if done {
                byte &= !CONTINUATION_BIT;
            } else {
                // Remove the sign bit.
                val >>= 1;
                byte |= CONTINUATION_BIT;
            }

            out.push(byte);
            bytes_written += 1;

            if done {
                return bytes_written;
            }
        }
    }
}
