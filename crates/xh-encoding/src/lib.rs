//! Conversion functions to pack/unpack values for XBee API communication.
//!
//! All multi-byte integers on the wire are big-endian. Packed numbers use
//! the minimal number of bytes (`0` packs to an empty byte string); callers
//! that need a protocol-fixed width pad themselves, except for the 64-bit
//! serial which has a dedicated fixed-width packer.

use std::collections::BTreeSet;

use thiserror::Error;

/// Radix of one wire byte.
pub const BYTE_BASE: u64 = 0x100;

/// Scale from the millivolt-denominated ADC reading to volts.
pub const MILLIVOLTS_PER_VOLT: f64 = 1e-3;

/// The ADC reference is 1.2 V over a 10-bit range, so one count is
/// 1200/1024 mV. Hardware constant, not tunable.
const MILLIVOLTS_PER_ADC_COUNT: f64 = 1200.0 / 1024.0;

/// Errors from value pack/unpack conversions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    /// A packed number field is wider than 64 bits.
    #[error("packed number too wide: {actual} bytes, maximum {max}")]
    Overflow {
        /// Maximum width that fits the result type.
        max: usize,
        /// Width received.
        actual: usize,
    },

    /// A printed number parsed as neither an integer nor a float.
    #[error("unparsable printed number: {0:?}")]
    UnparsableNumber(String),
}

/// A printed number, which may be integral or fractional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Printed {
    /// Parsed as an integer.
    Int(i64),
    /// Parsed as a float.
    Float(f64),
}

/// Pack a number into a minimal big-endian byte string.
/// Example: `0x3ef7` => `[0x3e, 0xf7]`. Zero packs to an empty string.
pub fn number_to_bytes(mut n: u64) -> Vec<u8> {
    let mut bytes = Vec::new();
    while n > 0 {
        bytes.push((n % BYTE_BASE) as u8);
        n /= BYTE_BASE;
    }
    bytes.reverse();
    bytes
}

/// Pack a 64-bit serial number into a fixed 8-byte big-endian string, as
/// required by the `dest_addr_long` field.
pub fn number_to_serial_bytes(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

/// Unpack a big-endian byte string to an unsigned number.
/// Example: `[0x3e, 0xf7]` => `0x3ef7`. An empty string unpacks to 0.
pub fn bytes_to_number(bytes: &[u8]) -> Result<u64, EncodingError> {
    if bytes.len() > 8 {
        return Err(EncodingError::Overflow {
            max: 8,
            actual: bytes.len(),
        });
    }
    let mut n = 0u64;
    for &b in bytes {
        n = n * BYTE_BASE + u64::from(b);
    }
    Ok(n)
}

/// Parse a printed number. Tries integer first (decimal, then bare hex),
/// then float. Example: `"3"` => `Int(3)`, `"2.2"` => `Float(2.2)`.
pub fn printed_to_number(s: &str) -> Result<Printed, EncodingError> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Printed::Int(n));
    }
    if let Ok(n) = i64::from_str_radix(trimmed, 16) {
        return Ok(Printed::Int(n));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Ok(Printed::Float(f));
    }
    Err(EncodingError::UnparsableNumber(s.to_owned()))
}

/// Format a number as printed hex digits, without prefix.
pub fn number_to_printed_hex(n: u64) -> String {
    format!("{:x}", n)
}

/// Unpack a bit field into the set of indices of its set bits. Bit 0 is
/// the least-significant bit of the whole (big-endian) byte run, so in
/// `[0x01, 0x05]` bits {0, 2, 8} are set.
pub fn bit_field_to_index_set(bytes: &[u8]) -> BTreeSet<u32> {
    let mut indices = BTreeSet::new();
    for (byte_index, &byte) in bytes.iter().rev().enumerate() {
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                indices.insert(byte_index as u32 * 8 + bit);
            }
        }
    }
    indices
}

/// Unpack a byte string to a number and convert that number to volts as
/// measured on an analog input pin.
pub fn raw_to_volts(bytes: &[u8]) -> Result<f64, EncodingError> {
    Ok(number_to_volts(bytes_to_number(bytes)?))
}

/// Convert a raw ADC reading to volts.
pub fn number_to_volts(n: u64) -> f64 {
    n as f64 * MILLIVOLTS_PER_ADC_COUNT * MILLIVOLTS_PER_VOLT
}
