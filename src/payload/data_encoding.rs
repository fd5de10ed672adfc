//! # BCD Encoding and Decoding
//!
//! Mercury meters pack every measured value as big-endian binary-coded decimal:
//! each byte carries two digits, high nibble first.

use crate::error::MercuryError;

/// Widest BCD field that always fits a u64 (18 digits).
pub const MAX_BCD_BYTES: usize = 9;

/// Decodes a big-endian BCD byte group into an integer.
///
/// `[0x12, 0x34]` decodes to `1234`, `[0x00, 0x00, 0x07]` to `7` and an
/// empty or all-zero group to `0`. A nibble above 9 is rejected instead of
/// being read as a hex digit.
pub fn bcd_to_int(bytes: &[u8]) -> Result<u64, MercuryError> {
    if bytes.len() > MAX_BCD_BYTES {
        return Err(MercuryError::BcdTooLong(bytes.len()));
    }

    let mut value = 0u64;
    for (position, &byte) in bytes.iter().enumerate() {
        let high = byte >> 4;
        let low = byte & 0x0F;
        if high > 9 || low > 9 {
            return Err(MercuryError::InvalidBcd { byte, position });
        }
        value = value * 100 + u64::from(high) * 10 + u64::from(low);
    }

    Ok(value)
}

/// Encodes an integer as a big-endian BCD group of exactly `width` bytes.
pub fn int_to_bcd(mut value: u64, width: usize) -> Result<Vec<u8>, MercuryError> {
    if width > MAX_BCD_BYTES + 1 {
        return Err(MercuryError::BcdTooLong(width));
    }

    let original = value;
    let mut result = vec![0u8; width];

    for slot in result.iter_mut().rev() {
        let ones = (value % 10) as u8;
        value /= 10;
        let tens = (value % 10) as u8;
        value /= 10;
        *slot = (tens << 4) | ones;
    }

    if value != 0 {
        return Err(MercuryError::Other(format!(
            "{original} does not fit in {width} BCD bytes"
        )));
    }

    Ok(result)
}
