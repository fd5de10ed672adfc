//! CRC-16 used by the Mercury protocol (the Modbus RTU variant: reflected
//! polynomial 0xA001, initial value 0xFFFF, transmitted low byte first).

use crate::constants::{CRC16_INITIAL, CRC16_POLYNOMIAL, MERCURY_CHECKSUM_LEN};
use crate::error::MercuryError;

/// Bit-serial CRC-16 over `data`.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_INITIAL;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC16_POLYNOMIAL
            } else {
                crc >> 1
            };
        }
    }
    crc
}

/// CRC of `data` in wire order (little-endian).
pub fn checksum(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}

/// Checks that the last two bytes of `frame` are the CRC of everything
/// before them.
pub fn verify_checksum(frame: &[u8]) -> Result<(), MercuryError> {
    if frame.len() < MERCURY_CHECKSUM_LEN {
        return Err(MercuryError::Other(format!(
            "frame of {} bytes has no checksum",
            frame.len()
        )));
    }

    let (body, trailer) = frame.split_at(frame.len() - MERCURY_CHECKSUM_LEN);
    let expected = u16::from_le_bytes([trailer[0], trailer[1]]);
    let calculated = crc16(body);

    if expected != calculated {
        return Err(MercuryError::InvalidChecksum {
            expected,
            calculated,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(crc16(&[]), 0xFFFF);
        assert_eq!(checksum(&[]), [0xFF, 0xFF]);
    }

    #[test]
    fn test_known_modbus_vector() {
        // Modbus "read holding registers" request 01 03 00 00 00 0A -> C5 CD
        assert_eq!(checksum(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A]), [0xC5, 0xCD]);
        // Standard check value for CRC-16/MODBUS
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_verify_checksum() {
        let mut frame = vec![0x00, 0x08, 0x60, 0x6D, 0x63];
        frame.extend_from_slice(&checksum(&frame.clone()));
        assert!(verify_checksum(&frame).is_ok());

        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert!(matches!(
            verify_checksum(&frame),
            Err(MercuryError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn test_verify_too_short() {
        assert!(verify_checksum(&[0x01]).is_err());
    }
}
