//! # Measurement Field Decoders
//!
//! Fixed-layout decoders for the payload of the two Mercury read commands.
//! A payload is everything between the 5-byte echo header and the trailing
//! CRC of a validated response.
//!
//! | Command | Layout (BCD)                          | Scaling          |
//! |---------|---------------------------------------|------------------|
//! | 0x63    | U[2] I[2] P[3]                        | /10, /100, x1    |
//! | 0x27    | T1[4] T2[4]                           | /100, /100       |

use crate::constants::{
    MERCURY_CMD_READ_ENERGY, MERCURY_CMD_READ_INSTANT, MERCURY_ENERGY_PAYLOAD_LEN,
    MERCURY_INSTANT_PAYLOAD_LEN,
};
use crate::error::MercuryError;
use crate::payload::data_encoding::bcd_to_int;
use nom::{bytes::complete::take, sequence::tuple, IResult};
use serde::Serialize;

/// Instantaneous values from command 0x63.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstantValues {
    /// Volts, one decimal place.
    pub voltage: f64,
    /// Amperes, two decimal places.
    pub current: f64,
    /// Active power, whole watts.
    pub power: u64,
}

/// Accumulated energy registers from command 0x27, in kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyTotals {
    pub tariff1: f64,
    pub tariff2: f64,
}

fn instant_fields(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8], &[u8])> {
    tuple((take(2usize), take(2usize), take(3usize)))(input)
}

fn energy_fields(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8])> {
    tuple((take(4usize), take(4usize)))(input)
}

/// Decodes the 0x63 payload into voltage, current and power.
///
/// Trailing bytes beyond the seven the layout needs are ignored.
pub fn decode_instant(payload: &[u8]) -> Result<InstantValues, MercuryError> {
    let (_, (u, i, p)) = instant_fields(payload).map_err(|_| MercuryError::MalformedPayload {
        command: MERCURY_CMD_READ_INSTANT,
        expected: MERCURY_INSTANT_PAYLOAD_LEN,
        actual: payload.len(),
    })?;

    Ok(InstantValues {
        voltage: bcd_to_int(u)? as f64 / 10.0,
        current: bcd_to_int(i)? as f64 / 100.0,
        power: bcd_to_int(p)?,
    })
}

/// Decodes the 0x27 payload into the two tariff energy totals.
pub fn decode_energy(payload: &[u8]) -> Result<EnergyTotals, MercuryError> {
    let (_, (t1, t2)) = energy_fields(payload).map_err(|_| MercuryError::MalformedPayload {
        command: MERCURY_CMD_READ_ENERGY,
        expected: MERCURY_ENERGY_PAYLOAD_LEN,
        actual: payload.len(),
    })?;

    Ok(EnergyTotals {
        tariff1: bcd_to_int(t1)? as f64 / 100.0,
        tariff2: bcd_to_int(t2)? as f64 / 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_instant() {
        let values = decode_instant(&[0x02, 0x30, 0x01, 0x00, 0x00, 0x05, 0x00]).unwrap();
        assert_eq!(values.voltage, 23.0);
        assert_eq!(values.current, 1.00);
        assert_eq!(values.power, 500);
    }

    #[test]
    fn test_decode_energy() {
        let totals =
            decode_energy(&[0x00, 0x01, 0x23, 0x45, 0x00, 0x06, 0x78, 0x90]).unwrap();
        assert_eq!(totals.tariff1, 123.45);
        assert_eq!(totals.tariff2, 678.90);
    }

    #[test]
    fn test_short_payload_is_malformed() {
        match decode_instant(&[0x02, 0x30, 0x01]) {
            Err(MercuryError::MalformedPayload {
                command,
                expected,
                actual,
            }) => {
                assert_eq!(command, 0x63);
                assert_eq!(expected, 7);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            decode_energy(&[0u8; 7]),
            Err(MercuryError::MalformedPayload { command: 0x27, .. })
        ));
    }

    #[test]
    fn test_bad_nibble_propagates() {
        let err = decode_energy(&[0x00, 0x01, 0x2A, 0x45, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, MercuryError::InvalidBcd { byte: 0x2A, position: 2 }));
    }

    #[test]
    fn test_extra_bytes_ignored() {
        let values =
            decode_instant(&[0x22, 0x15, 0x00, 0x42, 0x00, 0x00, 0x91, 0xEE]).unwrap();
        assert_eq!(values.voltage, 221.5);
        assert_eq!(values.current, 0.42);
        assert_eq!(values.power, 91);
    }
}
