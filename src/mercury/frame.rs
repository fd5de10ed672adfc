//! # Mercury Frames
//!
//! Request and response framing for the Mercury 200 protocol.
//!
//! A request is `address[4] | command[1] | crc[2]`, where the address is the
//! meter's six-digit serial number as a big-endian u32. The meter answers with
//! the same five header bytes, a command-specific payload and a CRC over
//! everything before it.
//!
//! ```rust
//! use mercury_poll::mercury::frame::{Command, RequestFrame, SerialNumber};
//!
//! let serial: SerialNumber = "548973".parse().unwrap();
//! let request = RequestFrame::build(serial.address(), Command::ReadInstant);
//! assert_eq!(request.as_bytes(), &[0x00, 0x08, 0x60, 0x6D, 0x63, 0x4A, 0xC7]);
//! ```

use crate::constants::{
    MERCURY_ADDRESS_LEN, MERCURY_CHECKSUM_LEN, MERCURY_CMD_READ_ENERGY, MERCURY_CMD_READ_INSTANT,
    MERCURY_ENERGY_PAYLOAD_LEN, MERCURY_HEADER_LEN, MERCURY_INSTANT_PAYLOAD_LEN,
    MERCURY_REQUEST_LEN, MERCURY_SERIAL_DIGITS,
};
use crate::error::MercuryError;
use crate::mercury::checksum::{checksum, verify_checksum};
use nom::{
    bytes::complete::take,
    combinator::rest,
    number::complete::be_u8,
    sequence::tuple,
    IResult,
};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A meter serial number: exactly six ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SerialNumber(String);

impl SerialNumber {
    pub fn new(serial: &str) -> Result<Self, MercuryError> {
        if serial.len() == MERCURY_SERIAL_DIGITS && serial.bytes().all(|b| b.is_ascii_digit()) {
            Ok(SerialNumber(serial.to_string()))
        } else {
            Err(MercuryError::InvalidSerial(serial.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bus address derived from the serial number.
    pub fn address(&self) -> DeviceAddress {
        let value = self
            .0
            .bytes()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
        DeviceAddress(value.to_be_bytes())
    }
}

impl FromStr for SerialNumber {
    type Err = MercuryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SerialNumber::new(s)
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width/alignment specifiers work in report rows
        f.pad(&self.0)
    }
}

/// 4-byte big-endian bus address of a meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress([u8; MERCURY_ADDRESS_LEN]);

impl DeviceAddress {
    pub fn from_bytes(bytes: [u8; MERCURY_ADDRESS_LEN]) -> Self {
        DeviceAddress(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MERCURY_ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", u32::from_be_bytes(self.0))
    }
}

/// The read commands this poller issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// 0x63: voltage, current, power
    ReadInstant,
    /// 0x27: tariff 1 and tariff 2 energy
    ReadEnergy,
}

impl Command {
    pub fn code(self) -> u8 {
        match self {
            Command::ReadInstant => MERCURY_CMD_READ_INSTANT,
            Command::ReadEnergy => MERCURY_CMD_READ_ENERGY,
        }
    }

    /// Payload length of a complete answer.
    pub fn payload_len(self) -> usize {
        match self {
            Command::ReadInstant => MERCURY_INSTANT_PAYLOAD_LEN,
            Command::ReadEnergy => MERCURY_ENERGY_PAYLOAD_LEN,
        }
    }

    /// Length of a complete answer, header and CRC included.
    pub fn response_len(self) -> usize {
        MERCURY_HEADER_LEN + self.payload_len() + MERCURY_CHECKSUM_LEN
    }
}

impl TryFrom<u8> for Command {
    type Error = MercuryError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            MERCURY_CMD_READ_INSTANT => Ok(Command::ReadInstant),
            MERCURY_CMD_READ_ENERGY => Ok(Command::ReadEnergy),
            other => Err(MercuryError::UnknownCommand(other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}h", self.code())
    }
}

/// A checksummed request, ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    bytes: [u8; MERCURY_REQUEST_LEN],
}

impl RequestFrame {
    pub fn build(address: DeviceAddress, command: Command) -> Self {
        let mut bytes = [0u8; MERCURY_REQUEST_LEN];
        bytes[..MERCURY_ADDRESS_LEN].copy_from_slice(address.as_bytes());
        bytes[MERCURY_ADDRESS_LEN] = command.code();
        let crc = checksum(&bytes[..MERCURY_HEADER_LEN]);
        bytes[MERCURY_HEADER_LEN..].copy_from_slice(&crc);
        RequestFrame { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A parsed, checksum-verified response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame<'a> {
    pub address: DeviceAddress,
    pub command: u8,
    pub payload: &'a [u8],
    pub checksum: u16,
}

fn response_parts(input: &[u8]) -> IResult<&[u8], (&[u8], u8, &[u8])> {
    tuple((take(MERCURY_ADDRESS_LEN), be_u8, rest))(input)
}

impl<'a> ResponseFrame<'a> {
    /// Verifies the trailing CRC, then splits out echo header and payload.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, MercuryError> {
        verify_checksum(bytes)?;

        let (body, trailer) = bytes.split_at(bytes.len() - MERCURY_CHECKSUM_LEN);
        let (_, (address, command, payload)) =
            response_parts(body).map_err(|_| MercuryError::MalformedPayload {
                command: body.get(MERCURY_ADDRESS_LEN).copied().unwrap_or_default(),
                expected: MERCURY_HEADER_LEN + MERCURY_CHECKSUM_LEN,
                actual: bytes.len(),
            })?;
        let checksum = u16::from_le_bytes([trailer[0], trailer[1]]);

        let mut addr = [0u8; MERCURY_ADDRESS_LEN];
        addr.copy_from_slice(address);

        Ok(ResponseFrame {
            address: DeviceAddress(addr),
            command,
            payload,
            checksum,
        })
    }

    /// True when the echo header names the meter and command we asked for.
    pub fn echoes(&self, address: DeviceAddress, command: Command) -> bool {
        self.address == address && self.command == command.code()
    }
}

/// Payload slice of a raw response: everything between the echo header
/// and the CRC. Empty when the response is too short to carry one.
pub fn response_payload(bytes: &[u8]) -> &[u8] {
    if bytes.len() < MERCURY_HEADER_LEN + MERCURY_CHECKSUM_LEN {
        return &[];
    }
    &bytes[MERCURY_HEADER_LEN..bytes.len() - MERCURY_CHECKSUM_LEN]
}

/// Builds a meter-side answer: echo header, payload, CRC.
pub fn encode_response(address: DeviceAddress, command: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MERCURY_HEADER_LEN + payload.len() + MERCURY_CHECKSUM_LEN);
    frame.extend_from_slice(address.as_bytes());
    frame.push(command);
    frame.extend_from_slice(payload);
    let crc = checksum(&frame);
    frame.extend_from_slice(&crc);
    frame
}
