//! # Mercury Error Handling
//!
//! This module defines the MercuryError enum, which represents the different error
//! types that can occur while talking to Mercury meters and decoding their answers.

use thiserror::Error;

/// Represents the different error types that can occur in the mercury-poll crate.
#[derive(Debug, Error)]
pub enum MercuryError {
    /// The gateway port could not be reached, refused the connection or timed out.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A send or receive on an open connection failed.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The peer closed the connection (zero-length read).
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// No complete response arrived within the attempt's time budget.
    #[error("No response: {received} bytes received before timeout")]
    ResponseTimeout { received: usize },

    /// The trailing checksum of a response does not match its contents.
    #[error("Invalid checksum: expected 0x{expected:04X}, calculated 0x{calculated:04X}")]
    InvalidChecksum { expected: u16, calculated: u16 },

    /// A checksum-valid response is shorter than its decoder requires.
    #[error("Malformed payload for command 0x{command:02X}: expected at least {expected} bytes, got {actual}")]
    MalformedPayload {
        command: u8,
        expected: usize,
        actual: usize,
    },

    /// A BCD field contains a nibble above 9.
    #[error("Invalid BCD byte 0x{byte:02X} at offset {position}")]
    InvalidBcd { byte: u8, position: usize },

    /// A BCD field has more digits than fit in a u64.
    #[error("BCD field too long: {0} bytes")]
    BcdTooLong(usize),

    /// A meter serial number is not exactly six decimal digits.
    #[error("Invalid serial number: {0:?}")]
    InvalidSerial(String),

    /// Unknown command code.
    #[error("Unknown command: 0x{0:02X}")]
    UnknownCommand(u8),

    /// The poll plan file could not be read.
    #[error("Plan file error: {0}")]
    PlanFileError(String),

    /// Indicates an invalid hexadecimal string was provided.
    #[error("Invalid hexadecimal string")]
    InvalidHexString,

    /// A catch‑all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}

impl MercuryError {
    /// True for errors that mean the response bytes themselves are bad
    /// (protocol or version mismatch) rather than the line being noisy.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            MercuryError::MalformedPayload { .. }
                | MercuryError::InvalidBcd { .. }
                | MercuryError::BcdTooLong(_)
        )
    }
}

impl From<crate::util::hex::HexError> for MercuryError {
    fn from(_: crate::util::hex::HexError) -> Self {
        MercuryError::InvalidHexString
    }
}
