//! Mercury 200 Protocol Constants
//!
//! Frame layout and timing defaults for the Mercury 200 single-phase meter
//! protocol as spoken through an RS-485/Ethernet gateway.

use std::time::Duration;

/// Command: read instantaneous voltage, current and power
pub const MERCURY_CMD_READ_INSTANT: u8 = 0x63;

/// Command: read tariff 1 and tariff 2 energy totals
pub const MERCURY_CMD_READ_ENERGY: u8 = 0x27;

/// Device address length (big-endian serial number)
pub const MERCURY_ADDRESS_LEN: usize = 4;

/// Echo header: address + command
pub const MERCURY_HEADER_LEN: usize = MERCURY_ADDRESS_LEN + 1;

/// Trailing CRC length
pub const MERCURY_CHECKSUM_LEN: usize = 2;

/// Request frame: address + command + CRC
pub const MERCURY_REQUEST_LEN: usize = MERCURY_HEADER_LEN + MERCURY_CHECKSUM_LEN;

/// Anything shorter is treated as no response
pub const MERCURY_MIN_RESPONSE_LEN: usize = 6;

/// Payload of the 0x63 answer: U (2) + I (2) + P (3)
pub const MERCURY_INSTANT_PAYLOAD_LEN: usize = 7;

/// Payload of the 0x27 answer: T1 (4) + T2 (4)
pub const MERCURY_ENERGY_PAYLOAD_LEN: usize = 8;

/// Serial numbers are six decimal digits
pub const MERCURY_SERIAL_DIGITS: usize = 6;

/// Largest read requested from the transport at once
pub const RECEIVE_CHUNK_LEN: usize = 256;

// ----------------------------------------------------------------------------
// CRC-16 (Modbus RTU flavour)
// ----------------------------------------------------------------------------

pub const CRC16_POLYNOMIAL: u16 = 0xA001;
pub const CRC16_INITIAL: u16 = 0xFFFF;

// ----------------------------------------------------------------------------
// Timing defaults
// ----------------------------------------------------------------------------

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(800);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);
pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_ATTEMPTS: u32 = 1;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PLAN_FILE: &str = "serials.txt";
