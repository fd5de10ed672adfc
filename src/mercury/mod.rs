//! The mercury module contains the wire-level pieces of the Mercury 200
//! protocol: CRC, framing, the gateway transport and the request/response
//! exchange with retries.

pub mod checksum;
pub mod exchange;
pub mod frame;
pub mod transport;
pub mod transport_mock;

pub use checksum::{checksum, crc16, verify_checksum};
pub use exchange::{exchange, ExchangeConfig};
pub use frame::{
    encode_response, response_payload, Command, DeviceAddress, RequestFrame, ResponseFrame,
    SerialNumber,
};
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};
