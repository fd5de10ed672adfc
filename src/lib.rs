//! # mercury-poll - Poller for Mercury 200 Electricity Meters
//!
//! The mercury-poll crate reads Mercury 200 single-phase meters sitting on
//! RS-485 buses behind RS-485/Ethernet gateways. Each gateway bus is one TCP
//! port; each meter on it is addressed by its six-digit serial number.
//!
//! ## Features
//!
//! - CRC-16 framing of requests and validation of responses
//! - Response reassembly from a stream socket with bounded waits and retries
//! - BCD decoding of voltage, current, power and two tariff energy totals
//! - Explicit per-meter outcomes: complete, partial, absent or malformed
//! - Plan files mapping gateway ports to serial numbers
//! - Fixed-width table and JSON reports
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mercury_poll::{poll, render_table, PollConfig, PollPlan};
//!
//! # async fn run() -> Result<(), mercury_poll::MercuryError> {
//! let plan = PollPlan::parse("20003 548973 548974\n");
//! let config = PollConfig::default().with_host("192.168.1.50").with_attempts(2);
//! let reports = poll(&plan, &config).await;
//! print!("{}", render_table(&reports));
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod logging;
pub mod mercury;
pub mod payload;
pub mod poll;
pub mod util;

pub use crate::error::MercuryError;
pub use crate::logging::{init_logger, log_info};

// Protocol types
pub use mercury::{Command, DeviceAddress, ExchangeConfig, RequestFrame, ResponseFrame, SerialNumber};
pub use mercury::{Connector, TcpConnector, Transport};
pub use payload::{bcd_to_int, EnergyTotals, InstantValues};

// Polling
pub use poll::{
    poll_device, poll_pass, render_json, render_table, DeviceReport, MeterReading, PassSummary,
    PollConfig, PollOutcome, PollPlan, PortReport,
};

/// Polls every meter in `plan` once over TCP.
///
/// # Arguments
/// * `plan` - Gateway ports and the meters behind each
/// * `config` - Gateway host, timeouts and retry policy
///
/// # Returns
/// One report per port, sorted by port
pub async fn poll(plan: &PollPlan, config: &PollConfig) -> Vec<PortReport> {
    poll_pass(&TcpConnector, plan, config).await
}

