//! The poll module drives a pass over the configured meters: plan loading,
//! per-meter polling, per-port connection handling and the final report.

pub mod config;
pub mod driver;
pub mod plan;
pub mod report;
pub mod runner;

pub use config::PollConfig;
pub use driver::{poll_device, poll_device_until, MeterReading, PollOutcome};
pub use plan::PollPlan;
pub use report::{render_json, render_table, rows, PassSummary, ReportRow, RowStatus};
pub use runner::{poll_pass, poll_port, DeviceReport, PortReport};
