//! # Pass Report
//!
//! Turns port reports into output rows: a fixed-width table matching the
//! layout existing tooling already parses, or JSON.
//!
//! ```text
//! Port |Serial  |   U,В|   I,А|   P,Вт|  T1,кВт·ч|  T2,кВт·ч
//! --------------------------------------------------------------
//! 20003|548973  | 230.0|  1.00|    500|    123.45|    678.90
//! 20003|548974  | нет ответа 63h/CRC
//! --------------------------------------------------------------
//! ```

use crate::error::MercuryError;
use crate::mercury::frame::Command;
use crate::poll::driver::PollOutcome;
use crate::poll::runner::PortReport;
use serde::Serialize;
use std::fmt::Write as _;

const RULE_WIDTH: usize = 62;
const PLACEHOLDER: &str = "-";

/// How a row ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Complete,
    Partial,
    NoResponse,
    Malformed,
    ConnectionError,
}

/// One output line: a meter, or a port that could not be opened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub port: u16,
    pub serial: Option<String>,
    pub status: RowStatus,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub power: Option<u64>,
    pub tariff1: Option<f64>,
    pub tariff2: Option<f64>,
    /// Command whose answer failed to decode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportRow {
    fn empty(port: u16, serial: Option<String>, status: RowStatus) -> Self {
        ReportRow {
            port,
            serial,
            status,
            voltage: None,
            current: None,
            power: None,
            tariff1: None,
            tariff2: None,
            command: None,
            error: None,
        }
    }

    /// Fixed-width table line for this row.
    pub fn to_table_line(&self) -> String {
        let serial = self.serial.as_deref().unwrap_or_default();
        match self.status {
            RowStatus::ConnectionError => format!(
                "{:<5}| соединение ERR: {}",
                self.port,
                self.error.as_deref().unwrap_or_default()
            ),
            RowStatus::NoResponse => format!(
                "{:<5}|{:<8}| нет ответа {}/CRC",
                self.port,
                serial,
                Command::ReadInstant
            ),
            // Instant values survived, only the energy answer was bad
            RowStatus::Malformed if self.voltage.is_some() => format!(
                "{}| ошибка данных {}: {}",
                self.value_line(serial),
                self.command.as_deref().unwrap_or_default(),
                self.error.as_deref().unwrap_or_default()
            ),
            RowStatus::Malformed => format!(
                "{:<5}|{:<8}| ошибка данных {}: {}",
                self.port,
                serial,
                self.command.as_deref().unwrap_or_default(),
                self.error.as_deref().unwrap_or_default()
            ),
            RowStatus::Complete | RowStatus::Partial => self.value_line(serial),
        }
    }

    fn value_line(&self, serial: &str) -> String {
        let fixed = |value: Option<f64>, precision: usize| {
            value.map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{v:.precision$}"))
        };
        table_row(
            &self.port.to_string(),
            serial,
            &fixed(self.voltage, 1),
            &fixed(self.current, 2),
            &self.power.map_or_else(|| PLACEHOLDER.to_string(), |p| p.to_string()),
            &fixed(self.tariff1, 2),
            &fixed(self.tariff2, 2),
        )
    }
}

fn table_row(port: &str, serial: &str, u: &str, i: &str, p: &str, t1: &str, t2: &str) -> String {
    format!("{port:<5}|{serial:<8}|{u:>6}|{i:>6}|{p:>7}|{t1:>10}|{t2:>10}")
}

/// Flattens port reports into rows, in report order.
pub fn rows(reports: &[PortReport]) -> Vec<ReportRow> {
    let mut rows = Vec::new();

    for report in reports {
        let devices = match &report.result {
            Ok(devices) => devices,
            Err(e) => {
                let mut row = ReportRow::empty(report.port, None, RowStatus::ConnectionError);
                row.error = Some(e.to_string());
                rows.push(row);
                continue;
            }
        };

        for device in devices {
            let serial = Some(device.serial.to_string());
            let row = match &device.outcome {
                PollOutcome::Complete(reading) => ReportRow {
                    voltage: Some(reading.instant.voltage),
                    current: Some(reading.instant.current),
                    power: Some(reading.instant.power),
                    tariff1: Some(reading.energy.tariff1),
                    tariff2: Some(reading.energy.tariff2),
                    ..ReportRow::empty(report.port, serial, RowStatus::Complete)
                },
                PollOutcome::Partial(instant) => ReportRow {
                    voltage: Some(instant.voltage),
                    current: Some(instant.current),
                    power: Some(instant.power),
                    ..ReportRow::empty(report.port, serial, RowStatus::Partial)
                },
                PollOutcome::Absent => ReportRow::empty(report.port, serial, RowStatus::NoResponse),
                PollOutcome::MalformedPayload {
                    command,
                    error,
                    instant,
                } => ReportRow {
                    voltage: instant.map(|v| v.voltage),
                    current: instant.map(|v| v.current),
                    power: instant.map(|v| v.power),
                    command: Some(command.to_string()),
                    error: Some(error.to_string()),
                    ..ReportRow::empty(report.port, serial, RowStatus::Malformed)
                },
            };
            rows.push(row);
        }
    }

    rows
}

/// Table header line.
pub fn table_header() -> String {
    table_row("Port", "Serial", "U,В", "I,А", "P,Вт", "T1,кВт·ч", "T2,кВт·ч")
}

pub fn table_rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// Whole report as a table: header, rule, one line per row, closing rule.
pub fn render_table(reports: &[PortReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", table_header());
    let _ = writeln!(out, "{}", table_rule());
    for row in rows(reports) {
        let _ = writeln!(out, "{}", row.to_table_line());
    }
    let _ = writeln!(out, "{}", table_rule());
    out
}

/// Whole report as a pretty-printed JSON array of rows.
pub fn render_json(reports: &[PortReport]) -> Result<String, MercuryError> {
    serde_json::to_string_pretty(&rows(reports)).map_err(|e| MercuryError::Other(e.to_string()))
}

/// Outcome counts for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub ports: usize,
    pub ports_failed: usize,
    pub complete: usize,
    pub partial: usize,
    pub absent: usize,
    pub malformed: usize,
}

impl PassSummary {
    pub fn from_reports(reports: &[PortReport]) -> Self {
        let mut summary = PassSummary {
            ports: reports.len(),
            ..PassSummary::default()
        };
        for report in reports {
            let Ok(devices) = &report.result else {
                summary.ports_failed += 1;
                continue;
            };
            for device in devices {
                match device.outcome {
                    PollOutcome::Complete(_) => summary.complete += 1,
                    PollOutcome::Partial(_) => summary.partial += 1,
                    PollOutcome::Absent => summary.absent += 1,
                    PollOutcome::MalformedPayload { .. } => summary.malformed += 1,
                }
            }
        }
        summary
    }

    pub fn devices(&self) -> usize {
        self.complete + self.partial + self.absent + self.malformed
    }
}
