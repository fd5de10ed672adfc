//! # Poll Pass Runner
//!
//! Walks a [`PollPlan`]: one connection per gateway port, meters on a port
//! strictly one after another. Ports are visited in ascending order, or
//! polled by one tokio task each when `concurrent_ports` is set; either way
//! the reports come back sorted by port.

use crate::error::MercuryError;
use crate::mercury::frame::SerialNumber;
use crate::mercury::transport::{Connector, Transport};
use crate::poll::config::PollConfig;
use crate::poll::driver::{poll_device_until, PollOutcome};
use crate::poll::plan::PollPlan;
use log::{debug, info, warn};
use tokio::time::Instant;

/// Outcome for one meter.
#[derive(Debug)]
pub struct DeviceReport {
    pub serial: SerialNumber,
    pub outcome: PollOutcome,
}

/// Outcome for one gateway port: per-meter reports, or the reason the port
/// could not be opened.
#[derive(Debug)]
pub struct PortReport {
    pub port: u16,
    pub result: Result<Vec<DeviceReport>, MercuryError>,
}

/// Connects to `port`, polls each meter in order and closes the connection.
pub async fn poll_port<C>(
    connector: &C,
    port: u16,
    serials: &[SerialNumber],
    config: &PollConfig,
) -> PortReport
where
    C: Connector + ?Sized,
{
    let mut transport = match connector
        .connect(&config.host, port, config.connect_timeout)
        .await
    {
        Ok(transport) => transport,
        Err(e) => {
            warn!("port {port}: {e}; skipping {} meter(s)", serials.len());
            return PortReport {
                port,
                result: Err(e),
            };
        }
    };

    let mut devices = Vec::with_capacity(serials.len());
    for serial in serials {
        let deadline = Instant::now() + config.device_timeout;
        let outcome =
            poll_device_until(&mut transport, serial, &config.exchange, Some(deadline)).await;
        devices.push(DeviceReport {
            serial: serial.clone(),
            outcome,
        });
    }

    if let Err(e) = transport.close().await {
        debug!("port {port}: close failed: {e}");
    }

    PortReport {
        port,
        result: Ok(devices),
    }
}

/// Polls every meter in the plan once.
pub async fn poll_pass<C>(connector: &C, plan: &PollPlan, config: &PollConfig) -> Vec<PortReport>
where
    C: Connector + Clone + 'static,
{
    info!(
        "polling {} meter(s) on {} port(s) at {}",
        plan.device_count(),
        plan.len(),
        config.host
    );

    if config.concurrent_ports {
        poll_pass_concurrent(connector, plan, config).await
    } else {
        let mut reports = Vec::with_capacity(plan.len());
        for (port, serials) in plan.iter() {
            reports.push(poll_port(connector, port, serials, config).await);
        }
        reports
    }
}

async fn poll_pass_concurrent<C>(
    connector: &C,
    plan: &PollPlan,
    config: &PollConfig,
) -> Vec<PortReport>
where
    C: Connector + Clone + 'static,
{
    let workers: Vec<_> = plan
        .iter()
        .map(|(port, serials)| {
            let connector = connector.clone();
            let serials = serials.to_vec();
            let config = config.clone();
            let handle = tokio::spawn(async move {
                poll_port(&connector, port, &serials, &config).await
            });
            (port, handle)
        })
        .collect();

    // Plan iteration is ordered, so joining in spawn order keeps ports sorted
    let mut reports = Vec::with_capacity(workers.len());
    for (port, handle) in workers {
        let report = handle.await.unwrap_or_else(|e| PortReport {
            port,
            result: Err(MercuryError::Other(format!("port worker failed: {e}"))),
        });
        reports.push(report);
    }
    reports
}
