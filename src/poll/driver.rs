//! # Poll Driver
//!
//! Reads one meter: an instant-values exchange (0x63) followed by an energy
//! exchange (0x27) on the same connection.
//!
//! ```text
//!   0x63 ──none/bad CRC──▶ Absent
//!    │ ok
//!    ├──decode error────▶ MalformedPayload
//!   0x27 ──none/bad CRC──▶ Partial
//!    │ ok
//!    ├──decode error────▶ MalformedPayload
//!    ▼
//!  Complete
//! ```

use crate::error::MercuryError;
use crate::mercury::checksum::verify_checksum;
use crate::mercury::exchange::{exchange, ExchangeConfig};
use crate::mercury::frame::{response_payload, Command, DeviceAddress, ResponseFrame, SerialNumber};
use crate::mercury::transport::Transport;
use crate::payload::reading::{decode_energy, decode_instant, EnergyTotals, InstantValues};
use log::{debug, warn};
use serde::Serialize;
use tokio::time::{timeout_at, Instant};

/// Both halves of a successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterReading {
    pub instant: InstantValues,
    pub energy: EnergyTotals,
}

/// Result of polling one meter.
#[derive(Debug)]
pub enum PollOutcome {
    /// Instant values and energy totals
    Complete(MeterReading),
    /// Instant values only; the energy exchange got no valid answer
    Partial(InstantValues),
    /// No valid answer to the instant-values exchange
    Absent,
    /// A checksum-valid answer that could not be decoded
    MalformedPayload {
        command: Command,
        error: MercuryError,
        /// Instant values, when only the energy answer was bad
        instant: Option<InstantValues>,
    },
}

impl PollOutcome {
    pub fn instant(&self) -> Option<&InstantValues> {
        match self {
            PollOutcome::Complete(reading) => Some(&reading.instant),
            PollOutcome::Partial(instant) => Some(instant),
            PollOutcome::MalformedPayload { instant, .. } => instant.as_ref(),
            PollOutcome::Absent => None,
        }
    }

    pub fn energy(&self) -> Option<&EnergyTotals> {
        match self {
            PollOutcome::Complete(reading) => Some(&reading.energy),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PollOutcome::Complete(_))
    }
}

/// Polls the meter with `serial` over an already open transport.
///
/// Transport trouble and CRC failures turn into `Absent`/`Partial`; only
/// undecodable payloads come back as `MalformedPayload`.
pub async fn poll_device<T>(
    transport: &mut T,
    serial: &SerialNumber,
    config: &ExchangeConfig,
) -> PollOutcome
where
    T: Transport + ?Sized,
{
    poll_device_until(transport, serial, config, None).await
}

/// [`poll_device`] with a hard deadline over both exchanges.
///
/// The deadline counts as a failed exchange: hit during the instant-values
/// step it gives `Absent`, during the energy step `Partial` with the
/// instant values already read.
pub async fn poll_device_until<T>(
    transport: &mut T,
    serial: &SerialNumber,
    config: &ExchangeConfig,
    deadline: Option<Instant>,
) -> PollOutcome
where
    T: Transport + ?Sized,
{
    let address = serial.address();

    let Some(primary) =
        bounded_response(transport, address, Command::ReadInstant, config, deadline).await
    else {
        warn!("{serial}: no response to {}", Command::ReadInstant);
        return PollOutcome::Absent;
    };

    let instant = match decode_instant(response_payload(&primary)) {
        Ok(instant) => instant,
        Err(error) => {
            warn!("{serial}: cannot decode {}: {error}", Command::ReadInstant);
            return PollOutcome::MalformedPayload {
                command: Command::ReadInstant,
                error,
                instant: None,
            };
        }
    };

    let Some(secondary) =
        bounded_response(transport, address, Command::ReadEnergy, config, deadline).await
    else {
        warn!("{serial}: no response to {}, energy unavailable", Command::ReadEnergy);
        return PollOutcome::Partial(instant);
    };

    match decode_energy(response_payload(&secondary)) {
        Ok(energy) => {
            debug!("{serial}: {instant:?} {energy:?}");
            PollOutcome::Complete(MeterReading { instant, energy })
        }
        Err(error) => {
            warn!("{serial}: cannot decode {}: {error}", Command::ReadEnergy);
            PollOutcome::MalformedPayload {
                command: Command::ReadEnergy,
                error,
                instant: Some(instant),
            }
        }
    }
}

/// [`valid_response`] cut off at `deadline`, if any.
async fn bounded_response<T>(
    transport: &mut T,
    address: DeviceAddress,
    command: Command,
    config: &ExchangeConfig,
    deadline: Option<Instant>,
) -> Option<Vec<u8>>
where
    T: Transport + ?Sized,
{
    let Some(deadline) = deadline else {
        return valid_response(transport, address, command, config).await;
    };

    match timeout_at(deadline, valid_response(transport, address, command, config)).await {
        Ok(response) => response,
        Err(_) => {
            warn!("{address} {command}: device time budget used up");
            None
        }
    }
}

/// Runs one exchange and keeps the answer only if its CRC checks out.
async fn valid_response<T>(
    transport: &mut T,
    address: DeviceAddress,
    command: Command,
    config: &ExchangeConfig,
) -> Option<Vec<u8>>
where
    T: Transport + ?Sized,
{
    let response = exchange(transport, address, command, config).await?;

    if let Err(e) = verify_checksum(&response) {
        warn!("{address} {command}: {e}");
        return None;
    }

    // Only the CRC decides; a foreign echo is worth a note, nothing more
    if let Ok(frame) = ResponseFrame::parse(&response) {
        if !frame.echoes(address, command) {
            warn!(
                "{address} {command}: echo names {} {:02X}h",
                frame.address, frame.command
            );
        }
    }

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mercury::checksum::checksum;
    use crate::mercury::transport_mock::{MeterFault, MockMeter, MockReply, MockTransport};

    fn serial() -> SerialNumber {
        SerialNumber::new("548973").unwrap()
    }

    #[tokio::test]
    async fn test_complete_reading() {
        let mut mock = MockTransport::with_meters(vec![MockMeter::new(serial())]);
        let outcome = poll_device(&mut mock, &serial(), &ExchangeConfig::default()).await;

        match outcome {
            PollOutcome::Complete(reading) => {
                assert_eq!(reading.instant.voltage, 230.0);
                assert_eq!(reading.instant.current, 1.0);
                assert_eq!(reading.instant.power, 500);
                assert_eq!(reading.energy.tariff1, 123.45);
                assert_eq!(reading.energy.tariff2, 678.9);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let commands: Vec<u8> = mock.sent_frames().iter().map(|f| f[4]).collect();
        assert_eq!(commands, vec![0x63, 0x27]);
    }

    #[tokio::test]
    async fn test_partial_when_energy_silent() {
        let meter = MockMeter::new(serial()).with_fault(Command::ReadEnergy, MeterFault::Silent);
        let mut mock = MockTransport::with_meters(vec![meter]);
        let outcome = poll_device(&mut mock, &serial(), &ExchangeConfig::default()).await;

        assert!(matches!(outcome, PollOutcome::Partial(_)));
        assert_eq!(outcome.instant().map(|v| v.power), Some(500));
        assert!(outcome.energy().is_none());
    }

    #[tokio::test]
    async fn test_absent_skips_energy() {
        let meter = MockMeter::new(serial()).with_fault(Command::ReadInstant, MeterFault::BadChecksum);
        let mut mock = MockTransport::with_meters(vec![meter]);
        let config = ExchangeConfig {
            attempts: 3,
            ..ExchangeConfig::default()
        };
        let outcome = poll_device(&mut mock, &serial(), &config).await;

        assert!(matches!(outcome, PollOutcome::Absent));
        let sent = mock.sent_frames();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|f| f[4] == 0x63));
    }

    #[tokio::test]
    async fn test_short_payload_is_malformed() {
        let meter =
            MockMeter::new(serial()).with_fault(Command::ReadInstant, MeterFault::ShortPayload);
        let mut mock = MockTransport::with_meters(vec![meter]);
        let outcome = poll_device(&mut mock, &serial(), &ExchangeConfig::default()).await;

        match outcome {
            PollOutcome::MalformedPayload {
                command,
                error,
                instant,
            } => {
                assert_eq!(command, Command::ReadInstant);
                assert!(error.is_data_error());
                assert!(instant.is_none());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_bcd_in_energy_is_malformed() {
        let meter = MockMeter::new(serial()).with_fault(Command::ReadEnergy, MeterFault::BadBcd);
        let mut mock = MockTransport::with_meters(vec![meter]);
        let outcome = poll_device(&mut mock, &serial(), &ExchangeConfig::default()).await;

        assert!(matches!(
            outcome,
            PollOutcome::MalformedPayload {
                command: Command::ReadEnergy,
                error: MercuryError::InvalidBcd { .. },
                ..
            }
        ));
        assert_eq!(outcome.instant().map(|v| v.voltage), Some(230.0));
        assert!(outcome.energy().is_none());
    }

    #[tokio::test]
    async fn test_header_only_reply_is_malformed() {
        // address + command + CRC: valid frame, empty payload
        let mut reply = serial().address().as_bytes().to_vec();
        reply.push(0x63);
        reply.extend_from_slice(&checksum(&reply.clone()));

        let mut mock = MockTransport::new();
        mock.push_reply(MockReply::frame(reply));
        let outcome = poll_device(&mut mock, &serial(), &ExchangeConfig::default()).await;

        assert!(matches!(
            outcome,
            PollOutcome::MalformedPayload {
                error: MercuryError::MalformedPayload { actual: 0, .. },
                ..
            }
        ));
    }
}
