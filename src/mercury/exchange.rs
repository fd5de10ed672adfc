//! # Frame Exchange
//!
//! One request/response round trip with a meter over an open transport.
//!
//! Each attempt drains stale input, sends a freshly built request and then
//! collects bytes until the command's full response length is in hand. The
//! wait is bounded twice: a per-attempt deadline (`response_timeout`) and a
//! per-read silence gap (`read_timeout`). If the line goes quiet early, a
//! shorter buffer is still accepted when it carries its own valid CRC, which
//! is how a meter's error reply looks. A full-length answer with a bad CRC
//! counts as a failed attempt.
//!
//! Failed attempts are retried up to `attempts` times; the deadline restarts
//! with every attempt. Exhausting all attempts yields `None`.

use crate::constants::{
    DEFAULT_ATTEMPTS, DEFAULT_READ_TIMEOUT, DEFAULT_RESPONSE_TIMEOUT, MERCURY_MIN_RESPONSE_LEN,
    RECEIVE_CHUNK_LEN,
};
use crate::error::MercuryError;
use crate::mercury::checksum::verify_checksum;
use crate::mercury::frame::{Command, DeviceAddress, RequestFrame};
use crate::mercury::transport::Transport;
use crate::util::hex::format_hex_compact;
use bytes::BytesMut;
use log::{debug, warn};
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound on zero-wait reads spent discarding leftovers.
const MAX_DRAIN_READS: usize = 16;

/// Timing and retry settings for frame exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Attempts per exchange, at least 1
    pub attempts: u32,
    /// Budget for one attempt, from send to last byte
    pub response_timeout: Duration,
    /// Longest silence tolerated between reads
    pub read_timeout: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            attempts: DEFAULT_ATTEMPTS,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Sends `command` to the meter at `address` and returns the raw response.
///
/// Never fails loudly: transport errors, timeouts and CRC mismatches are
/// logged and retried, and `None` means every attempt came back empty-handed.
pub async fn exchange<T>(
    transport: &mut T,
    address: DeviceAddress,
    command: Command,
    config: &ExchangeConfig,
) -> Option<Vec<u8>>
where
    T: Transport + ?Sized,
{
    let attempts = config.attempts.max(1);

    for n in 1..=attempts {
        let request = RequestFrame::build(address, command);
        match attempt(transport, &request, command, config).await {
            Ok(response) => {
                debug!(
                    "{address} {command}: <- {} (attempt {n}/{attempts})",
                    format_hex_compact(&response)
                );
                return Some(response);
            }
            Err(MercuryError::ConnectionClosed) => {
                warn!("{address} {command}: connection closed, giving up");
                return None;
            }
            Err(e) => warn!("{address} {command}: attempt {n}/{attempts} failed: {e}"),
        }
    }

    None
}

async fn attempt<T>(
    transport: &mut T,
    request: &RequestFrame,
    command: Command,
    config: &ExchangeConfig,
) -> Result<Vec<u8>, MercuryError>
where
    T: Transport + ?Sized,
{
    drain_stale(transport).await?;

    debug!("-> {}", format_hex_compact(request.as_bytes()));
    transport.send(request.as_bytes()).await?;

    let expected = command.response_len();
    let deadline = Instant::now() + config.response_timeout;
    let mut buf = BytesMut::with_capacity(expected);

    while buf.len() < expected {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let chunk = transport
            .receive(RECEIVE_CHUNK_LEN, remaining.min(config.read_timeout))
            .await?;
        if chunk.is_empty() {
            break;
        }
        buf.extend_from_slice(&chunk);
    }

    if buf.len() > expected {
        let extra = buf.split_off(expected);
        debug!("discarding {} trailing bytes: {}", extra.len(), format_hex_compact(&extra));
    }

    let received = buf.len();
    if received < MERCURY_MIN_RESPONSE_LEN {
        return Err(MercuryError::ResponseTimeout { received });
    }

    match verify_checksum(&buf) {
        Ok(()) => Ok(buf.to_vec()),
        // Cut short and not a frame of its own
        Err(_) if received < expected => Err(MercuryError::ResponseTimeout { received }),
        Err(e) => Err(e),
    }
}

/// Throws away anything already waiting on the line, e.g. the tail of an
/// answer to an attempt that timed out.
async fn drain_stale<T>(transport: &mut T) -> Result<(), MercuryError>
where
    T: Transport + ?Sized,
{
    for _ in 0..MAX_DRAIN_READS {
        let stale = transport.receive(RECEIVE_CHUNK_LEN, Duration::ZERO).await?;
        if stale.is_empty() {
            return Ok(());
        }
        debug!("discarding {} stale bytes: {}", stale.len(), format_hex_compact(&stale));
    }
    Ok(())
}
