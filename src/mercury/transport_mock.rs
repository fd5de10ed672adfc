//! Mock gateway transport for testing
//!
//! This module provides an in-memory [`Transport`] and [`Connector`] that
//! simulate a gateway port without any network, plus [`MockMeter`], a
//! simulated Mercury 200 that answers requests on the mock bus.
//!
//! Replies only become readable after a request is sent, so stale-input
//! draining and retries behave the way they do against a real gateway.

use crate::error::MercuryError;
use crate::mercury::frame::{encode_response, Command, SerialNumber};
use crate::mercury::checksum::verify_checksum;
use crate::mercury::transport::{Connector, Transport};
use crate::constants::{MERCURY_ADDRESS_LEN, MERCURY_REQUEST_LEN};
use crate::payload::data_encoding::int_to_bcd;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// What the mock does in answer to one sent frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Bytes made readable one chunk per `receive` call
    Chunks(Vec<Vec<u8>>),
    /// Nothing arrives
    Silence,
    /// The peer hangs up
    Close,
    /// The send itself fails
    SendError,
}

impl MockReply {
    /// A reply delivered in a single read.
    pub fn frame(bytes: Vec<u8>) -> Self {
        MockReply::Chunks(vec![bytes])
    }
}

/// Misbehaviour a simulated meter can show for a given command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterFault {
    /// Never answers
    Silent,
    /// Answers with a corrupted CRC
    BadChecksum,
    /// Answers with a valid CRC but a 3-byte payload
    ShortPayload,
    /// Answers with a valid CRC but a non-decimal BCD nibble
    BadBcd,
    /// Drops the connection
    Hangup,
}

/// A simulated Mercury 200 on the mock bus.
///
/// Register values are raw integers as the meter stores them:
/// decivolts, centiamperes, watts and hundredths of kWh.
#[derive(Debug, Clone)]
pub struct MockMeter {
    serial: SerialNumber,
    voltage: u64,
    current: u64,
    power: u64,
    tariff1: u64,
    tariff2: u64,
    faults: HashMap<u8, MeterFault>,
    chunk_size: Option<usize>,
}

fn bcd(value: u64, width: usize) -> Vec<u8> {
    let max = 10u64.saturating_pow(2 * width as u32).saturating_sub(1);
    int_to_bcd(value.min(max), width).unwrap_or_default()
}

impl MockMeter {
    pub fn new(serial: SerialNumber) -> Self {
        MockMeter {
            serial,
            voltage: 2300,
            current: 100,
            power: 500,
            tariff1: 12345,
            tariff2: 67890,
            faults: HashMap::new(),
            chunk_size: None,
        }
    }

    pub fn with_instant(mut self, voltage: u64, current: u64, power: u64) -> Self {
        self.voltage = voltage;
        self.current = current;
        self.power = power;
        self
    }

    pub fn with_energy(mut self, tariff1: u64, tariff2: u64) -> Self {
        self.tariff1 = tariff1;
        self.tariff2 = tariff2;
        self
    }

    pub fn with_fault(mut self, command: Command, fault: MeterFault) -> Self {
        self.faults.insert(command.code(), fault);
        self
    }

    /// Deliver answers in pieces of `size` bytes.
    pub fn chunked(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn serial(&self) -> &SerialNumber {
        &self.serial
    }

    /// Answer to a request carrying `command_code`.
    pub fn answer(&self, command_code: u8) -> MockReply {
        let mut payload = match Command::try_from(command_code) {
            Ok(Command::ReadInstant) => {
                let mut p = bcd(self.voltage, 2);
                p.extend(bcd(self.current, 2));
                p.extend(bcd(self.power, 3));
                p
            }
            Ok(Command::ReadEnergy) => {
                let mut p = bcd(self.tariff1, 4);
                p.extend(bcd(self.tariff2, 4));
                p
            }
            Err(_) => return MockReply::Silence,
        };

        let address = self.serial.address();
        let frame = match self.faults.get(&command_code) {
            Some(MeterFault::Silent) => return MockReply::Silence,
            Some(MeterFault::Hangup) => return MockReply::Close,
            Some(MeterFault::BadChecksum) => {
                let mut frame = encode_response(address, command_code, &payload);
                if let Some(last) = frame.last_mut() {
                    *last ^= 0xFF;
                }
                frame
            }
            Some(MeterFault::ShortPayload) => {
                payload.truncate(3);
                encode_response(address, command_code, &payload)
            }
            Some(MeterFault::BadBcd) => {
                payload[0] = 0xAF;
                encode_response(address, command_code, &payload)
            }
            None => encode_response(address, command_code, &payload),
        };

        match self.chunk_size {
            Some(size) => MockReply::Chunks(frame.chunks(size).map(<[u8]>::to_vec).collect()),
            None => MockReply::frame(frame),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockReply>,
    meters: Vec<MockMeter>,
    pending: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    peer_closed: bool,
    closed: bool,
    close_calls: usize,
    receive_calls: usize,
}

/// In-memory transport. Clones share state, so a test can keep a handle
/// while the poller owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose bus carries the given simulated meters.
    pub fn with_meters(meters: Vec<MockMeter>) -> Self {
        let transport = Self::new();
        transport.lock().meters = meters;
        transport
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a scripted reply. Scripted replies take precedence over the
    /// simulated meters and are consumed one per sent frame.
    pub fn push_reply(&self, reply: MockReply) {
        self.lock().script.push_back(reply);
    }

    pub fn add_meter(&self, meter: MockMeter) {
        self.lock().meters.push(meter);
    }

    /// Make bytes readable right now, as if left over from an earlier answer.
    pub fn inject_stale(&self, bytes: &[u8]) {
        self.lock().pending.push_back(bytes.to_vec());
    }

    /// Frames written so far, in order.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    pub fn close_count(&self) -> usize {
        self.lock().close_calls
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn receive_count(&self) -> usize {
        self.lock().receive_calls
    }

    fn reply_for(state: &MockState, request: &[u8]) -> MockReply {
        if request.len() != MERCURY_REQUEST_LEN || verify_checksum(request).is_err() {
            return MockReply::Silence;
        }
        let address = &request[..MERCURY_ADDRESS_LEN];
        state
            .meters
            .iter()
            .find(|m| m.serial().address().as_bytes() == address)
            .map(|m| m.answer(request[MERCURY_ADDRESS_LEN]))
            .unwrap_or(MockReply::Silence)
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), MercuryError> {
        let mut state = self.lock();
        if state.closed || state.peer_closed {
            return Err(MercuryError::ConnectionClosed);
        }

        let reply = match state.script.pop_front() {
            Some(reply) => reply,
            None => Self::reply_for(&state, data),
        };

        match reply {
            MockReply::SendError => {
                return Err(MercuryError::TransportError("simulated send failure".into()))
            }
            MockReply::Chunks(chunks) => state.pending.extend(chunks),
            MockReply::Silence => {}
            MockReply::Close => state.peer_closed = true,
        }

        state.sent.push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self, max_bytes: usize, _wait: Duration) -> Result<Vec<u8>, MercuryError> {
        let mut state = self.lock();
        state.receive_calls += 1;
        if state.closed {
            return Err(MercuryError::ConnectionClosed);
        }

        match state.pending.pop_front() {
            Some(mut chunk) => {
                if chunk.len() > max_bytes {
                    let rest = chunk.split_off(max_bytes);
                    state.pending.push_front(rest);
                }
                Ok(chunk)
            }
            None if state.peer_closed => Err(MercuryError::ConnectionClosed),
            // Silence: the wait elapsed with nothing on the line
            None => Ok(Vec::new()),
        }
    }

    async fn close(&mut self) -> Result<(), MercuryError> {
        let mut state = self.lock();
        state.closed = true;
        state.close_calls += 1;
        Ok(())
    }
}

/// Connector handing out [`MockTransport`]s per port; unknown ports refuse.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    ports: Arc<Mutex<HashMap<u16, MockTransport>>>,
    attempts: Arc<Mutex<Vec<u16>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_port(&self, port: u16, transport: MockTransport) {
        self.ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(port, transport);
    }

    /// Ports a connection was attempted to, in order.
    pub fn connect_attempts(&self) -> Vec<u16> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(
        &self,
        host: &str,
        port: u16,
        _connect_timeout: Duration,
    ) -> Result<MockTransport, MercuryError> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(port);
        self.ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&port)
            .cloned()
            .ok_or_else(|| MercuryError::ConnectionError(format!("{host}:{port}: connection refused")))
    }
}
