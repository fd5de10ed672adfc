//! # Gateway Transport
//!
//! Byte-stream connection to one TCP port of an RS-485/Ethernet gateway.
//! The exchange layer only talks to the [`Transport`] trait so tests can
//! swap in the mock from [`crate::mercury::transport_mock`].

use crate::error::MercuryError;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// An open byte-stream connection.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Writes the whole buffer.
    async fn send(&mut self, data: &[u8]) -> Result<(), MercuryError>;

    /// Reads at most `max_bytes`, waiting up to `wait`.
    ///
    /// Returns an empty buffer when nothing arrived in time and
    /// [`MercuryError::ConnectionClosed`] when the peer has hung up.
    async fn receive(&mut self, max_bytes: usize, wait: Duration) -> Result<Vec<u8>, MercuryError>;

    /// Releases the connection. Further calls fail.
    async fn close(&mut self) -> Result<(), MercuryError>;
}

/// Opens transports to gateway ports.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport + 'static;

    async fn connect(
        &self,
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self::Transport, MercuryError>;
}

/// TCP connection to a gateway port.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    write_timeout: Duration,
}

impl TcpTransport {
    /// Connects with a bounded wait. The same bound is used for writes.
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, MercuryError> {
        let stream = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| {
                MercuryError::ConnectionError(format!(
                    "{host}:{port}: timed out after {} ms",
                    connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| MercuryError::ConnectionError(format!("{host}:{port}: {e}")))?;

        // Frames are tiny; don't let Nagle hold them back
        stream
            .set_nodelay(true)
            .map_err(|e| MercuryError::ConnectionError(e.to_string()))?;

        Ok(TcpTransport {
            stream: Some(stream),
            write_timeout: connect_timeout,
        })
    }

    fn stream(&mut self) -> Result<&mut TcpStream, MercuryError> {
        self.stream.as_mut().ok_or(MercuryError::ConnectionClosed)
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), MercuryError> {
        let write_timeout = self.write_timeout;
        let stream = self.stream()?;
        timeout(write_timeout, async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| MercuryError::TransportError("write timed out".into()))?
        .map_err(|e| MercuryError::TransportError(e.to_string()))
    }

    async fn receive(&mut self, max_bytes: usize, wait: Duration) -> Result<Vec<u8>, MercuryError> {
        let stream = self.stream()?;
        let mut buf = vec![0u8; max_bytes];
        match timeout(wait, stream.read(&mut buf)).await {
            Err(_) => Ok(Vec::new()),
            Ok(Ok(0)) if max_bytes > 0 => Err(MercuryError::ConnectionClosed),
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(buf)
            }
            Ok(Err(e)) => Err(MercuryError::TransportError(e.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), MercuryError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .shutdown()
                .await
                .map_err(|e| MercuryError::TransportError(e.to_string()))?;
        }
        Ok(())
    }
}

/// Connector producing [`TcpTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait::async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(
        &self,
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<TcpTransport, MercuryError> {
        TcpTransport::connect(host, port, connect_timeout).await
    }
}
