//! Polls a fake meter served from a loopback TCP listener, exercising the
//! real socket transport.

use mercury_poll::mercury::{encode_response, verify_checksum, Command, TcpConnector};
use mercury_poll::payload::int_to_bcd;
use mercury_poll::poll::{poll_port, rows, RowStatus};
use mercury_poll::{MercuryError, PollConfig, SerialNumber};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn answer(request: &[u8]) -> Option<Vec<u8>> {
    if verify_checksum(request).is_err() {
        return None;
    }
    let address = SerialNumber::new("548973").unwrap().address();
    if &request[..4] != address.as_bytes() {
        return None;
    }
    let payload = match Command::try_from(request[4]).ok()? {
        Command::ReadInstant => [
            int_to_bcd(2301, 2).unwrap(),
            int_to_bcd(150, 2).unwrap(),
            int_to_bcd(750, 3).unwrap(),
        ]
        .concat(),
        Command::ReadEnergy => [int_to_bcd(100_000, 4).unwrap(), int_to_bcd(5, 4).unwrap()].concat(),
    };
    Some(encode_response(address, request[4], &payload))
}

/// Serves one connection; answers arrive split in two writes.
async fn serve_meter(mut socket: TcpStream) {
    let mut request = [0u8; 7];
    while socket.read_exact(&mut request).await.is_ok() {
        let Some(frame) = answer(&request) else {
            continue;
        };
        let (head, tail) = frame.split_at(5);
        if socket.write_all(head).await.is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        if socket.write_all(tail).await.is_err() {
            return;
        }
    }
}

fn config() -> PollConfig {
    PollConfig::default()
        .with_host("127.0.0.1")
        .with_response_timeout(Duration::from_millis(500))
        .with_read_timeout(Duration::from_millis(200))
}

#[tokio::test]
async fn test_poll_over_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        serve_meter(socket).await;
    });

    let serials = vec![
        SerialNumber::new("548973").unwrap(),
        SerialNumber::new("111111").unwrap(),
    ];
    let report = poll_port(&TcpConnector, port, &serials, &config()).await;
    let rows = rows(&[report]);

    assert_eq!(rows[0].status, RowStatus::Complete);
    assert_eq!(
        rows[0].to_table_line(),
        format!("{port:<5}|548973  | 230.1|  1.50|    750|   1000.00|      0.05")
    );
    assert_eq!(rows[1].status, RowStatus::NoResponse);

    // Our side closed the socket, so the fake meter's read loop ends
    tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server did not see the connection close")
        .unwrap();
}

#[tokio::test]
async fn test_refused_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let serials = vec![SerialNumber::new("548973").unwrap()];
    let report = poll_port(&TcpConnector, port, &serials, &config()).await;

    assert!(matches!(report.result, Err(MercuryError::ConnectionError(_))));
}
