//! TCP/UDP socket probe.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

use log::debug;
use tokio::net::{TcpStream, UdpSocket, lookup_host};
use tokio::time::timeout;

use crate::error::{ProbeError, ProbeResult};
use crate::types::{PortCheckResult, Protocol};

/// Try to connect to `host:port` over `protocol`.
///
/// The connection is closed immediately on success. UDP is connectionless, so
/// "open" there means the address resolved and the socket could be connected
/// locally; no datagram is exchanged.
pub async fn probe_port(
    host: &str,
    port: u16,
    protocol: Protocol,
    connect_timeout: Option<Duration>,
) -> ProbeResult<PortCheckResult> {
    if port == 0 {
        return Err(ProbeError::ConnectionError(format!(
            "{protocol} {host}:0: port 0 is not a connectable destination"
        )));
    }

    debug!("[SOCKET] {protocol} {host}:{port}");
    let start = Instant::now();

    let attempt = async {
        match protocol {
            Protocol::Tcp => connect_tcp(host, port).await,
            Protocol::Udp => connect_udp(host, port).await,
        }
    };

    let outcome = match connect_timeout {
        Some(limit) => timeout(limit, attempt).await.map_err(|_| {
            ProbeError::Timeout(format!(
                "{protocol} {host}:{port} timed out after {}ms",
                limit.as_millis()
            ))
        })?,
        None => attempt.await,
    };

    outcome.map_err(|e| {
        debug!("[SOCKET] {protocol} {host}:{port} failed: {e}");
        ProbeError::ConnectionError(format!("{protocol} {host}:{port}: {e}"))
    })?;

    // u128 -> u64: a connect attempt never lasts u64::MAX milliseconds
    #[allow(clippy::cast_possible_truncation)]
    let response_time_ms = start.elapsed().as_millis() as u64;

    Ok(PortCheckResult {
        host: host.to_string(),
        port,
        protocol,
        response_time_ms,
    })
}

async fn connect_tcp(host: &str, port: u16) -> io::Result<()> {
    let stream = TcpStream::connect((host, port)).await?;
    drop(stream);
    Ok(())
}

async fn connect_udp(host: &str, port: u16) -> io::Result<()> {
    let mut last_err = None;
    for addr in lookup_host((host, port)).await? {
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = match UdpSocket::bind(local).await {
            Ok(socket) => socket,
            Err(e) => {
                last_err = Some(e);
                continue;
            }
        };
        match socket.connect(addr).await {
            Ok(()) => return Ok(()),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "could not resolve to any address",
        )
    }))
}
