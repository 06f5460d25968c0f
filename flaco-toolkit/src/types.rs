//! Public types accepted and returned by probe operations.

use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, ProbeResult};

/// Default number of ICMP echo requests sent by [`ProbeToolkit::ping`](crate::ProbeToolkit::ping).
pub const DEFAULT_PING_COUNT: u32 = 9;

/// Hostname or IP address of the network element under test.
///
/// Surrounding whitespace is trimmed on construction; the value cannot be
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    /// Build a target from user input, rejecting empty or whitespace-only values.
    pub fn new(value: &str) -> ProbeResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ProbeError::ValidationError(
                "Target hostname or IP address is required".to_string(),
            ));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ProbeError::ValidationError(format!(
                "Target must not contain whitespace: {value}"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Target {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Target {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// DNS query type supported by the resolver probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsQueryType {
    /// IPv4 address record.
    A,
    /// Canonical name (alias) record.
    Cname,
    /// Mail exchange record.
    Mx,
    /// Pointer record (reverse DNS).
    Ptr,
}

impl fmt::Display for DnsQueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Cname => write!(f, "CNAME"),
            Self::Mx => write!(f, "MX"),
            Self::Ptr => write!(f, "PTR"),
        }
    }
}

impl FromStr for DnsQueryType {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "PTR" => Ok(Self::Ptr),
            _ => Err(ProbeError::UnsupportedQueryType(s.to_string())),
        }
    }
}

/// Transport used by the socket probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TCP" => Ok(Self::Tcp),
            "UDP" => Ok(Self::Udp),
            _ => Err(ProbeError::ValidationError(format!(
                "Unsupported protocol: {s} (expected TCP or UDP)"
            ))),
        }
    }
}

/// Parse a port number from text.
///
/// Values that are numeric but outside `0..=65535` are reported as
/// [`ProbeError::Overflow`]; anything else that fails to parse is a
/// [`ProbeError::ValidationError`].
pub fn parse_port(value: &str) -> ProbeResult<u16> {
    let value = value.trim();
    match value.parse::<i64>() {
        Ok(n) => u16::try_from(n)
            .map_err(|_| ProbeError::Overflow(format!("port must be 0-65535, got {n}"))),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Err(ProbeError::Overflow(format!(
                "port must be 0-65535, got {value}"
            )))
        }
        Err(_) => Err(ProbeError::ValidationError(format!(
            "Invalid port number: {value}"
        ))),
    }
}

/// Tunables shared by all probes of a [`ProbeToolkit`](crate::ProbeToolkit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Upper bound for a single DNS query.
    pub dns_timeout: Duration,
    /// Upper bound for a single HTTP request (connect + response head).
    pub http_timeout: Duration,
    /// Connect timeout for the socket probe; `None` keeps the platform default.
    pub socket_timeout: Option<Duration>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            dns_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            socket_timeout: None,
        }
    }
}

/// Successful socket probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortCheckResult {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    /// Time spent establishing the connection.
    pub response_time_ms: u64,
}

impl fmt::Display for PortCheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("open")
    }
}

/// Round-trip summary from the `rtt min/avg/max/mdev` line, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RttSummary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub mdev: f64,
}

/// Numbers extracted from a ping statistics block.
///
/// See [`PingStatistics::parse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingStatistics {
    pub transmitted: u32,
    pub received: u32,
    /// Loss as reported by `ping`, e.g. `0.0` or `100.0`.
    pub loss_percent: f64,
    /// The literal `N% packet loss` fragment.
    pub loss: String,
    pub rtt: Option<RttSummary>,
}
