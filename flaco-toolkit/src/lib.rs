//! Host diagnostic probes for flaco
//!
//! DNS resolution, ICMP reachability, TCP/UDP socket checks and HTTP status
//! checks, bound to one target through [`ProbeToolkit`]. Every failure is
//! returned as a [`ProbeError`] value; nothing is retried.

mod error;
mod services;
mod types;

pub use error::{ProbeError, ProbeResult};
pub use services::{ProbeToolkit, extract_statistics, probe_url, reverse_name};
pub use types::{
    DEFAULT_PING_COUNT, DnsQueryType, PingStatistics, PortCheckResult, ProbeOptions, Protocol,
    RttSummary, Target, parse_port,
};
