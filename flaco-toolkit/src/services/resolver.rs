//! Resolver construction shared by the DNS probe.

use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::{
    TokioResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
};

use crate::error::{ProbeError, ProbeResult};

/// Parse a list of name-server addresses, preserving order and dropping duplicates.
///
/// The list must be non-empty and every entry must be an IP address.
pub(crate) fn parse_nameservers<S: AsRef<str>>(nameservers: &[S]) -> ProbeResult<Vec<IpAddr>> {
    if nameservers.is_empty() {
        return Err(ProbeError::ValidationError(
            "At least one name server is required".to_string(),
        ));
    }

    let mut ips: Vec<IpAddr> = Vec::with_capacity(nameservers.len());
    for ns in nameservers {
        let ns = ns.as_ref().trim();
        let ip: IpAddr = ns.parse().map_err(|_| {
            ProbeError::InvalidAddress(format!("Invalid DNS server address: {ns}"))
        })?;
        if !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    Ok(ips)
}

/// Standard DNS port.
pub(crate) const DNS_PORT: u16 = 53;

/// Build a resolver that only talks to `nameservers` on `port`.
///
/// One attempt per query; the per-attempt timeout is `timeout`.
pub(crate) fn build_resolver(
    nameservers: &[IpAddr],
    port: u16,
    timeout: Duration,
) -> TokioResolver {
    let config = ResolverConfig::from_parts(
        None,
        vec![],
        NameServerConfigGroup::from_ips_clear(nameservers, port, true),
    );
    let provider = TokioConnectionProvider::default();
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    TokioResolver::builder_with_config(config, provider)
        .with_options(opts)
        .build()
}
