//! Probe façade bound to a single target.
//!
//! [`ProbeToolkit`] holds the target and the shared options; each probe lives
//! in its own module and is stateless with respect to the others.

mod dns;
mod http;
mod ping;
mod resolver;
mod socket;

pub use dns::reverse_name;
pub use http::probe_url;
pub use ping::extract_statistics;

use crate::error::ProbeResult;
use crate::types::{DnsQueryType, PortCheckResult, ProbeOptions, Protocol, Target};

/// Network checks against one element.
///
/// The target is fixed at construction. Probes may be called in any order,
/// any number of times, or not at all.
///
/// ```rust,no_run
/// use flaco_toolkit::{DnsQueryType, ProbeToolkit, Protocol};
/// # async fn demo() -> flaco_toolkit::ProbeResult<()> {
/// let element = ProbeToolkit::new("yahoo.com")?.with_element_type("Web Server");
/// let records = element.resolve(&["8.8.8.8"], DnsQueryType::A).await?;
/// let stats = element.ping(3).await?;
/// let port = element.probe_port(80, Protocol::Tcp).await?;
/// let status = element.probe_url("https://yahoo.com").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProbeToolkit {
    target: Target,
    element_type: Option<String>,
    options: ProbeOptions,
}

impl ProbeToolkit {
    /// Bind a toolkit to `target` (hostname or IP address).
    pub fn new(target: &str) -> ProbeResult<Self> {
        Ok(Self::for_target(Target::new(target)?))
    }

    pub fn for_target(target: Target) -> Self {
        Self {
            target,
            element_type: None,
            options: ProbeOptions::default(),
        }
    }

    /// Attach a free-form element label (e.g. "F5 VIP", "Web Server").
    #[must_use]
    pub fn with_element_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ProbeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Query the target for `query_type` records using `nameservers`.
    ///
    /// For [`DnsQueryType::Ptr`] the target must be an IP address; it is
    /// converted to its reverse-lookup name first. MX values are rendered as
    /// `Host <exchange> preference <n>`.
    pub async fn resolve<S: AsRef<str>>(
        &self,
        nameservers: &[S],
        query_type: DnsQueryType,
    ) -> ProbeResult<Vec<String>> {
        dns::resolve(
            self.target.as_str(),
            nameservers,
            query_type,
            self.options.dns_timeout,
        )
        .await
    }

    /// Ping the target `count` times (200ms apart, 1350-byte payload) and
    /// return the statistics block printed by `ping`.
    ///
    /// Use [`DEFAULT_PING_COUNT`](crate::DEFAULT_PING_COUNT) when the caller
    /// has no preference.
    pub async fn ping(&self, count: u32) -> ProbeResult<String> {
        ping::ping(self.target.as_str(), count).await
    }

    /// Connect to `port` on the target over `protocol`.
    pub async fn probe_port(&self, port: u16, protocol: Protocol) -> ProbeResult<PortCheckResult> {
        socket::probe_port(
            self.target.as_str(),
            port,
            protocol,
            self.options.socket_timeout,
        )
        .await
    }

    /// GET `url` and return the HTTP status code.
    ///
    /// The URL is independent of the bound target.
    pub async fn probe_url(&self, url: &str) -> ProbeResult<u16> {
        http::probe_url(url, self.options.http_timeout).await
    }
}
