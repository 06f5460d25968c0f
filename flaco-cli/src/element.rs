//! Presentation wrapper around [`ProbeToolkit`] for application checks.

use flaco_toolkit::{
    DnsQueryType, PingStatistics, PortCheckResult, ProbeError, ProbeOptions, ProbeResult,
    ProbeToolkit, Protocol,
};
use serde::Serialize;

use crate::config::ElementProfile;

/// One element of an application, checked through a bound toolkit.
#[derive(Debug, Clone)]
pub struct Element {
    toolkit: ProbeToolkit,
}

impl Element {
    pub fn new(name: &str, kind: &str, options: ProbeOptions) -> ProbeResult<Self> {
        let toolkit = ProbeToolkit::new(name)?
            .with_element_type(kind)
            .with_options(options);
        Ok(Self { toolkit })
    }

    pub fn name(&self) -> &str {
        self.toolkit.target().as_str()
    }

    pub fn kind(&self) -> &str {
        self.toolkit.element_type().unwrap_or_default()
    }

    /// Run every check the profile asks for, in a fixed order.
    pub async fn run(
        &self,
        profile: &ElementProfile,
        nameservers: &[String],
        ping_count: u32,
    ) -> ElementReport {
        let dns = match profile.query_type {
            Some(query_type) => Some(DnsCheck {
                query_type,
                result: self.toolkit.resolve(nameservers, query_type).await,
            }),
            None => None,
        };

        let ping = if profile.skip_ping {
            None
        } else {
            Some(self.toolkit.ping(ping_count).await)
        };

        let mut ports = Vec::with_capacity(profile.ports.len());
        for &port in &profile.ports {
            ports.push(PortCheck {
                protocol: profile.protocol,
                port,
                result: self.toolkit.probe_port(port, profile.protocol).await,
            });
        }

        let mut urls = Vec::with_capacity(profile.urls.len());
        for url in &profile.urls {
            urls.push(UrlCheck {
                url: url.clone(),
                result: self.toolkit.probe_url(url).await,
            });
        }

        ElementReport {
            element: self.name().to_string(),
            kind: self.kind().to_string(),
            dns,
            ping,
            ports,
            urls,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsCheck {
    pub query_type: DnsQueryType,
    pub result: ProbeResult<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortCheck {
    pub protocol: Protocol,
    pub port: u16,
    pub result: ProbeResult<PortCheckResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlCheck {
    pub url: String,
    pub result: ProbeResult<u16>,
}

/// Everything `flaco check` learned about one element.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementReport {
    pub element: String,
    pub kind: String,
    pub dns: Option<DnsCheck>,
    pub ping: Option<ProbeResult<String>>,
    pub ports: Vec<PortCheck>,
    pub urls: Vec<UrlCheck>,
}

impl ElementReport {
    /// Tab-indented lines for the terminal.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("\tElement: {}", self.element),
            format!("\t\tType: {}", self.kind),
        ];
        if let Some(dns) = &self.dns {
            lines.push(format!(
                "\t\tDNS {} records: {}",
                dns.query_type,
                join_or_error(&dns.result)
            ));
        }
        if let Some(ping) = &self.ping {
            lines.push(format!("\t\tPing: {}", packet_loss(ping)));
        }
        for check in &self.ports {
            lines.push(format!(
                "\t\t{} port {}: {}",
                check.protocol,
                check.port,
                status_or_error(&check.result)
            ));
        }
        for check in &self.urls {
            lines.push(format!(
                "\t\tURL {}: {}",
                check.url,
                status_or_error(&check.result)
            ));
        }
        lines
    }

    pub fn has_failures(&self) -> bool {
        self.dns.as_ref().is_some_and(|d| d.result.is_err())
            || self.ping.as_ref().is_some_and(Result::is_err)
            || self.ports.iter().any(|p| p.result.is_err())
            || self.urls.iter().any(|u| u.result.is_err())
    }
}

pub fn join_or_error(result: &ProbeResult<Vec<String>>) -> String {
    match result {
        Ok(records) => records.join(", "),
        Err(e) => e.to_string(),
    }
}

pub fn status_or_error<T: std::fmt::Display>(result: &Result<T, ProbeError>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(e) => e.to_string(),
    }
}

/// `N% packet loss`, or `connection error` when ping produced no statistics.
fn packet_loss(result: &ProbeResult<String>) -> String {
    result
        .as_ref()
        .ok()
        .and_then(|stats| PingStatistics::parse(stats))
        .map_or_else(|| "connection error".to_string(), |s| s.loss)
}
