//! TOML configuration.
//!
//! ```toml
//! [probe]
//! nameservers = ["8.8.8.8"]
//! ping_count = 25
//!
//! [ssh]
//! username = "admin"
//! command_interval_ms = 2000
//!
//! [[element]]
//! name = "yahoo.com"
//! kind = "Web Server"
//! query_type = "A"
//! ports = [80, 443]
//! urls = ["https://yahoo.com"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use flaco_remote::SessionOptions;
use flaco_toolkit::{DnsQueryType, ProbeOptions, Protocol};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub probe: ProbeConfig,
    pub ssh: SshConfig,
    #[serde(rename = "element")]
    pub elements: Vec<ElementProfile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub nameservers: Vec<String>,
    pub ping_count: u32,
    pub dns_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub socket_timeout_secs: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            nameservers: vec!["8.8.8.8".to_string()],
            ping_count: 25,
            dns_timeout_secs: 5,
            http_timeout_secs: 10,
            socket_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub username: Option<String>,
    pub port: u16,
    pub connect_timeout_secs: u64,
    pub command_interval_ms: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            username: None,
            port: 22,
            connect_timeout_secs: 10,
            command_interval_ms: 2000,
        }
    }
}

/// One `[[element]]` entry checked by `flaco check`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementProfile {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    /// DNS check is skipped when unset.
    #[serde(default)]
    pub query_type: Option<DnsQueryType>,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub urls: Vec<String>,
    /// Skip the ping check.
    #[serde(default)]
    pub skip_ping: bool,
}

impl Config {
    /// `<config dir>/flaco/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flaco")
            .join("config.toml")
    }

    /// Load `path`, or the default path when `None`.
    ///
    /// A missing default file yields the built-in defaults; an explicitly
    /// given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };
        if !explicit && !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            dns_timeout: Duration::from_secs(self.probe.dns_timeout_secs),
            http_timeout: Duration::from_secs(self.probe.http_timeout_secs),
            socket_timeout: self.probe.socket_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            port: self.ssh.port,
            connect_timeout: Duration::from_secs(self.ssh.connect_timeout_secs),
            command_interval: Duration::from_millis(self.ssh.command_interval_ms),
            ..SessionOptions::default()
        }
    }
}
