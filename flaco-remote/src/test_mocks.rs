//! Scripted transport for session and dispatcher tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RemoteError, RemoteResult};
use crate::traits::{Connection, Transport};
use crate::types::Credentials;

// ===== HostScript =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectBehavior {
    Accept,
    Refuse,
    RejectAuth,
}

/// How a single mock host behaves.
#[derive(Debug, Clone)]
pub struct HostScript {
    connect: ConnectBehavior,
    fail_on: Option<String>,
    hang_on: Option<String>,
    files: HashMap<String, String>,
}

impl HostScript {
    /// Accepts the connection and answers each command with `<host>: <command>\n`.
    pub fn echo() -> Self {
        Self {
            connect: ConnectBehavior::Accept,
            fail_on: None,
            hang_on: None,
            files: HashMap::new(),
        }
    }

    pub fn refused() -> Self {
        Self {
            connect: ConnectBehavior::Refuse,
            ..Self::echo()
        }
    }

    pub fn bad_auth() -> Self {
        Self {
            connect: ConnectBehavior::RejectAuth,
            ..Self::echo()
        }
    }

    /// Fail the given command with `CommandFailed`.
    pub fn failing_on(mut self, command: &str) -> Self {
        self.fail_on = Some(command.to_string());
        self
    }

    /// Never return from the given command.
    pub fn hanging_on(mut self, command: &str) -> Self {
        self.hang_on = Some(command.to_string());
        self
    }

    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(path.to_string(), contents.to_string());
        self
    }
}

// ===== MockTransport =====

#[derive(Debug, Default)]
struct Counters {
    connects: HashMap<String, usize>,
    closed: HashMap<String, usize>,
}

/// Transport whose hosts follow a [`HostScript`]. Unknown hosts are unreachable.
#[derive(Debug, Default)]
pub struct MockTransport {
    hosts: HashMap<String, HostScript>,
    counters: Arc<Mutex<Counters>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, script: HostScript) -> Self {
        self.hosts.insert(host.to_string(), script);
        self
    }

    /// Connect attempts made against `host`.
    pub fn connects(&self, host: &str) -> usize {
        let counters = self.counters.lock().unwrap();
        counters.connects.get(host).copied().unwrap_or(0)
    }

    /// Connections to `host` that were closed.
    pub fn closed(&self, host: &str) -> usize {
        let counters = self.counters.lock().unwrap();
        counters.closed.get(host).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &self,
        host: &str,
        _port: u16,
        _credentials: &Credentials,
        _connect_timeout: Duration,
    ) -> RemoteResult<Box<dyn Connection>> {
        *self
            .counters
            .lock()
            .unwrap()
            .connects
            .entry(host.to_string())
            .or_default() += 1;

        let Some(script) = self.hosts.get(host) else {
            return Err(RemoteError::ConnectionFailed {
                host: host.to_string(),
                message: "No route to host".to_string(),
            });
        };
        match script.connect {
            ConnectBehavior::Refuse => Err(RemoteError::ConnectionRefused(host.to_string())),
            ConnectBehavior::RejectAuth => {
                Err(RemoteError::AuthenticationFailed(host.to_string()))
            }
            ConnectBehavior::Accept => Ok(Box::new(MockConnection {
                host: host.to_string(),
                script: script.clone(),
                counters: Arc::clone(&self.counters),
            })),
        }
    }
}

// ===== MockConnection =====

struct MockConnection {
    host: String,
    script: HostScript,
    counters: Arc<Mutex<Counters>>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn exec(&mut self, command: &str) -> RemoteResult<String> {
        if self.script.fail_on.as_deref() == Some(command) {
            return Err(RemoteError::CommandFailed {
                host: self.host.clone(),
                command: command.to_string(),
                message: "channel closed".to_string(),
            });
        }
        if self.script.hang_on.as_deref() == Some(command) {
            std::future::pending::<()>().await;
        }
        Ok(format!("{}: {command}\n", self.host))
    }

    async fn fetch(&mut self, source: &str, destination: &Path) -> RemoteResult<u64> {
        let Some(contents) = self.script.files.get(source) else {
            return Err(RemoteError::TransferFailed {
                host: self.host.clone(),
                message: format!("{source}: no such file"),
            });
        };
        tokio::fs::write(destination, contents)
            .await
            .map_err(|e| RemoteError::TransferFailed {
                host: self.host.clone(),
                message: e.to_string(),
            })?;
        Ok(contents.len() as u64)
    }

    async fn close(self: Box<Self>) {
        *self
            .counters
            .lock()
            .unwrap()
            .closed
            .entry(self.host.clone())
            .or_default() += 1;
    }
}
