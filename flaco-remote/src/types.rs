//! Public types for sessions, transcripts and dispatch jobs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::RemoteError;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Pause between two consecutive commands on the same host.
pub const DEFAULT_COMMAND_INTERVAL: Duration = Duration::from_secs(2);

/// Username/password pair used against every host.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection and pacing settings for a [`RemoteSession`](crate::RemoteSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub port: u16,
    /// TCP connect timeout (the SSH handshake has its own libssh2 timeout).
    pub connect_timeout: Duration,
    /// Pause between commands to avoid overwhelming the remote host.
    pub command_interval: Duration,
    /// End the current operation with [`RemoteError::Cancelled`] on Ctrl-C.
    pub cancel_on_interrupt: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            connect_timeout: Duration::from_secs(10),
            command_interval: DEFAULT_COMMAND_INTERVAL,
            cancel_on_interrupt: true,
        }
    }
}

/// Lifecycle of a [`RemoteSession`](crate::RemoteSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Unconnected,
    Connected,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconnected => write!(f, "unconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// One executed command and its captured standard output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub timestamp: DateTime<Local>,
    pub command: String,
    pub output: String,
}

impl TranscriptEntry {
    /// `DATE/TIME: <timestamp> CLI: <command>`
    pub fn key(&self) -> String {
        format!(
            "DATE/TIME: {} CLI: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.command
        )
    }

    /// Key line followed by the output, newline-terminated.
    pub fn render(&self) -> String {
        let mut text = format!("{}\n{}", self.key(), self.output);
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text
    }
}

/// Ordered, append-only record of commands run in one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current local time.
    pub fn record(&mut self, command: impl Into<String>, output: impl Into<String>) {
        self.push(TranscriptEntry {
            timestamp: Local::now(),
            command: command.into(),
            output: output.into(),
        });
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a TranscriptEntry;
    type IntoIter = std::slice::Iter<'a, TranscriptEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One dispatcher run: which hosts, which commands, where the transcript goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub device_list: PathBuf,
    pub commands: Vec<String>,
    pub output: PathBuf,
}

impl Job {
    /// Build a job; blank commands are dropped and the rest trimmed.
    pub fn new(
        device_list: impl Into<PathBuf>,
        commands: impl IntoIterator<Item = impl AsRef<str>>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            device_list: device_list.into(),
            commands: commands
                .into_iter()
                .map(|c| c.as_ref().trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            output: output.into(),
        }
    }

    /// One-line echo of the job settings for the operator.
    pub fn summary(&self) -> String {
        format!(
            "devices={} output={} commands=[{}]",
            self.device_list.display(),
            self.output.display(),
            self.commands.join(", ")
        )
    }
}

/// What happened to one host during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostOutcome {
    pub host: String,
    /// Commands whose output was captured.
    pub completed: usize,
    pub error: Option<RemoteError>,
}

impl HostOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-host results of a dispatch, in device-list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub output: PathBuf,
    pub hosts: Vec<HostOutcome>,
}

impl DispatchReport {
    pub fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            hosts: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.hosts.iter().filter(|h| h.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.hosts.len() - self.succeeded()
    }
}
