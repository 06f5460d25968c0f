//! Remote session state machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use super::interrupt::Interrupt;
use crate::adapters::SshTransport;
use crate::error::{RemoteError, RemoteResult};
use crate::traits::{Connection, Transport};
use crate::types::{Credentials, SessionOptions, SessionState, Transcript};

/// One host, one connection at a time.
///
/// `Unconnected -> Connected -> Closed`. Running a command batch or fetching
/// a file closes the connection afterwards; call [`connect`](Self::connect)
/// again to reuse the session.
///
/// With [`SessionOptions::cancel_on_interrupt`] set, Ctrl-C at any point
/// (connecting, running a command, waiting between commands, fetching)
/// ends the current operation with [`RemoteError::Cancelled`].
pub struct RemoteSession {
    transport: Arc<dyn Transport>,
    options: SessionOptions,
    interrupt: Option<Interrupt>,
    host: Option<String>,
    connection: Option<Box<dyn Connection>>,
    state: SessionState,
}

impl RemoteSession {
    pub fn new(transport: Arc<dyn Transport>, options: SessionOptions) -> Self {
        Self {
            transport,
            options,
            interrupt: None,
            host: None,
            connection: None,
            state: SessionState::Unconnected,
        }
    }

    /// Session over the production SSH transport.
    pub fn ssh(options: SessionOptions) -> Self {
        Self::new(Arc::new(SshTransport::new()), options)
    }

    /// Use `interrupt` instead of installing a Ctrl-C listener of its own.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Host of the last connect attempt.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Open an authenticated connection to `host`.
    ///
    /// A still-open previous connection is closed first. On failure the
    /// session is left without a connection.
    pub async fn connect(&mut self, host: &str, credentials: &Credentials) -> RemoteResult<()> {
        self.release().await;
        self.host = Some(host.to_string());
        let interrupt = self.listen();
        info!("[SSH] Connecting to {host}:{}", self.options.port);

        let attempt = self.transport.connect(
            host,
            self.options.port,
            credentials,
            self.options.connect_timeout,
        );
        let result = match until_interrupted(interrupt.as_ref(), attempt).await {
            Some(result) => result,
            None => Err(RemoteError::Cancelled(host.to_string())),
        };

        match result {
            Ok(connection) => {
                self.connection = Some(connection);
                self.state = SessionState::Connected;
                info!("[SSH] Connected to {host}");
                Ok(())
            }
            Err(e) => {
                warn!("[SSH] {e}");
                Err(e)
            }
        }
    }

    /// Run `commands` in order, appending one entry per command to
    /// `transcript`, pausing `command_interval` between commands.
    ///
    /// Returns how many entries were appended. Without a connection nothing
    /// runs and `Ok(0)` is returned. The connection is closed afterwards,
    /// whether or not every command succeeded; entries recorded before a
    /// failure stay in `transcript`. On interrupt the connection is dropped
    /// without waiting for the remote command.
    pub async fn run_commands<S: AsRef<str>>(
        &mut self,
        commands: &[S],
        transcript: &mut Transcript,
    ) -> RemoteResult<usize> {
        let Some(mut connection) = self.connection.take() else {
            warn!(
                "[SSH] No active session with {}; skipping {} command(s)",
                self.host.as_deref().unwrap_or("<none>"),
                commands.len()
            );
            return Ok(0);
        };
        let host = self.host.clone().unwrap_or_default();
        let interrupt = self.interrupt.clone();
        let interval = self.options.command_interval;

        let mut completed = 0;
        let mut failure = None;
        for (index, command) in commands.iter().enumerate() {
            let command = command.as_ref();
            if index > 0
                && !interval.is_zero()
                && until_interrupted(interrupt.as_ref(), tokio::time::sleep(interval))
                    .await
                    .is_none()
            {
                failure = Some(RemoteError::Cancelled(host.clone()));
                break;
            }
            debug!("[SSH] {host}> {command}");
            match until_interrupted(interrupt.as_ref(), connection.exec(command)).await {
                Some(Ok(output)) => {
                    transcript.record(command, output);
                    completed += 1;
                }
                Some(Err(e)) => {
                    failure = Some(e);
                    break;
                }
                None => {
                    failure = Some(RemoteError::Cancelled(host.clone()));
                    break;
                }
            }
        }

        self.finish(connection, failure.as_ref()).await;

        match failure {
            Some(e) => {
                warn!("[SSH] {e}");
                Err(e)
            }
            None => {
                info!("[SSH] Ran {completed} command(s) on {host}");
                Ok(completed)
            }
        }
    }

    /// Copy the remote file `source` to `destination` over scp, then close.
    ///
    /// When `destination` is an existing directory the file keeps its remote
    /// name inside it. Returns the number of bytes written.
    pub async fn fetch_file(&mut self, source: &str, destination: &Path) -> RemoteResult<u64> {
        let host = self.host.clone().unwrap_or_default();
        let Some(mut connection) = self.connection.take() else {
            return Err(RemoteError::NotConnected(host));
        };
        let interrupt = self.interrupt.clone();

        let target = local_destination(source, destination).await;
        info!("[SSH] Fetching {host}:{source} -> {}", target.display());
        let result = until_interrupted(interrupt.as_ref(), connection.fetch(source, &target))
            .await
            .unwrap_or_else(|| Err(RemoteError::Cancelled(host)));

        self.finish(connection, result.as_ref().err()).await;
        result
    }

    /// Close the current connection, if any.
    pub async fn close(&mut self) {
        if self.release().await {
            self.state = SessionState::Closed;
        }
    }

    /// The interrupt for this session, installing the Ctrl-C listener on
    /// first use when the options ask for it.
    fn listen(&mut self) -> Option<Interrupt> {
        if self.interrupt.is_none() && self.options.cancel_on_interrupt {
            match Interrupt::ctrl_c() {
                Ok(interrupt) => self.interrupt = Some(interrupt),
                Err(e) => warn!("[SSH] Cannot listen for Ctrl-C: {e}"),
            }
        }
        self.interrupt.clone()
    }

    /// Release `connection` after an operation and mark the session closed.
    async fn finish(&mut self, connection: Box<dyn Connection>, failure: Option<&RemoteError>) {
        if matches!(failure, Some(RemoteError::Cancelled(_))) {
            // The blocking call may still hold the connection; do not wait on it.
            drop(connection);
        } else {
            connection.close().await;
        }
        self.state = SessionState::Closed;
    }

    async fn release(&mut self) -> bool {
        match self.connection.take() {
            Some(connection) => {
                connection.close().await;
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("host", &self.host)
            .field("state", &self.state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Run `operation` unless `interrupt` fires first (`None` then).
async fn until_interrupted<F: Future>(
    interrupt: Option<&Interrupt>,
    operation: F,
) -> Option<F::Output> {
    match interrupt {
        Some(interrupt) => tokio::select! {
            biased;
            () = interrupt.triggered() => None,
            output = operation => Some(output),
        },
        None => Some(operation.await),
    }
}

async fn local_destination(source: &str, destination: &Path) -> PathBuf {
    let is_dir = tokio::fs::metadata(destination)
        .await
        .is_ok_and(|m| m.is_dir());
    if !is_dir {
        return destination.to_path_buf();
    }
    match Path::new(source).file_name() {
        Some(name) => destination.join(name),
        None => destination.to_path_buf(),
    }
}
