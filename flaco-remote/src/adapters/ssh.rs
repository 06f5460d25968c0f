//! SSH transport backed by libssh2.
//!
//! libssh2 is blocking, so every call runs on tokio's blocking pool.

use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use ssh2::Session;
use tokio::task::{JoinError, spawn_blocking};

use crate::error::{RemoteError, RemoteResult};
use crate::traits::{Connection, Transport};
use crate::types::Credentials;

/// Password-authenticated SSH. Any host key is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshTransport;

impl SshTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn connect(
        &self,
        host: &str,
        port: u16,
        credentials: &Credentials,
        connect_timeout: Duration,
    ) -> RemoteResult<Box<dyn Connection>> {
        let host = host.to_string();
        let credentials = credentials.clone();
        let task_host = host.clone();
        let connection = spawn_blocking(move || {
            open_session(&task_host, port, &credentials, connect_timeout)
        })
        .await
        .map_err(|e| RemoteError::ConnectionFailed {
            host: host.clone(),
            message: join_message(&e),
        })??;
        Ok(Box::new(connection))
    }
}

/// TCP connect, handshake and password auth, in that order.
fn open_session(
    host: &str,
    port: u16,
    credentials: &Credentials,
    connect_timeout: Duration,
) -> RemoteResult<SshConnection> {
    let stream = connect_tcp(host, port, connect_timeout)?;

    let mut session = Session::new()?;
    session.set_tcp_stream(stream);
    session.set_timeout(u32::try_from(connect_timeout.as_millis()).unwrap_or(u32::MAX));
    session
        .handshake()
        .map_err(|e| RemoteError::ConnectionFailed {
            host: host.to_string(),
            message: format!("SSH handshake failed: {e}"),
        })?;
    debug!("[SSH] Handshake with {host}:{port} complete");

    if let Err(e) = session.userauth_password(&credentials.username, &credentials.password) {
        debug!("[SSH] Password auth for {} on {host}: {e}", credentials.username);
        return Err(RemoteError::AuthenticationFailed(host.to_string()));
    }
    if !session.authenticated() {
        return Err(RemoteError::AuthenticationFailed(host.to_string()));
    }

    // Commands may legitimately run longer than the connect budget.
    session.set_timeout(0);

    Ok(SshConnection {
        host: host.to_string(),
        session,
    })
}

fn connect_tcp(host: &str, port: u16, connect_timeout: Duration) -> RemoteResult<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| RemoteError::ConnectionFailed {
            host: host.to_string(),
            message: format!("cannot resolve: {e}"),
        })?;

    let mut last_error: Option<io::Error> = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, connect_timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("[SSH] TCP connect to {addr} failed: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            RemoteError::ConnectionRefused(host.to_string())
        }
        Some(e) => RemoteError::ConnectionFailed {
            host: host.to_string(),
            message: e.to_string(),
        },
        None => RemoteError::ConnectionFailed {
            host: host.to_string(),
            message: "no addresses resolved".to_string(),
        },
    })
}

fn join_message(err: &JoinError) -> String {
    format!("blocking task aborted: {err}")
}

/// An authenticated libssh2 session.
pub struct SshConnection {
    host: String,
    session: Session,
}

impl std::fmt::Debug for SshConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnection")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for SshConnection {
    async fn exec(&mut self, command: &str) -> RemoteResult<String> {
        let session = self.session.clone();
        let cmd = command.to_string();
        let failed = |message: String| RemoteError::CommandFailed {
            host: self.host.clone(),
            command: command.to_string(),
            message,
        };

        let result = spawn_blocking(move || -> Result<String, String> {
            let mut channel = session.channel_session().map_err(|e| e.to_string())?;
            channel.exec(&cmd).map_err(|e| e.to_string())?;
            let mut stdout = Vec::new();
            channel
                .read_to_end(&mut stdout)
                .map_err(|e| e.to_string())?;
            channel.wait_close().map_err(|e| e.to_string())?;
            Ok(String::from_utf8_lossy(&stdout).into_owned())
        })
        .await
        .map_err(|e| failed(join_message(&e)))?;

        result.map_err(failed)
    }

    async fn fetch(&mut self, source: &str, destination: &Path) -> RemoteResult<u64> {
        let session = self.session.clone();
        let remote = PathBuf::from(source);
        let local = destination.to_path_buf();
        let failed = |message: String| RemoteError::TransferFailed {
            host: self.host.clone(),
            message,
        };

        let result = spawn_blocking(move || -> Result<u64, String> {
            let (mut channel, stat) = session
                .scp_recv(&remote)
                .map_err(|e| format!("{}: {e}", remote.display()))?;
            let mut contents = Vec::new();
            channel
                .read_to_end(&mut contents)
                .map_err(|e| format!("{}: {e}", remote.display()))?;
            // Drain the scp channel before closing it.
            let _ = channel.send_eof();
            let _ = channel.wait_eof();
            let _ = channel.close();
            let _ = channel.wait_close();

            if contents.len() as u64 != stat.size() {
                warn!(
                    "[SSH] Expected {} bytes for {}, received {}",
                    stat.size(),
                    remote.display(),
                    contents.len()
                );
            }
            std::fs::write(&local, &contents)
                .map_err(|e| format!("{}: {e}", local.display()))?;
            Ok(contents.len() as u64)
        })
        .await
        .map_err(|e| failed(join_message(&e)))?;

        result.map_err(failed)
    }

    async fn close(self: Box<Self>) {
        let SshConnection { host, session } = *self;
        let result =
            spawn_blocking(move || session.disconnect(None, "closing session", None)).await;
        match result {
            Ok(Ok(())) => debug!("[SSH] Disconnected from {host}"),
            Ok(Err(e)) => warn!("[SSH] Disconnect from {host} failed: {e}"),
            Err(e) => warn!("[SSH] Disconnect from {host} aborted: {e}"),
        }
    }
}
