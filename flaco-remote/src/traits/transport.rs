//! Remote transport abstraction Trait

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RemoteResult;
use crate::types::Credentials;

/// Opens authenticated connections to hosts.
///
/// Implementations:
/// - `SshTransport`: password-authenticated SSH via libssh2
/// - `MockTransport` (tests): scripted per-host behaviour
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to `host:port` and authenticate with `credentials`.
    ///
    /// # Errors
    /// * `ConnectionRefused` - the host actively refused the TCP connection
    /// * `ConnectionFailed` - unreachable, timed out, or the handshake failed
    /// * `AuthenticationFailed` - the credentials were rejected
    async fn connect(
        &self,
        host: &str,
        port: u16,
        credentials: &Credentials,
        connect_timeout: Duration,
    ) -> RemoteResult<Box<dyn Connection>>;
}

/// One established, authenticated connection.
#[async_trait]
pub trait Connection: Send {
    /// Run `command` on a fresh channel and return its standard output.
    async fn exec(&mut self, command: &str) -> RemoteResult<String>;

    /// Copy the remote file `source` to the local path `destination`.
    ///
    /// Returns the number of bytes written.
    async fn fetch(&mut self, source: &str, destination: &Path) -> RemoteResult<u64>;

    /// Tear down the connection. Errors are logged, never returned.
    async fn close(self: Box<Self>);
}
