//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

/// Remote layer error type
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum RemoteError {
    /// The host actively refused the TCP connection
    #[error("Connection refused on {0}.")]
    ConnectionRefused(String),

    /// Any other failure to reach the host (DNS, timeout, unreachable, handshake)
    #[error("Connection to {host} failed: {message}")]
    ConnectionFailed { host: String, message: String },

    /// Credentials rejected by the host
    #[error("Authentication failed on {0}.")]
    AuthenticationFailed(String),

    /// Interrupted by the operator
    #[error("Interrupted on {0}")]
    Cancelled(String),

    /// Operation needs an established session
    #[error("No active session with {0}")]
    NotConnected(String),

    /// A command could not be executed or its output read
    #[error("Command '{command}' failed on {host}: {message}")]
    CommandFailed {
        host: String,
        command: String,
        message: String,
    },

    /// Secure copy failed
    #[error("File transfer from {host} failed: {message}")]
    TransferFailed { host: String, message: String },

    /// Device list could not be read; the whole dispatch is skipped
    #[error("Cannot read device list {path}: {message}")]
    DeviceList { path: String, message: String },

    /// Job output file could not be written
    #[error("Cannot write job output {path}: {message}")]
    Output { path: String, message: String },

    /// Low-level SSH library error
    #[error("SSH error: {0}")]
    Ssh(String),
}

impl RemoteError {
    /// Errors that must stop the whole process rather than just the current host.
    ///
    /// The library never exits on its own; the top-level caller checks this.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_) | Self::Cancelled(_))
    }
}

impl From<ssh2::Error> for RemoteError {
    fn from(err: ssh2::Error) -> Self {
        Self::Ssh(err.to_string())
    }
}

/// Remote layer Result type alias
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(RemoteError::AuthenticationFailed("r1".to_string()).is_fatal());
        assert!(RemoteError::Cancelled("r1".to_string()).is_fatal());
        assert!(!RemoteError::ConnectionRefused("r1".to_string()).is_fatal());
        assert!(
            !RemoteError::DeviceList {
                path: "devices.txt".to_string(),
                message: "missing".to_string(),
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_display_matches_operator_messages() {
        assert_eq!(
            RemoteError::ConnectionRefused("10.0.0.1".to_string()).to_string(),
            "Connection refused on 10.0.0.1."
        );
        assert_eq!(
            RemoteError::AuthenticationFailed("10.0.0.1".to_string()).to_string(),
            "Authentication failed on 10.0.0.1."
        );
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(RemoteError::NotConnected("r1".to_string())).unwrap();
        assert_eq!(json["code"], "NotConnected");
        assert_eq!(json["details"], "r1");
    }
}
