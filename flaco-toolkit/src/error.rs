//! Unified probe error type

use serde::Serialize;
use thiserror::Error;

/// Probe failure reasons.
///
/// Every probe reports its failure through this type instead of panicking or
/// aborting; callers decide how to display it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum ProbeError {
    /// Input rejected before any network activity
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Malformed IP address (name server or PTR target)
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Query type outside A, CNAME, MX, PTR
    #[error("Unsupported query type: {0}")]
    UnsupportedQueryType(String),

    /// The name exists but carries no record of the requested type
    #[error("No {record_type} answer for {name}")]
    NoAnswer { name: String, record_type: String },

    /// NXDOMAIN
    #[error("Name not found: {0}")]
    NameNotFound(String),

    /// Resolver or connection timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Numeric input outside its representable range (e.g. port > 65535)
    #[error("Overflow: {0}")]
    Overflow(String),

    /// URL could not be parsed or has an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// TCP/UDP connection failure
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// HTTP transport failure (no response received)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// `ping` exited unsuccessfully or could not be spawned
    #[error("Ping failed: {0}")]
    PingFailed(String),

    /// Any other resolver failure
    #[error("Resolver error: {0}")]
    ResolverError(String),
}

impl ProbeError {
    /// Whether the failure is an expected outcome (bad input, negative answer)
    /// rather than an infrastructure problem.
    ///
    /// Use `warn` for `true` and `error` for `false` when logging.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::InvalidAddress(_)
                | Self::UnsupportedQueryType(_)
                | Self::NoAnswer { .. }
                | Self::NameNotFound(_)
                | Self::Overflow(_)
                | Self::InvalidUrl(_)
        )
    }
}

/// Probe Result type alias
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
