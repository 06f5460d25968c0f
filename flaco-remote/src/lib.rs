//! Remote command execution for flaco
//!
//! [`RemoteSession`] runs commands on one host over SSH and records them in a
//! [`Transcript`]; [`Dispatcher`] runs a [`Job`] across a device list and
//! appends every host's transcript to the job file.
//!
//! The wire is behind the [`Transport`] trait, with [`SshTransport`] as the
//! production implementation.

pub mod adapters;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_mocks;

pub use adapters::{SshConnection, SshTransport};
pub use error::{RemoteError, RemoteResult};
pub use services::{Dispatcher, Interrupt, RemoteSession};
pub use traits::{Connection, Transport};
pub use types::{
    Credentials, DEFAULT_COMMAND_INTERVAL, DEFAULT_SSH_PORT, DispatchReport, HostOutcome, Job,
    SessionOptions, SessionState, Transcript, TranscriptEntry,
};
