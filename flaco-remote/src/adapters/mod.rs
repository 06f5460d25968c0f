//! Concrete transport implementations

mod ssh;

pub use ssh::{SshConnection, SshTransport};
