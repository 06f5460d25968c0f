//! Transport abstraction trait definition

mod transport;

pub use transport::{Connection, Transport};
