//! Session and dispatch services

mod dispatcher;
mod interrupt;
mod session;

pub use dispatcher::Dispatcher;
pub use interrupt::Interrupt;
pub use session::RemoteSession;
