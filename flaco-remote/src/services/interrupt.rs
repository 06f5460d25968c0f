//! Operator interrupt shared by a session or a whole dispatch run.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::watch;

/// Latching interrupt flag.
///
/// Once triggered it stays triggered, so a Ctrl-C that arrives between two
/// awaited operations is still seen by the next one. Clones share the flag.
#[derive(Debug, Clone)]
pub struct Interrupt {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    /// A flag only set through [`trigger`](Self::trigger).
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// A flag set by Ctrl-C (SIGINT on Unix).
    ///
    /// The OS handler is installed before this returns and stays installed
    /// until every clone is dropped. Must be called inside a tokio runtime.
    pub fn ctrl_c() -> std::io::Result<Self> {
        let interrupt = Self::new();
        let sender = Arc::clone(&interrupt.sender);

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigint = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = sender.closed() => break,
                        received = sigint.recv() => {
                            if received.is_none() {
                                break;
                            }
                            warn!("[SSH] Interrupt received");
                            sender.send_replace(true);
                        }
                    }
                }
                debug!("[SSH] Interrupt listener stopped");
            });
        }

        #[cfg(not(unix))]
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = sender.closed() => break,
                    received = tokio::signal::ctrl_c() => {
                        if received.is_err() {
                            break;
                        }
                        warn!("[SSH] Interrupt received");
                        sender.send_replace(true);
                    }
                }
            }
            debug!("[SSH] Interrupt listener stopped");
        });

        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the flag is set; immediately if it already is.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|&set| set).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
