//! Cancellation signal for an ambient unit of work

use crate::error::{BlockError, Result};
use tokio::sync::watch;

/// Create a linked handle/signal pair
pub fn cancellation() -> (CancellationHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancellationHandle { tx }, Cancellation { rx })
}

/// Owner side: flips the signal
#[derive(Debug)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> Cancellation {
        Cancellation {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer side, polled at evaluation checkpoints
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    /// A signal that is never raised
    pub fn never() -> Self {
        cancellation().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Early-return `Cancelled` when the signal is raised
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BlockError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_reaches_every_signal() {
        let (handle, first) = cancellation();
        let second = handle.signal();
        assert!(first.check().is_ok());

        handle.cancel();
        assert!(first.is_cancelled());
        assert!(matches!(second.check(), Err(BlockError::Cancelled)));
    }

    #[test]
    fn test_never_stays_clear() {
        let signal = Cancellation::never();
        assert!(!signal.is_cancelled());
    }
}
