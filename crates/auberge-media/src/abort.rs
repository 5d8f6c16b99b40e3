//! Cancellation of an in-progress extraction.
//!
//! The owner of an upload keeps the [`AbortController`]; the extractor
//! watches the matching [`AbortSignal`] between and during every seek,
//! capture and retry delay.

use tokio::sync::watch;

pub struct AbortController {
    tx: watch::Sender<bool>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `abort()` is called. Pends forever if the controller
    /// is dropped without aborting.
    pub async fn aborted(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_abort_wakes_waiter() {
        let controller = AbortController::new();
        let mut signal = controller.signal();
        assert!(!signal.is_aborted());

        let waiter = tokio::spawn(async move {
            signal.aborted().await;
            signal.is_aborted()
        });
        controller.abort();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_pends() {
        let mut signal = AbortSignal::never();
        let fired = tokio::time::timeout(Duration::from_secs(60), signal.aborted()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn test_abort_before_subscribe_is_seen() {
        let controller = AbortController::new();
        controller.abort();
        let mut signal = controller.signal();
        assert!(signal.is_aborted());
        signal.aborted().await;
    }
}
