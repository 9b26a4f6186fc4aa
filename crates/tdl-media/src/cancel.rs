//! Cancellation signal shared by every stage of a composition.

use tokio::sync::watch;

use crate::error::{MediaError, MediaResult};

/// Read side of a cancellation flag.
///
/// Cheap to clone; every clone observes the same flag. A signal created
/// with [`CancelSignal::never`] is never cancelled.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

impl CancelSignal {
    /// Wrap an existing watch receiver.
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Create a sender/signal pair. Send `true` to cancel.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self::new(rx))
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Fail with [`MediaError::Cancelled`] if the flag is set.
    pub fn check(&self) -> MediaResult<()> {
        if self.is_cancelled() {
            Err(MediaError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolve once the flag is set. Pends forever if it never will be.
    pub async fn cancelled(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };

        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without cancelling
                return std::future::pending().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_never_is_not_cancelled() {
        let signal = CancelSignal::never();
        assert!(!signal.is_cancelled());
        assert!(signal.check().is_ok());
    }

    #[tokio::test]
    async fn test_channel_cancels_all_clones() {
        let (tx, signal) = CancelSignal::channel();
        let mut clone = signal.clone();

        assert!(!signal.is_cancelled());
        tx.send(true).unwrap();

        assert!(signal.is_cancelled());
        assert!(matches!(signal.check(), Err(MediaError::Cancelled)));
        tokio::time::timeout(Duration::from_secs(1), clone.cancelled())
            .await
            .expect("cancelled() should resolve");
    }

    #[tokio::test]
    async fn test_dropped_sender_never_resolves() {
        let (tx, mut signal) = CancelSignal::channel();
        drop(tx);

        let waited = tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(waited.is_err());
    }
}
