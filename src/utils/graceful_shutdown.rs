use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{signal, sync::watch};
use tokio_util::sync::CancellationToken;

/// Bounded window for in-flight requests once shutdown begins
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Represents different shutdown reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Requested from inside the process (tests, embedding applications)
    Requested,
}

/// Turns OS signals and in-process requests into a single cancellation token.
///
/// The first trigger wins; later ones are logged and ignored.
#[derive(Debug, Clone)]
pub struct GracefulShutdown {
    token: CancellationToken,
    reason_tx: Arc<watch::Sender<Option<ShutdownReason>>>,
    shutdown_initiated: Arc<AtomicBool>,
    drain_timeout: Duration,
}

impl GracefulShutdown {
    /// Create a new GracefulShutdown manager with the default 30-second drain
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_DRAIN_TIMEOUT)
    }

    /// Create a new GracefulShutdown manager with a custom drain timeout
    pub fn with_timeout(drain_timeout: Duration) -> Self {
        let (reason_tx, _) = watch::channel(None);
        Self {
            token: CancellationToken::new(),
            reason_tx: Arc::new(reason_tx),
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            drain_timeout,
        }
    }

    /// Token cancelled once shutdown begins
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Check if shutdown has been initiated
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Reason recorded by the first trigger, if any
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.reason_tx.borrow()
    }

    /// Manually trigger shutdown
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::info!(reason = ?reason, "Shutdown initiated");
            self.reason_tx.send_replace(Some(reason));
            self.token.cancel();
        } else {
            tracing::warn!(reason = ?reason, "Shutdown already initiated, ignoring trigger");
        }
    }

    /// Listen for SIGINT / SIGTERM and trigger shutdown on the first one.
    ///
    /// Returns early without signalling if shutdown was triggered elsewhere.
    pub async fn run_signal_handler(&self) -> std::io::Result<()> {
        tracing::info!("Signal handler started. Listening for SIGTERM and SIGINT");

        let terminate = wait_for_sigterm();
        tokio::pin!(terminate);

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                self.trigger_shutdown(ShutdownReason::Interrupt);
            }
            result = &mut terminate => {
                result?;
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                self.trigger_shutdown(ShutdownReason::Terminate);
            }
            _ = self.token.cancelled() => {
                tracing::debug!("Shutdown triggered elsewhere, signal handler exiting");
            }
        }

        Ok(())
    }

    /// Wait until shutdown is triggered and return its reason
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        self.token.cancelled().await;
        self.reason().unwrap_or(ShutdownReason::Requested)
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> std::io::Result<()> {
    // On non-Unix systems, we only have Ctrl+C
    std::future::pending::<()>().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_graceful_shutdown_creation() {
        let shutdown = GracefulShutdown::new();
        assert!(!shutdown.is_shutdown_initiated());
        assert!(!shutdown.token().is_cancelled());
        assert_eq!(shutdown.drain_timeout(), Duration::from_secs(30));
        assert_eq!(shutdown.reason(), None);
    }

    #[tokio::test]
    async fn test_manual_trigger_shutdown() {
        let shutdown = GracefulShutdown::new();
        let token = shutdown.token();

        shutdown.trigger_shutdown(ShutdownReason::Terminate);

        assert!(shutdown.is_shutdown_initiated());
        assert!(token.is_cancelled());
        assert_eq!(
            shutdown.wait_for_shutdown_signal().await,
            ShutdownReason::Terminate
        );
    }

    #[tokio::test]
    async fn test_first_trigger_wins() {
        let shutdown = GracefulShutdown::new();

        shutdown.trigger_shutdown(ShutdownReason::Requested);
        shutdown.trigger_shutdown(ShutdownReason::Interrupt);

        assert_eq!(shutdown.reason(), Some(ShutdownReason::Requested));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let shutdown = GracefulShutdown::new();
        let clone = shutdown.clone();

        let waiter = tokio::spawn(async move { clone.wait_for_shutdown_signal().await });
        shutdown.trigger_shutdown(ShutdownReason::Requested);

        assert_eq!(waiter.await.unwrap(), ShutdownReason::Requested);
    }

    #[tokio::test]
    async fn test_signal_handler_exits_when_triggered_elsewhere() {
        let shutdown = GracefulShutdown::new();
        let handler = shutdown.clone();
        let task = tokio::spawn(async move { handler.run_signal_handler().await });

        shutdown.trigger_shutdown(ShutdownReason::Requested);

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("signal handler did not exit");
        assert!(result.unwrap().is_ok());
    }
}
