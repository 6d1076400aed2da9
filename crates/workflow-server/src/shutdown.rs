//! Stopping the server: one token shared by the listener and every SSE
//! stream, and a bounded wait for the serve task.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long [`Shutdown::drain`] waits for in-flight requests.
const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Stop signal for a running [`crate::WorkflowServer`].
#[derive(Debug, Clone)]
pub struct Shutdown {
    token: CancellationToken,
    grace: Duration,
}

impl Shutdown {
    /// A handle that waits at most `grace` when draining.
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace,
        }
    }

    /// Token cancelled when shutdown starts.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether shutdown has started.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token and wait for `server` to stop.
    ///
    /// Returns `false` if the serve task failed or outlived the grace period.
    pub async fn drain(&self, server: JoinHandle<()>) -> bool {
        self.token.cancel();
        match tokio::time::timeout(self.grace, server).await {
            Ok(Ok(())) => {
                info!("server drained");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "server task failed during shutdown");
                false
            }
            Err(_) => {
                warn!(grace_ms = self.grace.as_millis(), "server did not drain in time");
                false
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::with_grace(DEFAULT_GRACE)
    }
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => info!("received Ctrl-C"),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler, waiting for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
