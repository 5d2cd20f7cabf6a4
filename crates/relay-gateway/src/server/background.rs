//! Archival workers running beside the gateway

use relay_cache::ExpiredKey;
use relay_service::{ExpiryListener, ExpirySweeper, ServiceContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Running sweeper and (optionally) expiry listener
pub struct BackgroundTasks {
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Start the sweeper, and the expiry listener when an event feed is available
    ///
    /// Without a feed, archival relies on the sweeper alone.
    pub fn start(
        ctx: Arc<ServiceContext>,
        sweep_interval: Duration,
        expiry_events: Option<broadcast::Receiver<ExpiredKey>>,
        shutdown: CancellationToken,
    ) -> Self {
        let mut handles =
            vec![ExpirySweeper::new(ctx.clone(), sweep_interval).spawn(shutdown.clone())];

        match expiry_events {
            Some(events) => {
                handles.push(ExpiryListener::new(ctx, events).spawn(shutdown.clone()));
            }
            None => tracing::warn!("Expiry listener not running; archival is sweep-only"),
        }

        Self { shutdown, handles }
    }

    /// Number of running workers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every worker and wait for them to finish
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Background task ended abnormally");
            }
        }
        tracing::info!("Background tasks stopped");
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("tasks", &self.handles.len())
            .field("cancelled", &self.shutdown.is_cancelled())
            .finish()
    }
}
