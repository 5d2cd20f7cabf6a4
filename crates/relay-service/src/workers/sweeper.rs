//! Periodic expiry sweep
//!
//! The backstop for the key-expiry listener: every interval, one transfer pass
//! over the whole staging store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::services::{MessagingService, ServiceContext};

/// Periodically moves aged messages from staging to the archive
pub struct ExpirySweeper {
    ctx: Arc<ServiceContext>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(ctx: Arc<ServiceContext>, interval: Duration) -> Self {
        Self { ctx, interval }
    }

    /// Run the sweep loop on its own task
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Sweep every interval until cancelled
    ///
    /// The first sweep happens one full interval after start. A failed sweep is
    /// logged and the schedule carries on.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = self.interval.as_secs(), "Expiry sweeper started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => self.sweep_once().await,
            }
        }

        info!("Expiry sweeper stopped");
    }

    async fn sweep_once(&self) {
        if let Err(e) = MessagingService::new(&self.ctx)
            .transfer_expired_messages()
            .await
        {
            error!(error = %e, "Expiry sweep failed");
        }
    }
}
