//! Key-expiry listener
//!
//! Turns Redis expiry notifications into transfer passes.

use std::sync::Arc;

use relay_cache::ExpiredKey;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::services::{MessagingService, ServiceContext};

/// Runs a transfer pass whenever a staged message key expires
///
/// Expired keys are gone by the time the notification arrives, so an event is
/// only a trigger: each one starts a full re-scan of the staging store. Events
/// that pile up while a pass runs are folded into the next pass.
pub struct ExpiryListener {
    ctx: Arc<ServiceContext>,
    events: broadcast::Receiver<ExpiredKey>,
}

impl ExpiryListener {
    pub fn new(ctx: Arc<ServiceContext>, events: broadcast::Receiver<ExpiredKey>) -> Self {
        Self { ctx, events }
    }

    /// Run the listener on its own task
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Consume expiry events until cancelled or the event feed closes
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Expiry listener started");

        loop {
            let event = tokio::select! {
                () = shutdown.cancelled() => break,
                event = self.events.recv() => event,
            };

            match event {
                Ok(key) if key.is_message_key() => {
                    debug!(key = key.as_str(), "Staged message expired");
                    if !self.drain_pending() {
                        self.transfer().await;
                        break;
                    }
                    self.transfer().await;
                }
                Ok(key) => trace!(key = key.as_str(), "Ignoring unrelated expiry"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Expiry listener fell behind, re-scanning");
                    self.drain_pending();
                    self.transfer().await;
                }
                Err(RecvError::Closed) => {
                    warn!("Expiry event feed closed");
                    break;
                }
            }
        }

        info!("Expiry listener stopped");
    }

    /// Discard queued events; returns `false` once the feed has closed
    fn drain_pending(&mut self) -> bool {
        loop {
            match self.events.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Closed) => return false,
            }
        }
    }

    async fn transfer(&self) {
        if let Err(e) = MessagingService::new(&self.ctx)
            .transfer_expired_messages()
            .await
        {
            error!(error = %e, "Expiry-triggered transfer failed");
        }
    }
}
