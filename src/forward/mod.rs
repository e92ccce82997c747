//! Fan-out of accepted messages to downstream TCP endpoints.
//!
//! A [`Forwarder`] holds no endpoint list of its own: every call receives
//! the endpoints of the current config snapshot. [`Forwarder::forward`]
//! only queues; each endpoint's writer task does the socket I/O, so a slow
//! endpoint never holds up the others or the source read. A failed write
//! clears that endpoint's slot and spawns a detached reconnect task for it
//! alone. Messages for a disconnected endpoint are not queued.

pub mod endpoint;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;

pub use endpoint::{ConnectOutcome, ConnectionSlot, Endpoint, SendOutcome, QUEUE_DEPTH};

use crate::error::ConnectError;
use crate::relay::Stats;

#[derive(Debug, Clone)]
pub struct Forwarder {
    stats: Arc<Stats>,
}

impl Forwarder {
    #[must_use]
    pub fn new(stats: Arc<Stats>) -> Self {
        Self { stats }
    }

    /// Dial every endpoint that has no live connection. Returns the number
    /// of endpoints connected once the pass completes.
    pub async fn connect_all(&self, endpoints: &[Endpoint]) -> usize {
        let mut tasks = JoinSet::new();
        for endpoint in endpoints {
            if endpoint.slot.is_connected() {
                continue;
            }
            let endpoint = endpoint.clone();
            let stats = Arc::clone(&self.stats);
            tasks.spawn(async move {
                match dial(&endpoint, &stats).await {
                    Ok(ConnectOutcome::Connected) => {
                        tracing::info!(endpoint = %endpoint.display_name(), "connected to endpoint");
                    }
                    Ok(outcome) => {
                        tracing::debug!(endpoint = %endpoint.display_name(), ?outcome, "connect skipped");
                    }
                    Err(e) => {
                        tracing::warn!(
                            endpoint = %endpoint.display_name(),
                            error = %e,
                            "failed to connect to endpoint"
                        );
                    }
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "endpoint connect task failed");
            }
        }

        endpoints.iter().filter(|e| e.slot.is_connected()).count()
    }

    /// Queue `message` for every connected endpoint without waiting on any
    /// of them. Returns how many endpoints accepted it.
    pub fn forward(&self, endpoints: &[Endpoint], message: &Bytes) -> usize {
        let mut queued = 0;
        for endpoint in endpoints {
            match endpoint.slot.send(message.clone()) {
                SendOutcome::Queued => queued += 1,
                SendOutcome::NotConnected => {}
                SendOutcome::QueueFull => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(endpoint = %endpoint.display_name(), "endpoint queue full, message dropped");
                }
            }
        }
        queued
    }

    /// Close every endpoint connection, waiting for queued messages to
    /// drain.
    pub async fn close_all(&self, endpoints: &[Endpoint]) {
        for endpoint in endpoints {
            endpoint.slot.close().await;
        }
        tracing::debug!(endpoints = endpoints.len(), "endpoint connections closed");
    }
}

/// Dial `endpoint`, arranging a background reconnect if its writer later
/// fails.
async fn dial(endpoint: &Endpoint, stats: &Arc<Stats>) -> Result<ConnectOutcome, ConnectError> {
    let failed = endpoint.clone();
    let stats = Arc::clone(stats);
    endpoint
        .connect(move |error| {
            stats.send_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                endpoint = %failed.display_name(),
                error = %error,
                "send failed, reconnecting in background"
            );
            spawn_reconnect(failed, stats);
        })
        .await
}

/// One detached reconnect attempt. Not cancelled at shutdown; a retired
/// slot drops whatever this task manages to open.
fn spawn_reconnect(endpoint: Endpoint, stats: Arc<Stats>) {
    tokio::spawn(async move {
        match dial(&endpoint, &stats).await {
            Ok(ConnectOutcome::Connected) => {
                stats.reconnects.fetch_add(1, Ordering::Relaxed);
                tracing::info!(endpoint = %endpoint.display_name(), "reconnected to endpoint");
            }
            Ok(outcome) => {
                tracing::debug!(endpoint = %endpoint.display_name(), ?outcome, "reconnect skipped");
            }
            Err(e) => {
                tracing::debug!(
                    endpoint = %endpoint.display_name(),
                    error = %e,
                    "reconnect failed"
                );
            }
        }
    });
}
