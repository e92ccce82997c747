//! Shared relay state and the run-mode supervisor.
//!
//! [`Relay`] ties the config store, the forwarder and the counters
//! together. [`Relay::run`] picks the source for the configured output mode
//! and drives it until the shutdown channel fires, then closes every
//! endpoint connection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::{interval_at, Interval, MissedTickBehavior};

use crate::config::model::OutputMode;
use crate::config::ConfigStore;
use crate::convert;
use crate::filter;
use crate::forward::Forwarder;
use crate::server::{self, HttpClient};
use crate::source;

/// Interval between config reloads, in every mode.
pub const RELOAD_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct Stats {
    /// Records read from the decoder, accepted or not.
    pub received: AtomicU64,
    /// Records that passed the filter and were handed to the forwarder.
    pub forwarded: AtomicU64,
    pub filtered: AtomicU64,
    pub send_failures: AtomicU64,
    /// Messages dropped because an endpoint's queue was full.
    pub dropped: AtomicU64,
    pub reconnects: AtomicU64,
    pub config_reloads: AtomicU64,
    pub source_connected: AtomicBool,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            config_reloads: AtomicU64::new(0),
            source_connected: AtomicBool::new(false),
        }
    }
}

pub struct Relay {
    pub store: Arc<ConfigStore>,
    pub forwarder: Forwarder,
    pub stats: Arc<Stats>,
    pub http_client: HttpClient,
    pub start_time: Instant,
}

impl Relay {
    #[must_use]
    pub fn new(store: ConfigStore) -> Self {
        let stats = Arc::new(Stats::new());
        Self {
            store: Arc::new(store),
            forwarder: Forwarder::new(Arc::clone(&stats)),
            stats,
            http_client: server::build_http_client(),
            start_time: Instant::now(),
        }
    }

    /// Run the source for the configured output mode until `shutdown`
    /// fires, then close every endpoint.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let mode = self.store.output();
        tracing::info!(
            mode = %mode,
            endpoints = self.store.snapshot().endpoints.len(),
            "relay starting"
        );

        match mode {
            OutputMode::Sbs1 => source::stream::run(self, shutdown).await,
            OutputMode::Json | OutputMode::JsonToSbs1 => source::poll::run(self, shutdown).await,
        }

        self.stats.source_connected.store(false, Ordering::Relaxed);
        let snapshot = self.store.snapshot();
        self.forwarder.close_all(&snapshot.endpoints).await;
        tracing::info!("relay stopped");
    }

    /// Dial every configured endpoint without a live connection.
    pub async fn connect_endpoints(&self) -> usize {
        let snapshot = self.store.snapshot();
        let connected = self.forwarder.connect_all(&snapshot.endpoints).await;
        tracing::info!(
            connected,
            configured = snapshot.endpoints.len(),
            "endpoint connections established"
        );
        connected
    }

    /// Reload the config. A failed reload keeps the current snapshot.
    pub async fn reload(&self) {
        match self.store.reload().await {
            Ok(outcome) if outcome.changed => {
                self.stats.config_reloads.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    version = %self.store.snapshot().version.short(),
                    added = ?outcome.added,
                    removed = ?outcome.removed,
                    kept = outcome.kept,
                    "config reloaded"
                );
            }
            Ok(_) => tracing::debug!("config unchanged"),
            Err(e) => tracing::error!(error = %e, "config reload failed, keeping current config"),
        }
        self.connect_endpoints().await;
    }

    /// Filter one SBS-1 line and forward it if accepted.
    pub fn relay_line(&self, line: &str) -> bool {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.store.snapshot();
        if !filter::accepts_line(&snapshot.filter, line) {
            self.stats.filtered.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let message = Bytes::from(format!("{line}\n"));
        self.forwarder.forward(&snapshot.endpoints, &message);
        self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Filter one polled batch and forward the accepted records in
    /// `mode`'s wire form. Returns the number forwarded.
    pub fn relay_aircraft(&self, aircraft: &[Value], mode: OutputMode) -> usize {
        let snapshot = self.store.snapshot();
        let mut forwarded = 0;
        for value in aircraft {
            self.stats.received.fetch_add(1, Ordering::Relaxed);
            let Some(record) = filter::admit_value(&snapshot.filter, value) else {
                self.stats.filtered.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            let message = match mode {
                OutputMode::JsonToSbs1 => convert::to_sbs1(&record),
                OutputMode::Json | OutputMode::Sbs1 => match serde_json::to_string(value) {
                    Ok(json) => json + "\n",
                    Err(e) => {
                        tracing::debug!(error = %e, "record could not be encoded");
                        continue;
                    }
                },
            };
            self.forwarder
                .forward(&snapshot.endpoints, &Bytes::from(message));
            self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            forwarded += 1;
        }
        forwarded
    }
}

/// Reload ticker whose first tick is one full interval away.
#[must_use]
pub fn reload_interval() -> Interval {
    let mut interval = interval_at(tokio::time::Instant::now() + RELOAD_INTERVAL, RELOAD_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Wait for `duration`, reloading on each tick that falls inside it.
/// Returns `true` when shutdown was requested.
pub async fn pause(
    relay: &Relay,
    duration: Duration,
    reload: &mut Interval,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let sleep = tokio::time::sleep(duration);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return false,
            _ = reload.tick() => relay.reload().await,
            _ = shutdown.changed() => return true,
        }
    }
}
