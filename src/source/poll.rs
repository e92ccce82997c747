//! JSON polling mode.
//!
//! Fetches dump1090's `aircraft.json` once a second. A failed fetch counts
//! as an empty aircraft list for that cycle; the loop itself never stops
//! until shutdown.

use std::time::{Duration, Instant};

use http_body_util::BodyExt;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::SourceError;
use crate::record::AircraftFeed;
use crate::relay::{reload_interval, Relay};
use crate::server::HttpClient;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Minimum spacing between forwarding summaries.
pub const SUMMARY_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run(relay: &Relay, mut shutdown: watch::Receiver<bool>) {
    let mode = relay.store.output();
    tracing::info!(url = %relay.store.snapshot().decoder.json_url(), mode = %mode, "polling decoder JSON");
    relay.connect_endpoints().await;

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reload = reload_interval();
    let mut health = FetchHealth::default();
    let mut summary = Summary::new(Instant::now());

    loop {
        tokio::select! {
            _ = poll.tick() => {}
            _ = reload.tick() => {
                relay.reload().await;
                continue;
            }
            _ = shutdown.changed() => return,
        }

        let url = relay.store.snapshot().decoder.json_url();
        let aircraft = match fetch_aircraft(&relay.http_client, &url).await {
            Ok(feed) => {
                health.success(&url, feed.aircraft.len());
                feed.aircraft
            }
            Err(e) => {
                health.failure(&e);
                Vec::new()
            }
        };

        let forwarded = relay.relay_aircraft(&aircraft, mode);
        if let Some(report) = summary.record(aircraft.len(), forwarded, Instant::now()) {
            tracing::info!(
                seen = report.seen,
                forwarded = report.forwarded,
                total_forwarded = report.total_forwarded,
                "forwarding summary"
            );
        }
    }
}

/// GET and decode one aircraft document, bounded by [`FETCH_TIMEOUT`].
pub async fn fetch_aircraft(client: &HttpClient, url: &str) -> Result<AircraftFeed, SourceError> {
    let http_err = |e: Box<dyn std::error::Error + Send + Sync>| SourceError::Http {
        url: url.to_string(),
        source: e,
    };

    let uri = url.parse::<hyper::Uri>().map_err(|e| http_err(Box::new(e)))?;
    let req = hyper::Request::builder()
        .uri(uri)
        .body(http_body_util::Full::new(bytes::Bytes::new()))
        .map_err(|e| http_err(Box::new(e)))?;

    let fetch = async {
        let response = client.request(req).await.map_err(|e| http_err(Box::new(e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| http_err(Box::new(e)))?
            .to_bytes();
        Ok(serde_json::from_slice::<AircraftFeed>(&body)?)
    };

    tokio::time::timeout(FETCH_TIMEOUT, fetch)
        .await
        .map_err(|_| SourceError::HttpTimeout {
            url: url.to_string(),
        })?
}

/// Log-once state for the polled source.
#[derive(Debug, Default)]
struct FetchHealth {
    reachable: Option<bool>,
}

impl FetchHealth {
    fn success(&mut self, url: &str, count: usize) {
        if self.reachable != Some(true) {
            tracing::info!(url = %url, aircraft = count, "decoder JSON reachable");
        }
        self.reachable = Some(true);
    }

    fn failure(&mut self, error: &SourceError) {
        if self.reachable == Some(false) {
            tracing::debug!(error = %error, "decoder JSON fetch failed");
        } else {
            tracing::warn!(error = %error, "decoder JSON unavailable, treating as no aircraft");
        }
        self.reachable = Some(false);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryReport {
    pub seen: u64,
    pub forwarded: u64,
    pub total_forwarded: u64,
}

/// Counters for the periodic forwarding summary. `seen` and `forwarded`
/// cover the span since the last report.
#[derive(Debug)]
pub struct Summary {
    seen: u64,
    forwarded: u64,
    total_forwarded: u64,
    last_report: Instant,
}

impl Summary {
    #[must_use]
    pub const fn new(now: Instant) -> Self {
        Self {
            seen: 0,
            forwarded: 0,
            total_forwarded: 0,
            last_report: now,
        }
    }

    /// Add one cycle's counts; returns a report when one is due.
    pub fn record(&mut self, seen: usize, forwarded: usize, now: Instant) -> Option<SummaryReport> {
        self.seen += seen as u64;
        self.forwarded += forwarded as u64;
        self.total_forwarded += forwarded as u64;

        if now.duration_since(self.last_report) < SUMMARY_INTERVAL {
            return None;
        }
        let report = SummaryReport {
            seen: self.seen,
            forwarded: self.forwarded,
            total_forwarded: self.total_forwarded,
        };
        self.seen = 0;
        self.forwarded = 0;
        self.last_report = now;
        Some(report)
    }
}
