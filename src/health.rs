//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] with the relay version, uptime, output
//! mode, config metadata, per-endpoint connection state, and cumulative
//! counters.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::relay::Relay;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub output: String,
    pub source_connected: bool,
    pub config: ConfigHealth,
    pub endpoints: Vec<EndpointHealth>,
    pub stats: StatsResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub loaded_ago_seconds: u64,
    pub filter_mode: String,
    pub allowlist: usize,
    pub max_altitude: Option<i64>,
    pub warnings: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointHealth {
    pub name: String,
    pub address: String,
    pub connected: bool,
    pub dials: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub received: u64,
    pub forwarded: u64,
    pub filtered: u64,
    pub send_failures: u64,
    pub dropped: u64,
    pub reconnects: u64,
    pub config_reloads: u64,
}

pub async fn health_handler(State(relay): State<Arc<Relay>>) -> Json<HealthResponse> {
    let snapshot = relay.store.snapshot();
    let stats = &relay.stats;

    let endpoints = snapshot
        .endpoints
        .iter()
        .map(|e| EndpointHealth {
            name: e.settings.name.clone(),
            address: e.key(),
            connected: e.slot.is_connected(),
            dials: e.slot.dials(),
        })
        .collect();

    let altitude = &snapshot.filter.altitude;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: relay.start_time.elapsed().as_secs(),
        output: snapshot.output.to_string(),
        source_connected: stats.source_connected.load(Ordering::Relaxed),
        config: ConfigHealth {
            source: relay.store.source_name().to_string(),
            version: snapshot.version.short().to_string(),
            loaded_ago_seconds: snapshot.loaded_at.elapsed().as_secs(),
            filter_mode: snapshot.filter.mode.as_str().to_string(),
            allowlist: snapshot.filter.allow.len(),
            max_altitude: altitude.enabled.then_some(altitude.ceiling),
            warnings: snapshot.warnings.len(),
        },
        endpoints,
        stats: StatsResponse {
            received: stats.received.load(Ordering::Relaxed),
            forwarded: stats.forwarded.load(Ordering::Relaxed),
            filtered: stats.filtered.load(Ordering::Relaxed),
            send_failures: stats.send_failures.load(Ordering::Relaxed),
            dropped: stats.dropped.load(Ordering::Relaxed),
            reconnects: stats.reconnects.load(Ordering::Relaxed),
            config_reloads: stats.config_reloads.load(Ordering::Relaxed),
        },
    })
}
