//! Snapshot store with endpoint-preserving reloads.
//!
//! [`ConfigStore`] publishes immutable [`ServerConfig`] snapshots through an
//! `ArcSwap`. A reload builds a complete new snapshot and swaps it in one
//! step; readers holding the previous `Arc` keep a consistent view.
//! Endpoints whose `host:port` key survives a reload keep their connection
//! slot; removed endpoints are closed; new ones start disconnected.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;

use super::model::{ConfigWarning, DecoderSettings, EndpointSettings, FilterConfig, OutputMode};
use super::source::{ConfigSource, Loaded};
use super::ConfigVersion;
use crate::error::RelayError;
use crate::forward::Endpoint;

/// One consistent view of the configuration plus live endpoint slots.
#[derive(Debug)]
pub struct ServerConfig {
    pub decoder: DecoderSettings,
    pub output: OutputMode,
    pub filter: FilterConfig,
    pub endpoints: Vec<Endpoint>,
    pub warnings: Vec<ConfigWarning>,
    pub version: ConfigVersion,
    pub loaded_at: Instant,
}

impl ServerConfig {
    fn build(loaded: Loaded, output: OutputMode, endpoints: Vec<Endpoint>) -> Self {
        Self {
            decoder: loaded.settings.decoder,
            output,
            filter: loaded.settings.filter,
            endpoints,
            warnings: loaded.warnings,
            version: loaded.version,
            loaded_at: Instant::now(),
        }
    }
}

/// What a reload changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReloadOutcome {
    /// Whether the source content differs from the previous snapshot.
    pub changed: bool,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub kept: usize,
}

/// Result of merging a new endpoint list against the live one.
#[derive(Debug)]
pub struct EndpointMerge {
    pub endpoints: Vec<Endpoint>,
    pub added: Vec<String>,
    pub removed: Vec<Endpoint>,
}

/// Carry slots forward by key. Removed endpoints are returned, not closed.
#[must_use]
pub fn merge_endpoints(previous: &[Endpoint], next: Vec<EndpointSettings>) -> EndpointMerge {
    let mut old: HashMap<String, &Endpoint> = previous.iter().map(|e| (e.key(), e)).collect();
    let mut added = Vec::new();

    let endpoints: Vec<Endpoint> = next
        .into_iter()
        .map(|settings| match old.remove(&settings.key()) {
            Some(existing) => Endpoint {
                settings,
                slot: Arc::clone(&existing.slot),
            },
            None => {
                added.push(settings.key());
                Endpoint::new(settings)
            }
        })
        .collect();

    // Keep config order for the removed list so logs read naturally
    let removed = previous
        .iter()
        .filter(|e| old.contains_key(&e.key()))
        .cloned()
        .collect();

    EndpointMerge {
        endpoints,
        added,
        removed,
    }
}

pub struct ConfigStore {
    source: Box<dyn ConfigSource>,
    current: ArcSwap<ServerConfig>,
    /// Output mode chosen at startup; reloads cannot change it.
    output: OutputMode,
    reload_lock: Mutex<()>,
}

impl ConfigStore {
    /// Build the first snapshot from an already loaded source.
    #[must_use]
    pub fn new(source: Box<dyn ConfigSource>, loaded: Loaded) -> Self {
        let output = loaded.settings.output;
        let endpoints = loaded
            .settings
            .endpoints
            .iter()
            .cloned()
            .map(Endpoint::new)
            .collect();
        let snapshot = ServerConfig::build(loaded, output, endpoints);
        Self {
            source,
            current: ArcSwap::from_pointee(snapshot),
            output,
            reload_lock: Mutex::new(()),
        }
    }

    /// Load the source once and build the store from it.
    pub async fn open(source: Box<dyn ConfigSource>) -> Result<Self, RelayError> {
        let loaded = source.load().await?;
        Ok(Self::new(source, loaded))
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<ServerConfig> {
        self.current.load_full()
    }

    #[must_use]
    pub const fn output(&self) -> OutputMode {
        self.output
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Re-read the source and publish a merged snapshot. On error the
    /// current snapshot stays in place.
    pub async fn reload(&self) -> Result<ReloadOutcome, RelayError> {
        let _guard = self.reload_lock.lock().await;
        let loaded = self.source.load().await?;
        Ok(self.apply(loaded))
    }

    /// Publish `loaded` as the next snapshot.
    fn apply(&self, mut loaded: Loaded) -> ReloadOutcome {
        let previous = self.current.load_full();
        let changed = loaded.version != previous.version;

        if loaded.settings.output != self.output {
            tracing::warn!(
                running = %self.output,
                configured = %loaded.settings.output,
                "output format changed in config; restart to apply"
            );
        }

        let next: Vec<EndpointSettings> = std::mem::take(&mut loaded.settings.endpoints);
        let merge = merge_endpoints(&previous.endpoints, next);
        let kept = merge.endpoints.len() - merge.added.len();

        let snapshot = ServerConfig::build(loaded, self.output, merge.endpoints);
        self.current.store(Arc::new(snapshot));

        let mut removed = Vec::with_capacity(merge.removed.len());
        for endpoint in merge.removed {
            if endpoint.slot.retire() {
                tracing::info!(endpoint = %endpoint.display_name(), "closed connection to removed endpoint");
            }
            removed.push(endpoint.key());
        }

        ReloadOutcome {
            changed,
            added: merge.added,
            removed,
            kept,
        }
    }
}
