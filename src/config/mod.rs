//! Configuration loading and hot-reloading.
//!
//! The file is INI, laid out the way the external configuration editor
//! writes it. [`source`] reads it, [`parser`] maps keys onto the
//! [`model`], [`writer`] renders it back, and [`store`] publishes atomic
//! snapshots that keep endpoint connections alive across reloads.

pub mod model;
pub mod parser;
pub mod source;
pub mod store;
pub mod writer;

use std::path::PathBuf;

pub use source::{ConfigSource, IniFileSource, Loaded};
pub use store::{ConfigStore, ReloadOutcome, ServerConfig};

use crate::error::RelayError;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "adsb_server_config.conf";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl ConfigVersion {
    /// First eight hex digits, for logs and the status endpoint.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

#[must_use]
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Startup load: create the file when absent, and replace it with the
/// starter config when it cannot be parsed at all.
pub async fn load_startup(source: &IniFileSource) -> Result<Loaded, RelayError> {
    source.ensure_exists().await?;
    match source.load().await {
        Ok(loaded) => Ok(loaded),
        Err(RelayError::ConfigParse { path, source: e }) => {
            tracing::error!(path = %path, error = %e, "config file could not be parsed");
            source.reset_to_default().await?;
            source.load().await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::OutputMode;

    #[tokio::test]
    async fn startup_replaces_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adsb.conf");
        std::fs::write(&path, "[Output\nformat\n").unwrap();

        let loaded = load_startup(&IniFileSource::new(&path)).await.unwrap();
        assert_eq!(loaded.settings.output, OutputMode::Sbs1);
        assert!(dir.path().join("adsb.conf.bak").exists());
    }

    #[tokio::test]
    async fn startup_keeps_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adsb.conf");
        std::fs::write(&path, "[Output]\nformat = json\n").unwrap();

        let loaded = load_startup(&IniFileSource::new(&path)).await.unwrap();
        assert_eq!(loaded.settings.output, OutputMode::Json);
        assert!(!dir.path().join("adsb.conf.bak").exists());
    }

    #[test]
    fn short_version() {
        let v = ConfigVersion::Hash("0123456789abcdef".into());
        assert_eq!(v.short(), "01234567");
    }
}
