//! Config sources.
//!
//! [`IniFileSource`] reads the INI file written by the configuration
//! editor, creating it with starter settings when it does not exist, and
//! versions each read with a SHA-256 digest of the raw content.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ini::Ini;
use sha2::{Digest, Sha256};

use super::model::{ConfigWarning, Settings};
use super::{parser, writer, ConfigVersion};
use crate::error::RelayError;

/// One successful read of a config source.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub settings: Settings,
    pub warnings: Vec<ConfigWarning>,
    pub version: ConfigVersion,
}

// async_trait keeps ConfigSource usable as Box<dyn ConfigSource>.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &str;
    async fn load(&self) -> Result<Loaded, RelayError>;
}

pub struct IniFileSource {
    path: PathBuf,
}

impl IniFileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write the starter config if no file exists yet. Returns `true` when a
    /// file was created.
    pub async fn ensure_exists(&self) -> Result<bool, RelayError> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(false);
        }
        write_settings(&self.path, &Settings::starter()).await?;
        tracing::info!(path = %self.path.display(), "created default config file");
        Ok(true)
    }

    /// Move an unreadable file aside and replace it with the starter config.
    pub async fn reset_to_default(&self) -> Result<PathBuf, RelayError> {
        let mut backup = self.path.clone().into_os_string();
        backup.push(".bak");
        let backup = PathBuf::from(backup);
        tokio::fs::rename(&self.path, &backup).await?;
        write_settings(&self.path, &Settings::starter()).await?;
        tracing::warn!(
            path = %self.path.display(),
            backup = %backup.display(),
            "config file was unreadable, replaced with defaults"
        );
        Ok(backup)
    }

    async fn read_content(&self) -> Result<String, RelayError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelayError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                RelayError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for IniFileSource {
    fn name(&self) -> &str {
        "ini"
    }

    /// A file deleted since the last load is recreated with the starter
    /// config before reading.
    async fn load(&self) -> Result<Loaded, RelayError> {
        self.ensure_exists().await?;
        let content = self.read_content().await?;
        parse_config_str(&content, &self.path.display().to_string())
    }
}

/// Parse INI text into settings plus a content version.
pub fn parse_config_str(content: &str, path_display: &str) -> Result<Loaded, RelayError> {
    let ini = Ini::load_from_str(content).map_err(|e| RelayError::ConfigParse {
        path: path_display.to_string(),
        source: Box::new(e),
    })?;
    let (settings, warnings) = parser::parse_ini(&ini);
    Ok(Loaded {
        settings,
        warnings,
        version: ConfigVersion::Hash(sha256_hex(content.as_bytes())),
    })
}

pub async fn write_settings(path: &Path, settings: &Settings) -> Result<(), RelayError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| RelayError::ConfigWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, writer::to_config_string(settings))
        .await
        .map_err(|source| RelayError::ConfigWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::FilterMode;

    #[tokio::test]
    async fn missing_file_is_created_with_starter_settings() {
        let dir = tempfile::tempdir().unwrap();
        let source = IniFileSource::new(dir.path().join("conf/adsb.conf"));

        assert!(source.ensure_exists().await.unwrap());
        assert!(!source.ensure_exists().await.unwrap());

        let loaded = source.load().await.unwrap();
        assert_eq!(loaded.settings.filter.mode, FilterMode::Allowlist);
        assert!(loaded.warnings.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_recreated_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.conf");
        let source = IniFileSource::new(&path);

        let loaded = source.load().await.unwrap();
        assert!(path.exists());
        assert_eq!(loaded.settings.filter.mode, FilterMode::Allowlist);
        assert!(loaded.settings.endpoints.is_empty());
    }

    #[tokio::test]
    async fn reset_keeps_a_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adsb.conf");
        std::fs::write(&path, "[Filter\nmode").unwrap();
        let source = IniFileSource::new(&path);

        let backup = source.reset_to_default().await.unwrap();
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "[Filter\nmode");
        assert!(source.load().await.is_ok());
    }

    #[test]
    fn version_tracks_content() {
        let a = parse_config_str("[Output]\nformat=json\n", "a").unwrap();
        let b = parse_config_str("[Output]\nformat=json\n", "b").unwrap();
        let c = parse_config_str("[Output]\nformat=sbs1\n", "c").unwrap();
        assert_eq!(a.version, b.version);
        assert_ne!(a.version, c.version);
    }

    #[test]
    fn unterminated_section_is_a_parse_error() {
        assert!(matches!(
            parse_config_str("[Filter\nmode\n", "bad.conf"),
            Err(RelayError::ConfigParse { .. })
        ));
    }
}
