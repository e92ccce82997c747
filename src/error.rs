//! Error types for adsb-relay.
//!
//! [`RelayError`] covers command-level failures (config files, the status
//! endpoint, health checks). The remaining enums classify failures of a
//! single operation so the main loops can log and retry them without
//! collapsing every category into one catch-all.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to write config file {}: {source}", path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config has {count} warnings")]
    ConfigWarnings { count: usize },

    #[error("File already exists: {} (use --force to overwrite)", path.display())]
    FileExists { path: PathBuf },

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Failure talking to the decoder, in either stream or polling mode.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("connect to {addr} timed out after {secs}s")]
    ConnectTimeout { addr: String, secs: u64 },

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decoder closed the connection")]
    Closed,

    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("request to {url} timed out")]
    HttpTimeout { url: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid aircraft document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure delivering one message to one endpoint.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("send timed out")]
    Timeout,

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Failure connecting to one endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// A record the filter could not evaluate. Always treated as a reject.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FilterError {
    #[error("line has {fields} fields, identity code needs at least 5")]
    ShortLine { fields: usize },

    #[error("record could not be decoded: {0}")]
    Record(String),
}
