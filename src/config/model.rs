//! Parsed configuration settings.
//!
//! [`Settings`] is the plain-data form of the INI file: decoder address,
//! output mode, filter rules and the endpoint list. It carries no live
//! connection state; [`super::store`] attaches that when it builds a
//! [`ServerConfig`](super::store::ServerConfig) snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub const DEFAULT_DECODER_HOST: &str = "127.0.0.1";
pub const DEFAULT_STREAM_PORT: u16 = 30003;
pub const DEFAULT_JSON_PORT: u16 = 8080;
pub const DEFAULT_MAX_ALTITUDE: i64 = 10_000;

/// Allow-list written into a freshly created config file.
pub const EXAMPLE_ICAO_LIST: &[&str] = &["A92F2D", "A932E4", "A9369B", "A93A52"];

/// Path of the aircraft document served by dump1090's web interface.
pub const AIRCRAFT_JSON_PATH: &str = "/data/aircraft.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Relay the decoder's SBS-1 stream line by line.
    Sbs1,
    /// Poll the JSON interface and relay each aircraft object.
    Json,
    /// Poll the JSON interface and relay each aircraft as an SBS-1 line.
    JsonToSbs1,
}

impl OutputMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sbs1 => "sbs1",
            Self::Json => "json",
            Self::JsonToSbs1 => "json_to_sbs1",
        }
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Sbs1
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sbs1" => Ok(Self::Sbs1),
            "json" => Ok(Self::Json),
            "json_to_sbs1" => Ok(Self::JsonToSbs1),
            other => Err(format!(
                "unknown output format '{other}' (expected sbs1, json or json_to_sbs1)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Forward every aircraft that passes the altitude stage.
    All,
    /// Forward only aircraft whose ICAO address is in the allow-list.
    Allowlist,
}

impl FilterMode {
    /// Value written to the `mode` key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Allowlist => "specific",
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "specific" | "allowlist" => Ok(Self::Allowlist),
            other => Err(format!(
                "unknown filter mode '{other}' (expected all or specific)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AltitudeFilter {
    pub enabled: bool,
    /// Highest altitude in feet that is still forwarded.
    pub ceiling: i64,
}

impl Default for AltitudeFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            ceiling: DEFAULT_MAX_ALTITUDE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterConfig {
    pub mode: FilterMode,
    /// Uppercase ICAO addresses. Only consulted in [`FilterMode::Allowlist`].
    pub allow: BTreeSet<String>,
    pub altitude: AltitudeFilter,
}

impl FilterConfig {
    /// Accept everything, altitude filter off.
    #[must_use]
    pub fn all() -> Self {
        Self {
            mode: FilterMode::All,
            allow: BTreeSet::new(),
            altitude: AltitudeFilter::default(),
        }
    }

    #[must_use]
    pub fn allowlist<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            mode: FilterMode::Allowlist,
            allow: parse_icao_list(codes),
            altitude: AltitudeFilter::default(),
        }
    }

    #[must_use]
    pub const fn with_ceiling(mut self, ceiling: i64) -> Self {
        self.altitude = AltitudeFilter {
            enabled: true,
            ceiling,
        };
        self
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::all()
    }
}

/// Normalize ICAO codes: trimmed, uppercased, empties dropped.
pub fn parse_icao_list<I, S>(codes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|c| c.as_ref().trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoderSettings {
    pub host: String,
    pub stream_port: u16,
    pub json_port: u16,
}

impl DecoderSettings {
    #[must_use]
    pub fn stream_addr(&self) -> String {
        format!("{}:{}", self.host, self.stream_port)
    }

    #[must_use]
    pub fn json_url(&self) -> String {
        format!("http://{}:{}{AIRCRAFT_JSON_PATH}", self.host, self.json_port)
    }
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_DECODER_HOST.to_string(),
            stream_port: DEFAULT_STREAM_PORT,
            json_port: DEFAULT_JSON_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSettings {
    /// Display name only; never part of the identity.
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl EndpointSettings {
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// Identity key, `host:port`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub decoder: DecoderSettings,
    pub output: OutputMode,
    pub filter: FilterConfig,
    pub endpoints: Vec<EndpointSettings>,
}

impl Settings {
    /// Contents of a freshly initialized config file.
    #[must_use]
    pub fn starter() -> Self {
        Self {
            filter: FilterConfig::allowlist(EXAMPLE_ICAO_LIST),
            ..Self::default()
        }
    }
}

/// A key that could not be used as written and fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    pub section: String,
    pub key: String,
    pub value: String,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  [{}] {} = '{}': {}",
            self.section, self.key, self.value, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_mode_parses_config_values() {
        assert_eq!("sbs1".parse::<OutputMode>().unwrap(), OutputMode::Sbs1);
        assert_eq!(" JSON ".parse::<OutputMode>().unwrap(), OutputMode::Json);
        assert_eq!(
            "json_to_sbs1".parse::<OutputMode>().unwrap(),
            OutputMode::JsonToSbs1
        );
        assert!("beast".parse::<OutputMode>().is_err());
    }

    #[test]
    fn filter_mode_accepts_specific() {
        assert_eq!("specific".parse::<FilterMode>().unwrap(), FilterMode::Allowlist);
        assert_eq!("All".parse::<FilterMode>().unwrap(), FilterMode::All);
    }

    #[test]
    fn icao_list_is_normalized() {
        let set = parse_icao_list(["a92f2d", " A932E4 ", "", "a92f2d"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("A92F2D"));
        assert!(set.contains("A932E4"));
    }

    #[test]
    fn decoder_urls() {
        let decoder = DecoderSettings::default();
        assert_eq!(decoder.stream_addr(), "127.0.0.1:30003");
        assert_eq!(decoder.json_url(), "http://127.0.0.1:8080/data/aircraft.json");
    }

    #[test]
    fn starter_settings_use_example_allowlist() {
        let settings = Settings::starter();
        assert_eq!(settings.filter.mode, FilterMode::Allowlist);
        assert_eq!(settings.filter.allow.len(), EXAMPLE_ICAO_LIST.len());
        assert!(settings.endpoints.is_empty());
    }
}
