//! INI parsing: maps `Ini` sections and keys onto [`Settings`].
//!
//! This is the single place where key names are mapped to struct fields.
//! Parsing never fails: a key that is missing keeps its default, and a key
//! that is present but unusable keeps its default and yields a
//! [`ConfigWarning`].

use std::collections::HashSet;

use ini::{Ini, Properties};

use super::model::{
    parse_icao_list, ConfigWarning, EndpointSettings, FilterMode, OutputMode, Settings,
};

pub const SECTION_DECODER: &str = "Dump1090";
pub const SECTION_OUTPUT: &str = "Output";
pub const SECTION_FILTER: &str = "Filter";
pub const SECTION_ENDPOINTS: &str = "Endpoints";

struct Warnings(Vec<ConfigWarning>);

impl Warnings {
    fn push(&mut self, section: &str, key: &str, value: &str, message: impl Into<String>) {
        self.0.push(ConfigWarning {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            message: message.into(),
        });
    }
}

/// Parse an `Ini` object into [`Settings`], starting from the defaults.
pub fn parse_ini(ini: &Ini) -> (Settings, Vec<ConfigWarning>) {
    let mut settings = Settings::default();
    let mut warnings = Warnings(Vec::new());

    if let Some(section) = ini.section(Some(SECTION_DECODER)) {
        if let Some(v) = section.get("host") {
            let v = v.trim();
            if v.is_empty() {
                warnings.push(SECTION_DECODER, "host", v, "host cannot be empty");
            } else {
                settings.decoder.host = v.to_string();
            }
        }
        if let Some(port) = port_key(section, SECTION_DECODER, "sbs1_port", &mut warnings) {
            settings.decoder.stream_port = port;
        }
        if let Some(port) = port_key(section, SECTION_DECODER, "json_port", &mut warnings) {
            settings.decoder.json_port = port;
        }
    }

    if let Some(section) = ini.section(Some(SECTION_OUTPUT)) {
        if let Some(v) = section.get("format") {
            match v.parse::<OutputMode>() {
                Ok(mode) => settings.output = mode,
                Err(msg) => warnings.push(SECTION_OUTPUT, "format", v, msg),
            }
        }
    }

    if let Some(section) = ini.section(Some(SECTION_FILTER)) {
        if let Some(v) = section.get("mode") {
            match v.parse::<FilterMode>() {
                Ok(mode) => settings.filter.mode = mode,
                Err(msg) => warnings.push(SECTION_FILTER, "mode", v, msg),
            }
        }
        if let Some(v) = section.get("icao_list") {
            settings.filter.allow = parse_icao_list(v.split(','));
        }
        if let Some(v) = section.get("altitude_filter_enabled") {
            match parse_bool(v) {
                Some(enabled) => settings.filter.altitude.enabled = enabled,
                None => warnings.push(
                    SECTION_FILTER,
                    "altitude_filter_enabled",
                    v,
                    "expected true or false",
                ),
            }
        }
        if let Some(v) = section.get("max_altitude") {
            match v.trim().parse::<i64>() {
                Ok(ceiling) => settings.filter.altitude.ceiling = ceiling,
                Err(_) => warnings.push(
                    SECTION_FILTER,
                    "max_altitude",
                    v,
                    "expected an altitude in feet",
                ),
            }
        }
    }

    if let Some(section) = ini.section(Some(SECTION_ENDPOINTS)) {
        settings.endpoints = parse_endpoints(section, &mut warnings);
    }

    (settings, warnings.0)
}

fn parse_endpoints(section: &Properties, warnings: &mut Warnings) -> Vec<EndpointSettings> {
    let count = match section.get("count") {
        None => 0,
        Some(v) => v.trim().parse::<usize>().unwrap_or_else(|_| {
            warnings.push(SECTION_ENDPOINTS, "count", v, "expected a number of endpoints");
            0
        }),
    };

    let mut endpoints = Vec::with_capacity(count);
    let mut seen = HashSet::new();

    for i in 0..count {
        let name = section
            .get(&format!("endpoint_{i}_name"))
            .map(str::trim)
            .unwrap_or_default();
        let ip_key = format!("endpoint_{i}_ip");
        let port_key_name = format!("endpoint_{i}_port");

        let host = section.get(&ip_key).map(str::trim).unwrap_or_default();
        if host.is_empty() {
            warnings.push(SECTION_ENDPOINTS, &ip_key, host, "endpoint skipped: no host");
            continue;
        }
        let Some(port) = port_key(section, SECTION_ENDPOINTS, &port_key_name, warnings) else {
            if section.get(&port_key_name).is_none() {
                warnings.push(
                    SECTION_ENDPOINTS,
                    &port_key_name,
                    "",
                    "endpoint skipped: no port",
                );
            }
            continue;
        };

        let endpoint = EndpointSettings::new(name, host, port);
        if !seen.insert(endpoint.key()) {
            warnings.push(
                SECTION_ENDPOINTS,
                &ip_key,
                &endpoint.key(),
                "duplicate endpoint skipped",
            );
            continue;
        }
        endpoints.push(endpoint);
    }

    endpoints
}

fn port_key(
    section: &Properties,
    section_name: &str,
    key: &str,
    warnings: &mut Warnings,
) -> Option<u16> {
    let v = section.get(key)?;
    match v.trim().parse::<u16>() {
        Ok(port) if port != 0 => Some(port),
        _ => {
            warnings.push(section_name, key, v, "expected a port between 1 and 65535");
            None
        }
    }
}

/// Boolean spellings accepted by the configuration editor.
fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}
