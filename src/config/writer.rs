//! Serialization of [`Settings`] back into the INI layout read by
//! [`super::parser`].

use ini::Ini;

use super::model::Settings;
use super::parser::{SECTION_DECODER, SECTION_ENDPOINTS, SECTION_FILTER, SECTION_OUTPUT};

#[must_use]
pub fn to_ini(settings: &Settings) -> Ini {
    let mut ini = Ini::new();

    ini.with_section(Some(SECTION_DECODER))
        .set("host", settings.decoder.host.as_str())
        .set("sbs1_port", settings.decoder.stream_port.to_string())
        .set("json_port", settings.decoder.json_port.to_string());

    ini.with_section(Some(SECTION_OUTPUT))
        .set("format", settings.output.as_str());

    let icao_list = settings
        .filter
        .allow
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    ini.with_section(Some(SECTION_FILTER))
        .set("mode", settings.filter.mode.as_str())
        .set("icao_list", icao_list)
        .set(
            "altitude_filter_enabled",
            settings.filter.altitude.enabled.to_string(),
        )
        .set("max_altitude", settings.filter.altitude.ceiling.to_string());

    ini.with_section(Some(SECTION_ENDPOINTS))
        .set("count", settings.endpoints.len().to_string());
    for (i, endpoint) in settings.endpoints.iter().enumerate() {
        ini.with_section(Some(SECTION_ENDPOINTS))
            .set(format!("endpoint_{i}_name"), endpoint.name.as_str())
            .set(format!("endpoint_{i}_ip"), endpoint.host.as_str())
            .set(format!("endpoint_{i}_port"), endpoint.port.to_string());
    }

    ini
}

/// Render settings as INI text.
#[must_use]
pub fn to_config_string(settings: &Settings) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = to_ini(settings).write_to(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
