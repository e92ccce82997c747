//! `adsb-relay validate` — check a configuration file.
//!
//! Parses the file and reports the resolved settings plus every key that
//! fell back to its default, as human-readable text or JSON.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::model::{FilterMode, Settings};
use crate::config::source::parse_config_str;
use crate::error::RelayError;

pub fn execute(args: &ValidateArgs) -> Result<(), RelayError> {
    let path = &args.config;

    if !path.exists() {
        return Err(RelayError::ConfigFileNotFound { path: path.clone() });
    }

    let content = std::fs::read_to_string(path)?;
    let loaded = parse_config_str(&content, &path.display().to_string())?;
    let warnings = &loaded.warnings;

    match args.format {
        ValidateFormat::Text => {
            if warnings.is_empty() {
                println!("\u{2713} {}", format_report(&path.display().to_string(), &loaded.settings));
            } else {
                eprintln!(
                    "\u{26a0} {} has {} keys using defaults\n",
                    path.display(),
                    warnings.len()
                );
                for warning in warnings {
                    eprintln!("{warning}");
                }
                println!("\n{}", format_report(&path.display().to_string(), &loaded.settings));
            }
        }
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": warnings.is_empty(),
                    "version": loaded.version.short(),
                    "settings": loaded.settings,
                    "warnings": warnings,
                })
            );
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(RelayError::ConfigWarnings {
            count: warnings.len(),
        });
    }
    Ok(())
}

#[must_use]
pub fn format_report(path: &str, settings: &Settings) -> String {
    let filter = &settings.filter;
    let identity = match filter.mode {
        FilterMode::All => "all aircraft".to_string(),
        FilterMode::Allowlist => format!("{} allowed ICAO codes", filter.allow.len()),
    };
    let altitude = if filter.altitude.enabled {
        format!("max {} ft", filter.altitude.ceiling)
    } else {
        "off".to_string()
    };

    let mut out = format!(
        "{path}\n  \
         decoder:   {} (stream {}, json {})\n  \
         output:    {}\n  \
         filter:    {identity}, altitude {altitude}\n  \
         endpoints: {}",
        settings.decoder.host,
        settings.decoder.stream_port,
        settings.decoder.json_port,
        settings.output,
        settings.endpoints.len(),
    );
    for endpoint in &settings.endpoints {
        out.push_str(&format!("\n    {} ({})", endpoint.name, endpoint.key()));
    }
    out
}
