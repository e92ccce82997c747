//! Forward/drop decision for decoder output.
//!
//! Both input forms go through the same two stages, in order:
//!
//! 1. **Altitude** (only when enabled). A missing or non-integer altitude
//!    passes; otherwise the record is dropped above the ceiling.
//! 2. **Identity**. `All` accepts; `Allowlist` accepts only when the
//!    uppercased ICAO address is in the allow-set.
//!
//! [`evaluate_line`] reports a [`FilterError`] for a line it cannot judge,
//! and [`AircraftRecord::from_value`] does the same for an object. The
//! `accepts_*`/[`admit_value`] wrappers turn any such error into a drop, so
//! the altitude stage fails open while the predicate as a whole fails
//! closed.

use serde_json::Value;

use crate::config::model::{FilterConfig, FilterMode};
use crate::error::FilterError;
use crate::record::{AircraftRecord, Altitude, FIELD_ALTITUDE, FIELD_ICAO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    AboveCeiling,
    NotAllowed,
}

impl Verdict {
    #[must_use]
    pub const fn is_accept(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Judge one SBS-1 line.
pub fn evaluate_line(filter: &FilterConfig, line: &str) -> Result<Verdict, FilterError> {
    let parts: Vec<&str> = line.split(',').collect();

    let altitude = parts
        .get(FIELD_ALTITUDE)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok());
    if !altitude_passes(filter, altitude) {
        return Ok(Verdict::AboveCeiling);
    }

    if filter.mode == FilterMode::All {
        return Ok(Verdict::Accept);
    }
    let icao = *parts
        .get(FIELD_ICAO)
        .ok_or(FilterError::ShortLine { fields: parts.len() })?;
    Ok(identity_verdict(filter, Some(icao)))
}

/// Judge one decoded aircraft record.
#[must_use]
pub fn evaluate_record(filter: &FilterConfig, record: &AircraftRecord) -> Verdict {
    let altitude = record.altitude().and_then(Altitude::feet);
    if !altitude_passes(filter, altitude) {
        return Verdict::AboveCeiling;
    }
    identity_verdict(filter, record.icao.as_deref())
}

#[must_use]
pub fn accepts_line(filter: &FilterConfig, line: &str) -> bool {
    accepted(evaluate_line(filter, line))
}

#[must_use]
pub fn accepts_record(filter: &FilterConfig, record: &AircraftRecord) -> bool {
    evaluate_record(filter, record).is_accept()
}

/// Decode one element of the `aircraft` array and return it if accepted.
/// An element that does not decode is dropped.
#[must_use]
pub fn admit_value(filter: &FilterConfig, value: &Value) -> Option<AircraftRecord> {
    match AircraftRecord::from_value(value) {
        Ok(record) => accepts_record(filter, &record).then_some(record),
        Err(e) => {
            tracing::trace!(error = %e, "record dropped");
            None
        }
    }
}

fn accepted(result: Result<Verdict, FilterError>) -> bool {
    match result {
        Ok(verdict) => verdict.is_accept(),
        Err(e) => {
            tracing::trace!(error = %e, "record dropped");
            false
        }
    }
}

fn altitude_passes(filter: &FilterConfig, altitude: Option<i64>) -> bool {
    if !filter.altitude.enabled {
        return true;
    }
    altitude.map_or(true, |feet| feet <= filter.altitude.ceiling)
}

fn identity_verdict(filter: &FilterConfig, icao: Option<&str>) -> Verdict {
    match filter.mode {
        FilterMode::All => Verdict::Accept,
        FilterMode::Allowlist => {
            let icao = icao.map(str::trim).unwrap_or_default();
            if !icao.is_empty() && filter.allow.contains(&icao.to_uppercase()) {
                Verdict::Accept
            } else {
                Verdict::NotAllowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LINE: &str =
        "MSG,3,1,1,a92f2d,1,2024/05/01,12:00:00.000,2024/05/01,12:00:00.000,N123AB,12000,,,41.2,-70.1,,,0,0,0,0";

    fn accepts_value(filter: &FilterConfig, value: &Value) -> bool {
        admit_value(filter, value).is_some()
    }

    fn sbs(icao: &str, altitude: &str) -> String {
        format!("MSG,3,1,1,{icao},1,2024/05/01,12:00:00.000,2024/05/01,12:00:00.000,,{altitude},,,,")
    }

    #[test]
    fn ceiling_is_inclusive() {
        let filter = FilterConfig::all().with_ceiling(10000);
        assert!(accepts_line(&filter, &sbs("ABC123", "10000")));
        assert!(!accepts_line(&filter, &sbs("ABC123", "10001")));
        assert!(accepts_record(
            &filter,
            &AircraftRecord {
                alt_baro: Some(Altitude::Feet(10000)),
                ..AircraftRecord::default()
            }
        ));
        assert!(!accepts_value(&filter, &json!({"hex": "abc123", "alt_baro": 10001})));
    }

    #[test]
    fn unparseable_altitude_passes() {
        let filter = FilterConfig::all().with_ceiling(10000);
        assert!(accepts_line(&filter, &sbs("ABC123", "ground")));
        assert!(accepts_line(&filter, &sbs("ABC123", "")));
        assert!(accepts_value(&filter, &json!({"hex": "abc123", "alt_baro": "ground"})));
        assert!(accepts_value(&filter, &json!({"hex": "abc123"})));
    }

    #[test]
    fn short_line_skips_altitude_stage() {
        let filter = FilterConfig::all().with_ceiling(10);
        assert!(accepts_line(&filter, "MSG,8,1,1,ABC123"));
    }

    #[test]
    fn mode_all_ignores_identity() {
        let filter = FilterConfig::all();
        assert!(accepts_line(&filter, "MSG"));
        assert!(accepts_line(&filter, LINE));
        assert!(accepts_value(&filter, &json!({})));
    }

    #[test]
    fn allowlist_is_case_insensitive() {
        let filter = FilterConfig::allowlist(["A92F2D"]);
        assert!(accepts_line(&filter, LINE));
        assert!(accepts_line(&filter, &sbs(" a92F2d ", "")));
        assert!(accepts_value(&filter, &json!({"hex": "a92f2d"})));
        assert!(!accepts_line(&filter, &sbs("A932E4", "")));
    }

    #[test]
    fn allowlist_rejects_missing_identity() {
        let filter = FilterConfig::allowlist(["A92F2D"]);
        assert_eq!(
            evaluate_line(&filter, "MSG,3,1"),
            Err(FilterError::ShortLine { fields: 3 })
        );
        assert!(!accepts_line(&filter, "MSG,3,1"));
        assert!(!accepts_line(&filter, &sbs("", "")));
        assert!(!accepts_value(&filter, &json!({"flight": "N123AB"})));
    }

    #[test]
    fn altitude_runs_before_identity() {
        let filter = FilterConfig::allowlist(["A92F2D"]).with_ceiling(10000);
        assert_eq!(evaluate_line(&filter, LINE), Ok(Verdict::AboveCeiling));
        assert!(!accepts_value(&filter, &json!({"hex": "a92f2d", "alt_baro": 12000})));
    }

    #[test]
    fn disabled_altitude_filter_forwards_high_traffic() {
        let filter = FilterConfig::allowlist(["A92F2D"]);
        assert_eq!(evaluate_line(&filter, LINE), Ok(Verdict::Accept));
    }

    #[test]
    fn undecodable_record_is_dropped_even_in_mode_all() {
        let filter = FilterConfig::all();
        assert!(AircraftRecord::from_value(&json!({"hex": ["a92f2d"]})).is_err());
        assert!(!accepts_value(&filter, &json!({"hex": ["a92f2d"]})));
    }
}
