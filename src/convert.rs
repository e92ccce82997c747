//! JSON aircraft record to SBS-1 line conversion.
//!
//! Output is always a `MSG,3` (airborne position) line with 16 fields:
//!
//! ```text
//! MSG,3,1,1,{ICAO},1,{date},{time},{date},{time},{callsign},{alt},{gs},{track},{lat},{lon}
//! ```
//!
//! Both timestamp pairs carry the conversion instant in UTC. Absent fields
//! render empty so positions never shift.

use std::fmt::Display;

use chrono::{DateTime, Utc};

use crate::record::AircraftRecord;

/// Convert using the current time.
#[must_use]
pub fn to_sbs1(record: &AircraftRecord) -> String {
    to_sbs1_at(record, Utc::now())
}

#[must_use]
pub fn to_sbs1_at(record: &AircraftRecord, now: DateTime<Utc>) -> String {
    let icao = record
        .icao
        .as_deref()
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();
    let callsign = record.callsign.as_deref().map(str::trim).unwrap_or_default();
    let date = now.format("%Y/%m/%d");
    let time = now.format("%H:%M:%S%.3f");

    format!(
        "MSG,3,1,1,{icao},1,{date},{time},{date},{time},{callsign},{},{},{},{},{}\n",
        field(record.altitude()),
        field(record.ground_speed),
        field(record.track),
        field(record.lat),
        field(record.lon),
    )
}

fn field<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Altitude, FIELD_ALTITUDE, FIELD_CALLSIGN, FIELD_ICAO, SBS1_FIELD_COUNT};
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap() + chrono::Duration::milliseconds(45)
    }

    #[test]
    fn sparse_record_keeps_field_layout() {
        let record = AircraftRecord {
            icao: Some("ABC123".into()),
            alt_baro: Some(Altitude::Feet(5000)),
            ..AircraftRecord::default()
        };
        let line = to_sbs1_at(&record, instant());

        assert!(line.ends_with("\n") && !line.ends_with("\n\n"));
        let fields: Vec<&str> = line.trim_end_matches('\n').split(',').collect();
        assert_eq!(fields.len(), SBS1_FIELD_COUNT);
        assert_eq!(fields[FIELD_ICAO], "ABC123");
        assert_eq!(fields[FIELD_CALLSIGN], "");
        assert_eq!(fields[FIELD_ALTITUDE], "5000");
        assert!(fields[12..].iter().all(|f| f.is_empty()));
    }

    #[test]
    fn timestamps_are_conversion_time_with_millis() {
        let line = to_sbs1_at(&AircraftRecord::default(), instant());
        assert_eq!(
            line,
            "MSG,3,1,1,,1,2024/03/09,07:05:02.045,2024/03/09,07:05:02.045,,,,,,\n"
        );
    }

    #[test]
    fn full_record() {
        let record = AircraftRecord {
            icao: Some("a92f2d".into()),
            callsign: Some("N123AB  ".into()),
            alt_baro: None,
            alt_geom: Some(Altitude::Feet(3125)),
            ground_speed: Some(132.4),
            track: Some(271.0),
            lat: Some(41.25),
            lon: Some(-70.5),
        };
        let line = to_sbs1_at(&record, instant());
        assert_eq!(
            line,
            "MSG,3,1,1,A92F2D,1,2024/03/09,07:05:02.045,2024/03/09,07:05:02.045,N123AB,3125,132.4,271,41.25,-70.5\n"
        );
    }

    #[test]
    fn ground_altitude_is_rendered_as_reported() {
        let record = AircraftRecord {
            alt_baro: Some(Altitude::Text("ground".into())),
            ..AircraftRecord::default()
        };
        let line = to_sbs1_at(&record, instant());
        assert_eq!(line.split(',').nth(FIELD_ALTITUDE), Some("ground"));
    }
}
