//! Aircraft record shapes.
//!
//! [`AircraftRecord`] is the typed view of one element of dump1090's
//! `aircraft.json` array. Every field is optional because the decoder only
//! reports what it has heard. The SBS-1 line form is handled by index; the
//! `FIELD_*` constants name the positions this crate reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FilterError;

pub const FIELD_ICAO: usize = 4;
pub const FIELD_CALLSIGN: usize = 10;
pub const FIELD_ALTITUDE: usize = 11;

/// Number of fields in a line produced by [`crate::convert`].
pub const SBS1_FIELD_COUNT: usize = 16;

/// An altitude as reported by the decoder: usually integer feet, sometimes
/// a float, and `"ground"` for aircraft on the surface.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Altitude {
    Feet(i64),
    Fractional(f64),
    Text(String),
}

impl Altitude {
    /// Integer feet, if the value is one.
    #[must_use]
    pub fn feet(&self) -> Option<i64> {
        match self {
            Self::Feet(v) => Some(*v),
            #[allow(clippy::cast_possible_truncation)]
            Self::Fractional(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            Self::Fractional(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for Altitude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feet(v) => write!(f, "{v}"),
            Self::Fractional(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s.trim()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AircraftRecord {
    #[serde(default, rename = "hex", skip_serializing_if = "Option::is_none")]
    pub icao: Option<String>,
    #[serde(default, rename = "flight", skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    /// Barometric altitude, the primary source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_baro: Option<Altitude>,
    /// Geometric altitude, used when no barometric value is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_geom: Option<Altitude>,
    #[serde(default, rename = "gs", skip_serializing_if = "Option::is_none")]
    pub ground_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl AircraftRecord {
    /// Decode the fields this crate uses from one aircraft object. Other
    /// keys are ignored; a used key of the wrong type is an error.
    pub fn from_value(value: &Value) -> Result<Self, FilterError> {
        Self::deserialize(value).map_err(|e| FilterError::Record(e.to_string()))
    }

    #[must_use]
    pub fn altitude(&self) -> Option<&Altitude> {
        self.alt_baro.as_ref().or(self.alt_geom.as_ref())
    }
}

/// Top-level shape of `aircraft.json`. Elements stay untyped so JSON mode
/// can forward them with every key the decoder sent, in its order.
#[derive(Debug, Default, Deserialize)]
pub struct AircraftFeed {
    #[serde(default)]
    pub aircraft: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_dump1090_object() {
        let record = AircraftRecord::from_value(&json!({
            "hex": "a92f2d",
            "flight": "N123AB  ",
            "alt_baro": 4500,
            "alt_geom": 4625,
            "gs": 132.4,
            "track": 271.3,
            "lat": 41.2,
            "lon": -70.1,
            "rssi": -21.4,
            "mlat": []
        }))
        .unwrap();
        assert_eq!(record.icao.as_deref(), Some("a92f2d"));
        assert_eq!(record.altitude(), Some(&Altitude::Feet(4500)));
        assert_eq!(record.ground_speed, Some(132.4));
    }

    #[test]
    fn ground_altitude_is_text() {
        let record = AircraftRecord::from_value(&json!({"hex": "abc123", "alt_baro": "ground"}))
            .unwrap();
        let altitude = record.altitude().unwrap();
        assert_eq!(altitude, &Altitude::Text("ground".into()));
        assert_eq!(altitude.feet(), None);
    }

    #[test]
    fn geometric_altitude_is_the_fallback() {
        let record =
            AircraftRecord::from_value(&json!({"hex": "abc123", "alt_baro": null, "alt_geom": 3200}))
                .unwrap();
        assert_eq!(record.altitude().and_then(Altitude::feet), Some(3200));
    }

    #[test]
    fn wrong_type_is_an_error() {
        assert!(AircraftRecord::from_value(&json!({"hex": 42})).is_err());
        assert!(AircraftRecord::from_value(&json!("not an object")).is_err());
    }

    #[test]
    fn altitude_feet_conversions() {
        assert_eq!(Altitude::Fractional(5000.0).feet(), Some(5000));
        assert_eq!(Altitude::Fractional(5000.5).feet(), None);
        assert_eq!(Altitude::Text(" 700 ".into()).feet(), Some(700));
    }

    #[test]
    fn feed_without_aircraft_is_empty() {
        let feed: AircraftFeed = serde_json::from_str(r#"{"now": 1.5, "messages": 9}"#).unwrap();
        assert!(feed.aircraft.is_empty());
    }
}
