//! Activity records.
//!
//! `StravaActivity` mirrors the JSON returned by the athlete activities
//! endpoint. It is converted once, at ingestion, into an account-tagged
//! [`Activity`] with explicit optional fields, so nothing downstream has to
//! guess at missing keys.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AtlasError, Result};
use crate::GpsPoint;

/// Precision of Google encoded polylines returned by Strava.
const POLYLINE_PRECISION: u32 = 5;

/// Sport type of an activity.
///
/// Only runs, walks and rides are tracked; everything else is carried as
/// `Other` and filtered out before any statistic or map is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    Run,
    Walk,
    Ride,
    Other(String),
}

impl ActivityKind {
    /// Parse the service's `type` string, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "run" => ActivityKind::Run,
            "walk" => ActivityKind::Walk,
            "ride" => ActivityKind::Ride,
            other => ActivityKind::Other(other.to_string()),
        }
    }

    /// True for the three kinds that count towards statistics and maps.
    pub fn is_tracked(&self) -> bool {
        !matches!(self, ActivityKind::Other(_))
    }

    /// Lowercase label used in popups.
    pub fn label(&self) -> &str {
        match self {
            ActivityKind::Run => "run",
            ActivityKind::Walk => "walk",
            ActivityKind::Ride => "ride",
            ActivityKind::Other(name) => name,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single workout, tagged with the account it was fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Account tag (the name given on the command line)
    pub account: String,
    pub kind: ActivityKind,
    /// Free-text title, "Activity" when the service sent none
    pub name: String,
    /// Start coordinate, `None` for indoor/manual activities
    pub start: Option<GpsPoint>,
    /// Google encoded summary polyline
    pub summary_polyline: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Activity {
    /// Create an activity with only the mandatory fields set.
    pub fn new(account: &str, kind: ActivityKind) -> Self {
        Self {
            account: account.to_string(),
            kind,
            name: "Activity".to_string(),
            start: None,
            summary_polyline: None,
            city: None,
            country: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_start(mut self, latitude: f64, longitude: f64) -> Self {
        self.start = Some(GpsPoint::new(latitude, longitude));
        self
    }

    pub fn with_place(mut self, city: Option<&str>, country: Option<&str>) -> Self {
        self.city = non_empty(city.map(str::to_string));
        self.country = non_empty(country.map(str::to_string));
        self
    }

    pub fn with_polyline(mut self, encoded: &str) -> Self {
        self.summary_polyline = non_empty(Some(encoded.to_string()));
        self
    }
}

// ============================================================================
// Raw API record
// ============================================================================

/// Activity summary as returned by `GET /athlete/activities`.
///
/// Only the fields the atlas needs are modelled; unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaActivity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub start_latlng: Option<Vec<f64>>,
    #[serde(default)]
    pub map: Option<StravaMap>,
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaMap {
    #[serde(default)]
    pub summary_polyline: Option<String>,
}

impl StravaActivity {
    /// Convert into an [`Activity`] owned by `account`.
    pub fn into_activity(self, account: &str) -> Activity {
        let start = match self.start_latlng.as_deref() {
            Some(&[lat, lng]) => Some(GpsPoint::new(lat, lng)).filter(GpsPoint::is_valid),
            _ => None,
        };

        Activity {
            account: account.to_string(),
            kind: ActivityKind::parse(self.activity_type.as_deref().unwrap_or("")),
            name: non_empty(self.name).unwrap_or_else(|| "Activity".to_string()),
            start,
            summary_polyline: non_empty(self.map.and_then(|m| m.summary_polyline)),
            city: non_empty(self.location_city),
            country: non_empty(self.location_country),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Path decoding
// ============================================================================

/// Decode an activity's summary polyline into GPS points.
///
/// Returns `Ok(None)` when the activity has no path at all and
/// `Err(AtlasError::Decode)` when the encoded string is malformed.
pub fn decode_path(activity: &Activity) -> Result<Option<Vec<GpsPoint>>> {
    let Some(encoded) = activity.summary_polyline.as_deref() else {
        return Ok(None);
    };

    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION).map_err(|e| {
        AtlasError::Decode {
            message: format!("{:?}", e),
        }
    })?;

    // geo coordinates are (x, y) = (lng, lat)
    let points = line
        .coords()
        .map(|c| GpsPoint::new(c.y, c.x))
        .collect::<Vec<_>>();

    Ok(Some(points))
}
