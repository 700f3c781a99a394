//! Reverse geocoding contract and per-run cache.
//!
//! The atlas owns the cache-key rounding and the caching policy; the
//! transport lives behind [`ReverseGeocoder`] (see `http::NominatimGeocoder`).

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::error::Result;
use crate::GpsPoint;

/// Cells are 0.1 degree (~11 km) on each side.
const CELL_SCALE: f64 = 10.0;

/// A coordinate rounded to one decimal degree, halves to even
/// (`47.25` -> `47.2`, `47.35` -> `47.4` in tenths).
///
/// Stored as integer tenths so it can be hashed and compared exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordCell {
    lat_tenths: i32,
    lng_tenths: i32,
}

impl CoordCell {
    pub fn from_point(point: GpsPoint) -> Self {
        Self {
            lat_tenths: (point.latitude * CELL_SCALE).round_ties_even() as i32,
            lng_tenths: (point.longitude * CELL_SCALE).round_ties_even() as i32,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.lat_tenths as f64 / CELL_SCALE
    }

    pub fn longitude(&self) -> f64 {
        self.lng_tenths as f64 / CELL_SCALE
    }

    /// Fallback location key for a cell the geocoder could not name.
    pub fn fallback_key(&self) -> String {
        format!("Location ({:.1}°, {:.1}°)", self.latitude(), self.longitude())
    }
}

/// True for keys produced by [`CoordCell::fallback_key`].
pub fn is_coordinate_key(key: &str) -> bool {
    key.starts_with("Location (") && key.ends_with("°)")
}

impl fmt::Display for CoordCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1},{:.1}", self.latitude(), self.longitude())
    }
}

/// City / country pair as returned by a reverse geocoder. Either part may be
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Place {
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Place {
    pub fn new(city: Option<&str>, country: Option<&str>) -> Self {
        let clean = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        Self {
            city: clean(city),
            country: clean(country),
        }
    }

    /// `"City, Country"`, `"Country"` or `"City"`; `None` if both are missing.
    pub fn key(&self) -> Option<String> {
        match (self.city.as_deref(), self.country.as_deref()) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (None, Some(country)) => Some(country.to_string()),
            (Some(city), None) => Some(city.to_string()),
            (None, None) => None,
        }
    }
}

/// External reverse geocoding service.
#[allow(async_fn_in_trait)]
pub trait ReverseGeocoder {
    /// Look up the place at `point`. `Ok(None)` means the service answered
    /// but knows nothing useful about the point.
    async fn reverse(&self, point: GpsPoint) -> Result<Option<Place>>;
}

/// Geocode answers for one run, keyed by [`CoordCell`].
///
/// A cached `None` records that the cell could not be named, so a failing
/// cell is not queried again.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: HashMap<CoordCell, Option<String>>,
    hits: u64,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached key for `cell`: `Some(Some(key))` for a named cell,
    /// `Some(None)` for a known failure, `None` if the cell was never queried.
    pub fn get(&mut self, cell: &CoordCell) -> Option<Option<String>> {
        let entry = self.entries.get(cell).cloned();
        if entry.is_some() {
            self.hits += 1;
            debug!("[GeocodeCache] hit for {}", cell);
        }
        entry
    }

    pub fn insert(&mut self, cell: CoordCell, key: Option<String>) {
        self.entries.insert(cell, key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}
