//! # Activity Atlas
//!
//! Combines workout activities from several Strava accounts into shared maps.
//!
//! This library provides:
//! - Location bucketing of activities (city/country, reverse geocoding, coordinate cells)
//! - Per-location and per-account aggregation with continent/country tracking
//! - Density-scaled heatmap circles with stable region colours
//! - Leaflet HTML artifacts: combined routes, combined heatmap, per-location detail maps
//!
//! ## Features
//!
//! - **`http`** - Strava activity fetching, OAuth token handling, Nominatim reverse geocoding
//! - **`cli`** - The `activity-atlas` command line tool (implies `http`)
//!
//! ## Quick Start
//!
//! ```rust
//! use activity_atlas::{AccountPalette, DensityConfig, DensityScale};
//!
//! let palette = AccountPalette::new(["m", "a"]);
//! assert_eq!(palette.color("m"), "#8b5cf6");
//!
//! let scale = DensityScale::from_counts([1, 5, 9], DensityConfig::default());
//! assert_eq!(scale.radius(9), 1_000_000.0);
//! ```

use geo::{Centroid, MultiPoint, Point};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{AtlasError, OptionExt, Result};

// Activity records and encoded path decoding
pub mod activity;
pub use activity::{decode_path, Activity, ActivityKind, StravaActivity};

// Account and region colours
pub mod colors;
pub use colors::{region_color, region_hash, AccountPalette};

// Country -> continent lookup
pub mod geography;
pub use geography::{continent_of, Continent};

// Reverse geocoding contract and per-run cache
pub mod geocode;
pub use geocode::{CoordCell, GeocodeCache, Place, ReverseGeocoder};

// Activity -> location key resolution
pub mod location;
pub use location::{LocationResolver, UNKNOWN_LOCATION};

// Location / account aggregation
pub mod aggregate;
pub use aggregate::{build_atlas, AccountStats, Atlas, LocationAggregate, VisitedPlaces};

// Count -> circle radius scaling
pub mod density;
pub use density::{DensityConfig, DensityScale};

// Map documents and the three artifact builders
pub mod render;
pub use render::{
    build_heatmap, build_location_map, build_routes_map, sanitize_location_key, DetailNamer,
    MapDocument,
};

// Run configuration (env + defaults)
pub mod config;
pub use config::{AccountCredentials, DateRange, ReportConfig};

// Artifact generation for one run
pub mod report;
pub use report::{ReportGenerator, ReportOutputs};

// HTTP clients for Strava and Nominatim
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{NominatimGeocoder, StravaClient};

// OAuth token handling
#[cfg(feature = "http")]
pub mod auth;
#[cfg(feature = "http")]
pub use auth::{Authenticator, TokenSet};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use activity_atlas::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// `[lat, lng]` pair as Leaflet expects it.
    pub fn to_lat_lng(self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }

    /// Arithmetic mean of the given points.
    ///
    /// Returns `None` for an empty slice.
    pub fn mean(points: &[GpsPoint]) -> Option<GpsPoint> {
        let multi: MultiPoint<f64> = points
            .iter()
            .map(|p| Point::new(p.longitude, p.latitude))
            .collect();
        multi.centroid().map(|c| GpsPoint::new(c.y(), c.x()))
    }
}

// ============================================================================
// Tests
// ============================================================================
