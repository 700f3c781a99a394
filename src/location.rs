//! Activity -> location key resolution.
//!
//! Key priority:
//! 1. `"City, Country"` from the activity itself
//! 2. country alone
//! 3. city alone
//! 4. reverse-geocoded name of the start coordinate's 0.1° cell, or
//!    `"Location (lat°, lng°)"` when the cell cannot be named
//! 5. `"Unknown"`

use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::activity::Activity;
use crate::geocode::{CoordCell, GeocodeCache, Place, ReverseGeocoder};

/// Key for activities with neither a place name nor coordinates.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Nominatim usage policy: at most one request per second.
pub const DEFAULT_GEOCODE_INTERVAL: Duration = Duration::from_secs(1);

/// Spaces out geocoder calls so that consecutive requests start at least
/// `interval` apart.
#[derive(Debug)]
struct DispatchGate {
    next_dispatch: Option<Instant>,
    interval: Duration,
}

impl DispatchGate {
    fn new(interval: Duration) -> Self {
        Self {
            next_dispatch: None,
            interval,
        }
    }

    async fn wait_for_slot(&mut self) {
        let now = Instant::now();
        if let Some(next) = self.next_dispatch {
            if next > now {
                debug!("[DispatchGate] Waiting {:?} for geocode slot", next - now);
                tokio::time::sleep_until(next).await;
            }
        }
        self.next_dispatch = Some(Instant::now() + self.interval);
    }
}

/// Resolves activities to location keys, owning the geocode cache for the
/// duration of one run.
pub struct LocationResolver<G> {
    geocoder: G,
    cache: GeocodeCache,
    gate: DispatchGate,
    lookups: u64,
}

impl<G: ReverseGeocoder> LocationResolver<G> {
    pub fn new(geocoder: G) -> Self {
        Self::with_interval(geocoder, DEFAULT_GEOCODE_INTERVAL)
    }

    /// Resolver with a custom minimum spacing between geocoder calls.
    pub fn with_interval(geocoder: G, interval: Duration) -> Self {
        Self {
            geocoder,
            cache: GeocodeCache::new(),
            gate: DispatchGate::new(interval),
            lookups: 0,
        }
    }

    /// Location key for `activity`. Never fails and never returns an empty
    /// string.
    pub async fn resolve(&mut self, activity: &Activity) -> String {
        let declared = Place::new(activity.city.as_deref(), activity.country.as_deref());
        if let Some(key) = declared.key() {
            return key;
        }

        let Some(point) = activity.start else {
            return UNKNOWN_LOCATION.to_string();
        };

        let cell = CoordCell::from_point(point);
        let named = match self.cache.get(&cell) {
            Some(cached) => cached,
            None => {
                let named = self.lookup(point, cell).await;
                self.cache.insert(cell, named.clone());
                named
            }
        };

        named.unwrap_or_else(|| cell.fallback_key())
    }

    async fn lookup(&mut self, point: crate::GpsPoint, cell: CoordCell) -> Option<String> {
        self.gate.wait_for_slot().await;
        self.lookups += 1;

        match self.geocoder.reverse(point).await {
            Ok(place) => {
                let key = place.and_then(|p| p.key());
                debug!("[LocationResolver] {} -> {:?}", cell, key);
                key
            }
            Err(e) => {
                warn!("[LocationResolver] Reverse geocoding failed for {}: {}", cell, e);
                None
            }
        }
    }

    /// Number of geocoder calls made so far.
    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }
}
