//! Location and account aggregation.
//!
//! One pass over the mappable activities (tracked kind, start coordinate
//! present) groups them by location key, counts them per account, and
//! collects the visited countries and continents. Account statistics are
//! computed over exactly the same subset.

use std::collections::{BTreeMap, HashMap};

use log::info;

use crate::activity::{Activity, ActivityKind};
use crate::geocode::{is_coordinate_key, ReverseGeocoder};
use crate::geography::{continent_of, is_known_country, Continent};
use crate::location::LocationResolver;
use crate::GpsPoint;

/// Log progress every N activities while resolving locations.
const PROGRESS_EVERY: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// Run / walk / ride counts for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountStats {
    pub account: String,
    pub runs: u32,
    pub walks: u32,
    pub rides: u32,
    /// Always `runs + walks + rides`; untracked kinds never reach the stats.
    pub total: u32,
}

impl AccountStats {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, kind: &ActivityKind) {
        match kind {
            ActivityKind::Run => self.runs += 1,
            ActivityKind::Walk => self.walks += 1,
            ActivityKind::Ride => self.rides += 1,
            ActivityKind::Other(_) => return,
        }
        self.total += 1;
    }
}

/// All activities that resolved to the same location key.
#[derive(Debug, Clone)]
pub struct LocationAggregate {
    pub key: String,
    pub count: u32,
    /// Start coordinate of the first member seen; used for the heatmap marker
    pub representative: GpsPoint,
    /// Members in input order
    pub activities: Vec<Activity>,
    /// Per-account counts in first-seen order
    pub by_account: Vec<(String, u32)>,
}

impl LocationAggregate {
    fn new(key: String, first: &Activity, representative: GpsPoint) -> Self {
        let mut aggregate = Self {
            key,
            count: 0,
            representative,
            activities: Vec::new(),
            by_account: Vec::new(),
        };
        aggregate.push(first);
        aggregate
    }

    fn push(&mut self, activity: &Activity) {
        self.count += 1;
        self.activities.push(activity.clone());
        match self
            .by_account
            .iter_mut()
            .find(|(name, _)| *name == activity.account)
        {
            Some((_, n)) => *n += 1,
            None => self.by_account.push((activity.account.clone(), 1)),
        }
    }

    /// Members' start coordinates.
    pub fn start_points(&self) -> Vec<GpsPoint> {
        self.activities.iter().filter_map(|a| a.start).collect()
    }

    /// Mean of all member start coordinates (detail map centre).
    pub fn centroid(&self) -> Option<GpsPoint> {
        GpsPoint::mean(&self.start_points())
    }

    pub fn account_count(&self, account: &str) -> u32 {
        self.by_account
            .iter()
            .find(|(name, _)| name == account)
            .map_or(0, |(_, n)| *n)
    }
}

/// Countries and continents seen, with activity counts, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct VisitedPlaces {
    pub countries: BTreeMap<String, u32>,
    pub continents: BTreeMap<Continent, u32>,
}

impl VisitedPlaces {
    fn record(&mut self, location_key: &str) {
        let Some(country) = country_of_key(location_key) else {
            return;
        };
        *self.countries.entry(country.to_string()).or_insert(0) += 1;

        let continent = continent_of(country);
        if continent.is_known() {
            *self.continents.entry(continent).or_insert(0) += 1;
        }
    }
}

/// Country part of a location key.
///
/// `"City, Country"` keys yield their last component; a bare key counts only
/// if it is itself a known country. Coordinate fallback keys have no country.
pub fn country_of_key(key: &str) -> Option<&str> {
    if is_coordinate_key(key) {
        return None;
    }
    if key.contains(", ") {
        return key.rsplit(", ").next().filter(|c| !c.is_empty());
    }
    is_known_country(key).then_some(key)
}

/// Everything the renderers need for one run.
#[derive(Debug, Clone, Default)]
pub struct Atlas {
    /// Locations in first-seen order
    pub locations: Vec<LocationAggregate>,
    /// Stats for every configured account (zeros included), then any
    /// unconfigured account in first-seen order
    pub accounts: Vec<AccountStats>,
    pub visited: VisitedPlaces,
    /// Size of the mappable subset the atlas was built from
    pub activity_count: usize,
}

impl Atlas {
    pub fn location(&self, key: &str) -> Option<&LocationAggregate> {
        self.locations.iter().find(|l| l.key == key)
    }

    pub fn account(&self, account: &str) -> Option<&AccountStats> {
        self.accounts.iter().find(|s| s.account == account)
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Activities that take part in statistics and maps: tracked kind with a
/// start coordinate.
pub fn mappable(activities: &[Activity]) -> Vec<&Activity> {
    activities
        .iter()
        .filter(|a| a.kind.is_tracked() && a.start.is_some())
        .collect()
}

/// Per-account counts over `activities`, ordered by `accounts` first.
pub fn account_stats<'a, I>(accounts: &[String], activities: I) -> Vec<AccountStats>
where
    I: IntoIterator<Item = &'a Activity>,
{
    let mut stats: Vec<AccountStats> = accounts.iter().map(|a| AccountStats::new(a)).collect();
    let mut index: HashMap<String, usize> = accounts
        .iter()
        .enumerate()
        .map(|(i, a)| (a.clone(), i))
        .collect();

    for activity in activities {
        if !activity.kind.is_tracked() {
            continue;
        }
        let i = *index.entry(activity.account.clone()).or_insert_with(|| {
            stats.push(AccountStats::new(&activity.account));
            stats.len() - 1
        });
        stats[i].record(&activity.kind);
    }

    stats
}

/// Group the mappable subset of `activities` by location key.
pub async fn build_atlas<G: ReverseGeocoder>(
    activities: &[Activity],
    accounts: &[String],
    resolver: &mut LocationResolver<G>,
) -> Atlas {
    let subset = mappable(activities);
    let total = subset.len();

    let mut locations: Vec<LocationAggregate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut visited = VisitedPlaces::default();

    info!("[Atlas] Resolving locations for {} activities", total);

    for (i, activity) in subset.iter().enumerate() {
        if (i + 1) % PROGRESS_EVERY == 0 {
            info!("[Atlas] {}/{} activities...", i + 1, total);
        }

        let Some(start) = activity.start else {
            continue;
        };
        let key = resolver.resolve(activity).await;
        visited.record(&key);

        match index.get(&key) {
            Some(&slot) => locations[slot].push(activity),
            None => {
                index.insert(key.clone(), locations.len());
                locations.push(LocationAggregate::new(key, activity, start));
            }
        }
    }

    let accounts = account_stats(accounts, subset.iter().copied());

    info!(
        "[Atlas] {} locations, {} countries, {} continents ({} geocoder lookups)",
        locations.len(),
        visited.countries.len(),
        visited.continents.len(),
        resolver.lookups()
    );

    Atlas {
        locations,
        accounts,
        visited,
        activity_count: total,
    }
}
