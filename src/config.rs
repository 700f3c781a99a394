//! Run configuration.
//!
//! Rendering knobs live in [`ReportConfig`] with `Default` values; per-account
//! credentials and the optional date window are read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate, TimeZone};
use log::warn;

use crate::colors::account_css_id;
use crate::density::DensityConfig;
use crate::error::{AtlasError, OptionExt, Result};
use crate::location::DEFAULT_GEOCODE_INTERVAL;
use crate::GpsPoint;

/// Most accounts one run may combine.
pub const MAX_ACCOUNTS: usize = 5;

/// Date format of `FROM_DATE` / `TO_DATE`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Configuration for one report run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Directory the artifacts are written into. Default: current directory
    pub output_dir: PathBuf,

    /// Heatmap circle radii
    pub density: DensityConfig,

    /// Initial zoom of the combined routes map. Default: 12
    pub routes_zoom: u8,

    /// Initial zoom of the per-location detail maps. Default: 13
    pub detail_zoom: u8,

    /// Initial zoom of the heatmap. Default: 2
    pub heatmap_zoom: u8,

    /// Heatmap centre. Default: (20, 0), a whole-world view
    pub heatmap_center: GpsPoint,

    /// Route stroke width in pixels. Default: 2
    pub line_weight: f64,

    /// Route stroke opacity. Default: 0.6
    pub line_opacity: f64,

    /// Heatmap circle fill opacity. Default: 0.6
    pub fill_opacity: f64,

    /// Minimum spacing between reverse geocoding calls. Default: 1 s
    pub geocode_interval: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            density: DensityConfig::default(),
            routes_zoom: 12,
            detail_zoom: 13,
            heatmap_zoom: 2,
            heatmap_center: GpsPoint::new(20.0, 0.0),
            line_weight: 2.0,
            line_opacity: 0.6,
            fill_opacity: 0.6,
            geocode_interval: DEFAULT_GEOCODE_INTERVAL,
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// OAuth application credentials for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCredentials {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
}

impl AccountCredentials {
    /// Read credentials for the account at 1-based `index`:
    /// `STRAVA_CLIENT_ID_{index}` falling back to `STRAVA_CLIENT_ID`, and the
    /// same for the secret.
    pub fn from_env(index: usize, name: &str) -> Result<Self> {
        Self::from_lookup(index, name, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(index: usize, name: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |base: &str| {
            lookup(&format!("{}_{}", base, index))
                .or_else(|| lookup(base))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let client_id = read("STRAVA_CLIENT_ID")
            .ok_or_config(&format!("Missing STRAVA_CLIENT_ID for account '{}'", name))?;
        let client_secret = read("STRAVA_CLIENT_SECRET")
            .ok_or_config(&format!("Missing STRAVA_CLIENT_SECRET for account '{}'", name))?;

        Ok(Self {
            name: name.to_string(),
            client_id,
            client_secret,
        })
    }
}

/// Validate the account list: 1 to [`MAX_ACCOUNTS`] names, no duplicates.
///
/// Names are compared by their CSS id, so `m` and `M` (which would share a
/// reserved colour and a show/hide class) count as the same account.
pub fn validate_accounts(accounts: &[String]) -> Result<()> {
    let invalid = |message: String| Err(AtlasError::Config { message });

    if accounts.is_empty() || accounts.len() > MAX_ACCOUNTS {
        return invalid(format!(
            "Between 1 and {} accounts are required, got {}",
            MAX_ACCOUNTS,
            accounts.len()
        ));
    }
    for (i, name) in accounts.iter().enumerate() {
        if name.trim().is_empty() {
            return invalid("Account names must not be empty".to_string());
        }
        let id = account_css_id(name);
        if let Some(earlier) = accounts[..i].iter().find(|a| account_css_id(a) == id) {
            return invalid(format!(
                "Accounts '{}' and '{}' are indistinguishable",
                earlier, name
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Date window
// ============================================================================

/// Optional inclusive-start / exclusive-end date filter for fetching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Read `FROM_DATE` / `TO_DATE`. Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            from: lookup("FROM_DATE").and_then(|v| parse_date("FROM_DATE", &v)),
            to: lookup("TO_DATE").and_then(|v| parse_date("TO_DATE", &v)),
        }
    }

    /// Replace either bound with an explicitly given value.
    pub fn overridden(self, from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            from: from.and_then(|v| parse_date("--from", v)).or(self.from),
            to: to.and_then(|v| parse_date("--to", v)).or(self.to),
        }
    }

    /// Epoch seconds of local midnight at the start date.
    pub fn after(&self) -> Option<i64> {
        self.after_in(&Local)
    }

    /// Epoch seconds of local midnight at the end date.
    pub fn before(&self) -> Option<i64> {
        self.before_in(&Local)
    }

    pub fn after_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<i64> {
        self.from.and_then(|d| midnight(d, tz))
    }

    pub fn before_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<i64> {
        self.to.and_then(|d| midnight(d, tz))
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

fn parse_date(source: &str, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(
                "[Config] Ignoring {}={:?}: expected YYYY-MM-DD ({})",
                source, value, e
            );
            None
        }
    }
}

fn midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<i64> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReportConfig::default();
        assert_eq!(config.routes_zoom, 12);
        assert_eq!(config.detail_zoom, 13);
        assert_eq!(config.heatmap_zoom, 2);
        assert_eq!(config.heatmap_center, GpsPoint::new(20.0, 0.0));
        assert_eq!(config.density.base_radius, 400_000.0);
        assert_eq!(config.geocode_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_numbered_credentials_win() {
        let lookup = env(&[
            ("STRAVA_CLIENT_ID_2", "222"),
            ("STRAVA_CLIENT_ID", "000"),
            ("STRAVA_CLIENT_SECRET", "shared"),
        ]);
        let creds = AccountCredentials::from_lookup(2, "a", &lookup).unwrap();
        assert_eq!(creds.client_id, "222");
        assert_eq!(creds.client_secret, "shared");

        let first = AccountCredentials::from_lookup(1, "m", &lookup).unwrap();
        assert_eq!(first.client_id, "000");
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let lookup = env(&[("STRAVA_CLIENT_ID", "1"), ("STRAVA_CLIENT_SECRET_1", " ")]);
        let err = AccountCredentials::from_lookup(1, "m", lookup).unwrap_err();
        assert!(matches!(err, AtlasError::Config { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_accounts() {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(validate_accounts(&names(&["m", "a"])).is_ok());
        assert!(validate_accounts(&names(&[])).is_err());
        assert!(validate_accounts(&names(&["1", "2", "3", "4", "5", "6"])).is_err());
        assert!(validate_accounts(&names(&["m", "m"])).is_err());
        assert!(validate_accounts(&names(&["m", " "])).is_err());
    }

    #[test]
    fn test_accounts_differing_only_in_case_rejected() {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let err = validate_accounts(&names(&["m", "M"])).unwrap_err();
        assert!(matches!(err, AtlasError::Config { .. }));
        assert!(validate_accounts(&names(&["Trail Team", "trail-team"])).is_err());
        assert!(validate_accounts(&names(&["O'Brien", "obrien"])).is_err());
        assert!(validate_accounts(&names(&["m", "mm", "a"])).is_ok());
    }

    #[test]
    fn test_date_range() {
        let range = DateRange::from_lookup(env(&[
            ("FROM_DATE", "2024-01-01"),
            ("TO_DATE", "2024-13-45"),
        ]));
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(range.to, None);
        assert_eq!(range.after_in(&Utc), Some(1_704_067_200));
        assert_eq!(range.before_in(&Utc), None);
    }

    #[test]
    fn test_date_range_override() {
        let range = DateRange::from_lookup(env(&[("FROM_DATE", "2024-01-01")]))
            .overridden(Some("2023-06-01"), Some("not a date"));
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2023, 6, 1));
        assert_eq!(range.to, None);
        assert!(DateRange::default().is_unbounded());
    }
}
