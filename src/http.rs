//! HTTP clients for the activity source and the reverse geocoder.
//!
//! - [`StravaClient`] pages through an athlete's activities, stopping on a
//!   short page, a rate limit or any other failure, and keeps what it has
//! - [`NominatimGeocoder`] implements [`ReverseGeocoder`] against the public
//!   Nominatim instance; request spacing is enforced by the caller

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::activity::{Activity, StravaActivity};
use crate::config::DateRange;
use crate::error::{AtlasError, Result};
use crate::geocode::{Place, ReverseGeocoder};
use crate::GpsPoint;

pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
pub const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Nominatim requires an identifying User-Agent.
pub const USER_AGENT: &str = concat!("ActivityAtlas/", env!("CARGO_PKG_VERSION"));

/// Activities per page; a shorter page is the last one.
const PER_PAGE: usize = 100;

const API_TIMEOUT: Duration = Duration::from_secs(30);
const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a rate-limited Strava response.
const RATE_LIMIT_MESSAGE: &str = "Rate Limit Exceeded";

// ============================================================================
// Activity source
// ============================================================================

/// Outcome of one activities page.
#[derive(Debug)]
enum Page {
    Activities(Vec<StravaActivity>),
    RateLimited,
    Failed(String),
}

/// Classify a page response from its status and body.
fn parse_page(status: StatusCode, body: &str) -> Page {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Page::RateLimited;
    }

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string));
        return match message.as_deref() {
            Some(RATE_LIMIT_MESSAGE) => Page::RateLimited,
            Some(m) => Page::Failed(format!("HTTP {}: {}", status.as_u16(), m)),
            None => Page::Failed(format!("HTTP {}", status.as_u16())),
        };
    }

    match serde_json::from_str::<Vec<StravaActivity>>(body) {
        Ok(batch) => Page::Activities(batch),
        Err(e) => Page::Failed(format!("Parse error: {}", e)),
    }
}

/// Paginated client for `GET /athlete/activities`.
pub struct StravaClient {
    client: Client,
    base_url: String,
}

impl StravaClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(STRAVA_API_BASE)
    }

    /// Client against a different API root (e.g. a local mock).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(API_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch every activity of one account inside `range`.
    ///
    /// Never fails: a rate limit or a transport error ends the loop with a
    /// warning and the activities gathered so far are returned.
    pub async fn fetch_activities(
        &self,
        access_token: &str,
        account: &str,
        range: &DateRange,
    ) -> Vec<Activity> {
        let url = format!("{}/athlete/activities", self.base_url);
        let start = Instant::now();
        let mut activities = Vec::new();
        let mut page = 1u32;

        loop {
            let mut query = vec![
                ("page", page.to_string()),
                ("per_page", PER_PAGE.to_string()),
            ];
            if let Some(after) = range.after() {
                query.push(("after", after.to_string()));
            }
            if let Some(before) = range.before() {
                query.push(("before", before.to_string()));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(access_token)
                .query(&query)
                .send()
                .await;

            let (status, body) = match response {
                Ok(resp) => {
                    let status = resp.status();
                    match resp.text().await {
                        Ok(body) => (status, body),
                        Err(e) => {
                            warn!("[StravaClient] {}: failed to read page {}: {}", account, page, e);
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!("[StravaClient] {}: request for page {} failed: {}", account, page, e);
                    break;
                }
            };

            match parse_page(status, &body) {
                Page::Activities(batch) => {
                    let n = batch.len();
                    if n == 0 {
                        break;
                    }
                    activities.extend(batch.into_iter().map(|raw| raw.into_activity(account)));
                    info!(
                        "[StravaClient] {}: {} activities loaded...",
                        account,
                        activities.len()
                    );
                    if n < PER_PAGE {
                        break;
                    }
                    page += 1;
                }
                Page::RateLimited => {
                    warn!(
                        "[StravaClient] {}: rate limit exceeded on page {}, keeping {} activities",
                        account,
                        page,
                        activities.len()
                    );
                    break;
                }
                Page::Failed(reason) => {
                    warn!(
                        "[StravaClient] {}: stopping on page {}: {}",
                        account, page, reason
                    );
                    break;
                }
            }
        }

        info!(
            "[StravaClient] {}: {} activities in {:.2}s",
            account,
            activities.len(),
            start.elapsed().as_secs_f64()
        );
        activities
    }
}

// ============================================================================
// Reverse geocoder
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

impl NominatimResponse {
    /// City is the first of city / town / village / municipality / county.
    fn into_place(self) -> Option<Place> {
        let address = self.address?;
        let city = [
            address.city,
            address.town,
            address.village,
            address.municipality,
            address.county,
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty());

        let place = Place::new(city.as_deref(), address.country.as_deref());
        place.key().map(|_| place)
    }
}

/// Reverse geocoder backed by Nominatim.
pub struct NominatimGeocoder {
    client: Client,
    url: String,
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self> {
        Self::with_url(NOMINATIM_REVERSE_URL)
    }

    pub fn with_url(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(GEOCODE_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, point: GpsPoint) -> Result<Option<Place>> {
        let lat = point.latitude.to_string();
        let lon = point.longitude.to_string();

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
                ("zoom", "10"),
                ("addressdetails", "1"),
                ("accept-language", "en"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AtlasError::http(
                format!("reverse geocoding {},{}", lat, lon),
                Some(status.as_u16()),
            ));
        }

        let body: NominatimResponse = response.json().await?;
        let place = body.into_place();
        debug!("[NominatimGeocoder] {},{} -> {:?}", lat, lon, place);
        Ok(place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_activities() {
        let body = r#"[{"name": "Run", "type": "Run", "start_latlng": [1.0, 2.0]}, {"type": "Ride"}]"#;
        match parse_page(StatusCode::OK, body) {
            Page::Activities(batch) => assert_eq!(batch.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_page(StatusCode::OK, "[]"),
            Page::Activities(b) if b.is_empty()
        ));
    }

    #[test]
    fn test_parse_page_rate_limits() {
        assert!(matches!(
            parse_page(StatusCode::TOO_MANY_REQUESTS, ""),
            Page::RateLimited
        ));
        let body = r#"{"message": "Rate Limit Exceeded", "errors": []}"#;
        assert!(matches!(
            parse_page(StatusCode::FORBIDDEN, body),
            Page::RateLimited
        ));
    }

    #[test]
    fn test_parse_page_failures() {
        let body = r#"{"message": "Authorization Error"}"#;
        match parse_page(StatusCode::UNAUTHORIZED, body) {
            Page::Failed(reason) => assert_eq!(reason, "HTTP 401: Authorization Error"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_page(StatusCode::BAD_GATEWAY, "<html>"),
            Page::Failed(_)
        ));
        assert!(matches!(parse_page(StatusCode::OK, "{}"), Page::Failed(_)));
    }

    #[test]
    fn test_nominatim_city_fallbacks() {
        let json = r#"{"address": {"village": "Grindelwald", "county": "Interlaken", "country": "Switzerland"}}"#;
        let body: NominatimResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            body.into_place(),
            Some(Place::new(Some("Grindelwald"), Some("Switzerland")))
        );

        let json = r#"{"address": {"country": "Iceland"}}"#;
        let body: NominatimResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.into_place(), Some(Place::new(None, Some("Iceland"))));
    }

    #[test]
    fn test_nominatim_nothing_useful() {
        let body: NominatimResponse = serde_json::from_str(r#"{"error": "Unable to geocode"}"#).unwrap();
        assert_eq!(body.into_place(), None);

        let body: NominatimResponse = serde_json::from_str(r#"{"address": {"road": "A1"}}"#).unwrap();
        assert_eq!(body.into_place(), None);
    }
}
