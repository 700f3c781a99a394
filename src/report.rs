//! Artifact generation for one run.
//!
//! Order matters: detail maps are written before the heatmap so their
//! relative paths can be embedded as click-through links.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use log::{info, warn};

use crate::activity::Activity;
use crate::aggregate::build_atlas;
use crate::colors::AccountPalette;
use crate::config::ReportConfig;
use crate::error::Result;
use crate::geocode::ReverseGeocoder;
use crate::location::LocationResolver;
use crate::render::{build_heatmap, build_location_map, build_routes_map, DetailNamer};

/// Format of the run timestamp embedded in every artifact name.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Log progress every N detail maps.
const DETAIL_PROGRESS_EVERY: usize = 10;

/// Paths written by one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportOutputs {
    /// `combined_routes_{ts}.html`, absent when no activity had coordinates
    pub routes: Option<PathBuf>,
    /// `combined_heatmap_{ts}.html`, absent when there were no locations
    pub heatmap: Option<PathBuf>,
    /// `location_maps_{ts}/`, absent when there were no locations
    pub location_dir: Option<PathBuf>,
    /// Location key -> detail map path, in location order
    pub location_maps: Vec<(String, PathBuf)>,
}

/// Writes the routes map, the detail maps and the heatmap.
pub struct ReportGenerator<G> {
    config: ReportConfig,
    resolver: LocationResolver<G>,
    timestamp: String,
}

impl<G: ReverseGeocoder> ReportGenerator<G> {
    /// Generator stamped with the current local time.
    pub fn new(config: ReportConfig, geocoder: G) -> Self {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(config, geocoder, &timestamp)
    }

    pub fn with_timestamp(config: ReportConfig, geocoder: G, timestamp: &str) -> Self {
        let resolver = LocationResolver::with_interval(geocoder, config.geocode_interval);
        Self {
            config,
            resolver,
            timestamp: timestamp.to_string(),
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Generate every artifact for `activities`.
    ///
    /// `accounts` is the configured account order (legend and colour order).
    /// A missing routes map or heatmap is not an error; only filesystem
    /// failures are.
    pub async fn generate(
        &mut self,
        activities: &[Activity],
        accounts: &[String],
    ) -> Result<ReportOutputs> {
        let start = Instant::now();
        let tracked: Vec<Activity> = activities
            .iter()
            .filter(|a| a.kind.is_tracked())
            .cloned()
            .collect();
        info!(
            "[Report] {} of {} activities are runs, walks or rides",
            tracked.len(),
            activities.len()
        );

        let mut palette = AccountPalette::new(accounts);
        for activity in &tracked {
            palette.assign(&activity.account);
        }

        fs::create_dir_all(&self.config.output_dir)?;
        let mut outputs = ReportOutputs::default();

        // Combined routes
        match build_routes_map(&tracked, accounts, &palette, &self.config) {
            Ok(doc) => {
                let path = self
                    .config
                    .output_dir
                    .join(format!("combined_routes_{}.html", self.timestamp));
                doc.write_to(&path)?;
                info!("[Report] Combined routes map: {}", path.display());
                outputs.routes = Some(path);
            }
            Err(e) => warn!("[Report] Combined routes map not created: {}", e),
        }

        // Locations
        let atlas = build_atlas(&tracked, accounts, &mut self.resolver).await;
        if atlas.is_empty() {
            warn!("[Report] No locations, skipping detail maps and heatmap");
            return Ok(outputs);
        }

        let folder = format!("location_maps_{}", self.timestamp);
        let location_dir = self.config.output_dir.join(&folder);
        fs::create_dir_all(&location_dir)?;

        let mut namer = DetailNamer::new();
        let mut links: HashMap<String, String> = HashMap::new();
        let total = atlas.locations.len();

        for (i, location) in atlas.locations.iter().enumerate() {
            if (i + 1) % DETAIL_PROGRESS_EVERY == 0 {
                info!("[Report] {}/{} locations...", i + 1, total);
            }

            let Some(doc) = build_location_map(location, accounts, &palette, &self.config) else {
                info!("[Report] No coordinates for '{}', no detail map", location.key);
                continue;
            };

            let file_name = namer.file_name(&location.key);
            let path = location_dir.join(&file_name);
            doc.write_to(&path)?;
            links.insert(location.key.clone(), format!("./{}/{}", folder, file_name));
            outputs.location_maps.push((location.key.clone(), path));
        }
        info!("[Report] {} location maps created", outputs.location_maps.len());
        outputs.location_dir = Some(location_dir);

        // Heatmap
        if let Some(doc) = build_heatmap(&atlas, &palette, &links, &self.config) {
            let path = self
                .config
                .output_dir
                .join(format!("combined_heatmap_{}.html", self.timestamp));
            doc.write_to(&path)?;
            outputs.heatmap = Some(path);
        }

        info!(
            "[Report] Done in {:.2}s: {} locations, {} continents, {} countries, {} clickable location maps",
            start.elapsed().as_secs_f64(),
            atlas.locations.len(),
            atlas.visited.continents.len(),
            atlas.visited.countries.len(),
            links.len()
        );
        Ok(outputs)
    }
}
