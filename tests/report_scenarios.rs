//! End-to-end report scenarios.
//!
//! Runs the whole pipeline (location resolution -> aggregation -> all three
//! artifact kinds) into a temp directory with a canned reverse geocoder.
//!
//! Run with: `cargo test --test report_scenarios`

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use activity_atlas::{
    region_color, sanitize_location_key, Activity, ActivityKind, CoordCell, GpsPoint, Place,
    ReportConfig, ReportGenerator, ReportOutputs, Result, ReverseGeocoder,
};
use tempfile::TempDir;

const TS: &str = "20240501_120000";
const PATH: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

/// Names cells from a fixed table and counts calls.
#[derive(Clone, Default)]
struct CannedGeocoder {
    places: Vec<(CoordCell, Place)>,
    calls: Arc<AtomicU32>,
}

impl CannedGeocoder {
    fn with(mut self, lat: f64, lng: f64, city: &str, country: &str) -> Self {
        self.places.push((
            CoordCell::from_point(GpsPoint::new(lat, lng)),
            Place::new(Some(city), Some(country)),
        ));
        self
    }
}

impl ReverseGeocoder for CannedGeocoder {
    async fn reverse(&self, point: GpsPoint) -> Result<Option<Place>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let cell = CoordCell::from_point(point);
        Ok(self
            .places
            .iter()
            .find(|(c, _)| *c == cell)
            .map(|(_, p)| p.clone()))
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

async fn run(
    dir: &Path,
    geocoder: CannedGeocoder,
    activities: &[Activity],
    accounts: &[&str],
) -> ReportOutputs {
    let config = ReportConfig {
        output_dir: dir.to_path_buf(),
        geocode_interval: Duration::ZERO,
        ..ReportConfig::default()
    };
    let mut generator = ReportGenerator::with_timestamp(config, geocoder, TS);
    generator
        .generate(activities, &names(accounts))
        .await
        .expect("report generation failed")
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("artifact missing")
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_two_accounts_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let geocoder = CannedGeocoder::default().with(47.4, 8.5, "Zurich", "Switzerland");
    let calls = Arc::clone(&geocoder.calls);

    let activities = vec![
        Activity::new("m", ActivityKind::Run)
            .with_name("Lake loop")
            .with_start(47.37, 8.54)
            .with_polyline(PATH),
        Activity::new("a", ActivityKind::Run)
            .with_start(47.41, 8.52)
            .with_polyline(PATH),
        Activity::new("m", ActivityKind::Ride)
            .with_start(-33.87, 151.21)
            .with_place(Some("Sydney"), Some("Australia"))
            .with_polyline(PATH),
    ];

    let outputs = run(tmp.path(), geocoder, &activities, &["m", "a"]).await;

    // One geocoder call for the shared Zurich cell
    assert_eq!(calls.load(Ordering::Relaxed), 1);

    let routes = outputs.routes.as_ref().unwrap();
    assert_eq!(routes, &tmp.path().join(format!("combined_routes_{}.html", TS)));
    let routes_html = read(routes);
    assert!(routes_html.contains("#8b5cf6"));
    assert!(routes_html.contains("#10b981"));
    assert!(routes_html.contains("route-m"));
    assert!(routes_html.contains("Total routes: 3"));

    let location_dir = outputs.location_dir.as_ref().unwrap();
    assert_eq!(location_dir, &tmp.path().join(format!("location_maps_{}", TS)));
    assert_eq!(outputs.location_maps.len(), 2);
    assert_eq!(outputs.location_maps[0].0, "Zurich, Switzerland");
    assert_eq!(outputs.location_maps[1].0, "Sydney, Australia");
    for (_, path) in &outputs.location_maps {
        assert!(path.starts_with(location_dir));
        assert!(path.exists());
    }

    let heatmap_html = read(outputs.heatmap.as_ref().unwrap());
    assert!(heatmap_html.contains("2 accounts • 3 workouts"));
    assert!(heatmap_html.contains(&format!(
        "./location_maps_{}/location_Zurich_Switzerland.html",
        TS
    )));
    assert!(heatmap_html.contains(&format!(
        "./location_maps_{}/location_Sydney_Australia.html",
        TS
    )));
    assert!(heatmap_html.contains("Europe (2), Oceania (1) (2)"));
    assert!(heatmap_html.contains("Australia (1), Switzerland (2) (2)"));
    // m: 1 run + 1 ride, a: 1 run
    assert!(heatmap_html.contains("Rides: <strong>1</strong>"));
    assert!(heatmap_html.contains("Total: <strong>2</strong>"));
    assert!(heatmap_html.contains("Total: <strong>1</strong>"));

    let zurich_html = read(&outputs.location_maps[0].1);
    assert!(zurich_html.contains("📍 Zurich, Switzerland"));
    assert!(zurich_html.contains("2 routes"));
    assert!(zurich_html.contains("], 13);"));
}

#[tokio::test]
async fn test_untracked_kinds_are_ignored() {
    let tmp = TempDir::new().unwrap();
    let activities = vec![
        Activity::new("m", ActivityKind::Run)
            .with_start(45.76, 4.84)
            .with_place(Some("Lyon"), Some("France"))
            .with_polyline(PATH),
        Activity::new("m", ActivityKind::parse("Hike"))
            .with_name("Mont Blanc")
            .with_start(45.83, 6.86)
            .with_place(Some("Chamonix"), Some("France"))
            .with_polyline(PATH),
    ];

    let outputs = run(tmp.path(), CannedGeocoder::default(), &activities, &["m"]).await;

    assert_eq!(outputs.location_maps.len(), 1);
    let heatmap_html = read(outputs.heatmap.as_ref().unwrap());
    assert!(heatmap_html.contains("1 accounts • 1 workouts"));
    assert!(!heatmap_html.contains("Chamonix"));
    let routes_html = read(outputs.routes.as_ref().unwrap());
    assert!(!routes_html.contains("Mont Blanc"));
    assert!(routes_html.contains("Total routes: 1"));
}

#[tokio::test]
async fn test_no_coordinates_produces_nothing() {
    let tmp = TempDir::new().unwrap();
    let activities = vec![
        Activity::new("m", ActivityKind::Run).with_place(Some("Oslo"), Some("Norway")),
        Activity::new("a", ActivityKind::Walk).with_polyline(PATH),
    ];

    let outputs = run(tmp.path(), CannedGeocoder::default(), &activities, &["m", "a"]).await;

    assert_eq!(outputs, ReportOutputs::default());
    let written: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
    assert!(written.is_empty());
}

#[tokio::test]
async fn test_region_colour_shared_across_runs() {
    let activities = vec![Activity::new("o", ActivityKind::Walk)
        .with_start(-22.9, -43.2)
        .with_place(Some("Rio de Janeiro"), Some("Brazil"))];

    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let a = run(first.path(), CannedGeocoder::default(), &activities, &["o"]).await;
    let b = run(second.path(), CannedGeocoder::default(), &activities, &["o"]).await;

    let color = region_color("Rio de Janeiro, Brazil");
    let needle = format!("\"fillColor\":\"{}\"", color);
    assert!(read(a.heatmap.as_ref().unwrap()).contains(&needle));
    assert!(read(b.heatmap.as_ref().unwrap()).contains(&needle));

    // The account colour, not the region colour, paints the detail routes
    let detail = read(&a.location_maps[0].1);
    assert!(detail.contains("#f97316"));
}

#[tokio::test]
async fn test_colliding_and_long_keys() {
    let tmp = TempDir::new().unwrap();
    let long_city = "Llanfairpwllgwyngyllgogerychwyrndrobwllllantysiliogogogoch";
    let activities = vec![
        Activity::new("m", ActivityKind::Run)
            .with_start(53.22, -4.2)
            .with_place(Some(long_city), Some("United Kingdom"))
            .with_polyline(PATH),
        Activity::new("m", ActivityKind::Run)
            .with_start(10.0, 10.0)
            .with_place(Some("St. Louis"), Some("Senegal")),
        Activity::new("m", ActivityKind::Run)
            .with_start(38.6, -90.2)
            .with_place(Some("St Louis"), Some("Senegal")),
    ];

    let outputs = run(tmp.path(), CannedGeocoder::default(), &activities, &["m"]).await;

    assert_eq!(outputs.location_maps.len(), 3);
    let files: Vec<String> = outputs
        .location_maps
        .iter()
        .map(|(_, p)| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files[1], "location_St_Louis_Senegal.html");
    assert_eq!(files[2], "location_St_Louis_Senegal_2.html");
    for file in &files {
        let slug = file
            .strip_prefix("location_")
            .and_then(|f| f.strip_suffix(".html"))
            .unwrap();
        assert!(slug.chars().count() <= 50);
        assert!(slug.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'));
    }
    assert!(sanitize_location_key(&format!("{}, United Kingdom", long_city)).len() <= 50);
}

#[tokio::test]
async fn test_geocoder_misses_fall_back_to_cells() {
    let tmp = TempDir::new().unwrap();
    let geocoder = CannedGeocoder::default();
    let calls = Arc::clone(&geocoder.calls);
    let activities = vec![
        Activity::new("m", ActivityKind::Run).with_start(12.34, 56.78),
        Activity::new("m", ActivityKind::Walk).with_start(12.31, 56.81),
    ];

    let outputs = run(tmp.path(), geocoder, &activities, &["m"]).await;

    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(outputs.location_maps.len(), 1);
    assert_eq!(outputs.location_maps[0].0, "Location (12.3°, 56.8°)");
    let heatmap_html = read(outputs.heatmap.as_ref().unwrap());
    // Coordinate cells are neither countries nor continents
    assert!(heatmap_html.contains("None yet (0)"));
}
