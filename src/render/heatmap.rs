//! Combined heatmap: one circle per location, sized by activity count and
//! coloured by region, plus a summary sidebar.

use std::collections::{BTreeMap, HashMap};

use log::info;

use super::{color_dot, escape_html, Layer, MapDocument, PathStyle, FONT_STACK};
use crate::aggregate::{AccountStats, Atlas, LocationAggregate};
use crate::colors::{region_color, AccountPalette};
use crate::config::ReportConfig;
use crate::density::DensityScale;

/// Build the heatmap for `atlas`.
///
/// `links` maps a location key to the relative path of its detail map;
/// locations without an entry get no click-through popup. Returns `None` when
/// the atlas has no locations.
pub fn build_heatmap(
    atlas: &Atlas,
    palette: &AccountPalette,
    links: &HashMap<String, String>,
    config: &ReportConfig,
) -> Option<MapDocument> {
    if atlas.is_empty() {
        return None;
    }

    let scale = DensityScale::from_counts(atlas.locations.iter().map(|l| l.count), config.density);
    let mut doc = MapDocument::new("Combined Heatmap", config.heatmap_center, config.heatmap_zoom)
        .with_world_copy_jump();

    for location in &atlas.locations {
        let color = region_color(&location.key);
        let link = links.get(&location.key);

        let mut layer = Layer::circle(
            location.representative,
            scale.radius(location.count),
            PathStyle::filled(color, config.line_weight, config.fill_opacity),
        )
        .with_tooltip(tooltip(location, link.is_some()));

        if let Some(href) = link {
            layer = layer.with_popup(popup(location, href));
        }
        doc.add_layer(layer);
    }

    doc.add_overlay(sidebar(atlas, palette));

    info!(
        "[Heatmap] {} circles (counts {}..={}), {} linked",
        atlas.locations.len(),
        scale.min(),
        scale.max(),
        atlas
            .locations
            .iter()
            .filter(|l| links.contains_key(&l.key))
            .count()
    );
    Some(doc)
}

fn breakdown(location: &LocationAggregate, separator: &str) -> String {
    location
        .by_account
        .iter()
        .map(|(account, n)| format!("{}: {}", escape_html(account), n))
        .collect::<Vec<_>>()
        .join(separator)
}

fn tooltip(location: &LocationAggregate, linked: bool) -> String {
    let hint = if linked {
        "<br><br>🖱️ <i>Click to view routes</i>"
    } else {
        ""
    };
    format!(
        "<b>{key}</b><br>Total: {count} workouts<br><br>{breakdown}{hint}",
        key = escape_html(&location.key),
        count = location.count,
        breakdown = breakdown(location, "<br>"),
        hint = hint
    )
}

fn popup(location: &LocationAggregate, href: &str) -> String {
    format!(
        r#"<div style="font-family: {font}; padding: 10px;">
    <h3 style="margin: 0 0 10px 0;">{key}</h3>
    <p style="margin: 5px 0;"><strong>{count} workouts</strong></p>
    <div style="margin: 8px 0; font-size: 13px;">{breakdown}</div>
    <button onclick="window.open('{href}', '_blank')"
            style="margin-top: 10px; padding: 8px 16px; background: #3b82f6; color: white;
                   border: none; border-radius: 6px; cursor: pointer; font-weight: 600;">📍 View All Routes</button>
</div>"#,
        font = FONT_STACK,
        key = escape_html(&location.key),
        count = location.count,
        breakdown = breakdown(location, "<br/>"),
        href = escape_html(href),
    )
}

/// `"A (2), B (5) (2)"`: names with counts, then the number of distinct names.
fn visited_line<K: std::fmt::Display>(visited: &BTreeMap<K, u32>) -> String {
    if visited.is_empty() {
        return "None yet (0)".to_string();
    }
    let names = visited
        .iter()
        .map(|(name, n)| format!("{} ({})", escape_html(&name.to_string()), n))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} ({})", names, visited.len())
}

fn visited_block(title: &str, line: &str) -> String {
    format!(
        r#"<div style="margin-bottom: 20px; padding: 16px; background: #f8fafc; border-radius: 8px;">
    <div style="font-size: 14px; font-weight: 600; color: #1e293b; margin-bottom: 8px;">{title}</div>
    <div style="font-size: 12px; color: #64748b; line-height: 1.6;">{line}</div>
</div>"#,
        title = title,
        line = line
    )
}

fn account_block(stats: &AccountStats, palette: &AccountPalette) -> String {
    let row = |label: &str, value: u32| {
        format!(
            r#"<div style="font-size: 13px; color: #64748b;">{}: <strong>{}</strong></div>"#,
            label, value
        )
    };
    format!(
        r#"<div style="border-top: 1px solid #e2e8f0; padding-top: 16px; margin-top: 16px;">
    <div style="display: flex; align-items: center; gap: 8px; margin-bottom: 12px;">
        {dot}
        <div style="font-size: 15px; font-weight: 600; color: #1e293b;">{name}</div>
    </div>
    <div style="display: flex; flex-direction: column; gap: 6px; margin-left: 24px;">
        {runs}
        {walks}
        {rides}
        <div style="font-size: 14px; color: #1e293b; margin-top: 4px;">Total: <strong>{total}</strong></div>
    </div>
</div>"#,
        dot = color_dot(palette.color(&stats.account), 16),
        name = escape_html(&stats.account),
        runs = row("Runs", stats.runs),
        walks = row("Walks", stats.walks),
        rides = row("Rides", stats.rides),
        total = stats.total,
    )
}

fn sidebar(atlas: &Atlas, palette: &AccountPalette) -> String {
    let accounts: String = atlas
        .accounts
        .iter()
        .map(|s| account_block(s, palette))
        .collect();

    format!(
        r#"<div style="position: fixed; top: 20px; left: 20px; width: 280px; max-height: calc(100vh - 40px);
            background: white; border-radius: 16px; box-shadow: 0 4px 24px rgba(0,0,0,0.15);
            z-index: 9999; padding: 24px; font-family: {font}; overflow-y: auto;">
    <div style="margin-bottom: 20px;">
        <h2 style="margin: 0 0 8px 0; font-size: 24px; font-weight: 700; color: #1e293b;">🤝 Combined Journey</h2>
        <p style="margin: 0; font-size: 12px; color: #64748b;">{account_count} accounts • {activity_count} workouts</p>
    </div>
    <div style="margin-bottom: 20px;">
        <div style="font-size: 36px; font-weight: 700; color: #3b82f6; line-height: 1;">{location_count}</div>
        <div style="font-size: 13px; color: #64748b; margin-top: 4px;">unique locations</div>
    </div>
    {continents}
    {countries}
    {accounts}
    <div style="border-top: 1px solid #e2e8f0; margin-top: 20px; padding-top: 16px; font-size: 11px; color: #94a3b8;">
        🖱️ Click circles to view detailed routes
    </div>
</div>"#,
        font = FONT_STACK,
        account_count = atlas.accounts.len(),
        activity_count = atlas.activity_count,
        location_count = atlas.locations.len(),
        continents = visited_block("🌍 Continents Visited", &visited_line(&atlas.visited.continents)),
        countries = visited_block("🗺️ Countries Visited", &visited_line(&atlas.visited.countries)),
        accounts = accounts,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Activity, ActivityKind};
    use crate::aggregate::build_atlas;
    use crate::location::tests::FakeGeocoder;
    use crate::location::LocationResolver;
    use crate::render::Shape;
    use std::time::Duration;

    async fn atlas(activities: &[Activity], accounts: &[String]) -> Atlas {
        let mut resolver = LocationResolver::with_interval(FakeGeocoder::new(&[]), Duration::ZERO);
        build_atlas(activities, accounts, &mut resolver).await
    }

    fn at(account: &str, lat: f64, lng: f64, city: &str, country: &str) -> Activity {
        Activity::new(account, ActivityKind::Run)
            .with_start(lat, lng)
            .with_place(Some(city), Some(country))
    }

    #[tokio::test]
    async fn test_circles_and_links() {
        let accounts = vec!["m".to_string(), "a".to_string()];
        let activities = vec![
            at("m", 48.85, 2.35, "Paris", "France"),
            at("a", 48.86, 2.34, "Paris", "France"),
            at("a", 48.87, 2.33, "Paris", "France"),
            at("m", 35.68, 139.69, "Tokyo", "Japan"),
        ];
        let atlas = atlas(&activities, &accounts).await;
        let palette = AccountPalette::new(&accounts);
        let mut links = HashMap::new();
        links.insert(
            "Paris, France".to_string(),
            "./location_maps_x/location_Paris_France.html".to_string(),
        );

        let doc = build_heatmap(&atlas, &palette, &links, &ReportConfig::default()).unwrap();

        assert!(doc.world_copy_jump);
        assert_eq!(doc.zoom, 2);
        assert_eq!(doc.layers.len(), 2);

        let paris = &doc.layers[0];
        match &paris.shape {
            Shape::Circle { center, radius } => {
                assert_eq!(*center, [48.85, 2.35]);
                assert_eq!(*radius, 1_000_000.0);
            }
            other => panic!("expected circle, got {:?}", other),
        }
        assert_eq!(paris.style.color, region_color("Paris, France"));
        let tip = paris.tooltip.as_deref().unwrap();
        assert!(tip.contains("Total: 3 workouts"));
        assert!(tip.contains("m: 1<br>a: 2"));
        assert!(tip.contains("Click to view routes"));
        assert!(paris
            .popup
            .as_deref()
            .unwrap()
            .contains("window.open('./location_maps_x/location_Paris_France.html', '_blank')"));

        let tokyo = &doc.layers[1];
        assert!(matches!(tokyo.shape, Shape::Circle { radius, .. } if radius == 400_000.0));
        assert!(tokyo.popup.is_none());
        assert!(!tokyo.tooltip.as_deref().unwrap().contains("Click"));
    }

    #[tokio::test]
    async fn test_sidebar_summary() {
        let accounts = vec!["m".to_string(), "a".to_string()];
        let activities = vec![
            at("m", 48.85, 2.35, "Paris", "France"),
            at("m", 35.68, 139.69, "Tokyo", "Japan"),
            at("m", 10.0, 10.0, "Nowhere", "Atlantis"),
        ];
        let atlas = atlas(&activities, &accounts).await;
        let palette = AccountPalette::new(&accounts);
        let html = build_heatmap(&atlas, &palette, &HashMap::new(), &ReportConfig::default())
            .unwrap()
            .to_html()
            .unwrap();

        assert!(html.contains("2 accounts • 3 workouts"));
        assert!(html.contains("Asia (1), Europe (1) (2)"));
        assert!(html.contains("Atlantis (1), France (1), Japan (1) (3)"));
        assert!(html.contains("Runs: <strong>3</strong>"));
        assert!(html.contains("Click circles to view detailed routes"));
    }

    #[test]
    fn test_visited_line_empty() {
        let empty: BTreeMap<String, u32> = BTreeMap::new();
        assert_eq!(visited_line(&empty), "None yet (0)");
    }

    #[test]
    fn test_empty_atlas() {
        let palette = AccountPalette::default();
        assert!(build_heatmap(&Atlas::default(), &palette, &HashMap::new(), &ReportConfig::default())
            .is_none());
    }
}
