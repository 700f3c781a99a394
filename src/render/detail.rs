//! Per-location detail maps and their file names.

use std::collections::HashSet;

use log::warn;

use super::{color_dot, escape_html, panel, Layer, MapDocument, PathStyle};
use crate::activity::decode_path;
use crate::aggregate::{AccountStats, LocationAggregate};
use crate::colors::AccountPalette;
use crate::config::ReportConfig;

/// Longest slug a detail file name may carry (before `location_` and `.html`).
pub const MAX_SLUG_LEN: usize = 50;

/// Slug for a location key: word characters, whitespace and hyphens are
/// kept, whitespace runs become one `_`, and the result is cut to
/// [`MAX_SLUG_LEN`] characters. Keys with nothing usable become `"unnamed"`.
pub fn sanitize_location_key(key: &str) -> String {
    let kept: String = key
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let slug: String = kept
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_SLUG_LEN)
        .collect();

    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

/// Hands out unique detail file names for one run.
///
/// Two keys that sanitize to the same slug get `_2`, `_3`, ... suffixes, with
/// the base shortened so the slug stays within [`MAX_SLUG_LEN`].
#[derive(Debug, Default)]
pub struct DetailNamer {
    used: HashSet<String>,
}

impl DetailNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `location_{slug}.html` for `key`.
    pub fn file_name(&mut self, key: &str) -> String {
        let base = sanitize_location_key(key);
        let mut slug = base.clone();
        let mut n = 2;
        while self.used.contains(&slug) {
            let suffix = format!("_{}", n);
            let keep = MAX_SLUG_LEN - suffix.len();
            slug = base.chars().take(keep).collect::<String>() + &suffix;
            n += 1;
        }
        self.used.insert(slug.clone());
        format!("location_{}.html", slug)
    }
}

/// Build the detail map for one location.
///
/// Returns `None` when no member has a start coordinate. The map is centred
/// on the mean of all member start coordinates.
pub fn build_location_map(
    location: &LocationAggregate,
    accounts: &[String],
    palette: &AccountPalette,
    config: &ReportConfig,
) -> Option<MapDocument> {
    let center = location.centroid()?;
    let mut doc = MapDocument::new(&location.key, center, config.detail_zoom);
    let mut routes_added = 0usize;

    for activity in &location.activities {
        let points = match decode_path(activity) {
            Ok(Some(points)) if !points.is_empty() => points,
            Ok(_) => continue,
            Err(e) => {
                warn!(
                    "[LocationMap] {}: skipping '{}' ({}): {}",
                    location.key, activity.name, activity.account, e
                );
                continue;
            }
        };

        let style = PathStyle::line(
            palette.color(&activity.account),
            config.line_weight,
            config.line_opacity,
        );
        let popup = format!(
            "{}: {}",
            escape_html(&activity.account),
            escape_html(&activity.name)
        );
        doc.add_layer(Layer::polyline(&points, style).with_popup(popup));
        routes_added += 1;
    }

    doc.add_overlay(legend(location, accounts, palette, routes_added));
    Some(doc)
}

/// Member counts per account, configured accounts first.
fn member_stats(location: &LocationAggregate, accounts: &[String]) -> Vec<AccountStats> {
    let mut order: Vec<&str> = accounts
        .iter()
        .map(String::as_str)
        .filter(|a| location.account_count(a) > 0)
        .collect();
    for (account, _) in &location.by_account {
        if !order.contains(&account.as_str()) {
            order.push(account);
        }
    }

    order
        .into_iter()
        .map(|account| {
            let mut stats = AccountStats::new(account);
            location
                .activities
                .iter()
                .filter(|a| a.account == account)
                .for_each(|a| stats.record(&a.kind));
            stats
        })
        .collect()
}

fn legend(
    location: &LocationAggregate,
    accounts: &[String],
    palette: &AccountPalette,
    routes_added: usize,
) -> String {
    let items: String = member_stats(location, accounts)
        .iter()
        .map(|s| {
            format!(
                r#"<div style="margin-bottom: 12px;">
    <div style="display: flex; align-items: center; gap: 8px; margin-bottom: 4px;">
        {dot}
        <span style="font-size: 13px; font-weight: 600; color: #1e293b;">{name}</span>
    </div>
    <div style="font-size: 11px; color: #64748b; margin-left: 20px;">R:{runs} W:{walks} B:{rides}</div>
</div>
"#,
                dot = color_dot(palette.color(&s.account), 12),
                name = escape_html(&s.account),
                runs = s.runs,
                walks = s.walks,
                rides = s.rides,
            )
        })
        .collect();

    let body = format!(
        r#"<div style="font-size: 16px; font-weight: 700; margin-bottom: 8px; color: #1e293b;">📍 {key}</div>
<div style="font-size: 13px; color: #64748b; margin-bottom: 16px;">{routes} routes</div>
{items}"#,
        key = escape_html(&location.key),
        routes = routes_added,
        items = items
    );

    panel("bottom: 30px; right: 30px;", 220, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Activity, ActivityKind};
    use crate::GpsPoint;

    const PATH: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn location(activities: Vec<Activity>) -> LocationAggregate {
        let mut by_account: Vec<(String, u32)> = Vec::new();
        for a in &activities {
            match by_account.iter_mut().find(|(name, _)| *name == a.account) {
                Some((_, n)) => *n += 1,
                None => by_account.push((a.account.clone(), 1)),
            }
        }
        LocationAggregate {
            key: "Zürich, Switzerland".to_string(),
            count: activities.len() as u32,
            representative: activities[0].start.unwrap_or(GpsPoint::new(0.0, 0.0)),
            activities,
            by_account,
        }
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_location_key("Berlin, Germany"), "Berlin_Germany");
        assert_eq!(sanitize_location_key("  São Paulo,  Brazil "), "São_Paulo_Brazil");
        assert_eq!(
            sanitize_location_key("Location (52.5°, 13.4°)"),
            "Location_525_134"
        );
        assert_eq!(sanitize_location_key("Saint-Denis"), "Saint-Denis");
        assert_eq!(sanitize_location_key("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_location_key("?!"), "unnamed");
    }

    #[test]
    fn test_sanitize_is_bounded_and_safe() {
        let keys = [
            "A very long location name that goes on, and on, and on, Somewhere Far Away",
            "Ünïcödé Städt, Österreich",
            "tab\tand/slash:colon*star",
        ];
        for key in keys {
            let slug = sanitize_location_key(key);
            assert!(slug.chars().count() <= MAX_SLUG_LEN, "{}", slug);
            assert!(slug
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-'));
        }
    }

    #[test]
    fn test_namer_dedupes() {
        let mut namer = DetailNamer::new();
        assert_eq!(namer.file_name("Paris, France"), "location_Paris_France.html");
        assert_eq!(namer.file_name("Paris France"), "location_Paris_France_2.html");
        assert_eq!(namer.file_name("Paris; France"), "location_Paris_France_3.html");

        let long = "x".repeat(80);
        let first = namer.file_name(&long);
        let second = namer.file_name(&long);
        assert_ne!(first, second);
        let slug = second
            .trim_start_matches("location_")
            .trim_end_matches(".html");
        assert_eq!(slug.chars().count(), MAX_SLUG_LEN);
        assert!(slug.ends_with("_2"));
    }

    #[test]
    fn test_detail_map() {
        let members = vec![
            Activity::new("m", ActivityKind::Run)
                .with_start(47.0, 8.0)
                .with_polyline(PATH),
            Activity::new("a", ActivityKind::Walk)
                .with_start(48.0, 9.0)
                .with_polyline("!!!"),
            Activity::new("a", ActivityKind::Ride).with_start(49.0, 10.0),
        ];
        let loc = location(members);
        let accounts = vec!["a".to_string(), "m".to_string()];
        let palette = AccountPalette::new(&accounts);

        let doc = build_location_map(&loc, &accounts, &palette, &ReportConfig::default()).unwrap();

        assert_eq!(doc.zoom, 13);
        assert!((doc.center.latitude - 48.0).abs() < 1e-9);
        assert!((doc.center.longitude - 9.0).abs() < 1e-9);
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.layers[0].style.color, "#8b5cf6");

        let legend = &doc.overlays[0];
        assert!(legend.contains("📍 Zürich, Switzerland"));
        assert!(legend.contains("1 routes"));
        assert!(legend.contains("R:0 W:1 B:1"));
        assert!(legend.contains("R:1 W:0 B:0"));
        // configured order: "a" before "m"
        assert!(legend.find("R:0 W:1 B:1") < legend.find("R:1 W:0 B:0"));
    }

    #[test]
    fn test_no_coordinates_no_map() {
        let loc = location(vec![Activity::new("m", ActivityKind::Run).with_polyline(PATH)]);
        let palette = AccountPalette::new(["m"]);
        assert!(
            build_location_map(&loc, &["m".to_string()], &palette, &ReportConfig::default())
                .is_none()
        );
    }
}
