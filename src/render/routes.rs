//! Combined routes map: every tracked activity's path, coloured by account,
//! with a legend that can hide and show each account's routes.

use log::{info, warn};

use super::{color_dot, escape_html, panel, Layer, MapDocument, PathStyle};
use crate::activity::{decode_path, Activity};
use crate::aggregate::{account_stats, mappable, AccountStats};
use crate::colors::{account_css_id, AccountPalette};
use crate::config::ReportConfig;
use crate::error::{AtlasError, Result};

/// Hides/shows every SVG path carrying the `route-{id}` class.
const TOGGLE_SCRIPT: &str = r#"<script>
var accountVisibility = {};

function toggleAccount(accountId) {
    var elements = document.querySelectorAll('.route-' + accountId);
    var button = document.getElementById('btn-' + accountId);
    var isVisible = accountVisibility[accountId] !== false;

    elements.forEach(function(el) {
        el.style.display = isVisible ? 'none' : '';
    });

    accountVisibility[accountId] = !isVisible;
    button.textContent = isVisible ? 'SHOW' : 'HIDE';
    button.style.opacity = isVisible ? '0.5' : '1';
}
</script>"#;

/// Build the combined routes map.
///
/// Only tracked activities with a start coordinate are drawn and counted.
/// Centred on the first of them in input order; fails with
/// [`AtlasError::NoCoordinates`] when there is none. Paths that fail to
/// decode are skipped with a warning.
pub fn build_routes_map(
    activities: &[Activity],
    accounts: &[String],
    palette: &AccountPalette,
    config: &ReportConfig,
) -> Result<MapDocument> {
    // Drawn routes and legend counts come from the same subset
    let drawable = mappable(activities);

    let center = drawable
        .first()
        .and_then(|a| a.start)
        .ok_or(AtlasError::NoCoordinates)?;

    let mut doc = MapDocument::new("Combined Routes", center, config.routes_zoom);
    let mut routes_added = 0usize;

    for activity in &drawable {
        let points = match decode_path(activity) {
            Ok(Some(points)) if !points.is_empty() => points,
            Ok(_) => continue,
            Err(e) => {
                warn!(
                    "[RoutesMap] Skipping '{}' ({}): {}",
                    activity.name, activity.account, e
                );
                continue;
            }
        };

        let color = palette.color(&activity.account);
        let style = PathStyle::line(color, config.line_weight, config.line_opacity)
            .with_class(format!("route-{}", account_css_id(&activity.account)));
        let popup = format!(
            "{}: {} ({})",
            escape_html(&activity.account),
            escape_html(&activity.name),
            activity.kind
        );

        doc.add_layer(Layer::polyline(&points, style).with_popup(popup));
        routes_added += 1;
    }

    let stats = account_stats(accounts, drawable.iter().copied());
    doc.add_overlay(legend(&stats, palette, routes_added));
    doc.add_overlay(TOGGLE_SCRIPT.to_string());

    info!(
        "[RoutesMap] {} routes from {} accounts",
        routes_added,
        stats.len()
    );
    Ok(doc)
}

fn legend(stats: &[AccountStats], palette: &AccountPalette, routes_added: usize) -> String {
    let items: String = stats
        .iter()
        .map(|s| {
            let color = palette.color(&s.account);
            let id = account_css_id(&s.account);
            format!(
                r#"<div style="margin-bottom: 16px; padding-bottom: 16px; border-bottom: 1px solid #e2e8f0;">
    <div style="display: flex; align-items: center; gap: 8px; margin-bottom: 8px;">
        {dot}
        <span style="font-size: 15px; font-weight: 600; color: #1e293b;">{name}</span>
        <button onclick="toggleAccount('{id}')" id="btn-{id}"
                style="margin-left: auto; padding: 4px 8px; background: {color}; color: white;
                       border: none; border-radius: 4px; cursor: pointer; font-size: 11px; font-weight: 600;">HIDE</button>
    </div>
    <div style="font-size: 13px; color: #64748b; margin-left: 24px;">
        <div>Runs: {runs}</div>
        <div>Walks: {walks}</div>
        <div>Rides: {rides}</div>
        <div style="margin-top: 4px; font-weight: 600;">Total: {total}</div>
    </div>
</div>
"#,
                dot = color_dot(color, 16),
                name = escape_html(&s.account),
                id = id,
                color = color,
                runs = s.runs,
                walks = s.walks,
                rides = s.rides,
                total = s.total,
            )
        })
        .collect();

    let body = format!(
        r#"<div style="font-size: 16px; font-weight: 700; margin-bottom: 16px; color: #1e293b;">🤝 Combined Journey</div>
{items}
<div style="font-size: 12px; color: #94a3b8; margin-top: 12px;">Total routes: {routes}</div>"#,
        items = items,
        routes = routes_added
    );

    panel("bottom: 30px; right: 30px;", 240, &body)
}
