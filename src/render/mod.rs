//! Map documents and the three artifact builders.
//!
//! [`MapDocument`] is the rendering backend: a centre, a zoom level, a list of
//! drawing primitives and free-form HTML overlays, serialized into a
//! self-contained Leaflet page. The primitives are embedded as one JSON array
//! and drawn by a small script, so the Rust side never formats JavaScript
//! by hand.

use std::fs;
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::GpsPoint;

mod detail;
mod heatmap;
mod routes;

pub use detail::{build_location_map, sanitize_location_key, DetailNamer, MAX_SLUG_LEN};
pub use heatmap::build_heatmap;
pub use routes::build_routes_map;

const LEAFLET_VERSION: &str = "1.9.4";

const FONT_STACK: &str = "-apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif";

// ============================================================================
// Primitives
// ============================================================================

/// Leaflet path options shared by polylines and circles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStyle {
    pub color: String,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    /// CSS class put on the SVG element, used for client-side show/hide
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl PathStyle {
    /// Stroke-only style for a route line.
    pub fn line(color: &str, weight: f64, opacity: f64) -> Self {
        Self {
            color: color.to_string(),
            weight,
            opacity: Some(opacity),
            ..Default::default()
        }
    }

    /// Stroke and fill in the same colour.
    pub fn filled(color: &str, weight: f64, fill_opacity: f64) -> Self {
        Self {
            color: color.to_string(),
            weight,
            fill: Some(true),
            fill_color: Some(color.to_string()),
            fill_opacity: Some(fill_opacity),
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

/// What a layer draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    Polyline { points: Vec<[f64; 2]> },
    /// `radius` in metres
    Circle { center: [f64; 2], radius: f64 },
}

/// One drawing primitive with its style and optional HTML tooltip/popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    #[serde(flatten)]
    pub shape: Shape,
    pub style: PathStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

impl Layer {
    pub fn polyline(points: &[GpsPoint], style: PathStyle) -> Self {
        Self {
            shape: Shape::Polyline {
                points: points.iter().map(|p| p.to_lat_lng()).collect(),
            },
            style,
            tooltip: None,
            popup: None,
        }
    }

    pub fn circle(center: GpsPoint, radius: f64, style: PathStyle) -> Self {
        Self {
            shape: Shape::Circle {
                center: center.to_lat_lng(),
                radius,
            },
            style,
            tooltip: None,
            popup: None,
        }
    }

    pub fn with_tooltip(mut self, html: String) -> Self {
        self.tooltip = Some(html);
        self
    }

    pub fn with_popup(mut self, html: String) -> Self {
        self.popup = Some(html);
        self
    }
}

// ============================================================================
// Document
// ============================================================================

/// A self-contained map page.
#[derive(Debug, Clone)]
pub struct MapDocument {
    pub title: String,
    pub center: GpsPoint,
    pub zoom: u8,
    pub world_copy_jump: bool,
    pub layers: Vec<Layer>,
    /// Raw HTML appended to the body (legends, sidebars, scripts)
    pub overlays: Vec<String>,
}

impl MapDocument {
    pub fn new(title: &str, center: GpsPoint, zoom: u8) -> Self {
        Self {
            title: title.to_string(),
            center,
            zoom,
            world_copy_jump: false,
            layers: Vec::new(),
            overlays: Vec::new(),
        }
    }

    pub fn with_world_copy_jump(mut self) -> Self {
        self.world_copy_jump = true;
        self
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn add_overlay(&mut self, html: String) {
        self.overlays.push(html);
    }

    /// Render the full HTML page.
    pub fn to_html(&self) -> Result<String> {
        let layers = script_safe_json(&serde_json::to_string(&self.layers)?);
        let center = serde_json::to_string(&self.center.to_lat_lng())?;
        let overlays = self.overlays.join("\n");

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <link rel="stylesheet" href="https://unpkg.com/leaflet@{version}/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@{version}/dist/leaflet.js"></script>
    <style>
        html, body {{ margin: 0; padding: 0; height: 100%; }}
        #map {{ width: 100%; height: 100vh; }}
    </style>
</head>
<body>
<div id="map"></div>
{overlays}
<script>
    var map = L.map('map', {{ worldCopyJump: {world_copy_jump} }}).setView({center}, {zoom});
    L.tileLayer('https://{{s}}.basemaps.cartocdn.com/light_all/{{z}}/{{x}}/{{y}}{{r}}.png', {{
        attribution: '&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors &copy; <a href="https://carto.com/attributions">CARTO</a>',
        subdomains: 'abcd',
        maxZoom: 20
    }}).addTo(map);

    var layers = {layers};
    layers.forEach(function(layer) {{
        var shape = layer.kind === 'circle'
            ? L.circle(layer.center, Object.assign({{ radius: layer.radius }}, layer.style))
            : L.polyline(layer.points, layer.style);
        if (layer.tooltip) {{ shape.bindTooltip(layer.tooltip); }}
        if (layer.popup) {{ shape.bindPopup(layer.popup, {{ maxWidth: 300 }}); }}
        shape.addTo(map);
    }});
</script>
</body>
</html>
"#,
            title = escape_html(&self.title),
            version = LEAFLET_VERSION,
            overlays = overlays,
            world_copy_jump = self.world_copy_jump,
            center = center,
            zoom = self.zoom,
            layers = layers,
        ))
    }

    /// Render and write the page to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let html = self.to_html()?;
        fs::write(path, html)?;
        debug!(
            "[MapDocument] Wrote {} ({} layers)",
            path.display(),
            self.layers.len()
        );
        Ok(())
    }
}

/// Keep embedded JSON from closing the surrounding `<script>` element.
fn script_safe_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Small filled dot used in legends.
pub(crate) fn color_dot(color: &str, size: u32) -> String {
    format!(
        r#"<div style="width: {size}px; height: {size}px; background: {color}; border-radius: 50%;"></div>"#,
        size = size,
        color = color
    )
}

/// Fixed white panel anchored with `position` (e.g. `bottom: 30px; right: 30px;`).
pub(crate) fn panel(position: &str, width: u32, body: &str) -> String {
    format!(
        r#"<div style="position: fixed; {position} width: {width}px; max-height: 80vh; overflow-y: auto;
            background: white; border-radius: 12px; box-shadow: 0 4px 24px rgba(0,0,0,0.15);
            z-index: 9999; padding: 20px; font-family: {font};">
{body}
</div>"#,
        position = position,
        width = width,
        font = FONT_STACK,
        body = body
    )
}
