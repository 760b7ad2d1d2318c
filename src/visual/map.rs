use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use super::escape_html;
use super::quadrant::QuadrantPoint;
use crate::config::MapConfig;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<title>Seoul strategic map</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet.fullscreen@3.0.2/Control.FullScreen.css" />
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://cdn.jsdelivr.net/npm/leaflet.fullscreen@3.0.2/Control.FullScreen.js"></script>
<style>html, body, #map { width: 100%; height: 100%; margin: 0; padding: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
var settings = __SETTINGS__;
var markers = __MARKERS__;
var map = L.map("map", { fullscreenControl: true }).setView(settings.center, settings.zoom);
L.tileLayer(settings.tileUrl, { attribution: settings.attribution, subdomains: "abcd", maxZoom: 20 }).addTo(map);
markers.forEach(function (m) {
  L.circleMarker([m.lat, m.lon], {
    radius: m.radius,
    color: m.color,
    fill: true,
    fillColor: m.color,
    fillOpacity: settings.fillOpacity,
    weight: m.weight
  })
    .bindTooltip(m.tooltip)
    .bindPopup(m.popup, { maxWidth: 200 })
    .addTo(map);
});
</script>
</body>
</html>
"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapSettings<'a> {
    center: [f64; 2],
    zoom: u8,
    tile_url: &'a str,
    attribution: &'a str,
    fill_opacity: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Marker {
    lat: f64,
    lon: f64,
    radius: f64,
    weight: f64,
    color: &'static str,
    tooltip: String,
    popup: String,
}

/// What ended up on the map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapReport {
    pub rendered: usize,
    /// Districts without coordinates, in input order
    pub skipped: Vec<String>,
}

/// JSON safe to inline inside a `<script>` element
fn script_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

pub struct MapRenderer<'a> {
    config: &'a MapConfig,
}

impl<'a> MapRenderer<'a> {
    pub fn new(config: &'a MapConfig) -> Self {
        Self { config }
    }

    fn marker(&self, point: &QuadrantPoint, coords: [f64; 2]) -> Marker {
        let emphasized = self.config.emphasized_districts.iter().any(|d| d == &point.name);
        let name = escape_html(&point.name);
        let label = point.quadrant.label();

        Marker {
            lat: coords[0],
            lon: coords[1],
            radius: if emphasized { self.config.emphasized_radius } else { self.config.base_radius },
            weight: if emphasized { self.config.emphasized_weight } else { self.config.base_weight },
            color: point.quadrant.color(),
            tooltip: format!("{} ({})", name, label),
            popup: format!(
                "<div style='width:150px'><b>{}</b><br>X_Rank: {:.2}<br>Y_Rank: {:.2}<br><hr>{}</div>",
                name, point.x, point.y, label
            ),
        }
    }

    /// Render a standalone HTML page; districts without coordinates are skipped
    pub fn render(&self, points: &[QuadrantPoint]) -> Result<(String, MapReport)> {
        let mut report = MapReport::default();
        let mut markers = Vec::with_capacity(points.len());

        for point in points {
            match self.config.coordinates.get(&point.name) {
                Some(&coords) => markers.push(self.marker(point, coords)),
                None => report.skipped.push(point.name.clone()),
            }
        }
        report.rendered = markers.len();

        let settings = MapSettings {
            center: self.config.center,
            zoom: self.config.zoom,
            tile_url: &self.config.tile_url,
            attribution: &self.config.tile_attribution,
            fill_opacity: self.config.fill_opacity,
        };

        let html = TEMPLATE
            .replace("__SETTINGS__", &script_json(&settings)?)
            .replace("__MARKERS__", &script_json(&markers)?);

        Ok((html, report))
    }

    pub fn write(&self, path: &Path, points: &[QuadrantPoint]) -> Result<MapReport> {
        let (html, report) = self.render(points)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(path, html).with_context(|| format!("writing {}", path.display()))?;

        info!("🗺️ Map with {} markers saved to: {}", report.rendered, path.display());
        if !report.skipped.is_empty() {
            warn!("   No coordinates for: {}", report.skipped.join(", "));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn map_config() -> MapConfig {
        let mut config = Config::default().map;
        config.coordinates.insert("성수동".to_string(), [37.5415, 127.0435]);
        config.coordinates.insert("신당동".to_string(), [37.5566, 127.0163]);
        config.emphasized_districts = vec!["신당동".to_string()];
        config
    }

    #[test]
    fn test_markers_and_skips() {
        let config = map_config();
        let renderer = MapRenderer::new(&config);
        let points = vec![
            QuadrantPoint::new("성수동", 0.9, 0.8),
            QuadrantPoint::new("미지동", 0.1, 0.1),
            QuadrantPoint::new("신당동", 0.2, 0.7),
        ];

        let (html, report) = renderer.render(&points).unwrap();
        assert_eq!(report.rendered, 2);
        assert_eq!(report.skipped, vec!["미지동"]);
        assert!(html.contains("성수동 (1사분면 (핵심))"));
        assert!(html.contains("X_Rank: 0.20"));
        assert!(html.contains("Control.FullScreen.js"));
        assert!(!html.contains("미지동"));
    }

    #[test]
    fn test_emphasized_marker_style() {
        let config = map_config();
        let renderer = MapRenderer::new(&config);

        let plain = renderer.marker(&QuadrantPoint::new("성수동", 0.9, 0.8), [0.0, 0.0]);
        let emphasized = renderer.marker(&QuadrantPoint::new("신당동", 0.2, 0.7), [0.0, 0.0]);

        assert_eq!((plain.radius, plain.weight), (12.0, 1.0));
        assert_eq!((emphasized.radius, emphasized.weight), (16.0, 4.0));
        assert_eq!(emphasized.color, "#f1c40f");
    }

    #[test]
    fn test_script_content_is_escaped() {
        let mut config = map_config();
        config.coordinates.insert("</script><b>".to_string(), [0.0, 0.0]);
        let renderer = MapRenderer::new(&config);

        let (html, _) = renderer
            .render(&[QuadrantPoint::new("</script><b>", 0.5, 0.5)])
            .unwrap();
        assert_eq!(html.matches("</script>").count(), 3);
        assert!(html.contains("&lt;/script&gt;"));
    }
}
