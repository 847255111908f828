use crate::config::MapConfig;
use crate::error::MapError;
use crate::types::HealthRecord;
use chrono::{DateTime, Local};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::json;
use std::fs;
use std::path::Path;

/// Fixed five-step ramp, light yellow to dark red.
pub const COLOR_RAMP: [&str; 5] = ["#ffffb2", "#fecc5c", "#fd8d3c", "#f03b20", "#bd0026"];

// Self-contained Leaflet page; __TOKENS__ are filled in by render_map.
const PAGE_TEMPLATE: &str = r##"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>__LEGEND_LABEL__</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
  html, body, #map { height: 100%; margin: 0; }
  .legend { background: white; padding: 8px 10px; font: 12px sans-serif; box-shadow: 0 0 6px rgba(0,0,0,0.3); }
  .legend h4 { margin: 0 0 4px; }
  .legend i { width: 14px; height: 14px; float: left; margin-right: 6px; }
</style>
</head>
<body>
<div id="map"></div>
<script>
  var map = L.map('map').setView([__CENTER_LAT__, __CENTER_LON__], __ZOOM__);
  L.tileLayer('https://tile.openstreetmap.org/{z}/{x}/{y}.png', {
    attribution: '&copy; OpenStreetMap contributors'
  }).addTo(map);

  var points = __GEOJSON__;

  // Region shading, one circle per point colored by its region's metric
  L.geoJSON(points, {
    pointToLayer: function (feature, latlng) {
      return L.circleMarker(latlng, {
        radius: 12,
        fillColor: feature.properties.fill,
        color: feature.properties.fill,
        fillOpacity: __FILL_OPACITY__,
        opacity: __LINE_OPACITY__
      });
    }
  }).addTo(map);

  // Popup markers
  L.geoJSON(points, {
    onEachFeature: function (feature, layer) {
      layer.bindPopup(feature.properties.popup);
    }
  }).addTo(map);

  var legend = L.control({position: 'bottomright'});
  legend.onAdd = function () {
    var div = L.DomUtil.create('div', 'legend');
    div.innerHTML = '<h4>__LEGEND_LABEL__</h4>__LEGEND_ROWS__';
    return div;
  };
  legend.addTo(map);
</script>
</body>
</html>
"##;

/// Arithmetic mean of all coordinates; None for an empty table.
pub fn map_center(records: &[HealthRecord]) -> Option<(f64, f64)> {
    if records.is_empty() {
        return None;
    }
    let n = records.len() as f64;
    let lat = records.iter().map(|r| r.latitude).sum::<f64>() / n;
    let lon = records.iter().map(|r| r.longitude).sum::<f64>() / n;
    Some((lat, lon))
}

/// Bucket a metric value into the ramp over the observed [min, max] range.
/// A degenerate range maps everything to the lowest step.
pub fn ramp_color(value: f64, min: f64, max: f64) -> &'static str {
    if !(max > min) {
        return COLOR_RAMP[0];
    }
    let t = ((value - min) / (max - min)).clamp(0.0, 1.0);
    let step = ((t * COLOR_RAMP.len() as f64) as usize).min(COLOR_RAMP.len() - 1);
    COLOR_RAMP[step]
}

fn metric_range(records: &[HealthRecord]) -> (f64, f64) {
    records.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (lo.min(r.health_metric), hi.max(r.health_metric))
    })
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn popup_html(record: &HealthRecord) -> String {
    format!(
        "Region: {}<br>Health Metric: {}<br>Additional Info: {}",
        escape_html(&record.region),
        record.health_metric,
        escape_html(record.additional_info.as_deref().unwrap_or("N/A")),
    )
}

fn feature_collection(records: &[HealthRecord], min: f64, max: f64) -> FeatureCollection {
    let features = records
        .iter()
        .map(|record| {
            let geometry = Geometry::new(geojson::Value::from(&record.position()));
            let mut properties = JsonObject::new();
            properties.insert("region".to_string(), json!(record.region));
            properties.insert("health_metric".to_string(), json!(record.health_metric));
            properties.insert(
                "fill".to_string(),
                json!(ramp_color(record.health_metric, min, max)),
            );
            properties.insert("popup".to_string(), json!(popup_html(record)));
            Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn legend_rows(min: f64, max: f64) -> String {
    let span = max - min;
    let steps = COLOR_RAMP.len() as f64;
    COLOR_RAMP
        .iter()
        .enumerate()
        .map(|(i, color)| {
            let lo = min + span * i as f64 / steps;
            let hi = min + span * (i as f64 + 1.0) / steps;
            format!("<i style=\"background:{color}\"></i> {lo:.1} to {hi:.1}<br>")
        })
        .collect()
}

/// Compose the standalone HTML document for a validated, non-empty table.
pub fn render_map(cfg: &MapConfig, records: &[HealthRecord]) -> Result<String, MapError> {
    let (center_lat, center_lon) = map_center(records).ok_or(MapError::EmptyTable)?;
    let (min, max) = metric_range(records);

    let collection = feature_collection(records, min, max);
    let geojson_payload =
        serde_json::to_string(&collection).map_err(|err| MapError::Render(err.to_string()))?;

    Ok(PAGE_TEMPLATE
        .replace("__LEGEND_LABEL__", &escape_html(&cfg.legend_label))
        .replace("__CENTER_LAT__", &center_lat.to_string())
        .replace("__CENTER_LON__", &center_lon.to_string())
        .replace("__ZOOM__", &cfg.zoom_start.to_string())
        .replace("__FILL_OPACITY__", &cfg.fill_opacity.to_string())
        .replace("__LINE_OPACITY__", &cfg.line_opacity.to_string())
        .replace("__LEGEND_ROWS__", &legend_rows(min, max))
        .replace("__GEOJSON__", &geojson_payload))
}

/// Artifact name with second-resolution timestamp. Names collide within one
/// wall-clock second; the later write wins.
pub fn artifact_name(now: DateTime<Local>) -> String {
    format!("health_map_{}.html", now.format("%Y%m%d_%H%M%S"))
}

pub fn save_artifact(maps_dir: &Path, html: &str) -> Result<String, MapError> {
    let filename = artifact_name(Local::now());
    fs::write(maps_dir.join(&filename), html)?;
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(lat: f64, lon: f64, region: &str, metric: f64) -> HealthRecord {
        HealthRecord {
            latitude: lat,
            longitude: lon,
            region: region.to_string(),
            health_metric: metric,
            additional_info: None,
        }
    }

    #[test]
    fn center_is_the_arithmetic_mean() {
        let records = vec![record(40.0, -75.0, "East", 5.0), record(42.0, -71.0, "North", 1.0)];
        assert_eq!(map_center(&records), Some((41.0, -73.0)));
        assert_eq!(map_center(&[]), None);
    }

    #[test]
    fn ramp_covers_all_five_steps() {
        assert_eq!(ramp_color(0.0, 0.0, 10.0), COLOR_RAMP[0]);
        assert_eq!(ramp_color(3.0, 0.0, 10.0), COLOR_RAMP[1]);
        assert_eq!(ramp_color(5.0, 0.0, 10.0), COLOR_RAMP[2]);
        assert_eq!(ramp_color(7.0, 0.0, 10.0), COLOR_RAMP[3]);
        assert_eq!(ramp_color(10.0, 0.0, 10.0), COLOR_RAMP[4]);
    }

    #[test]
    fn degenerate_range_uses_the_lowest_step() {
        assert_eq!(ramp_color(5.0, 5.0, 5.0), COLOR_RAMP[0]);
    }

    #[test]
    fn rendered_page_carries_legend_regions_and_popups() {
        let mut records = vec![record(40.0, -75.0, "East", 5.0)];
        records[0].additional_info = Some("clinic <A>".to_string());
        let html = render_map(&MapConfig::default(), &records).unwrap();
        assert!(html.contains("Health Metric"));
        assert!(html.contains("East"));
        assert!(html.contains("clinic &lt;A&gt;"));
        assert!(html.contains("[-75.0,40.0]") || html.contains("[-75,40]"));
    }

    #[test]
    fn missing_additional_info_defaults_to_na() {
        let records = vec![record(40.0, -75.0, "East", 5.0)];
        let html = render_map(&MapConfig::default(), &records).unwrap();
        assert!(html.contains("Additional Info: N/A"));
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = render_map(&MapConfig::default(), &[]).unwrap_err();
        assert!(matches!(err, MapError::EmptyTable));
    }

    #[test]
    fn artifact_names_have_second_resolution() {
        let t = Local.with_ymd_and_hms(2026, 8, 6, 13, 5, 9).unwrap();
        assert_eq!(artifact_name(t), "health_map_20260806_130509.html");
        // Two renders within the same second share a name: last write wins.
        assert_eq!(artifact_name(t), artifact_name(t));
    }
}
