//! Route map generation.
//!
//! Renders one user's day of location points as a self-contained
//! Leaflet/OpenStreetMap HTML page: start/end/stationary markers,
//! colour-coded intermediate points sized by speed, and a polyline through
//! the route. Days without points still get a page stating that, so the
//! admin always receives something to open.

use chrono::NaiveDateTime;

use crate::core::geo;
use crate::storage::locations::LocationRow;

/// Default map centre when there is nothing to show (Moscow).
const FALLBACK_CENTER: (f64, f64) = (55.7558, 37.6173);

/// A validated, speed-annotated point ready for rendering.
#[derive(Debug, Clone)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub time_label: String,
    pub location_type: String,
    pub speed_kmh: f64,
}

/// Filter raw rows down to renderable points and annotate each with the
/// speed from its predecessor.
pub fn prepare_points(rows: &[LocationRow]) -> Vec<MapPoint> {
    let mut points: Vec<(NaiveDateTime, MapPoint)> = Vec::new();

    for row in rows {
        if !geo::valid_coords(row.latitude, row.longitude) {
            log::warn!("Dropping out-of-range coordinates: {}, {}", row.latitude, row.longitude);
            continue;
        }
        let Some(ts) = row.parsed_timestamp() else {
            log::warn!("Dropping location with unparseable timestamp: {}", row.timestamp);
            continue;
        };
        points.push((
            ts,
            MapPoint {
                latitude: row.latitude,
                longitude: row.longitude,
                time_label: ts.format("%H:%M:%S").to_string(),
                location_type: row.location_type.clone(),
                speed_kmh: 0.0,
            },
        ));
    }

    points.sort_by_key(|(ts, _)| *ts);

    for i in 1..points.len() {
        let (prev_ts, prev) = (points[i - 1].0, points[i - 1].1.clone());
        let (ts, point) = &mut points[i];
        let distance = geo::haversine_m(prev.latitude, prev.longitude, point.latitude, point.longitude);
        let elapsed = (*ts - prev_ts).num_seconds() as f64;
        point.speed_kmh = geo::speed_kmh(distance, elapsed);
    }

    points.into_iter().map(|(_, p)| p).collect()
}

fn marker_color(point: &MapPoint) -> &'static str {
    match point.location_type.as_str() {
        "start" => "green",
        "end" => "red",
        "stationary" => "orange",
        "moving" => {
            if point.speed_kmh > 50.0 {
                "darkpurple"
            } else {
                "purple"
            }
        }
        _ => "blue",
    }
}

fn marker_radius(point: &MapPoint) -> f64 {
    match point.location_type.as_str() {
        "moving" => (3.0 + point.speed_kmh / 10.0).min(8.0),
        _ => 3.0,
    }
}

/// Render the full map page.
pub fn render_map(full_name: &str, date: &str, points: &[MapPoint]) -> String {
    let (center_lat, center_lon, zoom) = if points.is_empty() {
        (FALLBACK_CENTER.0, FALLBACK_CENTER.1, 10)
    } else {
        let lat = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
        let lon = points.iter().map(|p| p.longitude).sum::<f64>() / points.len() as f64;
        (lat, lon, 14)
    };

    let title = if points.is_empty() {
        format!(
            "<h3>Отчёт о местоположении: {}</h3><h4>Дата: {}</h4>\
             <h4><b>Нет данных о местоположении за указанную дату</b></h4>\
             <p>Чтобы данные появились, пользователь должен транслировать геопозицию боту.</p>",
            html_escape(full_name),
            html_escape(date)
        )
    } else {
        format!(
            "<h3>Отчёт о местоположении: {}</h3><h4>Дата: {}</h4>",
            html_escape(full_name),
            html_escape(date)
        )
    };

    let mut markers_js = String::new();
    if points.is_empty() {
        markers_js.push_str(&format!(
            "L.marker([{lat}, {lon}]).addTo(map)\
             .bindPopup('<b>Нет данных о местоположении</b>')\
             .bindTooltip('Нет данных');\n",
            lat = FALLBACK_CENTER.0,
            lon = FALLBACK_CENTER.1
        ));
    }

    for point in points {
        let popup = format!(
            "<b>Время:</b> {}<br><b>Координаты:</b> {:.6}, {:.6}",
            point.time_label, point.latitude, point.longitude
        );
        match point.location_type.as_str() {
            "start" => markers_js.push_str(&format!(
                "L.marker([{:.6}, {:.6}]).addTo(map).bindPopup('{}').bindTooltip('🟢 НАЧАЛО {}');\n",
                point.latitude, point.longitude, popup, point.time_label
            )),
            "end" => markers_js.push_str(&format!(
                "L.marker([{:.6}, {:.6}]).addTo(map).bindPopup('{}').bindTooltip('🔴 КОНЕЦ {}');\n",
                point.latitude, point.longitude, popup, point.time_label
            )),
            "stationary" => markers_js.push_str(&format!(
                "L.marker([{:.6}, {:.6}]).addTo(map).bindPopup('{}').bindTooltip('⏸️ ОСТАНОВКА {}');\n",
                point.latitude, point.longitude, popup, point.time_label
            )),
            _ => markers_js.push_str(&format!(
                "L.circleMarker([{lat:.6}, {lon:.6}], {{radius: {radius:.1}, color: '{color}', \
                 fillColor: '{color}', fillOpacity: 0.7}}).addTo(map)\
                 .bindPopup('{popup}').bindTooltip('{time}');\n",
                lat = point.latitude,
                lon = point.longitude,
                radius = marker_radius(point),
                color = marker_color(point),
                popup = popup,
                time = point.time_label
            )),
        }
    }

    let path_js = if points.len() > 1 {
        let coords: Vec<String> = points
            .iter()
            .map(|p| format!("[{:.6}, {:.6}]", p.latitude, p.longitude))
            .collect();
        format!(
            "L.polyline([{}], {{color: 'blue', weight: 4, opacity: 0.8}}).addTo(map).bindTooltip('Маршрут');\n",
            coords.join(", ")
        )
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Карта перемещений: {name} ({date})</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
  body {{ margin: 0; font-family: 'Segoe UI', Arial, sans-serif; }}
  #title {{ text-align: center; padding: 4px 16px; }}
  #map {{ height: 90vh; width: 100%; }}
</style>
</head>
<body>
<div id="title">{title}</div>
<div id="map"></div>
<script>
var map = L.map('map').setView([{center_lat:.6}, {center_lon:.6}], {zoom});
L.tileLayer('https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
    maxZoom: 19,
    attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
{markers}{path}</script>
</body>
</html>
"#,
        name = html_escape(full_name),
        date = html_escape(date),
        title = title,
        center_lat = center_lat,
        center_lon = center_lon,
        zoom = zoom,
        markers = markers_js,
        path = path_js,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(lat: f64, lon: f64, ts: &str, loc_type: &str) -> LocationRow {
        LocationRow {
            latitude: lat,
            longitude: lon,
            timestamp: ts.to_string(),
            session_id: "s".to_string(),
            location_type: loc_type.to_string(),
        }
    }

    #[test]
    fn prepare_drops_invalid_and_sorts() {
        let rows = vec![
            row(55.76, 37.62, "2025-05-01 10:05:00", "intermediate"),
            row(95.0, 37.61, "2025-05-01 10:01:00", "intermediate"),
            row(55.75, 37.61, "2025-05-01 10:00:00", "start"),
            row(55.77, 37.63, "bad-timestamp", "intermediate"),
        ];

        let points = prepare_points(&rows);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].location_type, "start");
        assert_eq!(points[1].time_label, "10:05:00");
        assert!(points[1].speed_kmh > 0.0);
    }

    #[test]
    fn map_with_points_contains_polyline_and_markers() {
        let rows = vec![
            row(55.75, 37.61, "2025-05-01 10:00:00", "start"),
            row(55.76, 37.62, "2025-05-01 10:05:00", "intermediate"),
            row(55.77, 37.63, "2025-05-01 10:10:00", "end"),
        ];
        let html = render_map("Иванов Иван", "2025-05-01", &prepare_points(&rows));

        assert!(html.contains("L.polyline"));
        assert!(html.contains("НАЧАЛО"));
        assert!(html.contains("КОНЕЦ"));
        assert!(html.contains("openstreetmap.org"));
        assert!(html.contains("Иванов Иван"));
    }

    #[test]
    fn empty_day_renders_fallback_page() {
        let html = render_map("Иванов", "2025-05-01", &[]);
        assert!(html.contains("Нет данных о местоположении"));
        assert!(html.contains("55.7558"));
        assert!(!html.contains("L.polyline"));
    }

    #[test]
    fn user_supplied_text_is_escaped() {
        let html = render_map("<script>alert(1)</script>", "2025-05-01", &[]);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn fast_movement_darkens_the_marker() {
        let rows = vec![
            row(55.75, 37.61, "2025-05-01 10:00:00", "moving"),
            // ~1.1 km in 60 s is about 67 km/h
            row(55.76, 37.61, "2025-05-01 10:01:00", "moving"),
        ];
        let points = prepare_points(&rows);
        assert!(points[1].speed_kmh > 50.0);
        assert_eq!(marker_color(&points[1]), "darkpurple");
        assert_eq!(marker_color(&points[0]), "purple");
    }
}
