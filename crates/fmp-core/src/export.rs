//! Output-writer contract: pure construction of the per-waypoint rows, the
//! path feature, and the compile report. Persistence belongs to the caller.

use geo::{LineString, MultiLineString, MultiPolygon, Polygon};
use serde::Serialize;
use serde_json::{json, Value};

use crate::compile::CompileResult;

/// Speed reported when a mission declares none.
pub const DEFAULT_SPEED_MPS: f64 = 1.0;

/// One row of the per-waypoint export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaypointRow {
    pub seq: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub lat: f64,
    pub lon: f64,
    pub in_region: bool,
    pub snapped: bool,
}

/// Summary report for a compiled mission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileReport {
    pub mission: String,
    pub step_m: f64,
    pub speed_mps: f64,
    pub total_length_m: f64,
    pub waypoint_count: usize,
    /// Planar bounding box (min x, min y, max x, max y), rounded to mm.
    pub bounds_xy: [f64; 4],
    pub snap_to_grid: bool,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Row-per-waypoint export, seq numbered from 1.
pub fn waypoint_rows(result: &CompileResult) -> Vec<WaypointRow> {
    result
        .waypoints
        .iter()
        .enumerate()
        .map(|(idx, point)| WaypointRow {
            seq: idx + 1,
            x: point.x,
            y: point.y,
            z: point.z,
            lat: point.lat,
            lon: point.lon,
            in_region: point.in_region,
            snapped: point.snapped,
        })
        .collect()
}

/// Single-feature line geometry of the compiled path, ordered lon/lat pairs.
pub fn path_feature(result: &CompileResult) -> Value {
    let coordinates: Vec<Value> = result
        .waypoints
        .iter()
        .map(|point| json!([point.lon, point.lat]))
        .collect();
    feature(
        json!({ "type": "LineString", "coordinates": coordinates }),
        json!({ "name": result.mission.name }),
    )
}

/// Summary report per the output-writer contract.
pub fn compile_report(result: &CompileResult, snap_to_grid: bool) -> CompileReport {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for point in &result.waypoints {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    CompileReport {
        mission: result.mission.name.clone(),
        step_m: result.step_m,
        speed_mps: result.mission.speed_mps.unwrap_or(DEFAULT_SPEED_MPS),
        total_length_m: round3(result.total_length_m),
        waypoint_count: result.waypoints.len(),
        bounds_xy: [round3(min_x), round3(min_y), round3(max_x), round3(max_y)],
        snap_to_grid,
    }
}

/// Wrap a geometry in a GeoJSON feature.
pub fn feature(geometry: Value, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": properties,
    })
}

fn ring_coordinates(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

pub fn polygon_geometry(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_coordinates(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_coordinates));
    json!({ "type": "Polygon", "coordinates": rings })
}

pub fn multi_polygon_geometry(multi: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Value> = multi
        .iter()
        .map(|polygon| polygon_geometry(polygon)["coordinates"].clone())
        .collect();
    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

pub fn multi_line_string_geometry(multi: &MultiLineString<f64>) -> Value {
    let lines: Vec<Value> = multi.iter().map(ring_coordinates).collect();
    json!({ "type": "MultiLineString", "coordinates": lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{CompileResult, MissionPoint};
    use crate::mission::MissionDefinition;

    fn result_with_two_points() -> CompileResult {
        CompileResult {
            mission: MissionDefinition {
                name: "DEMO".into(),
                speed_mps: None,
                commands: Vec::new(),
            },
            waypoints: vec![
                MissionPoint {
                    x: 10.0,
                    y: 10.0,
                    z: 1.0,
                    lat: 0.1,
                    lon: -81.0,
                    source_line: 4,
                    snapped: false,
                    in_region: true,
                },
                MissionPoint {
                    x: 20.0,
                    y: 20.0,
                    z: 1.0,
                    lat: 0.2,
                    lon: -81.0,
                    source_line: 5,
                    snapped: true,
                    in_region: true,
                },
            ],
            total_length_m: 14.142_135_623,
            step_m: 5.0,
            dwell_events: Vec::new(),
            surface_index: None,
        }
    }

    #[test]
    fn rows_are_sequenced_from_one() {
        let rows = waypoint_rows(&result_with_two_points());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].seq, 1);
        assert_eq!(rows[1].seq, 2);
        assert!(rows[1].snapped);
    }

    #[test]
    fn report_rounds_and_defaults_speed() {
        let report = compile_report(&result_with_two_points(), false);
        assert_eq!(report.total_length_m, 14.142);
        assert_eq!(report.speed_mps, DEFAULT_SPEED_MPS);
        assert_eq!(report.bounds_xy, [10.0, 10.0, 20.0, 20.0]);
        assert_eq!(report.waypoint_count, 2);
    }

    #[test]
    fn path_feature_orders_lon_lat() {
        let feature = path_feature(&result_with_two_points());
        assert_eq!(feature["geometry"]["type"], "LineString");
        assert_eq!(feature["geometry"]["coordinates"][0][0], -81.0);
        assert_eq!(feature["geometry"]["coordinates"][0][1], 0.1);
        assert_eq!(feature["properties"]["name"], "DEMO");
    }
}
