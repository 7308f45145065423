//! On-disk artifacts: grid GeoJSON + centroid tables under the data dir,
//! mission outputs under missions/<slug>/.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use fmp_core::compile::CompileResult;
use fmp_core::export;
use fmp_core::grid::{cell_size_key, Centroid, GridBuild};

/// Filesystem-safe mission name: lowercase alphanumerics, runs of anything
/// else collapsed to a single underscore.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_was_sep = true;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = slug.trim_end_matches('_');
    if trimmed.is_empty() {
        "mission".to_string()
    } else {
        trimmed.to_string()
    }
}

fn grid_paths(data_dir: &Path, key: i64) -> (PathBuf, PathBuf) {
    (
        data_dir.join(format!("grid_{key}m.geojson")),
        data_dir.join(format!("grid_{key}m.csv")),
    )
}

#[derive(Debug)]
pub struct GridFiles {
    pub geojson: PathBuf,
    pub centroids: PathBuf,
}

/// Persist one grid build: a FeatureCollection of clipped cells and the flat
/// centroid table keyed by rounded cell size.
pub fn write_grid_artifacts(data_dir: &Path, build: &GridBuild) -> Result<GridFiles> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let (geojson_path, centroids_path) = grid_paths(data_dir, cell_size_key(build.cell_size_m));

    let features: Vec<_> = build
        .cells
        .iter()
        .map(|cell| {
            export::feature(
                export::multi_polygon_geometry(&cell.polygon),
                json!({ "id": cell.id, "i": cell.i, "j": cell.j }),
            )
        })
        .collect();
    let collection = json!({ "type": "FeatureCollection", "features": features });
    std::fs::write(&geojson_path, serde_json::to_string(&collection)?)
        .with_context(|| format!("writing {}", geojson_path.display()))?;

    let mut table = String::from("id,i,j,x,y,lat,lon\n");
    for c in &build.centroids {
        table.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            c.id, c.i, c.j, c.x, c.y, c.lat, c.lon
        ));
    }
    std::fs::write(&centroids_path, table)
        .with_context(|| format!("writing {}", centroids_path.display()))?;

    Ok(GridFiles {
        geojson: geojson_path,
        centroids: centroids_path,
    })
}

/// Reload a persisted centroid table, if a grid of this cell size was ever
/// built. Malformed rows are skipped.
pub fn load_centroids(data_dir: &Path, cell_size_m: f64) -> Option<Vec<Centroid>> {
    let (_, centroids_path) = grid_paths(data_dir, cell_size_key(cell_size_m));
    let text = std::fs::read_to_string(centroids_path).ok()?;
    let mut centroids = Vec::new();
    for line in text.lines().skip(1) {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 7 {
            continue;
        }
        let parsed = (
            fields[0].parse(),
            fields[1].parse(),
            fields[2].parse(),
            fields[3].parse(),
            fields[4].parse(),
            fields[5].parse(),
            fields[6].parse(),
        );
        if let (Ok(id), Ok(i), Ok(j), Ok(x), Ok(y), Ok(lat), Ok(lon)) = parsed {
            centroids.push(Centroid {
                id,
                i,
                j,
                x,
                y,
                lat,
                lon,
            });
        }
    }
    if centroids.is_empty() {
        None
    } else {
        Some(centroids)
    }
}

#[derive(Debug)]
pub struct MissionFiles {
    pub directory: PathBuf,
    pub waypoints_csv: PathBuf,
    pub path_geojson: PathBuf,
    pub report_json: PathBuf,
}

/// Persist the three mission outputs for one compile.
pub fn write_mission_artifacts(
    data_dir: &Path,
    result: &CompileResult,
    snap_to_grid: bool,
) -> Result<MissionFiles> {
    let directory = data_dir.join("missions").join(slugify(&result.mission.name));
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("creating {}", directory.display()))?;

    let waypoints_csv = directory.join("mission_waypoints.csv");
    let mut rows = String::from("seq,x,y,z,lat,lon,in_region,snapped\n");
    for row in export::waypoint_rows(result) {
        rows.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            row.seq, row.x, row.y, row.z, row.lat, row.lon, row.in_region, row.snapped
        ));
    }
    std::fs::write(&waypoints_csv, rows)
        .with_context(|| format!("writing {}", waypoints_csv.display()))?;

    let path_geojson = directory.join("mission_path.geojson");
    let collection = json!({
        "type": "FeatureCollection",
        "features": [export::path_feature(result)],
    });
    std::fs::write(&path_geojson, serde_json::to_string(&collection)?)
        .with_context(|| format!("writing {}", path_geojson.display()))?;

    let report_json = directory.join("compile_report.json");
    let mut report = serde_json::to_value(export::compile_report(result, snap_to_grid))?;
    report["generated_at"] = json!(chrono::Utc::now().to_rfc3339());
    std::fs::write(&report_json, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing {}", report_json.display()))?;

    Ok(MissionFiles {
        directory,
        waypoints_csv,
        path_geojson,
        report_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_runs() {
        assert_eq!(slugify("Lake Patrol #2"), "lake_patrol_2");
        assert_eq!(slugify("ALPHA"), "alpha");
        assert_eq!(slugify("  "), "mission");
        assert_eq!(slugify("a--b"), "a_b");
    }

    #[test]
    fn centroid_table_round_trips() {
        let dir = std::env::temp_dir().join(format!("fmp-artifacts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let build = GridBuild {
            cell_size_m: 100.0,
            cells: Vec::new(),
            centroids: vec![Centroid {
                id: 1,
                i: 0,
                j: 0,
                x: 50.0,
                y: 50.125,
                lat: 27.000001,
                lon: -81.000002,
            }],
            grid_lines: geo::MultiLineString::new(Vec::new()),
            bounds: geo::Rect::new(
                geo::Coord { x: 0.0, y: 0.0 },
                geo::Coord { x: 100.0, y: 100.0 },
            ),
            origin: (0.0, 0.0),
        };
        write_grid_artifacts(&dir, &build).unwrap();
        let restored = load_centroids(&dir, 100.0).unwrap();
        assert_eq!(restored, build.centroids);
        assert!(load_centroids(&dir, 250.0).is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
