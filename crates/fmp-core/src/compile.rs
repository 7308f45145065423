//! Mission compiler: resolves parsed commands to planar vertices, validates
//! containment, optionally snaps to grid centroids, densifies at a fixed
//! step, and remaps dwell/surface markers onto the densified path.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{CompileError, Violation};
use crate::grid::CentroidIndex;
use crate::mission::{Command, Coordinate, MissionDefinition};
use crate::projection;
use crate::region::RegionSnapshot;

/// A centroid that moves a vertex by more than this on either axis counts
/// as a real snap.
const SNAP_EPSILON_M: f64 = 1e-6;

/// Injected centroid-table source, keyed by cell size. Lets the compiler run
/// against prebuilt grids without knowing how they are stored.
pub trait CentroidLookup {
    fn centroids_for(&self, cell_size_m: f64) -> Option<Arc<CentroidIndex>>;
}

/// Lookup with no grids. For callers that never snap.
pub struct NoCentroids;

impl CentroidLookup for NoCentroids {
    fn centroids_for(&self, _cell_size_m: f64) -> Option<Arc<CentroidIndex>> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Densification step in meters. Must be positive; the caller rejects
    /// non-positive steps before invoking the compiler.
    pub step_m: f64,
    pub snap_to_grid: bool,
    pub grid_cell_size_m: Option<f64>,
}

/// One densified output point. Order is traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MissionPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub lat: f64,
    pub lon: f64,
    pub source_line: u32,
    pub snapped: bool,
    pub in_region: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DwellEvent {
    /// Index into the densified waypoint list.
    pub index: usize,
    pub duration_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    pub mission: MissionDefinition,
    pub waypoints: Vec<MissionPoint>,
    pub total_length_m: f64,
    pub step_m: f64,
    pub dwell_events: Vec<DwellEvent>,
    pub surface_index: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Vertex {
    x: f64,
    y: f64,
    z: f64,
    line: u32,
    snapped: bool,
}

fn resolve(coordinate: &Coordinate) -> Vertex {
    match *coordinate {
        Coordinate::Projected { x, y, z, line } => Vertex {
            x,
            y,
            z,
            line,
            snapped: false,
        },
        Coordinate::Geographic { lon, lat, z, line } => {
            let (x, y) = projection::geographic_to_planar(lon, lat);
            Vertex {
                x,
                y,
                z,
                line,
                snapped: false,
            }
        }
    }
}

/// Insert `max(floor(d/step), 1)` evenly spaced interpolants per segment,
/// the last of which is the destination exactly once. Zero-length segments
/// emit nothing new. Returns the densified points and, per original vertex,
/// its index in the densified sequence.
fn densify_with_map(vertices: &[Vertex], step_m: f64) -> (Vec<(f64, f64, f64)>, Vec<usize>) {
    let first = vertices[0];
    let mut points = vec![(first.x, first.y, first.z)];
    let mut index_map = vec![0usize];

    for pair in vertices.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let dz = b.z - a.z;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance == 0.0 {
            index_map.push(points.len() - 1);
            continue;
        }
        let pieces = ((distance / step_m).floor() as usize).max(1);
        for k in 1..=pieces {
            if k == pieces {
                points.push((b.x, b.y, b.z));
            } else {
                let t = k as f64 / pieces as f64;
                points.push((a.x + dx * t, a.y + dy * t, a.z + dz * t));
            }
        }
        index_map.push(points.len() - 1);
    }

    (points, index_map)
}

/// Compile a parsed mission against the current region snapshot.
///
/// Stage order is fixed: resolve, snap, validate containment (batched),
/// densify, reproject and re-test per point, accumulate length, remap
/// markers.
pub fn compile_mission(
    mission: &MissionDefinition,
    region: &RegionSnapshot,
    centroids: &dyn CentroidLookup,
    options: &CompileOptions,
) -> Result<CompileResult, CompileError> {
    debug_assert!(options.step_m > 0.0, "caller must reject non-positive step");

    // Stage 1: resolve commands to planar vertices and marker attachments.
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut dwells: Vec<(usize, f64)> = Vec::new();
    let mut surface: Option<usize> = None;

    for command in &mission.commands {
        match command {
            Command::Point { coordinate, .. } => vertices.push(resolve(coordinate)),
            Command::Path { waypoints, .. } => {
                vertices.extend(waypoints.iter().map(resolve));
            }
            Command::Dwell { seconds, line } => {
                if vertices.is_empty() {
                    return Err(CompileError::structural_at(
                        "DWELL must follow a waypoint",
                        *line,
                    ));
                }
                dwells.push((vertices.len() - 1, *seconds));
            }
            Command::Surface { .. } => {
                surface = if vertices.is_empty() {
                    None
                } else {
                    Some(vertices.len() - 1)
                };
            }
        }
    }

    // Stage 2
    if vertices.is_empty() {
        return Err(CompileError::structural(
            "Mission does not contain any waypoints",
        ));
    }

    // Stage 3: snap to the nearest grid centroid when requested.
    if options.snap_to_grid {
        let cell_size = options
            .grid_cell_size_m
            .ok_or_else(|| CompileError::structural("Grid cell size required for snapping"))?;
        let index = centroids
            .centroids_for(cell_size)
            .filter(|index| !index.is_empty())
            .ok_or_else(|| {
                CompileError::structural("Grid centroids not found. Build the grid first.")
            })?;
        for vertex in &mut vertices {
            if let Some(centroid) = index.nearest(vertex.x, vertex.y) {
                vertex.snapped = (centroid.x - vertex.x).abs() > SNAP_EPSILON_M
                    || (centroid.y - vertex.y).abs() > SNAP_EPSILON_M;
                vertex.x = centroid.x;
                vertex.y = centroid.y;
            }
        }
    }

    // Stage 4: batched containment validation; any violation aborts before
    // densification.
    let prepared = region.prepared();
    let violations: Vec<Violation> = vertices
        .iter()
        .enumerate()
        .filter(|(_, v)| !prepared.contains_xy(v.x, v.y))
        .map(|(index, v)| Violation {
            index,
            line: v.line,
            message: "Waypoint lies outside the operating region".to_string(),
        })
        .collect();
    if !violations.is_empty() {
        return Err(CompileError::Validation(violations));
    }

    // Stage 5
    let (points, index_map) = densify_with_map(&vertices, options.step_m);

    // Clamped monotonic attribution: each densified point belongs to the
    // vertex that begins its segment; vertex positions take their own.
    let mut attribution = Vec::with_capacity(points.len());
    let mut current = 0usize;
    for k in 0..points.len() {
        while current + 1 < index_map.len() && index_map[current + 1] == k {
            current += 1;
        }
        attribution.push(current);
    }

    // Stages 6 and 7: reproject, re-test containment per output point,
    // accumulate planar length.
    let mut waypoints = Vec::with_capacity(points.len());
    let mut total_length_m = 0.0;
    let mut previous: Option<(f64, f64)> = None;
    for (k, &(x, y, z)) in points.iter().enumerate() {
        let (lon, lat) = projection::planar_to_geographic(x, y);
        if let Some((px, py)) = previous {
            total_length_m += ((x - px).powi(2) + (y - py).powi(2)).sqrt();
        }
        let origin = vertices[attribution[k]];
        waypoints.push(MissionPoint {
            x,
            y,
            z,
            lat,
            lon,
            source_line: origin.line,
            snapped: origin.snapped,
            in_region: prepared.contains_xy(x, y),
        });
        previous = Some((x, y));
    }

    // Stage 8: remap markers through the index map, clamped to range.
    let last = index_map.len() - 1;
    let dwell_events = dwells
        .into_iter()
        .map(|(vertex_index, duration_s)| DwellEvent {
            index: index_map[vertex_index.min(last)],
            duration_s,
        })
        .collect();
    let surface_index = surface.map(|vertex_index| index_map[vertex_index.min(last)]);

    Ok(CompileResult {
        mission: mission.clone(),
        waypoints,
        total_length_m,
        step_m: options.step_m,
        dwell_events,
        surface_index,
    })
}
