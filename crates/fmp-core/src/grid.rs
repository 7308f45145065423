//! Uniform square partition of the region's bounding box, clipped to the
//! region. Surviving cells carry centroids used for waypoint snapping.

use geo::{
    Area, BooleanOps, BoundingRect, Centroid as _, Coord, Intersects, LineString, MultiLineString,
    MultiPolygon, Rect,
};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::projection;
use crate::region::RegionSnapshot;

/// Ceiling on cols * rows, enforced before any geometry work begins.
pub const MAX_GRID_CELLS: usize = 400_000;

/// One surviving lattice cell, clipped to the region.
#[derive(Debug, Clone)]
pub struct GridCell {
    /// Sequential id from 1; join key shared with the centroid table.
    pub id: u32,
    pub i: u32,
    pub j: u32,
    pub polygon: MultiPolygon<f64>,
}

/// Centroid of a surviving cell. Persisted as the flat snapping table keyed
/// by rounded cell size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub id: u32,
    pub i: u32,
    pub j: u32,
    pub x: f64,
    pub y: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Result of one grid build. Cells and centroids are owned by the caller.
#[derive(Debug, Clone)]
pub struct GridBuild {
    pub cell_size_m: f64,
    pub cells: Vec<GridCell>,
    pub centroids: Vec<Centroid>,
    /// Lattice lines clipped to the region, planar coordinates.
    pub grid_lines: MultiLineString<f64>,
    /// Planar bounds of the surviving cells.
    pub bounds: Rect<f64>,
    /// Lattice origin, snapped down to a multiple of the cell size.
    pub origin: (f64, f64),
}

/// Key for persisted centroid tables and the in-memory index registry.
pub fn cell_size_key(cell_size_m: f64) -> i64 {
    cell_size_m.round() as i64
}

/// Partition the region's bounding box, clip every lattice cell to the
/// region, and emit surviving cells with centroids plus the clipped
/// grid-line network.
pub fn build_grid(region: &RegionSnapshot, cell_size_m: f64) -> Result<GridBuild, GridError> {
    if !(cell_size_m > 0.0) {
        return Err(GridError::InvalidCellSize);
    }

    let bounds = region.bounds();
    let width = bounds.max().x - bounds.min().x;
    let height = bounds.max().y - bounds.min().y;

    let cols = (width / cell_size_m).ceil() as u64;
    let rows = (height / cell_size_m).ceil() as u64;
    if cols.saturating_mul(rows) > MAX_GRID_CELLS as u64 {
        return Err(GridError::TooLarge {
            cols,
            rows,
            limit: MAX_GRID_CELLS,
        });
    }
    let cols = cols as u32;
    let rows = rows as u32;

    let origin_x = (bounds.min().x / cell_size_m).floor() * cell_size_m;
    let origin_y = (bounds.min().y / cell_size_m).floor() * cell_size_m;

    let polygon = region.polygon();
    let mut cells: Vec<GridCell> = Vec::new();
    let mut centroids: Vec<Centroid> = Vec::new();
    let mut cell_bounds: Option<Rect<f64>> = None;

    for i in 0..cols {
        for j in 0..rows {
            let x0 = origin_x + f64::from(i) * cell_size_m;
            let y0 = origin_y + f64::from(j) * cell_size_m;
            let cell = Rect::new(
                Coord { x: x0, y: y0 },
                Coord {
                    x: x0 + cell_size_m,
                    y: y0 + cell_size_m,
                },
            )
            .to_polygon();
            if !polygon.intersects(&cell) {
                continue;
            }
            let clipped = polygon.intersection(&cell);
            if clipped.0.is_empty() || clipped.unsigned_area() == 0.0 {
                continue;
            }
            let Some(center) = clipped.centroid() else {
                continue;
            };

            let id = cells.len() as u32 + 1;
            let (lon, lat) = projection::planar_to_geographic(center.x(), center.y());
            centroids.push(Centroid {
                id,
                i,
                j,
                x: center.x(),
                y: center.y(),
                lat,
                lon,
            });
            if let Some(rect) = clipped.bounding_rect() {
                cell_bounds = Some(match cell_bounds {
                    None => rect,
                    Some(acc) => Rect::new(
                        Coord {
                            x: acc.min().x.min(rect.min().x),
                            y: acc.min().y.min(rect.min().y),
                        },
                        Coord {
                            x: acc.max().x.max(rect.max().x),
                            y: acc.max().y.max(rect.max().y),
                        },
                    ),
                });
            }
            cells.push(GridCell {
                id,
                i,
                j,
                polygon: clipped,
            });
        }
    }

    let Some(bounds) = cell_bounds else {
        return Err(GridError::Empty);
    };

    let grid_lines = clip_lattice_lines(region, cell_size_m, origin_x, origin_y, cols, rows);

    Ok(GridBuild {
        cell_size_m,
        cells,
        centroids,
        grid_lines,
        bounds,
        origin: (origin_x, origin_y),
    })
}

fn clip_lattice_lines(
    region: &RegionSnapshot,
    cell_size_m: f64,
    origin_x: f64,
    origin_y: f64,
    cols: u32,
    rows: u32,
) -> MultiLineString<f64> {
    let max_x = origin_x + f64::from(cols) * cell_size_m;
    let max_y = origin_y + f64::from(rows) * cell_size_m;

    let mut lines: Vec<LineString<f64>> = Vec::with_capacity(cols as usize + rows as usize + 2);
    for i in 0..=cols {
        let x = origin_x + f64::from(i) * cell_size_m;
        lines.push(LineString::from(vec![(x, origin_y), (x, max_y)]));
    }
    for j in 0..=rows {
        let y = origin_y + f64::from(j) * cell_size_m;
        lines.push(LineString::from(vec![(origin_x, y), (max_x, y)]));
    }

    region.polygon().clip(&MultiLineString::new(lines), false)
}

impl RTreeObject for Centroid {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for Centroid {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree over one cell size's centroid table, built once per requested cell
/// size and reusable across compile calls.
#[derive(Debug)]
pub struct CentroidIndex {
    cell_size_m: f64,
    tree: RTree<Centroid>,
    len: usize,
}

impl CentroidIndex {
    pub fn build(cell_size_m: f64, centroids: Vec<Centroid>) -> Self {
        let len = centroids.len();
        Self {
            cell_size_m,
            tree: RTree::bulk_load(centroids),
            len,
        }
    }

    pub fn cell_size_m(&self) -> f64 {
        self.cell_size_m
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nearest centroid to a planar point.
    pub fn nearest(&self, x: f64, y: f64) -> Option<&Centroid> {
        self.tree.nearest_neighbor(&[x, y])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square_region(side: f64) -> RegionSnapshot {
        RegionSnapshot::from_planar(
            polygon![
                (x: 0.0, y: 0.0),
                (x: side, y: 0.0),
                (x: side, y: side),
                (x: 0.0, y: side),
            ],
            "test",
        )
        .unwrap()
    }

    #[test]
    fn square_region_fills_with_full_cells() {
        let region = square_region(1000.0);
        let build = build_grid(&region, 100.0).unwrap();
        assert_eq!(build.cells.len(), 100);
        assert_eq!(build.centroids.len(), 100);
        assert_eq!(build.origin, (0.0, 0.0));
        assert_eq!(build.cells[0].id, 1);
        assert_eq!(build.centroids[0].id, 1);
        // First cell is the full 100 m square; its centroid sits at (50, 50).
        assert!((build.centroids[0].x - 50.0).abs() < 1e-9);
        assert!((build.centroids[0].y - 50.0).abs() < 1e-9);
        assert!((build.bounds.max().x - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn ids_join_cells_and_centroids() {
        let region = square_region(300.0);
        let build = build_grid(&region, 100.0).unwrap();
        for (cell, centroid) in build.cells.iter().zip(&build.centroids) {
            assert_eq!(cell.id, centroid.id);
            assert_eq!((cell.i, cell.j), (centroid.i, centroid.j));
        }
    }

    #[test]
    fn over_dense_request_fails_before_geometry() {
        let region = square_region(1000.0);
        let err = build_grid(&region, 0.5).unwrap_err();
        assert!(matches!(err, GridError::TooLarge { .. }));
    }

    #[test]
    fn non_positive_cell_size_is_invalid() {
        let region = square_region(1000.0);
        assert!(matches!(
            build_grid(&region, 0.0),
            Err(GridError::InvalidCellSize)
        ));
        assert!(matches!(
            build_grid(&region, -5.0),
            Err(GridError::InvalidCellSize)
        ));
    }

    #[test]
    fn grid_lines_are_clipped_to_region() {
        let region = square_region(1000.0);
        let build = build_grid(&region, 250.0).unwrap();
        assert!(!build.grid_lines.0.is_empty());
        for line in &build.grid_lines {
            for coord in line.coords() {
                assert!(coord.x >= -1e-6 && coord.x <= 1000.0 + 1e-6);
                assert!(coord.y >= -1e-6 && coord.y <= 1000.0 + 1e-6);
            }
        }
    }

    #[test]
    fn triangle_region_drops_outside_cells() {
        let region = RegionSnapshot::from_planar(
            polygon![
                (x: 0.0, y: 0.0),
                (x: 1000.0, y: 0.0),
                (x: 0.0, y: 1000.0),
            ],
            "tri",
        )
        .unwrap();
        let build = build_grid(&region, 100.0).unwrap();
        // Half the square survives, give or take the diagonal cells.
        assert!(build.cells.len() > 50 && build.cells.len() < 100);
    }

    #[test]
    fn nearest_centroid_lookup() {
        let region = square_region(1000.0);
        let build = build_grid(&region, 100.0).unwrap();
        let index = CentroidIndex::build(100.0, build.centroids);
        let hit = index.nearest(12.0, 961.0).unwrap();
        assert!((hit.x - 50.0).abs() < 1e-9);
        assert!((hit.y - 950.0).abs() < 1e-9);
        assert_eq!(index.len(), 100);
    }

    #[test]
    fn cell_size_key_rounds() {
        assert_eq!(cell_size_key(100.0), 100);
        assert_eq!(cell_size_key(99.6), 100);
        assert_eq!(cell_size_key(0.4), 0);
    }
}
