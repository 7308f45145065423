//! Operating-region snapshot shared read-only by the grid builder and the
//! mission compiler.

use chrono::{DateTime, Utc};
use geo::{BoundingRect, Intersects, LineString, Point, Polygon, Rect};

use crate::error::RegionError;
use crate::export;
use crate::projection;

/// One complete region snapshot: the planar polygon all geometric work runs
/// against, plus its geographic equivalent for reporting. Snapshots are
/// immutable; refresh replaces the whole value.
#[derive(Debug, Clone)]
pub struct RegionSnapshot {
    polygon: Polygon<f64>,
    geographic: Polygon<f64>,
    bounds: Rect<f64>,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
}

fn reproject_polygon(polygon: &Polygon<f64>, map: impl Fn(f64, f64) -> (f64, f64)) -> Polygon<f64> {
    let ring = |ls: &LineString<f64>| {
        LineString::from(
            ls.coords()
                .map(|c| map(c.x, c.y))
                .collect::<Vec<(f64, f64)>>(),
        )
    };
    Polygon::new(
        ring(polygon.exterior()),
        polygon.interiors().iter().map(ring).collect(),
    )
}

impl RegionSnapshot {
    /// Build a snapshot from a planar (EPSG:26917) polygon; the geographic
    /// twin is derived through the inverse projection.
    pub fn from_planar(polygon: Polygon<f64>, source: impl Into<String>) -> Result<Self, RegionError> {
        let geographic = reproject_polygon(&polygon, |x, y| projection::planar_to_geographic(x, y));
        Self::new(polygon, geographic, source)
    }

    /// Build a snapshot from a geographic (lon/lat) polygon; the planar twin
    /// is derived through the forward projection.
    pub fn from_geographic(
        geographic: Polygon<f64>,
        source: impl Into<String>,
    ) -> Result<Self, RegionError> {
        let polygon =
            reproject_polygon(&geographic, |lon, lat| projection::geographic_to_planar(lon, lat));
        Self::new(polygon, geographic, source)
    }

    fn new(
        polygon: Polygon<f64>,
        geographic: Polygon<f64>,
        source: impl Into<String>,
    ) -> Result<Self, RegionError> {
        if polygon.exterior().0.len() < 4 {
            return Err(RegionError(
                "exterior ring needs at least three distinct vertices".into(),
            ));
        }
        let bounds = polygon
            .bounding_rect()
            .ok_or_else(|| RegionError("polygon has no bounding box".into()))?;
        Ok(Self {
            polygon,
            geographic,
            bounds,
            source: source.into(),
            fetched_at: Utc::now(),
        })
    }

    /// Current planar polygon (read-only).
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Geographic (lon/lat) polygon, reporting only.
    pub fn geographic(&self) -> &Polygon<f64> {
        &self.geographic
    }

    /// Planar bounding box.
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Geographic bounding box for reporting.
    pub fn geographic_bounds(&self) -> Option<Rect<f64>> {
        self.geographic.bounding_rect()
    }

    /// Query-optimized form for repeated containment tests.
    pub fn prepared(&self) -> PreparedRegion<'_> {
        PreparedRegion {
            bounds: self.bounds,
            polygon: &self.polygon,
        }
    }

    /// GeoJSON feature of the geographic polygon.
    pub fn as_geographic_feature(&self) -> serde_json::Value {
        export::feature(
            export::polygon_geometry(&self.geographic),
            serde_json::json!({ "source": self.source }),
        )
    }
}

/// Bounding-box quick reject wrapped around a boundary-inclusive
/// point-in-polygon test.
#[derive(Debug, Clone, Copy)]
pub struct PreparedRegion<'a> {
    bounds: Rect<f64>,
    polygon: &'a Polygon<f64>,
}

impl PreparedRegion<'_> {
    /// Boundary-inclusive containment test in planar space.
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        if x < self.bounds.min().x
            || x > self.bounds.max().x
            || y < self.bounds.min().y
            || y > self.bounds.max().y
        {
            return false;
        }
        Point::new(x, y).intersects(self.polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square() -> RegionSnapshot {
        RegionSnapshot::from_planar(
            polygon![
                (x: 0.0, y: 0.0),
                (x: 1000.0, y: 0.0),
                (x: 1000.0, y: 1000.0),
                (x: 0.0, y: 1000.0),
            ],
            "test",
        )
        .unwrap()
    }

    #[test]
    fn containment_is_boundary_inclusive() {
        let region = square();
        let prepared = region.prepared();
        assert!(prepared.contains_xy(500.0, 500.0));
        assert!(prepared.contains_xy(0.0, 0.0));
        assert!(prepared.contains_xy(1000.0, 500.0));
        assert!(!prepared.contains_xy(1000.1, 500.0));
        assert!(!prepared.contains_xy(-5.0, 500.0));
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        let err = RegionSnapshot::from_planar(
            Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]), vec![]),
            "bad",
        );
        assert!(err.is_err());
    }

    #[test]
    fn geographic_feature_has_polygon_geometry() {
        let feature = square().as_geographic_feature();
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["geometry"]["type"], "Polygon");
        assert_eq!(feature["properties"]["source"], "test");
    }
}
