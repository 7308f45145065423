//! HTTP client for the region source chain, with a GeoJSON disk cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use geo::{Area, LineString, Polygon};
use reqwest::Client;
use serde_json::{json, Value};

use fmp_core::region::RegionSnapshot;

use crate::ProviderError;

/// One remote GeoJSON source for the region polygon.
#[derive(Debug, Clone, Copy)]
pub struct RegionSource {
    pub name: &'static str,
    pub url: &'static str,
}

/// Ordered fallback chain; sources are tried until one yields a polygon.
pub const REGION_SOURCES: &[RegionSource] = &[
    RegionSource {
        name: "fdot_geojson",
        url: "https://services.arcgis.com/CTjHJfLRMDtfE9Eh/arcgis/rest/services/Detailed_Florida_State_Boundary/FeatureServer/0/query?where=1=1&outFields=*&f=geojson",
    },
    RegionSource {
        name: "tigerweb_state",
        url: "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/State_County/MapServer/0/query?where=STUSPS%3D%27FL%27&outFields=*&f=geojson",
    },
];

const CACHE_FILE: &str = "region.geojson";
const META_FILE: &str = "region.json";

/// Downloads and caches the region polygon. All geometry leaves this crate
/// as a complete [`RegionSnapshot`].
pub struct RegionClient {
    client: Client,
    sources: Vec<RegionSource>,
    data_dir: PathBuf,
}

impl RegionClient {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_sources(data_dir, REGION_SOURCES.to_vec())
    }

    pub fn with_sources(data_dir: impl Into<PathBuf>, sources: Vec<RegionSource>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
            sources,
            data_dir: data_dir.into(),
        }
    }

    /// Load the region snapshot: disk cache first unless a refresh is
    /// forced, then the source chain. A successful download replaces the
    /// disk cache.
    pub async fn load(&self, force_refresh: bool) -> Result<RegionSnapshot, ProviderError> {
        if !force_refresh {
            if let Some(snapshot) = self.read_cache() {
                return Ok(snapshot);
            }
        }

        for source in &self.sources {
            tracing::info!(source = source.name, "downloading region source");
            match self.download(source).await {
                Ok(snapshot) => {
                    if let Err(err) = self.write_cache(&snapshot) {
                        tracing::warn!(error = %err, "failed to persist region cache");
                    }
                    return Ok(snapshot);
                }
                Err(err) => {
                    tracing::warn!(source = source.name, error = %err, "region source failed");
                }
            }
        }

        Err(ProviderError::AllSourcesFailed)
    }

    async fn download(&self, source: &RegionSource) -> Result<RegionSnapshot, ProviderError> {
        let response = self.client.get(source.url).send().await?;
        let body: Value = response.error_for_status()?.json().await?;
        let geographic = largest_polygon(&body).ok_or(ProviderError::NoGeometry)?;
        Ok(RegionSnapshot::from_geographic(geographic, source.name)?)
    }

    fn cache_path(&self) -> PathBuf {
        self.data_dir.join(CACHE_FILE)
    }

    fn read_cache(&self) -> Option<RegionSnapshot> {
        let text = std::fs::read_to_string(self.cache_path()).ok()?;
        let body: Value = serde_json::from_str(&text).ok()?;
        let geographic = largest_polygon(&body)?;
        RegionSnapshot::from_geographic(geographic, "cache").ok()
    }

    fn write_cache(&self, snapshot: &RegionSnapshot) -> Result<(), ProviderError> {
        std::fs::create_dir_all(&self.data_dir)?;
        let feature = snapshot.as_geographic_feature();
        let collection = json!({ "type": "FeatureCollection", "features": [feature] });
        std::fs::write(self.cache_path(), serde_json::to_string(&collection)?.as_bytes())
            .map_err(ProviderError::from)?;

        let geo_bounds = snapshot.geographic_bounds();
        let bounds = snapshot.bounds();
        let meta = json!({
            "source": snapshot.source,
            "fetched_at": snapshot.fetched_at.to_rfc3339(),
            "bounds_26917": [bounds.min().x, bounds.min().y, bounds.max().x, bounds.max().y],
            "bounds_4326": geo_bounds.map(|r| json!([r.min().x, r.min().y, r.max().x, r.max().y])),
        });
        std::fs::write(
            self.data_dir.join(META_FILE),
            serde_json::to_string_pretty(&meta)?.as_bytes(),
        )?;
        Ok(())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

/// Pull every polygon out of a GeoJSON document and keep the one with the
/// largest exterior ring. Stands in for a dissolve over multipart sources.
fn largest_polygon(document: &Value) -> Option<Polygon<f64>> {
    let mut rings: Vec<Vec<(f64, f64)>> = Vec::new();
    collect_rings(document, &mut rings);

    let mut best: Option<Polygon<f64>> = None;
    let mut best_area = 0.0;
    for ring in rings {
        if ring.len() < 4 {
            continue;
        }
        let polygon = Polygon::new(LineString::from(ring), vec![]);
        let area = polygon.unsigned_area();
        if area > best_area {
            best_area = area;
            best = Some(polygon);
        }
    }
    best
}

fn collect_rings(value: &Value, rings: &mut Vec<Vec<(f64, f64)>>) {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            if let Some(features) = value.get("features").and_then(Value::as_array) {
                for feature in features {
                    collect_rings(feature, rings);
                }
            }
        }
        Some("Feature") => {
            if let Some(geometry) = value.get("geometry") {
                collect_rings(geometry, rings);
            }
        }
        Some("Polygon") => {
            if let Some(ring) = value
                .get("coordinates")
                .and_then(Value::as_array)
                .and_then(|rs| rs.first())
            {
                if let Some(parsed) = parse_ring(ring) {
                    rings.push(parsed);
                }
            }
        }
        Some("MultiPolygon") => {
            if let Some(polygons) = value.get("coordinates").and_then(Value::as_array) {
                for polygon in polygons {
                    if let Some(ring) = polygon.as_array().and_then(|rs| rs.first()) {
                        if let Some(parsed) = parse_ring(ring) {
                            rings.push(parsed);
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

fn parse_ring(ring: &Value) -> Option<Vec<(f64, f64)>> {
    let coords = ring.as_array()?;
    let mut parsed = Vec::with_capacity(coords.len());
    for pair in coords {
        let pair = pair.as_array()?;
        let lon = pair.first()?.as_f64()?;
        let lat = pair.get(1)?.as_f64()?;
        parsed.push((lon, lat));
    }
    Some(parsed)
}
