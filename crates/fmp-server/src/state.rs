//! Shared application state: region snapshot cache plus the per-cell-size
//! centroid index registry.

use std::sync::Arc;

use dashmap::DashMap;

use fmp_core::compile::CentroidLookup;
use fmp_core::grid::{cell_size_key, CentroidIndex};
use fmp_region::{RegionCache, RegionClient};

use crate::artifacts;
use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub region: RegionCache,
    pub region_client: RegionClient,
    centroid_indexes: DashMap<i64, Arc<CentroidIndex>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let region_client = RegionClient::new(&config.data_dir);
        Self {
            config,
            region: RegionCache::new(),
            region_client,
            centroid_indexes: DashMap::new(),
        }
    }

    /// Register a freshly built index, replacing any previous one for the
    /// same rounded cell size.
    pub fn register_centroid_index(&self, index: CentroidIndex) -> Arc<CentroidIndex> {
        let index = Arc::new(index);
        self.centroid_indexes
            .insert(cell_size_key(index.cell_size_m()), Arc::clone(&index));
        index
    }

    /// Index for a cell size: in-memory registry first, then the persisted
    /// centroid table from a previous grid build.
    pub fn centroid_index(&self, cell_size_m: f64) -> Option<Arc<CentroidIndex>> {
        let key = cell_size_key(cell_size_m);
        if let Some(hit) = self.centroid_indexes.get(&key) {
            return Some(Arc::clone(hit.value()));
        }
        let centroids = artifacts::load_centroids(&self.config.data_dir, cell_size_m)?;
        Some(self.register_centroid_index(CentroidIndex::build(cell_size_m, centroids)))
    }
}

impl CentroidLookup for AppState {
    fn centroids_for(&self, cell_size_m: f64) -> Option<Arc<CentroidIndex>> {
        self.centroid_index(cell_size_m)
    }
}
