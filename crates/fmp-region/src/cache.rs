//! Process-wide immutable-snapshot cache for the operating region.
//!
//! Readers always see a complete snapshot; refresh swaps the whole value and
//! a failed refresh leaves the previous snapshot intact.

use std::sync::{Arc, RwLock};

use fmp_core::region::RegionSnapshot;

use crate::{ProviderError, RegionClient};

#[derive(Default)]
pub struct RegionCache {
    current: RwLock<Option<Arc<RegionSnapshot>>>,
}

impl RegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if one has been installed.
    pub fn current(&self) -> Option<Arc<RegionSnapshot>> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    /// Atomically replace the cached snapshot.
    pub fn install(&self, snapshot: RegionSnapshot) -> Arc<RegionSnapshot> {
        let snapshot = Arc::new(snapshot);
        if let Ok(mut guard) = self.current.write() {
            *guard = Some(Arc::clone(&snapshot));
        }
        snapshot
    }

    /// Return the cached snapshot, loading it through the client when empty.
    pub async fn ensure(&self, client: &RegionClient) -> Result<Arc<RegionSnapshot>, ProviderError> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        let snapshot = client.load(false).await?;
        tracing::info!(source = %snapshot.source, "region snapshot installed");
        Ok(self.install(snapshot))
    }

    /// Force a re-download. On failure the previous snapshot stays usable.
    pub async fn refresh(&self, client: &RegionClient) -> Result<Arc<RegionSnapshot>, ProviderError> {
        let snapshot = client.load(true).await?;
        tracing::info!(source = %snapshot.source, "region snapshot refreshed");
        Ok(self.install(snapshot))
    }
}
