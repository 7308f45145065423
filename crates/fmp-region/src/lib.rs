//! Region provider: acquires the operating-region polygon from remote
//! GeoJSON sources, persists a disk snapshot, and serves an immutable
//! in-memory snapshot behind whole-replace semantics.

pub mod cache;
pub mod client;

pub use cache::RegionCache;
pub use client::{RegionClient, RegionSource, REGION_SOURCES};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("region request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("region source returned no usable polygon")]
    NoGeometry,
    #[error("region cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Geometry(#[from] fmp_core::RegionError),
    #[error("unable to load the operating region from any source")]
    AllSourcesFailed,
}
