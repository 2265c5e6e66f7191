//! Per-geometry, per-LOD simplification cache.
//!
//! Keyed by (fingerprint of the original geometry, LOD bucket), so repeated
//! renders of the same feature at the same zoom bucket are O(1) lookups.
//! Backed by `moka::sync::Cache` with a bounded entry count, evicted
//! independently of the tile cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;

use crate::feature::{Feature, Geometry, GeometryFingerprint};
use crate::geo::Coordinate;
use crate::lod::LodLevel;
use crate::simplify::{simplify_polyline, simplify_ring};

/// Default entry bound for the simplification cache.
pub const DEFAULT_SIMPLIFY_CACHE_CAPACITY: u64 = 1200;

/// Cache of simplified coordinate sequences.
pub struct SimplifyCache {
    cache: Cache<(GeometryFingerprint, LodLevel), Arc<[Coordinate]>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SimplifyCache {
    /// Creates a cache bounded to `capacity` entries.
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the render-ready coordinate sequence for a feature at a LOD.
    ///
    /// Polygons come back as closed rings (first == last), polylines as
    /// simplified open sequences. The cache key uses the fingerprint of the
    /// original geometry, never the simplified output.
    pub fn simplified(&self, feature: &Feature, lod: LodLevel) -> Arc<[Coordinate]> {
        let key = (feature.fingerprint, lod);
        if let Some(cached) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return cached;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let tolerance = lod.tolerance_meters();
        let simplified: Arc<[Coordinate]> = match &feature.geometry {
            Geometry::Polygon(coords) => simplify_ring(coords, tolerance).into(),
            Geometry::Polyline(coords) => simplify_polyline(coords, tolerance).into(),
        };

        self.cache.insert(key, Arc::clone(&simplified));
        simplified
    }

    /// Cache hits since creation.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Cache misses (i.e. simplification computations) since creation.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for SimplifyCache {
    fn default() -> Self {
        Self::new(DEFAULT_SIMPLIFY_CACHE_CAPACITY)
    }
}
