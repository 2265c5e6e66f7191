//! Engine configuration.

use crate::fetch::RetryConfig;
use crate::simplify::DEFAULT_SIMPLIFY_CACHE_CAPACITY;
use crate::store::DEFAULT_TILE_CACHE_CAPACITY;

/// Tuning knobs for the overlay engine and its collaborators.
///
/// Defaults are the production values; tests shrink the capacities and
/// buffers to force the interesting paths.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quantized viewports kept in the tile cache.
    pub tile_cache_capacity: usize,
    /// Entries in the per-geometry simplification cache.
    pub simplify_cache_capacity: u64,
    /// Retry/backoff tuning shared by all layer fetchers.
    pub retry: RetryConfig,
    /// Buffered viewport events before senders back-pressure.
    pub viewport_buffer: usize,
    /// Buffered user-facing notices; overflow is dropped with a warning.
    pub notice_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_cache_capacity: DEFAULT_TILE_CACHE_CAPACITY,
            simplify_cache_capacity: DEFAULT_SIMPLIFY_CACHE_CAPACITY,
            retry: RetryConfig::default(),
            viewport_buffer: 16,
            notice_buffer: 8,
        }
    }
}
