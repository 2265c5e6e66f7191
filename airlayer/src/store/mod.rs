//! Fetch orchestration and the tile-keyed feature cache.
//!
//! `OverlayStore` owns all reload state: the LRU tile cache, the sequence
//! counter that detects superseded reloads, the cancellation token of the
//! in-flight fetch and the last failure signature for notice de-duplication.
//! It is single-writer by construction: the owning task calls
//! [`OverlayStore::begin_load`] when a reload starts and
//! [`OverlayStore::complete_load`] when the fetch results come back, while
//! the network fan-out itself ([`run_fetches`]) touches no store state at
//! all. The sequence check in `complete_load` is the only gate for publish
//! and cache-write side effects; cancellation is purely cooperative and
//! never trusted for correctness.

mod lru;

pub use lru::LruCache;

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::feature::{Feature, LayerSource};
use crate::fetch::LayerFetcher;
use crate::geo::{BBox, Viewport};
use crate::tile::TileKey;

/// Default tile cache capacity, in quantized viewports.
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 36;

/// Spans wider than this are rejected before any fetch is attempted.
pub const MAX_SANE_LAT_SPAN: f64 = 30.0;
pub const MAX_SANE_LON_SPAN: f64 = 60.0;

/// Claim on one reload. Carries everything the completion path needs to
/// decide whether the results are still current.
#[derive(Debug)]
pub struct LoadTicket {
    seq: u64,
    key: TileKey,
    /// The padded bbox the fetch fan-out should query.
    pub bbox: BBox,
    /// Token for the fetches spawned under this ticket; cancelled when a
    /// newer reload begins.
    pub cancel: CancellationToken,
}

/// Result of [`OverlayStore::begin_load`].
#[derive(Debug)]
pub enum BeginLoad {
    /// Span failed the sanity guard; nothing was started and no previous
    /// fetch was cancelled.
    SanityRejected,
    /// A reload was started. `cached` holds the last published features for
    /// this tile, suitable for an optimistic publish while fetches run.
    Start {
        ticket: LoadTicket,
        cached: Option<Arc<Vec<Feature>>>,
    },
}

/// Aggregated output of one fetch fan-out.
#[derive(Debug, Default)]
pub struct FetchResults {
    pub features: Vec<Feature>,
    pub failed_sources: Vec<LayerSource>,
    pub cancelled_sources: Vec<LayerSource>,
}

/// What [`OverlayStore::complete_load`] did with a finished fetch.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Results were current and non-degenerate: cached and publishable.
    Published {
        features: Arc<Vec<Feature>>,
        /// User-facing failure notice, present only when the failure
        /// signature changed since the last notice.
        notice: Option<String>,
    },
    /// A newer reload superseded this one; every side effect was skipped.
    Stale,
    /// Every source failed or returned nothing; the previous published
    /// state stays up rather than blanking the map.
    KeptLastGood { notice: Option<String> },
    /// Empty results with at least one cancelled source: indistinguishable
    /// from a half-finished fetch, so discarded without touching anything.
    DiscardedCancelled,
}

/// Reload state owned by the engine task.
pub struct OverlayStore {
    cache: LruCache<TileKey, Arc<Vec<Feature>>>,
    sequence: u64,
    last_failure_signature: Option<String>,
    cancel: Option<CancellationToken>,
}

impl OverlayStore {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: LruCache::new(cache_capacity),
            sequence: 0,
            last_failure_signature: None,
            cancel: None,
        }
    }

    /// Starts a reload for a viewport.
    ///
    /// Cancels the previous in-flight fetch, bumps the sequence counter and
    /// hands back a ticket capturing it. Oversized spans (transient garbage
    /// during map animations) are rejected silently before any of that.
    pub fn begin_load(&mut self, viewport: &Viewport) -> BeginLoad {
        if viewport.span.lat > MAX_SANE_LAT_SPAN || viewport.span.lon > MAX_SANE_LON_SPAN {
            debug!(
                span_lat = viewport.span.lat,
                span_lon = viewport.span.lon,
                "viewport span failed sanity guard, ignoring"
            );
            return BeginLoad::SanityRejected;
        }

        if let Some(previous) = self.cancel.take() {
            previous.cancel();
        }

        self.sequence += 1;
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        let key = TileKey::for_viewport(viewport);
        let bbox = viewport.overscanned_bbox();
        let cached = self.cache.get(&key).cloned();

        debug!(seq = self.sequence, tile = %key, bbox = %bbox, cached = cached.is_some(), "reload started");

        BeginLoad::Start {
            ticket: LoadTicket {
                seq: self.sequence,
                key,
                bbox,
                cancel,
            },
            cached,
        }
    }

    /// Applies finished fetch results.
    ///
    /// The staleness check happens here, when the completion is processed
    /// on the owning task, and gates every side effect: a superseded ticket
    /// writes nothing, publishes nothing, and emits no notice.
    pub fn complete_load(&mut self, ticket: LoadTicket, results: FetchResults) -> LoadOutcome {
        if ticket.seq != self.sequence {
            debug!(seq = ticket.seq, current = self.sequence, "discarding stale reload");
            return LoadOutcome::Stale;
        }
        self.cancel = None;

        if results.features.is_empty() && !results.cancelled_sources.is_empty() {
            debug!(tile = %ticket.key, "empty results with cancelled sources, discarding");
            return LoadOutcome::DiscardedCancelled;
        }
        if results.features.is_empty() && !results.failed_sources.is_empty() {
            let notice = self.failure_notice(&results.failed_sources);
            warn!(tile = %ticket.key, "all sources failed, keeping last good state");
            return LoadOutcome::KeptLastGood { notice };
        }

        let features = Arc::new(dedup_features(results.features));
        if let Some(evicted) = self.cache.insert(ticket.key.clone(), Arc::clone(&features)) {
            debug!(evicted = %evicted, "tile cache evicted least-recently-used entry");
        }

        let notice = self.failure_notice(&results.failed_sources);
        info!(
            tile = %ticket.key,
            count = features.len(),
            failed = results.failed_sources.len(),
            "reload published"
        );

        LoadOutcome::Published { features, notice }
    }

    /// Notice text for a set of failed sources, de-duplicated by signature.
    ///
    /// Consecutive reloads failing in the same way produce one notice, not
    /// a stream of identical ones. A fully clean reload clears the
    /// signature, so the next failure notifies again.
    fn failure_notice(&mut self, failed: &[LayerSource]) -> Option<String> {
        if failed.is_empty() {
            self.last_failure_signature = None;
            return None;
        }

        let mut names: Vec<&str> = failed.iter().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        let signature = names.join(",");

        if self.last_failure_signature.as_deref() == Some(signature.as_str()) {
            return None;
        }
        let message = format!("airspace layers unavailable: {}", names.join(", "));
        self.last_failure_signature = Some(signature);
        Some(message)
    }

    /// Number of cached tiles.
    pub fn cached_tiles(&self) -> usize {
        self.cache.len()
    }

    /// Whether a tile is currently cached (does not touch recency).
    pub fn contains_tile(&self, key: &TileKey) -> bool {
        self.cache.contains(key)
    }
}

impl Default for OverlayStore {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_CACHE_CAPACITY)
    }
}

/// Runs the per-source fetch fan-out for one ticket.
///
/// All sources run concurrently; each failure is isolated to its source.
/// This function deliberately takes no store reference: results only gain
/// meaning once [`OverlayStore::complete_load`] checks them for staleness.
pub async fn run_fetches(
    fetchers: &[Arc<dyn LayerFetcher>],
    bbox: BBox,
    cancel: CancellationToken,
) -> FetchResults {
    let attempts = fetchers.iter().map(|fetcher| {
        let cancel = cancel.clone();
        async move {
            let source = fetcher.source();
            (source, fetcher.fetch(&bbox, &cancel).await)
        }
    });

    let mut results = FetchResults::default();
    for (source, outcome) in join_all(attempts).await {
        match outcome {
            Ok(features) => {
                debug!(source = %source, count = features.len(), "source fetch succeeded");
                results.features.extend(features);
            }
            Err(e) if e.is_cancelled() => {
                debug!(source = %source, "source fetch cancelled");
                results.cancelled_sources.push(source);
            }
            Err(e) => {
                warn!(source = %source, error = %e, "source fetch failed");
                results.failed_sources.push(source);
            }
        }
    }
    results
}

/// Drops duplicate features by (source, fingerprint), keeping first
/// occurrence order. Sources occasionally return the same geometry twice
/// under different ids.
fn dedup_features(features: Vec<Feature>) -> Vec<Feature> {
    let mut seen = std::collections::HashSet::new();
    features
        .into_iter()
        .filter(|f| seen.insert((f.source, f.fingerprint)))
        .collect()
}
