//! Overlay reconciliation against an external map renderer.
//!
//! The renderer (a map widget, mocked in tests) holds opaque overlay
//! objects addressed by [`OverlayKey`]. After each publish the differ
//! computes the target overlay set for the new features at the current LOD
//! and adds only what is missing; existing overlays are left untouched so
//! the map never flickers on a pan. Removal is deferred: every
//! [`PRUNE_INTERVAL`]-th reconcile, overlays whose bounds left the
//! overscanned viewport are dropped in one batch.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::feature::{Feature, GeometryFingerprint, LayerSource, ZoneKind};
use crate::geo::{BBox, Coordinate, Viewport};
use crate::lod::LodLevel;
use crate::simplify::SimplifyCache;

/// Reconciles this many times between hard prunes.
pub const PRUNE_INTERVAL: u64 = 8;

/// Visual role of one overlay object.
///
/// A single feature renders as up to three stacked overlays; which roles
/// are present depends on the LOD and geometry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayRole {
    Fill,
    Halo,
    Stroke,
}

/// Stable identity of one renderable overlay.
///
/// Derived from the feature's content rather than its per-fetch id, so a
/// refetch of unchanged data maps to the same keys and produces no
/// renderer churn. `point_count` folds the LOD into the identity: the same
/// geometry simplified at a different LOD is a different overlay.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverlayKey {
    pub role: OverlayRole,
    pub source: LayerSource,
    pub kind: ZoneKind,
    pub fingerprint: GeometryFingerprint,
    pub point_count: usize,
}

/// Render-ready shape handed to the renderer alongside its key.
#[derive(Debug, Clone)]
pub struct RenderShape {
    pub role: OverlayRole,
    /// Simplified coordinates; closed ring for polygon roles.
    pub coords: Arc<[Coordinate]>,
    /// Bounds of the original geometry, used for pruning.
    pub bbox: BBox,
}

/// The seam to the actual map widget.
pub trait OverlayRenderer {
    fn add(&mut self, key: OverlayKey, shape: RenderShape);
    fn remove(&mut self, key: &OverlayKey);
}

/// Counters from one reconcile pass, for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub pruned: usize,
    /// True when the feature cap stopped processing early.
    pub capped: bool,
}

/// Add-only differ with periodic viewport pruning.
pub struct OverlayDiffer {
    live: HashMap<OverlayKey, BBox>,
    simplify: SimplifyCache,
    reconciles: u64,
}

impl OverlayDiffer {
    pub fn new(simplify: SimplifyCache) -> Self {
        Self {
            live: HashMap::new(),
            simplify,
            reconciles: 0,
        }
    }

    /// Builds a differ whose simplification cache is sized from the
    /// engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(SimplifyCache::new(config.simplify_cache_capacity))
    }

    /// Brings the renderer up to date with a published feature set.
    ///
    /// Processing stops at the LOD's feature cap; features past it are not
    /// rendered this pass. Lossy by design, not an error.
    pub fn reconcile(
        &mut self,
        features: &[Feature],
        viewport: &Viewport,
        renderer: &mut dyn OverlayRenderer,
    ) -> ReconcileStats {
        let lod = LodLevel::for_span(viewport.span);
        let cap = lod.feature_cap();
        let mut stats = ReconcileStats::default();

        for (processed, feature) in features.iter().enumerate() {
            if processed >= cap {
                stats.capped = true;
                break;
            }

            let coords = self.simplify.simplified(feature, lod);
            let bbox = BBox::of_coords(feature.geometry.coords());

            for &role in roles_for(lod, feature.geometry.is_polygon()) {
                let key = OverlayKey {
                    role,
                    source: feature.source,
                    kind: feature.kind,
                    fingerprint: feature.fingerprint,
                    point_count: coords.len(),
                };
                // Already on the map (or added earlier this pass for a
                // duplicate geometry): leave it alone.
                if self.live.contains_key(&key) {
                    continue;
                }
                renderer.add(
                    key.clone(),
                    RenderShape {
                        role,
                        coords: Arc::clone(&coords),
                        bbox,
                    },
                );
                self.live.insert(key, bbox);
                stats.added += 1;
            }
        }

        self.reconciles += 1;
        if self.reconciles % PRUNE_INTERVAL == 0 {
            stats.pruned = self.prune(viewport, renderer);
        }

        debug!(
            lod = %lod,
            added = stats.added,
            pruned = stats.pruned,
            capped = stats.capped,
            live = self.live.len(),
            "overlays reconciled"
        );
        stats
    }

    /// Removes every live overlay whose bounds no longer intersect the
    /// overscanned viewport.
    fn prune(&mut self, viewport: &Viewport, renderer: &mut dyn OverlayRenderer) -> usize {
        let keep_within = viewport.overscanned_bbox();
        let stale: Vec<OverlayKey> = self
            .live
            .iter()
            .filter(|(_, bbox)| !bbox.intersects(&keep_within))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            renderer.remove(key);
            self.live.remove(key);
        }
        stale.len()
    }

    /// Number of overlays currently believed live on the renderer.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// Role stack per LOD and geometry type.
///
/// Fills and halos are the expensive overlays; they drop out as the view
/// widens. Strokes survive at every LOD so zones stay visible.
fn roles_for(lod: LodLevel, is_polygon: bool) -> &'static [OverlayRole] {
    use OverlayRole::*;
    match (lod, is_polygon) {
        (LodLevel::Near, true) => &[Fill, Halo, Stroke],
        (LodLevel::Near, false) => &[Halo, Stroke],
        (LodLevel::Mid, true) => &[Fill, Stroke],
        (LodLevel::Mid, false) => &[Stroke],
        (LodLevel::Far, _) => &[Stroke],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Geometry;
    use crate::geo::LatLonSpan;

    /// Renderer double recording adds/removes.
    #[derive(Default)]
    struct RecordingRenderer {
        shapes: HashMap<OverlayKey, RenderShape>,
        adds: usize,
        removes: usize,
    }

    impl OverlayRenderer for RecordingRenderer {
        fn add(&mut self, key: OverlayKey, shape: RenderShape) {
            self.adds += 1;
            self.shapes.insert(key, shape);
        }

        fn remove(&mut self, key: &OverlayKey) {
            self.removes += 1;
            self.shapes.remove(key);
        }
    }

    fn near_viewport(lat: f64, lon: f64) -> Viewport {
        // ~1 km latitudinal extent -> Near.
        Viewport::new(Coordinate::new(lat, lon), LatLonSpan::new(0.01, 0.01))
    }

    fn polygon_at(id: &str, lat: f64, lon: f64) -> Feature {
        Feature::new(
            id.into(),
            format!("LED-R {}", id),
            Geometry::Polygon(vec![
                Coordinate::new(lat, lon),
                Coordinate::new(lat, lon + 0.01),
                Coordinate::new(lat + 0.01, lon + 0.01),
                Coordinate::new(lat + 0.01, lon),
            ]),
            LayerSource::Restricciones,
        )
    }

    fn polyline_at(id: &str, lat: f64, lon: f64) -> Feature {
        Feature::new(
            id.into(),
            format!("corridor {}", id),
            Geometry::Polyline(vec![
                Coordinate::new(lat, lon),
                Coordinate::new(lat + 0.01, lon + 0.01),
            ]),
            LayerSource::Infraestructura,
        )
    }

    #[test]
    fn test_near_polygon_gets_three_roles() {
        let mut differ = OverlayDiffer::new(SimplifyCache::default());
        let mut renderer = RecordingRenderer::default();
        let vp = near_viewport(40.0, -3.0);

        let stats = differ.reconcile(&[polygon_at("a", 40.0, -3.0)], &vp, &mut renderer);
        assert_eq!(stats.added, 3);
        assert_eq!(renderer.shapes.len(), 3);

        let roles: Vec<OverlayRole> = renderer.shapes.keys().map(|k| k.role).collect();
        assert!(roles.contains(&OverlayRole::Fill));
        assert!(roles.contains(&OverlayRole::Halo));
        assert!(roles.contains(&OverlayRole::Stroke));
    }

    #[test]
    fn test_from_config_builds_working_differ() {
        let config = EngineConfig {
            simplify_cache_capacity: 8,
            ..EngineConfig::default()
        };
        let mut differ = OverlayDiffer::from_config(&config);
        let mut renderer = RecordingRenderer::default();
        let vp = near_viewport(40.0, -3.0);

        let stats = differ.reconcile(&[polygon_at("a", 40.0, -3.0)], &vp, &mut renderer);
        assert_eq!(stats.added, 3);
        assert_eq!(differ.simplify.misses(), 1);
    }

    #[test]
    fn test_polyline_never_gets_fill() {
        let mut differ = OverlayDiffer::new(SimplifyCache::default());
        let mut renderer = RecordingRenderer::default();
        let vp = near_viewport(40.0, -3.0);

        differ.reconcile(&[polyline_at("r", 40.0, -3.0)], &vp, &mut renderer);
        assert_eq!(renderer.shapes.len(), 2);
        assert!(renderer.shapes.keys().all(|k| k.role != OverlayRole::Fill));
    }

    #[test]
    fn test_far_lod_renders_strokes_only() {
        let mut differ = OverlayDiffer::new(SimplifyCache::default());
        let mut renderer = RecordingRenderer::default();
        // ~222 km extent -> Far.
        let vp = Viewport::new(Coordinate::new(40.0, -3.0), LatLonSpan::new(2.0, 2.0));

        let stats = differ.reconcile(
            &[polygon_at("a", 40.0, -3.0), polyline_at("r", 40.1, -3.1)],
            &vp,
            &mut renderer,
        );
        assert_eq!(stats.added, 2);
        assert!(renderer.shapes.keys().all(|k| k.role == OverlayRole::Stroke));
    }

    #[test]
    fn test_second_reconcile_adds_nothing() {
        let mut differ = OverlayDiffer::new(SimplifyCache::default());
        let mut renderer = RecordingRenderer::default();
        let vp = near_viewport(40.0, -3.0);
        let features = [polygon_at("a", 40.0, -3.0), polygon_at("b", 40.02, -3.0)];

        let first = differ.reconcile(&features, &vp, &mut renderer);
        assert_eq!(first.added, 6);

        let second = differ.reconcile(&features, &vp, &mut renderer);
        assert_eq!(second.added, 0, "unchanged features must not churn the renderer");
        assert_eq!(renderer.adds, 6);
    }

    #[test]
    fn test_duplicate_geometry_added_once() {
        let mut differ = OverlayDiffer::new(SimplifyCache::default());
        let mut renderer = RecordingRenderer::default();
        let vp = near_viewport(40.0, -3.0);

        // Same geometry under two ids collapses to one overlay stack.
        let features = [polygon_at("a", 40.0, -3.0), polygon_at("a", 40.0, -3.0)];
        let stats = differ.reconcile(&features, &vp, &mut renderer);
        assert_eq!(stats.added, 3);
    }

    #[test]
    fn test_feature_cap_stops_processing() {
        let mut differ = OverlayDiffer::new(SimplifyCache::default());
        let mut renderer = RecordingRenderer::default();
        // Far cap is 400.
        let vp = Viewport::new(Coordinate::new(40.0, -3.0), LatLonSpan::new(2.0, 2.0));

        let features: Vec<Feature> = (0..450)
            .map(|i| polygon_at(&format!("z{}", i), 39.0 + i as f64 * 0.002, -3.0))
            .collect();
        let stats = differ.reconcile(&features, &vp, &mut renderer);

        assert!(stats.capped);
        assert_eq!(stats.added, 400, "Far renders one stroke per feature up to the cap");
    }

    #[test]
    fn test_hard_prune_removes_out_of_view_overlays() {
        let mut differ = OverlayDiffer::new(SimplifyCache::default());
        let mut renderer = RecordingRenderer::default();
        let home = near_viewport(40.0, -3.0);

        differ.reconcile(&[polygon_at("home", 40.0, -3.0)], &home, &mut renderer);
        assert_eq!(differ.live_count(), 3);

        // Pan far away and reconcile until the prune pass fires.
        let away = near_viewport(45.0, 10.0);
        let away_features = [polygon_at("away", 45.0, 10.0)];
        let mut pruned = 0;
        for _ in 0..PRUNE_INTERVAL {
            pruned += differ.reconcile(&away_features, &away, &mut renderer).pruned;
        }

        assert_eq!(pruned, 3, "the off-screen stack is dropped exactly once");
        assert_eq!(differ.live_count(), 3);
        assert!(renderer
            .shapes
            .values()
            .all(|s| s.bbox.intersects(&away.overscanned_bbox())));
    }

    #[test]
    fn test_prune_keeps_overlays_inside_overscan() {
        let mut differ = OverlayDiffer::new(SimplifyCache::default());
        let mut renderer = RecordingRenderer::default();
        let vp = near_viewport(40.0, -3.0);
        let features = [polygon_at("a", 40.0, -3.0)];

        for _ in 0..PRUNE_INTERVAL * 2 {
            let stats = differ.reconcile(&features, &vp, &mut renderer);
            assert_eq!(stats.pruned, 0);
        }
        assert_eq!(differ.live_count(), 3);
        assert_eq!(renderer.removes, 0);
    }
}
