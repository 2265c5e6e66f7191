//! Level-of-detail selection.
//!
//! The viewport's latitudinal extent (in approximate meters) maps to one of
//! three discrete detail buckets. Each bucket fixes a simplification
//! tolerance, a per-reload feature cap, and the debounce delay applied to
//! viewport changes at that zoom. The cap exists because near-zoom
//! viewports fetched with large overscan can legitimately contain thousands
//! of small polygons; capping bounds per-frame overlay creation cost.

use std::time::Duration;

use crate::geo::{lat_extent_meters, LatLonSpan};

/// Latitudinal extent above which a viewport is Far.
pub const FAR_THRESHOLD_METERS: f64 = 150_000.0;

/// Latitudinal extent above which a viewport is Mid.
pub const MID_THRESHOLD_METERS: f64 = 35_000.0;

/// Discrete zoom bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LodLevel {
    Near,
    Mid,
    Far,
}

impl LodLevel {
    /// Selects the bucket for a viewport span.
    pub fn for_span(span: LatLonSpan) -> Self {
        let extent = lat_extent_meters(span);
        if extent >= FAR_THRESHOLD_METERS {
            LodLevel::Far
        } else if extent >= MID_THRESHOLD_METERS {
            LodLevel::Mid
        } else {
            LodLevel::Near
        }
    }

    /// Douglas-Peucker tolerance in meters for this bucket.
    pub fn tolerance_meters(&self) -> f64 {
        match self {
            LodLevel::Far => 120.0,
            LodLevel::Mid => 40.0,
            LodLevel::Near => 3.0,
        }
    }

    /// Maximum features rendered per reload at this bucket.
    ///
    /// Hitting the cap stops processing for the reload; remaining features
    /// are simply not rendered that frame. Lossy by design, not an error.
    pub fn feature_cap(&self) -> usize {
        match self {
            LodLevel::Far => 400,
            LodLevel::Mid => 800,
            LodLevel::Near => 1600,
        }
    }

    /// Debounce delay for viewport changes at this bucket.
    ///
    /// Faster at close zoom: users pan more deliberately there.
    pub fn debounce(&self) -> Duration {
        match self {
            LodLevel::Far => Duration::from_millis(900),
            LodLevel::Mid => Duration::from_millis(600),
            LodLevel::Near => Duration::from_millis(300),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LodLevel::Near => "near",
            LodLevel::Mid => "mid",
            LodLevel::Far => "far",
        }
    }
}

impl std::fmt::Display for LodLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
