//! Tile key quantization.
//!
//! Viewports are cached by a quantized key derived from their center and
//! span. The grid step scales with the span (coarser grid when zoomed out),
//! so panning by less than half a cell never changes the key, while any
//! zoom change produces a new key because the step values are embedded in
//! the key itself. That last part matters: without it, two viewports at
//! different zoom levels whose rounded centers coincide would collide and
//! serve each other's cached features.

use std::fmt;

use crate::geo::Viewport;

/// Minimum quantization step in degrees (~550 m of latitude).
pub const MIN_STEP_DEGREES: f64 = 0.005;

/// Fraction of the span used as the quantization step.
pub const QUANTIZATION_FACTOR: f64 = 0.85;

/// Opaque cache key for a quantized viewport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey(String);

impl TileKey {
    /// Quantizes a viewport into its cache key.
    ///
    /// `step = max(MIN_STEP_DEGREES, span * QUANTIZATION_FACTOR)` per axis;
    /// the center is rounded to the nearest multiple of its step and the
    /// key embeds both the rounded center and the steps.
    pub fn for_viewport(viewport: &Viewport) -> Self {
        let lat_step = quantization_step(viewport.span.lat);
        let lon_step = quantization_step(viewport.span.lon);

        let lat = round_to_step(viewport.center.lat, lat_step);
        let lon = round_to_step(viewport.center.lon, lon_step);

        TileKey(format!(
            "{:.5}:{:.5}@{:.5}x{:.5}",
            lat, lon, lat_step, lon_step
        ))
    }

    /// Returns the key as a string slice, for logging.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quantization step for one axis of a span.
#[inline]
pub fn quantization_step(span_degrees: f64) -> f64 {
    (span_degrees * QUANTIZATION_FACTOR).max(MIN_STEP_DEGREES)
}

#[inline]
fn round_to_step(value: f64, step: f64) -> f64 {
    // Centers just below zero round to -0.0, which would format as
    // "-0.00000" and split one grid cell into two keys; adding 0.0
    // folds it back into +0.0.
    (value / step).round() * step + 0.0
}
