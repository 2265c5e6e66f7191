//! Geographic primitives and viewport math.
//!
//! Provides the coordinate/bbox types shared by the whole engine plus the
//! overscan calculator: the pure function that turns a viewport into the
//! padded bounding box actually sent to the remote layers.

mod types;

pub use types::{BBox, Coordinate, LatLonSpan, Viewport, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Approximate meters per degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_000.0;

/// Upper bound for the overscan margin fraction.
const MAX_MARGIN: f64 = 0.5;

/// Converts a span's latitudinal extent to approximate meters.
#[inline]
pub fn lat_extent_meters(span: LatLonSpan) -> f64 {
    span.lat * METERS_PER_DEGREE_LAT
}

/// Zoom-dependent overscan margin for a viewport span.
///
/// Close zooms get larger fractional margins: at close zoom, polygon edges
/// are more likely to cross the viewport boundary and must be pre-fetched
/// before they scroll into view. Non-increasing as the span grows.
pub fn overscan_margin(span: LatLonSpan) -> f64 {
    let extent_m = lat_extent_meters(span);
    if extent_m <= 2_000.0 {
        0.45
    } else if extent_m <= 10_000.0 {
        0.35
    } else if extent_m <= 50_000.0 {
        0.25
    } else {
        0.15
    }
}

impl Viewport {
    /// Computes the padded bounding box used for layer fetches.
    ///
    /// Each half-span is expanded by `(1 + margin)`, then the result is
    /// clamped to valid geographic bounds and normalized. The margin is
    /// clamped to [0, 0.5]. Total: always returns a valid `BBox`.
    pub fn fetch_bbox(&self, margin: f64) -> BBox {
        let margin = margin.clamp(0.0, MAX_MARGIN);
        let half_lat = self.span.lat / 2.0 * (1.0 + margin);
        let half_lon = self.span.lon / 2.0 * (1.0 + margin);

        BBox::new(
            self.center.lat - half_lat,
            self.center.lat + half_lat,
            self.center.lon - half_lon,
            self.center.lon + half_lon,
        )
    }

    /// Fetch bbox with the zoom-appropriate overscan margin applied.
    pub fn overscanned_bbox(&self) -> BBox {
        self.fetch_bbox(overscan_margin(self.span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_bbox_concrete_scenario() {
        // span 0.01x0.01 at (40, -3), margin 0.45 -> half-span * 1.45 = 0.00725
        let vp = Viewport::new(Coordinate::new(40.0, -3.0), LatLonSpan::new(0.01, 0.01));
        let b = vp.fetch_bbox(0.45);

        assert!((b.min_lat - 39.99275).abs() < 1e-9, "min_lat {}", b.min_lat);
        assert!((b.max_lat - 40.00725).abs() < 1e-9, "max_lat {}", b.max_lat);
        assert!((b.min_lon - (-3.00725)).abs() < 1e-9, "min_lon {}", b.min_lon);
        assert!((b.max_lon - (-2.99275)).abs() < 1e-9, "max_lon {}", b.max_lon);
    }

    #[test]
    fn test_fetch_bbox_clamps_margin() {
        let vp = Viewport::new(Coordinate::new(0.0, 0.0), LatLonSpan::new(1.0, 1.0));
        let capped = vp.fetch_bbox(5.0);
        let expected = vp.fetch_bbox(0.5);
        assert_eq!(capped, expected);

        let negative = vp.fetch_bbox(-1.0);
        let unpadded = vp.fetch_bbox(0.0);
        assert_eq!(negative, unpadded);
    }

    #[test]
    fn test_fetch_bbox_clamps_at_poles() {
        let vp = Viewport::new(Coordinate::new(89.9, 0.0), LatLonSpan::new(1.0, 1.0));
        let b = vp.fetch_bbox(0.3);
        assert!(b.max_lat <= 90.0);
        assert!(b.min_lat <= b.max_lat);
    }

    #[test]
    fn test_overscan_margin_table() {
        // ~1.1 km extent -> closest zoom bucket
        assert_eq!(overscan_margin(LatLonSpan::new(0.01, 0.01)), 0.45);
        // ~5.5 km
        assert_eq!(overscan_margin(LatLonSpan::new(0.05, 0.05)), 0.35);
        // ~33 km
        assert_eq!(overscan_margin(LatLonSpan::new(0.3, 0.3)), 0.25);
        // ~111 km
        assert_eq!(overscan_margin(LatLonSpan::new(1.0, 1.0)), 0.15);
    }

    #[test]
    fn test_overscan_margin_monotonic_at_thresholds() {
        // Margin must never increase as the span grows.
        let spans = [0.001, 0.018, 0.0181, 0.09, 0.091, 0.45, 0.4505, 2.0, 30.0];
        let mut last = f64::INFINITY;
        for s in spans {
            let m = overscan_margin(LatLonSpan::new(s, s));
            assert!(m <= last, "margin increased at span {}", s);
            last = m;
        }
    }

    #[test]
    fn test_lat_extent_meters() {
        let m = lat_extent_meters(LatLonSpan::new(0.01, 0.5));
        assert!((m - 1_110.0).abs() < 1e-6);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_fetch_bbox_always_valid(
                lat in -90.0..90.0_f64,
                lon in -180.0..180.0_f64,
                span_lat in 0.0..400.0_f64,
                span_lon in 0.0..400.0_f64,
                margin in -2.0..2.0_f64,
            ) {
                let vp = Viewport::new(
                    Coordinate::new(lat, lon),
                    LatLonSpan::new(span_lat, span_lon),
                );
                let b = vp.fetch_bbox(margin);

                prop_assert!(b.min_lat <= b.max_lat);
                prop_assert!(b.min_lon <= b.max_lon);
                prop_assert!(b.min_lat >= MIN_LAT && b.max_lat <= MAX_LAT);
                prop_assert!(b.min_lon >= MIN_LON && b.max_lon <= MAX_LON);
            }

            #[test]
            fn test_overscan_margin_monotonic(
                a in 0.0001..10.0_f64,
                b in 0.0001..10.0_f64,
            ) {
                let (small, large) = if a <= b { (a, b) } else { (b, a) };
                let m_small = overscan_margin(LatLonSpan::new(small, small));
                let m_large = overscan_margin(LatLonSpan::new(large, large));
                prop_assert!(m_large <= m_small);
            }

            #[test]
            fn test_fetch_bbox_contains_center(
                lat in -89.0..89.0_f64,
                lon in -179.0..179.0_f64,
                span in 0.001..1.0_f64,
            ) {
                let vp = Viewport::new(Coordinate::new(lat, lon), LatLonSpan::new(span, span));
                let b = vp.overscanned_bbox();
                prop_assert!(b.contains(vp.center));
            }
        }
    }
}
