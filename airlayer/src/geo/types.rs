//! Core geographic types: coordinates, spans, viewports, bounding boxes.

use std::fmt;

/// Valid latitude range in degrees.
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range in degrees.
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// A geographic coordinate in degrees.
///
/// Construction clamps to valid ranges, so a `Coordinate` is always
/// within [-90, 90] latitude and [-180, 180] longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate, clamping both axes to valid ranges.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.clamp(MIN_LAT, MAX_LAT),
            lon: lon.clamp(MIN_LON, MAX_LON),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// The angular extent of a viewport, in degrees per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonSpan {
    pub lat: f64,
    pub lon: f64,
}

impl LatLonSpan {
    /// Creates a span. Negative inputs are treated as zero.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.max(0.0),
            lon: lon.max(0.0),
        }
    }
}

/// A map viewport: visible center plus angular extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Coordinate,
    pub span: LatLonSpan,
}

impl Viewport {
    pub fn new(center: Coordinate, span: LatLonSpan) -> Self {
        Self { center, span }
    }
}

/// An axis-aligned lat/lon bounding box.
///
/// Invariant: `min_lat <= max_lat`, `min_lon <= max_lon`, and all four
/// bounds are within valid geographic ranges. The constructor normalizes
/// (swapping inverted bounds) and clamps, so every `BBox` is valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BBox {
    /// Creates a bounding box, swapping inverted bounds and clamping to
    /// valid geographic ranges.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        let (lat_lo, lat_hi) = if min_lat <= max_lat {
            (min_lat, max_lat)
        } else {
            (max_lat, min_lat)
        };
        let (lon_lo, lon_hi) = if min_lon <= max_lon {
            (min_lon, max_lon)
        } else {
            (max_lon, min_lon)
        };

        Self {
            min_lat: lat_lo.clamp(MIN_LAT, MAX_LAT),
            max_lat: lat_hi.clamp(MIN_LAT, MAX_LAT),
            min_lon: lon_lo.clamp(MIN_LON, MAX_LON),
            max_lon: lon_hi.clamp(MIN_LON, MAX_LON),
        }
    }

    /// Computes the bounding box of a coordinate sequence.
    ///
    /// Returns a degenerate point box for a single coordinate and a
    /// zero box at the origin for an empty sequence.
    pub fn of_coords(coords: &[Coordinate]) -> Self {
        let mut min_lat = MAX_LAT;
        let mut max_lat = MIN_LAT;
        let mut min_lon = MAX_LON;
        let mut max_lon = MIN_LON;

        if coords.is_empty() {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }

        for c in coords {
            min_lat = min_lat.min(c.lat);
            max_lat = max_lat.max(c.lat);
            min_lon = min_lon.min(c.lon);
            max_lon = max_lon.max(c.lon);
        }

        Self::new(min_lat, max_lat, min_lon, max_lon)
    }

    /// Returns true if the two boxes overlap (boundary contact counts).
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
    }

    /// Returns true if the coordinate lies inside the box (inclusive).
    pub fn contains(&self, c: Coordinate) -> bool {
        c.lat >= self.min_lat && c.lat <= self.max_lat && c.lon >= self.min_lon && c.lon <= self.max_lon
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.5},{:.5}]x[{:.5},{:.5}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}
