//! Geometry simplification.
//!
//! Douglas-Peucker point reduction with distances measured in meters using
//! an equirectangular approximation referenced to the geometry's median
//! latitude. Polygon rings are re-closed after simplification and
//! degenerate results fall back to the original ring.
//!
//! The engine always applies Douglas-Peucker; there is no raw-vertex
//! bypass mode. Results are cached per (fingerprint, LOD) in
//! [`cache::SimplifyCache`].

mod cache;

pub use cache::{SimplifyCache, DEFAULT_SIMPLIFY_CACHE_CAPACITY};

use crate::geo::{Coordinate, METERS_PER_DEGREE_LAT};
use crate::lod::LodLevel;

/// Geometries with fewer points than this bypass simplification entirely.
const MIN_POINTS_TO_SIMPLIFY: usize = 5;

/// Minimum point count for a simplified polygon ring (closed).
const MIN_RING_POINTS: usize = 4;

/// Simplifies an open coordinate sequence (polyline semantics).
///
/// Endpoints are always kept. Sequences shorter than
/// `MIN_POINTS_TO_SIMPLIFY` are returned unchanged.
pub fn simplify_polyline(coords: &[Coordinate], tolerance_meters: f64) -> Vec<Coordinate> {
    if coords.len() < MIN_POINTS_TO_SIMPLIFY {
        return coords.to_vec();
    }

    let proj = EquirectangularProjection::for_coords(coords);
    let mut keep = vec![false; coords.len()];
    keep[0] = true;
    keep[coords.len() - 1] = true;
    douglas_peucker(coords, 0, coords.len() - 1, tolerance_meters, &proj, &mut keep);

    coords
        .iter()
        .zip(keep.iter())
        .filter_map(|(c, &k)| if k { Some(*c) } else { None })
        .collect()
}

/// Simplifies a polygon ring and guarantees closure.
///
/// The input may be open or closed. The output ring always has
/// first == last and at least `MIN_RING_POINTS` points; a degenerate
/// simplification falls back to the (closed) original ring.
pub fn simplify_ring(coords: &[Coordinate], tolerance_meters: f64) -> Vec<Coordinate> {
    let mut simplified = simplify_polyline(coords, tolerance_meters);
    close_ring(&mut simplified);

    if simplified.len() < MIN_RING_POINTS {
        let mut original = coords.to_vec();
        close_ring(&mut original);
        return original;
    }
    simplified
}

/// Appends the first point if the sequence is not already closed.
pub fn close_ring(coords: &mut Vec<Coordinate>) {
    match (coords.first().copied(), coords.last().copied()) {
        (Some(first), Some(last)) if first != last => coords.push(first),
        _ => {}
    }
}

/// Local flat projection for perpendicular-distance math.
///
/// Longitude degrees are scaled by the cosine of the geometry's median
/// latitude so distances come out in meters. Good enough at zone scale;
/// airspace polygons span kilometers, not continents.
struct EquirectangularProjection {
    cos_lat: f64,
}

impl EquirectangularProjection {
    fn for_coords(coords: &[Coordinate]) -> Self {
        let mut lats: Vec<f64> = coords.iter().map(|c| c.lat).collect();
        lats.sort_by(|a, b| a.total_cmp(b));
        let median = if lats.is_empty() { 0.0 } else { lats[lats.len() / 2] };
        Self {
            cos_lat: median.to_radians().cos(),
        }
    }

    #[inline]
    fn to_meters(&self, c: Coordinate) -> (f64, f64) {
        (
            c.lon * METERS_PER_DEGREE_LAT * self.cos_lat,
            c.lat * METERS_PER_DEGREE_LAT,
        )
    }
}

fn douglas_peucker(
    coords: &[Coordinate],
    start: usize,
    end: usize,
    tolerance: f64,
    proj: &EquirectangularProjection,
    keep: &mut [bool],
) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in (start + 1)..end {
        let d = perpendicular_distance(coords[i], coords[start], coords[end], proj);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        keep[max_idx] = true;
        douglas_peucker(coords, start, max_idx, tolerance, proj, keep);
        douglas_peucker(coords, max_idx, end, tolerance, proj, keep);
    }
}

/// Distance in meters from `point` to the chord `a`-`b`.
fn perpendicular_distance(
    point: Coordinate,
    a: Coordinate,
    b: Coordinate,
    proj: &EquirectangularProjection,
) -> f64 {
    let (px, py) = proj.to_meters(point);
    let (ax, ay) = proj.to_meters(a);
    let (bx, by) = proj.to_meters(b);

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        // Degenerate chord: distance to the shared endpoint.
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }

    // Distance to the infinite line through a and b. Douglas-Peucker
    // uses line distance, not segment distance.
    ((px - ax) * dy - (py - ay) * dx).abs() / len_sq.sqrt()
}
