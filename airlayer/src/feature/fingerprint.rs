//! Stable geometry fingerprinting.
//!
//! A fingerprint is a hash of a geometry's original (unsimplified)
//! coordinate sequence, quantized to microdegrees. Repeated fetches of a
//! logically-identical geometry produce the same fingerprint even when the
//! upstream service emits slightly different float text, which makes the
//! fingerprint usable as the identity component of simplification-cache
//! and overlay keys. It is never derived from simplified output.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::geo::Coordinate;

/// Quantization factor: 1e-6 degrees is roughly 0.11 m of latitude.
const MICRODEGREES: f64 = 1_000_000.0;

/// Identity hash of an original coordinate sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryFingerprint(u64);

impl GeometryFingerprint {
    /// Fingerprints a coordinate sequence.
    ///
    /// Coordinates are rounded to integer microdegrees and hashed as
    /// little-endian i64 pairs. The fixed-point representation keeps the
    /// hash stable across platforms; hashing raw f64 bits would not be.
    pub fn of(coords: &[Coordinate]) -> Self {
        let mut hasher = Sha256::new();
        for c in coords {
            hasher.update(quantize(c.lat).to_le_bytes());
            hasher.update(quantize(c.lon).to_le_bytes());
        }
        let digest = hasher.finalize();

        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        GeometryFingerprint(u64::from_le_bytes(word))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[inline]
fn quantize(degrees: f64) -> i64 {
    (degrees * MICRODEGREES).round() as i64
}

impl fmt::Display for GeometryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
