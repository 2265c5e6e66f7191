//! Airspace feature model.
//!
//! A `Feature` is one polygon or polyline returned by a remote layer,
//! tagged with its source layer and a best-effort zone kind. Features are
//! created only by a successful layer fetch and live for the lifetime of
//! the tile cache entry that holds them; nothing here is persisted.

mod classify;
mod fingerprint;

pub use classify::classify_zone;
pub use fingerprint::GeometryFingerprint;

use std::fmt;

use crate::geo::Coordinate;

/// The four independent remote layers.
///
/// `source` partitions the feature space: every feature belongs to exactly
/// one layer, and layer failures are isolated per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerSource {
    /// Aeronautical restriction zones.
    Restricciones,
    /// Urban flight limitation areas.
    Urbano,
    /// Environmental protection areas.
    Medioambiente,
    /// Critical infrastructure buffers.
    Infraestructura,
}

impl LayerSource {
    /// All sources, in fetch fan-out order.
    pub const ALL: [LayerSource; 4] = [
        LayerSource::Restricciones,
        LayerSource::Urbano,
        LayerSource::Medioambiente,
        LayerSource::Infraestructura,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerSource::Restricciones => "restricciones",
            LayerSource::Urbano => "urbano",
            LayerSource::Medioambiente => "medioambiente",
            LayerSource::Infraestructura => "infraestructura",
        }
    }
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heuristic zone classification.
///
/// This is a display/style hint only. The upstream data's type fields are
/// unreliable, so the kind is guessed from free-text identifiers (see
/// [`classify_zone`]) and must never be used to filter features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    Prohibited,
    Restricted,
    Danger,
    Ctr,
    Atz,
    Tma,
    Other,
}

impl ZoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Prohibited => "prohibited",
            ZoneKind::Restricted => "restricted",
            ZoneKind::Danger => "danger",
            ZoneKind::Ctr => "CTR",
            ZoneKind::Atz => "ATZ",
            ZoneKind::Tma => "TMA",
            ZoneKind::Other => "other",
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feature's shape: an ordered coordinate sequence.
///
/// Polygons are conceptually closed rings, but the engine closes them
/// (first == last) before rendering; data sources are not trusted to.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Vec<Coordinate>),
    Polyline(Vec<Coordinate>),
}

impl Geometry {
    /// The raw coordinate sequence, unclosed and unsimplified.
    pub fn coords(&self) -> &[Coordinate] {
        match self {
            Geometry::Polygon(c) | Geometry::Polyline(c) => c,
        }
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, Geometry::Polygon(_))
    }
}

/// One renderable airspace zone from one remote layer.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Opaque id, stable within a single fetch only.
    pub id: String,
    /// Display hint, never authoritative (see [`ZoneKind`]).
    pub kind: ZoneKind,
    pub geometry: Geometry,
    pub title: String,
    pub source: LayerSource,
    /// Identity hash of the original geometry, computed once at creation.
    pub fingerprint: GeometryFingerprint,
}

impl Feature {
    /// Creates a feature, classifying its kind from the title and
    /// fingerprinting the original geometry.
    pub fn new(id: String, title: String, geometry: Geometry, source: LayerSource) -> Self {
        let kind = classify_zone(&title);
        let fingerprint = GeometryFingerprint::of(geometry.coords());
        Self {
            id,
            kind,
            geometry,
            title,
            source,
            fingerprint,
        }
    }
}
