//! AirLayer - live airspace-restriction overlays for moving maps
//!
//! This library fetches airspace restriction zones from four independent
//! remote layers, caches them per quantized viewport, simplifies their
//! geometry to the current level of detail and keeps an external map
//! renderer's overlay set in sync.
//!
//! The centerpiece is the [`engine::OverlayEngine`]: a single task that
//! debounces viewport changes, orchestrates the fetch fan-out with
//! supersession semantics and publishes feature sets over a watch channel.
//! Rendering is the caller's side of the seam: feed each publication to an
//! [`overlay::OverlayDiffer`] together with your [`overlay::OverlayRenderer`]
//! implementation.

pub mod config;
pub mod engine;
pub mod feature;
pub mod fetch;
pub mod geo;
pub mod lod;
pub mod overlay;
pub mod simplify;
pub mod store;
pub mod tile;

pub use config::EngineConfig;
pub use engine::{EngineHandle, Notice, OverlayEngine, Publication};
pub use feature::{Feature, Geometry, LayerSource, ZoneKind};
pub use geo::{BBox, Coordinate, LatLonSpan, Viewport};
pub use lod::LodLevel;
pub use tile::TileKey;
