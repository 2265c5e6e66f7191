//! Viewport inspection command: pure math, no network.

use clap::Args;

use airlayer::geo::overscan_margin;
use airlayer::tile::quantization_step;
use airlayer::{Coordinate, LatLonSpan, LodLevel, TileKey, Viewport};

use crate::error::CliError;

/// Arguments for `airlayer inspect`.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Viewport center latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Viewport center longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Viewport span in degrees (both axes)
    #[arg(long, default_value_t = 0.02)]
    pub span: f64,
}

/// Prints the derived fetch parameters for a viewport.
pub fn run(args: InspectArgs) -> Result<(), CliError> {
    let viewport = Viewport::new(
        Coordinate::new(args.lat, args.lon),
        LatLonSpan::new(args.span, args.span),
    );
    let lod = LodLevel::for_span(viewport.span);
    let margin = overscan_margin(viewport.span);

    println!("viewport:  center {} span {:.5}x{:.5}", viewport.center, viewport.span.lat, viewport.span.lon);
    println!("tile key:  {}", TileKey::for_viewport(&viewport));
    println!("grid step: {:.5} deg", quantization_step(args.span));
    println!("overscan:  margin {:.2}, fetch bbox {}", margin, viewport.overscanned_bbox());
    println!(
        "lod:       {} (tolerance {} m, cap {} features, debounce {} ms)",
        lod,
        lod.tolerance_meters(),
        lod.feature_cap(),
        lod.debounce().as_millis()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_runs_for_any_viewport() {
        let args = InspectArgs {
            lat: 40.0,
            lon: -3.0,
            span: 0.01,
        };
        assert!(run(args).is_ok());
    }
}
