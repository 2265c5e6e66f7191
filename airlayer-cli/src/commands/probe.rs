//! One-shot layer probe: fetch a viewport's layers and print statistics.

use std::collections::BTreeMap;
use std::sync::Arc;

use clap::Args;

use airlayer::fetch::{GeoJsonLayer, LayerFetcher, ReqwestFetch, RetryingFetch};
use airlayer::store::{run_fetches, BeginLoad, LoadOutcome, OverlayStore};
use airlayer::{Coordinate, EngineConfig, LatLonSpan, LayerSource, LodLevel, Viewport};

use crate::error::CliError;

/// Arguments for `airlayer probe`.
///
/// URL templates may use `{min_lat}`, `{max_lat}`, `{min_lon}`, `{max_lon}`
/// or `{bbox}` placeholders; layers without a URL are skipped.
#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Viewport center latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Viewport center longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Viewport span in degrees (both axes)
    #[arg(long, default_value_t = 0.02)]
    pub span: f64,

    /// GeoJSON endpoint for the aeronautical restrictions layer
    #[arg(long)]
    pub restricciones_url: Option<String>,

    /// GeoJSON endpoint for the urban limitations layer
    #[arg(long)]
    pub urbano_url: Option<String>,

    /// GeoJSON endpoint for the environmental protection layer
    #[arg(long)]
    pub medioambiente_url: Option<String>,

    /// GeoJSON endpoint for the infrastructure layer
    #[arg(long)]
    pub infraestructura_url: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProbeArgs {
    fn fetchers(&self, config: &EngineConfig) -> Result<Vec<Arc<dyn LayerFetcher>>, CliError> {
        let urls = [
            (LayerSource::Restricciones, &self.restricciones_url),
            (LayerSource::Urbano, &self.urbano_url),
            (LayerSource::Medioambiente, &self.medioambiente_url),
            (LayerSource::Infraestructura, &self.infraestructura_url),
        ];

        let mut fetchers: Vec<Arc<dyn LayerFetcher>> = Vec::new();
        for (source, url) in urls {
            if let Some(url) = url {
                let http = ReqwestFetch::new()?;
                fetchers.push(Arc::new(GeoJsonLayer::new(
                    source,
                    url.clone(),
                    RetryingFetch::with_config(http, config.retry.clone()),
                )));
            }
        }
        if fetchers.is_empty() {
            return Err(CliError::NoLayers);
        }
        Ok(fetchers)
    }
}

/// Runs a single fetch fan-out for the viewport and prints what came back.
pub async fn run(args: ProbeArgs) -> Result<(), CliError> {
    let config = EngineConfig::default();
    let fetchers = args.fetchers(&config)?;
    let viewport = Viewport::new(
        Coordinate::new(args.lat, args.lon),
        LatLonSpan::new(args.span, args.span),
    );

    let mut store = OverlayStore::new(config.tile_cache_capacity);
    let (ticket, _) = match store.begin_load(&viewport) {
        BeginLoad::Start { ticket, cached } => (ticket, cached),
        BeginLoad::SanityRejected => return Err(CliError::SpanTooLarge),
    };

    let bbox = ticket.bbox;
    let cancel = ticket.cancel.clone();
    let results = run_fetches(&fetchers, bbox, cancel).await;

    match store.complete_load(ticket, results) {
        LoadOutcome::Published { features, notice } => {
            let mut per_source: BTreeMap<&str, usize> = BTreeMap::new();
            let mut per_kind: BTreeMap<&str, usize> = BTreeMap::new();
            for f in features.iter() {
                *per_source.entry(f.source.as_str()).or_default() += 1;
                *per_kind.entry(f.kind.as_str()).or_default() += 1;
            }

            if args.json {
                let doc = serde_json::json!({
                    "bbox": bbox.to_string(),
                    "lod": LodLevel::for_span(viewport.span).as_str(),
                    "features": features.len(),
                    "per_source": per_source,
                    "per_kind": per_kind,
                    "notice": notice,
                });
                println!("{}", doc);
            } else {
                println!("bbox:     {}", bbox);
                println!("lod:      {}", LodLevel::for_span(viewport.span));
                println!("features: {}", features.len());
                for (source, count) in &per_source {
                    println!("  {:<16} {}", source, count);
                }
                println!("kinds:");
                for (kind, count) in &per_kind {
                    println!("  {:<16} {}", kind, count);
                }
                if let Some(notice) = notice {
                    println!("warning:  {}", notice);
                }
            }
            Ok(())
        }
        LoadOutcome::KeptLastGood { notice } => {
            if let Some(notice) = notice {
                eprintln!("warning: {}", notice);
            }
            eprintln!("all layers failed or returned nothing");
            Ok(())
        }
        // A one-shot probe cannot be superseded or cancelled.
        LoadOutcome::Stale | LoadOutcome::DiscardedCancelled => Ok(()),
    }
}
