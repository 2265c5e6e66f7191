//! Generic GeoJSON layer adapter.
//!
//! Turns a FeatureCollection endpoint into a [`LayerFetcher`]. The query
//! URL is a template with bbox placeholders; the response is decoded with
//! a deliberately loose schema (Polygon, MultiPolygon and LineString only,
//! extra properties ignored). Anything that parses as JSON but does not
//! match this shape is a `SchemaDecode` error and is not retried.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::feature::{Feature, Geometry, LayerSource};
use crate::geo::{BBox, Coordinate};

use super::{BoxFuture, FetchError, HttpFetch, LayerFetcher, RetryingFetch};

/// A [`LayerFetcher`] over a GeoJSON FeatureCollection endpoint.
pub struct GeoJsonLayer<H> {
    source: LayerSource,
    url_template: String,
    fetch: RetryingFetch<H>,
}

impl<H: HttpFetch> GeoJsonLayer<H> {
    /// Creates an adapter for one source.
    ///
    /// `url_template` may use `{min_lat}`, `{max_lat}`, `{min_lon}`,
    /// `{max_lon}`, or `{bbox}` (WFS order: min_lon,min_lat,max_lon,max_lat).
    pub fn new(source: LayerSource, url_template: impl Into<String>, fetch: RetryingFetch<H>) -> Self {
        Self {
            source,
            url_template: url_template.into(),
            fetch,
        }
    }

    fn query_url(&self, bbox: &BBox) -> String {
        self.url_template
            .replace("{min_lat}", &format!("{:.6}", bbox.min_lat))
            .replace("{max_lat}", &format!("{:.6}", bbox.max_lat))
            .replace("{min_lon}", &format!("{:.6}", bbox.min_lon))
            .replace("{max_lon}", &format!("{:.6}", bbox.max_lon))
            .replace(
                "{bbox}",
                &format!(
                    "{:.6},{:.6},{:.6},{:.6}",
                    bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat
                ),
            )
    }

    fn decode(&self, body: &[u8]) -> Result<Vec<Feature>, FetchError> {
        let doc: FeatureCollectionDoc = serde_json::from_slice(body)
            .map_err(|e| FetchError::SchemaDecode(format!("{}: {}", self.source, e)))?;

        let mut features = Vec::new();
        for (index, fd) in doc.features.into_iter().enumerate() {
            let title = fd
                .properties
                .as_ref()
                .and_then(|p| p.name.clone().or_else(|| p.title.clone()))
                .unwrap_or_default();
            // Ids are only stable within this fetch; synthesize one when
            // the service omits it.
            let id = match fd.id {
                Some(serde_json::Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => format!("{}-{}", self.source, index),
            };

            match fd.geometry {
                GeometryDoc::Polygon { coordinates } => {
                    // Outer ring only; holes are not rendered.
                    if let Some(ring) = coordinates.into_iter().next() {
                        features.push(Feature::new(
                            id,
                            title,
                            Geometry::Polygon(positions(ring)?),
                            self.source,
                        ));
                    }
                }
                GeometryDoc::MultiPolygon { coordinates } => {
                    for (part, polygon) in coordinates.into_iter().enumerate() {
                        if let Some(ring) = polygon.into_iter().next() {
                            features.push(Feature::new(
                                format!("{}/{}", id, part),
                                title.clone(),
                                Geometry::Polygon(positions(ring)?),
                                self.source,
                            ));
                        }
                    }
                }
                GeometryDoc::LineString { coordinates } => {
                    features.push(Feature::new(
                        id,
                        title,
                        Geometry::Polyline(positions(coordinates)?),
                        self.source,
                    ));
                }
            }
        }
        Ok(features)
    }
}

impl<H: HttpFetch> LayerFetcher for GeoJsonLayer<H> {
    fn source(&self) -> LayerSource {
        self.source
    }

    fn fetch<'a>(
        &'a self,
        bbox: &'a BBox,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<Feature>, FetchError>> {
        Box::pin(async move {
            let url = self.query_url(bbox);
            let body = self.fetch.fetch(&url, cancel).await?;
            let features = self.decode(&body)?;
            debug!(source = %self.source, count = features.len(), "layer fetch decoded");
            Ok(features)
        })
    }
}

/// Converts GeoJSON positions (lon-first, optional altitude) to coordinates.
fn positions(raw: Vec<Vec<f64>>) -> Result<Vec<Coordinate>, FetchError> {
    raw.into_iter()
        .map(|p| {
            if p.len() < 2 {
                return Err(FetchError::SchemaDecode(format!(
                    "position has {} components, need at least 2",
                    p.len()
                )));
            }
            Ok(Coordinate::new(p[1], p[0]))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct FeatureCollectionDoc {
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    properties: Option<PropertiesDoc>,
    geometry: GeometryDoc,
}

#[derive(Debug, Deserialize)]
struct PropertiesDoc {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeometryDoc {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    LineString { coordinates: Vec<Vec<f64>> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::ZoneKind;
    use crate::fetch::http::tests::MockHttpFetch;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "id": "zone-1",
                "properties": { "name": "LED-P15 MADRID" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-3.0, 40.0], [-2.99, 40.0], [-2.99, 40.01], [-3.0, 40.01], [-3.0, 40.0]]]
                }
            },
            {
                "properties": { "title": "corridor" },
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[-3.0, 40.0, 120.0], [-2.9, 40.1, 130.0]]
                }
            }
        ]
    }"#;

    fn layer(body: &str) -> GeoJsonLayer<MockHttpFetch> {
        GeoJsonLayer::new(
            LayerSource::Restricciones,
            "http://svc/wfs?bbox={bbox}",
            RetryingFetch::new(MockHttpFetch::new(vec![MockHttpFetch::json(body)])),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_decodes_feature_collection() {
        let layer = layer(COLLECTION);
        let bbox = BBox::new(39.9, 40.1, -3.1, -2.9);
        let cancel = CancellationToken::new();

        let features = layer.fetch(&bbox, &cancel).await.unwrap();
        assert_eq!(features.len(), 2);

        assert_eq!(features[0].id, "zone-1");
        assert_eq!(features[0].kind, ZoneKind::Prohibited);
        assert!(features[0].geometry.is_polygon());
        // GeoJSON is lon-first; make sure axes were swapped.
        assert_eq!(features[0].geometry.coords()[0], Coordinate::new(40.0, -3.0));

        assert_eq!(features[1].title, "corridor");
        assert!(!features[1].geometry.is_polygon());
        assert_eq!(features[1].id, "restricciones-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_multipolygon_splits_into_parts() {
        let body = r#"{
            "features": [{
                "id": 7,
                "properties": { "name": "TMA MADRID" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[-3.0, 40.0], [-2.9, 40.0], [-2.9, 40.1]]],
                        [[[-4.0, 41.0], [-3.9, 41.0], [-3.9, 41.1]]]
                    ]
                }
            }]
        }"#;
        let layer = layer(body);
        let features = layer
            .fetch(&BBox::new(39.0, 42.0, -5.0, -2.0), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, "7/0");
        assert_eq!(features[1].id, "7/1");
        assert_eq!(features[0].kind, ZoneKind::Tma);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_shape_is_schema_error() {
        let layer = layer(r#"{"rows": []}"#);
        let err = layer
            .fetch(&BBox::new(0.0, 1.0, 0.0, 1.0), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::SchemaDecode(_)));
    }

    #[test]
    fn test_query_url_substitution() {
        let layer = GeoJsonLayer::new(
            LayerSource::Urbano,
            "http://svc/q?s={min_lat}&n={max_lat}&w={min_lon}&e={max_lon}",
            RetryingFetch::new(MockHttpFetch::new(vec![MockHttpFetch::json("[]")])),
        );
        let url = layer.query_url(&BBox::new(39.5, 40.5, -3.5, -2.5));
        assert_eq!(url, "http://svc/q?s=39.500000&n=40.500000&w=-3.500000&e=-2.500000");
    }
}
