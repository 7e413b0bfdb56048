//! Geocoding and distance-matrix collaborator
//!
//! Wraps the Google Maps web services: geocoding (with a places text
//! search as fallback for vague queries) and the distance matrix. Every
//! method is contained by contract - any transport, decode, or service
//! failure yields `None`, never an error, feeding the documented
//! fallbacks upstream.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GeoConfig;
use crate::domain::GeoPoint;
use crate::routing::TravelTimeMatrix;

/// A place resolved to verified coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub lat: f64,
    pub lon: f64,
    pub address: String,
    pub price_level: u8,
}

/// Geocoding/mapping collaborator contract
#[async_trait]
pub trait GeoService: Send + Sync {
    /// Resolve a place name within a city to verified coordinates
    async fn resolve_place(&self, place: &str, city: &str) -> Option<ResolvedPlace>;

    /// Geocode the destination itself, for map centering
    async fn destination_center(&self, city: &str) -> Option<GeoPoint>;

    /// Fetch a travel-time matrix over the given locations
    ///
    /// Uses a bounded wait; expiry is treated as a missing matrix.
    async fn distance_matrix(&self, locations: &[GeoPoint]) -> Option<TravelTimeMatrix>;
}

/// Google Maps web-services client
pub struct GoogleMapsClient {
    api_key: String,
    base_url: String,
    matrix_timeout: Duration,
    http: Client,
}

impl GoogleMapsClient {
    /// Create a new client from configuration
    pub fn from_config(config: &GeoConfig) -> eyre::Result<Self> {
        let api_key = config.get_api_key()?;
        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            matrix_timeout: Duration::from_millis(config.matrix_timeout_ms),
            http: Client::new(),
        })
    }

    async fn geocode(&self, query: &str) -> Option<GeocodeResult> {
        let url = format!("{}/maps/api/geocode/json", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("address", query), ("key", &self.api_key)])
            .send()
            .await
            .ok()?;

        let decoded: GeocodeResponse = response.json().await.ok()?;
        debug!(%query, status = %decoded.status, results = decoded.results.len(), "geocode: decoded");
        decoded.results.into_iter().next()
    }

    async fn places_search(&self, query: &str) -> Option<PlaceResult> {
        let url = format!("{}/maps/api/place/textsearch/json", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("query", query), ("key", &self.api_key)])
            .send()
            .await
            .ok()?;

        let decoded: PlacesResponse = response.json().await.ok()?;
        debug!(%query, results = decoded.results.len(), "places_search: decoded");
        decoded.results.into_iter().next()
    }
}

#[async_trait]
impl GeoService for GoogleMapsClient {
    async fn resolve_place(&self, place: &str, city: &str) -> Option<ResolvedPlace> {
        let query = format!("{}, {}", place, city);

        // Geocoding first for the most accurate coordinates
        if let Some(result) = self.geocode(&query).await {
            return Some(ResolvedPlace {
                lat: result.geometry.location.lat,
                lon: result.geometry.location.lng,
                address: result.formatted_address.unwrap_or_else(|| query.clone()),
                price_level: 2,
            });
        }

        // Places search when geocoding comes back empty
        if let Some(result) = self.places_search(&query).await {
            return Some(ResolvedPlace {
                lat: result.geometry.location.lat,
                lon: result.geometry.location.lng,
                address: result.formatted_address.unwrap_or_else(|| query.clone()),
                price_level: result.price_level.unwrap_or(2),
            });
        }

        warn!(%place, %city, "resolve_place: unresolvable");
        None
    }

    async fn destination_center(&self, city: &str) -> Option<GeoPoint> {
        let result = self.geocode(city).await?;
        Some(GeoPoint {
            lat: result.geometry.location.lat,
            lon: result.geometry.location.lng,
        })
    }

    async fn distance_matrix(&self, locations: &[GeoPoint]) -> Option<TravelTimeMatrix> {
        if locations.len() < 2 {
            return None;
        }

        let coords = locations
            .iter()
            .map(|p| format!("{},{}", p.lat, p.lon))
            .collect::<Vec<_>>()
            .join("|");

        let url = format!("{}/maps/api/distancematrix/json", self.base_url);
        let request = self
            .http
            .get(url)
            .query(&[("origins", &coords), ("destinations", &coords), ("key", &self.api_key)])
            .send();

        let response = match tokio::time::timeout(self.matrix_timeout, request).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                warn!(error = %e, "distance_matrix: request failed");
                return None;
            }
            Err(_) => {
                warn!(timeout_ms = self.matrix_timeout.as_millis() as u64, "distance_matrix: timed out");
                return None;
            }
        };

        let decoded: MatrixResponse = response.json().await.ok()?;
        if decoded.status != "OK" {
            warn!(status = %decoded.status, "distance_matrix: service rejected request");
            return None;
        }

        Some(decoded.into_matrix())
    }
}

// Google Maps API response types

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    geometry: Geometry,
    formatted_address: Option<String>,
    price_level: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    #[serde(default)]
    status: String,
    duration: Option<MatrixDuration>,
}

#[derive(Debug, Deserialize)]
struct MatrixDuration {
    value: u64,
}

impl MatrixResponse {
    /// Convert the wire shape into the internal matrix model
    ///
    /// A cell contributes a duration only when its status is OK and a
    /// duration is present; everything else becomes an unroutable cell.
    fn into_matrix(self) -> TravelTimeMatrix {
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                row.elements
                    .into_iter()
                    .map(|e| {
                        if e.status == "OK" {
                            e.duration.map(|d| d.value)
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .collect();
        TravelTimeMatrix::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_response_conversion() {
        let json = r#"{
            "status": "OK",
            "rows": [
                { "elements": [
                    { "status": "OK", "duration": { "value": 0 } },
                    { "status": "ZERO_RESULTS" }
                ]},
                { "elements": [
                    { "status": "OK", "duration": { "value": 600 } },
                    { "status": "OK", "duration": { "value": 0 } }
                ]}
            ]
        }"#;

        let decoded: MatrixResponse = serde_json::from_str(json).unwrap();
        let matrix = decoded.into_matrix();

        assert_eq!(matrix.size(), 2);
        assert_eq!(matrix.duration(0, 0), Some(0));
        assert_eq!(matrix.duration(0, 1), None);
        assert_eq!(matrix.duration(1, 0), Some(600));
    }

    #[test]
    fn test_ok_status_without_duration_is_unroutable() {
        let json = r#"{
            "status": "OK",
            "rows": [ { "elements": [ { "status": "OK" } ] } ]
        }"#;

        let decoded: MatrixResponse = serde_json::from_str(json).unwrap();
        let matrix = decoded.into_matrix();

        assert_eq!(matrix.duration(0, 0), None);
    }

    #[test]
    fn test_geocode_response_decode() {
        let json = r#"{
            "status": "OK",
            "results": [
                {
                    "geometry": { "location": { "lat": 41.3851, "lng": 2.1734 } },
                    "formatted_address": "Barcelona, Spain"
                }
            ]
        }"#;

        let decoded: GeocodeResponse = serde_json::from_str(json).unwrap();

        assert_eq!(decoded.results.len(), 1);
        assert_eq!(decoded.results[0].geometry.location.lat, 41.3851);
        assert_eq!(decoded.results[0].formatted_address.as_deref(), Some("Barcelona, Spain"));
    }
}
