//! Journey persistence collaborator
//!
//! Writes completed journeys and healed itineraries to a Supabase table
//! over its REST surface. Writes are fire-and-forget from the planner's
//! point of view: call sites log failures and move on, they never
//! propagate them to the request caller.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::StoreConfig;
use crate::domain::{ActivityNode, GeoPoint, InsightRecord};

/// Errors from journey-store writes
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Store rejected write: {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Persistent store contract
#[async_trait]
pub trait JourneyStore: Send + Sync {
    /// Persist a completed journey: itinerary, insights, and map center
    async fn save_journey(
        &self,
        destination: &str,
        itinerary: &[ActivityNode],
        insights: &[InsightRecord],
        center: &GeoPoint,
    ) -> Result<(), StoreError>;

    /// Persist a (re)generated itinerary without the journey extras
    async fn save_itinerary(&self, destination: &str, itinerary: &[ActivityNode]) -> Result<(), StoreError>;
}

/// Supabase REST client for the itineraries table
pub struct SupabaseStore {
    base_url: String,
    service_key: String,
    http: Client,
}

impl SupabaseStore {
    /// Create a new client from configuration
    pub fn from_config(config: &StoreConfig) -> eyre::Result<Self> {
        Ok(Self {
            base_url: config.get_url()?,
            service_key: config.get_key()?,
            http: Client::new(),
        })
    }

    async fn insert(&self, body: serde_json::Value) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/itineraries", self.base_url);
        let response = self
            .http
            .post(url)
            .header("apikey", self.service_key.clone())
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!("insert: persisted");
        Ok(())
    }
}

#[async_trait]
impl JourneyStore for SupabaseStore {
    async fn save_journey(
        &self,
        destination: &str,
        itinerary: &[ActivityNode],
        insights: &[InsightRecord],
        center: &GeoPoint,
    ) -> Result<(), StoreError> {
        debug!(%destination, nodes = itinerary.len(), "save_journey: called");
        self.insert(serde_json::json!({
            "destination": destination,
            "json_data": itinerary,
            "insights": insights,
            "center_lat": center.lat,
            "center_lon": center.lon,
            "created_at": Utc::now().to_rfc3339(),
        }))
        .await
    }

    async fn save_itinerary(&self, destination: &str, itinerary: &[ActivityNode]) -> Result<(), StoreError> {
        debug!(%destination, nodes = itinerary.len(), "save_itinerary: called");
        self.insert(serde_json::json!({
            "destination": destination,
            "json_data": itinerary,
            "created_at": Utc::now().to_rfc3339(),
        }))
        .await
    }
}
