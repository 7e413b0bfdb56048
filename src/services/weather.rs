//! Weather collaborator
//!
//! Fetches a short current-conditions summary used to influence POI
//! sourcing. The client owns its own fallbacks: a rejected request reads
//! as "Sunny (22°C)", a transport failure as "Mild (20°C)", so callers
//! always get a usable summary string.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::WeatherConfig;

/// Summary used when the service answers with a non-success status
const REJECTED_FALLBACK: &str = "Sunny (22°C)";

/// Summary used when the service cannot be reached or decoded
const TRANSPORT_FALLBACK: &str = "Mild (20°C)";

/// Weather collaborator contract
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Short current-weather summary for a city, e.g. "Rain (14.2°C)"
    async fn current_weather(&self, city: &str) -> String;
}

/// OpenWeather current-conditions client
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    /// Create a new client from configuration
    pub fn from_config(config: &WeatherConfig) -> eyre::Result<Self> {
        let api_key = config.get_api_key()?;
        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            http: Client::new(),
        })
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn current_weather(&self, city: &str) -> String {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let response = match self
            .http
            .get(url)
            .query(&[("q", city), ("appid", &self.api_key), ("units", "metric")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "current_weather: request failed");
                return TRANSPORT_FALLBACK.to_string();
            }
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "current_weather: non-success status");
            return REJECTED_FALLBACK.to_string();
        }

        match response.json::<WeatherResponse>().await {
            Ok(decoded) => {
                let main = decoded
                    .weather
                    .into_iter()
                    .next()
                    .map(|w| w.main)
                    .unwrap_or_else(|| "Clear".to_string());
                format!("{} ({}°C)", main, decoded.main.temp)
            }
            Err(e) => {
                warn!(error = %e, "current_weather: decode failed");
                TRANSPORT_FALLBACK.to_string()
            }
        }
    }
}

// OpenWeather API response types

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    weather: Vec<WeatherEntry>,
    main: WeatherMain,
}

#[derive(Debug, Deserialize)]
struct WeatherEntry {
    main: String,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
}
