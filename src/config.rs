//! Itinera configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main Itinera configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Geocoding / distance-matrix provider configuration
    pub geo: GeoConfig,

    /// Weather provider configuration
    pub weather: WeatherConfig,

    /// Journey store configuration
    pub store: StoreConfig,

    /// Planning defaults
    pub planner: PlannerConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that required environment variables are set.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        for (label, env) in [
            ("LLM", &self.llm.api_key_env),
            ("geocoding", &self.geo.api_key_env),
            ("weather", &self.weather.api_key_env),
        ] {
            if std::env::var(env).is_err() {
                return Err(eyre::eyre!(
                    "{} API key not found. Set the {} environment variable.",
                    label,
                    env
                ));
            }
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .itinera.yml
        let local_config = PathBuf::from(".itinera.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/itinera/itinera.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("itinera").join("itinera.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .context(format!("API key environment variable {} not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-haiku-4-5-20251001".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 120_000,
        }
    }
}

/// Geocoding / distance-matrix provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Bounded wait for distance-matrix lookups in milliseconds;
    /// expiry is treated as a missing matrix, not an error
    #[serde(rename = "matrix-timeout-ms")]
    pub matrix_timeout_ms: u64,
}

impl GeoConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .context(format!("API key environment variable {} not set", self.api_key_env))
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GOOGLE_MAPS_KEY".to_string(),
            base_url: "https://maps.googleapis.com".to_string(),
            matrix_timeout_ms: 10_000,
        }
    }
}

/// Weather provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl WeatherConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .context(format!("API key environment variable {} not set", self.api_key_env))
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENWEATHER_KEY".to_string(),
            base_url: "http://api.openweathermap.org".to_string(),
        }
    }
}

/// Journey store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Environment variable containing the store base URL
    #[serde(rename = "url-env")]
    pub url_env: String,

    /// Environment variable containing the service key
    #[serde(rename = "key-env")]
    pub key_env: String,
}

impl StoreConfig {
    /// Read the store URL from the configured environment variable
    pub fn get_url(&self) -> Result<String> {
        std::env::var(&self.url_env).context(format!("Store URL environment variable {} not set", self.url_env))
    }

    /// Read the service key from the configured environment variable
    pub fn get_key(&self) -> Result<String> {
        std::env::var(&self.key_env).context(format!("Store key environment variable {} not set", self.key_env))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url_env: "SUPABASE_URL".to_string(),
            key_env: "SUPABASE_SERVICE_ROLE_KEY".to_string(),
        }
    }
}

/// Planning defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Itinerary density target per day
    #[serde(rename = "pois-per-day")]
    pub pois_per_day: usize,

    /// Candidate pool size requested from research
    #[serde(rename = "pool-size")]
    pub pool_size: usize,

    /// Traveler origin label used for transit-cost estimation
    pub origin: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            pois_per_day: 4,
            pool_size: 15,
            origin: "India".to_string(),
        }
    }
}
