//! Research stage: candidate discovery and geospatial validation
//!
//! Senses the weather, asks the completion service for a pipe-separated
//! candidate list, then overwrites the generator's location guesses with
//! verified geocoding results. Candidates that cannot be resolved are
//! dropped. This stage has no fallback of its own: a completion failure
//! is fatal to the request.

use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tracing::debug;

use super::{Stage, StageUpdate};
use crate::domain::{Candidate, PlanningContext};
use crate::llm::{CompletionRequest, LlmClient};
use crate::services::{GeoService, WeatherService};

/// Hotel label used when research produced no candidates
const DEFAULT_HOTEL: &str = "The Selected Stay";

/// Budget above which the stay preference reads "hotel" instead of "hostel"
const HOTEL_BUDGET_THRESHOLD: i64 = 250;

pub struct ResearchStage {
    llm: Arc<dyn LlmClient>,
    geo: Arc<dyn GeoService>,
    weather: Arc<dyn WeatherService>,
    pool_size: usize,
    origin: String,
}

impl ResearchStage {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        geo: Arc<dyn GeoService>,
        weather: Arc<dyn WeatherService>,
        pool_size: usize,
        origin: String,
    ) -> Self {
        Self {
            llm,
            geo,
            weather,
            pool_size,
            origin,
        }
    }

    fn build_prompt(&self, ctx: &PlanningContext, weather: &str) -> String {
        let interests = if ctx.interests.is_empty() {
            "Sightseeing".to_string()
        } else {
            ctx.interests.join(", ")
        };
        let stay_class = if ctx.budget_max > HOTEL_BUDGET_THRESHOLD {
            "hotel"
        } else {
            "hostel"
        };

        format!(
            "SYSTEM: You are the lead researcher for a travel planner.\n\
             DESTINATION: {destination}\n\
             WEATHER: {weather}\n\
             PERSONA: {persona}\n\
             INTERESTS: {interests}\n\
             STAY_PREFERENCE: {stay_class}\n\n\
             Note: The traveler departs from {origin}.\n\
             Calculate the Transit_Cost (flight/visa) for a round trip to {destination}.\n\
             Factor this into the total budget of ${budget}.\n\n\
             TASK: Find {pool_size} high-value POIs.\n\
             CRITICAL RULE: The very first POI (index 0) MUST be a real, highly-rated {stay_class} in {destination}.\n\
             The others should be vibe-aligned landmarks and cafes.\n\n\
             Format: Name | Type (Indoor/Outdoor/Stay) | Description",
            destination = ctx.destination,
            weather = weather,
            persona = ctx.persona,
            interests = interests,
            stay_class = stay_class,
            origin = self.origin,
            budget = ctx.budget_max,
            pool_size = self.pool_size,
        )
    }
}

#[async_trait]
impl Stage for ResearchStage {
    fn name(&self) -> &'static str {
        "research"
    }

    async fn run(&self, ctx: &PlanningContext) -> Result<StageUpdate> {
        // Environmental sensing; the weather client never fails
        let weather = self.weather.current_weather(&ctx.destination).await;
        debug!(%weather, "run: weather context");

        let prompt = self.build_prompt(ctx, &weather);
        let response = self
            .llm
            .complete(CompletionRequest::new(prompt, 2000))
            .await
            .wrap_err("research completion failed")?;

        // Geospatial validation: keep only candidates the geocoder confirms
        let mut pool: Vec<Candidate> = Vec::new();
        for line in parse_candidate_lines(response.text()) {
            if pool.len() >= self.pool_size {
                break;
            }
            let Some(place) = self.geo.resolve_place(&line.title, &ctx.destination).await else {
                debug!(title = %line.title, "run: candidate dropped, unresolvable");
                continue;
            };
            pool.push(Candidate {
                id: pool.len(),
                title: line.title,
                category: line.category,
                description: line.description,
                lat: place.lat,
                lon: place.lon,
                address: place.address,
                price_level: place.price_level,
            });
        }

        let hotel_name = pool
            .first()
            .map(|p| p.title.clone())
            .unwrap_or_else(|| DEFAULT_HOTEL.to_string());
        debug!(pool = pool.len(), %hotel_name, "run: research complete");

        Ok(StageUpdate {
            poi_pool: Some(pool),
            hotel_name: Some(hotel_name),
            weather: Some(weather),
            ..Default::default()
        })
    }
}

/// One pipe-separated candidate line from the research completion
#[derive(Debug, Clone, PartialEq, Eq)]
struct CandidateLine {
    title: String,
    category: String,
    description: String,
}

/// Extract `Name | Type | Description` lines, tolerating list markup
fn parse_candidate_lines(text: &str) -> Vec<CandidateLine> {
    text.lines()
        .filter(|line| line.contains('|'))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if parts.len() < 2 {
                return None;
            }
            let title = clean_title(parts[0]);
            if title.is_empty() {
                return None;
            }
            Some(CandidateLine {
                title,
                category: parts[1].to_string(),
                description: parts.get(2).copied().unwrap_or("").to_string(),
            })
        })
        .collect()
}

/// Strip bold markers and leading ordinals like "3. " from a title
fn clean_title(raw: &str) -> String {
    let cleaned = raw.replace("**", "");
    let cleaned = cleaned.trim();
    if let Some((prefix, rest)) = cleaned.split_once(". ")
        && !prefix.is_empty()
        && prefix.len() <= 2
        && prefix.chars().all(|c| c.is_ascii_digit())
    {
        return rest.trim().to_string();
    }
    cleaned.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeoPoint, PlanRequest};
    use crate::llm::{CompletionResponse, LlmError, StopReason, TokenUsage};
    use crate::routing::TravelTimeMatrix;
    use crate::services::ResolvedPlace;

    fn context(budget: i64) -> PlanningContext {
        PlanningContext::from_request(&PlanRequest {
            destination: "Barcelona".to_string(),
            start_date: String::new(),
            end_date: String::new(),
            start_time: "09:00".to_string(),
            end_time: "21:00".to_string(),
            time_period: String::new(),
            budget_max: budget,
            persona: "Explorer".to_string(),
            religious_sites_ok: true,
            accommodation: "Boutique Hotel".to_string(),
            interests: vec![],
            duration_days: 2,
        })
    }

    struct FixedLlm(&'static str);

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: Some(self.0.to_string()),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::InvalidResponse("down".to_string()))
        }
    }

    /// Resolves every place except those whose name contains "Ghost"
    struct StubGeo;

    #[async_trait]
    impl GeoService for StubGeo {
        async fn resolve_place(&self, place: &str, city: &str) -> Option<ResolvedPlace> {
            if place.contains("Ghost") {
                return None;
            }
            Some(ResolvedPlace {
                lat: 41.4,
                lon: 2.2,
                address: format!("{}, {}", place, city),
                price_level: 2,
            })
        }

        async fn destination_center(&self, _city: &str) -> Option<GeoPoint> {
            None
        }

        async fn distance_matrix(&self, _locations: &[GeoPoint]) -> Option<TravelTimeMatrix> {
            None
        }
    }

    struct StubWeather;

    #[async_trait]
    impl WeatherService for StubWeather {
        async fn current_weather(&self, _city: &str) -> String {
            "Rain (14°C)".to_string()
        }
    }

    fn stage(llm: Arc<dyn LlmClient>, pool_size: usize) -> ResearchStage {
        ResearchStage::new(llm, Arc::new(StubGeo), Arc::new(StubWeather), pool_size, "India".to_string())
    }

    #[test]
    fn test_parse_candidate_lines() {
        let text = "Here are the picks:\n\
                    1. **Hotel Arts** | Stay | Seafront icon\n\
                    2. Park Guell | Outdoor | Gaudi mosaics\n\
                    not a candidate line\n\
                    Cafe Els Quatre Gats | Indoor";

        let lines = parse_candidate_lines(text);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].title, "Hotel Arts");
        assert_eq!(lines[0].category, "Stay");
        assert_eq!(lines[1].title, "Park Guell");
        assert_eq!(lines[2].description, "");
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("**Hotel Arts**"), "Hotel Arts");
        assert_eq!(clean_title("12. Sagrada Familia"), "Sagrada Familia");
        assert_eq!(clean_title("Casa Mila"), "Casa Mila");
        // A title that legitimately contains a period is left alone
        assert_eq!(clean_title("St. George Tavern"), "St. George Tavern");
    }

    #[tokio::test]
    async fn test_run_builds_validated_pool() {
        let llm = Arc::new(FixedLlm(
            "Hotel Arts | Stay | Seafront icon\n\
             Ghost Bar | Indoor | does not geocode\n\
             Park Guell | Outdoor | Gaudi mosaics",
        ));

        let update = stage(llm, 15).run(&context(1500)).await.unwrap();

        let pool = update.poi_pool.unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].title, "Hotel Arts");
        assert_eq!(pool[0].id, 0);
        assert_eq!(pool[1].title, "Park Guell");
        assert_eq!(pool[1].id, 1);
        assert_eq!(update.hotel_name.as_deref(), Some("Hotel Arts"));
        assert_eq!(update.weather.as_deref(), Some("Rain (14°C)"));
    }

    #[tokio::test]
    async fn test_pool_capped_at_configured_size() {
        let llm = Arc::new(FixedLlm(
            "A | Indoor\nB | Indoor\nC | Indoor\nD | Indoor\nE | Indoor",
        ));

        let update = stage(llm, 3).run(&context(1500)).await.unwrap();

        assert_eq!(update.poi_pool.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_pool_uses_default_hotel() {
        let llm = Arc::new(FixedLlm("no candidates in this reply"));

        let update = stage(llm, 15).run(&context(1500)).await.unwrap();

        assert!(update.poi_pool.unwrap().is_empty());
        assert_eq!(update.hotel_name.as_deref(), Some(DEFAULT_HOTEL));
    }

    #[tokio::test]
    async fn test_completion_failure_is_fatal() {
        let result = stage(Arc::new(FailingLlm), 15).run(&context(1500)).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_budget_selects_stay_wording() {
        let s = stage(Arc::new(FailingLlm), 15);

        let rich = s.build_prompt(&context(1500), "Sunny");
        assert!(rich.contains("STAY_PREFERENCE: hotel"));

        let lean = s.build_prompt(&context(200), "Sunny");
        assert!(lean.contains("STAY_PREFERENCE: hostel"));
    }
}
