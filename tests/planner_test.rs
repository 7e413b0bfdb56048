//! End-to-end planning and healing over scripted collaborators

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::Arc;

use async_trait::async_trait;

use itinera::config::Config;
use itinera::domain::{ActivityNode, GeoPoint, InsightRecord, PlanRequest};
use itinera::healing::HealingController;
use itinera::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use itinera::pipeline::Orchestrator;
use itinera::planner::Planner;
use itinera::routing::TravelTimeMatrix;
use itinera::services::{GeoService, JourneyStore, ResolvedPlace, StoreError, WeatherService};

/// Replays a fixed list of completion responses in call order
struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, ()>>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<Result<&str, ()>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(|r| r.map(str::to_string)).collect()),
        })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))?;
        match next {
            Ok(content) => Ok(CompletionResponse {
                content: Some(content),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            }),
            Err(()) => Err(LlmError::InvalidResponse("scripted failure".to_string())),
        }
    }
}

/// Resolves every place and serves one fixed travel-time matrix
struct StubGeo {
    matrix: Option<TravelTimeMatrix>,
}

#[async_trait]
impl GeoService for StubGeo {
    async fn resolve_place(&self, place: &str, city: &str) -> Option<ResolvedPlace> {
        Some(ResolvedPlace {
            lat: 41.4,
            lon: 2.2,
            address: format!("{}, {}", place, city),
            price_level: 2,
        })
    }

    async fn destination_center(&self, _city: &str) -> Option<GeoPoint> {
        Some(GeoPoint { lat: 41.3851, lon: 2.1734 })
    }

    async fn distance_matrix(&self, _locations: &[GeoPoint]) -> Option<TravelTimeMatrix> {
        self.matrix.clone()
    }
}

struct StubWeather;

#[async_trait]
impl WeatherService for StubWeather {
    async fn current_weather(&self, _city: &str) -> String {
        "Sunny (22°C)".to_string()
    }
}

#[derive(Default)]
struct RecordingStore {
    journeys: Mutex<Vec<String>>,
    itineraries: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl JourneyStore for RecordingStore {
    async fn save_journey(
        &self,
        destination: &str,
        _itinerary: &[ActivityNode],
        _insights: &[InsightRecord],
        _center: &GeoPoint,
    ) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Rejected {
                status: 500,
                message: "down".to_string(),
            });
        }
        self.journeys.lock().unwrap().push(destination.to_string());
        Ok(())
    }

    async fn save_itinerary(&self, destination: &str, _itinerary: &[ActivityNode]) -> Result<(), StoreError> {
        self.itineraries.lock().unwrap().push(destination.to_string());
        Ok(())
    }
}

fn request(days: u32) -> PlanRequest {
    PlanRequest {
        destination: "Barcelona".to_string(),
        start_date: String::new(),
        end_date: String::new(),
        start_time: "09:00".to_string(),
        end_time: "21:00".to_string(),
        time_period: String::new(),
        budget_max: 1500,
        persona: "Art lover".to_string(),
        religious_sites_ok: false,
        accommodation: "Boutique Hotel".to_string(),
        interests: vec!["museums".to_string()],
        duration_days: days,
    }
}

fn planner(llm: Arc<dyn LlmClient>, geo: Arc<StubGeo>, store: Arc<RecordingStore>) -> Planner {
    Planner::new(llm, geo, Arc::new(StubWeather), store, &Config::default())
}

const RESEARCH_REPLY: &str = "Hotel Arts | Stay | Seafront icon\n\
                              Park Guell | Outdoor | Gaudi mosaics\n\
                              Picasso Museum | Indoor | Blue period";

const FORMAT_REPLY: &str = "Activity(Check-in_Hotel_Arts) { Time: 09:00; Loc: Marina 19; Lat: 41.39; Lon: 2.19; Type: Stay; Price: $0; }\n\
                            Activity(Park_Guell) { Time: 11:00; Loc: Carrer d'Olot; Lat: 41.41; Lon: 2.15; Type: Outdoor; Price: $13; }\n\
                            Activity(No_Coords_Cafe) { Time: 13:00; }\n\
                            TripInsight(Transit_Cost) { Content: 'factored'; Value: '$450'; }";

#[tokio::test]
async fn test_plan_trip_end_to_end() {
    // research, vibe (unusable -> truncated pool), sequencing, format
    let llm = ScriptedLlm::new(vec![
        Ok(RESEARCH_REPLY),
        Ok("these all look lovely"),
        Ok("[1, 2, 0]"),
        Ok(FORMAT_REPLY),
    ]);
    let geo = Arc::new(StubGeo {
        matrix: Some(TravelTimeMatrix::new(vec![
            vec![Some(0), Some(600), Some(600)],
            vec![Some(600), Some(0), Some(600)],
            vec![Some(600), Some(600), Some(0)],
        ])),
    });
    let store = Arc::new(RecordingStore::default());

    let outcome = planner(llm, geo, store.clone()).plan_trip(request(1)).await.unwrap();

    // The coordinate-less block is dropped; ids dense over the rest
    assert_eq!(outcome.itinerary.len(), 2);
    assert_eq!(outcome.itinerary[0].title, "Check-in Hotel Arts");
    assert_eq!(outcome.itinerary[0].id, 0);
    assert_eq!(outcome.itinerary[1].title, "Park Guell");
    assert_eq!(outcome.itinerary[1].id, 1);
    assert!(!outcome.itinerary[0].reached);

    assert_eq!(outcome.insights.len(), 1);
    assert_eq!(outcome.insights[0].category, "Transit_Cost");

    // Uniform matrix: reordering wins nothing, score floors
    assert_eq!(outcome.efficiency_metric, "18.5%");
    assert_eq!(outcome.center.lat, 41.3851);

    // Exactly one journey persisted
    assert_eq!(*store.journeys.lock().unwrap(), vec!["Barcelona".to_string()]);
}

#[tokio::test]
async fn test_plan_trip_survives_store_failure() {
    let llm = ScriptedLlm::new(vec![
        Ok(RESEARCH_REPLY),
        Ok("unusable"),
        Ok("[0, 1, 2]"),
        Ok(FORMAT_REPLY),
    ]);
    let geo = Arc::new(StubGeo { matrix: None });
    let store = Arc::new(RecordingStore {
        fail: true,
        ..Default::default()
    });

    let outcome = planner(llm, geo, store).plan_trip(request(1)).await.unwrap();

    assert_eq!(outcome.itinerary.len(), 2);
    // No matrix: logistics degrades to the fixed score
    assert_eq!(outcome.efficiency_metric, "35%");
}

#[tokio::test]
async fn test_research_failure_is_fatal() {
    let llm = ScriptedLlm::new(vec![Err(())]);
    let geo = Arc::new(StubGeo { matrix: None });
    let store = Arc::new(RecordingStore::default());

    let result = planner(llm, geo, store.clone()).plan_trip(request(1)).await;

    assert!(result.is_err());
    assert!(store.journeys.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_format_failure_is_fatal() {
    let llm = ScriptedLlm::new(vec![
        Ok(RESEARCH_REPLY),
        Ok("unusable"),
        Ok("[0, 1, 2]"),
        Err(()),
    ]);
    let geo = Arc::new(StubGeo { matrix: None });
    let store = Arc::new(RecordingStore::default());

    let result = planner(llm, geo, store).plan_trip(request(1)).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_contained_middle_stages_never_block_delivery() {
    // Vibe and logistics both get failing completions; the plan still lands
    let llm = ScriptedLlm::new(vec![
        Ok(RESEARCH_REPLY),
        Err(()),
        Err(()),
        Ok(FORMAT_REPLY),
    ]);
    let geo = Arc::new(StubGeo { matrix: None });
    let store = Arc::new(RecordingStore::default());

    let outcome = planner(llm, geo, store).plan_trip(request(1)).await.unwrap();

    assert_eq!(outcome.itinerary.len(), 2);
}

#[tokio::test]
async fn test_heal_plan_preserves_checkpoint_head() {
    let healed_tail = "Activity(Aquarium) { Time: 15:00; Lat: 41.376; Lon: 2.183; Type: Indoor; }";
    let llm = ScriptedLlm::new(vec![Ok(healed_tail)]);
    let geo = Arc::new(StubGeo { matrix: None });
    let store = Arc::new(RecordingStore::default());

    let original = vec![
        ActivityNode {
            id: 0,
            title: "Check-in".to_string(),
            time: "09:00".to_string(),
            address: "Marina 19, Barcelona".to_string(),
            lat: 41.39,
            lon: 2.19,
            category: "Stay".to_string(),
            rationale: String::new(),
            description: String::new(),
            price: "$0".to_string(),
            reached: true,
        },
        ActivityNode {
            id: 1,
            title: "Beach Walk".to_string(),
            time: "11:00".to_string(),
            address: "Barceloneta".to_string(),
            lat: 41.38,
            lon: 2.19,
            category: "Outdoor".to_string(),
            rationale: String::new(),
            description: String::new(),
            price: "$0".to_string(),
            reached: false,
        },
    ];

    let healed = planner(llm, geo, store.clone())
        .heal_plan(&original, 0, "It started raining")
        .await
        .unwrap();

    assert_eq!(healed.len(), 2);
    assert_eq!(healed[0], original[0]);
    assert_eq!(healed[1].title, "Aquarium");
    assert_eq!(*store.itineraries.lock().unwrap(), vec!["Marina 19, Barcelona".to_string()]);
}

#[tokio::test]
async fn test_parts_constructor_wires_the_same_pipeline() {
    let llm = ScriptedLlm::new(vec![Ok("Activity(A) { Lat: 1.0; Lon: 2.0; }")]);
    let store: Arc<RecordingStore> = Arc::new(RecordingStore::default());
    let geo = Arc::new(StubGeo { matrix: None });

    let planner = Planner::from_parts(
        Orchestrator::from_stages(vec![]),
        HealingController::new(llm, store.clone()),
        geo,
        store,
    );

    let healed = planner.heal_plan(&[], 0, "rain").await.unwrap();
    assert_eq!(healed.len(), 1);
    assert_eq!(healed[0].title, "A");
}
