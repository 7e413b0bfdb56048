//! Itinera - LLM-driven travel itinerary planning engine
//!
//! Itinera plans a multi-day trip by running a fixed four-stage pipeline
//! (Research, VibeFilter, Logistics, Format) over a request-local planning
//! context, renders the result through a small block-structured text
//! protocol, and repairs an in-flight plan via checkpoint-based partial
//! regeneration ("healing").
//!
//! # Core Concepts
//!
//! - **Fixed stage chain**: stages run strictly in order; each returns a
//!   partial context update that the orchestrator merges before the next
//! - **Contained degradation**: logistics and scoring failures fall back to
//!   documented constants; plan delivery is never blocked by them
//! - **Tolerant protocol**: generated text is scanned for well-formed
//!   `Activity(..) { .. }` / `TripInsight(..) { .. }` blocks; everything
//!   else is ignored, and malformed blocks are dropped, never errors
//!
//! # Modules
//!
//! - [`pipeline`] - Stage trait, the four stages, and the orchestrator
//! - [`protocol`] - block grammar, tolerant parser, protocol system prompt
//! - [`routing`] - travel-time matrix and route-efficiency scoring
//! - [`healing`] - checkpoint slicing and tail regeneration
//! - [`llm`] - completion client trait and Anthropic implementation
//! - [`services`] - geocoding, weather, and journey-store collaborators
//! - [`planner`] - top-level `plan_trip` / `heal_plan` operations
//! - [`config`] - configuration types and loading

pub mod cli;
pub mod config;
pub mod domain;
pub mod healing;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod protocol;
pub mod routing;
pub mod services;

// Re-export commonly used types
pub use config::{Config, GeoConfig, LlmConfig, PlannerConfig, StoreConfig, WeatherConfig};
pub use domain::{
    ActivityNode, Candidate, GeoPoint, InsightRecord, PlanOutcome, PlanRequest, PlanningContext,
};
pub use healing::HealingController;
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError};
pub use pipeline::{
    FormatStage, LogisticsStage, Orchestrator, ResearchStage, Stage, StageUpdate, VibeFilterStage,
};
pub use planner::Planner;
pub use protocol::ParsedPlan;
pub use routing::TravelTimeMatrix;
pub use services::{
    GeoService, GoogleMapsClient, JourneyStore, OpenWeatherClient, ResolvedPlace, StoreError,
    SupabaseStore, WeatherService,
};
