//! Planning pipeline: stage contract, partial updates, and orchestration
//!
//! The pipeline is a strict chain of four stages - Research, VibeFilter,
//! Logistics, Format - with no branching and no skipping. Each stage
//! receives the full current context read-only and returns a
//! [`StageUpdate`]; the orchestrator merges the update into the context
//! before invoking the next stage. Failure containment is each stage's
//! own responsibility: an error that escapes a stage aborts the whole
//! request, with no retry and no partial result.

use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tracing::{debug, info};

mod format;
mod logistics;
mod research;
mod vibe;

pub use format::FormatStage;
pub use logistics::LogisticsStage;
pub use research::ResearchStage;
pub use vibe::VibeFilterStage;

use crate::config::PlannerConfig;
use crate::domain::{ActivityNode, Candidate, InsightRecord, PlanningContext};
use crate::llm::LlmClient;
use crate::services::{GeoService, WeatherService};

/// One transformation stage over the planning context
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name for logging and error context
    fn name(&self) -> &'static str;

    /// Consume the current context, produce a partial update
    async fn run(&self, ctx: &PlanningContext) -> Result<StageUpdate>;
}

/// Partial context update returned by a stage
///
/// Only the fields a stage declares as output are set; the orchestrator
/// merges set fields and leaves the rest of the context untouched.
#[derive(Debug, Clone, Default)]
pub struct StageUpdate {
    pub poi_pool: Option<Vec<Candidate>>,
    pub hotel_name: Option<String>,
    pub weather: Option<String>,
    pub efficiency: Option<String>,
    pub itinerary: Option<Vec<ActivityNode>>,
    pub insights: Option<Vec<InsightRecord>>,
}

impl StageUpdate {
    /// Merge this update into the context
    pub fn apply(self, ctx: &mut PlanningContext) {
        if let Some(poi_pool) = self.poi_pool {
            ctx.poi_pool = poi_pool;
        }
        if let Some(hotel_name) = self.hotel_name {
            ctx.hotel_name = hotel_name;
        }
        if let Some(weather) = self.weather {
            ctx.weather = weather;
        }
        if let Some(efficiency) = self.efficiency {
            ctx.efficiency = efficiency;
        }
        if let Some(itinerary) = self.itinerary {
            ctx.itinerary = itinerary;
        }
        if let Some(insights) = self.insights {
            ctx.insights = insights;
        }
    }
}

/// Runs the fixed stage chain over a planning context
pub struct Orchestrator {
    stages: Vec<Box<dyn Stage>>,
}

impl Orchestrator {
    /// Build the standard four-stage pipeline
    pub fn new(
        llm: Arc<dyn LlmClient>,
        geo: Arc<dyn GeoService>,
        weather: Arc<dyn WeatherService>,
        config: &PlannerConfig,
    ) -> Self {
        Self {
            stages: vec![
                Box::new(ResearchStage::new(
                    llm.clone(),
                    geo.clone(),
                    weather,
                    config.pool_size,
                    config.origin.clone(),
                )),
                Box::new(VibeFilterStage::new(llm.clone(), config.pois_per_day)),
                Box::new(LogisticsStage::new(llm.clone(), geo)),
                Box::new(FormatStage::new(llm, config.origin.clone())),
            ],
        }
    }

    /// Build a pipeline from an explicit stage list (used by tests)
    pub fn from_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Run all stages strictly in order, threading the context forward
    ///
    /// The first uncontained stage error aborts the request; there is no
    /// partial-success return.
    pub async fn execute(&self, mut ctx: PlanningContext) -> Result<PlanningContext> {
        for stage in &self.stages {
            info!(stage = stage.name(), destination = %ctx.destination, "execute: running stage");
            let update = stage
                .run(&ctx)
                .await
                .wrap_err_with(|| format!("stage '{}' failed", stage.name()))?;
            update.apply(&mut ctx);
            debug!(
                stage = stage.name(),
                pool = ctx.poi_pool.len(),
                itinerary = ctx.itinerary.len(),
                "execute: stage complete"
            );
        }
        Ok(ctx)
    }
}
