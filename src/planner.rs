//! Top-level planning operations
//!
//! The planner is the facade consumed by the (external) transport layer:
//! `plan_trip` builds the initial context, runs the stage pipeline, and
//! persists the journey; `heal_plan` delegates to the healing
//! controller. Persistence is fire-and-forget in both paths.

use std::sync::Arc;

use eyre::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{ActivityNode, GeoPoint, PlanOutcome, PlanRequest, PlanningContext};
use crate::healing::HealingController;
use crate::llm::LlmClient;
use crate::pipeline::Orchestrator;
use crate::services::{GeoService, JourneyStore, WeatherService};

/// Map center used when the destination cannot be geocoded
const FALLBACK_CENTER: GeoPoint = GeoPoint {
    lat: 41.3851,
    lon: 2.1734,
};

pub struct Planner {
    orchestrator: Orchestrator,
    healer: HealingController,
    geo: Arc<dyn GeoService>,
    store: Arc<dyn JourneyStore>,
}

impl Planner {
    /// Wire the standard pipeline over the given collaborators
    pub fn new(
        llm: Arc<dyn LlmClient>,
        geo: Arc<dyn GeoService>,
        weather: Arc<dyn WeatherService>,
        store: Arc<dyn JourneyStore>,
        config: &Config,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(llm.clone(), geo.clone(), weather, &config.planner),
            healer: HealingController::new(llm, store.clone()),
            geo,
            store,
        }
    }

    /// Assemble a planner from prebuilt parts (used by tests)
    pub fn from_parts(
        orchestrator: Orchestrator,
        healer: HealingController,
        geo: Arc<dyn GeoService>,
        store: Arc<dyn JourneyStore>,
    ) -> Self {
        Self {
            orchestrator,
            healer,
            geo,
            store,
        }
    }

    /// Plan a trip end to end
    ///
    /// Either all four stages complete and an outcome is produced, or
    /// the request fails entirely; there is no partial success.
    pub async fn plan_trip(&self, request: PlanRequest) -> Result<PlanOutcome> {
        info!(destination = %request.destination, days = request.duration_days, "plan_trip: called");

        let center = self
            .geo
            .destination_center(&request.destination)
            .await
            .unwrap_or(FALLBACK_CENTER);

        let ctx = PlanningContext::from_request(&request);
        let ctx = self.orchestrator.execute(ctx).await?;

        if let Err(e) = self
            .store
            .save_journey(&request.destination, &ctx.itinerary, &ctx.insights, &center)
            .await
        {
            warn!(error = %e, "plan_trip: journey persistence failed, continuing");
        }

        info!(
            activities = ctx.itinerary.len(),
            insights = ctx.insights.len(),
            efficiency = %ctx.efficiency,
            "plan_trip: complete"
        );
        Ok(PlanOutcome {
            itinerary: ctx.itinerary,
            insights: ctx.insights,
            center,
            efficiency_metric: ctx.efficiency,
        })
    }

    /// Repair an in-flight plan after a disruption
    pub async fn heal_plan(
        &self,
        current_plan: &[ActivityNode],
        reached_index: usize,
        message: &str,
    ) -> Result<Vec<ActivityNode>> {
        self.healer.heal(current_plan, reached_index, message).await
    }
}
