//! Format stage: protocol rendering of the final itinerary
//!
//! Hands the sequenced pool to the completion service under the strict
//! protocol system prompt and decodes the reply into activity nodes and
//! trip insights. Like research, this stage has no fallback: a
//! completion failure is fatal to the request. A malformed reply is not
//! an error, though - the tolerant parser simply yields fewer records.

use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, WrapErr, eyre};
use tracing::debug;

use super::{Stage, StageUpdate};
use crate::domain::PlanningContext;
use crate::llm::{CompletionRequest, LlmClient};
use crate::protocol;

/// Hotel label used in prompts when research produced none
const DEFAULT_HOTEL: &str = "The selected accommodation";

pub struct FormatStage {
    llm: Arc<dyn LlmClient>,
    origin: String,
}

impl FormatStage {
    pub fn new(llm: Arc<dyn LlmClient>, origin: String) -> Self {
        Self { llm, origin }
    }

    fn build_prompt(&self, ctx: &PlanningContext) -> String {
        let hotel = if ctx.hotel_name.is_empty() {
            DEFAULT_HOTEL
        } else {
            ctx.hotel_name.as_str()
        };
        let pool_json = serde_json::to_string(&ctx.poi_pool).unwrap_or_else(|_| "[]".to_string());

        format!(
            "DATA: {pool_json}\n\
             MAX_BUDGET: ${budget}\n\
             HOTEL_NAME: {hotel}\n\
             STARTING_POINT: {origin}\n\
             TARGET: {destination}\n\
             WEATHER: {weather}\n\
             DAY WINDOW: {day_start}-{day_end}\n\n\
             TASK:\n\
             1. Estimate the round-trip flight/transit cost from {origin} to {destination}.\n\
             2. Deduct this transit cost from the ${budget}.\n\
             3. Distribute the REMAINING budget across the {days} days of activities.\n\
             4. Generate a {days}-day itinerary in the protocol format.\n\n\
             REQUIRED INSIGHT:\n\
             - TripInsight(Transit_Cost) {{\n\
             \x20   Content: 'Estimated round-trip from {origin} to {destination} factored into budget.';\n\
             \x20   Value: '$[Estimated Price]';\n\
             \x20 }}\n\n\
             COMPLIANCE RULES (MANDATORY):\n\
             1. DAY 1: The first activity MUST be Activity(Check-in_{hotel_token}) {{ Time: {day_start}; \
             Logic: 'Checking into optimized anchor location'; }}\n\
             2. DAY 2: One activity MUST be Activity(Heritage_Site_Visit) {{ Time: 09:00; \
             Logic: 'Heritage site visit (low crowd window)'; \
             Description: 'Exploring the cultural soul of the city during the quietest morning hours.'; }}\n\
             3. DAY 2: Follow the heritage visit with Activity(Lunch) {{ Time: 12:00; \
             Logic: 'Lunch near stay location.'; }}\n\
             4. Generate exactly 3 TripInsight blocks using these EXACT quotes:\n\
             \x20  - TripInsight(Stay_Optimization) {{ Content: '{hotel} selected within 1.2 km of major \
             attractions—travel time reduced by 35%.'; Value: '1.2km'; }}\n\
             \x20  - TripInsight(Booking_Insight) {{ Content: 'Best price window detected for Day 4 \
             activity—booking recommended within next 6 hours.'; Value: '6h Window'; }}\n\
             \x20  - TripInsight(Schedule_Adjustment) {{ Content: 'Rain forecast detected—outdoor activity \
             shifted to Day 5; museum visit scheduled for Day 3 afternoon.'; Value: 'Weather Heal'; }}\n\
             5. Ensure Activity prices are realistic for the remaining budget.",
            pool_json = pool_json,
            budget = ctx.budget_max,
            hotel = hotel,
            hotel_token = hotel.replace(' ', "_"),
            origin = self.origin,
            destination = ctx.destination,
            weather = ctx.weather,
            day_start = ctx.day_start,
            day_end = ctx.day_end,
            days = ctx.days,
        )
    }
}

#[async_trait]
impl Stage for FormatStage {
    fn name(&self) -> &'static str {
        "format"
    }

    async fn run(&self, ctx: &PlanningContext) -> Result<StageUpdate> {
        let prompt = self.build_prompt(ctx);
        let response = self
            .llm
            .complete(CompletionRequest::new(prompt, 4000).with_system(protocol::system_prompt()))
            .await
            .wrap_err("format completion failed")?;

        let text = response.content.ok_or_else(|| eyre!("format completion returned no text"))?;
        let parsed = protocol::parse_with_insights(&text);
        debug!(
            activities = parsed.itinerary.len(),
            insights = parsed.insights.len(),
            "run: format complete"
        );

        Ok(StageUpdate {
            itinerary: Some(parsed.itinerary),
            insights: Some(parsed.insights),
            ..Default::default()
        })
    }
}
