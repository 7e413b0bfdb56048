//! Vibe-filter stage: density control and persona-driven substitution
//!
//! Keeps the itinerary density at a fixed number of candidates per day
//! and delegates substitution judgement (e.g. swapping religious sites
//! for hidden gems when the traveler prefers none) to the completion
//! service. Fully contained: any completion or decode failure falls back
//! to the truncated, reindexed pool.

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use tracing::{debug, warn};

use super::{Stage, StageUpdate};
use crate::domain::{Candidate, PlanningContext, reindex};
use crate::llm::{CompletionRequest, LlmClient};
use crate::protocol::strip_fences;

pub struct VibeFilterStage {
    llm: Arc<dyn LlmClient>,
    pois_per_day: usize,
}

impl VibeFilterStage {
    pub fn new(llm: Arc<dyn LlmClient>, pois_per_day: usize) -> Self {
        Self { llm, pois_per_day }
    }

    fn build_prompt(&self, ctx: &PlanningContext, target_count: usize) -> String {
        let pool_json = serde_json::to_string(&ctx.poi_pool).unwrap_or_else(|_| "[]".to_string());
        format!(
            "PERSONA: {persona}\n\
             RELIGIOUS SITES ALLOWED: {religious}\n\
             TARGET COUNT: {target_count}\n\
             POOL: {pool_json}\n\n\
             TASK:\n\
             1. Select the best {target_count} items.\n\
             2. IF religious sites are not allowed: identify any religious sites\n\
             \x20  (church, temple, cathedral, mosque) and REPLACE them with a\n\
             \x20  'Hidden Gem' or 'Local Secret' in the same city that matches the {persona} vibe.\n\
             3. Return the FINAL list of {target_count} POIs as a JSON array of objects\n\
             \x20  with the same keys as the input.\n\n\
             Output ONLY the JSON array.",
            persona = ctx.persona,
            religious = ctx.religious_sites_ok,
            target_count = target_count,
            pool_json = pool_json,
        )
    }
}

#[async_trait]
impl Stage for VibeFilterStage {
    fn name(&self) -> &'static str {
        "vibe-filter"
    }

    async fn run(&self, ctx: &PlanningContext) -> Result<StageUpdate> {
        let target_count = ctx.days as usize * self.pois_per_day;

        // Emergency fallback shape: first available nodes, reindexed
        let mut truncated: Vec<Candidate> = ctx.poi_pool.iter().take(target_count).cloned().collect();
        reindex(&mut truncated);

        let prompt = self.build_prompt(ctx, target_count);
        let selected = match self.llm.complete(CompletionRequest::new(prompt, 2500)).await {
            Ok(response) => match decode_pool(response.text()) {
                Some(pool) => pool,
                None => {
                    warn!("run: unusable selection response, keeping truncated pool");
                    truncated.clone()
                }
            },
            Err(e) => {
                warn!(error = %e, "run: selection completion failed, keeping truncated pool");
                truncated.clone()
            }
        };

        let mut filtered: Vec<Candidate> = selected.into_iter().take(target_count).collect();
        reindex(&mut filtered);
        debug!(target_count, kept = filtered.len(), "run: vibe filter complete");

        Ok(StageUpdate {
            poi_pool: Some(filtered),
            ..Default::default()
        })
    }
}

/// Decode a candidate array from a completion, tolerating code fences
fn decode_pool(text: &str) -> Option<Vec<Candidate>> {
    serde_json::from_str(&strip_fences(text)).ok()
}
