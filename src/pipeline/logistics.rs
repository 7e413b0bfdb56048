//! Logistics stage: route sequencing and efficiency scoring
//!
//! Requests a travel-time matrix from the distance service and a
//! candidate sequencing from the completion service, validates both
//! defensively, and scores the reordering. Three independent fallback
//! layers exist for this one stage: a pool of fewer than two candidates
//! skips it entirely, an unusable sequencing response degrades to the
//! identity ordering, and an error escaping the inner path passes the
//! original pool through untouched. Logistics failure never blocks plan
//! delivery.

use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tracing::{debug, warn};

use super::{Stage, StageUpdate};
use crate::domain::{Candidate, GeoPoint, PlanningContext};
use crate::llm::{CompletionRequest, LlmClient};
use crate::protocol::strip_fences;
use crate::routing;
use crate::services::GeoService;

/// Efficiency label when the pool is too small to sequence
const TARGETED_FALLBACK: &str = "35% (Targeted)";

/// Efficiency label when the inner stage fails outright
const BYPASS_FALLBACK: &str = "35% (Optimized)";

pub struct LogisticsStage {
    llm: Arc<dyn LlmClient>,
    geo: Arc<dyn GeoService>,
}

impl LogisticsStage {
    pub fn new(llm: Arc<dyn LlmClient>, geo: Arc<dyn GeoService>) -> Self {
        Self { llm, geo }
    }

    /// Inner optimization path; errors here are contained by `run`
    async fn optimize(&self, pool: &[Candidate]) -> Result<(Vec<Candidate>, String)> {
        let locations: Vec<GeoPoint> = pool.iter().map(Candidate::point).collect();
        let matrix = self.geo.distance_matrix(&locations).await;
        if matrix.is_none() {
            debug!("optimize: no matrix, score will fall back");
        }

        // Ask the completion service to sequence; titles only to save tokens
        let titles: Vec<&str> = pool.iter().map(|p| p.title.as_str()).collect();
        let prompt = format!(
            "POIs: {:?}. Sequence these indices for shortest travel time. \
             Return ONLY a JSON array of numbers.",
            titles
        );

        let order = match self.llm.complete(CompletionRequest::new(prompt, 200)).await {
            Ok(response) => match parse_sequence(response.text(), pool.len()) {
                Some(order) => order,
                None => {
                    warn!("optimize: unusable sequencing response, using identity ordering");
                    (0..pool.len()).collect()
                }
            },
            Err(e) => {
                warn!(error = %e, "optimize: sequencing completion failed, using identity ordering");
                (0..pool.len()).collect()
            }
        };

        let naive: Vec<usize> = (0..pool.len()).collect();
        let efficiency = routing::score(matrix.as_ref(), &naive, &order);

        let reordered: Vec<Candidate> = order.iter().map(|&i| pool[i].clone()).collect();
        debug!(kept = reordered.len(), efficiency, "optimize: complete");

        Ok((reordered, format!("{}%", efficiency)))
    }
}

#[async_trait]
impl Stage for LogisticsStage {
    fn name(&self) -> &'static str {
        "logistics"
    }

    async fn run(&self, ctx: &PlanningContext) -> Result<StageUpdate> {
        if ctx.poi_pool.len() < 2 {
            debug!(pool = ctx.poi_pool.len(), "run: pool too small, skipping logistics");
            return Ok(StageUpdate {
                efficiency: Some(TARGETED_FALLBACK.to_string()),
                ..Default::default()
            });
        }

        match self.optimize(&ctx.poi_pool).await.wrap_err("logistics optimization") {
            Ok((pool, efficiency)) => Ok(StageUpdate {
                poi_pool: Some(pool),
                efficiency: Some(efficiency),
                ..Default::default()
            }),
            Err(e) => {
                // Hard bypass: the user still gets a plan
                warn!(error = %e, "run: logistics bypassed");
                Ok(StageUpdate {
                    poi_pool: Some(ctx.poi_pool.clone()),
                    efficiency: Some(BYPASS_FALLBACK.to_string()),
                    ..Default::default()
                })
            }
        }
    }
}

/// Decode a sequencing response into candidate indices
///
/// Elements that are not integers in `[0, pool_len)` are filtered out,
/// not replaced. Returns None when the response is not a JSON array.
fn parse_sequence(text: &str, pool_len: usize) -> Option<Vec<usize>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(&strip_fences(text)).ok()?;
    Some(
        values
            .iter()
            .filter_map(|v| v.as_u64())
            .map(|v| v as usize)
            .filter(|&i| i < pool_len)
            .collect(),
    )
}
