//! Self-healing: checkpoint-based partial regeneration of a plan
//!
//! A disruption event (rain, a delay, a change of heart) never touches
//! the part of the plan the traveler has already completed. The plan is
//! sliced at the checkpoint, only the unconsumed tail is sent for
//! regeneration under the protocol grammar, and the decoded replacement
//! is appended to the untouched head. The controller trusts the decoded
//! output; the parser's structural rule (coordinates required) is the
//! only filter applied.

use std::sync::Arc;

use eyre::{Result, WrapErr};
use tracing::{debug, info, warn};

use crate::domain::ActivityNode;
use crate::llm::{CompletionRequest, LlmClient};
use crate::protocol;
use crate::services::JourneyStore;

/// Store key when the original plan was empty
const EMPTY_PLAN_DESTINATION: &str = "Updated Trip";

/// Store key when the first node carries no address
const UNKNOWN_DESTINATION: &str = "Unknown";

pub struct HealingController {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn JourneyStore>,
}

impl HealingController {
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn JourneyStore>) -> Self {
        Self { llm, store }
    }

    /// Regenerate the tail of `current_plan` past `reached_index`
    ///
    /// The first `reached_index + 1` entries of the result are the
    /// corresponding entries of `current_plan`, unchanged. The merged
    /// plan is persisted fire-and-forget before being returned.
    pub async fn heal(
        &self,
        current_plan: &[ActivityNode],
        reached_index: usize,
        message: &str,
    ) -> Result<Vec<ActivityNode>> {
        let split = (reached_index + 1).min(current_plan.len());
        let (past, future) = current_plan.split_at(split);
        info!(
            reached_index,
            past = past.len(),
            future = future.len(),
            "heal: slicing plan at checkpoint"
        );

        let prompt = build_heal_prompt(message, future);
        let response = self
            .llm
            .complete(CompletionRequest::new(prompt, 1000).with_system(protocol::system_prompt()))
            .await
            .wrap_err("healing completion failed")?;

        let healed = protocol::parse(response.text());
        debug!(healed = healed.len(), "heal: decoded replacement tail");

        let mut plan: Vec<ActivityNode> = past.to_vec();
        plan.extend(healed);

        // Keyed by the original plan's first stop, not the healed one
        let destination = match current_plan.first() {
            Some(node) if !node.address.is_empty() => node.address.clone(),
            Some(_) => UNKNOWN_DESTINATION.to_string(),
            None => EMPTY_PLAN_DESTINATION.to_string(),
        };
        if let Err(e) = self.store.save_itinerary(&destination, &plan).await {
            warn!(error = %e, %destination, "heal: persistence failed, continuing");
        }

        Ok(plan)
    }
}

/// Regeneration request: the disruption plus the unconsumed tail only
///
/// The rain/delay policies are advisory prompt content; the controller
/// does not verify the generator honored them.
fn build_heal_prompt(message: &str, future: &[ActivityNode]) -> String {
    let future_json = serde_json::to_string(future).unwrap_or_else(|_| "[]".to_string());
    format!(
        "DISRUPTION: {message}\n\
         FUTURE_NODES: {future_json}\n\n\
         TASK: Re-optimize these nodes.\n\
         - If it's RAIN: Swap 'Outdoor' types for 'Indoor' alternatives.\n\
         - If it's a DELAY: Remove the least important node to save time.\n\
         Return ONLY in the protocol format."
    )
}
