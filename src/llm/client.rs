//! LLM client trait

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Completion-service contract
///
/// One blocking completion per call; the pipeline has no streaming or
/// tool-use surface. Implementations own their retry policy.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Execute a completion request and return the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
