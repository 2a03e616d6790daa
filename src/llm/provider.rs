use crate::llm::types::{LLMError, LLMRequest, LLMResponse};
use futures::future::BoxFuture;

/// The LLM provider contract the core consumes.
///
/// Corresponds exactly to spec.md §6: `generate(system_prompt, user_prompt,
/// history?) → text`, with the provider treated as a black box. Wire
/// protocols for concrete providers are external collaborators; this
/// trait is the only seam the core depends on.
pub trait LLMProvider: Send + Sync {
    /// Execute a single generation request.
    fn generate(&self, request: LLMRequest) -> BoxFuture<'_, Result<LLMResponse, LLMError>>;

    /// Provider name/identifier, used in log lines and provider_metadata.
    fn provider_name(&self) -> &'static str;

    /// Best-effort health check, used at startup to fail fast on
    /// misconfiguration (a fatal error per spec.md §7).
    fn health_check(&self) -> BoxFuture<'_, Result<(), LLMError>>;
}
