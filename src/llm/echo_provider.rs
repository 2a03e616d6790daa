//! A deterministic test double for [`LLMProvider`].
//!
//! Ships as the one reference implementation per spec.md §1 ("the LLM
//! provider wire protocol itself is a black box this core does not
//! implement"). Real providers plug in behind the same trait.

use crate::llm::provider::LLMProvider;
use crate::llm::types::{LLMError, LLMRequest, LLMResponse};
use futures::future::BoxFuture;
use std::sync::Mutex;

/// Replays a fixed queue of responses, falling back to echoing the user
/// prompt back verbatim once the queue is drained. Useful for driving
/// the multi-round controller through a scripted sequence of attempts
/// in tests.
pub struct EchoProvider {
    scripted: Mutex<Vec<String>>,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_scripted_responses(responses: Vec<String>) -> Self {
        Self {
            scripted: Mutex::new(responses),
        }
    }
}

impl Default for EchoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LLMProvider for EchoProvider {
    fn generate(&self, request: LLMRequest) -> BoxFuture<'_, Result<LLMResponse, LLMError>> {
        Box::pin(async move {
            let mut scripted = self.scripted.lock().expect("echo provider lock poisoned");
            if !scripted.is_empty() {
                return Ok(LLMResponse::text(scripted.remove(0)));
            }
            Ok(LLMResponse::text(request.user_prompt))
        })
    }

    fn provider_name(&self) -> &'static str {
        "echo"
    }

    fn health_check(&self) -> BoxFuture<'_, Result<(), LLMError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_user_prompt_by_default() {
        let provider = EchoProvider::new();
        let response = provider
            .generate(LLMRequest::new("system", "hello"))
            .await
            .unwrap();
        assert_eq!(response.content, "hello");
    }

    #[tokio::test]
    async fn replays_scripted_responses_in_order() {
        let provider = EchoProvider::with_scripted_responses(vec!["first".into(), "second".into()]);
        let a = provider.generate(LLMRequest::new("s", "u")).await.unwrap();
        let b = provider.generate(LLMRequest::new("s", "u")).await.unwrap();
        let c = provider.generate(LLMRequest::new("s", "u")).await.unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(c.content, "u");
    }
}
