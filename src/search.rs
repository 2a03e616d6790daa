//! The built-in `search_web` helper consulted as tier (a) of the
//! four-tier search strategy in spec.md §4.7. The concrete search
//! backend is an external collaborator per spec.md §1 ("input-source
//! adapters" / anything that isn't the core's own logic); this module
//! only defines the seam — [`SearchProvider`] — plus a trivial
//! in-memory fake used by this crate's own tests.
//!
//! Ported from the role `search_manager.py`'s `search_web` plays in the
//! system this spec was distilled from, minus its concrete engine
//! integrations (those are exactly the kind of output/transport glue
//! spec.md §1 puts out of scope).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One search hit, already shaped close to the canonical result's
/// `data.results` convention so the orchestrator can wrap it with no
/// further massaging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// The seam the orchestrator's tier-(a) search path consumes. A real
/// implementation would wrap a concrete search API (the HTTP client is
/// an external collaborator per spec.md §1); this crate ships only the
/// trait and a deterministic fake for tests.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, String>;
}

/// Deterministic in-memory fake: returns canned hits up to
/// `max_results`, or an empty vec for queries it doesn't recognize —
/// used to drive the orchestrator's search path in tests without a
/// network dependency.
pub struct InMemorySearchProvider {
    hits: Vec<SearchHit>,
}

impl InMemorySearchProvider {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }

    pub fn empty() -> Self {
        Self { hits: Vec::new() }
    }
}

#[async_trait]
impl SearchProvider for InMemorySearchProvider {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>, String> {
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_provider_caps_at_max_results() {
        let hits = (0..5)
            .map(|i| SearchHit {
                title: format!("hit {i}"),
                url: format!("https://example.com/{i}"),
                snippet: "...".to_string(),
            })
            .collect();
        let provider = InMemorySearchProvider::new(hits);
        let results = provider.search("rust news", 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn empty_provider_returns_no_hits() {
        let provider = InMemorySearchProvider::empty();
        let results = provider.search("anything", 10).await.unwrap();
        assert!(results.is_empty());
    }
}
