//! On-disk and in-memory shapes for the code cache, per spec.md §3.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One of the two artifact shapes AIForge-generated code ever actually
/// produces. The design note in spec.md §9 lists `Entry`/`Class` as
/// additional variants a general cache could hold, but nothing in this
/// engine's pipeline ever emits module-as-entry-point or module-as-class
/// shapes, so they're left unimplemented rather than modeled and unused.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachedArtifact {
    /// A `def execute_task(...)` module invoked with mapped parameters.
    Parameterized { source: String, entry_point: String },
    /// A constant value, returned verbatim without re-execution.
    DirectValue { value: serde_json::Value },
}

/// Lightweight signature of a parameter, used to compare cached modules'
/// call shape against a standardized instruction's required parameters
/// without re-parsing source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSignature {
    pub name: String,
    pub param_type: String,
    pub required: bool,
}

/// One cached code module, as stored in the cache index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeModule {
    pub module_id: String,
    pub task_type: String,
    pub action: String,
    pub cache_key: String,
    pub parameter_signature: Vec<ParameterSignature>,
    pub artifact: CachedArtifact,
    pub success_count: u64,
    pub failure_count: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_used_at: chrono::DateTime<chrono::Utc>,
}

impl CodeModule {
    /// Candidates with no recorded attempts get the neutral prior
    /// spec.md §4.2 calls for, rather than an optimistic 1.0 that would
    /// let an untested module outrank a proven one.
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            return 0.5;
        }
        self.success_count as f64 / total as f64
    }

    /// Composite ranking score: success rate dominates, recency breaks
    /// ties between modules with identical track records.
    pub fn rank_score(&self, now: chrono::DateTime<chrono::Utc>) -> f64 {
        let age_hours = (now - self.last_used_at).num_minutes().max(0) as f64 / 60.0;
        let recency_bonus = 1.0 / (1.0 + age_hours / 24.0);
        self.success_rate() * 0.8 + recency_bonus * 0.2
    }

    pub fn parameter_signature_string(&self) -> String {
        self.parameter_signature
            .iter()
            .map(|p| format!("{}:{}{}", p.name, p.param_type, if p.required { "!" } else { "?" }))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// On-disk cache index: module metadata only, source lives in its own
/// `.py` file under `modules/` (see [`crate::env::module_file_path`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheIndex {
    pub modules: BTreeMap<String, CodeModule>,
}
