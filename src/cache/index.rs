//! # Code Cache Index
//!
//! Ported from the lookup/ranking logic in
//! `StandardizedCodeCache.get_cached_modules_by_standardized_instruction`
//! (the system this spec was distilled from): look up by exact cache key
//! first, then by a task-type+action signature, merge and deduplicate the
//! two result sets, and rank what's left by track record and recency.
//!
//! Persistence uses the teacher's write-temp-then-rename pattern (see
//! `PersistenceManager::save_to_file` in the original crate this was
//! adapted from) rather than the upstream system's sqlite-backed index —
//! this crate has no existing reason to carry a sqlite dependency, so a
//! flat `index.json` plus one `.py` file per module is used instead (see
//! spec.md §4.2 / DESIGN.md for the reasoning).

use crate::cache::types::{CacheIndex, CodeModule};
use crate::env;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache index is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

fn type_action_key(task_type: &str, action: &str) -> String {
    let mut hasher = DefaultHasher::new();
    format!("{task_type}_{action}").hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// A module match plus which lookup strategy surfaced it, preserved for
/// logging/debugging the way the original system's `[DEBUG]` lines did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    TypeAction,
}

impl MatchStrategy {
    /// Strategy priority from spec.md §4.2's ranking formula
    /// (`exact=4 > type_action=2 > general=1`); folded into the lookup
    /// sort key so an exact-key hit always outranks a weaker-strategy
    /// one regardless of track record.
    fn priority(self) -> f64 {
        match self {
            MatchStrategy::Exact => 4.0,
            MatchStrategy::TypeAction => 2.0,
        }
    }
}

/// Thread-safe, process-wide handle to the on-disk cache. Cloned cheaply
/// (an `Arc` underneath), mirroring the teacher's `SessionManager`
/// `Arc<RwLock<_>>` sharing pattern.
#[derive(Clone)]
pub struct CodeCache {
    workdir: std::path::PathBuf,
    index: Arc<RwLock<CacheIndex>>,
    max_modules_per_task_type: usize,
}

impl CodeCache {
    pub async fn load(workdir: impl AsRef<Path>, max_modules_per_task_type: usize) -> Result<Self, CacheError> {
        let workdir = workdir.as_ref().to_path_buf();
        let index_path = env::cache_index_file_path(&workdir);
        let index = if index_path.exists() {
            let bytes = tokio::fs::read(&index_path).await?;
            serde_json::from_slice(&bytes)?
        } else {
            CacheIndex::default()
        };
        Ok(Self {
            workdir,
            index: Arc::new(RwLock::new(index)),
            max_modules_per_task_type,
        })
    }

    async fn persist(&self, index: &CacheIndex) -> Result<(), CacheError> {
        persist_json(&env::cache_index_file_path(&self.workdir), index).await
    }

    /// Strategy 1 (exact) + strategy 2 (task_type+action), merged and
    /// ranked. Mirrors `get_cached_modules_by_standardized_instruction`.
    pub async fn lookup(&self, cache_key: &str, task_type: &str, action: &str) -> Vec<(CodeModule, MatchStrategy)> {
        let index = self.index.read().await;
        let mut seen = std::collections::HashSet::new();
        let mut matches = Vec::new();

        if let Some(module) = index.modules.values().find(|m| m.cache_key == cache_key) {
            seen.insert(module.module_id.clone());
            matches.push((module.clone(), MatchStrategy::Exact));
        }

        let type_action_hash = type_action_key(task_type, action);
        for module in index.modules.values() {
            if module.task_type == task_type
                && module.action == action
                && type_action_key(&module.task_type, &module.action) == type_action_hash
                && seen.insert(module.module_id.clone())
            {
                matches.push((module.clone(), MatchStrategy::TypeAction));
            }
        }

        let now = chrono::Utc::now();
        matches.sort_by(|a, b| {
            let score_a = a.1.priority() + a.0.rank_score(now);
            let score_b = b.1.priority() + b.0.rank_score(now);
            score_b.partial_cmp(&score_a).unwrap()
        });
        matches
    }

    /// Persists a new module's source and index entry. Caller is
    /// responsible for having already decided cacheability (see
    /// [`crate::dataflow::gate`]) — this function stores unconditionally.
    pub async fn store(&self, module: CodeModule, source: &str) -> Result<(), CacheError> {
        let module_path = env::module_file_path(&self.workdir, &module.module_id);
        if let Some(parent) = module_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&module_path, source).await?;

        let mut index = self.index.write().await;
        index.modules.insert(module.module_id.clone(), module);
        self.evict_oldest_over_capacity(&mut index);
        self.persist(&index).await?;
        Ok(())
    }

    pub async fn load_source(&self, module_id: &str) -> Result<String, CacheError> {
        let path = env::module_file_path(&self.workdir, module_id);
        Ok(tokio::fs::read_to_string(path).await?)
    }

    pub async fn update_stats(&self, module_id: &str, succeeded: bool) -> Result<(), CacheError> {
        let mut index = self.index.write().await;
        if let Some(module) = index.modules.get_mut(module_id) {
            if succeeded {
                module.success_count += 1;
            } else {
                module.failure_count += 1;
            }
            module.last_used_at = chrono::Utc::now();
        }
        self.persist(&index).await?;
        Ok(())
    }

    /// Per-task-type LRU eviction: when a task type exceeds its module
    /// budget, drop the lowest-ranked module for that type.
    fn evict_oldest_over_capacity(&self, index: &mut CacheIndex) {
        let now = chrono::Utc::now();
        let mut by_type: std::collections::HashMap<String, Vec<String>> = std::collections::HashMap::new();
        for module in index.modules.values() {
            by_type.entry(module.task_type.clone()).or_default().push(module.module_id.clone());
        }
        for (_, mut ids) in by_type {
            if ids.len() <= self.max_modules_per_task_type {
                continue;
            }
            ids.sort_by(|a, b| {
                let score_a = index.modules[a].rank_score(now);
                let score_b = index.modules[b].rank_score(now);
                score_a.partial_cmp(&score_b).unwrap()
            });
            let excess = ids.len() - self.max_modules_per_task_type;
            for id in ids.into_iter().take(excess) {
                index.modules.remove(&id);
            }
        }
    }
}

async fn persist_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let encoded = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, encoded).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::types::{CachedArtifact, ParameterSignature};

    fn sample_module(id: &str, task_type: &str, action: &str, cache_key: &str) -> CodeModule {
        let now = chrono::Utc::now();
        CodeModule {
            module_id: id.to_string(),
            task_type: task_type.to_string(),
            action: action.to_string(),
            cache_key: cache_key.to_string(),
            parameter_signature: vec![ParameterSignature {
                name: "query".to_string(),
                param_type: "str".to_string(),
                required: true,
            }],
            artifact: CachedArtifact::Parameterized {
                source: "def execute_task(query): return {'data': query}".to_string(),
                entry_point: "execute_task".to_string(),
            },
            success_count: 3,
            failure_count: 0,
            created_at: now,
            last_used_at: now,
        }
    }

    #[tokio::test]
    async fn store_then_exact_lookup_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CodeCache::load(dir.path(), 10).await.unwrap();
        let module = sample_module("m1", "data_fetch", "search", "data_fetch_123");
        cache.store(module.clone(), "def execute_task(query): return {'data': query}").await.unwrap();

        let hits = cache.lookup("data_fetch_123", "data_fetch", "search").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.module_id, "m1");
        assert_eq!(hits[0].1, MatchStrategy::Exact);
    }

    #[tokio::test]
    async fn type_action_lookup_finds_module_under_different_cache_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CodeCache::load(dir.path(), 10).await.unwrap();
        let module = sample_module("m1", "data_fetch", "search", "data_fetch_999");
        cache.store(module, "def execute_task(query): return {'data': query}").await.unwrap();

        let hits = cache.lookup("different_key", "data_fetch", "search").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, MatchStrategy::TypeAction);
    }

    #[tokio::test]
    async fn update_stats_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CodeCache::load(dir.path(), 10).await.unwrap();
        let module = sample_module("m1", "data_fetch", "search", "key1");
        cache.store(module, "src").await.unwrap();
        cache.update_stats("m1", true).await.unwrap();

        let reloaded = CodeCache::load(dir.path(), 10).await.unwrap();
        let hits = reloaded.lookup("key1", "data_fetch", "search").await;
        assert_eq!(hits[0].0.success_count, 4);
    }

    #[tokio::test]
    async fn eviction_drops_lowest_ranked_module_over_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CodeCache::load(dir.path(), 1).await.unwrap();
        let mut weak = sample_module("weak", "data_fetch", "search", "k1");
        weak.success_count = 0;
        weak.failure_count = 5;
        cache.store(weak, "src").await.unwrap();
        let strong = sample_module("strong", "data_fetch", "search", "k2");
        cache.store(strong, "src").await.unwrap();

        let index = cache.index.read().await;
        assert_eq!(index.modules.len(), 1);
        assert!(index.modules.contains_key("strong"));
    }
}
