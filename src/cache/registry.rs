//! # Dynamic Task Type Registry
//!
//! Ported from `DynamicTaskTypeManager` in the system this spec was
//! distilled from: tracks task types the LLM-assisted analyzer invents
//! beyond the built-in set, with usage/success counters that feed both
//! the cache's ranking and the analyzer's escalating "prefer built-ins"
//! guidance (see [`crate::instruction::llm_analysis::GuidanceStrength`]).
//!
//! Persisted to `<workdir>/cache/task_types.json` using the same
//! write-temp-then-rename pattern as the code cache index.

use crate::env;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicTypeInfo {
    pub count: u64,
    pub success_count: u64,
    pub patterns: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_used: chrono::DateTime<chrono::Utc>,
}

impl DynamicTypeInfo {
    fn new(now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            count: 0,
            success_count: 0,
            patterns: Vec::new(),
            created_at: now,
            last_used: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryState {
    dynamic_types: BTreeMap<String, DynamicTypeInfo>,
}

/// Thread-safe handle to the dynamic task type registry.
#[derive(Clone)]
pub struct DynamicTaskTypeRegistry {
    path: std::path::PathBuf,
    state: Arc<RwLock<RegistryState>>,
}

impl DynamicTaskTypeRegistry {
    pub async fn load(workdir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = env::task_types_file_path(workdir.as_ref());
        let state = if path.exists() {
            let bytes = tokio::fs::read(&path).await?;
            serde_json::from_slice(&bytes)?
        } else {
            RegistryState::default()
        };
        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
        })
    }

    async fn persist(&self, state: &RegistryState) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let encoded = serde_json::to_vec_pretty(state)?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, encoded).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// Registers usage of `task_type` (no-op for built-ins), recording
    /// `target` as a usage pattern (truncated to 50 chars, deduplicated).
    pub async fn register(&self, task_type: &crate::instruction::TaskType, target: &str) -> Result<(), RegistryError> {
        if task_type.is_builtin() {
            return Ok(());
        }
        let now = chrono::Utc::now();
        let mut state = self.state.write().await;
        let entry = state
            .dynamic_types
            .entry(task_type.as_str().to_string())
            .or_insert_with(|| DynamicTypeInfo::new(now));
        entry.count += 1;
        entry.last_used = now;
        let truncated: String = target.chars().take(50).collect();
        if !truncated.is_empty() && !entry.patterns.contains(&truncated) {
            entry.patterns.push(truncated);
        }
        self.persist(&state).await
    }

    pub async fn record_outcome(&self, task_type: &str, succeeded: bool) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        if let Some(entry) = state.dynamic_types.get_mut(task_type) {
            if succeeded {
                entry.success_count += 1;
            }
        } else {
            return Ok(());
        }
        self.persist(&state).await
    }

    pub async fn dynamic_type_count(&self) -> usize {
        self.state.read().await.dynamic_types.len()
    }

    /// Matches `get_task_type_priority`: built-ins always outrank dynamic
    /// types; dynamic types get a usage/success-weighted score in `[0,
    /// 100)`.
    pub async fn priority(&self, task_type: &crate::instruction::TaskType) -> u32 {
        if task_type.is_builtin() {
            return 100;
        }
        let state = self.state.read().await;
        let Some(info) = state.dynamic_types.get(task_type.as_str()) else {
            return 0;
        };
        let success_rate = info.success_count as f64 / info.count.max(1) as f64;
        (50.0 + success_rate * 30.0 + (info.count as f64 / 10.0).min(20.0)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::TaskType;

    #[tokio::test]
    async fn builtin_types_are_never_registered() {
        let dir = tempfile::tempdir().unwrap();
        let registry = DynamicTaskTypeRegistry::load(dir.path()).await.unwrap();
        registry.register(&TaskType::DataFetch, "search for news").await.unwrap();
        assert_eq!(registry.dynamic_type_count().await, 0);
    }

    #[tokio::test]
    async fn dynamic_type_registration_persists_and_tracks_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let registry = DynamicTaskTypeRegistry::load(dir.path()).await.unwrap();
        let custom = TaskType::Dynamic("stock_trading".to_string());
        registry.register(&custom, "place a trade order for AAPL").await.unwrap();
        registry.register(&custom, "place a trade order for AAPL").await.unwrap();

        assert_eq!(registry.dynamic_type_count().await, 1);
        let reloaded = DynamicTaskTypeRegistry::load(dir.path()).await.unwrap();
        let state = reloaded.state.read().await;
        let info = &state.dynamic_types["stock_trading"];
        assert_eq!(info.count, 2);
        assert_eq!(info.patterns.len(), 1);
    }

    #[tokio::test]
    async fn priority_scales_with_success_rate_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let registry = DynamicTaskTypeRegistry::load(dir.path()).await.unwrap();
        assert_eq!(registry.priority(&TaskType::DataFetch).await, 100);

        let custom = TaskType::Dynamic("stock_trading".to_string());
        assert_eq!(registry.priority(&custom).await, 0);
        registry.register(&custom, "trade").await.unwrap();
        registry.record_outcome("stock_trading", true).await.unwrap();
        assert!(registry.priority(&custom).await > 50);
    }
}
