//! The canonical result shape produced by generated code and consumed by
//! the validator, plus the transient per-attempt execution record.
//!
//! Mirrors spec.md §3's canonical successful result shape exactly:
//! `{ data, status, summary, metadata: { timestamp, task_type,
//! [execution_type] } }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status tag inside a canonical result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// Metadata block of a canonical result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub timestamp: DateTime<Utc>,
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_type: Option<String>,
}

/// The canonical successful (or failed) result shape normalized by the
/// orchestrator before validation, per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResult {
    pub data: Option<serde_json::Value>,
    pub status: ResultStatus,
    pub summary: String,
    pub metadata: ResultMetadata,
}

impl CanonicalResult {
    pub fn success(task_type: impl Into<String>, data: serde_json::Value, summary: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            status: ResultStatus::Success,
            summary: summary.into(),
            metadata: ResultMetadata {
                timestamp: Utc::now(),
                task_type: task_type.into(),
                execution_type: None,
            },
        }
    }

    /// User-visible failure result: always this shape, `data: null`, per
    /// spec.md §7's "user-visible failure result" requirement.
    pub fn error(task_type: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            data: None,
            status: ResultStatus::Error,
            summary: summary.into(),
            metadata: ResultMetadata {
                timestamp: Utc::now(),
                task_type: task_type.into(),
                execution_type: None,
            },
        }
    }

    pub fn with_execution_type(mut self, execution_type: impl Into<String>) -> Self {
        self.metadata.execution_type = Some(execution_type.into());
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ResultStatus::Success)
    }
}

/// Raw output of one sandboxed execution attempt, prior to validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxOutcome {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub traceback: Option<String>,
}

/// One full attempt: the code that ran, what it produced, and whether the
/// business-level validation ultimately accepted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub code: String,
    pub outcome: SandboxOutcome,
    #[serde(with = "duration_millis")]
    pub execution_time: Duration,
    pub timestamp: DateTime<Utc>,
    /// Business-level success: true only if the process executed AND
    /// validation passed.
    pub success: bool,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u128(duration.as_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_result_always_has_null_data() {
        let result = CanonicalResult::error("data_fetch", "boom");
        assert!(result.data.is_none());
        assert_eq!(result.status, ResultStatus::Error);
    }

    #[test]
    fn success_result_round_trips_through_json() {
        let result = CanonicalResult::success("data_fetch", json!({"items": [1, 2, 3]}), "ok");
        let encoded = serde_json::to_string(&result).unwrap();
        let decoded: CanonicalResult = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.is_success());
        assert_eq!(decoded.metadata.task_type, "data_fetch");
    }
}
