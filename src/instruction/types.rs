//! Data model for the standardized instruction, per spec.md §3.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The built-in task type enumeration, plus a dynamically-registered
/// escape hatch. `BTreeMap`/sorted ordering elsewhere in this module
/// keeps cache-key derivation deterministic regardless of type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    DataFetch,
    DataProcess,
    FileOperation,
    Automation,
    ContentGeneration,
    DirectResponse,
    General,
    /// A type registered at runtime by the LLM-assisted analyzer.
    Dynamic(String),
}

impl TaskType {
    pub const BUILTINS: &'static [TaskType] = &[
        TaskType::DataFetch,
        TaskType::DataProcess,
        TaskType::FileOperation,
        TaskType::Automation,
        TaskType::ContentGeneration,
        TaskType::DirectResponse,
        TaskType::General,
    ];

    pub fn is_builtin(&self) -> bool {
        !matches!(self, TaskType::Dynamic(_))
    }

    /// Stable string form used in cache keys, file names, and log lines.
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::DataFetch => "data_fetch",
            TaskType::DataProcess => "data_process",
            TaskType::FileOperation => "file_operation",
            TaskType::Automation => "automation",
            TaskType::ContentGeneration => "content_generation",
            TaskType::DirectResponse => "direct_response",
            TaskType::General => "general",
            TaskType::Dynamic(name) => name,
        }
    }

    pub fn from_str_or_dynamic(s: &str) -> Self {
        match s {
            "data_fetch" => TaskType::DataFetch,
            "data_process" => TaskType::DataProcess,
            "file_operation" => TaskType::FileOperation,
            "automation" => TaskType::Automation,
            "content_generation" => TaskType::ContentGeneration,
            "direct_response" => TaskType::DirectResponse,
            "general" => TaskType::General,
            other => TaskType::Dynamic(other.to_string()),
        }
    }
}

/// How the instruction should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    CodeGeneration,
    DirectAiResponse,
}

/// Where a standardized instruction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    LocalAnalysis,
    AiAnalysis,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Str,
    Int,
    Float,
    Bool,
}

/// A single extracted/declared parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredParameter {
    pub value: Option<serde_json::Value>,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

/// The declared output validation contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRules {
    pub min_items: Option<usize>,
    #[serde(default)]
    pub non_empty_fields: Vec<String>,
    pub status_field: Option<String>,
    #[serde(default)]
    pub success_indicators: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpectedOutput {
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub validation_rules: ValidationRules,
    #[serde(default)]
    pub failure_indicators: Vec<String>,
    #[serde(default)]
    pub business_logic_checks: Vec<String>,
}

impl ExpectedOutput {
    pub fn is_empty(&self) -> bool {
        self.required_fields.is_empty()
    }
}

/// The canonical record produced by instruction analysis. See spec.md §3
/// for the field-by-field contract and invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardizedInstruction {
    pub task_type: TaskType,
    pub action: String,
    pub target: String,
    pub required_parameters: BTreeMap<String, RequiredParameter>,
    pub expected_output: ExpectedOutput,
    pub execution_mode: ExecutionMode,
    pub confidence: f32,
    pub cache_key: String,
    pub source: AnalysisSource,
}

impl StandardizedInstruction {
    /// Invariant from spec.md §8: for confidence >= 0.6, required_fields
    /// must be non-empty.
    pub fn is_well_formed(&self) -> bool {
        if self.confidence >= 0.6 && self.expected_output.is_empty() {
            return false;
        }
        !self.cache_key.is_empty()
    }

    pub fn is_low_confidence(&self) -> bool {
        self.confidence < 0.6
    }

    pub fn is_search_like(&self) -> bool {
        matches!(self.task_type, TaskType::DataFetch)
            && (self.action == "search" || self.required_parameters.contains_key("query"))
    }
}
