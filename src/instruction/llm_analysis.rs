//! LLM-assisted instruction analysis: the fallback path taken when local
//! heuristic analysis in [`crate::instruction::analyzer`] finds no match
//! or returns low confidence.
//!
//! Ported from `_build_task_type_guidance` / `_assemble_prompt_with_guidance`
//! / `parse_standardized_instruction` / `is_ai_analysis_valid` in the
//! system this spec was distilled from. The guidance strength that tells
//! the model how strongly to prefer built-in task types over inventing a
//! new one scales with how many dynamic types have already been
//! registered, to keep the type space from sprawling.

use crate::instruction::analyzer::infer_output_format_for;
use crate::instruction::types::{
    AnalysisSource, ExecutionMode, ExpectedOutput, ParamType, RequiredParameter,
    StandardizedInstruction, TaskType, ValidationRules,
};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// How strongly the prompt should steer the model toward built-in task
/// types, derived from how many dynamic types are already registered.
pub enum GuidanceStrength {
    /// Fewer than 10 dynamic types registered: mention built-ins as a
    /// preference.
    Prefer,
    /// 10 or more: push back harder against inventing new types.
    StronglyRecommend,
}

impl GuidanceStrength {
    pub fn from_dynamic_count(dynamic_count: usize) -> Self {
        if dynamic_count > 10 {
            GuidanceStrength::StronglyRecommend
        } else {
            GuidanceStrength::Prefer
        }
    }

    fn phrase(&self) -> &'static str {
        match self {
            GuidanceStrength::Prefer => "Prefer",
            GuidanceStrength::StronglyRecommend => "Strongly prefer",
        }
    }
}

/// Builds the system-section guidance block telling the model which
/// task types are known and how strongly to reuse them.
pub fn build_task_type_guidance(builtin_types: &[&str], dynamic_count: usize) -> String {
    let strength = GuidanceStrength::from_dynamic_count(dynamic_count);
    let mut guidance = format!(
        "# Task type guidance\n{} one of these verified built-in task types:\n{}\n\n\
         Built-in types carry higher cache hit rates and better-tested execution paths.\n\
         Only introduce a new task_type when the request genuinely does not fit any of these.",
        strength.phrase(),
        builtin_types.join(", "),
    );
    if matches!(strength, GuidanceStrength::StronglyRecommend) {
        guidance.push_str(&format!(
            "\n\nNote: {dynamic_count} dynamic task types are already registered; \
             prefer a built-in type to keep the type space from sprawling further."
        ));
    }
    guidance
}

/// Builds the full analysis prompt sent as the user turn.
pub fn build_analysis_prompt(instruction: &str, builtin_types: &[&str], dynamic_count: usize) -> String {
    let guidance = build_task_type_guidance(builtin_types, dynamic_count);
    format!(
        "{guidance}\n\n\
         # Instruction to analyze\n{instruction}\n\n\
         Return a JSON object with fields: task_type, action, target, parameters \
         (map of name -> {{value, type, description}}), expected_output \
         (required_fields, validation_rules, failure_indicators, business_logic_checks), \
         execution_mode (\"code_generation\" or \"direct_ai_response\"), confidence (0-1). \
         If task_type is not one of the built-ins above, also include a `reasoning` field \
         of at least 20 characters explaining why no built-in type fits.\n\n\
         Respond with a single JSON object, optionally inside a ```json code fence."
    )
}

fn extract_json_object(response: &str) -> Option<Value> {
    static FENCE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").unwrap());
    if let Some(captures) = fence.captures(response) {
        if let Some(m) = captures.get(1) {
            if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
                return Some(value);
            }
        }
    }
    static BRACES: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let braces = BRACES.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap());
    if let Some(m) = braces.find(response) {
        if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
            return Some(value);
        }
    }
    None
}

/// Character-overlap similarity ratio in `[0, 1]`, used only for the
/// novelty check below (is a proposed new task type just a typo'd
/// built-in?). A lighter-weight cousin of the parameter mapper's
/// similarity scorer — this one only needs a cheap reject threshold,
/// not a ranked match.
fn crude_similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if longer.contains(shorter) {
        return shorter.len() as f32 / longer.len() as f32;
    }
    let shared = shorter.chars().filter(|c| longer.contains(*c)).count();
    shared as f32 / longer.len() as f32
}

fn is_too_similar_to_builtins(task_type: &str, builtin_types: &[&str]) -> bool {
    builtin_types
        .iter()
        .any(|existing| crude_similarity(&task_type.to_lowercase(), &existing.to_lowercase()) > 0.8)
}

/// Validates a parsed AI analysis object against the same rules as the
/// original's `is_ai_analysis_valid`: required fields present, task_type
/// non-empty, and — for a genuinely new type — a `reasoning` field of at
/// least 20 characters that isn't just a near-duplicate of a built-in
/// name.
pub fn is_ai_analysis_valid(value: &Value, builtin_types: &[&str]) -> bool {
    let Some(obj) = value.as_object() else { return false };
    for field in ["task_type", "action", "target"] {
        if !obj.contains_key(field) {
            return false;
        }
    }
    let Some(task_type) = obj.get("task_type").and_then(Value::as_str) else {
        return false;
    };
    if task_type.trim().is_empty() {
        return false;
    }
    if builtin_types.contains(&task_type) {
        return true;
    }
    let reasoning = obj.get("reasoning").and_then(Value::as_str).unwrap_or("");
    if reasoning.len() < 20 {
        return false;
    }
    !is_too_similar_to_builtins(task_type, builtin_types)
}

fn parse_param_type(s: Option<&str>) -> ParamType {
    match s {
        Some("int") => ParamType::Int,
        Some("float") => ParamType::Float,
        Some("bool") => ParamType::Bool,
        _ => ParamType::Str,
    }
}

fn parse_parameters(value: &Value) -> BTreeMap<String, RequiredParameter> {
    let mut out = BTreeMap::new();
    let Some(obj) = value.get("parameters").and_then(Value::as_object) else {
        return out;
    };
    for (name, param_value) in obj {
        let Some(param_obj) = param_value.as_object() else { continue };
        out.insert(
            name.clone(),
            RequiredParameter {
                value: param_obj.get("value").cloned(),
                param_type: parse_param_type(param_obj.get("type").and_then(Value::as_str)),
                description: param_obj
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                required: param_obj
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
        );
    }
    out
}

fn parse_expected_output(value: &Value) -> ExpectedOutput {
    let Some(obj) = value.get("expected_output").and_then(Value::as_object) else {
        return ExpectedOutput::default();
    };
    let str_list = |key: &str| -> Vec<String> {
        obj.get(key)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };
    let validation_rules = obj
        .get("validation_rules")
        .and_then(Value::as_object)
        .map(|rules| ValidationRules {
            min_items: rules.get("min_items").and_then(Value::as_u64).map(|n| n as usize),
            non_empty_fields: rules
                .get("non_empty_fields")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            status_field: rules
                .get("status_field")
                .and_then(Value::as_str)
                .map(str::to_string),
            success_indicators: rules
                .get("success_indicators")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
        })
        .unwrap_or_default();
    ExpectedOutput {
        required_fields: str_list("required_fields"),
        validation_rules,
        failure_indicators: str_list("failure_indicators"),
        business_logic_checks: str_list("business_logic_checks"),
    }
}

/// Parses a raw LLM response into a [`StandardizedInstruction`],
/// falling back to [`crate::instruction::analyzer::default_analysis`]
/// when nothing decodable is found or the decoded object fails
/// validation. Mirrors `parse_standardized_instruction` +
/// `is_ai_analysis_valid` chained together, since a response this crate
/// accepts must pass both.
pub fn parse_llm_response(response: &str, raw_instruction: &str, builtin_types: &[&str]) -> StandardizedInstruction {
    let Some(value) = extract_json_object(response) else {
        return crate::instruction::analyzer::default_analysis(raw_instruction);
    };
    if !is_ai_analysis_valid(&value, builtin_types) {
        return crate::instruction::analyzer::default_analysis(raw_instruction);
    }

    let task_type_str = value.get("task_type").and_then(Value::as_str).unwrap_or("general");
    let task_type = TaskType::from_str_or_dynamic(task_type_str);
    let action = value
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or("process")
        .to_string();
    let target = value
        .get("target")
        .and_then(Value::as_str)
        .unwrap_or(raw_instruction)
        .chars()
        .take(100)
        .collect();
    let parameters = parse_parameters(&value);
    let expected_output = parse_expected_output(&value);
    let execution_mode = match value.get("execution_mode").and_then(Value::as_str) {
        Some("direct_ai_response") => ExecutionMode::DirectAiResponse,
        _ => ExecutionMode::CodeGeneration,
    };
    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|f| f as f32)
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    let _ = infer_output_format_for(raw_instruction, &task_type);

    let cache_key = format!(
        "{}_{}",
        task_type.as_str(),
        crate::instruction::analyzer::local_analyze(raw_instruction)
            .map(|s| s.cache_key)
            .unwrap_or_else(|| raw_instruction.len().to_string())
    );

    StandardizedInstruction {
        task_type,
        action,
        target,
        required_parameters: parameters,
        expected_output,
        execution_mode,
        confidence,
        cache_key,
        source: AnalysisSource::AiAnalysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILTINS: &[&str] = &[
        "data_fetch",
        "data_process",
        "file_operation",
        "automation",
        "content_generation",
        "direct_response",
        "general",
    ];

    #[test]
    fn guidance_escalates_past_ten_dynamic_types() {
        assert!(matches!(
            GuidanceStrength::from_dynamic_count(3),
            GuidanceStrength::Prefer
        ));
        assert!(matches!(
            GuidanceStrength::from_dynamic_count(11),
            GuidanceStrength::StronglyRecommend
        ));
    }

    #[test]
    fn parses_fenced_json_response() {
        let response = "here you go:\n```json\n{\"task_type\": \"data_fetch\", \"action\": \"search\", \"target\": \"news\"}\n```";
        let parsed = parse_llm_response(response, "find me news", BUILTINS);
        assert_eq!(parsed.task_type, TaskType::DataFetch);
        assert_eq!(parsed.source, AnalysisSource::AiAnalysis);
    }

    #[test]
    fn parses_multiline_fenced_json_response() {
        let response = "here you go:\n```json\n{\n  \"task_type\": \"data_fetch\",\n  \"action\": \"search\",\n  \"target\": \"news\"\n}\n```\nlet me know if that helps.";
        let parsed = parse_llm_response(response, "find me news", BUILTINS);
        assert_eq!(parsed.task_type, TaskType::DataFetch);
        assert_eq!(parsed.source, AnalysisSource::AiAnalysis);
    }

    #[test]
    fn rejects_new_type_without_reasoning() {
        let value = serde_json::json!({"task_type": "stock_trading", "action": "trade", "target": "aapl"});
        assert!(!is_ai_analysis_valid(&value, BUILTINS));
    }

    #[test]
    fn accepts_new_type_with_sufficient_reasoning() {
        let value = serde_json::json!({
            "task_type": "stock_trading",
            "action": "trade",
            "target": "aapl",
            "reasoning": "no built-in type covers placing brokerage trade orders"
        });
        assert!(is_ai_analysis_valid(&value, BUILTINS));
    }

    #[test]
    fn unparseable_response_falls_back_to_default() {
        let parsed = parse_llm_response("not json at all", "do something", BUILTINS);
        assert_eq!(parsed.source, AnalysisSource::Default);
    }
}
