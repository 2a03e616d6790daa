//! Local heuristic instruction analysis.
//!
//! Ported from the `local_analyze_instruction` family of methods in the
//! system this spec was distilled from: score each built-in task type by
//! keyword overlap (after exclusion filtering), take the best match,
//! derive a confidence from the match ratio, then infer action, target,
//! parameters, and cache key from the same instruction text. Falls back
//! to [`default_analysis`] when nothing scores above zero.

use crate::instruction::keywords::{action_keywords, builtin_patterns, output_format_keywords};
use crate::instruction::types::{
    AnalysisSource, ExecutionMode, ExpectedOutput, ParamType, RequiredParameter,
    StandardizedInstruction, TaskType, ValidationRules,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

struct ParamPattern {
    patterns: &'static [&'static str],
    param_type: ParamType,
    description: &'static str,
}

fn param_pattern(name: &str) -> Option<ParamPattern> {
    match name {
        "query" => Some(ParamPattern {
            patterns: &[r#"["']([^"']+)["']"#],
            param_type: ParamType::Str,
            description: "search query content",
        }),
        "required_count" => Some(ParamPattern {
            patterns: &[
                r"(\d+)\s*(?:items?|results?|articles?)",
                r"at least (\d+)",
                r"at most (\d+)",
                r"top (\d+)",
                r"first (\d+)",
            ],
            param_type: ParamType::Int,
            description: "maximum result count",
        }),
        "file_path" => Some(ParamPattern {
            patterns: &[r"([^\s]+\.[a-zA-Z]{1,8})"],
            param_type: ParamType::Str,
            description: "file path",
        }),
        "url" => Some(ParamPattern {
            patterns: &[r"(https?://[^\s]+)"],
            param_type: ParamType::Str,
            description: "URL address",
        }),
        "content" => Some(ParamPattern {
            patterns: &[r"content:\s*(.+?)(?:[.,]|$)"],
            param_type: ParamType::Str,
            description: "content to process",
        }),
        "style" => Some(ParamPattern {
            patterns: &[r"style:\s*(.+?)(?:[.,]|$)"],
            param_type: ParamType::Str,
            description: "output style",
        }),
        _ => None,
    }
}

static COMPILED_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    ["query", "required_count", "file_path", "url", "content", "style"]
        .iter()
        .filter_map(|name| {
            param_pattern(name).map(|p| {
                let regexes = p
                    .patterns
                    .iter()
                    .map(|pat| Regex::new(pat).expect("static param regex is valid"))
                    .collect();
                (*name, regexes)
            })
        })
        .collect()
});

fn extract_parameters(instruction: &str, common_params: &[&str]) -> BTreeMap<String, RequiredParameter> {
    let mut out = BTreeMap::new();
    for param_name in common_params {
        let Some(config) = param_pattern(param_name) else { continue };
        let Some((_, regexes)) = COMPILED_PATTERNS.iter().find(|(n, _)| n == param_name) else {
            continue;
        };
        for regex in regexes {
            let Some(captures) = regex.captures(instruction) else { continue };
            let Some(raw) = captures.get(1) else { continue };
            let text = raw.as_str().trim();
            let value = match config.param_type {
                ParamType::Int => match text.parse::<i64>() {
                    Ok(n) => serde_json::json!(n),
                    Err(_) => continue,
                },
                _ => serde_json::json!(text),
            };
            out.insert(
                param_name.to_string(),
                RequiredParameter {
                    value: Some(value),
                    param_type: config.param_type,
                    description: config.description.to_string(),
                    required: false,
                },
            );
            break;
        }
    }
    out
}

fn infer_action(instruction_lower: &str, possible_actions: &[&str]) -> String {
    for action in possible_actions {
        if action_keywords(action)
            .iter()
            .any(|kw| instruction_lower.contains(kw))
        {
            return action.to_string();
        }
    }
    possible_actions.first().unwrap_or(&"process").to_string()
}

fn infer_output_format(instruction_lower: &str, possible_formats: &[&str]) -> String {
    for format in possible_formats {
        if output_format_keywords(format)
            .iter()
            .any(|kw| instruction_lower.contains(kw))
        {
            return format.to_string();
        }
    }
    "json".to_string()
}

fn extract_target(instruction: &str) -> String {
    instruction.chars().take(100).collect()
}

/// Stable, deterministic replacement for the original's `hash(content) %
/// 100000`: Python's salted `hash()` is not reproducible across
/// processes, so this uses a fixed-seed hasher instead to keep cache
/// keys stable across runs.
fn stable_digest(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish() % 100_000
}

fn generate_cache_key(task_type: &str, instruction: &str, parameters: &BTreeMap<String, RequiredParameter>) -> String {
    let mut components = vec![task_type.to_string()];
    let mut param_values = Vec::new();
    for (name, param) in parameters {
        if let Some(value) = &param.value {
            let normalized = match value {
                serde_json::Value::String(s) => s.to_lowercase().trim().to_string(),
                other => other.to_string().to_lowercase(),
            };
            param_values.push(format!("{name}:{normalized}"));
        }
    }
    if !param_values.is_empty() {
        components.extend(param_values);
    } else {
        components.push(instruction.chars().take(50).collect());
    }
    let digest = stable_digest(&components.join("_"));
    format!("{task_type}_{digest}")
}

fn expected_output_for(task_type: &TaskType, parameters: &BTreeMap<String, RequiredParameter>) -> ExpectedOutput {
    let min_items = parameters
        .get("required_count")
        .and_then(|p| p.value.as_ref())
        .and_then(|v| v.as_i64())
        .map(|n| n as usize);

    match task_type {
        TaskType::DataFetch => ExpectedOutput {
            required_fields: vec!["results".to_string()],
            validation_rules: ValidationRules {
                min_items,
                ..Default::default()
            },
            failure_indicators: vec!["error".to_string(), "empty".to_string()],
            business_logic_checks: vec![],
        },
        TaskType::DataProcess => ExpectedOutput {
            required_fields: vec!["result".to_string()],
            ..Default::default()
        },
        TaskType::FileOperation => ExpectedOutput {
            required_fields: vec!["path".to_string()],
            ..Default::default()
        },
        TaskType::Automation => ExpectedOutput {
            required_fields: vec!["status".to_string()],
            validation_rules: ValidationRules {
                status_field: Some("status".to_string()),
                success_indicators: vec!["completed".to_string(), "ok".to_string()],
                ..Default::default()
            },
            ..Default::default()
        },
        TaskType::ContentGeneration => ExpectedOutput {
            required_fields: vec!["content".to_string()],
            ..Default::default()
        },
        TaskType::DirectResponse | TaskType::General | TaskType::Dynamic(_) => ExpectedOutput::default(),
    }
}

/// Runs the full local heuristic pipeline over `instruction`, returning
/// `None` when no built-in pattern scores above zero (the caller should
/// fall back to [`default_analysis`] or the LLM-assisted path).
pub fn local_analyze(instruction: &str) -> Option<StandardizedInstruction> {
    let lower = instruction.to_lowercase();
    let mut best: Option<(i32, &'static [&'static str], TaskType, &'static [&'static str], &'static [&'static str])> = None;

    for pattern in builtin_patterns() {
        if pattern
            .exclude_keywords
            .iter()
            .any(|kw| lower.contains(kw))
        {
            continue;
        }
        let score = pattern
            .keywords
            .iter()
            .filter(|kw| lower.contains(*kw))
            .count() as i32;
        if score == 0 {
            continue;
        }
        let better = match &best {
            Some((best_score, ..)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((
                score,
                pattern.keywords,
                pattern.task_type.clone(),
                pattern.actions,
                pattern.common_params,
            ));
        }
    }

    let (score, keywords, task_type, actions, common_params) = best?;
    let confidence = ((score as f32 / keywords.len() as f32) * 2.0).min(1.0);
    let parameters = extract_parameters(instruction, common_params);
    let action = infer_action(&lower, actions);
    let cache_key = generate_cache_key(task_type.as_str(), instruction, &parameters);

    Some(StandardizedInstruction {
        expected_output: expected_output_for(&task_type, &parameters),
        action,
        target: extract_target(instruction),
        required_parameters: parameters,
        execution_mode: if matches!(task_type, TaskType::DirectResponse) {
            ExecutionMode::DirectAiResponse
        } else {
            ExecutionMode::CodeGeneration
        },
        confidence,
        cache_key,
        source: AnalysisSource::LocalAnalysis,
        task_type,
    })
}

/// The fallback returned when local analysis finds no match at all —
/// always `general`/`process`, confidence 0.3, per the original's
/// `_get_default_analysis`.
pub fn default_analysis(instruction: &str) -> StandardizedInstruction {
    let cache_key = format!("general_{}", stable_digest(instruction));
    StandardizedInstruction {
        task_type: TaskType::General,
        action: "process".to_string(),
        target: extract_target(instruction),
        required_parameters: BTreeMap::new(),
        expected_output: ExpectedOutput::default(),
        execution_mode: ExecutionMode::CodeGeneration,
        confidence: 0.3,
        cache_key,
        source: AnalysisSource::Default,
    }
}

/// Infers the output format implied by an instruction among the task
/// type's candidate formats. Exposed separately from [`local_analyze`]
/// because the LLM-assisted path also needs it when filling gaps in a
/// parsed response.
pub fn infer_output_format_for(instruction: &str, task_type: &TaskType) -> String {
    let candidates: &[&str] = match task_type {
        TaskType::DataFetch => &["json", "list"],
        TaskType::DataProcess => &["json", "table", "report"],
        TaskType::FileOperation => &["file", "json", "text"],
        TaskType::Automation => &["status", "report"],
        TaskType::ContentGeneration => &["text", "markdown"],
        TaskType::DirectResponse => &["text", "markdown"],
        TaskType::General | TaskType::Dynamic(_) => &["json"],
    };
    infer_output_format(&instruction.to_lowercase(), candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn matches_data_fetch_on_search_keywords() {
        let result = local_analyze("search for the latest news about rust").unwrap();
        assert_eq!(result.task_type, TaskType::DataFetch);
        assert_eq!(result.action, "search");
    }

    #[test]
    fn weather_query_is_excluded_from_direct_response() {
        let result = local_analyze("what is today's weather in Shanghai").unwrap();
        assert_ne!(result.task_type, TaskType::DirectResponse);
    }

    #[test]
    fn explain_concept_is_direct_response() {
        let result = local_analyze("explain how photosynthesis works").unwrap();
        assert_eq!(result.task_type, TaskType::DirectResponse);
        assert_eq!(result.execution_mode, ExecutionMode::DirectAiResponse);
    }

    #[test]
    fn extracts_required_count_parameter() {
        let result = local_analyze("fetch at least 5 items about solar panels").unwrap();
        let count = result.required_parameters.get("required_count").unwrap();
        assert_eq!(count.value, Some(serde_json::json!(5)));
    }

    #[test]
    fn no_match_returns_none() {
        assert!(local_analyze("xyzzy plugh").is_none());
    }

    #[test]
    fn default_analysis_has_low_confidence_and_general_type() {
        let result = default_analysis("xyzzy plugh");
        assert_eq!(result.task_type, TaskType::General);
        assert!(result.is_low_confidence());
    }

    #[test]
    fn cache_key_is_stable_across_calls() {
        let a = local_analyze("search for rust news").unwrap();
        let b = local_analyze("search for rust news").unwrap();
        assert_eq!(a.cache_key, b.cache_key);
    }

    proptest! {
        /// spec.md §8: "analyzing the same instruction twice yields
        /// identical keys". `default_analysis` accepts any string (it's
        /// the fallback for input `local_analyze` can't classify), so
        /// it exercises the determinism invariant over arbitrary text
        /// without depending on a keyword match.
        #[test]
        fn default_analysis_cache_key_is_deterministic(instruction in ".{0,200}") {
            let a = default_analysis(&instruction);
            let b = default_analysis(&instruction);
            prop_assert_eq!(a.cache_key, b.cache_key);
        }
    }
}
