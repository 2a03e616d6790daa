//! Compresses a sandbox failure or validation rejection into a short,
//! structured hint for the next LLM attempt, so the retry prompt grows
//! by a fixed small amount per round instead of re-pasting full
//! tracebacks. Ported from `EnhancedErrorAnalyzer`
//! (`original_source/src/aiforge/core/enhanced_error_analyzer.py`).

use crate::validator::ValidationTier;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorAnalysis {
    pub error_type: String,
    pub error_message: String,
    pub line_number: Option<u32>,
    pub fix_suggestions: Vec<String>,
    pub severity: Severity,
    pub compressed_info: String,
}

struct ErrorPattern {
    regex: Regex,
    error_type: &'static str,
    root_cause: &'static str,
}

static ERROR_PATTERNS: Lazy<Vec<ErrorPattern>> = Lazy::new(|| {
    [
        (r"(NameError): (.+)", "name_error", "variable or function not defined"),
        (r"(TypeError): (.+)", "type_error", "type mismatch"),
        (r"(ValueError): (.+)", "value_error", "invalid value"),
        (r"(AttributeError): (.+)", "attribute_error", "attribute does not exist"),
        (r"(ImportError|ModuleNotFoundError): (.+)", "import_error", "import failed"),
        (r"(SyntaxError): (.+)", "syntax_error", "invalid syntax"),
        (r"(KeyError): (.+)", "key_error", "missing key"),
        (r"(IndexError): (.+)", "index_error", "index out of range"),
    ]
    .iter()
    .map(|(pattern, error_type, root_cause)| ErrorPattern {
        regex: Regex::new(pattern).expect("static pattern is valid"),
        error_type,
        root_cause,
    })
    .collect()
});

static LINE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"line (\d+)").expect("static pattern is valid"));
static NO_MODULE_NAMED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"No module named '([^']+)'"#).expect("static pattern is valid"));
static NOT_DEFINED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']+)' is not defined").expect("static pattern is valid"));

fn unavailable_module_hint(module: &str) -> Option<&'static str> {
    match module {
        "feedparser" => Some("`feedparser` is unavailable; parse RSS with `requests` + `xml.etree.ElementTree`"),
        "newspaper" => Some("`newspaper` is unavailable; scrape with `requests` + `BeautifulSoup`"),
        "scrapy" => Some("`scrapy` is unavailable; scrape with `requests` + `BeautifulSoup`"),
        _ => None,
    }
}

pub fn analyze_error(error_info: &str, traceback_info: &str) -> ErrorAnalysis {
    let mut error_type = "unknown".to_string();
    let mut error_message = String::new();
    let mut root_cause = String::new();

    for pattern in ERROR_PATTERNS.iter() {
        if let Some(captures) = pattern.regex.captures(error_info) {
            error_type = pattern.error_type.to_string();
            error_message = captures.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            root_cause = pattern.root_cause.to_string();
            break;
        }
    }

    let line_number = LINE_NUMBER
        .captures(traceback_info)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    let fix_suggestions = generate_fix_suggestions(&error_type, &error_message);
    let severity = determine_severity(&error_type);
    let compressed_info = compress_error_info(&error_type, line_number, &error_message, &fix_suggestions, &root_cause);

    ErrorAnalysis {
        error_type,
        error_message,
        line_number,
        fix_suggestions,
        severity,
        compressed_info,
    }
}

fn generate_fix_suggestions(error_type: &str, error_message: &str) -> Vec<String> {
    let mut suggestions = Vec::new();

    if error_type == "import_error" {
        if error_message.contains("No module named") {
            if let Some(module_name) = NO_MODULE_NAMED.captures(error_message).and_then(|c| c.get(1)) {
                let module_name = module_name.as_str();
                if let Some(hint) = unavailable_module_hint(module_name) {
                    suggestions.push(hint.to_string());
                } else {
                    suggestions.push(format!("module `{module_name}` is unavailable; use a standard-library equivalent"));
                    suggestions.push("double-check the module name spelling".to_string());
                }
            }
        }
    } else if error_type == "name_error" && error_message.contains("not defined") {
        if let Some(var_name) = NOT_DEFINED.captures(error_message).and_then(|c| c.get(1)) {
            suggestions.push(format!("check that `{}` is defined before use", var_name.as_str()));
            suggestions.push("ensure the variable is assigned before it's referenced".to_string());
        }
    }

    if suggestions.is_empty() {
        suggestions.push("review the error message and the surrounding code logic".to_string());
    }

    suggestions
}

fn determine_severity(error_type: &str) -> Severity {
    match error_type {
        "syntax_error" | "import_error" => Severity::High,
        "name_error" | "attribute_error" | "type_error" => Severity::Medium,
        "key_error" | "index_error" | "value_error" => Severity::Low,
        _ => Severity::Medium,
    }
}

fn compress_error_info(
    error_type: &str,
    line_number: Option<u32>,
    error_message: &str,
    fix_suggestions: &[String],
    _root_cause: &str,
) -> String {
    let mut parts = Vec::new();
    if error_type != "unknown" {
        parts.push(format!("type:{error_type}"));
    }
    if let Some(line) = line_number {
        parts.push(format!("line:{line}"));
    }
    if !error_message.is_empty() {
        let truncated = if error_message.len() > 50 {
            format!("{}...", &error_message[..50])
        } else {
            error_message.to_string()
        };
        parts.push(format!("message:{truncated}"));
    }
    if let Some(first) = fix_suggestions.first() {
        parts.push(format!("suggestion:{first}"));
    }
    parts.join(" | ")
}

/// Compact JSON feedback fed back to the LLM as the next round's user
/// message, per `generate_execution_feedback`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionFeedback {
    pub error_type: String,
    pub specific_error: String,
    pub suggestion: String,
    pub severity: &'static str,
}

pub fn generate_execution_feedback(error_info: &str, traceback_info: &str) -> ExecutionFeedback {
    let analysis = analyze_error(error_info, traceback_info);
    let mut suggestion = analysis.fix_suggestions.first().cloned().unwrap_or_else(|| "review code logic".to_string());

    if analysis.error_type == "import_error" && error_info.contains("No module named") {
        if let Some(module_name) = NO_MODULE_NAMED.captures(error_info).and_then(|c| c.get(1)) {
            let module = module_name.as_str();
            suggestion = unavailable_module_hint(module)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("module `{module}` is unavailable; use a standard-library equivalent"));
        }
    }

    ExecutionFeedback {
        error_type: analysis.error_type,
        specific_error: error_info.to_string(),
        suggestion,
        severity: analysis.severity.as_str(),
    }
}

/// Compact JSON feedback for a validation-tier rejection, per
/// `generate_validation_feedback`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationFeedback {
    pub validation_type: &'static str,
    pub specific_failure: String,
    pub suggestion: String,
    pub severity: &'static str,
    pub attempt_context: String,
}

pub fn generate_validation_feedback(failure_reason: &str, tier: ValidationTier, attempt_num: u32) -> ValidationFeedback {
    let lower = failure_reason.to_lowercase();
    let (mut suggestion, severity) = match tier {
        ValidationTier::LocalBasic => (
            if lower.contains("execution failed") {
                "check syntax and logic errors, make sure every variable is defined before use"
            } else if lower.contains("missing data field") || lower.contains("is empty") {
                "improve the data-fetching logic so it reliably produces data"
            } else {
                "check the code's basic logic to ensure it executes successfully and returns a result"
            }
            .to_string(),
            Severity::High,
        ),
        ValidationTier::LocalBusiness => {
            if lower.contains("missing required field") {
                (
                    "add the missing field named in the failure reason to the result".to_string(),
                    Severity::Medium,
                )
            } else if lower.contains("below the minimum") {
                (
                    "fetch more items, or broaden the search/query to reach the minimum count".to_string(),
                    Severity::Medium,
                )
            } else if lower.contains("must not be empty") {
                (
                    "make sure the named field contains real content, not null/empty".to_string(),
                    Severity::Medium,
                )
            } else {
                (
                    "review the business logic so the output matches the expected shape and content".to_string(),
                    Severity::Medium,
                )
            }
        }
        ValidationTier::AiDeep | ValidationTier::Complete => (
            "the result is well-formed but its content quality doesn't meet the bar; improve accuracy and completeness"
                .to_string(),
            Severity::Low,
        ),
    };

    if attempt_num >= 2 {
        suggestion.push_str(&format!(" (attempt {attempt_num} so far — double-check the data-fetching logic)"));
    }

    ValidationFeedback {
        validation_type: tier.as_str(),
        specific_failure: failure_reason.to_string(),
        suggestion,
        severity: severity.as_str(),
        attempt_context: format!("attempt {attempt_num}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzes_name_error_with_variable_name() {
        let analysis = analyze_error("NameError: name 'foo' is not defined", "  File \"x.py\", line 12, in <module>");
        assert_eq!(analysis.error_type, "name_error");
        assert_eq!(analysis.line_number, Some(12));
        assert!(analysis.fix_suggestions[0].contains("foo"));
    }

    #[test]
    fn import_error_for_known_unavailable_module_gets_specific_hint() {
        let feedback = generate_execution_feedback("ModuleNotFoundError: No module named 'feedparser'", "");
        assert_eq!(feedback.error_type, "import_error");
        assert!(feedback.suggestion.contains("feedparser"));
    }

    #[test]
    fn validation_feedback_mentions_attempt_count_after_second_try() {
        let feedback = generate_validation_feedback("missing required field: summary", ValidationTier::LocalBusiness, 3);
        assert!(feedback.suggestion.contains("attempt 3"));
    }

    #[test]
    fn severity_escalates_for_syntax_and_import_errors() {
        assert_eq!(determine_severity("syntax_error").as_str(), "high");
        assert_eq!(determine_severity("key_error").as_str(), "low");
    }
}
