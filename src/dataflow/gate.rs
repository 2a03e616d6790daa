//! The cacheability gate: spec.md §4.5's four conditions, implemented as
//! a pure function over a [`DataFlowAnalysis`] plus the declared
//! required-parameter names and the instruction's action verb.

use crate::dataflow::analyzer::DataFlowAnalysis;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("entry point declares no parameters and none are required")]
    NoParameters,
}

#[derive(Debug, Clone)]
pub struct GateDecision {
    pub cacheable: bool,
    pub reasons: Vec<String>,
}

/// Functionality keywords expected in the body for each action-verb
/// class, per spec.md §4.5 condition 4. Checked against the raw source
/// the caller already has on hand (condition 4 is a coarse heuristic,
/// not a structural AST guarantee, matching the informal nature of the
/// original's action/keyword alignment check).
fn action_class_keywords(action: &str) -> Option<&'static [&'static str]> {
    match action {
        "fetch" | "search" | "get" | "crawl" => Some(&["requests", "http", "url", "api"]),
        "analyze" | "process" | "calculate" | "transform" => Some(&["for ", "if ", "while ", "sum(", "len("]),
        "generate" | "create" | "write" | "compose" => Some(&["f\"", "f'", "+ ", ".join(", "format("]),
        _ => None,
    }
}

/// Evaluates the four cacheability conditions from spec.md §4.5.
///
/// `required_parameters` is the standardized instruction's declared
/// parameter name list; `action` is its action verb, used for condition
/// 4's loose functionality/keyword alignment check against `source`.
pub fn gate_decision(analysis: &DataFlowAnalysis, required_parameters: &[String], action: &str) -> GateDecision {
    gate_decision_with_source(analysis, required_parameters, action, "")
}

/// Full evaluation including condition 4's source-level keyword check.
/// Split out from [`gate_decision`] so callers without source text (e.g.
/// the dataflow analyzer's own unit tests) can still exercise conditions
/// 1-3 without a meaningless always-pass condition 4.
pub fn gate_decision_with_source(
    analysis: &DataFlowAnalysis,
    required_parameters: &[String],
    action: &str,
    source: &str,
) -> GateDecision {
    let mut reasons = Vec::new();
    let mut cacheable = true;

    // Condition 1: declared params cover >= 60% of required_parameters.
    if required_parameters.is_empty() {
        reasons.push("no required parameters declared by the standardized instruction".to_string());
    } else {
        let covered = required_parameters
            .iter()
            .filter(|p| analysis.function_params.contains(*p))
            .count();
        let coverage = covered as f64 / required_parameters.len() as f64;
        if coverage < 0.6 {
            cacheable = false;
            reasons.push(format!(
                "parameter coverage {:.0}% is below the 60% threshold ({covered}/{})",
                coverage * 100.0,
                required_parameters.len()
            ));
        }
    }

    // Condition 2: no parameter conflicts.
    if analysis.has_parameter_conflicts() {
        cacheable = false;
        for conflict in &analysis.parameter_conflicts {
            reasons.push(format!(
                "parameter conflict: {} hardcodes values for declared parameter `{}`",
                conflict.kind, conflict.parameter
            ));
        }
    }

    // Condition 3: >= 50% of required parameters meaningfully used.
    if !required_parameters.is_empty() {
        let used = required_parameters
            .iter()
            .filter(|p| analysis.meaningful_uses.contains(*p))
            .count();
        let ratio = used as f64 / required_parameters.len() as f64;
        if ratio < 0.5 {
            cacheable = false;
            reasons.push(format!(
                "only {:.0}% of required parameters are meaningfully used ({used}/{})",
                ratio * 100.0,
                required_parameters.len()
            ));
        }
    }

    // Condition 4: action/body keyword alignment (best-effort).
    if !source.is_empty() {
        if let Some(keywords) = action_class_keywords(action) {
            let lower = source.to_lowercase();
            if !keywords.iter().any(|kw| lower.contains(kw)) {
                cacheable = false;
                reasons.push(format!(
                    "body shows no keyword typical of `{action}`-class actions ({:?})",
                    keywords
                ));
            }
        }
    }

    if reasons.is_empty() {
        reasons.push("all cacheability conditions satisfied".to_string());
    }

    GateDecision { cacheable, reasons }
}
