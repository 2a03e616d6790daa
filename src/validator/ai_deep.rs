//! Tier 3: AI-deep validation, consulted only when the instruction
//! declares `business_logic_checks`. Ported from `_ai_deep_validation` /
//! `_parse_ai_validation_response`; on LLM failure or an unparseable
//! response this *conservatively accepts* rather than rejecting,
//! matching the original's own exception handler.

use crate::instruction::{ExpectedOutput, StandardizedInstruction};
use crate::llm::{LLMProvider, LLMRequest};
use crate::result::SandboxOutcome;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

pub fn needs_ai_validation(expected: &ExpectedOutput) -> bool {
    !expected.business_logic_checks.is_empty()
}

#[derive(Debug, Deserialize)]
struct AiValidationResponse {
    #[serde(default)]
    validation_passed: bool,
    #[serde(default)]
    failure_reason: Option<String>,
}

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static pattern is valid"));

pub async fn ai_deep_validation(
    outcome: &SandboxOutcome,
    instruction: &StandardizedInstruction,
    llm: &dyn LLMProvider,
) -> (bool, String) {
    let prompt = build_validation_prompt(outcome, instruction);
    let request = LLMRequest::new(
        "You judge whether a task's execution result actually satisfies the task's goal.",
        prompt,
    );

    match llm.generate(request).await {
        Ok(response) => {
            let parsed = parse_ai_validation_response(&response.content);
            if parsed.validation_passed {
                (true, String::new())
            } else {
                (false, parsed.failure_reason.unwrap_or_else(|| "AI validation did not pass".to_string()))
            }
        }
        Err(err) => (true, format!("AI validation errored, conservatively accepting: {err}")),
    }
}

fn build_validation_prompt(outcome: &SandboxOutcome, instruction: &StandardizedInstruction) -> String {
    let checks = instruction.expected_output.business_logic_checks.join("\n- ");
    let result_json = serde_json::to_string_pretty(&outcome.result).unwrap_or_default();
    format!(
        "Task action: {action}\nTask target: {target}\nTask type: {task_type}\n\n\
         Business-logic checks to verify:\n- {checks}\n\n\
         Execution result:\n{result_json}\n\n\
         Respond with JSON: {{\"validation_passed\": true|false, \"confidence\": 0.0-1.0, \
         \"failure_reason\": \"...\", \"improvement_suggestions\": [...], \"core_issues\": [...]}}",
        action = instruction.action,
        target = instruction.target,
        task_type = instruction.task_type.as_str(),
    )
}

fn parse_ai_validation_response(response: &str) -> AiValidationResponse {
    JSON_OBJECT
        .find(response)
        .and_then(|m| serde_json::from_str::<AiValidationResponse>(m.as_str()).ok())
        .unwrap_or(AiValidationResponse {
            validation_passed: true,
            failure_reason: Some("response was not parseable JSON, conservatively accepting".to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_response_conservatively_passes() {
        let parsed = parse_ai_validation_response("not json at all");
        assert!(parsed.validation_passed);
    }

    #[test]
    fn well_formed_rejection_is_honored() {
        let parsed = parse_ai_validation_response(
            r#"here is my answer: {"validation_passed": false, "failure_reason": "missing core data"}"#,
        );
        assert!(!parsed.validation_passed);
        assert_eq!(parsed.failure_reason.as_deref(), Some("missing core data"));
    }
}
