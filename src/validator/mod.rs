//! # Result Validator
//!
//! Three-tier validation of a sandboxed execution's output against the
//! standardized instruction's expected-output contract, per spec.md
//! §4.6. Ported from `ResultValidator`
//! (`original_source/src/aiforge/validation/result_validator.py`).
//!
//! Tier 1 (basic) and tier 2 (business) are pure local checks. Tier 3
//! (AI-deep) only runs when `expected_output.business_logic_checks` is
//! non-empty, and on LLM failure or unparseable response it
//! *conservatively accepts* rather than silently rejecting — mirroring
//! `_ai_deep_validation`'s own exception handler, which does the same.

mod ai_deep;
mod basic;
mod business;

use crate::instruction::StandardizedInstruction;
use crate::llm::LLMProvider;
use crate::result::SandboxOutcome;

/// Which tier produced a validation outcome, surfaced for logging and
/// for the controller's error-feedback aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationTier {
    LocalBasic,
    LocalBusiness,
    AiDeep,
    Complete,
}

impl ValidationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationTier::LocalBasic => "local_basic",
            ValidationTier::LocalBusiness => "local_business",
            ValidationTier::AiDeep => "ai_deep",
            ValidationTier::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub reason: String,
    pub tier: ValidationTier,
}

/// Runs all three tiers in order, short-circuiting on the first failure.
/// `llm` is consulted only if tier 3 is actually needed; pass `None` to
/// skip it (the caller then gets a tier-3 rejection if needed, matching
/// `_ai_deep_validation`'s "llm_client is None" branch).
pub async fn validate_execution_result(
    outcome: &SandboxOutcome,
    instruction: &StandardizedInstruction,
    llm: Option<&dyn LLMProvider>,
) -> ValidationOutcome {
    if let Err(reason) = basic::local_basic_validation(outcome) {
        return ValidationOutcome {
            passed: false,
            reason: format!("local validation failed: {reason}"),
            tier: ValidationTier::LocalBasic,
        };
    }

    if let Err(reason) = business::local_business_validation(outcome, &instruction.expected_output) {
        return ValidationOutcome {
            passed: false,
            reason: format!("business logic validation failed: {reason}"),
            tier: ValidationTier::LocalBusiness,
        };
    }

    if ai_deep::needs_ai_validation(&instruction.expected_output) {
        match llm {
            Some(provider) => {
                let (ok, reason) = ai_deep::ai_deep_validation(outcome, instruction, provider).await;
                if !ok {
                    return ValidationOutcome {
                        passed: false,
                        reason: format!("AI validation failed: {reason}"),
                        tier: ValidationTier::AiDeep,
                    };
                }
            }
            None => {
                return ValidationOutcome {
                    passed: false,
                    reason: "AI validation failed: no LLM provider configured".to_string(),
                    tier: ValidationTier::AiDeep,
                };
            }
        }
    }

    ValidationOutcome {
        passed: true,
        reason: "validation passed".to_string(),
        tier: ValidationTier::Complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{AnalysisSource, ExecutionMode, ExpectedOutput, TaskType, ValidationRules};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn instruction_with(expected_output: ExpectedOutput) -> StandardizedInstruction {
        StandardizedInstruction {
            task_type: TaskType::DataFetch,
            action: "fetch".to_string(),
            target: "weather".to_string(),
            required_parameters: BTreeMap::new(),
            expected_output,
            execution_mode: ExecutionMode::CodeGeneration,
            confidence: 0.9,
            cache_key: "k".to_string(),
            source: AnalysisSource::LocalAnalysis,
        }
    }

    #[tokio::test]
    async fn passes_without_ai_validation_when_no_business_checks() {
        let outcome = SandboxOutcome {
            success: true,
            result: Some(json!({"status": "success", "summary": "ok", "data": {"results": [1, 2]}})),
            error: None,
            traceback: None,
        };
        let instruction = instruction_with(ExpectedOutput {
            validation_rules: ValidationRules {
                min_items: Some(1),
                ..Default::default()
            },
            ..Default::default()
        });
        let outcome = validate_execution_result(&outcome, &instruction, None).await;
        assert!(outcome.passed, "{}", outcome.reason);
        assert_eq!(outcome.tier, ValidationTier::Complete);
    }

    #[tokio::test]
    async fn fails_tier1_when_execution_did_not_succeed() {
        let outcome = SandboxOutcome {
            success: false,
            result: None,
            error: Some("boom".to_string()),
            traceback: None,
        };
        let instruction = instruction_with(ExpectedOutput::default());
        let outcome = validate_execution_result(&outcome, &instruction, None).await;
        assert!(!outcome.passed);
        assert_eq!(outcome.tier, ValidationTier::LocalBasic);
    }

    #[tokio::test]
    async fn fails_tier3_when_business_checks_present_but_no_llm() {
        let outcome = SandboxOutcome {
            success: true,
            result: Some(json!({"status": "success", "summary": "ok", "data": {"results": [1]}})),
            error: None,
            traceback: None,
        };
        let instruction = instruction_with(ExpectedOutput {
            business_logic_checks: vec!["data semantically matches the request".to_string()],
            ..Default::default()
        });
        let outcome = validate_execution_result(&outcome, &instruction, None).await;
        assert!(!outcome.passed);
        assert_eq!(outcome.tier, ValidationTier::AiDeep);
    }
}
