//! # Multi-Round Task Controller
//!
//! Drives the outer/inner retry loop used when neither the code cache
//! nor a single-shot generation attempt produces a validated result.
//! Ported from the round/attempt loop in
//! `original_source/src/aiforge/core/managers/execution_manager.py` and
//! `original_source/src/aiforge/core/task_manager.py`, with feedback
//! compression from `core/enhanced_error_analyzer.py` and conversation
//! bookkeeping from `llm/conversation_manager.py`; see spec.md §4.8.
//!
//! Outer rounds (up to `max_rounds`) each start a fresh
//! [`conversation::ConversationManager`] window; inner attempts (up to
//! `max_optimization_attempts` per round) reuse that window, with the
//! first attempt sending the full task prompt and later attempts
//! sending a short "fix the code given this feedback" prompt plus the
//! accumulated history.

pub mod conversation;
pub mod error_feedback;

use crate::instruction::StandardizedInstruction;
use crate::llm::{HistoryMessage, LLMProvider, LLMRequest, MessageRole};
use crate::result::SandboxOutcome;
use crate::validator::{self, ValidationOutcome};
use conversation::{ConversationManager, MessageMetadata};
use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:python)?\s*\n(.*?)```").expect("static pattern is valid"));

/// Pulls the first fenced code block out of an LLM response, falling
/// back to the whole response when no fence is present (mirrors the
/// original's "assume the whole reply is code" fallback for terse
/// models that skip markdown fencing).
pub fn extract_code(response: &str) -> String {
    FENCED_CODE
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| response.trim().to_string())
}

/// One inner-loop attempt's outcome, returned for logging/telemetry by
/// the caller even when the round as a whole keeps retrying.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub round: u32,
    pub attempt: u32,
    pub code: String,
    pub sandbox_outcome: SandboxOutcome,
    pub validation: ValidationOutcome,
}

/// The controller's final verdict after exhausting rounds/attempts or
/// succeeding early.
pub enum ControllerOutcome {
    Success { code: String, outcome: SandboxOutcome },
    Exhausted { attempts: Vec<AttemptRecord> },
}

/// Executes and validates one candidate; injected so the controller
/// doesn't depend directly on [`crate::executor::SandboxRunner`],
/// keeping this module testable with a fake executor.
#[async_trait::async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn run(&self, code: &str) -> SandboxOutcome;
}

fn task_prompt(instruction: &StandardizedInstruction) -> String {
    format!(
        "Write a Python function `def execute_task(...):` that accomplishes this task.\n\n\
         Task type: {task_type}\nAction: {action}\nTarget: {target}\n\
         Parameters: {params}\n\n\
         The function must return a dict shaped like \
         {{\"data\": ..., \"status\": \"success\"|\"error\", \"summary\": \"...\"}}.\n\
         Respond with the function inside a single ```python code fence.",
        task_type = instruction.task_type.as_str(),
        action = instruction.action,
        target = instruction.target,
        params = instruction
            .required_parameters
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
    )
}

fn retry_prompt() -> &'static str {
    "The previous attempt did not pass validation. Fix the code based on the feedback above \
     and respond with the corrected function inside a single ```python code fence."
}

/// Runs the full outer/inner retry loop, per spec.md §4.8: each round
/// resets the conversation window; within a round, up to
/// `max_optimization_attempts` inner attempts reuse it, feeding back
/// structured execution/validation failures as compact JSON.
pub async fn run_multi_round(
    instruction: &StandardizedInstruction,
    llm: &dyn LLMProvider,
    executor: &dyn CodeExecutor,
    max_rounds: u32,
    max_optimization_attempts: u32,
    max_history: usize,
) -> ControllerOutcome {
    let mut attempts = Vec::new();

    for round in 1..=max_rounds {
        let mut conversation = ConversationManager::new(max_history);
        conversation.add_message(MessageRole::User, task_prompt(instruction), MessageMetadata::default());

        for attempt in 1..=max_optimization_attempts {
            let user_prompt = if attempt == 1 { task_prompt(instruction) } else { retry_prompt().to_string() };

            let request = LLMRequest::new(
                "You are a Python code generation assistant. Respond only with the requested function.",
                user_prompt,
            )
            .with_history(conversation.context_messages());

            let response = match llm.generate(request).await {
                Ok(response) => response,
                Err(_) => continue,
            };

            let code = extract_code(&response.content);
            conversation.add_message(MessageRole::Assistant, code.clone(), MessageMetadata::default());

            let sandbox_outcome = executor.run(&code).await;

            if !sandbox_outcome.success {
                let feedback = error_feedback::generate_execution_feedback(
                    sandbox_outcome.error.as_deref().unwrap_or("unknown error"),
                    sandbox_outcome.traceback.as_deref().unwrap_or(""),
                );
                let feedback_json = serde_json::to_string(&feedback).unwrap_or_default();
                conversation.add_message(
                    MessageRole::User,
                    feedback_json,
                    MessageMetadata {
                        is_error_feedback: true,
                        is_success: false,
                    },
                );
                attempts.push(AttemptRecord {
                    round,
                    attempt,
                    code,
                    sandbox_outcome,
                    validation: ValidationOutcome {
                        passed: false,
                        reason: "execution failed".to_string(),
                        tier: validator::ValidationTier::LocalBasic,
                    },
                });
                continue;
            }

            let validation = validator::validate_execution_result(&sandbox_outcome, instruction, Some(llm)).await;

            if validation.passed {
                return ControllerOutcome::Success {
                    code,
                    outcome: sandbox_outcome,
                };
            }

            let feedback = error_feedback::generate_validation_feedback(&validation.reason, validation.tier, attempt);
            let feedback_json = serde_json::to_string(&feedback).unwrap_or_default();
            conversation.add_message(
                MessageRole::User,
                feedback_json,
                MessageMetadata {
                    is_error_feedback: true,
                    is_success: false,
                },
            );

            attempts.push(AttemptRecord {
                round,
                attempt,
                code,
                sandbox_outcome,
                validation,
            });
        }
    }

    ControllerOutcome::Exhausted { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{AnalysisSource, ExecutionMode, ExpectedOutput, TaskType};
    use crate::llm::EchoProvider;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_instruction() -> StandardizedInstruction {
        StandardizedInstruction {
            task_type: TaskType::DataFetch,
            action: "fetch".to_string(),
            target: "weather".to_string(),
            required_parameters: BTreeMap::new(),
            expected_output: ExpectedOutput::default(),
            execution_mode: ExecutionMode::CodeGeneration,
            confidence: 0.9,
            cache_key: "k".to_string(),
            source: AnalysisSource::LocalAnalysis,
        }
    }

    struct ScriptedExecutor {
        outcomes: std::sync::Mutex<Vec<SandboxOutcome>>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CodeExecutor for ScriptedExecutor {
        async fn run(&self, _code: &str) -> SandboxOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                SandboxOutcome {
                    success: false,
                    result: None,
                    error: Some("exhausted".to_string()),
                    traceback: None,
                }
            } else {
                outcomes.remove(0)
            }
        }
    }

    #[test]
    fn extract_code_pulls_fenced_block() {
        let response = "here:\n```python\ndef execute_task():\n    return 1\n```\nthanks";
        assert_eq!(extract_code(response), "def execute_task():\n    return 1");
    }

    #[test]
    fn extract_code_falls_back_to_whole_response_without_fence() {
        let response = "def execute_task():\n    return 1";
        assert_eq!(extract_code(response), response);
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt_when_validation_passes() {
        let instruction = sample_instruction();
        let llm = EchoProvider::with_scripted_responses(vec!["```python\ndef execute_task():\n    return {}\n```".to_string()]);
        let executor = ScriptedExecutor {
            outcomes: std::sync::Mutex::new(vec![SandboxOutcome {
                success: true,
                result: Some(json!({"status": "success", "summary": "ok", "data": {"a": 1}})),
                error: None,
                traceback: None,
            }]),
            calls: AtomicUsize::new(0),
        };

        let outcome = run_multi_round(&instruction, &llm, &executor, 2, 2, 8).await;
        assert!(matches!(outcome, ControllerOutcome::Success { .. }));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_after_max_rounds_and_attempts_when_always_failing() {
        let instruction = sample_instruction();
        let llm = EchoProvider::new();
        let executor = ScriptedExecutor {
            outcomes: std::sync::Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        };

        let outcome = run_multi_round(&instruction, &llm, &executor, 2, 2, 8).await;
        assert!(matches!(outcome, ControllerOutcome::Exhausted { .. }));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 4);
    }
}
