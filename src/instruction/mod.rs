//! # Instruction Analyzer
//!
//! Standardizes a free-text user instruction into a [`StandardizedInstruction`]:
//! task type, action, target, parameters, expected output shape, and a
//! cache key. Tries local heuristic analysis first ([`analyzer`]) since it's
//! free; falls back to an LLM call ([`llm_analysis`]) when local analysis
//! is absent or low-confidence, per spec.md §4.1.

pub mod analyzer;
pub mod keywords;
pub mod llm_analysis;
pub mod types;

pub use types::{
    AnalysisSource, ExecutionMode, ExpectedOutput, ParamType, RequiredParameter,
    StandardizedInstruction, TaskType, ValidationRules,
};

use crate::llm::{LLMProvider, LLMRequest};

/// Standardizes `instruction`, consulting `provider` only when local
/// analysis is missing or below the confidence threshold. `dynamic_count`
/// is the number of task types the caller's registry has already
/// registered dynamically, used to scale the LLM's guidance strength.
pub async fn standardize(
    instruction: &str,
    provider: &dyn LLMProvider,
    dynamic_count: usize,
) -> StandardizedInstruction {
    if let Some(local) = analyzer::local_analyze(instruction) {
        if !local.is_low_confidence() {
            return local;
        }
    }

    let builtin_types: Vec<&str> = TaskType::BUILTINS.iter().map(TaskType::as_str).collect();
    let prompt = llm_analysis::build_analysis_prompt(instruction, &builtin_types, dynamic_count);
    let request = LLMRequest::new(
        "You are an instruction standardization assistant for a code generation engine.",
        prompt,
    );

    match provider.generate(request).await {
        Ok(response) => llm_analysis::parse_llm_response(&response.content, instruction, &builtin_types),
        Err(_) => analyzer::local_analyze(instruction).unwrap_or_else(|| analyzer::default_analysis(instruction)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::EchoProvider;

    #[tokio::test]
    async fn high_confidence_local_match_skips_llm_call() {
        let provider = EchoProvider::with_scripted_responses(vec![
            "{\"task_type\": \"general\", \"action\": \"process\", \"target\": \"x\"}".to_string(),
        ]);
        let result = standardize("search for the latest rust news", &provider, 0).await;
        assert_eq!(result.task_type, TaskType::DataFetch);
        // The scripted response must still be queued: it was never consumed.
        let follow_up = standardize("search again", &provider, 0).await;
        assert_eq!(follow_up.task_type, TaskType::DataFetch);
    }

    #[tokio::test]
    async fn low_signal_instruction_falls_back_to_llm() {
        let provider = EchoProvider::with_scripted_responses(vec![
            "```json\n{\"task_type\": \"data_fetch\", \"action\": \"search\", \"target\": \"xyzzy\"}\n```"
                .to_string(),
        ]);
        let result = standardize("xyzzy plugh", &provider, 0).await;
        assert_eq!(result.task_type, TaskType::DataFetch);
        assert_eq!(result.source, AnalysisSource::AiAnalysis);
    }
}
