//! # Execution Orchestrator
//!
//! The single entry point tying every other component together: given a
//! raw instruction it standardizes it, decides between a direct AI
//! response, the four-tier search strategy, or the general
//! cache/generate path, and falls back to the multi-round controller
//! when the cache has nothing usable. Ported from `AIForgeEngine`'s
//! top-level `process_task` dispatch
//! (`original_source/src/aiforge/core/engine.py`); see spec.md §4.7.

use crate::cache::{CachedArtifact, CodeCache, CodeModule, DynamicTaskTypeRegistry, ParameterSignature};
use crate::controller::{self, CodeExecutor};
use crate::dataflow;
use crate::executor::SandboxRunner;
use crate::instruction::{self, ExecutionMode, StandardizedInstruction};
use crate::llm::{LLMProvider, LLMRequest};
use crate::mapper::{invoke, ParameterMapper};
use crate::result::{CanonicalResult, SandboxOutcome};
use crate::search::SearchProvider;
use crate::validator;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which path ultimately produced a result, surfaced in
/// `metadata.execution_type` on the canonical result.
const EXECUTION_TYPE_DIRECT: &str = "direct_ai_response";
const EXECUTION_TYPE_SEARCH_BUILTIN: &str = "search_builtin";
const EXECUTION_TYPE_SEARCH_CACHED: &str = "search_cached_module";
const EXECUTION_TYPE_CACHE_HIT: &str = "cache_hit";
const EXECUTION_TYPE_GENERATED: &str = "freshly_generated";

/// Bundles the collaborators the orchestrator drives. Constructed once
/// per process and cloned cheaply (every field is already an `Arc` or
/// internally reference-counted handle).
#[derive(Clone)]
pub struct Orchestrator {
    pub cache: CodeCache,
    pub registry: DynamicTaskTypeRegistry,
    pub mapper: Arc<ParameterMapper>,
    pub sandbox: Arc<SandboxRunner>,
    pub llm: Arc<dyn LLMProvider>,
    pub search: Arc<dyn SearchProvider>,
    pub max_rounds: u32,
    pub max_optimization_attempts: u32,
    pub max_conversation_history: usize,
}

struct SandboxExecutorAdapter<'a> {
    sandbox: &'a SandboxRunner,
}

#[async_trait::async_trait]
impl CodeExecutor for SandboxExecutorAdapter<'_> {
    async fn run(&self, code: &str) -> SandboxOutcome {
        match self.sandbox.execute(code).await {
            Ok(execution) => execution.outcome,
            Err(err) => SandboxOutcome {
                success: false,
                result: None,
                error: Some(err.to_string()),
                traceback: None,
            },
        }
    }
}

impl Orchestrator {
    /// Runs one instruction end to end. Returns `None` for an empty or
    /// whitespace-only instruction, per spec.md §8's degenerate-input
    /// case; every other path returns a [`CanonicalResult`], success or
    /// error shaped.
    pub async fn run(&self, raw_instruction: &str) -> Option<CanonicalResult> {
        if raw_instruction.trim().is_empty() {
            return None;
        }

        let dynamic_count = self.registry.dynamic_type_count().await;
        let standardized = instruction::standardize(raw_instruction, self.llm.as_ref(), dynamic_count).await;
        let _ = self.registry.register(&standardized.task_type, &standardized.target).await;

        if standardized.confidence >= 0.6 && standardized.execution_mode == ExecutionMode::DirectAiResponse {
            return Some(self.direct_response(&standardized).await);
        }

        if standardized.is_search_like() {
            return Some(self.run_search_like(&standardized).await);
        }

        Some(self.run_general(&standardized).await)
    }

    async fn direct_response(&self, instruction: &StandardizedInstruction) -> CanonicalResult {
        let request = LLMRequest::new(
            "Answer the user's request directly and concisely.",
            instruction.target.clone(),
        );
        match self.llm.generate(request).await {
            Ok(response) => {
                CanonicalResult::success(instruction.task_type.as_str(), Value::String(response.content), "direct response")
                    .with_execution_type(EXECUTION_TYPE_DIRECT)
            }
            Err(err) => CanonicalResult::error(instruction.task_type.as_str(), format!("direct response failed: {err}"))
                .with_execution_type(EXECUTION_TYPE_DIRECT),
        }
    }

    /// The four-tier search strategy from spec.md §4.7: built-in
    /// `search_web`, then a cached search module, then template-guided
    /// generation, then free-form generation (the latter two both fall
    /// through to [`Self::run_general`]'s cache/generate/retry path).
    async fn run_search_like(&self, instruction: &StandardizedInstruction) -> CanonicalResult {
        let query = instruction
            .required_parameters
            .get("query")
            .and_then(|p| p.value.as_ref())
            .and_then(Value::as_str)
            .unwrap_or(&instruction.target);
        let max_results = instruction
            .required_parameters
            .get("max_results")
            .and_then(|p| p.value.as_ref())
            .and_then(Value::as_u64)
            .unwrap_or(10) as usize;

        if let Ok(hits) = self.search.search(query, max_results).await {
            if !hits.is_empty() {
                let data = serde_json::json!({ "results": hits });
                return CanonicalResult::success(instruction.task_type.as_str(), data, format!("{} results for {query}", hits.len()))
                    .with_execution_type(EXECUTION_TYPE_SEARCH_BUILTIN);
            }
        }

        let cache_hits = self.cache.lookup(&instruction.cache_key, instruction.task_type.as_str(), &instruction.action).await;
        if let Some((module, _strategy)) = cache_hits.into_iter().next() {
            if let Some(result) = self.try_cached_module(instruction, &module, EXECUTION_TYPE_SEARCH_CACHED).await {
                return result;
            }
        }

        self.run_general(instruction).await
    }

    /// Cache-lookup → parameter-mapper → sandbox path, falling back to
    /// the multi-round controller on a miss or an execution/validation
    /// failure.
    async fn run_general(&self, instruction: &StandardizedInstruction) -> CanonicalResult {
        let cache_hits = self.cache.lookup(&instruction.cache_key, instruction.task_type.as_str(), &instruction.action).await;
        for (module, _strategy) in cache_hits {
            if let Some(result) = self.try_cached_module(instruction, &module, EXECUTION_TYPE_CACHE_HIT).await {
                return result;
            }
        }

        self.generate_and_cache(instruction).await
    }

    /// Maps parameters onto a cached module's declared signature and
    /// tries each call-strategy candidate in order until one succeeds;
    /// records the outcome against the module's track record either way.
    async fn try_cached_module(
        &self,
        instruction: &StandardizedInstruction,
        module: &CodeModule,
        execution_type: &'static str,
    ) -> Option<CanonicalResult> {
        let CachedArtifact::Parameterized { entry_point, .. } = &module.artifact else {
            let CachedArtifact::DirectValue { value } = &module.artifact else {
                return None;
            };
            let _ = self.cache.update_stats(&module.module_id, true).await;
            return Some(
                CanonicalResult::success(instruction.task_type.as_str(), value.clone(), "cached direct value")
                    .with_execution_type(execution_type),
            );
        };

        let source = self.cache.load_source(&module.module_id).await.ok()?;
        let available_params = available_params_from(instruction);
        let mapped = self.mapper.map_parameters(&module.parameter_signature, &available_params, Some(instruction.task_type.as_str()));

        for script in invoke::build_invocation_scripts(&source, entry_point, &module.parameter_signature, &mapped) {
            let execution = self.sandbox.execute(&script).await.ok()?;
            if !execution.outcome.success {
                continue;
            }
            let validation = validator::validate_execution_result(&execution.outcome, instruction, Some(self.llm.as_ref())).await;
            if validation.passed {
                let _ = self.cache.update_stats(&module.module_id, true).await;
                return Some(
                    CanonicalResult::success(
                        instruction.task_type.as_str(),
                        execution.outcome.result.clone().unwrap_or(Value::Null),
                        "cached module executed successfully",
                    )
                    .with_execution_type(execution_type),
                );
            }
        }

        let _ = self.cache.update_stats(&module.module_id, false).await;
        None
    }

    /// No usable cached module: hands off to the multi-round controller
    /// to generate fresh code, then checks the cacheability gate before
    /// storing a success for next time.
    async fn generate_and_cache(&self, instruction: &StandardizedInstruction) -> CanonicalResult {
        let adapter = SandboxExecutorAdapter { sandbox: self.sandbox.as_ref() };
        let outcome = controller::run_multi_round(
            instruction,
            self.llm.as_ref(),
            &adapter,
            self.max_rounds,
            self.max_optimization_attempts,
            self.max_conversation_history,
        )
        .await;

        match outcome {
            controller::ControllerOutcome::Success { code, outcome } => {
                self.maybe_cache(instruction, &code).await;
                CanonicalResult::success(
                    instruction.task_type.as_str(),
                    outcome.result.unwrap_or(Value::Null),
                    "generated code executed successfully",
                )
                .with_execution_type(EXECUTION_TYPE_GENERATED)
            }
            controller::ControllerOutcome::Exhausted { attempts } => {
                let reason = attempts
                    .last()
                    .map(|a| a.validation.reason.clone())
                    .unwrap_or_else(|| "no attempt produced a result".to_string());
                CanonicalResult::error(instruction.task_type.as_str(), format!("exhausted retries: {reason}"))
                    .with_execution_type(EXECUTION_TYPE_GENERATED)
            }
        }
    }

    async fn maybe_cache(&self, instruction: &StandardizedInstruction, code: &str) {
        let Ok(analysis) = dataflow::analyze_function(code, "execute_task") else {
            return;
        };
        let required: Vec<String> = instruction.required_parameters.keys().cloned().collect();
        let decision = dataflow::gate_decision_with_source(&analysis, &required, &instruction.action, code);
        if !decision.cacheable {
            return;
        }

        let parameter_signature: Vec<ParameterSignature> = analysis
            .function_params
            .iter()
            .map(|name| ParameterSignature {
                name: name.clone(),
                param_type: "str".to_string(),
                required: required.contains(name),
            })
            .collect();

        let now = chrono::Utc::now();
        let module = CodeModule {
            module_id: uuid::Uuid::new_v4().to_string(),
            task_type: instruction.task_type.as_str().to_string(),
            action: instruction.action.clone(),
            cache_key: instruction.cache_key.clone(),
            parameter_signature,
            artifact: CachedArtifact::Parameterized {
                source: code.to_string(),
                entry_point: "execute_task".to_string(),
            },
            success_count: 1,
            failure_count: 0,
            created_at: now,
            last_used_at: now,
        };
        let _ = self.cache.store(module, code).await;
    }
}

fn available_params_from(instruction: &StandardizedInstruction) -> BTreeMap<String, Value> {
    instruction
        .required_parameters
        .iter()
        .filter_map(|(name, param)| param.value.clone().map(|value| (name.clone(), value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::config::SecurityConfig;
    use crate::instruction::{AnalysisSource, ExpectedOutput, TaskType};
    use crate::llm::EchoProvider;
    use crate::search::InMemorySearchProvider;

    async fn test_orchestrator(tmp: &std::path::Path) -> Orchestrator {
        let cache = CodeCache::load(tmp, 10).await.unwrap();
        let registry = DynamicTaskTypeRegistry::load(tmp).await.unwrap();
        Orchestrator {
            cache,
            registry,
            mapper: Arc::new(ParameterMapper::new()),
            sandbox: Arc::new(SandboxRunner::new(tmp, SecurityConfig::default())),
            llm: Arc::new(EchoProvider::new()),
            search: Arc::new(InMemorySearchProvider::empty()),
            max_rounds: 1,
            max_optimization_attempts: 1,
            max_conversation_history: 8,
        }
    }

    #[tokio::test]
    async fn empty_instruction_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(dir.path()).await;
        assert!(orchestrator.run("   ").await.is_none());
    }

    #[tokio::test]
    async fn search_like_instruction_with_hits_uses_builtin_search() {
        let dir = tempfile::tempdir().unwrap();
        let mut orchestrator = test_orchestrator(dir.path()).await;
        orchestrator.search = Arc::new(InMemorySearchProvider::new(vec![crate::search::SearchHit {
            title: "Rust 2.0 announced".to_string(),
            url: "https://example.com".to_string(),
            snippet: "...".to_string(),
        }]));

        let result = orchestrator.run("search for rust news").await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.metadata.execution_type.as_deref(), Some(EXECUTION_TYPE_SEARCH_BUILTIN));
    }

    #[tokio::test]
    async fn cached_direct_value_module_is_returned_without_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = test_orchestrator(dir.path()).await;
        let now = chrono::Utc::now();
        let module = CodeModule {
            module_id: "m1".to_string(),
            task_type: "general".to_string(),
            action: "process".to_string(),
            cache_key: "general_process_key".to_string(),
            parameter_signature: vec![],
            artifact: CachedArtifact::DirectValue {
                value: serde_json::json!({"answer": 42}),
            },
            success_count: 1,
            failure_count: 0,
            created_at: now,
            last_used_at: now,
        };
        orchestrator.cache.store(module, "").await.unwrap();

        let instruction = StandardizedInstruction {
            task_type: TaskType::General,
            action: "process".to_string(),
            target: "x".to_string(),
            required_parameters: BTreeMap::new(),
            expected_output: ExpectedOutput::default(),
            execution_mode: ExecutionMode::CodeGeneration,
            confidence: 0.9,
            cache_key: "general_process_key".to_string(),
            source: AnalysisSource::LocalAnalysis,
        };

        let result = orchestrator.run_general(&instruction).await;
        assert!(result.is_success());
        assert_eq!(result.metadata.execution_type.as_deref(), Some(EXECUTION_TYPE_CACHE_HIT));
    }
}
