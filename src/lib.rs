//! # Codeforge
//!
//! An intent-adaptive code generation and execution engine: standardize
//! a natural-language instruction, look up cached parameterized Python
//! code, fall back to LLM-driven generation when nothing fits, run the
//! result in a sandboxed subprocess under resource and network limits,
//! validate it across a bounded number of retries with LLM feedback,
//! and cache whatever succeeds and parameterizes cleanly.
//!
//! ## Architecture
//!
//! - **[`instruction`]**: standardizes free-text instructions into a
//!   [`instruction::StandardizedInstruction`] — task type, action,
//!   target, required parameters, and expected output contract.
//! - **[`cache`]**: the on-disk code cache and the dynamic task-type
//!   registry that tracks LLM-invented task types beyond the built-ins.
//! - **[`mapper`]**: maps available parameters onto a cached or
//!   freshly generated module's declared call signature, and builds
//!   the invocation line appended to it before execution.
//! - **[`dataflow`]**: AST-level analysis of candidate code, feeding
//!   the cacheability gate that decides whether a successful execution
//!   is worth caching at all.
//! - **[`executor`]**: the sandbox runner — pre-spawn static gate,
//!   POSIX resource limits, restricted environment, and the typed
//!   driver template that captures the result back out of the child
//!   process.
//! - **[`validator`]**: three-tier validation of an execution's output
//!   against the standardized instruction's expected-output contract.
//! - **[`controller`]**: the multi-round retry loop, with rolling
//!   conversation history and compact structured error feedback, used
//!   when generation needs more than one attempt.
//! - **[`orchestrator`]**: the top-level entry point that ties all of
//!   the above together into a single `run(instruction)` call.
//! - **[`llm`]**: the provider-agnostic seam real LLM backends plug
//!   into; [`llm::EchoProvider`] is the scripted test double this
//!   crate's own tests use.
//! - **[`search`]**: the `search_web` seam consulted as the first tier
//!   of the search strategy.
//! - **[`config`]**: runtime configuration and its discovery hierarchy.
//! - **[`result`]**: the canonical result shape and the raw sandbox
//!   outcome it's built from.
//! - **[`env`]**: path constants and builders for the on-disk layout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codeforge::{Config, Orchestrator};
//! use codeforge::cache::{CodeCache, DynamicTaskTypeRegistry};
//! use codeforge::executor::SandboxRunner;
//! use codeforge::llm::EchoProvider;
//! use codeforge::mapper::ParameterMapper;
//! use codeforge::search::InMemorySearchProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let cache = CodeCache::load(&config.workdir, config.cache.code.max_modules_per_task_type).await?;
//!     let registry = DynamicTaskTypeRegistry::load(&config.workdir).await?;
//!
//!     let orchestrator = Orchestrator {
//!         cache,
//!         registry,
//!         mapper: Arc::new(ParameterMapper::new()),
//!         sandbox: Arc::new(SandboxRunner::new(&config.workdir, config.security.clone())),
//!         llm: Arc::new(EchoProvider::new()),
//!         search: Arc::new(InMemorySearchProvider::empty()),
//!         max_rounds: config.max_rounds,
//!         max_optimization_attempts: config.max_optimization_attempts,
//!         max_conversation_history: config.optimization.max_conversation_history,
//!     };
//!
//!     if let Some(result) = orchestrator.run("search for the latest rust release notes").await {
//!         println!("{}", result.summary);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod controller;
pub mod dataflow;
pub mod env;
pub mod executor;
pub mod instruction;
pub mod llm;
pub mod mapper;
pub mod orchestrator;
pub mod result;
pub mod search;
pub mod validator;

pub use config::{Config, ConfigDiscovery};
pub use instruction::StandardizedInstruction;
pub use orchestrator::Orchestrator;
pub use result::CanonicalResult;
