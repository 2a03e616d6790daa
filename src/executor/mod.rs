//! # Sandbox Runner
//!
//! Executes a candidate (or cached) Python function body in an isolated
//! child process: a pre-spawn static gate rejects dangerous imports and
//! call patterns, POSIX resource limits cap memory/CPU/file descriptors/
//! processes/file size, the process environment is stripped to a
//! restricted allowlist plus a network-policy-dependent proxy override,
//! and the result crosses back over a single `__AIFORGE_RESULT__`-
//! prefixed JSON line on stdout. Ported from `SecureProcessRunner` and
//! `AIForgeRunner` (`original_source/src/aiforge/core/runner.py`); see
//! spec.md §4.4.
//!
//! ## Layout
//!
//! - [`config`]: `[security]` / `[security.network]` configuration.
//! - [`safe_import`]: pre-spawn AST + regex static gate.
//! - [`driver`]: typed template renderer for the embedded Python preamble.
//! - [`host`]: restricted environment + child process spawn.
//! - [`resources`]: POSIX `setrlimit` application via a `pre_exec` hook.

pub mod config;
pub mod driver;
pub mod host;
pub mod resources;
pub mod safe_import;

use crate::result::SandboxOutcome;
use config::SecurityConfig;
use safe_import::{ImportPolicy, Violation};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Coarse failure taxonomy surfaced to the multi-round controller so its
/// error-feedback compression (spec.md §4.8) can group recurring
/// failures by kind rather than by raw message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SyntaxError,
    Timeout,
    RuntimeError,
    ResourceLimit,
    NetworkBlocked,
    ParseError,
    RejectedBeforeSpawn,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SyntaxError => "syntax_error",
            FailureKind::Timeout => "timeout",
            FailureKind::RuntimeError => "runtime_error",
            FailureKind::ResourceLimit => "resource_limit",
            FailureKind::NetworkBlocked => "network_blocked",
            FailureKind::ParseError => "parse_error",
            FailureKind::RejectedBeforeSpawn => "rejected_before_spawn",
        }
    }

    /// Classifies a raw Python exception/error message the same way the
    /// controller's error feedback does: by substring sniffing, since
    /// the sandbox only returns a flat string, not a typed exception.
    fn classify(message: &str) -> FailureKind {
        let lower = message.to_lowercase();
        if lower.contains("syntaxerror") {
            FailureKind::SyntaxError
        } else if lower.contains("timeout") || lower.contains("timed out") {
            FailureKind::Timeout
        } else if lower.contains("memoryerror") || lower.contains("cannot allocate memory") || lower.contains("resource") {
            FailureKind::ResourceLimit
        } else if lower.contains("connection") || lower.contains("network") || lower.contains("proxy") {
            FailureKind::NetworkBlocked
        } else {
            FailureKind::RuntimeError
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("generated code was rejected before being spawned: {0:?}")]
    RejectedBeforeSpawn(Vec<Violation>),

    #[error("failed to parse generated code as Python: {0}")]
    Parse(String),

    #[error("sandbox produced no __AIFORGE_RESULT__ line (stdout: {stdout:?}, stderr: {stderr:?})")]
    MissingResultLine { stdout: String, stderr: String },

    #[error("sandbox result line was not valid JSON: {0}")]
    MalformedResultLine(#[from] serde_json::Error),

    #[error("io error spawning sandbox process: {0}")]
    Io(#[from] std::io::Error),
}

/// Executes generated code in an isolated child process under a given
/// [`SecurityConfig`].
pub struct SandboxRunner {
    workdir: PathBuf,
    temp_dir: PathBuf,
    security: SecurityConfig,
}

/// One completed execution attempt: the raw [`SandboxOutcome`], how long
/// it took end to end, and (on failure) the [`FailureKind`] classification.
#[derive(Debug, Clone)]
pub struct SandboxExecution {
    pub outcome: SandboxOutcome,
    pub duration: Duration,
    pub failure_kind: Option<FailureKind>,
}

impl SandboxRunner {
    pub fn new(workdir: impl Into<PathBuf>, security: SecurityConfig) -> Self {
        let workdir = workdir.into();
        let temp_dir = workdir.join("tmp");
        Self {
            workdir,
            temp_dir,
            security,
        }
    }

    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }

    /// Runs `code` to completion (or failure), enforcing the pre-spawn
    /// static gate, resource limits, and wall-clock timeout.
    pub async fn execute(&self, code: &str) -> Result<SandboxExecution, ExecutorError> {
        let start = Instant::now();

        let policy = ImportPolicy {
            disable_network_validation: self.security.network.disable_network_validation,
            block_network_modules: self.security.network.block_network_modules,
        };
        let violations = safe_import::scan(code, policy).map_err(|e| ExecutorError::Parse(e.to_string()))?;
        if !violations.is_empty() {
            warn!(?violations, "rejected generated code before spawning sandbox");
            return Ok(SandboxExecution {
                outcome: SandboxOutcome {
                    success: false,
                    result: None,
                    error: Some(format!("rejected before execution: {violations:?}")),
                    traceback: None,
                },
                duration: start.elapsed(),
                failure_kind: Some(FailureKind::RejectedBeforeSpawn),
            });
        }

        tokio::fs::create_dir_all(&self.workdir).await?;
        tokio::fs::create_dir_all(&self.temp_dir).await?;

        let script = driver::render(driver::DriverParams {
            security: &self.security,
            user_code: code,
        });

        let script_path = self.temp_dir.join(format!("driver_{}.py", uuid::Uuid::new_v4()));
        tokio::fs::write(&script_path, &script).await?;

        let env = host::restricted_env(&self.security, &self.workdir, &self.temp_dir);
        let spawn_result = host::spawn_driver(&script_path, &self.workdir, &self.security, &env).await;

        let _ = tokio::fs::remove_file(&script_path).await;

        let output = match spawn_result {
            Ok(output) => output,
            Err(io_err) if io_err.kind() == std::io::ErrorKind::TimedOut => {
                return Ok(SandboxExecution {
                    outcome: SandboxOutcome {
                        success: false,
                        result: None,
                        error: Some(io_err.to_string()),
                        traceback: None,
                    },
                    duration: start.elapsed(),
                    failure_kind: Some(FailureKind::Timeout),
                });
            }
            Err(io_err) => return Err(ExecutorError::Io(io_err)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let outcome = parse_result_line(&stdout, &stderr)?;
        let failure_kind = if outcome.success {
            None
        } else {
            Some(FailureKind::classify(outcome.error.as_deref().unwrap_or_default()))
        };

        debug!(success = outcome.success, elapsed = ?start.elapsed(), "sandbox execution finished");

        Ok(SandboxExecution {
            outcome,
            duration: start.elapsed(),
            failure_kind,
        })
    }
}

/// Finds the `__AIFORGE_RESULT__`-prefixed line and parses its JSON
/// payload, per `_parse_execution_result`'s line-scan-then-decode logic.
fn parse_result_line(stdout: &str, stderr: &str) -> Result<SandboxOutcome, ExecutorError> {
    const MARKER: &str = "__AIFORGE_RESULT__";
    for line in stdout.lines() {
        if let Some(payload) = line.strip_prefix(MARKER) {
            return Ok(serde_json::from_str(payload)?);
        }
    }
    Err(ExecutorError::MissingResultLine {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    })
}
