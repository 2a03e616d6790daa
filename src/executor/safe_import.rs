//! Pre-spawn static gate over generated code: rejects dangerous imports
//! and dangerous call patterns before the child process is ever
//! started, tightening spec.md §4.4's "AST walk inside the child" into
//! a pre-spawn check. Ported from the blacklist tables in
//! `build_smart_execution_environment` (`original_source/.../runner.py`).

use once_cell::sync::Lazy;
use regex::Regex;
use rustpython_parser::ast::{self, Stmt};
use rustpython_parser::{Parse, ast::Suite};
use thiserror::Error;

/// Modules that are never importable from generated code, regardless of
/// network policy.
const DANGEROUS_MODULES: &[&str] = &[
    "subprocess",
    "multiprocessing",
    "ctypes",
    "importlib.util",
    "runpy",
    "code",
    "codeop",
];

/// Added to the blacklist unless `disable_network_validation` is set.
const NETWORK_MODULES: &[&str] = &["socket", "telnetlib", "ftplib", "smtplib", "poplib", "imaplib"];

/// Added on top of [`NETWORK_MODULES`] when `block_network_modules` is set.
const BLOCKED_NETWORK_MODULES: &[&str] = &["requests", "urllib", "http.client"];

static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"os\.system\(",
        r"os\.exec\w*\(",
        r"os\.spawn\w*\(",
        r"os\.popen\(",
        r"subprocess\.",
        r"eval\(",
        r"exec\(",
        r"compile\(",
        r#"__import__\([^)]*["']subprocess["']"#,
        r#"getattr\([^)]*["']system["']"#,
        r"pickle\.loads?\(",
        r"shelve\.open\(",
        r"marshal\.loads?\(",
        // Destructive file operations, ported from the patterns in
        // `security/file_operation_safety_analyzer.py`.
        r"os\.remove\(",
        r"shutil\.rmtree\(",
        r"\.unlink\(",
        r"os\.rmdir\(",
        r"\.truncate\(",
        r"\.delete\(\)",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("static pattern is valid"))
    .collect()
});

#[derive(Debug, Error)]
pub enum SafeImportError {
    #[error("code does not parse as Python: {0}")]
    Parse(String),
}

/// A single rejection reason, naming the offending module or pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DangerousImport(String),
    DangerousPattern(String),
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::DangerousImport(m) => write!(f, "imports blacklisted module `{m}`"),
            Violation::DangerousPattern(p) => write!(f, "matches dangerous call pattern `{p}`"),
        }
    }
}

/// Options mirroring the `network` sub-block consulted by
/// `build_smart_execution_environment`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportPolicy {
    pub disable_network_validation: bool,
    pub block_network_modules: bool,
}

fn blacklist(policy: ImportPolicy) -> Vec<&'static str> {
    let mut modules: Vec<&'static str> = DANGEROUS_MODULES.to_vec();
    if !policy.disable_network_validation {
        modules.extend_from_slice(NETWORK_MODULES);
        if policy.block_network_modules {
            modules.extend_from_slice(BLOCKED_NETWORK_MODULES);
        }
    }
    modules
}

fn module_name(stmt: &Stmt) -> Vec<String> {
    match stmt {
        Stmt::Import(import) => import.names.iter().map(|alias| alias.name.to_string()).collect(),
        Stmt::ImportFrom(import_from) => import_from
            .module
            .as_ref()
            .map(|m| vec![m.to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn walk_for_imports(body: &[Stmt], blacklisted: &[&str], out: &mut Vec<Violation>) {
    for stmt in body {
        for module in module_name(stmt) {
            if blacklisted.iter().any(|d| module.contains(d)) {
                out.push(Violation::DangerousImport(module.clone()));
            }
        }
        // Recurse into compound statements so imports nested in
        // conditionals, loops, and function bodies are still caught.
        match stmt {
            Stmt::FunctionDef(s) => walk_for_imports(&s.body, blacklisted, out),
            Stmt::AsyncFunctionDef(s) => walk_for_imports(&s.body, blacklisted, out),
            Stmt::ClassDef(s) => walk_for_imports(&s.body, blacklisted, out),
            Stmt::If(s) => {
                walk_for_imports(&s.body, blacklisted, out);
                walk_for_imports(&s.orelse, blacklisted, out);
            }
            Stmt::For(s) => {
                walk_for_imports(&s.body, blacklisted, out);
                walk_for_imports(&s.orelse, blacklisted, out);
            }
            Stmt::While(s) => {
                walk_for_imports(&s.body, blacklisted, out);
                walk_for_imports(&s.orelse, blacklisted, out);
            }
            Stmt::With(s) => walk_for_imports(&s.body, blacklisted, out),
            Stmt::Try(s) => {
                walk_for_imports(&s.body, blacklisted, out);
                for handler in &s.handlers {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    walk_for_imports(&h.body, blacklisted, out);
                }
                walk_for_imports(&s.orelse, blacklisted, out);
                walk_for_imports(&s.finalbody, blacklisted, out);
            }
            _ => {}
        }
    }
}

/// Scans `source` for blacklisted imports (AST-based) and dangerous call
/// patterns (regex-based, defense-in-depth against constructs the
/// import scan can't see, e.g. `getattr(os, "system")`).
pub fn scan(source: &str, policy: ImportPolicy) -> Result<Vec<Violation>, SafeImportError> {
    let tree = Suite::parse(source, "<generated>").map_err(|e| SafeImportError::Parse(e.to_string()))?;

    let blacklisted = blacklist(policy);
    let mut violations = Vec::new();
    walk_for_imports(&tree, &blacklisted, &mut violations);

    for pattern in DANGEROUS_PATTERNS.iter() {
        if let Some(m) = pattern.find(source) {
            violations.push(Violation::DangerousPattern(m.as_str().to_string()));
        }
    }

    Ok(violations)
}

/// Convenience wrapper: `true` iff `source` passes the gate cleanly.
pub fn is_safe(source: &str, policy: ImportPolicy) -> Result<bool, SafeImportError> {
    Ok(scan(source, policy)?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_code_has_no_violations() {
        let source = "import requests\n\ndef execute_task(location):\n    return {\"data\": location}\n";
        let violations = scan(source, ImportPolicy::default()).unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn subprocess_import_is_flagged() {
        let source = "import subprocess\n\ndef execute_task():\n    subprocess.run(['ls'])\n";
        let violations = scan(source, ImportPolicy::default()).unwrap();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DangerousImport(m) if m == "subprocess")));
    }

    #[test]
    fn os_system_call_pattern_is_flagged_even_without_import_statement() {
        let source = "import os\n\ndef execute_task():\n    os.system('rm -rf /')\n";
        let violations = scan(source, ImportPolicy::default()).unwrap();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DangerousPattern(_))));
    }

    #[test]
    fn network_modules_allowed_when_validation_disabled() {
        let source = "import socket\n\ndef execute_task():\n    pass\n";
        let policy = ImportPolicy {
            disable_network_validation: true,
            block_network_modules: false,
        };
        let violations = scan(source, policy).unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn requests_blocked_only_when_block_network_modules_set() {
        let source = "import requests\n\ndef execute_task():\n    pass\n";
        let permissive = scan(source, ImportPolicy::default()).unwrap();
        assert!(permissive.is_empty());

        let strict = scan(
            source,
            ImportPolicy {
                disable_network_validation: false,
                block_network_modules: true,
            },
        )
        .unwrap();
        assert!(strict.iter().any(|v| matches!(v, Violation::DangerousImport(m) if m == "requests")));
    }

    #[test]
    fn rmtree_on_root_is_flagged() {
        let source = "import shutil\n\ndef execute_task():\n    shutil.rmtree('/')\n    return {\"status\": \"success\"}\n";
        let violations = scan(source, ImportPolicy::default()).unwrap();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DangerousPattern(p) if p.contains("rmtree"))));
    }

    #[test]
    fn nested_dangerous_import_inside_function_is_caught() {
        let source = "def execute_task():\n    import ctypes\n    return None\n";
        let violations = scan(source, ImportPolicy::default()).unwrap();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DangerousImport(m) if m == "ctypes")));
    }
}
