//! Renders the Python driver preamble embedded in every sandboxed
//! execution, ported from `_prepare_execution_code`
//! (`original_source/.../runner.py`). The template carries named holes
//! (`__HOLE_NAME__`) rather than `format!`'s positional `{}` so the
//! generated code, which itself contains braces, Python format strings,
//! and arbitrary quoting, can never collide with the substitution
//! syntax — see spec.md §9's templating design note.

use crate::executor::config::SecurityConfig;

const TEMPLATE: &str = include_str!("templates/driver.py.tpl");

/// Typed parameters for one rendering of the driver template. Building
/// this from a [`SecurityConfig`] plus the candidate code keeps the
/// substitution exhaustive: adding a field here is a compile error
/// until [`render`] fills the matching hole.
pub struct DriverParams<'a> {
    pub security: &'a SecurityConfig,
    pub user_code: &'a str,
}

/// Python's `repr()` of a string, good enough for embedding arbitrary
/// generated source as a single-quoted or triple-quoted literal. Mirrors
/// CPython's `repr` for the common case (no embedded NUL, no exotic
/// unicode escaping rules beyond what `json`'s string escaping already
/// covers, since we can reuse the same escape set).
fn python_repr(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    out.push('\'');
    for ch in source.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Renders the full driver script for one execution.
pub fn render(params: DriverParams<'_>) -> String {
    let security = params.security;
    let memory_bytes = security.memory_limit_mb.saturating_mul(1024 * 1024);
    let max_file_bytes = security.max_file_size_mb.saturating_mul(1024 * 1024);

    TEMPLATE
        .replace("__MEMORY_LIMIT_BYTES__", &memory_bytes.to_string())
        .replace("__CPU_TIMEOUT__", &security.cpu_time_limit.to_string())
        .replace("__FD_LIMIT__", &security.file_descriptor_limit.to_string())
        .replace("__MAX_PROCESSES__", &security.max_processes.to_string())
        .replace("__MAX_FILE_SIZE_BYTES__", &max_file_bytes.to_string())
        .replace(
            "__DISABLE_NETWORK_VALIDATION__",
            python_bool(security.network.disable_network_validation),
        )
        .replace(
            "__BLOCK_NETWORK_MODULES__",
            python_bool(security.network.block_network_modules),
        )
        .replace("__USER_CODE_REPR__", &python_repr(params.user_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_every_hole() {
        let security = SecurityConfig::default();
        let rendered = render(DriverParams {
            security: &security,
            user_code: "def execute_task():\n    return {'ok': True}\n",
        });
        assert!(!rendered.contains("__MEMORY_LIMIT_BYTES__"));
        assert!(!rendered.contains("__CPU_TIMEOUT__"));
        assert!(!rendered.contains("__FD_LIMIT__"));
        assert!(!rendered.contains("__MAX_PROCESSES__"));
        assert!(!rendered.contains("__MAX_FILE_SIZE_BYTES__"));
        assert!(!rendered.contains("__DISABLE_NETWORK_VALIDATION__"));
        assert!(!rendered.contains("__BLOCK_NETWORK_MODULES__"));
        assert!(!rendered.contains("__USER_CODE_REPR__"));
        assert!(rendered.contains("__AIFORGE_RESULT__"));
    }

    #[test]
    fn user_code_with_braces_and_quotes_survives_repr_embedding() {
        let security = SecurityConfig::default();
        let tricky = "def execute_task():\n    s = f\"{1 + 1}\"\n    return {'s': s, 'q': \"it's\"}\n";
        let rendered = render(DriverParams {
            security: &security,
            user_code: tricky,
        });
        assert!(rendered.contains("it\\'s"));
    }

    #[test]
    fn python_repr_escapes_backslashes_and_newlines() {
        assert_eq!(python_repr("a\\b\nc"), "'a\\\\b\\nc'");
    }
}
