//! Builds the Python call line appended to a cached or freshly generated
//! module's source, and the call-strategy fallback order from spec.md
//! §4.3: (a) keyword call with every mapped name, (b) keyword call with
//! only the subset matching the signature, (c) positional call in
//! signature order, (d) a bare no-argument call. Ported from
//! `ParameterMappingService`'s call-building helpers in the system this
//! spec was distilled from.

use crate::cache::ParameterSignature;
use serde_json::Value;
use std::collections::BTreeMap;

/// Renders a JSON value as a Python literal suitable for a keyword or
/// positional call argument. Strings become single-quoted Python
/// literals (escaped the same way the driver template's `python_repr`
/// escapes embedded source); everything else round-trips through
/// `serde_json`'s Python-compatible literal spellings (`true`/`false`/
/// `null` need translating — JSON's lowercase booleans and null aren't
/// valid Python).
fn python_literal(value: &Value) -> String {
    match value {
        Value::String(s) => python_repr(s),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Value::Null => "None".to_string(),
        Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn python_repr(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 2);
    out.push('\'');
    for ch in source.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// One way of calling `entry_point`, ordered from most to least
/// specific. The sandbox runner tries these in order and stops at the
/// first one that produces a successful execution.
pub fn call_candidates(entry_point: &str, signature: &[ParameterSignature], mapped: &BTreeMap<String, Value>) -> Vec<String> {
    let mut candidates = Vec::new();

    // (a) keyword call with every mapped name.
    if !mapped.is_empty() {
        let args = mapped
            .iter()
            .map(|(name, value)| format!("{name}={}", python_literal(value)))
            .collect::<Vec<_>>()
            .join(", ");
        candidates.push(format!("{entry_point}({args})"));
    }

    // (b) keyword call restricted to names the signature actually declares.
    let declared: Vec<&ParameterSignature> = signature.iter().filter(|p| mapped.contains_key(&p.name)).collect();
    if !declared.is_empty() && declared.len() != mapped.len() {
        let args = declared
            .iter()
            .map(|p| format!("{}={}", p.name, python_literal(&mapped[&p.name])))
            .collect::<Vec<_>>()
            .join(", ");
        candidates.push(format!("{entry_point}({args})"));
    }

    // (c) positional call, signature order, skipping unmapped trailing params.
    if !signature.is_empty() {
        let mut positional = Vec::new();
        let mut gap = false;
        for param in signature {
            match mapped.get(&param.name) {
                Some(value) if !gap => positional.push(python_literal(value)),
                _ => {
                    gap = true;
                }
            }
        }
        if !positional.is_empty() {
            candidates.push(format!("{entry_point}({})", positional.join(", ")));
        }
    }

    // (d) no-argument call, always available as the last resort.
    candidates.push(format!("{entry_point}()"));

    candidates
}

/// Appends a `result = <call>` line to `module_source` for each call
/// candidate, producing full scripts the sandbox runner can execute in
/// order until one succeeds.
pub fn build_invocation_scripts(module_source: &str, entry_point: &str, signature: &[ParameterSignature], mapped: &BTreeMap<String, Value>) -> Vec<String> {
    call_candidates(entry_point, signature, mapped)
        .into_iter()
        .map(|call| format!("{module_source}\n\nresult = {call}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signature(names: &[&str]) -> Vec<ParameterSignature> {
        names
            .iter()
            .map(|n| ParameterSignature {
                name: n.to_string(),
                param_type: "str".to_string(),
                required: true,
            })
            .collect()
    }

    #[test]
    fn full_keyword_call_is_the_first_candidate() {
        let mut mapped = BTreeMap::new();
        mapped.insert("location".to_string(), json!("Shanghai"));
        let candidates = call_candidates("execute_task", &signature(&["location"]), &mapped);
        assert_eq!(candidates[0], "execute_task(location='Shanghai')");
    }

    #[test]
    fn falls_back_to_no_arg_call_when_nothing_mapped() {
        let mapped = BTreeMap::new();
        let candidates = call_candidates("execute_task", &signature(&["location"]), &mapped);
        assert_eq!(candidates.last().unwrap(), "execute_task()");
    }

    #[test]
    fn positional_candidate_preserves_signature_order() {
        let mut mapped = BTreeMap::new();
        mapped.insert("b".to_string(), json!(2));
        mapped.insert("a".to_string(), json!(1));
        let candidates = call_candidates("f", &signature(&["a", "b"]), &mapped);
        assert!(candidates.contains(&"f(1, 2)".to_string()));
    }

    #[test]
    fn invocation_scripts_append_result_assignment() {
        let mapped = BTreeMap::new();
        let scripts = build_invocation_scripts("def execute_task():\n    return 1\n", "execute_task", &[], &mapped);
        assert!(scripts[0].ends_with("result = execute_task()\n"));
    }
}
