//! Tier 1: local basic validation — did the process succeed, and is
//! there anything resembling data at all. Ported from
//! `_local_basic_validation`.

use crate::result::SandboxOutcome;
use serde_json::Value;

pub fn local_basic_validation(outcome: &SandboxOutcome) -> Result<(), String> {
    if !outcome.success {
        return Err(format!(
            "code execution failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        ));
    }

    let result_content = outcome
        .result
        .as_ref()
        .ok_or_else(|| "execution result is null".to_string())?;

    if let Some(object) = result_content.as_object() {
        if object.get("status").and_then(Value::as_str) != Some("success") {
            let summary = object.get("summary").and_then(Value::as_str).unwrap_or("unknown error");
            return Err(format!("result status is not success: {summary}"));
        }

        match object.get("data") {
            Some(Value::Null) | None => return Err("missing data field".to_string()),
            Some(data) => {
                if is_empty_collection(data) {
                    return Err("data field is empty, no usable data was produced".to_string());
                }
            }
        }
    }

    if is_empty_collection(result_content) {
        return Err("execution result is empty".to_string());
    }

    Ok(())
}

fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(result: Value) -> SandboxOutcome {
        SandboxOutcome {
            success: true,
            result: Some(result),
            error: None,
            traceback: None,
        }
    }

    #[test]
    fn rejects_unsuccessful_execution() {
        let outcome = SandboxOutcome {
            success: false,
            result: None,
            error: Some("boom".to_string()),
            traceback: None,
        };
        assert!(local_basic_validation(&outcome).is_err());
    }

    #[test]
    fn rejects_missing_data_field() {
        let outcome = outcome(json!({"status": "success", "summary": "ok"}));
        assert!(local_basic_validation(&outcome).is_err());
    }

    #[test]
    fn rejects_empty_data_array() {
        let outcome = outcome(json!({"status": "success", "summary": "ok", "data": []}));
        assert!(local_basic_validation(&outcome).is_err());
    }

    #[test]
    fn accepts_well_formed_result() {
        let outcome = outcome(json!({"status": "success", "summary": "ok", "data": {"results": [1, 2]}}));
        assert!(local_basic_validation(&outcome).is_ok());
    }
}
