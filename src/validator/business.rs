//! Tier 2: local business-logic validation against the standardized
//! instruction's declared `expected_output` contract. Ported from
//! `_local_business_validation`.

use crate::instruction::ExpectedOutput;
use crate::result::SandboxOutcome;
use serde_json::Value;

pub fn local_business_validation(outcome: &SandboxOutcome, expected: &ExpectedOutput) -> Result<(), String> {
    let result_content = outcome.result.as_ref();
    let object = result_content.and_then(Value::as_object);

    if let Some(object) = object {
        for field in &expected.required_fields {
            if !object.contains_key(field) {
                return Err(format!("missing required field: {field}"));
            }
        }

        for field in &expected.validation_rules.non_empty_fields {
            if let Some(value) = object.get(field) {
                if is_falsy(value) {
                    return Err(format!("field `{field}` must not be empty"));
                }
            }
        }
    }

    let min_items = expected.validation_rules.min_items.unwrap_or(1);
    if let Some(data) = object.and_then(|o| o.get("data")) {
        check_min_items(data, min_items)?;
    }

    if !expected.validation_rules.success_indicators.is_empty() {
        if let Some(object) = object {
            let has_indicator = expected
                .validation_rules
                .success_indicators
                .iter()
                .any(|indicator| success_indicator_satisfied(indicator, object));
            if !has_indicator {
                return Err("no success indicator was satisfied, or the data is empty".to_string());
            }
        }
    }

    Ok(())
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

fn check_min_items(data: &Value, min_items: usize) -> Result<(), String> {
    match data {
        Value::Object(object) => {
            if let Some(Value::Array(results)) = object.get("results") {
                if results.len() < min_items {
                    return Err(format!("result count {} is below the minimum of {min_items}", results.len()));
                }
            } else if let Some(Value::Array(content)) = object.get("content") {
                if content.len() < min_items {
                    return Err(format!("content count {} is below the minimum of {min_items}", content.len()));
                }
            } else if object.is_empty() {
                return Err(format!("data is empty, below the minimum of {min_items}"));
            }
            Ok(())
        }
        Value::Array(items) => {
            if items.len() < min_items {
                Err(format!("item count {} is below the minimum of {min_items}", items.len()))
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

/// Checks one declared success indicator against the result. Indicators
/// are free-text in the original (matched by Chinese substrings like
/// "data存在" / "results非空"); ported here as substring checks against
/// the English equivalents so the same two indicator families keep
/// working without carrying over non-English literals.
fn success_indicator_satisfied(indicator: &str, object: &serde_json::Map<String, Value>) -> bool {
    let indicator = indicator.to_lowercase();
    if indicator.contains("data") {
        if let Some(data) = object.get("data") {
            return !is_falsy(data);
        }
    }
    if indicator.contains("results") {
        if let Some(Value::Object(data)) = object.get("data") {
            if let Some(Value::Array(results)) = data.get("results") {
                return !results.is_empty();
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::ValidationRules;
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
    fn rejects_missing_required_field() {
        let outcome = outcome(json!({"data": {"results": [1]}}));
        let expected = ExpectedOutput {
            required_fields: vec!["summary".to_string()],
            ..Default::default()
        };
        assert!(local_business_validation(&outcome, &expected).is_err());
    }

    #[test]
    fn rejects_below_min_items() {
        let outcome = outcome(json!({"data": {"results": [1]}}));
        let expected = ExpectedOutput {
            validation_rules: ValidationRules {
                min_items: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(local_business_validation(&outcome, &expected).is_err());
    }

    #[test]
    fn accepts_when_all_rules_satisfied() {
        let outcome = outcome(json!({"summary": "ok", "data": {"results": [1, 2, 3]}}));
        let expected = ExpectedOutput {
            required_fields: vec!["summary".to_string()],
            validation_rules: ValidationRules {
                min_items: Some(2),
                non_empty_fields: vec!["summary".to_string()],
                success_indicators: vec!["results non-empty".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(local_business_validation(&outcome, &expected).is_ok());
    }
}
