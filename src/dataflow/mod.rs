//! # Dataflow Analyzer & Cacheability Gate
//!
//! Walks the AST of a candidate `execute_task` function to determine
//! which declared parameters are actually used meaningfully, and flags
//! conflicts where the generated code hardcodes a value instead of
//! parameterizing it. Ported from `DataFlowAnalyzer` in
//! `original_source/src/aiforge/core/data_flow_analyzer.py`. See
//! spec.md §4.5.
//!
//! [`gate`] implements the four-condition cacheability gate over the
//! analyzer's output plus the action-verb keyword tables shared with
//! [`crate::instruction::keywords`].

mod analyzer;
mod gate;

pub use analyzer::{AnalysisError, DataFlowAnalysis, ParameterConflict, analyze_function};
pub use gate::{GateDecision, GateError, gate_decision, gate_decision_with_source};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meaningful_use_and_gate_pass_for_well_parameterized_code() {
        let source = r#"
def execute_task(location, date):
    url = f"https://api.example.com/weather?location={location}&date={date}"
    response = requests.get(url)
    data = response.json()
    if data["status"] == "ok":
        return {"data": data, "status": "success", "summary": "ok"}
"#;
        let analysis = analyze_function(source, "execute_task").unwrap();
        assert!(analysis.meaningful_uses.contains("location"));
        assert!(analysis.meaningful_uses.contains("date"));
        assert!(!analysis.has_parameter_conflicts());

        let decision = gate_decision(&analysis, &["location".to_string(), "date".to_string()], "fetch");
        assert!(decision.cacheable, "{:?}", decision.reasons);
    }

    #[test]
    fn hardcoded_coordinates_conflict_blocks_the_gate() {
        let source = r#"
def execute_task(location):
    url = f"https://api.example.com/weather?latitude=31.23&longitude=121.47"
    response = requests.get(url)
    return {"data": response.json(), "status": "success", "summary": "ok"}
"#;
        let analysis = analyze_function(source, "execute_task").unwrap();
        assert!(analysis.has_parameter_conflicts());

        let decision = gate_decision(&analysis, &["location".to_string()], "fetch");
        assert!(!decision.cacheable);
    }
}
