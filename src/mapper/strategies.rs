//! Domain-specific parameter mapping strategies, ordered by priority.
//! Ported from `SearchParameterMappingStrategy` /
//! `FileOperationMappingStrategy` / `GeneralParameterMappingStrategy` in
//! the system this spec was distilled from.

use crate::mapper::similarity;
use serde_json::Value;
use std::collections::BTreeMap;

/// A strategy that may be able to supply a value for a target parameter
/// name, given the caller-supplied parameter pool and task context.
pub trait MappingStrategy: Send + Sync {
    fn can_handle(&self, param_name: &str, task_type: Option<&str>) -> bool;
    fn map_parameter(&self, param_name: &str, available: &BTreeMap<String, Value>) -> Option<Value>;
    fn priority(&self) -> i32;
}

fn lookup_first<'a>(available: &'a BTreeMap<String, Value>, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|c| available.get(*c))
}

/// Priority 100. Only engages for `task_type == "data_fetch"` when
/// context is known; permissive (always `can_handle`) when context is
/// absent, matching the original's `if context: ... else: return
/// param_name in search_params` fallback.
pub struct SearchMappingStrategy;

const SEARCH_PARAMS: &[&str] = &["search_query", "query", "max_results", "min_items"];

impl MappingStrategy for SearchMappingStrategy {
    fn can_handle(&self, param_name: &str, task_type: Option<&str>) -> bool {
        let in_set = SEARCH_PARAMS.contains(&param_name);
        match task_type {
            Some(t) => in_set && t == "data_fetch",
            None => in_set,
        }
    }

    fn map_parameter(&self, param_name: &str, available: &BTreeMap<String, Value>) -> Option<Value> {
        let candidates: &[&str] = match param_name {
            "search_query" => &["query", "keyword", "q"],
            "query" => &["search_query", "keyword"],
            "max_results" => &["limit", "max_count", "size"],
            "min_items" => &["quantity", "count", "min_count"],
            _ => &[],
        };
        lookup_first(available, candidates).cloned()
    }

    fn priority(&self) -> i32 {
        100
    }
}

/// Priority 90. Mirrors [`SearchMappingStrategy`] but for file paths.
pub struct FileOperationMappingStrategy;

const FILE_PARAMS: &[&str] = &["file_path", "path", "filename", "output_path"];

impl MappingStrategy for FileOperationMappingStrategy {
    fn can_handle(&self, param_name: &str, task_type: Option<&str>) -> bool {
        let in_set = FILE_PARAMS.contains(&param_name);
        match task_type {
            Some(t) => in_set && t == "file_operation",
            None => in_set,
        }
    }

    fn map_parameter(&self, param_name: &str, available: &BTreeMap<String, Value>) -> Option<Value> {
        let candidates: &[&str] = match param_name {
            "file_path" => &["path", "filename", "file"],
            "path" => &["file_path", "filename"],
            "output_path" => &["output", "target_path", "destination"],
            _ => &[],
        };
        lookup_first(available, candidates).cloned()
    }

    fn priority(&self) -> i32 {
        90
    }
}

/// Priority 10. Catch-all: always claims to handle every parameter, and
/// falls back to [`similarity::best_match`] over the whole available
/// pool.
pub struct GeneralMappingStrategy;

impl MappingStrategy for GeneralMappingStrategy {
    fn can_handle(&self, _param_name: &str, _task_type: Option<&str>) -> bool {
        true
    }

    fn map_parameter(&self, param_name: &str, available: &BTreeMap<String, Value>) -> Option<Value> {
        similarity::best_match(param_name, available.iter().map(|(k, v)| (k.as_str(), v))).cloned()
    }

    fn priority(&self) -> i32 {
        10
    }
}

/// The default strategy chain, already sorted by descending priority.
pub fn default_strategies() -> Vec<Box<dyn MappingStrategy>> {
    vec![
        Box::new(SearchMappingStrategy),
        Box::new(FileOperationMappingStrategy),
        Box::new(GeneralMappingStrategy),
    ]
}

/// System-wide fallback defaults used when nothing else maps the
/// parameter and the call signature supplies no default of its own.
pub fn system_default(param_name: &str) -> Option<Value> {
    match param_name {
        "max_results" => Some(Value::from(10)),
        "min_items" => Some(Value::from(1)),
        "timeout" => Some(Value::from(30)),
        "limit" => Some(Value::from(10)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn search_strategy_maps_query_to_search_query() {
        let strategy = SearchMappingStrategy;
        let available = params(&[("search_query", Value::from("rust news"))]);
        assert_eq!(
            strategy.map_parameter("query", &available),
            Some(Value::from("rust news"))
        );
    }

    #[test]
    fn search_strategy_maps_quantity_to_min_items_not_max_results() {
        let strategy = SearchMappingStrategy;
        let available = params(&[("quantity", Value::from(5))]);
        assert_eq!(strategy.map_parameter("min_items", &available), Some(Value::from(5)));
        assert_eq!(strategy.map_parameter("max_results", &available), None);
    }

    #[test]
    fn file_strategy_requires_file_operation_task_type_when_context_known() {
        let strategy = FileOperationMappingStrategy;
        assert!(!strategy.can_handle("file_path", Some("data_fetch")));
        assert!(strategy.can_handle("file_path", Some("file_operation")));
    }

    #[test]
    fn general_strategy_always_handles_and_falls_back_to_similarity() {
        let strategy = GeneralMappingStrategy;
        assert!(strategy.can_handle("anything", None));
        let available = params(&[("keywrd", Value::from("hi"))]);
        assert_eq!(strategy.map_parameter("keyword", &available), Some(Value::from("hi")));
    }
}
