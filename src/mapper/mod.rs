//! # Parameter Mapper
//!
//! Maps the parameters extracted from a standardized instruction (plus
//! anything else available in context) onto the positional/keyword
//! parameters a cached module's `execute_task` actually declares.
//! Ported from `ParameterMappingService.map_parameters` in the system
//! this spec was distilled from: try an exact name match, then the
//! strategy chain in priority order, then a signature/system default.

pub mod invoke;
pub mod strategies;
pub mod similarity;

use crate::cache::ParameterSignature;
use serde_json::Value;
use std::collections::BTreeMap;
use strategies::MappingStrategy;

/// Maps `available_params` onto the parameters declared by
/// `call_signature`, trying in order: (a) exact name match, (b) the
/// registered strategy chain, (c) the call signature's own default
/// value, (d) the hardcoded system defaults in
/// [`strategies::system_default`].
pub struct ParameterMapper {
    strategies: Vec<Box<dyn MappingStrategy>>,
}

impl ParameterMapper {
    pub fn new() -> Self {
        Self {
            strategies: strategies::default_strategies(),
        }
    }

    pub fn map_parameters(
        &self,
        call_signature: &[ParameterSignature],
        available_params: &BTreeMap<String, Value>,
        task_type: Option<&str>,
    ) -> BTreeMap<String, Value> {
        let mut mapped = BTreeMap::new();

        // (a) exact match
        for param in call_signature {
            if let Some(value) = available_params.get(&param.name) {
                mapped.insert(param.name.clone(), value.clone());
            }
        }

        // (b) strategy chain, highest priority first
        for param in call_signature {
            if mapped.contains_key(&param.name) {
                continue;
            }
            for strategy in &self.strategies {
                if !strategy.can_handle(&param.name, task_type) {
                    continue;
                }
                if let Some(value) = strategy.map_parameter(&param.name, available_params) {
                    mapped.insert(param.name.clone(), value);
                    break;
                }
            }
        }

        // (c)/(d) defaults
        for param in call_signature {
            if mapped.contains_key(&param.name) {
                continue;
            }
            if let Some(value) = strategies::system_default(&param.name) {
                mapped.insert(param.name.clone(), value);
            }
        }

        mapped
    }
}

impl Default for ParameterMapper {
    fn default() -> Self {
        Self::new()
    }
}
