//! AST-based dataflow analysis over a single `execute_task`-shaped
//! function body, structurally modeled on
//! `DataFlowAnalyzer.visit_Assign` / `visit_Call` / `visit_JoinedStr` /
//! `visit_Compare` / `visit_Subscript` / `_trace_variable_usage` in
//! `original_source/src/aiforge/core/data_flow_analyzer.py`.

use once_cell::sync::Lazy;
use regex::Regex;
use rustpython_parser::Parse;
use rustpython_parser::ast::{self, Expr, Stmt};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("python syntax error: {0}")]
    Syntax(String),
    #[error("no function named `{0}` found")]
    FunctionNotFound(String),
}

#[derive(Debug, Clone)]
pub struct ParameterConflict {
    pub kind: &'static str,
    pub parameter: String,
    pub hardcoded_values: Vec<String>,
}

/// Output of walking one `execute_task` function body.
#[derive(Debug, Clone, Default)]
pub struct DataFlowAnalysis {
    pub function_params: BTreeSet<String>,
    /// `target -> source variable names` for each top-level assignment.
    pub assignments: BTreeMap<String, Vec<String>>,
    pub meaningful_uses: BTreeSet<String>,
    pub parameter_conflicts: Vec<ParameterConflict>,
}

impl DataFlowAnalysis {
    pub fn has_parameter_conflicts(&self) -> bool {
        !self.parameter_conflicts.is_empty()
    }

    /// Fraction of `function_params` that ended up meaningfully used.
    pub fn meaningful_use_ratio(&self) -> f64 {
        if self.function_params.is_empty() {
            return 1.0;
        }
        let used = self
            .function_params
            .iter()
            .filter(|p| self.meaningful_uses.contains(*p))
            .count();
        used as f64 / self.function_params.len() as f64
    }
}

static COORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"latitude=([0-9.\-]+)|longitude=([0-9.\-]+)").unwrap());
static API_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(api_key|apikey|token|secret)=[A-Za-z0-9_\-]{6,}").unwrap());

struct Walker {
    state: DataFlowAnalysis,
}

impl Walker {
    fn new(params: Vec<String>) -> Self {
        Self {
            state: DataFlowAnalysis {
                function_params: params.into_iter().collect(),
                ..Default::default()
            },
        }
    }

    fn visit_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign(assign) => {
                let source_vars = extract_variables(&assign.value);
                for target in &assign.targets {
                    if let Expr::Name(name) = target {
                        let target_name = name.id.to_string();
                        if source_vars.iter().any(|v| self.state.function_params.contains(v)) {
                            for var in &source_vars {
                                if self.state.function_params.contains(var) {
                                    self.mark_meaningful(var, &format!("assignment_to_{target_name}"));
                                }
                            }
                        }
                        self.state.assignments.insert(target_name, source_vars.clone());
                    }
                }
                self.visit_expr(&assign.value);
            }
            Stmt::Expr(expr_stmt) => self.visit_expr(&expr_stmt.value),
            Stmt::If(if_stmt) => {
                self.visit_expr(&if_stmt.test);
                self.visit_body(&if_stmt.body);
                self.visit_body(&if_stmt.orelse);
            }
            Stmt::For(for_stmt) => {
                self.visit_expr(&for_stmt.iter);
                self.visit_body(&for_stmt.body);
                self.visit_body(&for_stmt.orelse);
            }
            Stmt::While(while_stmt) => {
                self.visit_expr(&while_stmt.test);
                self.visit_body(&while_stmt.body);
                self.visit_body(&while_stmt.orelse);
            }
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.visit_expr(value);
                }
            }
            Stmt::With(with_stmt) => {
                for item in &with_stmt.items {
                    self.visit_expr(&item.context_expr);
                }
                self.visit_body(&with_stmt.body);
            }
            Stmt::Try(try_stmt) => {
                self.visit_body(&try_stmt.body);
                self.visit_body(&try_stmt.orelse);
                self.visit_body(&try_stmt.finalbody);
                for handler in &try_stmt.handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    self.visit_body(&handler.body);
                }
            }
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call(call) => {
                self.check_hardcoded_request_url(call);
                self.visit_expr(&call.func);
                for arg in &call.args {
                    self.visit_expr(arg);
                }
                for kw in &call.keywords {
                    self.visit_expr(&kw.value);
                }
            }
            Expr::JoinedStr(joined) => {
                for value in &joined.values {
                    if let Expr::FormattedValue(fv) = value {
                        let used = extract_variables(&fv.value);
                        for var in &used {
                            if self.state.function_params.contains(var) {
                                self.mark_meaningful(var, "f_string_formatting");
                            } else if self.state.assignments.contains_key(var) {
                                self.trace_variable(var, "f_string_formatting", &mut BTreeSet::new());
                            }
                        }
                        self.visit_expr(&fv.value);
                    }
                }
            }
            Expr::Compare(cmp) => {
                let mut nodes = vec![cmp.left.as_ref()];
                nodes.extend(cmp.comparators.iter());
                for node in nodes {
                    let used = extract_variables(node);
                    for var in &used {
                        if self.state.function_params.contains(var) {
                            self.mark_meaningful(var, "comparison_operation");
                        } else if self.state.assignments.contains_key(var) {
                            self.trace_variable(var, "comparison_operation", &mut BTreeSet::new());
                        }
                    }
                    self.visit_expr(node);
                }
            }
            Expr::Subscript(sub) => {
                let mut used = extract_variables(&sub.value);
                used.extend(extract_variables(&sub.slice));
                for var in &used {
                    if self.state.function_params.contains(var) {
                        self.mark_meaningful(var, "subscript_access");
                    } else if self.state.assignments.contains_key(var) {
                        self.trace_variable(var, "subscript_access", &mut BTreeSet::new());
                    }
                }
                self.visit_expr(&sub.value);
                self.visit_expr(&sub.slice);
            }
            Expr::BinOp(bin) => {
                self.visit_expr(&bin.left);
                self.visit_expr(&bin.right);
            }
            Expr::IfExp(if_exp) => {
                self.visit_expr(&if_exp.test);
                self.visit_expr(&if_exp.body);
                self.visit_expr(&if_exp.orelse);
            }
            Expr::Attribute(attr) => self.visit_expr(&attr.value),
            _ => {}
        }
    }

    /// Detects `requests.get(url)` calls with an f-string URL containing
    /// hardcoded `latitude=`/`longitude=` literals, and API-key-bearing
    /// URLs. Ported from `_analyze_url_for_hardcoded_values`.
    fn check_hardcoded_request_url(&mut self, call: &ast::ExprCall) {
        let Expr::Attribute(attr) = call.func.as_ref() else { return };
        let Expr::Name(base) = attr.value.as_ref() else { return };
        if base.id.as_str() != "requests" || attr.attr.as_str() != "get" {
            return;
        }
        let Some(Expr::JoinedStr(joined)) = call.args.first() else { return };

        let mut hardcoded_coords = Vec::new();
        let mut has_api_key = false;
        for value in &joined.values {
            if let Expr::Constant(constant) = value {
                if let Some(text) = constant_as_str(&constant.value) {
                    for m in COORD_PATTERN.captures_iter(&text) {
                        let matched = m.get(1).or_else(|| m.get(2));
                        if let Some(matched) = matched {
                            hardcoded_coords.push(matched.as_str().to_string());
                        }
                    }
                    if API_KEY_PATTERN.is_match(&text) {
                        has_api_key = true;
                    }
                }
            }
        }

        if !hardcoded_coords.is_empty() && self.state.function_params.contains("location") {
            self.state.parameter_conflicts.push(ParameterConflict {
                kind: "hardcoded_coordinates",
                parameter: "location".to_string(),
                hardcoded_values: hardcoded_coords,
            });
        }
        if has_api_key {
            self.state.parameter_conflicts.push(ParameterConflict {
                kind: "api_key_in_url",
                parameter: "api_key".to_string(),
                hardcoded_values: vec![],
            });
        }
    }

    fn mark_meaningful(&mut self, var: &str, _context: &str) {
        self.state.meaningful_uses.insert(var.to_string());
    }

    /// Traces an indirect use of `var` back through assignment chains to
    /// a function parameter, guarding against cycles with `visited`.
    fn trace_variable(&mut self, var: &str, context: &str, visited: &mut BTreeSet<String>) {
        if !visited.insert(var.to_string()) {
            return;
        }
        let Some(source_vars) = self.state.assignments.get(var).cloned() else { return };
        for source_var in source_vars {
            if self.state.function_params.contains(&source_var) {
                self.mark_meaningful(&source_var, &format!("indirect_via_{var}_in_{context}"));
            } else if self.state.assignments.contains_key(&source_var) && !visited.contains(&source_var) {
                self.trace_variable(&source_var, &format!("indirect_via_{var}_in_{context}"), visited);
            }
        }
    }
}

fn constant_as_str(constant: &ast::Constant) -> Option<String> {
    match constant {
        ast::Constant::Str(s) => Some(s.clone()),
        _ => None,
    }
}

/// Extracts every referenced variable name out of an expression subtree,
/// mirroring `_extract_variables_from_node`'s node-type dispatch.
fn extract_variables(expr: &Expr) -> Vec<String> {
    let mut out = Vec::new();
    collect_variables(expr, &mut out);
    out
}

fn collect_variables(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Name(name) => out.push(name.id.to_string()),
        Expr::Attribute(attr) => collect_variables(&attr.value, out),
        Expr::Call(call) => {
            for arg in &call.args {
                collect_variables(arg, out);
            }
            for kw in &call.keywords {
                collect_variables(&kw.value, out);
            }
        }
        Expr::BinOp(bin) => {
            collect_variables(&bin.left, out);
            collect_variables(&bin.right, out);
        }
        Expr::Compare(cmp) => {
            collect_variables(&cmp.left, out);
            for comp in &cmp.comparators {
                collect_variables(comp, out);
            }
        }
        Expr::IfExp(if_exp) => {
            collect_variables(&if_exp.test, out);
            collect_variables(&if_exp.body, out);
            collect_variables(&if_exp.orelse, out);
        }
        Expr::JoinedStr(joined) => {
            for value in &joined.values {
                if let Expr::FormattedValue(fv) = value {
                    collect_variables(&fv.value, out);
                }
            }
        }
        Expr::Subscript(sub) => {
            collect_variables(&sub.value, out);
            collect_variables(&sub.slice, out);
        }
        _ => {}
    }
}

fn function_params(args: &ast::Arguments) -> Vec<String> {
    args.args
        .iter()
        .chain(args.posonlyargs.iter())
        .chain(args.kwonlyargs.iter())
        .map(|arg| arg.def.arg.to_string())
        .collect()
}

fn find_function<'a>(body: &'a [Stmt], name: &str) -> Option<&'a ast::StmtFunctionDef> {
    body.iter().find_map(|stmt| match stmt {
        Stmt::FunctionDef(def) if def.name.as_str() == name => Some(def),
        _ => None,
    })
}

/// Parses `source`, locates the function named `entry_point`, and walks
/// its body per the visitor above.
pub fn analyze_function(source: &str, entry_point: &str) -> Result<DataFlowAnalysis, AnalysisError> {
    let suite = ast::Suite::parse(source, "<module>").map_err(|e| AnalysisError::Syntax(e.to_string()))?;
    let func = find_function(&suite, entry_point).ok_or_else(|| AnalysisError::FunctionNotFound(entry_point.to_string()))?;

    let mut walker = Walker::new(function_params(&func.args));
    walker.visit_body(&func.body);
    Ok(walker.state)
}
