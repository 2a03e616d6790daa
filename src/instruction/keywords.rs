//! Built-in task-type keyword tables.
//!
//! Structurally ported from the keyword/exclusion/action/common-param
//! tables in the system this spec was distilled from: one entry per
//! built-in [`TaskType`], each carrying match keywords, an exclusion
//! list (to block false positives — e.g. "today's weather" must not
//! fall into `direct_response`), a preferred-action list, and the
//! common parameter names the extractor looks for.

use crate::instruction::types::TaskType;

pub struct TaskTypePattern {
    pub task_type: TaskType,
    pub keywords: &'static [&'static str],
    pub exclude_keywords: &'static [&'static str],
    pub actions: &'static [&'static str],
    pub common_params: &'static [&'static str],
}

pub fn builtin_patterns() -> Vec<TaskTypePattern> {
    vec![
        TaskTypePattern {
            task_type: TaskType::DataFetch,
            keywords: &[
                "search", "find", "fetch", "get", "retrieve", "crawl", "news", "api",
                "lookup", "information", "latest",
            ],
            exclude_keywords: &[],
            actions: &["search", "fetch", "get", "crawl"],
            common_params: &["query", "required_count", "url"],
        },
        TaskTypePattern {
            task_type: TaskType::DataProcess,
            keywords: &[
                "analyze", "process", "calculate", "compute", "statistics", "transform",
                "convert", "aggregate",
            ],
            exclude_keywords: &[],
            actions: &["analyze", "process", "calculate", "transform"],
            common_params: &["content", "required_count"],
        },
        TaskTypePattern {
            task_type: TaskType::FileOperation,
            keywords: &[
                "file", "read", "write", "save", "load", "export", "import", "batch",
            ],
            exclude_keywords: &[],
            actions: &["read", "write", "save", "process"],
            common_params: &["file_path", "content"],
        },
        TaskTypePattern {
            task_type: TaskType::Automation,
            keywords: &[
                "automate", "schedule", "monitor", "recurring", "watch", "trigger", "cron",
            ],
            exclude_keywords: &[],
            actions: &["automate", "schedule", "monitor", "execute"],
            common_params: &["required_count"],
        },
        TaskTypePattern {
            task_type: TaskType::ContentGeneration,
            keywords: &[
                "generate", "create", "write", "compose", "draft", "report", "document",
            ],
            exclude_keywords: &[],
            actions: &["generate", "create", "write", "compose"],
            common_params: &["content", "style", "required_count"],
        },
        TaskTypePattern {
            task_type: TaskType::DirectResponse,
            keywords: &[
                "what is", "how", "why", "explain", "describe", "define", "concept",
                "compare", "difference", "write a", "compose", "translate", "summarize",
                "interpret", "suggest", "recommend", "opinion", "advice",
            ],
            // Time-sensitive / live-data phrasing must never resolve to a
            // direct text answer — "today's weather" needs code, not prose.
            exclude_keywords: &[
                "today", "now", "latest", "current", "currently", "real-time", "realtime",
                "weather", "stock price", "news", "exchange rate", "price", "status",
            ],
            actions: &["respond", "answer", "create", "translate", "summarize", "suggest"],
            common_params: &["content", "style"],
        },
    ]
}

/// Action-inference keyword map: for each candidate action the pattern
/// allows, a short list of phrases that imply it.
pub fn action_keywords(action: &str) -> &'static [&'static str] {
    match action {
        "search" => &["search", "find", "look up", "look for"],
        "fetch" => &["fetch", "get", "retrieve", "pull"],
        "get" => &["get", "retrieve", "fetch"],
        "crawl" => &["crawl", "scrape"],
        "analyze" => &["analyze", "calculate", "compute", "statistics"],
        "process" => &["process", "transform", "convert"],
        "calculate" => &["calculate", "compute"],
        "transform" => &["transform", "convert"],
        "read" => &["read", "load", "open"],
        "write" => &["write", "save"],
        "save" => &["save", "write", "export"],
        "automate" => &["automate", "schedule"],
        "schedule" => &["schedule", "recurring", "cron"],
        "monitor" => &["monitor", "watch"],
        "execute" => &["execute", "run"],
        "generate" => &["generate", "create", "draft"],
        "create" => &["create", "generate", "make"],
        "compose" => &["compose", "write"],
        "respond" => &["respond", "explain", "describe"],
        "answer" => &["answer", "reply"],
        "translate" => &["translate", "convert to"],
        "summarize" => &["summarize", "summarise", "recap"],
        "suggest" => &["suggest", "recommend", "advise"],
        _ => &[],
    }
}

/// Output-format inference keyword map.
pub fn output_format_keywords(format: &str) -> &'static [&'static str] {
    match format {
        "json" => &["json", "dict", "dictionary"],
        "list" => &["list", "array"],
        "table" => &["table", "csv"],
        "text" => &["text", "string"],
        "markdown" => &["markdown", "md"],
        "file" => &["file"],
        "report" => &["report"],
        _ => &[],
    }
}
