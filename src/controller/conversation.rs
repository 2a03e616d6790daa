//! Rolling conversation window fed to the LLM across retry attempts,
//! with error-pattern extraction so a recurring mistake gets called out
//! without re-pasting every past failure. Ported from
//! `ConversationManager` (`original_source/src/aiforge/llm/conversation_manager.py`).

use crate::llm::{HistoryMessage, MessageRole};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct MessageMetadata {
    pub is_error_feedback: bool,
    pub is_success: bool,
}

#[derive(Debug, Clone)]
struct Message {
    role: MessageRole,
    content: String,
    metadata: MessageMetadata,
}

static ERROR_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(NameError|TypeError|ValueError|AttributeError|ImportError|SyntaxError)").unwrap());
static LINE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"line (\d+)").unwrap());
static NOT_DEFINED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']+)' is not defined").unwrap());
static NO_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"module '([^']+)' has no attribute").unwrap());

/// Manages the bounded history of one multi-round execution, per
/// spec.md §4.8's "rolling conversation window (~8 messages)".
pub struct ConversationManager {
    max_history: usize,
    history: Vec<Message>,
    error_patterns: Vec<String>,
}

impl ConversationManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            history: Vec::new(),
            error_patterns: Vec::new(),
        }
    }

    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>, metadata: MessageMetadata) {
        let content = content.into();
        if matches!(role, MessageRole::User) && metadata.is_error_feedback {
            self.extract_error_patterns(&content);
        }
        self.history.push(Message { role, content, metadata });
        self.manage_history();
    }

    fn extract_error_patterns(&mut self, error_content: &str) {
        for pattern in [&*ERROR_CLASS, &*LINE_NUMBER, &*NOT_DEFINED, &*NO_ATTRIBUTE] {
            for captures in pattern.captures_iter(error_content) {
                if let Some(m) = captures.get(1) {
                    self.error_patterns.push(m.as_str().to_string());
                }
            }
        }
    }

    fn manage_history(&mut self) {
        if self.history.len() <= self.max_history {
            return;
        }

        let split_at = self.history.len().saturating_sub(4);
        let recent: Vec<Message> = self.history[split_at..].to_vec();
        let mut important: Vec<Message> = self.history[..split_at]
            .iter()
            .filter(|m| m.metadata.is_error_feedback || m.metadata.is_success || m.content.to_lowercase().contains("error"))
            .cloned()
            .collect();

        let important_budget = self.max_history.saturating_sub(4);
        if important.len() > important_budget {
            important = important.split_off(important.len() - important_budget);
        }

        important.extend(recent);
        self.history = important;
    }

    /// Builds the filtered context window handed to the next `generate`
    /// call: the last 3 messages (error feedback compressed, short user
    /// messages kept verbatim, everything else dropped), prefixed with
    /// an `avoid_errors` summary when recurring error patterns exist.
    pub fn context_messages(&self) -> Vec<HistoryMessage> {
        let mut context = Vec::new();
        let tail_start = self.history.len().saturating_sub(3);

        for message in &self.history[tail_start..] {
            if message.metadata.is_error_feedback {
                if let Some(filtered) = filter_error_feedback(&message.content) {
                    context.push(HistoryMessage {
                        role: message.role,
                        content: filtered,
                    });
                }
            } else if matches!(message.role, MessageRole::User) && message.content.len() < 50 {
                context.push(HistoryMessage {
                    role: message.role,
                    content: message.content.clone(),
                });
            }
        }

        if !self.error_patterns.is_empty() {
            let mut recent: Vec<&String> = self.error_patterns.iter().rev().take(3).collect();
            recent.dedup();
            if !recent.is_empty() {
                let joined = recent.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
                context.insert(
                    0,
                    HistoryMessage {
                        role: MessageRole::System,
                        content: format!("avoid_errors: {joined}"),
                    },
                );
            }
        }

        context
    }
}

/// Compresses a JSON error-feedback payload down to `{"type", "hint"}`,
/// truncating the suggestion to 30 characters. Returns `None` (dropped
/// from context) if the content isn't valid JSON, matching the
/// original's "parse failure → ignore" behavior.
fn filter_error_feedback(content: &str) -> Option<String> {
    let value: Value = serde_json::from_str(content).ok()?;
    let error_type = value.get("error_type").and_then(Value::as_str).unwrap_or("unknown");
    let hint: String = value
        .get("suggestion")
        .and_then(Value::as_str)
        .unwrap_or("")
        .chars()
        .take(30)
        .collect();
    serde_json::to_string(&serde_json::json!({"type": error_type, "hint": hint})).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_error_class_from_feedback_content() {
        let mut manager = ConversationManager::new(8);
        manager.add_message(
            MessageRole::User,
            "NameError: name 'foo' is not defined, line 10",
            MessageMetadata {
                is_error_feedback: true,
                is_success: false,
            },
        );
        assert!(manager.error_patterns.iter().any(|p| p == "NameError"));
    }

    #[test]
    fn history_trims_to_recent_and_important_messages() {
        let mut manager = ConversationManager::new(6);
        for i in 0..10 {
            manager.add_message(MessageRole::User, format!("message {i}"), MessageMetadata::default());
        }
        assert!(manager.history.len() <= 6);
    }

    #[test]
    fn context_messages_prefixes_avoid_errors_when_patterns_exist() {
        let mut manager = ConversationManager::new(8);
        manager.add_message(
            MessageRole::User,
            "TypeError: unsupported operand",
            MessageMetadata {
                is_error_feedback: true,
                is_success: false,
            },
        );
        let context = manager.context_messages();
        assert!(context.iter().any(|m| m.content.starts_with("avoid_errors:")));
    }

    #[test]
    fn filter_error_feedback_drops_non_json_content() {
        assert!(filter_error_feedback("not json").is_none());
    }
}
