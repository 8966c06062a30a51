//! Response classification: detect an embedded structured command in free-form
//! model output and route it to the file-operation executor.

use super::file_ops::{FileAction, FileOperation, FileOperationExecutor};
use super::outcome::{Outcome, TextLabel};
use serde_json::{Map, Value};

/// Find the first outermost, well-formed JSON object in `text`.
///
/// Braces inside JSON strings are ignored while balancing. Balanced spans are
/// tried in order of their opening brace; one that does not parse is skipped.
pub fn find_json_object(text: &str) -> Option<Map<String, Value>> {
    let mut spans = balanced_spans(text.as_bytes());
    spans.sort_unstable_by_key(|&(start, _)| start);

    spans
        .into_iter()
        .find_map(|(start, end)| match serde_json::from_str::<Value>(&text[start..end]) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

/// Every brace-balanced `(start, end)` span, collected in a single pass.
///
/// Quotes only open a string inside a brace, so prose around the object
/// cannot swallow it.
fn balanced_spans(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    spans
}

/// Extract an actionable file operation from `raw`, if it carries one.
pub fn parse_command(raw: &str) -> Option<FileOperation> {
    let object = find_json_object(raw)?;
    let action = object
        .get("action")
        .and_then(Value::as_str)
        .and_then(FileAction::parse)?;

    let field = |name: &str| {
        object
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let language = match object.get("language") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };

    Some(FileOperation {
        action,
        filename: field("filename"),
        language,
        content: field("content"),
    })
}

/// Decides, once per reply, whether it is plain text or a file operation.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    executor: FileOperationExecutor,
}

impl ResponseClassifier {
    pub fn new(executor: FileOperationExecutor) -> Self {
        Self { executor }
    }

    /// Classify a plain agent reply.
    pub fn classify(&self, raw: &str) -> Outcome {
        self.classify_as(raw, TextLabel::AgentResponse)
    }

    /// Classify a reply, labelling the passthrough text with `label`.
    pub fn classify_as(&self, raw: &str, label: TextLabel) -> Outcome {
        self.route(raw, label).0
    }

    /// Classify a reply and also return the file operation it carried, if any.
    pub fn route(&self, raw: &str, label: TextLabel) -> (Outcome, Option<FileOperation>) {
        match parse_command(raw) {
            Some(op) => (self.executor.apply(&op), Some(op)),
            None => (Outcome::labeled(label, raw), None),
        }
    }
}
