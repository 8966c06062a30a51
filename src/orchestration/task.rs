//! Task descriptors and kind-specific prompt framing.

use super::outcome::{Outcome, TextLabel};
use serde::Serialize;
use std::fmt;

/// What a task asks the agent to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Process,
    Generate,
    Execute,
    Analyze,
    /// Unrecognized kind; resolves to an error without contacting the backend.
    Unknown(String),
}

impl TaskKind {
    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::Process => "process",
            TaskKind::Generate => "generate",
            TaskKind::Execute => "execute",
            TaskKind::Analyze => "analyze",
            TaskKind::Unknown(kind) => kind,
        }
    }

    /// Label used when a reply of this kind is passed through as text.
    pub fn text_label(&self) -> TextLabel {
        match self {
            TaskKind::Generate => TextLabel::GeneratedCode,
            TaskKind::Analyze => TextLabel::Analysis,
            _ => TextLabel::AgentResponse,
        }
    }

    /// Whether resolving this kind calls the generation backend.
    pub fn uses_backend(&self) -> bool {
        matches!(self, TaskKind::Process | TaskKind::Generate | TaskKind::Analyze)
    }

    /// Frame the user's prompt for this kind.
    pub fn frame(&self, prompt: &str) -> String {
        match self {
            TaskKind::Generate => format!(
                "Generate valid code for: {}\n\
                 Ensure the code is syntactically correct and wrap it in a fenced code block.",
                prompt
            ),
            TaskKind::Analyze => format!("Analyze and provide insights: {}", prompt),
            _ => format!("User: \"{}\"", prompt),
        }
    }
}

impl From<&str> for TaskKind {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "process" => TaskKind::Process,
            "generate" | "generate_code" => TaskKind::Generate,
            "execute" | "execute_code" => TaskKind::Execute,
            "analyze" => TaskKind::Analyze,
            _ => TaskKind::Unknown(value.to_string()),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub kind: TaskKind,
    pub prompt: String,
    /// Index into the result log whose text is used as context.
    pub depends_on: Option<usize>,
    /// Attached once, when the task is resolved.
    pub result: Option<Outcome>,
}

impl Task {
    pub fn new(kind: TaskKind, prompt: impl Into<String>, depends_on: Option<usize>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            depends_on,
            result: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }
}
