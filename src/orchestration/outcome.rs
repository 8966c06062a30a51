//! Tagged task outcomes and the append-only result log.

use super::error::AgentError;
use super::file_ops::FileAction;
use serde::Serialize;
use std::fmt;

/// Display label attached to a plain-text outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLabel {
    AgentResponse,
    GeneratedCode,
    Analysis,
    ExecutionOutput,
    ExecutionError,
}

impl TextLabel {
    /// Literal prefix used when rendering.
    pub fn prefix(&self) -> &'static str {
        match self {
            TextLabel::AgentResponse => "**Agent Response**:",
            TextLabel::GeneratedCode => "**Generated Code**:",
            TextLabel::Analysis => "**Analysis**:",
            TextLabel::ExecutionOutput => "**Execution Output**:",
            TextLabel::ExecutionError => "**Execution Error**:",
        }
    }

    fn is_execution(&self) -> bool {
        matches!(self, TextLabel::ExecutionOutput | TextLabel::ExecutionError)
    }
}

/// Error family carried by [`Outcome::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Client,
    Validation,
    Filesystem,
    Sandbox,
    UnknownTaskKind,
    Execution,
    SessionBusy,
    Cancelled,
}

/// The result of resolving exactly one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Text {
        label: TextLabel,
        body: String,
    },
    FileOpSuccess {
        action: FileAction,
        filename: String,
        language: Option<String>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Outcome {
    /// Plain agent response.
    pub fn text(body: impl Into<String>) -> Self {
        Self::labeled(TextLabel::AgentResponse, body)
    }

    pub fn labeled(label: TextLabel, body: impl Into<String>) -> Self {
        Outcome::Text {
            label,
            body: body.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }

    /// Error message, if this is an error outcome.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Raw body of a text outcome.
    pub fn body(&self) -> Option<&str> {
        match self {
            Outcome::Text { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Render to the display string consumers classify by prefix.
    pub fn render(&self) -> String {
        match self {
            Outcome::Text { label, body } if label.is_execution() => {
                format!("{}\n```\n{}\n```", label.prefix(), body.trim_end())
            }
            Outcome::Text { label, body } => format!("{}\n{}", label.prefix(), body),
            Outcome::FileOpSuccess {
                action,
                filename,
                language,
            } => {
                let mut rendered = format!(
                    "**Success**: executed `{}` on `{}`.",
                    action.as_str(),
                    filename
                );
                if let Some(language) = language.as_deref().filter(|l| !l.is_empty()) {
                    rendered.push_str("\nCode language: ");
                    rendered.push_str(language);
                }
                rendered
            }
            Outcome::Error { kind, message } => match kind {
                ErrorKind::Filesystem | ErrorKind::Sandbox => {
                    format!("**File Operation Error**: {}", message)
                }
                _ => format!("**Error**: {}", message),
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<AgentError> for Outcome {
    fn from(err: AgentError) -> Self {
        let kind = match &err {
            AgentError::Client { .. } => ErrorKind::Client,
            AgentError::Validation { .. } => ErrorKind::Validation,
            AgentError::Filesystem { .. } => ErrorKind::Filesystem,
            AgentError::Sandbox { .. } => ErrorKind::Sandbox,
            AgentError::UnknownTaskKind { .. } => ErrorKind::UnknownTaskKind,
            AgentError::Execution { .. } => ErrorKind::Execution,
            AgentError::SessionBusy => ErrorKind::SessionBusy,
            AgentError::Cancelled => ErrorKind::Cancelled,
        };
        Outcome::Error {
            kind,
            message: err.to_string(),
        }
    }
}

/// Ordered record of every resolved outcome.
///
/// Entries are only ever appended; positions are stable and are what
/// dependency indices refer to.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    entries: Vec<Outcome>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome and return its index.
    pub fn push(&mut self, outcome: Outcome) -> usize {
        self.entries.push(outcome);
        self.entries.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Outcome> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Outcome> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.entries.iter()
    }
}
