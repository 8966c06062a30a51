//! Error types for task orchestration and stream sessions

use thiserror::Error;

/// Result type for orchestration operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Failures detected while resolving a task or driving a stream session.
///
/// Every variant except [`AgentError::SessionBusy`] is converted into an
/// [`Outcome::Error`](super::Outcome) at the orchestrator boundary.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Backend request failed: {message}")]
    Client { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    Filesystem { message: String },

    #[error("Path '{path}' escapes the workspace root")]
    Sandbox { path: String },

    #[error("Unknown task type '{kind}'")]
    UnknownTaskKind { kind: String },

    #[error("{message}")]
    Execution { message: String },

    #[error("A stream session is already active")]
    SessionBusy,

    #[error("Generation cancelled")]
    Cancelled,
}

impl AgentError {
    /// Create a client error from anything printable, keeping the full cause chain
    pub fn client<E: std::fmt::Display>(error: E) -> Self {
        Self::Client {
            message: format!("{:#}", error),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a filesystem error
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }

    /// Create a sandbox violation error
    pub fn sandbox<S: Into<String>>(path: S) -> Self {
        Self::Sandbox { path: path.into() }
    }

    /// Create an execution error
    pub fn execution<S: Into<String>>(message: S) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::filesystem(e.to_string())
    }
}
