//! Error types for CLI operations

use crate::orchestration::AgentError;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur during CLI command execution
#[derive(Error, Debug)]
pub enum CliError {
    /// Error executing a command or operation
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generation backend error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid argument or input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::ExecutionError(format!("{:#}", err))
    }
}

impl From<AgentError> for CliError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Client { message } => CliError::ProviderError(message),
            other => CliError::ExecutionError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_conversion() {
        let err: CliError = AgentError::client("connection refused").into();
        assert_eq!(err.to_string(), "Provider error: connection refused");

        let err: CliError = AgentError::SessionBusy.into();
        assert_eq!(
            err.to_string(),
            "Execution error: A stream session is already active"
        );
    }

    #[test]
    fn test_anyhow_conversion_keeps_context() {
        let err: CliError = anyhow::anyhow!("refused").context("listing models").into();
        assert_eq!(err.to_string(), "Execution error: listing models: refused");
    }
}
