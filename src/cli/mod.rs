//! CLI feature - command-line front end
//!
//! The thinnest consumer of the orchestration core:
//! - `chat` streams replies through the stream session controller
//! - `run` resolves agentic tasks through the task orchestrator
//! - `models` and `config` inspect the backend and settings

pub mod args;
pub mod commands;
pub mod context;
pub mod error;
pub mod utils;

// Re-exports for convenience
pub use args::{Cli, Command, Mode, RunArgs};
pub use context::CliContext;
pub use error::{CliError, CliResult};
pub use utils::*;
