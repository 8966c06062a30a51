//! Task orchestration - the runtime core of the agent
//!
//! This module provides:
//! - A dependency-aware FIFO task queue ([`TaskOrchestrator`])
//! - Response classification for embedded structured file commands
//! - Sandboxed file operations below a workspace root
//! - A single-session stream controller with cooperative cancellation
//!
//! Every task resolves to exactly one [`Outcome`]; failures never escape the
//! orchestrator as errors.

pub mod classifier;
pub mod error;
pub mod file_ops;
pub mod orchestrator;
pub mod outcome;
pub mod persona;
pub mod stream;
pub mod task;

// Re-export main types
pub use classifier::{find_json_object, parse_command, ResponseClassifier};
pub use error::{AgentError, AgentResult};
pub use file_ops::{FileAction, FileOperation, FileOperationExecutor};
pub use orchestrator::TaskOrchestrator;
pub use outcome::{ErrorKind, Outcome, ResultLog, TextLabel};
pub use persona::Persona;
pub use stream::{CancelHandle, StreamSession, StreamSessionController, StreamState, StreamSummary};
pub use task::{Task, TaskKind};
