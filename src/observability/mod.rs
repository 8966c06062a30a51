//! Observability utilities for the llamaflow runtime.
//!
//! The [`Logger`] keeps a markdown transcript of a session: task dispatches,
//! backend interactions, file operations, stream sessions and errors.
//!
//! # Example
//!
//! ```no_run
//! use llamaflow::observability::Logger;
//! use std::collections::HashMap;
//!
//! let logger = Logger::new(None, Some("DEBUG")).unwrap();
//!
//! let config = HashMap::new();
//! logger.log_session_start("agentic", &config).unwrap();
//! logger.log_llm_interaction("Say hi", "Hello, world!", "llama3").unwrap();
//! logger.log_completion("Queue drained").unwrap();
//! ```

pub mod logger;

// Re-export main types for convenience
pub use logger::Logger;
