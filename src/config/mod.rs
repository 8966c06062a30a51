//! Configuration management for the llamaflow runtime.
//!
//! This module provides configuration loading through TOML files and
//! environment variable management via `.env` files.
//!
//! # Example
//!
//! ```no_run
//! use llamaflow::config::{ConfigurationLoader, EnvironmentLoader};
//! use std::path::Path;
//!
//! // Load environment variables
//! let env = EnvironmentLoader::new(None);
//!
//! // Load configuration from TOML
//! let config_loader = ConfigurationLoader::new(Some(Path::new("config/llamaflow.toml"))).unwrap();
//! let config = &config_loader.config;
//!
//! println!("Backend: {}", config.llm.base_url);
//! println!("Model override: {:?}", env.ollama_model());
//! ```

pub mod config;
pub mod environment;

// Re-export main types for convenience
pub use self::config::{
    AgentConfig, Configuration, ConfigurationLoader, ExecutionConfig, LlmConfig, LoggingConfig,
    StreamConfig, WorkspaceConfig,
};
pub use self::environment::EnvironmentLoader;
