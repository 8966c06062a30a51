//! Generation backend abstraction module
//!
//! This module provides the [`GenerationClient`] trait, the Ollama HTTP
//! implementation and a factory that picks the backend from configuration.

pub mod traits;
pub mod factory;
pub mod types;
pub mod ollama;

// Re-export main types
pub use traits::{FragmentStream, GenerationClient};
pub use factory::ProviderFactory;
pub use types::{GenerateConfig, ModelDescriptor};
pub use ollama::OllamaClient;
