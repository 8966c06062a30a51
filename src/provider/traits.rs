//! Generation client abstraction.
//!
//! This module defines the trait every text-generation backend implements.
//! The orchestrator and the stream session controller only ever talk to a
//! `dyn GenerationClient`, so the backend (a local Ollama server in the
//! default build) can be swapped or mocked freely.

use crate::provider::types::generate::GenerateConfig;
use crate::provider::types::models::ModelDescriptor;
use anyhow::Result;
use futures_util::Stream;
use std::pin::Pin;

/// Lazy sequence of text fragments whose concatenation is the complete reply.
///
/// Fragments are only requested from the backend when the stream is polled,
/// so dropping the stream stops generation from being consumed.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Core trait that all generation backends must implement
///
/// Failures are reported as `Err` values, never as panics; callers decide how
/// to surface them.
///
/// # Example
///
/// ```ignore
/// use llamaflow::provider::{GenerateConfig, GenerationClient};
///
/// async fn ask(client: &dyn GenerationClient) -> anyhow::Result<()> {
///     let config = GenerateConfig::default();
///     let text = client.generate("Explain ownership in one line", &config).await?;
///     println!("{}", text);
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate one complete reply
    ///
    /// # Arguments
    /// * `prompt` - The full prompt text
    /// * `config` - Generation configuration (model, temperature)
    async fn generate(&self, prompt: &str, config: &GenerateConfig) -> Result<String>;

    /// Generate a reply as a lazy sequence of fragments
    ///
    /// # Arguments
    /// * `prompt` - The full prompt text
    /// * `config` - Generation configuration (model, temperature)
    async fn generate_stream(&self, prompt: &str, config: &GenerateConfig)
        -> Result<FragmentStream>;

    /// List the models the backend can serve
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>>;

    /// Get the provider name for logging and debugging
    fn provider_name(&self) -> &str;

    /// Model used when the request does not name one
    fn default_model(&self) -> String;
}
