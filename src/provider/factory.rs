//! Provider factory for creating generation clients from configuration.
//!
//! Environment values (`LLM_PROVIDER`, `OLLAMA_HOST`, `LLAMAFLOW_MODEL`) take
//! precedence over the `[llm]` section of the TOML configuration.

use crate::config::{Configuration, EnvironmentLoader};
use crate::provider::ollama::OllamaClient;
use crate::provider::GenerationClient;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Factory for creating generation clients
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a client based on environment and file configuration
    ///
    /// # Returns
    /// A shared generation client
    pub fn create(env: &EnvironmentLoader, config: &Configuration) -> Result<Arc<dyn GenerationClient>> {
        let provider_name = env.llm_provider();
        match provider_name.as_str() {
            "ollama" => Ok(Arc::new(Self::create_ollama(env, config)?)),
            other => anyhow::bail!(
                "Unknown provider '{}'.\n\
                Supported providers: ollama",
                other
            ),
        }
    }

    /// Create the Ollama client with environment overrides applied
    pub fn create_ollama(env: &EnvironmentLoader, config: &Configuration) -> Result<OllamaClient> {
        Self::ollama_with_overrides(env.ollama_host(), env.ollama_model(), config)
    }

    fn ollama_with_overrides(
        host: Option<String>,
        model: Option<String>,
        config: &Configuration,
    ) -> Result<OllamaClient> {
        let base_url = host.unwrap_or_else(|| config.llm.base_url.clone());
        let model = model.unwrap_or_else(|| config.llm.model.clone());

        let client = OllamaClient::new(
            base_url,
            model,
            Duration::from_secs(config.llm.request_timeout_seconds),
        )?;
        debug!(
            base_url = client.base_url(),
            model = %client.default_model(),
            "created ollama client"
        );
        Ok(client)
    }
}
