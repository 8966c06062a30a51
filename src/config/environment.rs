//! Environment variable loading and management.
//!
//! Environment values take precedence over the `[llm]` section of the TOML
//! configuration when the provider factory builds a client.

use std::env;
use std::path::Path;

/// Loads environment variables from .env file and system environment.
#[derive(Debug, Clone)]
pub struct EnvironmentLoader {
    #[allow(dead_code)]
    env_file: Option<String>,
}

impl EnvironmentLoader {
    /// Initialize the environment loader.
    ///
    /// # Arguments
    /// * `env_file` - Path to .env file. If None, no file is loaded.
    pub fn new(env_file: Option<&Path>) -> Self {
        // Only load a .env file if an explicit path was provided so that unit
        // tests never pick up a stray repository .env.
        if let Some(env_path) = env_file {
            if env_path.exists() {
                if let Err(e) = dotenv::from_path(env_path) {
                    eprintln!("Warning: Failed to load .env file: {}", e);
                }
            }
        }

        Self {
            env_file: env_file.map(|p| p.to_string_lossy().to_string()),
        }
    }

    /// Backend selection (`LLM_PROVIDER`). Defaults to `ollama`.
    pub fn llm_provider(&self) -> String {
        non_empty_var("LLM_PROVIDER").unwrap_or_else(|| "ollama".to_string())
    }

    /// Ollama base URL override (`OLLAMA_HOST`).
    ///
    /// Ollama itself accepts a bare `host:port`; a missing scheme is filled in
    /// with `http://`.
    pub fn ollama_host(&self) -> Option<String> {
        non_empty_var("OLLAMA_HOST").map(|host| {
            if host.starts_with("http://") || host.starts_with("https://") {
                host
            } else {
                format!("http://{}", host)
            }
        })
    }

    /// Model override (`LLAMAFLOW_MODEL`).
    pub fn ollama_model(&self) -> Option<String> {
        non_empty_var("LLAMAFLOW_MODEL")
    }
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
