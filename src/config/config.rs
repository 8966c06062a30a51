//! TOML configuration parsing and management.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub agent: AgentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub version: String,
    /// `normal` (streamed chat) or `agentic` (task queue)
    #[serde(default = "default_mode")]
    pub default_mode: String,
}

fn default_mode() -> String {
    "normal".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_file: String,
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: std::env::temp_dir()
                .join("llamaflow")
                .join(format!(
                    "llamaflow_{}_{}.md",
                    Utc::now().timestamp_millis(),
                    std::process::id()
                ))
                .to_string_lossy()
                .to_string(),
            log_level: "INFO".to_string(),
        }
    }
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_true")]
    pub enable_streaming: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            enable_streaming: true,
            request_timeout_seconds: default_request_timeout(),
            temperature: default_temperature(),
        }
    }
}

/// Code execution configuration (`execute` tasks)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_exec_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_true")]
    pub enable_code_execution: bool,
}

fn default_exec_timeout() -> u64 {
    10
}

fn default_interpreter() -> String {
    "python3".to_string()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_exec_timeout(),
            interpreter: default_interpreter(),
            enable_code_execution: true,
        }
    }
}

/// Sandbox root for structured file operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_root")]
    pub root: String,
    /// Accept absolute paths that resolve inside `root`.
    #[serde(default)]
    pub allow_absolute_paths: bool,
}

fn default_root() -> String {
    ".".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            allow_absolute_paths: false,
        }
    }
}

impl WorkspaceConfig {
    /// Workspace root with `~` expanded.
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.root).into_owned())
    }
}

/// Stream session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Appended once when a stream completes without cancellation. Empty disables it.
    #[serde(default = "default_marker")]
    pub finalization_marker: String,
}

fn default_marker() -> String {
    "\n".to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            finalization_marker: default_marker(),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        ConfigurationLoader::get_default_config()
    }
}

/// Loads and manages TOML configuration.
#[derive(Debug)]
pub struct ConfigurationLoader {
    pub config_path: PathBuf,
    pub config: Configuration,
}

impl ConfigurationLoader {
    /// Initialize configuration loader.
    ///
    /// # Arguments
    /// * `config_path` - Path to TOML config file. If None, uses `config/llamaflow.toml`
    ///   when present and built-in defaults otherwise.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config_path = config_path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("config/llamaflow.toml"));

        let config = if config_path.exists() {
            Self::load_config(&config_path)?
        } else {
            Self::get_default_config()
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Create a configuration loader from a pre-parsed Configuration.
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config_path: PathBuf::from("config/llamaflow.toml"),
            config,
        }
    }

    /// Load configuration from TOML file.
    fn load_config(path: &Path) -> Result<Configuration> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Configuration = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;

        config.logging.log_file = shellexpand::tilde(&config.logging.log_file).into_owned();
        Ok(config)
    }

    /// Get default configuration.
    fn get_default_config() -> Configuration {
        Configuration {
            agent: AgentConfig {
                name: "llamaflow".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                default_mode: default_mode(),
            },
            logging: LoggingConfig::default(),
            llm: LlmConfig::default(),
            execution: ExecutionConfig::default(),
            workspace: WorkspaceConfig::default(),
            stream: StreamConfig::default(),
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.config).context("Failed to serialize configuration")
    }

    /// Get configuration value by dot-notation key.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match key {
            "agent.name" => Some(self.config.agent.name.clone()),
            "agent.version" => Some(self.config.agent.version.clone()),
            "agent.default_mode" => Some(self.config.agent.default_mode.clone()),
            "logging.log_file" => Some(self.config.logging.log_file.clone()),
            "logging.log_level" => Some(self.config.logging.log_level.clone()),
            "llm.base_url" => Some(self.config.llm.base_url.clone()),
            "llm.model" => Some(self.config.llm.model.clone()),
            "execution.interpreter" => Some(self.config.execution.interpreter.clone()),
            "workspace.root" => Some(self.config.workspace.root.clone()),
            "stream.finalization_marker" => Some(self.config.stream.finalization_marker.clone()),
            _ => None,
        }
    }

    /// Get numeric configuration value.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match key {
            "llm.request_timeout_seconds" => Some(self.config.llm.request_timeout_seconds),
            "execution.timeout_seconds" => Some(self.config.execution.timeout_seconds),
            _ => None,
        }
    }

    /// Get boolean configuration value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match key {
            "llm.enable_streaming" => Some(self.config.llm.enable_streaming),
            "execution.enable_code_execution" => Some(self.config.execution.enable_code_execution),
            "workspace.allow_absolute_paths" => Some(self.config.workspace.allow_absolute_paths),
            _ => None,
        }
    }
}
