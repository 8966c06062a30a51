//! Shared state for CLI commands
//!
//! Loads configuration, environment overrides, the session logger and the
//! generation client once, and builds orchestrators and stream controllers
//! from them.

use crate::cli::args::Cli;
use crate::cli::error::{CliError, CliResult};
use crate::config::{ConfigurationLoader, EnvironmentLoader};
use crate::observability::Logger;
use crate::orchestration::{Persona, StreamSessionController, TaskOrchestrator};
use crate::provider::{GenerateConfig, GenerationClient, ProviderFactory};
use colored::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub struct CliContext {
    pub loader: ConfigurationLoader,
    pub env: EnvironmentLoader,
    model: Option<String>,
    logger: Option<Arc<Logger>>,
    client: Arc<dyn GenerationClient>,
}

impl CliContext {
    /// Build the context from parsed global options.
    pub fn load(cli: &Cli) -> CliResult<Self> {
        let mut loader = ConfigurationLoader::new(cli.config.as_deref())
            .map_err(|e| CliError::ConfigError(format!("{:#}", e)))?;
        if let Some(workspace) = &cli.workspace {
            loader.config.workspace.root = workspace.to_string_lossy().into_owned();
        }

        let env = EnvironmentLoader::new(cli.env_file.as_deref());
        let client = ProviderFactory::create(&env, &loader.config)
            .map_err(|e| CliError::ProviderError(format!("{:#}", e)))?;
        let logger = open_logger(&loader);

        Ok(Self {
            loader,
            env,
            model: cli.model.clone(),
            logger,
            client,
        })
    }

    /// Build a context around an existing client (used by tests).
    pub fn with_client(loader: ConfigurationLoader, client: Arc<dyn GenerationClient>) -> Self {
        Self {
            loader,
            env: EnvironmentLoader::new(None),
            model: None,
            logger: None,
            client,
        }
    }

    pub fn client(&self) -> &Arc<dyn GenerationClient> {
        &self.client
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_model(&mut self, model: Option<String>) {
        self.model = model;
    }

    /// Model that requests will actually use.
    pub fn effective_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.client.default_model())
    }

    fn generate_config(&self) -> GenerateConfig {
        let llm = &self.loader.config.llm;
        let mut config = GenerateConfig::new()
            .with_temperature(llm.temperature)
            .with_streaming(llm.enable_streaming);
        config.model = self.model.clone();
        config
    }

    /// A fresh orchestrator configured from the loaded settings.
    pub fn orchestrator(&self) -> TaskOrchestrator {
        let orchestrator =
            TaskOrchestrator::from_config(self.client.clone(), Persona::default(), &self.loader.config)
                .with_generate_config(self.generate_config());
        match &self.logger {
            Some(logger) => orchestrator.with_logger(logger.clone()),
            None => orchestrator,
        }
    }

    /// A stream controller configured from the loaded settings.
    pub fn stream_controller(&self) -> StreamSessionController {
        let controller = StreamSessionController::from_config(self.client.clone(), &self.loader.config)
            .with_generate_config(self.generate_config());
        match &self.logger {
            Some(logger) => controller.with_logger(logger.clone()),
            None => controller,
        }
    }

    /// Record the start of a CLI session in the session log.
    pub fn log_session_start(&self, mode: &str) {
        if let Some(logger) = &self.logger {
            let mut summary = HashMap::new();
            summary.insert("provider".to_string(), self.client.provider_name().into());
            summary.insert("model".to_string(), self.effective_model().into());
            summary.insert(
                "workspace".to_string(),
                self.loader.config.workspace.root.clone().into(),
            );
            summary.insert("log_level".to_string(), logger.log_level().into());
            if let Err(e) = logger.log_session_start(mode, &summary) {
                tracing::warn!(error = %e, "failed to write session log");
            }
        }
    }

    pub fn log_completion(&self, reason: &str) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log_completion(reason) {
                tracing::warn!(error = %e, "failed to write session log");
            }
        }
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.logger.as_ref().map(|logger| logger.log_file())
    }

    pub fn log_info(&self, message: &str) {
        println!("{}", message.cyan());
    }

    pub fn log_success(&self, message: &str) {
        println!("{}", message.green());
    }

    pub fn log_warning(&self, message: &str) {
        eprintln!("{}", message.yellow());
    }

    pub fn log_error(&self, message: &str) {
        eprintln!("{}", message.red());
    }
}

fn open_logger(loader: &ConfigurationLoader) -> Option<Arc<Logger>> {
    let logging = &loader.config.logging;
    let path = Some(Path::new(&logging.log_file)).filter(|p| !p.as_os_str().is_empty());
    match Logger::new(path, Some(&logging.log_level)) {
        Ok(logger) => Some(Arc::new(logger)),
        Err(e) => {
            tracing::warn!(error = %e, "session log disabled");
            None
        }
    }
}
