//! Llamaflow - an offline agent runtime for local LLM backends
//!
//! Llamaflow resolves natural-language task requests against a local
//! generation backend (Ollama) and applies structured file commands found in
//! the replies. It is split into feature-gated modules:
//!
//! - **`config`** - TOML configuration and `.env` environment loading
//! - **`observability`** - Markdown session log
//! - **`provider`** - Generation client trait and the Ollama HTTP client
//! - **`executor`** - Interpreter runner for `execute` tasks
//! - **`orchestration`** - Task queue, response classifier, file operations
//!   and the stream session controller
//! - **`cli`** - Command-line front end
//!
//! # Features
//!
//! ```toml
//! [dependencies]
//! llamaflow = { version = "0.1", default-features = false, features = ["orchestration"] }
//! ```
//!
//! # Example: Agentic task chain
//!
//! ```ignore
//! use llamaflow::prelude::*;
//! use futures_util::StreamExt;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Configuration::default();
//!     let env = EnvironmentLoader::new(None);
//!     let client = ProviderFactory::create(&env, &config)?;
//!
//!     let mut orchestrator = TaskOrchestrator::from_config(client, Persona::default(), &config);
//!     let code = orchestrator.enqueue("generate", "a fizzbuzz function", None);
//!     orchestrator.enqueue("execute", "", Some(code));
//!
//!     let mut outcomes = std::pin::pin!(orchestrator.run());
//!     while let Some(outcome) = outcomes.next().await {
//!         println!("{}", outcome);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Example: Cancellable streaming
//!
//! ```ignore
//! use llamaflow::prelude::*;
//!
//! async fn example(client: std::sync::Arc<dyn GenerationClient>) -> AgentResult<()> {
//!     let controller = StreamSessionController::new(client);
//!     let mut session = controller.begin("Tell me a story").await?;
//!     let cancel = session.cancel_handle();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(std::time::Duration::from_secs(2)).await;
//!         cancel.cancel();
//!     });
//!     while let Some(fragment) = session.next_fragment().await {
//!         print!("{}", fragment?);
//!     }
//!     let summary = session.finish();
//!     println!("[{}]", summary.state);
//!     Ok(())
//! }
//! ```

/// Configuration management (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

/// Observability utilities (enabled with the `observability` feature)
#[cfg(feature = "observability")]
pub mod observability;

/// Generation backend abstraction (enabled with the `provider` feature)
#[cfg(feature = "provider")]
pub mod provider;

/// Script execution (enabled with the `executor` feature)
#[cfg(feature = "executor")]
pub mod executor;

/// Task orchestration and streaming (enabled with the `orchestration` feature)
#[cfg(feature = "orchestration")]
pub mod orchestration;

/// Command-line front end (enabled with the `cli` feature)
#[cfg(feature = "cli")]
pub mod cli;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "config")]
    pub use crate::config::{Configuration, ConfigurationLoader, EnvironmentLoader};

    #[cfg(feature = "observability")]
    pub use crate::observability::Logger;

    #[cfg(feature = "provider")]
    pub use crate::provider::{
        FragmentStream, GenerateConfig, GenerationClient, ModelDescriptor, OllamaClient,
        ProviderFactory,
    };

    #[cfg(feature = "executor")]
    pub use crate::executor::{ExecutionResult, ScriptExecutor};

    #[cfg(feature = "orchestration")]
    pub use crate::orchestration::{
        AgentError, AgentResult, CancelHandle, Outcome, Persona, ResultLog, StreamSession,
        StreamSessionController, StreamState, StreamSummary, TaskKind, TaskOrchestrator,
    };
}
