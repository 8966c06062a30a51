//! Dependency-aware task queue.
//!
//! Tasks are resolved strictly in FIFO order, one outcome per task. Every
//! failure is turned into an [`Outcome::Error`] at this boundary, so one bad
//! task never halts the queue.

use super::classifier::ResponseClassifier;
use super::error::{AgentError, AgentResult};
use super::file_ops::FileOperationExecutor;
use super::outcome::{Outcome, ResultLog, TextLabel};
use super::persona::Persona;
use super::task::{Task, TaskKind};
use crate::config::Configuration;
use crate::executor::{extract_fenced_code, ScriptExecutor};
use crate::observability::Logger;
use crate::provider::{GenerateConfig, GenerationClient};
use futures_util::stream::{self, Stream};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves queued tasks against a generation backend.
pub struct TaskOrchestrator {
    client: Arc<dyn GenerationClient>,
    persona: Persona,
    generate_config: GenerateConfig,
    classifier: ResponseClassifier,
    script_executor: Option<ScriptExecutor>,
    logger: Option<Arc<Logger>>,
    queue: VecDeque<Task>,
    completed: Vec<Task>,
    results: ResultLog,
    enqueued: usize,
}

impl TaskOrchestrator {
    /// Create an orchestrator writing files below `workspace_root`.
    ///
    /// Code execution is disabled until a [`ScriptExecutor`] is supplied.
    pub fn new(
        client: Arc<dyn GenerationClient>,
        persona: Persona,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            persona,
            generate_config: GenerateConfig::new(),
            classifier: ResponseClassifier::new(FileOperationExecutor::new(workspace_root, false)),
            script_executor: None,
            logger: None,
            queue: VecDeque::new(),
            completed: Vec::new(),
            results: ResultLog::new(),
            enqueued: 0,
        }
    }

    /// Create an orchestrator from the `[llm]`, `[execution]` and `[workspace]` sections.
    pub fn from_config(
        client: Arc<dyn GenerationClient>,
        persona: Persona,
        config: &Configuration,
    ) -> Self {
        let root = config.workspace.root_path();
        let script_executor = config.execution.enable_code_execution.then(|| {
            ScriptExecutor::new(
                config.execution.interpreter.clone(),
                config.execution.timeout_seconds,
                Some(root.as_path()),
                true,
            )
        });

        Self::new(client, persona, root.clone())
            .with_file_executor(FileOperationExecutor::new(
                root,
                config.workspace.allow_absolute_paths,
            ))
            .with_generate_config(GenerateConfig::new().with_temperature(config.llm.temperature))
            .with_script_executor(script_executor)
    }

    /// Tasks always use single-shot requests; `enable_streaming` is ignored.
    pub fn with_generate_config(mut self, config: GenerateConfig) -> Self {
        self.generate_config = config;
        self
    }

    pub fn with_file_executor(mut self, executor: FileOperationExecutor) -> Self {
        self.classifier = ResponseClassifier::new(executor);
        self
    }

    pub fn with_script_executor(mut self, executor: Option<ScriptExecutor>) -> Self {
        self.script_executor = executor;
        self
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Switch the model used for subsequent tasks (`None` = backend default).
    pub fn set_model(&mut self, model: Option<String>) {
        self.generate_config.model = model;
    }

    /// Append a task and return its position in the overall order.
    ///
    /// Because tasks resolve in FIFO order, the returned index is also the
    /// result-log index its outcome will land at.
    pub fn enqueue(
        &mut self,
        kind: impl Into<TaskKind>,
        prompt: impl Into<String>,
        depends_on: Option<usize>,
    ) -> usize {
        let index = self.enqueued;
        self.queue.push_back(Task::new(kind.into(), prompt, depends_on));
        self.enqueued += 1;
        index
    }

    /// Number of tasks still waiting.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn results(&self) -> &ResultLog {
        &self.results
    }

    /// Resolved tasks, with their outcome attached, in resolution order.
    pub fn tasks(&self) -> &[Task] {
        &self.completed
    }

    /// Drain the queue lazily, yielding one outcome per task.
    pub fn run(&mut self) -> impl Stream<Item = Outcome> + '_ {
        stream::unfold(self, |orchestrator| async move {
            let outcome = orchestrator.run_next().await?;
            Some((outcome, orchestrator))
        })
    }

    /// Drain the queue and collect every outcome.
    pub async fn run_all(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(outcome) = self.run_next().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Resolve the next queued task, or `None` when the queue is empty.
    pub async fn run_next(&mut self) -> Option<Outcome> {
        let mut task = self.queue.pop_front()?;
        let index = self.results.len();

        debug!(index, kind = %task.kind, "dispatching task");
        self.log_with(|logger| logger.log_task_dispatch(index, task.kind.as_str(), &task.prompt));

        let outcome = match self.resolve(&task).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(index, error = %e, "task failed");
                let message = e.to_string();
                self.log_with(|logger| logger.log_error(&message, None));
                e.into()
            }
        };

        let rendered = outcome.render();
        self.log_with(|logger| logger.log_outcome(index, &rendered));

        self.results.push(outcome.clone());
        task.result = Some(outcome.clone());
        self.completed.push(task);

        Some(outcome)
    }

    async fn resolve(&mut self, task: &Task) -> AgentResult<Outcome> {
        let context = self.dependency_context(task.depends_on);

        match &task.kind {
            TaskKind::Unknown(kind) => Err(AgentError::UnknownTaskKind { kind: kind.clone() }),
            kind if !kind.uses_backend() => self.execute(context.as_deref(), &task.prompt).await,
            kind => {
                let prompt = self.build_prompt(kind, context.as_deref(), &task.prompt);
                let raw = self
                    .client
                    .generate(&prompt, &self.generate_config)
                    .await
                    .map_err(AgentError::client)?;

                let default_model = self.client.default_model();
                let model = self.generate_config.model_or(&default_model).to_string();
                self.log_with(|logger| logger.log_llm_interaction(&prompt, &raw, &model));

                let (outcome, op) = self.classifier.route(&raw, kind.text_label());
                if let Some(op) = op {
                    let applied = !outcome.is_error();
                    self.log_with(|logger| {
                        logger.log_file_operation(op.action.as_str(), &op.filename, applied)
                    });
                }
                Ok(outcome)
            }
        }
    }

    /// Rendered text of the dependency outcome, if the index is already resolved.
    fn dependency_context(&self, depends_on: Option<usize>) -> Option<String> {
        let index = depends_on?;
        match self.results.get(index) {
            Some(outcome) => Some(outcome.render()),
            None => {
                debug!(
                    index,
                    resolved = self.results.len(),
                    "dependency not resolved yet, continuing without context"
                );
                None
            }
        }
    }

    fn build_prompt(&self, kind: &TaskKind, context: Option<&str>, prompt: &str) -> String {
        let mut effective = String::with_capacity(self.persona.as_str().len() + prompt.len() + 64);
        effective.push_str(self.persona.as_str());
        effective.push_str("\n\n");
        if let Some(context) = context {
            effective.push_str("Based on the previous result:\n");
            effective.push_str(context);
            effective.push_str("\n\n");
        }
        effective.push_str(&kind.frame(prompt));
        effective
    }

    async fn execute(&mut self, context: Option<&str>, prompt: &str) -> AgentResult<Outcome> {
        let runner = self
            .script_executor
            .as_mut()
            .ok_or_else(|| AgentError::execution("Code execution is disabled"))?;

        let source = match context {
            Some(context) => extract_fenced_code(&format!("{}\n{}", context, prompt)),
            None => extract_fenced_code(prompt),
        };
        debug!(
            interpreter = runner.interpreter(),
            dir = %runner.working_dir().display(),
            "running extracted code"
        );

        let result = runner
            .run_source(&source)
            .await
            .map_err(|e| AgentError::execution(format!("{:#}", e)))?;

        if result.success {
            Ok(Outcome::labeled(TextLabel::ExecutionOutput, result.stdout))
        } else {
            Ok(Outcome::labeled(TextLabel::ExecutionError, result.stderr))
        }
    }

    fn log_with<F>(&self, write: F)
    where
        F: FnOnce(&Logger) -> anyhow::Result<()>,
    {
        if let Some(logger) = &self.logger {
            if let Err(e) = write(logger) {
                warn!(error = %e, "failed to write session log");
            }
        }
    }
}
