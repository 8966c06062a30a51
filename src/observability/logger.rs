//! Logging system for agent sessions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Logger for task orchestration and streaming sessions.
///
/// This logger creates markdown-formatted log files for tracking sessions,
/// backend interactions, file operations and other events.
#[derive(Debug)]
pub struct Logger {
    log_file: PathBuf,
    log_level: String,
}

impl Logger {
    /// Initialize logger.
    ///
    /// # Arguments
    /// * `log_file` - Path to log file. If None, creates a timestamped file in temp directory.
    /// * `log_level` - Logging level (defaults to "INFO").
    pub fn new(log_file: Option<&Path>, log_level: Option<&str>) -> Result<Self> {
        let log_file = match log_file {
            Some(p) => p.to_path_buf(),
            None => {
                let mut dir = std::env::temp_dir();
                dir.push("llamaflow-logs");
                std::fs::create_dir_all(&dir).with_context(|| {
                    format!("Failed to create log directory: {}", dir.display())
                })?;
                let filename = format!(
                    "session_{}_{}.md",
                    Utc::now().timestamp_millis(),
                    std::process::id()
                );
                dir.join(filename)
            }
        };

        let log_level = log_level.unwrap_or("INFO").to_uppercase();

        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let logger = Self {
            log_file,
            log_level,
        };

        if !logger.log_file.exists() {
            logger.initialize_log_file()?;
        }

        Ok(logger)
    }

    /// Initialize the log file with header.
    fn initialize_log_file(&self) -> Result<()> {
        let mut file = File::create(&self.log_file)
            .with_context(|| format!("Failed to create log file: {}", self.log_file.display()))?;

        let now: DateTime<Utc> = Utc::now();

        writeln!(file, "# Llamaflow Session Log\n")?;
        writeln!(file, "Log started: {}\n", now.to_rfc3339())?;
        writeln!(file, "---\n")?;

        Ok(())
    }

    /// Append content to log file.
    fn append_to_log(&self, content: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("Failed to open log file: {}", self.log_file.display()))?;

        write!(file, "{}", content).with_context(|| "Failed to write to log file")?;

        Ok(())
    }

    fn is_debug(&self) -> bool {
        self.log_level == "DEBUG"
    }

    /// Log session start.
    ///
    /// # Arguments
    /// * `mode` - Interaction mode (normal, agentic).
    /// * `config` - Configuration summary.
    pub fn log_session_start(
        &self,
        mode: &str,
        config: &HashMap<String, serde_json::Value>,
    ) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let content = format!(
            "## Session Started - {}\n\n**Mode:** {}\n**Config:** {}\n\n",
            now.to_rfc3339(),
            mode,
            serde_json::to_string_pretty(config).unwrap_or_default()
        );

        self.append_to_log(&content)?;
        tracing::info!(mode, "session started");
        Ok(())
    }

    /// Log a task being dispatched from the queue.
    pub fn log_task_dispatch(&self, index: usize, kind: &str, prompt: &str) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let content = format!(
            "## Task {} ({}) - {}\n\n**Prompt:**\n```\n{}\n```\n\n",
            index,
            kind,
            now.to_rfc3339(),
            prompt
        );
        self.append_to_log(&content)
    }

    /// Log a backend interaction.
    ///
    /// The effective prompt is only written at DEBUG level; it always carries
    /// the full persona preamble.
    pub fn log_llm_interaction(&self, prompt: &str, response: &str, model: &str) -> Result<()> {
        if prompt.trim().is_empty() && response.trim().is_empty() {
            tracing::debug!("skipping log entry for empty interaction");
            return Ok(());
        }

        let now: DateTime<Utc> = Utc::now();
        let prompt_block = if self.is_debug() {
            format!("**Prompt:**\n```\n{}\n```\n\n", prompt)
        } else {
            format!("**Prompt:** {} chars\n\n", prompt.chars().count())
        };

        let content = format!(
            "### LLM Interaction - {}\n\n**Model:** {}\n\n{}**Response:**\n```\n{}\n```\n\n",
            now.to_rfc3339(),
            model,
            prompt_block,
            response
        );

        self.append_to_log(&content)
    }

    /// Log the rendered outcome of a resolved task.
    pub fn log_outcome(&self, index: usize, rendered: &str) -> Result<()> {
        let content = format!("### Outcome {}\n\n{}\n\n", index, rendered);
        self.append_to_log(&content)
    }

    /// Log a structured file operation.
    pub fn log_file_operation(&self, action: &str, path: &str, success: bool) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let status = if success { "applied" } else { "rejected" };
        let content = format!(
            "### File Operation - {}\n\n**Action:** {}\n**Path:** `{}`\n**Status:** {}\n\n",
            now.to_rfc3339(),
            action,
            path,
            status
        );
        self.append_to_log(&content)
    }

    /// Log the terminal state of a stream session.
    pub fn log_stream_event(&self, state: &str, fragments: usize, chars: usize) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let content = format!(
            "### Stream Session - {}\n\n**State:** {}\n**Fragments:** {}\n**Characters:** {}\n\n",
            now.to_rfc3339(),
            state,
            fragments,
            chars
        );
        self.append_to_log(&content)
    }

    /// Log error with context.
    ///
    /// # Arguments
    /// * `error` - Error message.
    /// * `context` - Additional context information.
    pub fn log_error(
        &self,
        error: &str,
        context: Option<&HashMap<String, serde_json::Value>>,
    ) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let mut content = format!(
            "### Error - {}\n\n**Error:** {}\n\n",
            now.to_rfc3339(),
            error
        );

        if let Some(ctx) = context {
            content.push_str(&format!(
                "**Context:** {}\n\n",
                serde_json::to_string_pretty(ctx).unwrap_or_default()
            ));
        }

        self.append_to_log(&content)?;
        tracing::error!("{}", error);
        Ok(())
    }

    /// Log session completion.
    ///
    /// # Arguments
    /// * `reason` - Reason for completion.
    pub fn log_completion(&self, reason: &str) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let content = format!(
            "### Session Completed - {}\n\n**Reason:** {}\n\n---\n\n",
            now.to_rfc3339(),
            reason
        );

        self.append_to_log(&content)?;
        tracing::info!(reason, "session completed");
        Ok(())
    }

    /// Get the log file path.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Get the log level.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

#[cfg(test)]
mod tests;
