//! Script execution module with timeout handling for `execute` tasks.
//!
//! Source text is written to a temporary file and run with a configured
//! interpreter. The child process is killed when the timeout elapses.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Execution result containing process output and metadata.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
    pub success: bool,
}

/// Runs source text through an interpreter with a timeout.
#[derive(Debug)]
pub struct ScriptExecutor {
    interpreter: String,
    timeout_seconds: u64,
    working_dir: PathBuf,
    enable_validation: bool,
    last_result: Option<ExecutionResult>,
}

impl ScriptExecutor {
    /// Initialize script executor.
    ///
    /// # Arguments
    /// * `interpreter` - Program used to run the script, e.g. `python3`.
    /// * `timeout_seconds` - Wall-clock limit per run.
    /// * `working_dir` - Working directory for the child process.
    /// * `enable_validation` - Reject obviously destructive sources before running them.
    pub fn new(
        interpreter: impl Into<String>,
        timeout_seconds: u64,
        working_dir: Option<&Path>,
        enable_validation: bool,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout_seconds,
            working_dir: working_dir.unwrap_or(Path::new(".")).to_path_buf(),
            enable_validation,
            last_result: None,
        }
    }

    /// Run `source` with the configured interpreter.
    ///
    /// A non-zero exit is reported through `ExecutionResult::success`; only a
    /// spawn failure, a validation failure or a timeout is an `Err`.
    pub async fn run_source(&mut self, source: &str) -> Result<ExecutionResult> {
        let (valid, reason) = self.validate_source(source);
        if !valid {
            anyhow::bail!(reason);
        }

        let mut script = tempfile::Builder::new()
            .prefix("llamaflow_")
            .suffix(self.script_suffix())
            .tempfile()
            .context("Failed to create temporary script file")?;
        script
            .write_all(source.as_bytes())
            .context("Failed to write temporary script file")?;
        script.flush()?;

        let mut cmd = TokioCommand::new(&self.interpreter);
        cmd.arg(script.path())
            .current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let timeout_duration = Duration::from_secs(self.timeout_seconds);

        // `script` stays alive until the child has finished.
        match timeout(timeout_duration, cmd.output()).await {
            Ok(Ok(output)) => {
                let result = ExecutionResult {
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    return_code: output.status.code().unwrap_or(-1),
                    success: output.status.success(),
                };
                self.last_result = Some(result.clone());
                Ok(result)
            }
            Ok(Err(e)) => {
                self.last_result = None;
                Err(anyhow::anyhow!(
                    "Failed to run interpreter '{}': {}",
                    self.interpreter,
                    e
                ))
            }
            Err(_) => {
                self.last_result = None;
                Err(anyhow::anyhow!(
                    "Code execution timed out after {} seconds",
                    self.timeout_seconds
                ))
            }
        }
    }

    fn script_suffix(&self) -> &'static str {
        let name = Path::new(&self.interpreter)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.starts_with("python") {
            ".py"
        } else if name == "node" {
            ".js"
        } else if name == "sh" || name == "bash" {
            ".sh"
        } else {
            ".txt"
        }
    }

    /// Validate source safety (basic checks).
    ///
    /// # Returns
    /// Tuple of (is_valid, error_message).
    pub fn validate_source(&self, source: &str) -> (bool, String) {
        if source.trim().is_empty() {
            return (false, "No code to execute".to_string());
        }

        if !self.enable_validation {
            return (true, String::new());
        }

        let dangerous_patterns = [
            "shutil.rmtree(",
            "os.system(",
            "subprocess.",
            "rm -rf /",
            ":(){ :|:& };:",
        ];

        for pattern in &dangerous_patterns {
            if source.contains(pattern) {
                return (
                    false,
                    format!("Potentially dangerous code detected: {}", pattern),
                );
            }
        }

        (true, String::new())
    }

    /// Get the working directory.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Get the interpreter.
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Get the last execution result.
    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last_result.as_ref()
    }
}

impl Default for ScriptExecutor {
    fn default() -> Self {
        Self::new("python3", 10, None, true)
    }
}

static PYTHON_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n(.*?)\r?\n?```")
        .expect("python fence regex should compile")
});

static ANY_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)\r?\n?```")
        .expect("fence regex should compile")
});

/// Pull the body of the first fenced code block out of `text`.
///
/// A ```` ```python ```` block is preferred; otherwise the first fenced block of
/// any language is used. Text without a fence is returned unchanged.
pub fn extract_fenced_code(text: &str) -> String {
    [&*PYTHON_FENCE, &*ANY_FENCE]
        .iter()
        .find_map(|re| re.captures(text))
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| text.to_string())
}
