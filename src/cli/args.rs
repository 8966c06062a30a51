//! Command-line argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Offline agent for local LLM backends
#[derive(Parser, Debug)]
#[command(name = "llamaflow", version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to a .env file with OLLAMA_HOST / LLAMAFLOW_MODEL overrides
    #[arg(long = "env-file", global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Model to use instead of the configured one
    #[arg(long, global = true, value_name = "NAME")]
    pub model: Option<String>,

    /// Workspace root for file operations and script execution
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Prompt handled in the configured `agent.default_mode` when no command is given
    #[arg(value_name = "PROMPT")]
    pub prompt: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The command to run; a bare prompt follows `default_mode`.
    pub fn resolve_command(&self, default_mode: Mode) -> Command {
        if let Some(command) = &self.command {
            return command.clone();
        }
        match default_mode {
            Mode::Normal => Command::Chat {
                prompt: self.prompt.clone(),
            },
            Mode::Agentic => Command::Run(RunArgs {
                kind: "process".to_string(),
                prompt: self.prompt.clone(),
                ..RunArgs::default()
            }),
        }
    }
}

/// Interaction mode: streamed chat or the agentic task queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Agentic,
}

impl Mode {
    /// Parse an `agent.default_mode` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Mode::Normal),
            "agentic" => Some(Mode::Agentic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Agentic => "agentic",
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Stream a reply (interactive session when no prompt is given)
    Chat {
        /// Prompt to send
        prompt: Vec<String>,
    },

    /// Run agentic tasks and print each outcome
    Run(RunArgs),

    /// List models available on the backend
    Models,

    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Task as KIND:PROMPT (process, generate, execute, analyze); repeatable
    #[arg(long = "task", value_name = "KIND:PROMPT")]
    pub tasks: Vec<String>,

    /// Make every --task depend on the task before it
    #[arg(long)]
    pub chain: bool,

    /// Kind of the task built from the trailing prompt
    #[arg(long, default_value = "process")]
    pub kind: String,

    /// Result index the trailing-prompt task depends on
    #[arg(long = "depends-on", value_name = "N")]
    pub depends_on: Option<usize>,

    /// Prompt for a single task
    #[arg(trailing_var_arg = true)]
    pub prompt: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_tasks() {
        let cli = Cli::try_parse_from([
            "llamaflow",
            "--model",
            "mistral",
            "run",
            "--task",
            "generate:a parser",
            "--task",
            "execute:",
            "--chain",
        ])
        .unwrap();

        assert_eq!(cli.model.as_deref(), Some("mistral"));
        match cli.resolve_command(Mode::Normal) {
            Command::Run(args) => {
                assert_eq!(args.tasks, vec!["generate:a parser", "execute:"]);
                assert!(args.chain);
                assert!(args.prompt.is_empty());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_run_trailing_prompt() {
        let cli = Cli::try_parse_from([
            "llamaflow",
            "run",
            "--kind",
            "analyze",
            "--depends-on",
            "2",
            "why",
            "is",
            "this",
            "slow",
        ])
        .unwrap();

        match cli.resolve_command(Mode::Normal) {
            Command::Run(args) => {
                assert_eq!(args.kind, "analyze");
                assert_eq!(args.depends_on, Some(2));
                assert_eq!(args.prompt.join(" "), "why is this slow");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["llamaflow", "chat", "--workspace", "/tmp/ws", "hello"]).unwrap();
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
        assert!(matches!(cli.command, Some(Command::Chat { ref prompt }) if prompt == &vec!["hello".to_string()]));
    }

    #[test]
    fn test_bare_prompt_follows_default_mode() {
        let cli = Cli::try_parse_from(["llamaflow", "--model", "phi3", "write", "a", "haiku"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.prompt.join(" "), "write a haiku");

        match cli.resolve_command(Mode::Normal) {
            Command::Chat { prompt } => assert_eq!(prompt.join(" "), "write a haiku"),
            other => panic!("unexpected command: {:?}", other),
        }
        match cli.resolve_command(Mode::Agentic) {
            Command::Run(args) => {
                assert_eq!(args.kind, "process");
                assert!(args.tasks.is_empty());
                assert_eq!(args.prompt.join(" "), "write a haiku");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_arguments_opens_chat() {
        let cli = Cli::try_parse_from(["llamaflow"]).unwrap();
        assert!(matches!(
            cli.resolve_command(Mode::Normal),
            Command::Chat { ref prompt } if prompt.is_empty()
        ));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("normal"), Some(Mode::Normal));
        assert_eq!(Mode::parse(" Agentic "), Some(Mode::Agentic));
        assert_eq!(Mode::parse("turbo"), None);
        assert_eq!(Mode::Agentic.as_str(), "agentic");
    }
}
