//! Chat command - streamed replies with Ctrl-C cancellation
//!
//! A single prompt is streamed once. Without a prompt an interactive loop
//! reads lines from stdin; slash commands switch models or run one agentic
//! task.

use crate::cli::commands::models::print_models;
use crate::cli::context::CliContext;
use crate::cli::error::CliResult;
use crate::cli::utils::{display_error_with_suggestions, print_outcome};
use crate::orchestration::{StreamSessionController, StreamState, StreamSummary, TaskKind};
use colored::*;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A line typed into the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Quit,
    Models,
    Model(Option<String>),
    Agent(String),
    Prompt(String),
    Empty,
    Unknown(String),
}

/// Parse one interactive line.
pub fn parse_repl_line(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    if !line.starts_with('/') {
        return ReplInput::Prompt(line.to_string());
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" | "/exit" => ReplInput::Quit,
        "/models" => ReplInput::Models,
        "/model" if rest.is_empty() => ReplInput::Model(None),
        "/model" => ReplInput::Model(Some(rest.to_string())),
        "/agent" if !rest.is_empty() => ReplInput::Agent(rest.to_string()),
        _ => ReplInput::Unknown(command.to_string()),
    }
}

/// Stream one prompt to stdout. Ctrl-C cancels at the next fragment, or
/// abandons the request while the backend has not answered yet.
pub async fn stream_prompt(
    controller: &StreamSessionController,
    prompt: &str,
) -> CliResult<StreamSummary> {
    let mut session = tokio::select! {
        session = controller.begin(prompt) => session?,
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", "[generation cancelled]".yellow());
            return Ok(StreamSummary {
                state: StreamState::Cancelled,
                text: String::new(),
                fragments: 0,
            });
        }
    };

    let cancel = session.cancel_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut failure = None;
    let mut stdout = std::io::stdout();
    while let Some(fragment) = session.next_fragment().await {
        match fragment {
            Ok(text) => {
                print!("{}", text);
                stdout.flush()?;
            }
            Err(e) => failure = Some(e),
        }
    }
    watcher.abort();

    let summary = session.finish();
    match summary.state {
        StreamState::Cancelled => println!("\n{}", "[generation cancelled]".yellow()),
        StreamState::Failed => println!(),
        _ => {}
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(summary),
    }
}

/// Entry point for `llamaflow chat`.
pub async fn execute_chat(ctx: &mut CliContext, prompt: &[String]) -> CliResult<()> {
    let prompt = prompt.join(" ");
    if !prompt.trim().is_empty() {
        let controller = ctx.stream_controller();
        stream_prompt(&controller, &prompt).await?;
        return Ok(());
    }

    run_repl(ctx).await
}

async fn run_repl(ctx: &mut CliContext) -> CliResult<()> {
    ctx.log_info(&format!(
        "llamaflow chat ({}). Type /quit to exit, /models to list models, /model NAME to switch, /agent PROMPT for an agentic task.",
        ctx.effective_model()
    ));

    let mut controller = ctx.stream_controller();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", ">".bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_repl_line(&line) {
            ReplInput::Quit => break,
            ReplInput::Empty => {}
            ReplInput::Models => {
                if let Err(e) = print_models(ctx).await {
                    display_error_with_suggestions(&e, "Failed to list models", None);
                }
            }
            ReplInput::Model(model) => {
                ctx.set_model(model.clone());
                controller.set_model(model);
                ctx.log_success(&format!("Using model {}", ctx.effective_model()));
            }
            ReplInput::Agent(task) => {
                let mut orchestrator = ctx.orchestrator();
                orchestrator.enqueue(TaskKind::Process, task, None);
                if let Some(outcome) = orchestrator.run_next().await {
                    print_outcome(0, &outcome);
                }
            }
            ReplInput::Prompt(prompt) => {
                if let Err(e) = stream_prompt(&controller, &prompt).await {
                    display_error_with_suggestions(&e, "Generation failed", None);
                }
            }
            ReplInput::Unknown(command) => {
                ctx.log_warning(&format!("Unknown command {}", command));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repl_line() {
        assert_eq!(parse_repl_line("  "), ReplInput::Empty);
        assert_eq!(parse_repl_line("/quit"), ReplInput::Quit);
        assert_eq!(parse_repl_line("/models"), ReplInput::Models);
        assert_eq!(parse_repl_line("/model"), ReplInput::Model(None));
        assert_eq!(
            parse_repl_line("/model  codellama:7b "),
            ReplInput::Model(Some("codellama:7b".to_string()))
        );
        assert_eq!(
            parse_repl_line("/agent create hello.py"),
            ReplInput::Agent("create hello.py".to_string())
        );
        assert_eq!(parse_repl_line("/agent"), ReplInput::Unknown("/agent".to_string()));
        assert_eq!(
            parse_repl_line("what is rust?"),
            ReplInput::Prompt("what is rust?".to_string())
        );
    }
}
