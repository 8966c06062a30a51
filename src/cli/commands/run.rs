//! Run command - resolve agentic tasks through the orchestrator

use crate::cli::args::RunArgs;
use crate::cli::context::CliContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::print_outcome;
use futures_util::StreamExt;

/// One task to enqueue, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub kind: String,
    pub prompt: String,
    pub depends_on: Option<usize>,
}

/// Counts reported after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub failed: usize,
}

/// Split a `KIND:PROMPT` task spec.
pub fn parse_task_spec(spec: &str) -> CliResult<(String, String)> {
    let (kind, prompt) = spec.split_once(':').ok_or_else(|| {
        CliError::InvalidInput(format!("Task '{}' must be written as KIND:PROMPT", spec))
    })?;
    if kind.trim().is_empty() {
        return Err(CliError::InvalidInput(format!("Task '{}' has no kind", spec)));
    }
    Ok((kind.trim().to_string(), prompt.trim().to_string()))
}

/// Turn the parsed arguments into an ordered task list.
pub fn plan_tasks(args: &RunArgs) -> CliResult<Vec<PlannedTask>> {
    let mut planned = Vec::with_capacity(args.tasks.len() + 1);

    for (i, spec) in args.tasks.iter().enumerate() {
        let (kind, prompt) = parse_task_spec(spec)?;
        let depends_on = if args.chain && i > 0 { Some(i - 1) } else { None };
        planned.push(PlannedTask {
            kind,
            prompt,
            depends_on,
        });
    }

    let prompt = args.prompt.join(" ");
    if !prompt.trim().is_empty() {
        planned.push(PlannedTask {
            kind: args.kind.clone(),
            prompt,
            depends_on: args.depends_on,
        });
    }

    if planned.is_empty() {
        return Err(CliError::InvalidInput(
            "No task given. Pass a prompt or at least one --task KIND:PROMPT".to_string(),
        ));
    }

    Ok(planned)
}

/// Enqueue every planned task and print each outcome as it resolves.
pub async fn execute_run(ctx: &CliContext, args: &RunArgs) -> CliResult<RunSummary> {
    let planned = plan_tasks(args)?;
    let mut orchestrator = ctx.orchestrator();

    for task in &planned {
        orchestrator.enqueue(task.kind.as_str(), task.prompt.clone(), task.depends_on);
    }

    ctx.log_info(&format!(
        "Running {} task(s) with {}...",
        planned.len(),
        ctx.effective_model()
    ));

    let mut summary = RunSummary {
        total: 0,
        failed: 0,
    };
    let mut outcomes = std::pin::pin!(orchestrator.run());
    while let Some(outcome) = outcomes.next().await {
        print_outcome(summary.total, &outcome);
        if outcome.is_error() {
            summary.failed += 1;
        }
        summary.total += 1;
    }

    Ok(summary)
}
