use clap::Parser;
use llamaflow::cli::commands::{chat, config, models, run};
use llamaflow::cli::{
    display_error_with_suggestions, Cli, CliContext, CliError, CliResult, Command, Mode,
};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn dispatch(cli: Cli) -> CliResult<bool> {
    let mut ctx = CliContext::load(&cli)?;
    let configured = &ctx.loader.config.agent.default_mode;
    let default_mode = Mode::parse(configured).ok_or_else(|| {
        CliError::ConfigError(format!(
            "Unknown agent.default_mode '{}'. Use 'normal' or 'agentic'",
            configured
        ))
    })?;

    match cli.resolve_command(default_mode) {
        Command::Chat { prompt } => {
            ctx.log_session_start(Mode::Normal.as_str());
            chat::execute_chat(&mut ctx, &prompt).await?;
            ctx.log_completion("chat finished");
            Ok(true)
        }
        Command::Run(args) => {
            ctx.log_session_start(Mode::Agentic.as_str());
            let summary = run::execute_run(&ctx, &args).await?;
            ctx.log_completion(&format!(
                "{} task(s) resolved, {} failed",
                summary.total, summary.failed
            ));
            if summary.failed > 0 {
                ctx.log_warning(&format!("{} of {} task(s) failed", summary.failed, summary.total));
            }
            Ok(summary.failed == 0)
        }
        Command::Models => {
            models::print_models(&ctx).await?;
            Ok(true)
        }
        Command::Config => {
            config::config_show(&ctx)?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            display_error_with_suggestions(&e, "llamaflow failed", Some("llamaflow"));
            std::process::exit(1);
        }
    }
}
