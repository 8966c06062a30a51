//! Config command implementation
//!
//! Prints the effective configuration after file loading, CLI overrides and
//! environment overrides.

use crate::cli::context::CliContext;
use crate::cli::error::CliResult;
use colored::*;

/// Show configuration
pub fn config_show(ctx: &CliContext) -> CliResult<()> {
    ctx.log_info("🔧 Configuration");

    let config_path = &ctx.loader.config_path;
    if config_path.exists() {
        println!("Configuration file: {}", config_path.display());
    } else {
        println!(
            "Configuration file: {} {}",
            config_path.display(),
            "(not found, using defaults)".yellow()
        );
    }

    println!("Provider: {}", ctx.env.llm_provider());
    if let Some(host) = ctx.env.ollama_host() {
        println!("OLLAMA_HOST override: {}", host);
    }
    println!("Effective model: {}", ctx.effective_model());
    if let Some(log_file) = ctx.log_file() {
        println!("Session log: {}", log_file.display());
    }

    println!();
    print!("{}", ctx.loader.to_toml()?);
    Ok(())
}
