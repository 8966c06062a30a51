//! Models command - list models installed on the backend

use crate::cli::context::CliContext;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{format_bytes, truncate_with_ellipsis};
use crate::provider::ModelDescriptor;
use comfy_table::{presets::UTF8_FULL, Table};

/// Render model descriptors as a table, marking the active model.
pub fn models_table(models: &[ModelDescriptor], active: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["", "Name", "Size", "Modified"]);

    for model in models {
        let marker = if model.name == active { "*" } else { "" };
        let size = model
            .size
            .map(|bytes| format_bytes(bytes, true))
            .unwrap_or_else(|| "-".to_string());
        let modified = model
            .modified_at
            .as_deref()
            .map(|m| truncate_with_ellipsis(m, 19))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![marker.to_string(), model.name.clone(), size, modified]);
    }

    table
}

/// Fetch and print the model list.
pub async fn print_models(ctx: &CliContext) -> CliResult<()> {
    let models = ctx
        .client()
        .list_models()
        .await
        .map_err(|e| CliError::ProviderError(format!("{:#}", e)))?;

    if models.is_empty() {
        ctx.log_warning("No models installed. Pull one with 'ollama pull <name>'.");
        return Ok(());
    }

    println!("{}", models_table(&models, &ctx.effective_model()));
    Ok(())
}
