//! Shared utility functions for CLI commands

use crate::orchestration::Outcome;
use colored::*;

/// Display a user-friendly error message with suggestions
pub fn display_error_with_suggestions<E: std::fmt::Display>(error: &E, context: &str, app_name: Option<&str>) {
    let app = app_name.unwrap_or("llamaflow");

    eprintln!("{} {}", "❌ Error:".red().bold(), context);
    eprintln!("   {}", error.to_string().red());

    let error_str = error.to_string().to_lowercase();
    if error_str.contains("connection") || error_str.contains("error sending request") {
        eprintln!("{}", "💡 Suggestions:".blue());
        eprintln!("   • Make sure Ollama is running ('ollama serve')");
        eprintln!("   • Check OLLAMA_HOST or [llm].base_url in your configuration");
        eprintln!("   • Run '{} config' to see the effective settings", app);
    } else if error_str.contains("model") && error_str.contains("not found") {
        eprintln!("{}", "💡 Suggestions:".blue());
        eprintln!("   • Run '{} models' to see installed models", app);
        eprintln!("   • Pull the model with 'ollama pull <name>'");
    } else if error_str.contains("no such file or directory") {
        eprintln!("{}", "💡 Suggestions:".blue());
        eprintln!("   • Check that the file or directory path is correct");
        eprintln!("   • Pass an explicit path with --config or --env-file");
    } else if error_str.contains("permission denied") {
        eprintln!("{}", "💡 Suggestions:".blue());
        eprintln!("   • Check file permissions");
        eprintln!("   • Point --workspace at a writable directory");
    }
}

/// Print a rendered outcome, colored by its kind
pub fn print_outcome(index: usize, outcome: &Outcome) {
    let header = format!("[{}]", index);
    let rendered = outcome.render();
    match outcome {
        Outcome::Error { .. } => println!("{} {}", header.dimmed(), rendered.red()),
        Outcome::FileOpSuccess { .. } => println!("{} {}", header.dimmed(), rendered.green()),
        Outcome::Text { .. } => println!("{} {}", header.dimmed(), rendered),
    }
}

/// Truncate text with ellipsis if it exceeds max length (in characters)
pub fn truncate_with_ellipsis(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format bytes with optional human-readable output
pub fn format_bytes(bytes: u64, human_readable: bool) -> String {
    if !human_readable {
        return bytes.to_string();
    }

    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("a longer sentence", 10), "a longe...");
        assert_eq!(truncate_with_ellipsis("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512, true), "512 B");
        assert_eq!(format_bytes(2048, true), "2.00 KB");
        assert_eq!(format_bytes(4_661_224_676, true), "4.34 GB");
        assert_eq!(format_bytes(4096, false), "4096");
    }
}
