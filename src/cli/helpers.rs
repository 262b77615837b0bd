//! Shared helper functions for CLI commands.

use console::style;

use earnings_ocr::models::{AnnouncementEvent, ExtractionResult};

use super::icons;

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Human-readable table
    Table,
}

/// Write an extraction result in the requested format.
pub fn print_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Table => {
            print_events_table(&result.items);
            for failure in &result.failures {
                eprintln!(
                    "{} skipped #{} {}: {}",
                    icons::warn(),
                    failure.index,
                    failure.name,
                    failure.error
                );
            }
        }
    }
    Ok(())
}

fn print_events_table(events: &[AnnouncementEvent]) {
    if events.is_empty() {
        println!("{}", style("No announcements found").dim());
        return;
    }

    println!(
        "{:<12} {:<6} {:<13} {:<12} {}",
        style("DATE").bold(),
        style("TIME").bold(),
        style("SESSION").bold(),
        style("REACTION").bold(),
        style("TEXT").bold()
    );
    for event in events {
        println!(
            "{:<12} {:<6} {:<13} {:<12} {}",
            event.date_iso(),
            event.time24.as_deref().unwrap_or("-"),
            session_label(event.after_close),
            event.reaction_date().format("%Y-%m-%d"),
            truncate(&event.original_text, 60)
        );
    }
}

fn session_label(after_close: bool) -> &'static str {
    if after_close {
        "after close"
    } else {
        "market hours"
    }
}

/// Truncate to `max` characters, appending an ellipsis when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}
