//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table, or a notice when there are none
pub fn print_rows<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a wait in minutes as `12.3 min` or `1h 05m`
pub fn format_minutes(minutes: f64) -> String {
    if minutes >= 60.0 {
        let total = minutes.round() as u64;
        format!("{}h {:02}m", total / 60, total % 60)
    } else {
        format!("{:.1} min", minutes)
    }
}

/// Format an optional wait, `-` when absent
pub fn format_optional_minutes(minutes: Option<f64>) -> String {
    minutes.map(format_minutes).unwrap_or_else(|| "-".to_string())
}

/// Format item ids as `1, 2, 3`
pub fn format_items(items: &[u32]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First eight characters of an order id
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Format timestamp for display
pub fn format_timestamp(ts: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.to_string()
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "pending" => status.yellow().to_string(),
        "complete" | "ready" => status.green().to_string(),
        "uninitialized" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a prediction error: green within 5 minutes, yellow within 15
pub fn color_error(error: Option<f64>) -> String {
    match error {
        Some(e) if e <= 5.0 => format_minutes(e).green().to_string(),
        Some(e) if e <= 15.0 => format_minutes(e).yellow().to_string(),
        Some(e) => format_minutes(e).red().to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(12.34), "12.3 min");
        assert_eq!(format_minutes(65.0), "1h 05m");
        assert_eq!(format_optional_minutes(None), "-");
    }

    #[test]
    fn test_format_items_and_ids() {
        assert_eq!(format_items(&[1, 2, 3]), "1, 2, 3");
        assert_eq!(short_id("6f1c2a8e-0000-4000-8000-000000000000"), "6f1c2a8e");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-05-01T12:30:00Z"), "2024-05-01 12:30:00");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
