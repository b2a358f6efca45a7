//! Output formatting utilities

use chrono::{DateTime, TimeZone, Utc};
use clap::ValueEnum;
use colored::Colorize;
use harbor_lib::{ContainerState, LogEvent, StdType};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print one value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// First 12 characters, as the docker CLI shows ids
pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

/// Coarse age such as `3m` or `2d`
pub fn format_age(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - since).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

/// Color container state
pub fn color_state(state: ContainerState) -> String {
    let text = state.as_str();
    match state {
        ContainerState::Running => text.green().to_string(),
        ContainerState::Paused | ContainerState::Restarting | ContainerState::Created => {
            text.yellow().to_string()
        }
        ContainerState::Exited | ContainerState::Dead | ContainerState::Removing => {
            text.red().to_string()
        }
    }
}

pub fn color_availability(available: bool) -> String {
    if available {
        "available".green().to_string()
    } else {
        "unavailable".red().to_string()
    }
}

fn color_level(level: &str) -> String {
    match level {
        "error" | "fatal" | "critical" | "panic" => level.red().bold().to_string(),
        "warn" | "warning" => level.yellow().to_string(),
        "debug" | "trace" => level.dimmed().to_string(),
        _ => level.blue().to_string(),
    }
}

/// One log event as a terminal line
pub fn format_log_line(event: &LogEvent, host: &str) -> String {
    let ts = Utc
        .timestamp_opt(event.timestamp, 0)
        .single()
        .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default();
    let mut line = format!("{} {}", ts.dimmed(), format!("{}/{}", host, short_id(&event.container_id)).cyan());
    if let Some(level) = &event.level {
        line.push(' ');
        line.push_str(&color_level(level));
    }
    line.push(' ');
    let text = event.message.to_text();
    if event.stream == StdType::STDERR {
        line.push_str(&text.red().to_string());
    } else {
        line.push_str(&text);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_lib::{LogMessage, LogPosition};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.00Ki");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00Gi");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_format_age() {
        let now = Utc.timestamp_opt(1_000_000, 0).unwrap();
        assert_eq!(format_age(now, now), "0s");
        assert_eq!(format_age(Utc.timestamp_opt(1_000_000 - 150, 0).unwrap(), now), "2m");
        assert_eq!(format_age(Utc.timestamp_opt(1_000_000 - 7200, 0).unwrap(), now), "2h");
        assert_eq!(format_age(Utc.timestamp_opt(1_000_000 - 200_000, 0).unwrap(), now), "2d");
    }

    #[test]
    fn test_format_log_line() {
        colored::control::set_override(false);
        let event = LogEvent {
            message: LogMessage::Simple("ready".to_string()),
            timestamp: 1_709_287_205,
            id: 1,
            level: Some("info".to_string()),
            position: LogPosition::Start,
            stream: StdType::STDOUT,
            container_id: "0123456789abcdef".to_string(),
        };
        assert_eq!(
            format_log_line(&event, "edge-1"),
            "2024-03-01T10:00:05Z edge-1/0123456789ab info ready"
        );
    }
}
