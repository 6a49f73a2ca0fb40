//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use engine_lib::{NotificationType, RecommendationConfigItem, RecommendationNotification};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes >= GB {
        format!("{:.2}Gi", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes / KB)
    } else {
        format!("{:.0}B", bytes)
    }
}

/// Format cores as `1.25` or, below one core, `250m`
pub fn format_cpu(cores: f64) -> String {
    if cores >= 1.0 {
        let formatted = format!("{:.2}", cores);
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        format!("{}m", (cores * 1000.0).round() as u64)
    }
}

/// Render a CPU value according to its unit
pub fn format_cpu_item(item: Option<&RecommendationConfigItem>) -> String {
    let Some(item) = item else {
        return "-".to_string();
    };
    match item.format.to_ascii_lowercase().as_str() {
        "" | "cores" | "core" => format_cpu(item.amount),
        "m" | "millicores" => format_cpu(item.amount / 1000.0),
        _ => format!("{:.3} {}", item.amount, item.format),
    }
}

/// Render a memory value according to its unit
pub fn format_memory_item(item: Option<&RecommendationConfigItem>) -> String {
    let Some(item) = item else {
        return "-".to_string();
    };
    let multiplier = match item.format.to_ascii_lowercase().as_str() {
        "" | "b" | "bytes" => 1.0,
        "ki" | "kib" => 1024.0,
        "mi" | "mib" => 1024.0 * 1024.0,
        "gi" | "gib" => 1024.0 * 1024.0 * 1024.0,
        _ => return format!("{:.2} {}", item.amount, item.format),
    };
    format_bytes(item.amount * multiplier)
}

/// Color a notification by its severity
pub fn color_notification(notification: &RecommendationNotification) -> String {
    let text = format!("{} ({})", notification.kind.as_str(), notification.code);
    match notification.notification_type {
        NotificationType::Info => text.blue().to_string(),
        NotificationType::Notice => text.cyan().to_string(),
        NotificationType::Warning => text.yellow().to_string(),
        NotificationType::Error | NotificationType::Critical => text.red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cpu() {
        assert_eq!(format_cpu(1.25), "1.25");
        assert_eq!(format_cpu(2.0), "2");
        assert_eq!(format_cpu(0.25), "250m");
        assert_eq!(format_cpu(0.0015), "2m");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512.0), "512B");
        assert_eq!(format_bytes(2048.0), "2.00Ki");
        assert_eq!(format_bytes(960.0 * 1024.0 * 1024.0), "960.00Mi");
        assert_eq!(format_bytes(1.5 * 1024.0 * 1024.0 * 1024.0), "1.50Gi");
    }

    #[test]
    fn test_format_items_by_unit() {
        let memory = RecommendationConfigItem::new(960.0, "MiB");
        assert_eq!(format_memory_item(Some(&memory)), "960.00Mi");
        let cpu = RecommendationConfigItem::new(500.0, "millicores");
        assert_eq!(format_cpu_item(Some(&cpu)), "500m");
        assert_eq!(format_cpu_item(None), "-");
    }
}
