//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use insight_lib::{EventSeverity, HealthStatus, Level, Priority, UtilizationVerdict};
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

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table, or `empty` when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, empty: &str) {
    if rows.is_empty() {
        println!("{}", empty.dimmed());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a bold section heading with an underline
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

pub fn print_subheading(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "-".repeat(50));
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Shorten `text` to at most `max` characters, marking the cut with `…`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

pub fn color_health(status: HealthStatus) -> String {
    let s = status.to_string();
    match status {
        HealthStatus::Healthy => s.green().to_string(),
        HealthStatus::Warning => s.yellow().to_string(),
        HealthStatus::Critical => s.red().to_string(),
    }
}

/// Color a 0-100 score by the health status it maps to
pub fn color_score(score: u8) -> String {
    let s = score.to_string();
    match HealthStatus::from_score(score) {
        HealthStatus::Healthy => s.green().to_string(),
        HealthStatus::Warning => s.yellow().to_string(),
        HealthStatus::Critical => s.red().to_string(),
    }
}

pub fn color_priority(priority: Priority) -> String {
    let s = priority.to_string();
    match priority {
        Priority::High => s.red().bold().to_string(),
        Priority::Medium => s.yellow().to_string(),
        Priority::Low => s.blue().to_string(),
    }
}

pub fn color_level(level: Level) -> String {
    let s = level.to_string();
    match level {
        Level::High => s.red().to_string(),
        Level::Medium => s.yellow().to_string(),
        Level::Low => s.to_string(),
    }
}

pub fn color_severity(severity: EventSeverity) -> String {
    let s = severity.to_string();
    match severity {
        EventSeverity::Critical => s.red().bold().to_string(),
        EventSeverity::Warning => s.yellow().to_string(),
        EventSeverity::Info => s.dimmed().to_string(),
    }
}

pub fn color_verdict(verdict: UtilizationVerdict) -> String {
    let s = verdict.to_string();
    match verdict {
        UtilizationVerdict::Underutilized => s.yellow().to_string(),
        UtilizationVerdict::Overutilized => s.red().to_string(),
        UtilizationVerdict::Optimal => s.green().to_string(),
    }
}
