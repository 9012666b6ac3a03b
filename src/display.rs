//! Colored terminal output for the one-shot CLI subcommands.

use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::bridge::{BridgeError, CommandInvocation, StructuredResult};
use crate::store::{LogEntry, LogLevel, SettingValue};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated setting values.
const DEFAULT_MAX_LEN: usize = 60;

/// Truncate a string to `max_len` characters, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

/// Single-line preview of a setting value; newlines are shown as `\n`.
#[must_use]
pub fn preview(value: &SettingValue) -> String {
    let text = match value {
        SettingValue::Text(s) => s.replace('\n', "\\n"),
        other => other.to_json().to_string(),
    };
    truncate(&text, DEFAULT_MAX_LEN)
}

/// Print that an invocation is starting.
pub fn print_invocation_start(invocation: &CommandInvocation) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        "[INVOKE]".blue().bold(),
        invocation.to_string().cyan()
    );
    let _ = io::stdout().flush();
}

/// Print a structured result as pretty JSON with a status tag.
pub fn print_result(result: &StructuredResult) {
    let tag = if result.success() == Some(true) {
        "[OK]".green().bold().to_string()
    } else {
        "[FAILED]".yellow().bold().to_string()
    };
    println!("{} {tag}", timestamp().dimmed());
    match serde_json::to_string_pretty(result.as_value()) {
        Ok(pretty) => println!("{pretty}"),
        Err(_) => println!("{}", result.as_value()),
    }
    let _ = io::stdout().flush();
}

/// Print a bridge failure.
pub fn print_failure(error: &BridgeError) {
    eprintln!(
        "{} {} {} {}",
        timestamp().dimmed(),
        "[ERROR]".red().bold(),
        format!("({})", error.kind()).dimmed(),
        error
    );
}

/// Print all settings as `key = value` lines.
pub fn print_settings(settings: &BTreeMap<String, SettingValue>) {
    let width = settings.keys().map(String::len).max().unwrap_or(0);
    for (key, value) in settings {
        println!(
            "{:width$}  {}  {}",
            key.bold(),
            value.kind().to_string().dimmed(),
            preview(value)
        );
    }
}

/// Print log entries, newest first as given.
pub fn print_logs(entries: &[LogEntry]) {
    if entries.is_empty() {
        println!("{}", "No log entries".dimmed());
        return;
    }
    for entry in entries {
        let level = match entry.level {
            LogLevel::Debug => "DEBUG".dimmed().to_string(),
            LogLevel::Info => "INFO".green().to_string(),
            LogLevel::Warning => "WARN".yellow().to_string(),
            LogLevel::Error => "ERROR".red().to_string(),
            LogLevel::Unknown => "?".magenta().to_string(),
        };
        println!("{} {level:>5} {}", entry.created_at.dimmed(), entry.message);
    }
}
