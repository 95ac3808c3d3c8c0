//! Terminal output: version tables, histories and messages.
//!
//! Layout (width, truncation, padding) is computed here with Unicode-aware
//! widths; `render_*` functions return strings so they can be tested without
//! a terminal, and `print_*` wrappers write them to stdout.

use chrono::{DateTime, Utc};
use colored::*;
use snapver::api::{CmdMessage, DisplayVersion, MessageLevel};
use snapver::config::SnapverConfig;
use snapver::model::{ChangeCount, MasterDocument, MetadataEntry};
use std::fmt::Write;
use unicode_width::UnicodeWidthStr;

pub const LINE_WIDTH: usize = 100;
pub const TIME_WIDTH: usize = 14;
const LABEL_WIDTH: usize = 6;
const CHANGES_WIDTH: usize = 9;
const LINES_WIDTH: usize = 7;

pub fn render_messages(messages: &[CmdMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let line = match message.level {
            MessageLevel::Info => message.content.dimmed(),
            MessageLevel::Success => message.content.green(),
            MessageLevel::Warning => message.content.yellow(),
            MessageLevel::Error => message.content.red(),
        };
        let _ = writeln!(out, "{}", line);
    }
    out
}

pub fn print_messages(messages: &[CmdMessage]) {
    print!("{}", render_messages(messages));
}

/// Change column: count with a trend sign from the total line count of the
/// older neighbour, `n/a` when no diff was possible.
fn change_cell(row: &DisplayVersion, older: Option<&DisplayVersion>) -> String {
    match &row.record.changed_lines {
        Some(ChangeCount::Lines(n)) => {
            let sign = match older {
                Some(prev) if row.record.file.total_lines > prev.record.file.total_lines => "+",
                Some(prev) if row.record.file.total_lines < prev.record.file.total_lines => "-",
                _ => "",
            };
            format!("{}{}", sign, n)
        }
        Some(ChangeCount::Unavailable(_)) | None => "n/a".to_string(),
    }
}

/// Versions are expected newest first.
pub fn render_versions(rows: &[DisplayVersion]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let header = format!(
        "{:>tw$}  {:<lw$}{:>cw$}{:>nw$}  {}",
        "created",
        "ver",
        "changes",
        "lines",
        "tag",
        tw = TIME_WIDTH,
        lw = LABEL_WIDTH,
        cw = CHANGES_WIDTH,
        nw = LINES_WIDTH
    );
    let _ = writeln!(out, "{}", header.dimmed());

    for (i, row) in rows.iter().enumerate() {
        let time = format_time_ago(row.record.file.created_at);
        let label = format!("{:<lw$}", row.record.label(), lw = LABEL_WIDTH);
        let changes = format!(
            "{:>cw$}",
            change_cell(row, rows.get(i + 1)),
            cw = CHANGES_WIDTH
        );
        let lines = format!("{:>nw$}", row.record.file.total_lines, nw = LINES_WIDTH);

        let fixed = TIME_WIDTH + 2 + LABEL_WIDTH + CHANGES_WIDTH + LINES_WIDTH + 2;
        let tag = match &row.tag {
            Some(tag) => truncate_to_width(tag, LINE_WIDTH.saturating_sub(fixed)).normal(),
            None => "?".red(),
        };

        let changes = if changes.trim_start().starts_with('+') {
            changes.green()
        } else if changes.trim_start().starts_with('-') {
            changes.red()
        } else {
            changes.normal()
        };

        let _ = writeln!(
            out,
            "{}  {}{}{}  {}",
            time.dimmed(),
            label.yellow(),
            changes,
            lines,
            tag
        );
    }
    out
}

pub fn print_versions(rows: &[DisplayVersion]) {
    print!("{}", render_versions(rows));
}

pub fn render_history(entries: &[MetadataEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let when = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let previous = if entry.previous_value.is_empty() {
            "(none)".dimmed()
        } else {
            one_line(&entry.previous_value).normal()
        };
        let _ = writeln!(
            out,
            "{}  {} -> {}",
            when.dimmed(),
            previous,
            one_line(&entry.new_value).bold()
        );
    }
    out
}

pub fn print_history(entries: &[MetadataEntry]) {
    print!("{}", render_history(entries));
}

pub fn render_masters(masters: &[MasterDocument]) -> String {
    let mut out = String::new();
    for master in masters {
        let name = master
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let time = master
            .modified
            .map(format_time_ago)
            .unwrap_or_else(|| format!("{:>w$}", "?", w = TIME_WIDTH));
        let count = format!("{} backups", master.backup_count);
        let available = LINE_WIDTH.saturating_sub(TIME_WIDTH + 2 + count.width() + 2);
        let name = truncate_to_width(&name, available);
        let padding = available.saturating_sub(name.width());

        let _ = writeln!(
            out,
            "{}  {}{}  {}",
            time.dimmed(),
            name,
            " ".repeat(padding),
            if master.backup_count == 0 {
                count.dimmed()
            } else {
                count.normal()
            }
        );
    }
    out
}

pub fn print_masters(masters: &[MasterDocument]) {
    print!("{}", render_masters(masters));
}

pub fn print_config(config: &SnapverConfig) {
    for (key, value) in config.entries() {
        let value = if value.is_empty() {
            "(unset)".dimmed()
        } else {
            value.normal()
        };
        println!("{} = {}", key, value);
    }
}

fn one_line(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    let s = one_line(s);
    if s.width() <= max_width {
        return s;
    }

    let mut result = String::new();
    let mut current_width = 0;
    let limit = max_width.saturating_sub(1);

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);

    let formatter = timeago::Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());

    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
