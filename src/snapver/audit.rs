//! # Audit Trail Encoding
//!
//! An audit trail is stored as UTF-8 text, one record per line:
//!
//! ```text
//! 2024-05-01T09:00:00.000000Z<TAB>previous<TAB>new
//! ```
//!
//! Field values are escaped so that any tag text survives a round trip:
//! `\\` for a backslash, `\t` for a tab, `\n` for a newline and `\r` for a
//! carriage return. Raw tabs and newlines therefore only ever appear as
//! delimiters.
//!
//! Lines written by the earlier desktop tool (`[2024-05-01 09:00:00] value`)
//! are still accepted. They carry no previous value and their wall-clock
//! timestamp is read as UTC. That tool wrote multi-line values unescaped, so
//! a line that is not a record and follows a legacy record continues its
//! value.

use crate::model::{AuditTrail, MetadataEntry};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static LEGACY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\] ?(.*)$").expect("valid legacy regex")
});

pub fn encode(trail: &AuditTrail) -> String {
    let mut out = String::new();
    for entry in trail.entries() {
        out.push_str(&encode_entry(entry));
        out.push('\n');
    }
    out
}

pub fn encode_entry(entry: &MetadataEntry) -> String {
    format!(
        "{}\t{}\t{}",
        entry
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        escape(&entry.previous_value),
        escape(&entry.new_value)
    )
}

/// Parse a stored trail. Entries keep their stored order.
pub fn decode(text: &str) -> Result<AuditTrail, String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut entries: Vec<MetadataEntry> = Vec::new();
    let mut in_legacy_record = false;

    for (number, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        match decode_line(line) {
            Ok(entry) => {
                in_legacy_record = LEGACY_LINE.is_match(line);
                entries.push(entry);
            }
            Err(reason) => match entries.last_mut() {
                Some(previous) if in_legacy_record => {
                    previous.new_value.push('\n');
                    previous.new_value.push_str(line.trim_end());
                }
                _ => return Err(format!("line {}: {}", number + 1, reason)),
            },
        }
    }

    Ok(AuditTrail::from_entries(entries))
}

pub fn decode_bytes(bytes: &[u8]) -> Result<AuditTrail, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("not UTF-8: {}", e))?;
    decode(text)
}

fn decode_line(line: &str) -> Result<MetadataEntry, String> {
    if let Some(caps) = LEGACY_LINE.captures(line) {
        let naive = NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d %H:%M:%S")
            .map_err(|e| format!("bad legacy timestamp: {}", e))?;
        return Ok(MetadataEntry::new(
            naive.and_utc(),
            "",
            caps[2].trim().to_string(),
        ));
    }

    let mut fields = line.split('\t');
    let (Some(ts), Some(prev), Some(new), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err("expected 3 tab-separated fields".to_string());
    };

    let timestamp = DateTime::parse_from_rfc3339(ts)
        .map_err(|e| format!("bad timestamp '{}': {}", ts, e))?
        .with_timezone(&Utc);

    Ok(MetadataEntry {
        timestamp,
        previous_value: unescape(prev)?,
        new_value: unescape(new)?,
    })
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str) -> Result<String, String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(format!("unknown escape '\\{}'", other)),
            None => return Err("dangling escape".to_string()),
        }
    }
    Ok(out)
}
