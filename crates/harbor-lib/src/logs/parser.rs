//! Turns one raw log line into a [`LogEvent`]

use super::{LogEvent, LogMessage, LogPosition, OrderedMap};
use crate::models::StdType;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Keys (compared case-insensitively) that carry a severity in JSON logs
pub const LEVEL_KEYS: &[&str] = &["level", "severity", "lvl", "loglevel", "log_level", "log.level"];

/// Parse a raw line
///
/// Never fails: anything that is not a JSON object becomes a simple message.
/// The position is left as `Middle`; the generator assigns the real one.
pub fn parse_line(raw: &[u8], stream: StdType, id: u32, container_id: &str) -> LogEvent {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches(|c: char| c == '\n' || c == '\r');
    let (timestamp, body) = split_timestamp(text);

    let (message, level) = match parse_object(body) {
        Some(map) => {
            let level = extract_level(&map);
            (LogMessage::Complex(map), level)
        }
        None => (LogMessage::Simple(body.to_string()), None),
    };

    LogEvent {
        message,
        timestamp: timestamp.unwrap_or_else(|| Utc::now().timestamp()),
        id,
        level,
        position: LogPosition::Middle,
        stream,
        container_id: container_id.to_string(),
    }
}

/// Split an RFC 3339 prefix (as written by the runtime) from the line body
fn split_timestamp(text: &str) -> (Option<i64>, &str) {
    if let Some((prefix, rest)) = text.split_once(' ') {
        if let Ok(ts) = DateTime::parse_from_rfc3339(prefix) {
            return (Some(ts.timestamp()), rest);
        }
    }
    // empty line written with timestamps enabled
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return (Some(ts.timestamp()), "");
    }
    (None, text)
}

fn parse_object(body: &str) -> Option<OrderedMap> {
    let trimmed = body.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }
    serde_json::from_str::<OrderedMap>(trimmed).ok()
}

fn extract_level(map: &OrderedMap) -> Option<String> {
    map.iter()
        .filter(|(key, _)| {
            let key = key.to_ascii_lowercase();
            LEVEL_KEYS.contains(&key.as_str())
        })
        .find_map(|(_, value)| level_from_value(value))
}

fn level_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let level = s.trim().to_ascii_lowercase();
            (!level.is_empty()).then_some(level)
        }
        Value::Number(n) => n.as_u64().and_then(numeric_level).map(str::to_string),
        _ => None,
    }
}

/// pino / bunyan numeric levels
fn numeric_level(level: u64) -> Option<&'static str> {
    match level {
        10 => Some("trace"),
        20 => Some("debug"),
        30 => Some("info"),
        40 => Some("warn"),
        50 => Some("error"),
        60 => Some("fatal"),
        _ => None,
    }
}
