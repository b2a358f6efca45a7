//! Log pipeline: frame demultiplexing, line parsing and event sessions

pub mod demux;
pub mod generator;
pub mod parser;

pub use generator::{EventGenerator, GeneratorState, EVENT_BUFFER, PEEK_TIMEOUT};
pub use parser::parse_line;

use crate::error::{Error, Result};
use crate::models::StdType;
use serde::Serialize;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, DropGuard};

/// JSON object whose keys keep their source order
pub type OrderedMap = serde_json::Map<String, serde_json::Value>;

/// Two timestamps closer than this are treated as the same moment
pub const CLOSE_TO_TIME_SECS: i64 = 10;

/// Body of a log line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogMessage {
    Simple(String),
    Complex(OrderedMap),
}

impl LogMessage {
    /// Plain text for simple lines, compact JSON for structured ones
    pub fn to_text(&self) -> String {
        match self {
            LogMessage::Simple(text) => text.clone(),
            LogMessage::Complex(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| String::from("{}"))
            }
        }
    }
}

/// Where an event sits in its burst of lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogPosition {
    Start,
    Middle,
    End,
}

impl LogPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogPosition::Start => "start",
            LogPosition::Middle => "middle",
            LogPosition::End => "end",
        }
    }

    /// Lenient decode used on the wire; anything unrecognised is `Middle`
    pub fn from_name(name: &str) -> Self {
        match name {
            "start" => LogPosition::Start,
            "end" => LogPosition::End,
            _ => LogPosition::Middle,
        }
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    #[serde(rename = "m")]
    pub message: LogMessage,
    /// Unix seconds
    #[serde(rename = "ts")]
    pub timestamp: i64,
    pub id: u32,
    #[serde(rename = "l", skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(rename = "p")]
    pub position: LogPosition,
    #[serde(rename = "s")]
    pub stream: StdType,
    #[serde(rename = "c")]
    pub container_id: String,
}

impl LogEvent {
    pub fn has_level(&self) -> bool {
        self.level.is_some()
    }

    /// True when the two timestamps are less than ten seconds apart
    pub fn is_close_to_time(&self, other: &LogEvent) -> bool {
        (self.timestamp - other.timestamp).abs() < CLOSE_TO_TIME_SECS
    }
}

/// Consumer side of a running log stream
///
/// Events arrive on a bounded channel. When the channel closes, a failure,
/// if there was one, is already waiting in the error slot. Dropping the
/// session stops the producer.
pub struct LogSession {
    events: mpsc::Receiver<LogEvent>,
    errors: oneshot::Receiver<Error>,
    _guard: DropGuard,
}

impl LogSession {
    pub(crate) fn new(
        events: mpsc::Receiver<LogEvent>,
        errors: oneshot::Receiver<Error>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            errors,
            _guard: cancel.drop_guard(),
        }
    }

    /// Next event, or `None` once the stream has finished
    pub async fn recv(&mut self) -> Option<LogEvent> {
        self.events.recv().await
    }

    /// Error that terminated the stream, if any
    pub fn take_error(&mut self) -> Option<Error> {
        self.errors.try_recv().ok()
    }

    /// Drain the whole session, failing if the stream ended with an error
    pub async fn collect(mut self) -> Result<Vec<LogEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        match self.take_error() {
            Some(err) => Err(err),
            None => Ok(events),
        }
    }
}

impl fmt::Debug for LogSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSession").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: i64) -> LogEvent {
        LogEvent {
            message: LogMessage::Simple("hello".to_string()),
            timestamp,
            id: 1,
            level: None,
            position: LogPosition::Middle,
            stream: StdType::STDOUT,
            container_id: "abc".to_string(),
        }
    }

    #[test]
    fn test_close_to_time() {
        let a = event(1_700_000_000);
        assert!(a.is_close_to_time(&event(1_700_000_009)));
        assert!(event(1_700_000_009).is_close_to_time(&a));
        assert!(!a.is_close_to_time(&event(1_700_000_010)));
        assert!(!a.is_close_to_time(&event(1_699_999_990)));
    }

    #[test]
    fn test_serialized_shape() {
        let mut map = OrderedMap::new();
        map.insert("zeta".to_string(), serde_json::json!(1));
        map.insert("alpha".to_string(), serde_json::json!("x"));
        let mut ev = event(42);
        ev.message = LogMessage::Complex(map);
        ev.level = Some("info".to_string());
        ev.position = LogPosition::Start;

        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(
            json,
            r#"{"m":{"zeta":1,"alpha":"x"},"ts":42,"id":1,"l":"info","p":"start","s":"stdout","c":"abc"}"#
        );
    }

    #[test]
    fn test_simple_message_serializes_as_string() {
        let json = serde_json::to_value(event(1)).unwrap();
        assert_eq!(json["m"], "hello");
        assert!(json.get("l").is_none());
    }

    #[test]
    fn test_position_names() {
        assert_eq!(LogPosition::from_name("end"), LogPosition::End);
        assert_eq!(LogPosition::from_name("bogus"), LogPosition::Middle);
        assert_eq!(LogPosition::Start.to_string(), "start");
    }
}
