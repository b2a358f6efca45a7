//! Converts a raw log stream into ordered, positioned [`LogEvent`]s
//!
//! Two tasks cooperate: a reader that demultiplexes and parses lines, and a
//! processor that holds one event back to decide its position. The
//! processor waits up to [`PEEK_TIMEOUT`] for a follower; if none shows up
//! the held event is released so a live tail never stalls.

use super::demux::LineReader;
use super::{parser, LogEvent, LogPosition, LogSession};
use crate::error::{Error, Result};
use crate::models::Container;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Capacity of the event output channel
pub const EVENT_BUFFER: usize = 256;

/// How long the processor waits for a following event
pub const PEEK_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Idle,
    Streaming,
    Closed,
    Errored,
}

/// A log session backed by local reader/processor tasks
pub struct EventGenerator {
    session: LogSession,
    state: watch::Receiver<GeneratorState>,
}

impl EventGenerator {
    /// Start generating events for `container` from `reader`
    ///
    /// Cancelling `cancel` (or dropping the generator) stops both tasks.
    pub fn new<R>(reader: R, container: &Container, cancel: CancellationToken) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let cancel = cancel.child_token();
        let (state_tx, state_rx) = watch::channel(GeneratorState::Idle);
        let (line_tx, line_rx) = mpsc::channel(EVENT_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (error_tx, error_rx) = oneshot::channel();

        let lines = LineReader::new(reader, container.tty);
        tokio::spawn(read_events(
            lines,
            container.id.clone(),
            line_tx,
            cancel.clone(),
        ));
        tokio::spawn(process_events(
            line_rx,
            event_tx,
            error_tx,
            state_tx,
            cancel.clone(),
        ));

        Self {
            session: LogSession::new(event_rx, error_rx, cancel),
            state: state_rx,
        }
    }

    pub fn state(&self) -> GeneratorState {
        *self.state.borrow()
    }

    pub async fn recv(&mut self) -> Option<LogEvent> {
        self.session.recv().await
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.session.take_error()
    }

    pub fn into_session(self) -> LogSession {
        self.session
    }
}

async fn read_events<R>(
    mut lines: LineReader<R>,
    container_id: String,
    tx: mpsc::Sender<Result<LogEvent>>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut next_id: u32 = 1;
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return,
            line = lines.next_line() => line,
        };

        let item = match line {
            Ok(Some(line)) => {
                let event = parser::parse_line(&line.bytes, line.stream, next_id, &container_id);
                next_id = next_id.saturating_add(1);
                Ok(event)
            }
            Ok(None) => return,
            Err(err) => {
                warn!(container_id = %container_id, error = %err, "Log stream read failed");
                Err(Error::Stream(err.to_string()))
            }
        };
        let failed = item.is_err();

        tokio::select! {
            _ = cancel.cancelled() => return,
            res = tx.send(item) => {
                if res.is_err() || failed {
                    return;
                }
            }
        }
    }
}

async fn process_events(
    mut rx: mpsc::Receiver<Result<LogEvent>>,
    tx: mpsc::Sender<LogEvent>,
    error_tx: oneshot::Sender<Error>,
    state: watch::Sender<GeneratorState>,
    cancel: CancellationToken,
) {
    let _ = state.send(GeneratorState::Streaming);
    let mut error_tx = Some(error_tx);
    let mut held: Option<LogEvent> = None;
    let mut first = true;

    let final_state = loop {
        let next = match held.take() {
            Some(event) => {
                tokio::select! {
                    _ = cancel.cancelled() => break GeneratorState::Closed,
                    peeked = tokio::time::timeout(PEEK_TIMEOUT, rx.recv()) => match peeked {
                        Ok(item) => {
                            held = Some(event);
                            item
                        }
                        Err(_) => {
                            // nothing followed in time: release what we hold
                            if !forward(&tx, event, &cancel).await {
                                break GeneratorState::Closed;
                            }
                            continue;
                        }
                    },
                }
            }
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => break GeneratorState::Closed,
                    item = rx.recv() => item,
                }
            }
        };

        match next {
            Some(Ok(mut event)) => {
                event.position = if first {
                    LogPosition::Start
                } else {
                    LogPosition::Middle
                };
                first = false;
                if let Some(previous) = held.replace(event) {
                    if !forward(&tx, previous, &cancel).await {
                        break GeneratorState::Closed;
                    }
                }
            }
            Some(Err(err)) => {
                if let Some(previous) = held.take() {
                    forward(&tx, previous, &cancel).await;
                }
                if let Some(error_tx) = error_tx.take() {
                    let _ = error_tx.send(err);
                }
                break GeneratorState::Errored;
            }
            None => {
                if let Some(mut last) = held.take() {
                    if last.position != LogPosition::Start {
                        last.position = LogPosition::End;
                    }
                    forward(&tx, last, &cancel).await;
                }
                break GeneratorState::Closed;
            }
        }
    };

    debug!(state = ?final_state, "Log event generator finished");
    let _ = state.send(final_state);
    // stops the reader when the consumer went away first
    cancel.cancel();
}

/// Send one event, giving up if the consumer is gone or we are cancelled
async fn forward(tx: &mpsc::Sender<LogEvent>, event: LogEvent, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        res = tx.send(event) => res.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::demux::encode_frame;
    use crate::logs::LogMessage;
    use crate::models::{ContainerState, StdType};
    use std::io;
    use tokio::io::AsyncWriteExt;

    fn container(tty: bool) -> Container {
        let mut c = Container::new("abc123", "web", ContainerState::Running);
        c.tty = tty;
        c
    }

    fn text(event: &LogEvent) -> String {
        match &event.message {
            LogMessage::Simple(s) => s.clone(),
            LogMessage::Complex(m) => serde_json::to_string(m).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_positions_and_ids() {
        let mut bytes = Vec::new();
        for line in ["one\n", "two\n", "three\n"] {
            bytes.extend(encode_frame(StdType::STDOUT, line.as_bytes()));
        }
        let generator = EventGenerator::new(
            std::io::Cursor::new(bytes),
            &container(false),
            CancellationToken::new(),
        );

        let events = generator.into_session().collect().await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events.iter().map(|e| e.position).collect::<Vec<_>>(),
            vec![LogPosition::Start, LogPosition::Middle, LogPosition::End]
        );
        assert_eq!(events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(text(&events[2]), "three");
        assert!(events.iter().all(|e| e.container_id == "abc123"));
    }

    #[tokio::test]
    async fn test_ids_increase_across_interleaved_streams() {
        let mut bytes = Vec::new();
        for (stream, line) in [
            (StdType::STDOUT, "a\n"),
            (StdType::STDERR, "b\n"),
            (StdType::STDOUT, "c\n"),
            (StdType::STDERR, "d\n"),
            (StdType::STDERR, "e\n"),
        ] {
            bytes.extend(encode_frame(stream, line.as_bytes()));
        }
        let generator = EventGenerator::new(
            std::io::Cursor::new(bytes),
            &container(false),
            CancellationToken::new(),
        );

        let events = generator.into_session().collect().await.unwrap();
        let seen: Vec<_> = events.iter().map(|e| (e.id, e.stream, text(e))).collect();
        assert_eq!(
            seen,
            vec![
                (1, StdType::STDOUT, "a".to_string()),
                (2, StdType::STDERR, "b".to_string()),
                (3, StdType::STDOUT, "c".to_string()),
                (4, StdType::STDERR, "d".to_string()),
                (5, StdType::STDERR, "e".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_single_line_is_start() {
        let bytes = encode_frame(StdType::STDERR, b"only\n");
        let generator =
            EventGenerator::new(std::io::Cursor::new(bytes), &container(false), CancellationToken::new());
        let events = generator.into_session().collect().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].position, LogPosition::Start);
        assert_eq!(events[0].stream, StdType::STDERR);
    }

    #[tokio::test]
    async fn test_empty_stream_closes_without_error() {
        let mut generator = EventGenerator::new(
            std::io::Cursor::new(Vec::new()),
            &container(false),
            CancellationToken::new(),
        );
        assert!(generator.recv().await.is_none());
        assert!(generator.take_error().is_none());
        assert_eq!(generator.state(), GeneratorState::Closed);
    }

    #[tokio::test]
    async fn test_tty_lines() {
        let generator = EventGenerator::new(
            std::io::Cursor::new(b"{\"level\":\"warn\"}\nplain\n".to_vec()),
            &container(true),
            CancellationToken::new(),
        );
        let events = generator.into_session().collect().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level.as_deref(), Some("warn"));
        assert!(events.iter().all(|e| e.stream == StdType::STDOUT));
    }

    #[tokio::test]
    async fn test_read_error_after_events() {
        let mut payload = encode_frame(StdType::STDOUT, b"first\n");
        payload.extend(encode_frame(StdType::STDOUT, b"second\n"));
        let reader = tokio_test::io::Builder::new()
            .read(&payload)
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "daemon went away"))
            .build();

        let mut generator = EventGenerator::new(reader, &container(false), CancellationToken::new());
        let mut events = Vec::new();
        while let Some(event) = generator.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].position, LogPosition::Start);
        let err = generator.take_error().expect("error should be reported");
        assert!(matches!(err, Error::Stream(_)));
        assert_eq!(generator.state(), GeneratorState::Errored);
    }

    #[tokio::test]
    async fn test_live_tail_releases_held_event() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut generator = EventGenerator::new(reader, &container(true), CancellationToken::new());

        writer.write_all(b"waiting for more\n").await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(2), generator.recv())
            .await
            .expect("held event should be released after the peek timeout")
            .unwrap();
        assert_eq!(text(&event), "waiting for more");
        assert_eq!(event.position, LogPosition::Start);

        writer.write_all(b"next\n").await.unwrap();
        drop(writer);
        let event = generator.recv().await.unwrap();
        assert_eq!(event.position, LogPosition::End);
        assert!(generator.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_stops_session() {
        let (_writer, reader) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let mut generator = EventGenerator::new(reader, &container(true), cancel.clone());

        cancel.cancel();
        let next = tokio::time::timeout(Duration::from_secs(2), generator.recv())
            .await
            .expect("cancellation should close the session");
        assert!(next.is_none());
        assert!(generator.take_error().is_none());
    }
}
