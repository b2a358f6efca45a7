//! Splits a runtime log stream into lines tagged with their output stream
//!
//! Non-TTY containers interleave stdout and stderr in frames:
//!
//! ```text
//! [stream: u8][0][0][0][length: u32 big-endian][payload: length bytes]
//! ```
//!
//! TTY containers produce a single unframed stream that is reported as
//! stdout. A frame may carry several lines or only part of one, so partial
//! lines are held per stream until their newline arrives or they reach
//! [`MAX_LINE_LEN`], whichever comes first.

use crate::models::StdType;
use std::collections::VecDeque;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

pub const HEADER_LEN: usize = 8;

/// Largest frame payload accepted from the runtime
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Lines longer than this are emitted in pieces
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Build one frame in the multiplexed format
pub fn encode_frame(stream: StdType, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(stream.bits() as u8);
    frame.extend_from_slice(&[0, 0, 0]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// One complete line, newline included when present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub stream: StdType,
    pub bytes: Vec<u8>,
}

pub struct LineReader<R> {
    reader: BufReader<R>,
    tty: bool,
    stdout_partial: Vec<u8>,
    stderr_partial: Vec<u8>,
    ready: VecDeque<RawLine>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R, tty: bool) -> Self {
        Self {
            reader: BufReader::new(reader),
            tty,
            stdout_partial: Vec::new(),
            stderr_partial: Vec::new(),
            ready: VecDeque::new(),
            eof: false,
        }
    }

    /// Next complete line, or `None` at end of stream
    ///
    /// A trailing line without newline is returned once the stream ends.
    pub async fn next_line(&mut self) -> io::Result<Option<RawLine>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(None);
            }

            if self.tty {
                let mut bytes = Vec::new();
                let mut limited = (&mut self.reader).take(MAX_LINE_LEN as u64);
                if limited.read_until(b'\n', &mut bytes).await? == 0 {
                    self.eof = true;
                } else {
                    self.ready.push_back(RawLine {
                        stream: StdType::STDOUT,
                        bytes,
                    });
                }
                continue;
            }

            match self.read_frame().await? {
                Some((stream, payload)) => self.split_lines(stream, &payload),
                None => {
                    self.eof = true;
                    self.flush_partials();
                }
            }
        }
    }

    async fn read_frame(&mut self) -> io::Result<Option<(StdType, Vec<u8>)>> {
        // a clean end of stream is only allowed on a frame boundary
        if self.reader.fill_buf().await?.is_empty() {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_LEN];
        self.reader.read_exact(&mut header).await?;

        let stream = match header[0] {
            1 => StdType::STDOUT,
            // stdin echo and runtime-level errors are surfaced with stderr
            0 | 2 | 3 => StdType::STDERR,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown stream type {} in log frame header", other),
                ))
            }
        };
        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("log frame of {} bytes exceeds {} byte limit", len, MAX_FRAME_LEN),
            ));
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload).await?;
        Ok(Some((stream, payload)))
    }

    fn split_lines(&mut self, stream: StdType, payload: &[u8]) {
        let partial = if stream == StdType::STDOUT {
            &mut self.stdout_partial
        } else {
            &mut self.stderr_partial
        };
        partial.extend_from_slice(payload);

        while let Some(pos) = partial.iter().position(|b| *b == b'\n') {
            let bytes: Vec<u8> = partial.drain(..=pos).collect();
            self.ready.push_back(RawLine { stream, bytes });
        }
        while partial.len() >= MAX_LINE_LEN {
            let bytes: Vec<u8> = partial.drain(..MAX_LINE_LEN).collect();
            self.ready.push_back(RawLine { stream, bytes });
        }
    }

    fn flush_partials(&mut self) {
        if !self.stdout_partial.is_empty() {
            self.ready.push_back(RawLine {
                stream: StdType::STDOUT,
                bytes: std::mem::take(&mut self.stdout_partial),
            });
        }
        if !self.stderr_partial.is_empty() {
            self.ready.push_back(RawLine {
                stream: StdType::STDERR,
                bytes: std::mem::take(&mut self.stderr_partial),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all(bytes: Vec<u8>, tty: bool) -> io::Result<Vec<RawLine>> {
        let mut reader = LineReader::new(std::io::Cursor::new(bytes), tty);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await? {
            lines.push(line);
        }
        Ok(lines)
    }

    #[tokio::test]
    async fn test_demultiplexes_streams() {
        let mut bytes = encode_frame(StdType::STDOUT, b"out one\n");
        bytes.extend(encode_frame(StdType::STDERR, b"err one\n"));
        bytes.extend(encode_frame(StdType::STDOUT, b"out two\n"));

        let lines = read_all(bytes, false).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].stream, StdType::STDOUT);
        assert_eq!(lines[0].bytes, b"out one\n");
        assert_eq!(lines[1].stream, StdType::STDERR);
        assert_eq!(lines[1].bytes, b"err one\n");
        assert_eq!(lines[2].bytes, b"out two\n");
    }

    #[tokio::test]
    async fn test_lines_split_across_frames() {
        let mut bytes = encode_frame(StdType::STDOUT, b"hel");
        bytes.extend(encode_frame(StdType::STDERR, b"oops\n"));
        bytes.extend(encode_frame(StdType::STDOUT, b"lo\nsecond\nthi"));
        bytes.extend(encode_frame(StdType::STDOUT, b"rd"));

        let lines = read_all(bytes, false).await.unwrap();
        let text: Vec<_> = lines
            .iter()
            .map(|l| String::from_utf8_lossy(&l.bytes).to_string())
            .collect();
        assert_eq!(text, vec!["oops\n", "hello\n", "second\n", "third"]);
        assert_eq!(lines[0].stream, StdType::STDERR);
        assert_eq!(lines[3].stream, StdType::STDOUT);
    }

    #[tokio::test]
    async fn test_tty_stream_is_unframed() {
        let lines = read_all(b"a\nb\nc".to_vec(), true).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.stream == StdType::STDOUT));
        assert_eq!(lines[2].bytes, b"c");
    }

    #[tokio::test]
    async fn test_truncated_frame_is_an_error() {
        let mut bytes = encode_frame(StdType::STDOUT, b"complete\n");
        let partial = encode_frame(StdType::STDOUT, b"cut short\n");
        bytes.extend_from_slice(&partial[..12]);

        let mut reader = LineReader::new(std::io::Cursor::new(bytes), false);
        assert!(reader.next_line().await.unwrap().is_some());
        let err = reader.next_line().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_unknown_stream_byte() {
        let mut bytes = encode_frame(StdType::STDOUT, b"x\n");
        bytes[0] = 9;
        let err = read_all(bytes, false).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let header = vec![1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        let err = read_all(header, false).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_endless_line_is_split() {
        let chunk = vec![b'x'; 16 * 1024];
        let mut bytes = Vec::new();
        for _ in 0..9 {
            bytes.extend(encode_frame(StdType::STDOUT, &chunk));
        }
        bytes.extend(encode_frame(StdType::STDOUT, b"\n"));

        let lines = read_all(bytes, false).await.unwrap();
        let sizes: Vec<_> = lines.iter().map(|l| l.bytes.len()).collect();
        assert_eq!(sizes, vec![MAX_LINE_LEN, MAX_LINE_LEN, 16 * 1024 + 1]);
        assert!(lines.iter().all(|l| l.stream == StdType::STDOUT));
    }

    #[tokio::test]
    async fn test_endless_tty_line_is_split() {
        let mut bytes = vec![b'y'; MAX_LINE_LEN + 10];
        bytes.push(b'\n');
        let lines = read_all(bytes, true).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].bytes.len(), MAX_LINE_LEN);
        assert_eq!(lines[1].bytes.len(), 11);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        assert!(read_all(Vec::new(), false).await.unwrap().is_empty());
        assert!(read_all(Vec::new(), true).await.unwrap().is_empty());
    }
}
