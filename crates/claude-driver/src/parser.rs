use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use crate::event::{AgentEvent, RawEvent};

/// Initial capacity of the stdout read buffer. Tool results can embed whole
/// files, so individual lines may run to tens of megabytes; the line
/// accumulator grows as needed beyond this.
const READ_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Parse a single stream-json line into typed events.
///
/// Returns an empty vec for blank lines, lines that fail JSON decoding (the
/// agent occasionally emits partial lines at stream end), and decodable lines
/// whose `type` is not one we render.
pub fn parse_line(line: &str) -> Vec<AgentEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<RawEvent>(trimmed) {
        Ok(raw) => raw.into_events(),
        Err(_) => Vec::new(),
    }
}

/// Lazy event parser over a line-delimited JSON byte stream.
///
/// Single-pass and not restartable: events are produced one at a time as the
/// caller pulls them, and the sequence ends at end-of-input or on an
/// unrecoverable read error.
pub struct EventParser<R> {
    lines: Lines<BufReader<R>>,
    pending: VecDeque<AgentEvent>,
}

impl<R: AsyncRead + Unpin> EventParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::with_capacity(READ_BUFFER_CAPACITY, reader).lines(),
            pending: VecDeque::new(),
        }
    }

    /// Pull the next event, reading further input only when needed.
    ///
    /// Returns `Ok(None)` at end of input.
    pub async fn next_event(&mut self) -> std::io::Result<Option<AgentEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            match self.lines.next_line().await? {
                None => return Ok(None),
                Some(line) => self.pending.extend(parse_line(&line)),
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
