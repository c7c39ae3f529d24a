use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{Stream, StreamExt, stream};

use super::{AdviceError, AdviceStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental `text/event-stream` decoder. Chunks may split lines and
/// multi-byte characters anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1])
                .trim_end_matches('\r')
                .to_string();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Flushes a trailing line and any event not closed by a blank line.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        if let Some(event) = self.dispatch() {
            events.push(event);
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// What one provider event means for the answer being streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    Text(String),
    Skip,
    Done,
    Error(String),
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>;

struct RelayState {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    parse: fn(&SseEvent) -> Delta,
    body_done: bool,
    finished: bool,
}

/// Relays the text deltas of a provider's event stream. The stream ends on
/// the provider's done marker, at end of body, or right after an error.
pub fn relay_text(response: reqwest::Response, parse: fn(&SseEvent) -> Delta) -> AdviceStream {
    let body: ByteStream = Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec())),
    );
    relay_bytes(body, parse)
}

fn relay_bytes(body: ByteStream, parse: fn(&SseEvent) -> Delta) -> AdviceStream {
    let state = RelayState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        parse,
        body_done: false,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(event) = state.pending.pop_front() {
                match (state.parse)(&event) {
                    Delta::Text(text) if !text.is_empty() => return Some((Ok(text), state)),
                    Delta::Text(_) | Delta::Skip => continue,
                    Delta::Done => return None,
                    Delta::Error(message) => {
                        state.finished = true;
                        return Some((Err(AdviceError::Provider(message)), state));
                    }
                }
            }

            if state.body_done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(&bytes);
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(AdviceError::Provider(e.to_string())), state));
                }
                None => {
                    state.body_done = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    }))
}
