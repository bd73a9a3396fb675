//! Shared plumbing for line-oriented streaming responses (NDJSON and SSE).

use futures_util::StreamExt;
use reqwest::Response;
use tokio::sync::mpsc;

use super::provider::FragmentStream;
use super::types::LlmError;

const STREAM_BUFFER: usize = 32;

/// What a single decoded line means for the stream.
#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent {
    Fragment(String),
    Skip,
    Done,
    Error(String),
}

/// Accumulates raw bytes and yields complete lines; a line split across
/// network chunks is held back until its terminator arrives.
#[derive(Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }

    /// Whatever remains once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Spawns a reader task that forwards decoded fragments. The task stops,
/// dropping the HTTP response, as soon as the receiver goes away.
pub fn spawn_fragment_stream<F>(response: Response, decode: F) -> FragmentStream
where
    F: Fn(&str) -> LineEvent + Send + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let mut body = response.bytes_stream();

    tokio::spawn(async move {
        let mut buffer = LineBuffer::default();
        loop {
            let item = tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!("Fragment receiver dropped; aborting backend stream");
                    return;
                }
                item = body.next() => item,
            };

            let (lines, ended) = match item {
                Some(Ok(bytes)) => (buffer.push(&bytes), false),
                Some(Err(e)) => {
                    let _ = tx.send(Err(LlmError::Request(e))).await;
                    return;
                }
                None => (buffer.finish().into_iter().collect::<Vec<_>>(), true),
            };

            for line in lines {
                if line.is_empty() {
                    continue;
                }
                match decode(&line) {
                    LineEvent::Fragment(text) => {
                        if text.is_empty() {
                            continue;
                        }
                        if tx.send(Ok(text)).await.is_err() {
                            return;
                        }
                    }
                    LineEvent::Skip => {}
                    LineEvent::Done => return,
                    LineEvent::Error(message) => {
                        let _ = tx.send(Err(LlmError::Decode(message))).await;
                        return;
                    }
                }
            }

            if ended {
                return;
            }
        }
    });

    rx
}
