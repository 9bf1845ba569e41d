//! Event source backed by the backend's streaming endpoint.
//!
//! The body is either SSE-framed (`data: {...}` lines) or plain
//! line-delimited JSON. Every decoded event goes through a [`RunChannel`],
//! so the same delivery guarantees hold as for the mock driver.

use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use testgen_core::JobEvent;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::channel::{JobHandle, RunChannel, RunHandlers};

/// Whether KB notes read from the stream are forwarded to the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KbNotePolicy {
    #[default]
    Forward,
    Suppress,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("invalid stream url: {0}")]
    InvalidUrl(String),
    #[error("connection failed: {0}")]
    Transport(String),
    #[error("stream request failed with HTTP status {0}")]
    Status(u16),
    #[error("malformed event `{line}`: {reason}")]
    Malformed { line: String, reason: String },
    #[error("event stream ended before the run completed")]
    EndedEarly,
}

/// Splits a byte stream into lines and decodes each into a [`JobEvent`].
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes every complete line in `chunk`; a trailing partial line is kept.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<JobEvent, StreamError>> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Decodes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<Result<JobEvent, StreamError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }
}

fn decode_line(raw: &str) -> Option<Result<JobEvent, StreamError>> {
    let line = raw.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = match line.strip_prefix("data:") {
        Some(data) => data.trim(),
        None if is_sse_field(line) => return None,
        None => line.trim(),
    };
    if payload.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<JobEvent>(payload).map_err(|err| StreamError::Malformed {
            line: payload.to_string(),
            reason: err.to_string(),
        }),
    )
}

fn is_sse_field(line: &str) -> bool {
    ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// API root, e.g. `http://localhost:8000/api/v1`.
    pub base_url: String,
    pub project_id: String,
    pub kb_note_policy: KbNotePolicy,
    pub connect_timeout: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            base_url: crate::api::DEFAULT_API_BASE_URL.to_string(),
            project_id: "1".to_string(),
            kb_note_policy: KbNotePolicy::Forward,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

pub struct EventStreamSource {
    client: reqwest::Client,
    settings: StreamSettings,
}

impl EventStreamSource {
    pub fn new(settings: StreamSettings) -> Result<Self, StreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| StreamError::Transport(err.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn stream_url(&self) -> String {
        format!(
            "{}/generate/{}/stream",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.project_id
        )
    }

    /// Delivers the stream into `channel` until a terminal event, an error,
    /// the end of the body, or cancellation.
    pub async fn run(&self, channel: &RunChannel, cancel: &CancellationToken) {
        let url = self.stream_url();
        let parsed = match reqwest::Url::parse(&url) {
            Ok(parsed) => parsed,
            Err(err) => {
                channel.fail(StreamError::InvalidUrl(err.to_string()).to_string());
                return;
            }
        };
        engine_info!("Opening event stream {url}");

        let request = self
            .client
            .get(parsed)
            .header(ACCEPT, "text/event-stream")
            .send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return,
            response = request => response,
        };
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                channel.fail(StreamError::Transport(err.to_string()).to_string());
                return;
            }
        };
        if !response.status().is_success() {
            channel.fail(StreamError::Status(response.status().as_u16()).to_string());
            return;
        }
        channel.open();

        let mut decoder = EventStreamDecoder::new();
        let mut body = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    engine_debug!("Event stream cancelled");
                    return;
                }
                chunk = body.next() => chunk,
            };
            let decoded = match chunk {
                Some(Ok(bytes)) => decoder.push(&bytes),
                Some(Err(err)) => {
                    channel.fail(StreamError::Transport(err.to_string()).to_string());
                    return;
                }
                None => break,
            };
            if self.deliver(channel, decoded) {
                return;
            }
        }

        let rest = decoder.finish();
        if self.deliver(channel, rest) {
            return;
        }
        if !channel.is_closed() {
            engine_warn!("Event stream ended without a terminal event");
            channel.fail(StreamError::EndedEarly.to_string());
        }
    }

    /// Returns `true` once delivery must stop.
    fn deliver(&self, channel: &RunChannel, decoded: Vec<Result<JobEvent, StreamError>>) -> bool {
        for event in decoded {
            match event {
                Ok(JobEvent::KbNote { .. })
                    if self.settings.kb_note_policy == KbNotePolicy::Suppress => {}
                Ok(event) => {
                    let terminal = event.is_terminal();
                    channel.emit(event);
                    if terminal || channel.is_closed() {
                        return true;
                    }
                }
                Err(err) => {
                    engine_warn!("{err}");
                    channel.fail(err.to_string());
                    return true;
                }
            }
        }
        channel.is_closed()
    }
}

/// Starts streaming on `runtime`. Cancelling the handle stops delivery and
/// drops the connection.
pub fn start_stream_run(
    runtime: &tokio::runtime::Handle,
    source: Arc<EventStreamSource>,
    handlers: Arc<dyn RunHandlers>,
) -> JobHandle {
    let channel = Arc::new(RunChannel::new(handlers));
    let cancel = CancellationToken::new();
    let stopped = channel.stop_flag();
    let finished = channel.finished_flag();

    let task_cancel = cancel.clone();
    runtime.spawn(async move {
        source.run(&channel, &task_cancel).await;
    });

    JobHandle::new(stopped, move || cancel.cancel()).with_finished(finished)
}
